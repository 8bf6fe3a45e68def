use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use buildsync::config::Config;
use buildsync::error::SyncError;
use buildsync::logging::*;
use buildsync::remote::HttpCatalog;
use buildsync::revision::{self, RevisionOverrides};
use buildsync::store::LocalStore;
use buildsync::sync::{SyncOptions, SyncOutcome, Syncer};
use buildsync::types::{FileSet, RevisionRef};
use buildsync::util::listing_line;
use buildsync::validation::Validator;

fn cli() -> Command {
	Command::new("buildsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Fetch and upload per-commit build data")
		.subcommand_required(true)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.global(true)
				.action(ArgAction::SetTrue)
				.help("Log every file transfer"),
		)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.global(true)
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.help("Config file (default: ~/.config/buildsync/config.toml)"),
		)
		.arg(
			Arg::new("remote-url")
				.long("remote-url")
				.global(true)
				.value_name("URL")
				.help("Base URL of the remote build-data catalog"),
		)
		.arg(
			Arg::new("cache-dir")
				.long("cache-dir")
				.global(true)
				.value_name("DIR")
				.value_parser(value_parser!(PathBuf))
				.help("Local build-data cache (relative to the repository root)"),
		)
		.arg(
			Arg::new("parallel")
				.short('j')
				.long("parallel")
				.global(true)
				.value_name("N")
				.value_parser(value_parser!(usize))
				.help("Number of concurrent transfers"),
		)
		.arg(
			Arg::new("repo")
				.long("repo")
				.global(true)
				.value_name("URI")
				.help("Repository URI (default: derived from the origin remote)"),
		)
		.arg(
			Arg::new("commit")
				.long("commit")
				.global(true)
				.value_name("ID")
				.help("Commit ID (default: HEAD)"),
		)
		.subcommand(
			Command::new("pull")
				.about("Fetch remote build data to the local cache")
				.arg(
					Arg::new("list")
						.short('l')
						.long("list")
						.action(ArgAction::SetTrue)
						.help("Only list files that exist on remote; don't fetch"),
				)
				.arg(
					Arg::new("urls")
						.long("urls")
						.action(ArgAction::SetTrue)
						.help("Show URLs to build data files"),
				),
		)
		.subcommand(
			Command::new("push")
				.about("Upload local build data to the remote catalog")
				.arg(
					Arg::new("list")
						.short('l')
						.long("list")
						.action(ArgAction::SetTrue)
						.help("Only list local files; don't upload"),
				),
		)
}

/// Config file and environment, overridden by CLI flags
fn load_config(matches: &ArgMatches) -> Result<Config, SyncError> {
	let mut config = Config::load(matches.get_one::<PathBuf>("config").map(|p| p.as_path()))?;
	if let Some(url) = matches.get_one::<String>("remote-url") {
		config.remote_url = url.clone();
	}
	if let Some(dir) = matches.get_one::<PathBuf>("cache-dir") {
		config.cache_dir = dir.clone();
	}
	if let Some(n) = matches.get_one::<usize>("parallel") {
		config.parallel_transfers = *n;
	}
	config.validate().map_err(|e| SyncError::setup(e.to_string()))?;
	Ok(config)
}

fn print_remote_listing(syncer: &Syncer, rev: &RevisionRef, files: &FileSet, urls: bool) {
	info!("# Remote build files for repository {:?} commit {}:", rev.repo_uri, rev.commit_id);
	for record in files {
		println!("{}", listing_line(record));
		if urls {
			if let Some(url) = syncer.remote_url(rev, record) {
				println!(" @ {}", url);
			}
		}
	}
}

fn print_local_listing(rev: &RevisionRef, files: &FileSet) {
	info!("# Local build files for repository {:?} commit {}:", rev.repo_uri, rev.commit_id);
	for record in files {
		println!("{}", record.path);
	}
}

async fn run(matches: ArgMatches) -> Result<(), SyncError> {
	let config = load_config(&matches)?;

	let cwd = env::current_dir()
		.map_err(|e| SyncError::setup(format!("Cannot determine current directory: {}", e)))?;
	let overrides = RevisionOverrides {
		repo_uri: matches.get_one::<String>("repo").cloned(),
		commit_id: matches.get_one::<String>("commit").cloned(),
	};
	let working_copy = revision::resolve(&cwd, overrides).await?;
	let rev = working_copy.revision();
	debug!("Resolved {} at {}", rev, working_copy.root_dir.display());

	let cache_dir = config.cache_dir_for(&working_copy.root_dir);
	let store = LocalStore::open(&cache_dir)
		.await
		.map_err(|e| SyncError::setup(format!("Cannot open {}: {}", cache_dir.display(), e)))?;
	let remote = HttpCatalog::from_config(&config)
		.map_err(|e| SyncError::setup(format!("Cannot set up remote catalog: {}", e)))?;
	debug!("Syncing {} between {} and {}", rev, store.root().display(), remote.base_url());
	let syncer = Syncer::new(Arc::new(store), Arc::new(remote))
		.with_concurrency(config.parallel_transfers);

	match matches.subcommand() {
		Some(("pull", sub)) => {
			let options = SyncOptions { list_only: sub.get_flag("list") };
			if let SyncOutcome::Listed(files) = syncer.pull(&rev, options).await? {
				print_remote_listing(&syncer, &rev, &files, sub.get_flag("urls"));
			}
		}
		Some(("push", sub)) => {
			let options = SyncOptions { list_only: sub.get_flag("list") };
			if let SyncOutcome::Listed(files) = syncer.push(&rev, options).await? {
				print_local_listing(&rev, &files);
			}
		}
		_ => return Err(SyncError::setup("a subcommand is required")),
	}
	Ok(())
}

#[tokio::main]
async fn main() {
	let matches = cli().get_matches();
	init_tracing(matches.get_flag("verbose"));

	if let Err(e) = run(matches).await {
		error!("{}", e);
		std::process::exit(1);
	}
}


// vim: ts=4
