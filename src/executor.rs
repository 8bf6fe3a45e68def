//! Fixed-concurrency task runner
//!
//! At most `limit` submitted tasks run at once. `submit` waits for a free
//! slot, so a large batch is admitted gradually instead of being queued in
//! full. `wait` drains everything and reports the first error that any task
//! returned. A failing task never cancels its siblings.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::logging::*;

/// Default number of concurrently active transfers
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Runs fallible tasks with bounded parallelism
pub struct BoundedExecutor<E> {
	limit: usize,
	semaphore: Arc<Semaphore>,
	tasks: JoinSet<()>,
	/// First error recorded by a finishing task; later ones are dropped
	first_error: Arc<Mutex<Option<E>>>,
	submitted: usize,
}

impl<E> BoundedExecutor<E>
where
	E: From<JoinError> + Send + 'static,
{
	/// Create an executor running at most `limit` tasks at once (at least one)
	pub fn new(limit: usize) -> Self {
		let limit = limit.max(1);
		BoundedExecutor {
			limit,
			semaphore: Arc::new(Semaphore::new(limit)),
			tasks: JoinSet::new(),
			first_error: Arc::new(Mutex::new(None)),
			submitted: 0,
		}
	}

	pub fn limit(&self) -> usize {
		self.limit
	}

	/// Number of tasks submitted so far
	pub fn submitted(&self) -> usize {
		self.submitted
	}

	/// Start `task` once a slot is free
	///
	/// Must be called from within a tokio runtime.
	pub async fn submit<F>(&mut self, task: F)
	where
		F: Future<Output = Result<(), E>> + Send + 'static,
	{
		// The semaphore is owned here and never closed, so this only waits
		let permit = self.semaphore.clone().acquire_owned().await.ok();
		self.reap_finished();

		let first_error = self.first_error.clone();
		self.submitted += 1;
		self.tasks.spawn(async move {
			let result = task.await;
			drop(permit);
			if let Err(e) = result {
				record_error(&first_error, e);
			}
		});
	}

	/// Wait for every submitted task; returns the first error, if any
	pub async fn wait(mut self) -> Result<(), E> {
		while let Some(joined) = self.tasks.join_next().await {
			if let Err(e) = joined {
				warn!("Task did not complete: {}", e);
				record_error(&self.first_error, E::from(e));
			}
		}
		let first = self.first_error.lock().unwrap_or_else(|e| e.into_inner()).take();
		match first {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}

	/// Collect already finished tasks so the join set does not grow unbounded
	fn reap_finished(&mut self) {
		while let Some(joined) = self.tasks.try_join_next() {
			if let Err(e) = joined {
				warn!("Task did not complete: {}", e);
				record_error(&self.first_error, E::from(e));
			}
		}
	}
}

fn record_error<E>(slot: &Mutex<Option<E>>, error: E) {
	let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
	if slot.is_none() {
		*slot = Some(error);
	}
}


// vim: ts=4
