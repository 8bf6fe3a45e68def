//! Formatting helpers for listings

use crate::types::FileRecord;

const UNITS: [&str; 5] = ["K", "M", "G", "T", "P"];

/// Human-readable size: `512B`, `1.5K`, `12M`
///
/// One decimal is kept below 10 units, none above.
pub fn bytes_string(size: u64) -> String {
	if size < 1024 {
		return format!("{}B", size);
	}
	let mut value = size as f64;
	let mut unit = UNITS[0];
	for u in UNITS {
		value /= 1024.0;
		unit = u;
		if value < 1024.0 {
			break;
		}
	}
	if value < 10.0 {
		format!("{:.1}{}", value, unit)
	} else {
		format!("{:.0}{}", value, unit)
	}
}

/// One line of a remote listing: size, modification time, path
pub fn listing_line(record: &FileRecord) -> String {
	format!("{:>7}   {}   {}", bytes_string(record.size), record.modified.to_rfc3339(), record.path)
}


// vim: ts=4
