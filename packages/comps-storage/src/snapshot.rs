use std::{fs, io::Write as _, path::Path};

use crate::Result;
use comps_domain::{Property, PropertySnapshot};

pub fn read_snapshot(path: &Path) -> Result<PropertySnapshot> {
	let raw = fs::read(path)?;

	Ok(serde_json::from_slice(&raw)?)
}

/// Writes through a sibling temp file so readers never observe a torn snapshot.
pub fn write_snapshot(path: &Path, snapshot: &PropertySnapshot) -> Result<()> {
	let mut tmp = path.as_os_str().to_owned();

	tmp.push(".tmp");

	let tmp = Path::new(&tmp);
	let mut file = fs::File::create(tmp)?;

	serde_json::to_writer_pretty(&mut file, snapshot)?;
	file.flush()?;
	fs::rename(tmp, path)?;

	Ok(())
}

/// Content hash over the serialized records, in the order given.
pub fn version_tag<'a>(properties: impl IntoIterator<Item = &'a Property>) -> Result<String> {
	let mut hasher = blake3::Hasher::new();

	for property in properties {
		serde_json::to_writer(&mut hasher, property)?;
		hasher.update(b"\n");
	}

	Ok(hasher.finalize().to_hex().to_string())
}

pub fn empty_version_tag() -> String {
	blake3::hash(b"").to_hex().to_string()
}
