use std::{
	collections::{BTreeMap, BTreeSet},
	path::Path,
	sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
	BoxFuture, CandidateFilter, Error, PropertyStore, Result,
	snapshot::{self, empty_version_tag},
};
use comps_domain::{Property, PropertyKey, PropertySnapshot, quality};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
	pub inserted: usize,
	pub superseded: usize,
	pub unchanged: usize,
	pub removed: usize,
	pub version: String,
}
impl IngestReport {
	pub fn changed(&self) -> bool {
		self.inserted + self.superseded + self.removed > 0
	}
}

#[derive(Clone, Default)]
struct Records {
	latest: BTreeMap<PropertyKey, Property>,
	history: BTreeMap<PropertyKey, Vec<Property>>,
	version: String,
}

/// In-process property store holding the latest version of every record.
pub struct MemoryStore {
	retain_history: bool,
	records: RwLock<Records>,
	save_lock: Mutex<()>,
}
impl MemoryStore {
	pub fn new(retain_history: bool) -> Self {
		Self {
			retain_history,
			records: RwLock::new(Records { version: empty_version_tag(), ..Default::default() }),
			save_lock: Mutex::new(()),
		}
	}

	pub fn from_snapshot(
		snapshot: PropertySnapshot,
		retain_history: bool,
		current_year: i32,
	) -> Result<Self> {
		let store = Self::new(retain_history);

		store.replace(snapshot, current_year)?;

		Ok(store)
	}

	pub fn load(path: &Path, retain_history: bool, current_year: i32) -> Result<Self> {
		let snapshot = snapshot::read_snapshot(path)?;
		let store = Self::from_snapshot(snapshot, retain_history, current_year)?;

		tracing::info!(path = %path.display(), properties = store.len(), "Loaded property snapshot.");

		Ok(store)
	}

	/// Writes the current record set to `path`. Saves are serialized and each one captures
	/// the records after taking the lock, so the last save to finish holds the newest state.
	pub fn save(&self, path: &Path) -> Result<()> {
		let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

		snapshot::write_snapshot(path, &self.snapshot())
	}

	pub fn version_tag(&self) -> String {
		self.read().version.clone()
	}

	pub fn snapshot(&self) -> PropertySnapshot {
		let records = self.read();

		PropertySnapshot {
			version: records.version.clone(),
			properties: records.latest.values().cloned().collect(),
		}
	}

	/// Superseded versions of `key`, oldest first. Empty unless history is retained.
	pub fn history(&self, key: &PropertyKey) -> Vec<Property> {
		self.read().history.get(key).cloned().unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.read().latest.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Upserts a batch. A record whose content differs from the stored one supersedes it with
	/// the next version number; identical records are left untouched. The batch is rejected
	/// as a whole when any record is invalid.
	pub fn ingest(&self, properties: Vec<Property>, current_year: i32) -> Result<IngestReport> {
		let incoming = prepare_batch(properties, current_year)?;
		let mut records = self.write();
		let mut next = records.clone();
		let mut report = IngestReport::default();

		for (key, mut property) in incoming {
			let Some(existing) = next.latest.get(&key) else {
				property.version = property.version.max(1);
				next.latest.insert(key, property);
				report.inserted += 1;

				continue;
			};

			property.version = existing.version;

			if &property == existing {
				report.unchanged += 1;

				continue;
			}

			property.version = existing.version.saturating_add(1);

			self.supersede(&mut next, key, property);
			report.superseded += 1;
		}

		if report.changed() {
			next.version = snapshot::version_tag(next.latest.values())?;
		}

		report.version = next.version.clone();
		*records = next;

		tracing::info!(
			inserted = report.inserted,
			superseded = report.superseded,
			unchanged = report.unchanged,
			version = %report.version,
			"Ingested property batch."
		);

		Ok(report)
	}

	/// Replaces the whole record set with `snapshot`. Its version string becomes the store's
	/// version tag when present; otherwise a content hash is used.
	pub fn replace(&self, snapshot: PropertySnapshot, current_year: i32) -> Result<IngestReport> {
		let incoming = prepare_batch(snapshot.properties, current_year)?;
		let mut records = self.write();
		let mut next = Records { history: records.history.clone(), ..Default::default() };
		let mut report = IngestReport::default();
		let mut retired = records.latest.keys().cloned().collect::<BTreeSet<_>>();

		for (key, property) in incoming {
			retired.remove(&key);

			match records.latest.get(&key) {
				None => report.inserted += 1,
				Some(existing) if existing == &property => report.unchanged += 1,
				Some(existing) => {
					if self.retain_history {
						next.history.entry(key.clone()).or_default().push(existing.clone());
					}

					report.superseded += 1;
				},
			}

			next.latest.insert(key, property);
		}

		report.removed = retired.len();

		if self.retain_history {
			for key in retired {
				if let Some(previous) = records.latest.get(&key) {
					next.history.entry(key).or_default().push(previous.clone());
				}
			}
		}

		next.version = match snapshot.version.trim() {
			"" => snapshot::version_tag(next.latest.values())?,
			version => version.to_string(),
		};
		report.version = next.version.clone();
		*records = next;

		tracing::info!(
			inserted = report.inserted,
			superseded = report.superseded,
			removed = report.removed,
			version = %report.version,
			"Replaced property set."
		);

		Ok(report)
	}

	fn supersede(&self, records: &mut Records, key: PropertyKey, property: Property) {
		let previous = records.latest.insert(key.clone(), property);

		if self.retain_history
			&& let Some(previous) = previous
		{
			records.history.entry(key).or_default().push(previous);
		}
	}

	fn read(&self) -> RwLockReadGuard<'_, Records> {
		self.records.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, Records> {
		self.records.write().unwrap_or_else(PoisonError::into_inner)
	}
}
impl PropertyStore for MemoryStore {
	fn get_property<'a>(&'a self, county: &'a str, id: &'a str) -> BoxFuture<'a, Result<Property>> {
		let key = PropertyKey::new(county.trim(), id.trim());
		let found = self
			.read()
			.latest
			.get(&key)
			.cloned()
			.ok_or_else(|| Error::NotFound(format!("Property {key} does not exist.")));

		Box::pin(std::future::ready(found))
	}

	fn query_candidates<'a>(
		&'a self,
		filter: &'a CandidateFilter,
	) -> BoxFuture<'a, Result<Vec<Property>>> {
		let pool = self
			.read()
			.latest
			.values()
			.filter(|property| filter.matches(property))
			.cloned()
			.collect::<Vec<_>>();

		Box::pin(std::future::ready(Ok(pool)))
	}
}

fn prepare_batch(
	properties: Vec<Property>,
	current_year: i32,
) -> Result<BTreeMap<PropertyKey, Property>> {
	let mut batch = BTreeMap::new();

	for mut property in properties {
		property.county = property.county.trim().to_string();
		property.id = property.id.trim().to_string();

		if property.county.is_empty() || property.id.is_empty() {
			return Err(Error::InvalidArgument(
				"Every property requires a non-empty county and id.".to_string(),
			));
		}

		property.data_quality = quality::effective_quality(&property, current_year);

		let key = property.key();

		if batch.contains_key(&key) {
			return Err(Error::InvalidArgument(format!("Batch lists property {key} more than once.")));
		}

		batch.insert(key, property);
	}

	Ok(batch)
}
