use std::{path::PathBuf, sync::Arc};

use time::OffsetDateTime;

use comps_domain::PropertySnapshot;
use comps_storage::MemoryStore;
use comps_sync::{BoxFuture, ChangeHandler, Error, Result};

/// Mirrors every confirmed upstream version into a local store.
pub struct StoreRefresher {
	store: Arc<MemoryStore>,
	snapshot_path: Option<PathBuf>,
}
impl StoreRefresher {
	pub fn new(store: Arc<MemoryStore>, snapshot_path: Option<PathBuf>) -> Self {
		Self { store, snapshot_path }
	}

	/// Replaces the local store with `snapshot`, then persists it. Either failure is returned
	/// so the version is fetched again on the next poll.
	fn refresh(&self, snapshot: PropertySnapshot) -> Result<()> {
		let version = snapshot.version.clone();
		let report = self.store.replace(snapshot, OffsetDateTime::now_utc().year()).map_err(|err| {
			tracing::error!(version = %version, error = %err, "Failed to refresh local store.");

			Error::HandlerFailure { version: version.clone(), message: err.to_string() }
		})?;

		tracing::info!(
			version = %report.version,
			inserted = report.inserted,
			superseded = report.superseded,
			removed = report.removed,
			"Local store refreshed."
		);

		if let Some(path) = self.snapshot_path.as_deref()
			&& let Err(err) = self.store.save(path)
		{
			tracing::error!(path = %path.display(), error = %err, "Failed to persist snapshot.");

			return Err(Error::HandlerFailure { version, message: err.to_string() });
		}

		Ok(())
	}
}
impl ChangeHandler for StoreRefresher {
	fn on_data_changed<'a>(&'a self, snapshot: PropertySnapshot) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.refresh(snapshot) })
	}
}
