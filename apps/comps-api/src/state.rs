use std::{path::PathBuf, sync::Arc};

use time::OffsetDateTime;

use comps_config::Config;
use comps_service::{CancellationToken, ComparablesService};
use comps_storage::MemoryStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ComparablesService>,
	pub store: Arc<MemoryStore>,
	/// Ingested batches are persisted here when set.
	pub snapshot_path: Option<PathBuf>,
	/// Cancelled on shutdown; in-flight queries then fail instead of returning partial output.
	pub shutdown: CancellationToken,
}
impl AppState {
	pub fn new(config: &Config) -> color_eyre::Result<Self> {
		let retain_history = config.store.retain_history;
		let store = match config.store.snapshot_path.as_deref() {
			Some(path) if path.exists() =>
				MemoryStore::load(path, retain_history, OffsetDateTime::now_utc().year())?,
			_ => MemoryStore::new(retain_history),
		};
		let mut state = Self::with_store(config, Arc::new(store));

		state.snapshot_path = config.store.snapshot_path.clone();

		Ok(state)
	}

	pub fn with_store(config: &Config, store: Arc<MemoryStore>) -> Self {
		let service = ComparablesService::new(config, store.clone());

		Self {
			service: Arc::new(service),
			store,
			snapshot_path: None,
			shutdown: CancellationToken::new(),
		}
	}
}
