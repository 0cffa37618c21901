pub mod refresher;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use crate::refresher::StoreRefresher;
use comps_storage::MemoryStore;
use comps_sync::{CancellationToken, HttpFetcher, IntervalPolicy, SyncClient};

#[derive(Debug, Parser)]
#[command(
	version = comps_cli::VERSION,
	rename_all = "kebab",
	styles = comps_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = comps_config::load(&args.config)?;

	init_tracing(&config)?;

	let Some(polling) = config.polling.as_ref() else {
		return Err(eyre::eyre!("The [polling] section is required to run the poller."));
	};
	let store = match config.store.snapshot_path.as_deref() {
		Some(path) if path.exists() => MemoryStore::load(
			path,
			config.store.retain_history,
			OffsetDateTime::now_utc().year(),
		)?,
		_ => MemoryStore::new(config.store.retain_history),
	};
	let store = Arc::new(store);
	let restored_version = (!store.is_empty()).then(|| store.version_tag());
	let refresher = StoreRefresher::new(store, config.store.snapshot_path.clone());
	let fetcher = HttpFetcher::new(polling)?;
	let mut client =
		SyncClient::new(IntervalPolicy::from_config(polling), Arc::new(fetcher), Arc::new(refresher))
			.with_version_tag(restored_version);
	let cancel = CancellationToken::new();
	let signal = cancel.clone();

	tokio::spawn(async move {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %err, "Failed to listen for shutdown signal.");

			return;
		}

		tracing::info!("Shutdown requested.");
		signal.cancel();
	});

	let outcome = client.run(&cancel).await;

	tracing::info!(state = %client.state().snapshot(), "Poller stopped.");

	Ok(outcome?)
}

fn init_tracing(config: &comps_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
