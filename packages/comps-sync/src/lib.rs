pub mod client;
pub mod fetcher;
pub mod state;

mod error;

pub use client::{ChangeHandler, PollOutcome, SyncClient};
pub use error::{Error, Result};
pub use fetcher::{FetchOutcome, HttpFetcher, SnapshotFetcher};
pub use state::{IntervalPolicy, PollPhase, PollState};
pub use tokio_util::sync::CancellationToken;

use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
