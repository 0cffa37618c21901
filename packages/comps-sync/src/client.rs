use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
	BoxFuture, Error, Result,
	fetcher::{FetchOutcome, SnapshotFetcher},
	state::{IntervalPolicy, PollState},
};
use comps_domain::PropertySnapshot;

/// Consumer notified once per confirmed version change.
///
/// An `Err` leaves the version uncommitted, so the same version is fetched again on the next
/// poll; the failure counts toward the consecutive-failure cap.
pub trait ChangeHandler
where
	Self: Send + Sync,
{
	fn on_data_changed<'a>(&'a self, snapshot: PropertySnapshot) -> BoxFuture<'a, Result<()>>;
}
impl<F> ChangeHandler for F
where
	F: Fn(PropertySnapshot) + Send + Sync,
{
	fn on_data_changed<'a>(&'a self, snapshot: PropertySnapshot) -> BoxFuture<'a, Result<()>> {
		(self)(snapshot);

		Box::pin(std::future::ready(Ok(())))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
	NotModified { next_in: Duration },
	Changed { version: String, next_in: Duration },
	Failed { consecutive_failures: u32, next_in: Duration },
}

pub struct SyncClient {
	fetcher: Arc<dyn SnapshotFetcher>,
	handler: Arc<dyn ChangeHandler>,
	policy: IntervalPolicy,
	state: PollState,
}
impl SyncClient {
	pub fn new(
		policy: IntervalPolicy,
		fetcher: Arc<dyn SnapshotFetcher>,
		handler: Arc<dyn ChangeHandler>,
	) -> Self {
		let state = PollState::new(fetcher.target(), &policy);

		Self { fetcher, handler, policy, state }
	}

	/// Seeds the tag sent with the first request, typically the version a restored local
	/// store already holds.
	pub fn with_version_tag(mut self, version_tag: Option<String>) -> Self {
		self.state.version_tag = version_tag.filter(|tag| !tag.trim().is_empty());

		self
	}

	pub fn state(&self) -> &PollState {
		&self.state
	}

	pub fn stop(&mut self) {
		if !self.state.is_stopped() {
			tracing::info!(target_url = %self.state.target, "Polling stopped.");
		}

		self.state.stop();
	}

	/// Runs one conditional request and commits its effect on the poll state.
	///
	/// The change handler runs before the new version tag is committed, so a poll dropped
	/// mid-flight leaves the state at its previous value.
	pub async fn poll_once(&mut self) -> Result<PollOutcome> {
		if self.state.is_stopped() {
			return Err(Error::Stopped { target: self.state.target.clone() });
		}

		let version_tag = self.state.version_tag.clone();
		let fetched = self.fetcher.fetch(version_tag.as_deref()).await;

		match fetched {
			Ok(FetchOutcome::NotModified) => Ok(self.commit_not_modified()),
			Ok(FetchOutcome::Changed { version, .. })
				if version_tag.as_deref() == Some(version.as_str()) =>
				Ok(self.commit_not_modified()),
			Ok(FetchOutcome::Changed { version, snapshot }) => {
				let count = snapshot.properties.len();

				if let Err(err) = self.handler.on_data_changed(snapshot).await {
					return self.commit_failure(err);
				}

				self.state.record_changed(&self.policy, version.clone(), OffsetDateTime::now_utc());

				tracing::info!(
					target_url = %self.state.target,
					version = %version,
					properties = count,
					"Poll returned a new version."
				);

				Ok(PollOutcome::Changed { version, next_in: self.state.interval })
			},
			Err(err) => self.commit_failure(err),
		}
	}

	/// Polls immediately, then on the interval held in the poll state until cancelled or
	/// stopped by the failure cap.
	pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
		tracing::info!(
			target_url = %self.state.target,
			interval_ms = self.state.interval.as_millis() as u64,
			"Polling started."
		);

		loop {
			let step = tokio::select! {
				biased;
				_ = cancel.cancelled() => None,
				step = self.poll_once() => Some(step),
			};
			let Some(step) = step else {
				self.stop();

				return Ok(());
			};

			step?;

			let delay = self.state.interval;

			tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					self.stop();

					return Ok(());
				},
				_ = tokio::time::sleep(delay) => {},
			}
		}
	}

	fn commit_failure(&mut self, err: Error) -> Result<PollOutcome> {
		if !err.is_transient() {
			return Err(err);
		}

		let exhausted = self.state.record_failure(&self.policy);
		let consecutive_failures = self.state.consecutive_failures;

		if exhausted {
			tracing::error!(
				target_url = %self.state.target,
				consecutive_failures,
				error = %err,
				"Polling gave up after repeated failures."
			);

			return Err(Error::PersistentFailure {
				target: self.state.target.clone(),
				consecutive_failures,
			});
		}

		tracing::warn!(
			target_url = %self.state.target,
			consecutive_failures,
			retry_in_ms = self.state.interval.as_millis() as u64,
			error = %err,
			"Poll failed; backing off."
		);

		Ok(PollOutcome::Failed { consecutive_failures, next_in: self.state.interval })
	}

	fn commit_not_modified(&mut self) -> PollOutcome {
		self.state.record_not_modified(&self.policy, OffsetDateTime::now_utc());

		tracing::debug!(
			target_url = %self.state.target,
			next_in_ms = self.state.interval.as_millis() as u64,
			"Poll returned not modified."
		);

		PollOutcome::NotModified { next_in: self.state.interval }
	}
}
