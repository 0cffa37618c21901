use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollPhase {
	Idle,
	Polling,
	Backoff,
	Stopped,
}
impl PollPhase {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Polling => "polling",
			Self::Backoff => "backoff",
			Self::Stopped => "stopped",
		}
	}
}

#[derive(Clone, Debug)]
pub struct IntervalPolicy {
	pub base: Duration,
	pub min: Duration,
	pub max: Duration,
	pub multiplier: f64,
	pub max_consecutive_failures: u32,
}
impl IntervalPolicy {
	pub fn from_config(cfg: &comps_config::Polling) -> Self {
		Self {
			base: Duration::from_millis(cfg.base_interval_ms),
			min: Duration::from_millis(cfg.min_interval_ms),
			max: Duration::from_millis(cfg.max_interval_ms),
			multiplier: cfg.backoff_multiplier,
			max_consecutive_failures: cfg.max_consecutive_failures,
		}
	}

	pub fn initial(&self) -> Duration {
		self.bound(self.base)
	}

	/// Next interval after a quiet or failed cycle, capped at `max`.
	pub fn grow(&self, current: Duration) -> Duration {
		let scaled = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
			.unwrap_or(self.max);

		self.bound(scaled)
	}

	fn bound(&self, interval: Duration) -> Duration {
		if self.min > self.max {
			return self.max;
		}

		interval.clamp(self.min, self.max)
	}
}

/// Mutable bookkeeping for one polling target.
#[derive(Clone, Debug)]
pub struct PollState {
	pub target: String,
	pub phase: PollPhase,
	pub interval: Duration,
	pub version_tag: Option<String>,
	pub consecutive_failures: u32,
	pub last_success: Option<OffsetDateTime>,
}
impl PollState {
	pub fn new(target: impl Into<String>, policy: &IntervalPolicy) -> Self {
		Self {
			target: target.into(),
			phase: PollPhase::Idle,
			interval: policy.initial(),
			version_tag: None,
			consecutive_failures: 0,
			last_success: None,
		}
	}

	pub fn record_not_modified(&mut self, policy: &IntervalPolicy, now: OffsetDateTime) {
		self.phase = PollPhase::Polling;
		self.interval = policy.grow(self.interval);
		self.consecutive_failures = 0;
		self.last_success = Some(now);
	}

	pub fn record_changed(
		&mut self,
		policy: &IntervalPolicy,
		version_tag: String,
		now: OffsetDateTime,
	) {
		self.phase = PollPhase::Polling;
		self.interval = policy.initial();
		self.version_tag = Some(version_tag);
		self.consecutive_failures = 0;
		self.last_success = Some(now);
	}

	/// Returns true once the failure cap is reached; the state is then stopped.
	pub fn record_failure(&mut self, policy: &IntervalPolicy) -> bool {
		self.consecutive_failures = self.consecutive_failures.saturating_add(1);
		self.interval = policy.grow(self.interval);

		if self.consecutive_failures >= policy.max_consecutive_failures {
			self.phase = PollPhase::Stopped;

			return true;
		}

		self.phase = PollPhase::Backoff;

		false
	}

	pub fn stop(&mut self) {
		self.phase = PollPhase::Stopped;
	}

	pub fn is_stopped(&self) -> bool {
		self.phase == PollPhase::Stopped
	}

	pub fn snapshot(&self) -> Value {
		serde_json::json!({
			"target": self.target.as_str(),
			"phase": self.phase.as_str(),
			"interval_ms": self.interval.as_millis() as u64,
			"version_tag": self.version_tag.as_deref(),
			"consecutive_failures": self.consecutive_failures,
			"last_success": self.last_success.map(|ts| ts.unix_timestamp()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy() -> IntervalPolicy {
		IntervalPolicy {
			base: Duration::from_secs(30),
			min: Duration::from_secs(15),
			max: Duration::from_secs(120),
			multiplier: 1.5,
			max_consecutive_failures: 3,
		}
	}

	#[test]
	fn not_modified_grows_until_capped() {
		let policy = policy();
		let mut state = PollState::new("http://example.test/v1/properties", &policy);
		let mut previous = state.interval;
		let now = OffsetDateTime::UNIX_EPOCH;

		for _ in 0..10 {
			state.record_not_modified(&policy, now);

			assert!(
				state.interval > previous || state.interval == policy.max,
				"Interval did not grow: {:?} -> {:?}",
				previous,
				state.interval
			);
			assert!(state.interval <= policy.max && state.interval >= policy.min);

			previous = state.interval;
		}

		assert_eq!(state.interval, policy.max);
		assert_eq!(state.phase, PollPhase::Polling);
	}

	#[test]
	fn change_resets_interval_and_failures() {
		let policy = policy();
		let mut state = PollState::new("target", &policy);

		state.record_failure(&policy);
		state.record_not_modified(&policy, OffsetDateTime::UNIX_EPOCH);
		state.record_changed(&policy, "v2".to_string(), OffsetDateTime::UNIX_EPOCH);

		assert_eq!(state.interval, Duration::from_secs(30));
		assert_eq!(state.version_tag.as_deref(), Some("v2"));
		assert_eq!(state.consecutive_failures, 0);
	}

	#[test]
	fn failures_back_off_then_stop_at_cap() {
		let policy = policy();
		let mut state = PollState::new("target", &policy);

		assert!(!state.record_failure(&policy));
		assert_eq!(state.phase, PollPhase::Backoff);
		assert_eq!(state.interval, Duration::from_secs(45));
		assert!(!state.record_failure(&policy));
		assert!(state.record_failure(&policy));
		assert!(state.is_stopped());
		assert_eq!(state.consecutive_failures, 3);
	}

	#[test]
	fn initial_interval_is_bounded() {
		let mut policy = policy();

		policy.base = Duration::from_secs(1);

		assert_eq!(policy.initial(), Duration::from_secs(15));

		policy.base = Duration::from_secs(600);

		assert_eq!(policy.initial(), Duration::from_secs(120));
	}

	#[test]
	fn runaway_multiplier_saturates_at_max() {
		let mut policy = policy();

		policy.multiplier = f64::MAX;

		assert_eq!(policy.grow(Duration::from_secs(30)), Duration::from_secs(120));
	}
}
