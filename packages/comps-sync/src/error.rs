pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Transport failure polling {target}: {message}")]
	TransportFailure { target: String, message: String },
	#[error("Invalid response from {target}: {message}")]
	InvalidResponse { target: String, message: String },
	#[error("Change handler rejected version {version}: {message}")]
	HandlerFailure { version: String, message: String },
	#[error("Polling {target} stopped after {consecutive_failures} consecutive failures.")]
	PersistentFailure { target: String, consecutive_failures: u32 },
	#[error("Polling {target} is stopped.")]
	Stopped { target: String },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}
impl Error {
	/// Errors that count toward the consecutive-failure cap.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			Self::TransportFailure { .. } | Self::InvalidResponse { .. } | Self::HandlerFailure { .. }
		)
	}
}
