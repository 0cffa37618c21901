pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Query was cancelled.")]
	Cancelled,
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<comps_domain::Error> for Error {
	fn from(err: comps_domain::Error) -> Self {
		match err {
			comps_domain::Error::InvalidArgument { message } => Self::InvalidArgument { message },
		}
	}
}

impl From<comps_storage::Error> for Error {
	fn from(err: comps_storage::Error) -> Self {
		match err {
			comps_storage::Error::NotFound(message) => Self::NotFound { message },
			comps_storage::Error::InvalidArgument(message) => Self::InvalidArgument { message },
			comps_storage::Error::Io(inner) => Self::Storage { message: inner.to_string() },
			comps_storage::Error::SerdeJson(inner) => Self::Storage { message: inner.to_string() },
		}
	}
}
