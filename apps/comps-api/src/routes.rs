use axum::{
	Json, Router,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::{
		HeaderMap, StatusCode,
		header::{ETAG, IF_NONE_MATCH},
	},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::state::AppState;
use comps_domain::Property;
use comps_service::{ComparableQuery, ComparablesResponse};
use comps_storage::PropertyStore;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/properties", get(list_properties).put(ingest_properties))
		.route("/v1/properties/{county}/{id}", get(get_property))
		.route("/v1/comparables", post(inline_comparables))
		.route("/v1/comparables/{county}/{id}", get(stored_comparables))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
	pub properties: Vec<Property>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
	pub inserted: usize,
	pub superseded: usize,
	pub unchanged: usize,
	pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct InlineComparablesRequest {
	pub subject: Property,
	#[serde(default)]
	pub query: ComparableQuery,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn list_properties(State(state): State<AppState>, headers: HeaderMap) -> Response {
	let snapshot = state.store.snapshot();
	let etag = format!("\"{}\"", snapshot.version);

	if etag_matches(&headers, &snapshot.version) {
		return (StatusCode::NOT_MODIFIED, [(ETAG, etag)]).into_response();
	}

	([(ETAG, etag)], Json(snapshot)).into_response()
}

async fn ingest_properties(
	State(state): State<AppState>,
	payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
	let Json(payload) = payload.map_err(|err| invalid_argument(err.body_text()))?;
	let store = state.store.clone();
	let snapshot_path = state.snapshot_path.clone();
	let report = tokio::task::spawn_blocking(move || {
		let report = store.ingest(payload.properties, OffsetDateTime::now_utc().year())?;

		if report.changed()
			&& let Some(path) = snapshot_path.as_deref()
		{
			store.save(path)?;
		}

		Ok::<_, comps_storage::Error>(report)
	})
	.await
	.map_err(|err| comps_service::Error::Storage { message: format!("Ingest task failed: {err}") })?
	.map_err(comps_service::Error::from)?;

	Ok(Json(IngestResponse {
		inserted: report.inserted,
		superseded: report.superseded,
		unchanged: report.unchanged,
		version: report.version,
	}))
}

async fn get_property(
	State(state): State<AppState>,
	Path((county, id)): Path<(String, String)>,
) -> Result<Json<Property>, ApiError> {
	let property =
		state.store.get_property(&county, &id).await.map_err(comps_service::Error::from)?;

	Ok(Json(property))
}

async fn stored_comparables(
	State(state): State<AppState>,
	Path((county, id)): Path<(String, String)>,
	query: Result<Query<ComparableQuery>, QueryRejection>,
) -> Result<Json<ComparablesResponse>, ApiError> {
	let Query(query) = query.map_err(|err| invalid_argument(err.body_text()))?;
	let response = state.service.comparables_for(&county, &id, &query, &state.shutdown).await?;

	Ok(Json(response))
}

async fn inline_comparables(
	State(state): State<AppState>,
	payload: Result<Json<InlineComparablesRequest>, JsonRejection>,
) -> Result<Json<ComparablesResponse>, ApiError> {
	let Json(payload) = payload.map_err(|err| invalid_argument(err.body_text()))?;
	let response = state
		.service
		.comparables_for_subject(&payload.subject, &payload.query, &state.shutdown)
		.await?;

	Ok(Json(response))
}

/// True when any entity tag in `If-None-Match` names `version`, or the header is `*`.
fn etag_matches(headers: &HeaderMap, version: &str) -> bool {
	let Some(raw) = headers.get(IF_NONE_MATCH).and_then(|value| value.to_str().ok()) else {
		return false;
	};

	raw.split(',').map(str::trim).any(|tag| {
		let tag = tag.strip_prefix("W/").unwrap_or(tag);

		tag == "*" || tag.trim_matches('"') == version
	})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	pub fn new(
		status: StatusCode,
		error_code: &str,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.to_string(), message: message.into(), fields }
	}
}

impl From<comps_service::Error> for ApiError {
	fn from(err: comps_service::Error) -> Self {
		match err {
			comps_service::Error::InvalidArgument { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_argument", message, None),
			comps_service::Error::NotFound { message } =>
				ApiError::new(StatusCode::NOT_FOUND, "not_found", message, None),
			comps_service::Error::Cancelled => ApiError::new(
				StatusCode::SERVICE_UNAVAILABLE,
				"cancelled",
				"Query was cancelled.",
				None,
			),
			comps_service::Error::Storage { message } => {
				tracing::error!(error = %message, "Storage failure while serving request.");

				ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message, None)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

fn invalid_argument(message: String) -> ApiError {
	ApiError::new(StatusCode::BAD_REQUEST, "invalid_argument", message, None)
}
