use std::{
	collections::VecDeque,
	env, fs,
	path::PathBuf,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU64, Ordering},
	},
	time::{SystemTime, UNIX_EPOCH},
};

use serde_json::Map;
use time::{Duration, OffsetDateTime, macros::datetime};

use comps_config::{Config, Polling, Service};
use comps_domain::{
	Coordinates, DataQuality, FeatureValue, Property, PropertySnapshot, PropertyType,
};
use comps_sync::{BoxFuture, ChangeHandler, Error, FetchOutcome, SnapshotFetcher};

pub const BASE_UPDATED_AT: OffsetDateTime = datetime!(2025-01-15 12:00 UTC);

pub fn sample_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		store: Default::default(),
		similarity: Default::default(),
		confidence: Default::default(),
		ranking: Default::default(),
		polling: Some(polling_config("http://127.0.0.1:1/v1/properties")),
	}
}

pub fn polling_config(endpoint: &str) -> Polling {
	Polling {
		endpoint: endpoint.to_string(),
		base_interval_ms: 30_000,
		min_interval_ms: 15_000,
		max_interval_ms: 120_000,
		backoff_multiplier: 1.5,
		max_consecutive_failures: 3,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

pub fn snapshot(version: &str, properties: Vec<Property>) -> PropertySnapshot {
	PropertySnapshot { version: version.to_string(), properties }
}

/// Writes `payload` to a unique temp file; callers remove it.
pub fn write_temp_file(prefix: &str, payload: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("{prefix}_{nanos}_{pid}_{ordinal}.json"));

	fs::write(&path, payload).expect("Failed to write temp file.");

	path
}

/// Fluent builder over a fully populated industrial property in Cook County.
pub struct PropertyBuilder {
	property: Property,
}
impl PropertyBuilder {
	pub fn new(county: &str, id: &str) -> Self {
		let mut features = std::collections::BTreeMap::new();

		features.insert("loading_docks".to_string(), FeatureValue::Number(4.0));
		features.insert("ceiling_height".to_string(), FeatureValue::Number(28.0));
		features.insert("construction_type".to_string(), FeatureValue::Text("tilt-up".to_string()));

		Self {
			property: Property {
				county: county.to_string(),
				id: id.to_string(),
				address: comps_domain::Address {
					street: Some(format!("{id} Industrial Way")),
					city: Some("Chicago".to_string()),
					state: Some("IL".to_string()),
					zip_code: Some("60601".to_string()),
				},
				coordinates: Some(Coordinates::new(41.88, -87.63)),
				property_type: Some(PropertyType::Industrial),
				subtype: Some("warehouse".to_string()),
				zoning: Some("M1".to_string()),
				square_feet: Some(10_000.0),
				lot_size: Some(25_000.0),
				year_built: Some(1990),
				financials: comps_domain::Financials {
					assessed_value: Some(1_200_000.0),
					market_value: Some(1_500_000.0),
					tax_amount: Some(30_000.0),
				},
				features,
				data_quality: DataQuality::Complete,
				version: 1,
				updated_at: BASE_UPDATED_AT,
			},
		}
	}

	pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
		self.property.coordinates = Some(Coordinates::new(latitude, longitude));

		self
	}

	pub fn no_coordinates(mut self) -> Self {
		self.property.coordinates = None;

		self
	}

	pub fn property_type(mut self, property_type: Option<PropertyType>) -> Self {
		self.property.property_type = property_type;

		self
	}

	pub fn subtype(mut self, subtype: Option<&str>) -> Self {
		self.property.subtype = subtype.map(str::to_string);

		self
	}

	pub fn zoning(mut self, zoning: Option<&str>) -> Self {
		self.property.zoning = zoning.map(str::to_string);

		self
	}

	pub fn square_feet(mut self, square_feet: Option<f64>) -> Self {
		self.property.square_feet = square_feet;

		self
	}

	pub fn lot_size(mut self, lot_size: Option<f64>) -> Self {
		self.property.lot_size = lot_size;

		self
	}

	pub fn year_built(mut self, year_built: Option<i32>) -> Self {
		self.property.year_built = year_built;

		self
	}

	pub fn city(mut self, city: &str) -> Self {
		self.property.address.city = Some(city.to_string());

		self
	}

	pub fn zip_code(mut self, zip_code: &str) -> Self {
		self.property.address.zip_code = Some(zip_code.to_string());

		self
	}

	pub fn feature(mut self, key: &str, value: FeatureValue) -> Self {
		self.property.features.insert(key.to_string(), value);

		self
	}

	pub fn no_features(mut self) -> Self {
		self.property.features.clear();

		self
	}

	pub fn quality(mut self, quality: DataQuality) -> Self {
		self.property.data_quality = quality;

		self
	}

	pub fn updated_days_ago(mut self, days: i64) -> Self {
		self.property.updated_at = BASE_UPDATED_AT - Duration::days(days);

		self
	}

	pub fn build(self) -> Property {
		self.property
	}
}

/// Fetcher that replays queued responses and answers `NotModified` once drained.
pub struct ScriptedFetcher {
	target: String,
	responses: Mutex<VecDeque<Result<FetchOutcome, Error>>>,
	requests: Mutex<Vec<Option<String>>>,
}
impl ScriptedFetcher {
	pub fn new(responses: Vec<Result<FetchOutcome, Error>>) -> Self {
		Self {
			target: "scripted://properties".to_string(),
			responses: Mutex::new(responses.into()),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn changed(version: &str, properties: Vec<Property>) -> Result<FetchOutcome, Error> {
		Ok(FetchOutcome::Changed { version: version.to_string(), snapshot: snapshot(version, properties) })
	}

	pub fn not_modified() -> Result<FetchOutcome, Error> {
		Ok(FetchOutcome::NotModified)
	}

	pub fn transport_failure() -> Result<FetchOutcome, Error> {
		Err(Error::TransportFailure {
			target: "scripted://properties".to_string(),
			message: "connection refused".to_string(),
		})
	}

	pub fn request_count(&self) -> usize {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	/// Version tags carried by each request, in order.
	pub fn requests(&self) -> Vec<Option<String>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl SnapshotFetcher for ScriptedFetcher {
	fn target(&self) -> &str {
		&self.target
	}

	fn fetch<'a>(
		&'a self,
		version_tag: Option<&'a str>,
	) -> BoxFuture<'a, Result<FetchOutcome, Error>> {
		self.requests
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.push(version_tag.map(str::to_string));

		let next = self
			.responses
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.pop_front()
			.unwrap_or(Ok(FetchOutcome::NotModified));

		Box::pin(async move { next })
	}
}

/// Change handler that keeps every snapshot it receives.
#[derive(Clone, Default)]
pub struct RecordingHandler {
	received: Arc<Mutex<Vec<PropertySnapshot>>>,
}
impl RecordingHandler {
	pub fn versions(&self) -> Vec<String> {
		self.received
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.map(|snapshot| snapshot.version.clone())
			.collect()
	}
}
impl ChangeHandler for RecordingHandler {
	fn on_data_changed<'a>(
		&'a self,
		snapshot: PropertySnapshot,
	) -> BoxFuture<'a, comps_sync::Result<()>> {
		self.received.lock().unwrap_or_else(|err| err.into_inner()).push(snapshot);

		Box::pin(std::future::ready(Ok(())))
	}
}
