use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub store: Store,
	#[serde(default)]
	pub similarity: Similarity,
	#[serde(default)]
	pub confidence: Confidence,
	#[serde(default)]
	pub ranking: Ranking,
	pub polling: Option<Polling>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Store {
	/// Optional JSON snapshot loaded at startup.
	pub snapshot_path: Option<PathBuf>,
	/// Keep superseded property versions for audit.
	pub retain_history: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Similarity {
	pub weights: SimilarityWeights,
	pub size: SizeSimilarity,
	pub location: LocationSimilarity,
	pub age: AgeSimilarity,
	pub property_type: TypeSimilarity,
	pub features: FeatureSimilarity,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
	pub size: f32,
	pub location: f32,
	pub age: f32,
	pub property_type: f32,
	pub features: f32,
}
impl Default for SimilarityWeights {
	fn default() -> Self {
		Self { size: 0.25, location: 0.25, age: 0.15, property_type: 0.2, features: 0.15 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SizeSimilarity {
	/// Relative difference (against the subject) at which the score reaches zero.
	pub saturation_ratio: f64,
	pub building_weight: f32,
	pub lot_weight: f32,
}
impl Default for SizeSimilarity {
	fn default() -> Self {
		Self { saturation_ratio: 1.0, building_weight: 0.6, lot_weight: 0.4 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocationSimilarity {
	pub distance_scale_miles: f64,
	pub max_radius_miles: f64,
	/// Share of the location score taken by the market-area factor.
	pub market_weight: f32,
	pub zip_mismatch_factor: f32,
	pub city_mismatch_factor: f32,
	pub county_mismatch_factor: f32,
}
impl Default for LocationSimilarity {
	fn default() -> Self {
		Self {
			distance_scale_miles: 5.0,
			max_radius_miles: 50.0,
			market_weight: 0.3,
			zip_mismatch_factor: 0.9,
			city_mismatch_factor: 0.8,
			county_mismatch_factor: 0.7,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AgeSimilarity {
	pub saturation_years: u32,
}
impl Default for AgeSimilarity {
	fn default() -> Self {
		Self { saturation_years: 50 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TypeSimilarity {
	pub subtype_mismatch_score: f32,
	pub related_type_score: f32,
	/// Unordered pairs of property types that may be compared with each other.
	pub related: Vec<(String, String)>,
	pub zoning_mismatch_factor: f32,
}
impl Default for TypeSimilarity {
	fn default() -> Self {
		Self {
			subtype_mismatch_score: 0.7,
			related_type_score: 0.4,
			related: vec![("commercial".to_string(), "industrial".to_string())],
			zoning_mismatch_factor: 0.7,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FeatureSimilarity {
	/// Shared numeric features earn `1 - relative difference` instead of exact-match credit.
	pub numeric_partial_credit: bool,
}
impl Default for FeatureSimilarity {
	fn default() -> Self {
		Self { numeric_partial_credit: true }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Confidence {
	pub partial_penalty: f32,
	pub suspect_penalty: f32,
	pub missing_dimension_penalty: f32,
	pub floor: f32,
}
impl Default for Confidence {
	fn default() -> Self {
		Self {
			partial_penalty: 0.15,
			suspect_penalty: 0.4,
			missing_dimension_penalty: 0.05,
			floor: 0.1,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub default_k: u32,
	pub max_k: u32,
	pub min_similarity: f32,
	pub analysis_version: String,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			default_k: 10,
			max_k: 50,
			min_similarity: 0.0,
			analysis_version: "1.0.0".to_string(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Polling {
	pub endpoint: String,
	#[serde(default = "default_base_interval_ms")]
	pub base_interval_ms: u64,
	#[serde(default = "default_min_interval_ms")]
	pub min_interval_ms: u64,
	#[serde(default = "default_max_interval_ms")]
	pub max_interval_ms: u64,
	#[serde(default = "default_backoff_multiplier")]
	pub backoff_multiplier: f64,
	#[serde(default = "default_max_consecutive_failures")]
	pub max_consecutive_failures: u32,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_base_interval_ms() -> u64 {
	30_000
}

fn default_min_interval_ms() -> u64 {
	15_000
}

fn default_max_interval_ms() -> u64 {
	120_000
}

fn default_backoff_multiplier() -> f64 {
	1.5
}

fn default_max_consecutive_failures() -> u32 {
	5
}

fn default_timeout_ms() -> u64 {
	10_000
}
