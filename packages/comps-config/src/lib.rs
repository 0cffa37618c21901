mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	AgeSimilarity, Confidence, Config, FeatureSimilarity, LocationSimilarity, Polling, Ranking,
	Service, Similarity, SimilarityWeights, SizeSimilarity, Store, TypeSimilarity,
};

use std::{fs, path::Path};

pub const PROPERTY_TYPES: [&str; 4] = ["residential", "commercial", "industrial", "land"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	validate_similarity(&cfg.similarity)?;
	validate_confidence(&cfg.confidence)?;
	validate_ranking(&cfg.ranking)?;

	if let Some(polling) = cfg.polling.as_ref() {
		validate_polling(polling)?;
	}

	Ok(())
}

pub fn validate_polling(polling: &Polling) -> Result<()> {
	if polling.endpoint.trim().is_empty() {
		return Err(Error::Validation {
			message: "polling.endpoint must be non-empty.".to_string(),
		});
	}
	if polling.min_interval_ms == 0 {
		return Err(Error::Validation {
			message: "polling.min_interval_ms must be greater than zero.".to_string(),
		});
	}
	if polling.min_interval_ms > polling.max_interval_ms {
		return Err(Error::Validation {
			message: "polling.min_interval_ms must not exceed polling.max_interval_ms."
				.to_string(),
		});
	}
	if !(polling.min_interval_ms..=polling.max_interval_ms).contains(&polling.base_interval_ms) {
		return Err(Error::Validation {
			message: "polling.base_interval_ms must lie within polling.min_interval_ms and polling.max_interval_ms."
				.to_string(),
		});
	}
	if !polling.backoff_multiplier.is_finite() || polling.backoff_multiplier <= 1.0 {
		return Err(Error::Validation {
			message: "polling.backoff_multiplier must be a finite number greater than 1.0."
				.to_string(),
		});
	}
	if polling.max_consecutive_failures == 0 {
		return Err(Error::Validation {
			message: "polling.max_consecutive_failures must be greater than zero.".to_string(),
		});
	}
	if polling.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "polling.timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_similarity(similarity: &Similarity) -> Result<()> {
	let weights = &similarity.weights;
	let mut total = 0.0_f32;

	for (label, weight) in [
		("size", weights.size),
		("location", weights.location),
		("age", weights.age),
		("property_type", weights.property_type),
		("features", weights.features),
	] {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::Validation {
				message: format!(
					"similarity.weights.{label} must be a finite number zero or greater."
				),
			});
		}

		total += weight;
	}

	if total <= 0.0 {
		return Err(Error::Validation {
			message: "similarity.weights must sum to a positive value.".to_string(),
		});
	}

	let size = &similarity.size;

	if !size.saturation_ratio.is_finite() || size.saturation_ratio <= 0.0 {
		return Err(Error::Validation {
			message: "similarity.size.saturation_ratio must be a finite number greater than zero."
				.to_string(),
		});
	}

	for (label, value) in
		[("building_weight", size.building_weight), ("lot_weight", size.lot_weight)]
	{
		ensure_unit_range(&format!("similarity.size.{label}"), value)?;
	}

	if size.building_weight + size.lot_weight <= 0.0 {
		return Err(Error::Validation {
			message: "similarity.size.building_weight and lot_weight must not both be zero."
				.to_string(),
		});
	}

	let location = &similarity.location;

	for (label, value) in [
		("distance_scale_miles", location.distance_scale_miles),
		("max_radius_miles", location.max_radius_miles),
	] {
		if !value.is_finite() || value <= 0.0 {
			return Err(Error::Validation {
				message: format!(
					"similarity.location.{label} must be a finite number greater than zero."
				),
			});
		}
	}
	for (label, value) in [
		("market_weight", location.market_weight),
		("zip_mismatch_factor", location.zip_mismatch_factor),
		("city_mismatch_factor", location.city_mismatch_factor),
		("county_mismatch_factor", location.county_mismatch_factor),
	] {
		ensure_unit_range(&format!("similarity.location.{label}"), value)?;
	}

	if similarity.age.saturation_years == 0 {
		return Err(Error::Validation {
			message: "similarity.age.saturation_years must be greater than zero.".to_string(),
		});
	}

	let property_type = &similarity.property_type;

	for (label, value) in [
		("subtype_mismatch_score", property_type.subtype_mismatch_score),
		("related_type_score", property_type.related_type_score),
		("zoning_mismatch_factor", property_type.zoning_mismatch_factor),
	] {
		ensure_unit_range(&format!("similarity.property_type.{label}"), value)?;
	}

	for (left, right) in &property_type.related {
		for name in [left, right] {
			if !PROPERTY_TYPES.contains(&name.as_str()) {
				return Err(Error::Validation {
					message: format!(
						"similarity.property_type.related contains unknown property type {name:?}."
					),
				});
			}
		}

		if left == right {
			return Err(Error::Validation {
				message: "similarity.property_type.related pairs must name two different types."
					.to_string(),
			});
		}
	}

	Ok(())
}

fn validate_confidence(confidence: &Confidence) -> Result<()> {
	for (label, value) in [
		("partial_penalty", confidence.partial_penalty),
		("suspect_penalty", confidence.suspect_penalty),
		("missing_dimension_penalty", confidence.missing_dimension_penalty),
	] {
		if !value.is_finite() || !(0.0..1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("confidence.{label} must be in the range 0.0 (inclusive) to 1.0 (exclusive)."),
			});
		}
	}

	if confidence.suspect_penalty < confidence.partial_penalty {
		return Err(Error::Validation {
			message: "confidence.suspect_penalty must be at least confidence.partial_penalty."
				.to_string(),
		});
	}
	if !confidence.floor.is_finite() || confidence.floor <= 0.0 || confidence.floor > 1.0 {
		return Err(Error::Validation {
			message: "confidence.floor must be greater than 0.0 and at most 1.0.".to_string(),
		});
	}

	Ok(())
}

fn validate_ranking(ranking: &Ranking) -> Result<()> {
	if ranking.max_k == 0 {
		return Err(Error::Validation {
			message: "ranking.max_k must be greater than zero.".to_string(),
		});
	}
	if ranking.default_k == 0 || ranking.default_k > ranking.max_k {
		return Err(Error::Validation {
			message: "ranking.default_k must be between 1 and ranking.max_k.".to_string(),
		});
	}

	ensure_unit_range("ranking.min_similarity", ranking.min_similarity)?;

	if ranking.analysis_version.trim().is_empty() {
		return Err(Error::Validation {
			message: "ranking.analysis_version must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn ensure_unit_range(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.store
		.snapshot_path
		.as_deref()
		.map(|path| path.as_os_str().to_string_lossy().trim().is_empty())
		.unwrap_or(false)
	{
		cfg.store.snapshot_path = None;
	}
	if let Some(polling) = cfg.polling.as_mut() {
		let trimmed = polling.endpoint.trim().trim_end_matches('/').to_string();

		polling.endpoint = trimmed;
	}

	for (left, right) in &mut cfg.similarity.property_type.related {
		*left = left.trim().to_ascii_lowercase();
		*right = right.trim().to_ascii_lowercase();
	}
}
