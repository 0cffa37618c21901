use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
	Coordinates, Error, FeatureValue, Property, PropertyType, Result, clamp_unit,
	geo::haversine_miles,
};

#[derive(Clone, Debug)]
pub struct BlendWeights {
	pub size: f32,
	pub location: f32,
	pub age: f32,
	pub property_type: f32,
	pub features: f32,
}

#[derive(Clone, Debug)]
pub struct SizePolicy {
	pub saturation_ratio: f64,
	pub building_weight: f32,
	pub lot_weight: f32,
}

#[derive(Clone, Debug)]
pub struct LocationPolicy {
	pub distance_scale_miles: f64,
	pub max_radius_miles: f64,
	pub market_weight: f32,
	pub zip_mismatch_factor: f32,
	pub city_mismatch_factor: f32,
	pub county_mismatch_factor: f32,
}

#[derive(Clone, Debug)]
pub struct TypePolicy {
	pub subtype_mismatch_score: f32,
	pub related_type_score: f32,
	pub related: Vec<(PropertyType, PropertyType)>,
	pub zoning_mismatch_factor: f32,
}

#[derive(Clone, Debug)]
pub struct SimilarityPolicy {
	pub weights: BlendWeights,
	pub size: SizePolicy,
	pub location: LocationPolicy,
	pub age_saturation_years: u32,
	pub property_type: TypePolicy,
	pub numeric_feature_partial_credit: bool,
}
impl SimilarityPolicy {
	pub fn from_config(cfg: &comps_config::Similarity) -> Self {
		let related = cfg
			.property_type
			.related
			.iter()
			.filter_map(|(left, right)| {
				Some((PropertyType::parse(left)?, PropertyType::parse(right)?))
			})
			.collect();

		Self {
			weights: BlendWeights {
				size: cfg.weights.size,
				location: cfg.weights.location,
				age: cfg.weights.age,
				property_type: cfg.weights.property_type,
				features: cfg.weights.features,
			},
			size: SizePolicy {
				saturation_ratio: cfg.size.saturation_ratio,
				building_weight: cfg.size.building_weight,
				lot_weight: cfg.size.lot_weight,
			},
			location: LocationPolicy {
				distance_scale_miles: cfg.location.distance_scale_miles,
				max_radius_miles: cfg.location.max_radius_miles,
				market_weight: cfg.location.market_weight,
				zip_mismatch_factor: cfg.location.zip_mismatch_factor,
				city_mismatch_factor: cfg.location.city_mismatch_factor,
				county_mismatch_factor: cfg.location.county_mismatch_factor,
			},
			age_saturation_years: cfg.age.saturation_years,
			property_type: TypePolicy {
				subtype_mismatch_score: cfg.property_type.subtype_mismatch_score,
				related_type_score: cfg.property_type.related_type_score,
				related,
				zoning_mismatch_factor: cfg.property_type.zoning_mismatch_factor,
			},
			numeric_feature_partial_credit: cfg.features.numeric_partial_credit,
		}
	}

	/// Narrows the hard radius filter for a single query; never widens it.
	pub fn with_max_radius(mut self, max_radius_miles: Option<f64>) -> Self {
		if let Some(radius) = max_radius_miles
			&& radius.is_finite()
			&& radius >= 0.0
		{
			self.location.max_radius_miles = self.location.max_radius_miles.min(radius);
		}

		self
	}

	fn types_related(&self, left: PropertyType, right: PropertyType) -> bool {
		self.property_type
			.related
			.iter()
			.any(|(a, b)| (*a == left && *b == right) || (*a == right && *b == left))
	}
}

/// Per-dimension sub-scores. `None` marks a dimension excluded for missing data.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SimilarityVector {
	pub size: Option<f32>,
	pub location: Option<f32>,
	pub age: Option<f32>,
	pub property_type: Option<f32>,
	pub features: Option<f32>,
}
impl SimilarityVector {
	pub fn missing_dimensions(&self) -> u32 {
		[self.size, self.location, self.age, self.property_type, self.features]
			.iter()
			.filter(|score| score.is_none())
			.count() as u32
	}

	/// Convex combination of the present sub-scores with weights renormalized over them.
	pub fn blend(&self, weights: &BlendWeights) -> f32 {
		let mut weighted = 0.0_f64;
		let mut total_weight = 0.0_f64;

		for (score, weight) in [
			(self.size, weights.size),
			(self.location, weights.location),
			(self.age, weights.age),
			(self.property_type, weights.property_type),
			(self.features, weights.features),
		] {
			let Some(score) = score else {
				continue;
			};

			weighted += f64::from(score) * f64::from(weight);
			total_weight += f64::from(weight);
		}

		if total_weight <= 0.0 {
			return 0.0;
		}

		clamp_unit(weighted / total_weight)
	}
}

/// Why a candidate was removed from the pool before scoring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Exclusion {
	SameProperty,
	MissingCoordinates,
	MissingType,
	OutsideRadius { distance_miles: f64 },
	UnrelatedType,
}
impl Exclusion {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::SameProperty => "same_property",
			Self::MissingCoordinates => "missing_coordinates",
			Self::MissingType => "missing_type",
			Self::OutsideRadius { .. } => "outside_radius",
			Self::UnrelatedType => "unrelated_type",
		}
	}
}

#[derive(Clone, Debug)]
pub struct CandidateMatch<'a> {
	pub candidate: &'a Property,
	pub vector: SimilarityVector,
	pub score: f32,
	pub distance_miles: f64,
}

/// Subject fields every hard filter depends on.
#[derive(Clone, Copy, Debug)]
pub struct SubjectAnchor {
	pub coordinates: Coordinates,
	pub property_type: PropertyType,
}

#[derive(Clone, Debug)]
pub struct SimilarityEngine {
	policy: SimilarityPolicy,
}
impl SimilarityEngine {
	pub fn new(policy: SimilarityPolicy) -> Self {
		Self { policy }
	}

	pub fn policy(&self) -> &SimilarityPolicy {
		&self.policy
	}

	pub fn anchor(subject: &Property) -> Result<SubjectAnchor> {
		let Some(coordinates) = subject.coordinates else {
			return Err(Error::InvalidArgument {
				message: format!("Subject {} is missing coordinates.", subject.key()),
			});
		};

		if !coordinates.is_valid() {
			return Err(Error::InvalidArgument {
				message: format!("Subject {} has out-of-range coordinates.", subject.key()),
			});
		}

		let Some(property_type) = subject.property_type else {
			return Err(Error::InvalidArgument {
				message: format!("Subject {} is missing a property type.", subject.key()),
			});
		};

		Ok(SubjectAnchor { coordinates, property_type })
	}

	/// Scores every candidate that passes the hard filters. Order follows the pool.
	pub fn score_pool<'a>(
		&self,
		subject: &Property,
		pool: &'a [Property],
	) -> Result<Vec<CandidateMatch<'a>>> {
		let anchor = Self::anchor(subject)?;

		Ok(pool
			.iter()
			.filter_map(|candidate| self.evaluate_anchored(subject, anchor, candidate).ok())
			.collect())
	}

	pub fn evaluate<'a>(
		&self,
		subject: &Property,
		candidate: &'a Property,
	) -> Result<std::result::Result<CandidateMatch<'a>, Exclusion>> {
		let anchor = Self::anchor(subject)?;

		Ok(self.evaluate_anchored(subject, anchor, candidate))
	}

	pub fn evaluate_anchored<'a>(
		&self,
		subject: &Property,
		anchor: SubjectAnchor,
		candidate: &'a Property,
	) -> std::result::Result<CandidateMatch<'a>, Exclusion> {
		if subject.is_same(candidate) {
			return Err(Exclusion::SameProperty);
		}

		let Some(coordinates) = candidate.coordinates.filter(Coordinates::is_valid) else {
			return Err(Exclusion::MissingCoordinates);
		};
		let Some(candidate_type) = candidate.property_type else {
			return Err(Exclusion::MissingType);
		};
		let distance_miles = haversine_miles(anchor.coordinates, coordinates);

		if distance_miles > self.policy.location.max_radius_miles {
			return Err(Exclusion::OutsideRadius { distance_miles });
		}

		let property_type = self.type_score(subject, anchor.property_type, candidate, candidate_type)?;
		let vector = SimilarityVector {
			size: self.size_score(subject, candidate),
			location: Some(self.location_score(subject, candidate, distance_miles)),
			age: self.age_score(subject, candidate),
			property_type: Some(property_type),
			features: self.feature_score(subject, candidate),
		};
		let score = vector.blend(&self.policy.weights);

		Ok(CandidateMatch { candidate, vector, score, distance_miles })
	}

	fn size_score(&self, subject: &Property, candidate: &Property) -> Option<f32> {
		let policy = &self.policy.size;
		let building = relative_similarity(
			subject.square_feet,
			candidate.square_feet,
			policy.saturation_ratio,
		);
		let lot = relative_similarity(subject.lot_size, candidate.lot_size, policy.saturation_ratio);

		match (building, lot) {
			(Some(building), Some(lot)) => {
				let total = f64::from(policy.building_weight) + f64::from(policy.lot_weight);

				if total <= 0.0 {
					return Some(clamp_unit(building));
				}

				Some(clamp_unit(
					(building * f64::from(policy.building_weight)
						+ lot * f64::from(policy.lot_weight))
						/ total,
				))
			},
			(Some(building), None) => Some(clamp_unit(building)),
			(None, Some(lot)) => Some(clamp_unit(lot)),
			(None, None) => None,
		}
	}

	fn location_score(&self, subject: &Property, candidate: &Property, distance_miles: f64) -> f32 {
		let policy = &self.policy.location;
		let distance_score = 1.0 / (1.0 + distance_miles / policy.distance_scale_miles);
		let mut market = 1.0_f64;

		if differs(subject.address.zip_code.as_deref(), candidate.address.zip_code.as_deref()) {
			market *= f64::from(policy.zip_mismatch_factor);
		}
		if differs(subject.address.city.as_deref(), candidate.address.city.as_deref()) {
			market *= f64::from(policy.city_mismatch_factor);
		}
		if differs(Some(subject.county.as_str()), Some(candidate.county.as_str())) {
			market *= f64::from(policy.county_mismatch_factor);
		}

		let market_weight = f64::from(policy.market_weight);

		clamp_unit(distance_score * (1.0 - market_weight) + market * market_weight)
	}

	fn age_score(&self, subject: &Property, candidate: &Property) -> Option<f32> {
		let (Some(subject_year), Some(candidate_year)) = (subject.year_built, candidate.year_built)
		else {
			return None;
		};
		let diff = f64::from((subject_year - candidate_year).unsigned_abs());

		Some(clamp_unit(1.0 - diff / f64::from(self.policy.age_saturation_years)))
	}

	fn type_score(
		&self,
		subject: &Property,
		subject_type: PropertyType,
		candidate: &Property,
		candidate_type: PropertyType,
	) -> std::result::Result<f32, Exclusion> {
		let policy = &self.policy.property_type;
		let base = if subject_type == candidate_type {
			if differs(subject.subtype.as_deref(), candidate.subtype.as_deref()) {
				policy.subtype_mismatch_score
			} else {
				1.0
			}
		} else if self.policy.types_related(subject_type, candidate_type) {
			policy.related_type_score
		} else {
			return Err(Exclusion::UnrelatedType);
		};
		let zoning = if differs(subject.zoning.as_deref(), candidate.zoning.as_deref()) {
			policy.zoning_mismatch_factor
		} else {
			1.0
		};

		Ok(clamp_unit(f64::from(base) * f64::from(zoning)))
	}

	fn feature_score(&self, subject: &Property, candidate: &Property) -> Option<f32> {
		if subject.features.is_empty() || candidate.features.is_empty() {
			return None;
		}

		let union = subject
			.features
			.keys()
			.chain(candidate.features.keys())
			.collect::<BTreeSet<_>>()
			.len();
		let matched = subject
			.features
			.iter()
			.filter_map(|(key, value)| {
				let other = candidate.features.get(key)?;

				Some(feature_value_similarity(
					value,
					other,
					self.policy.numeric_feature_partial_credit,
				))
			})
			.sum::<f64>();

		Some(clamp_unit(matched / union as f64))
	}
}

fn relative_similarity(subject: Option<f64>, candidate: Option<f64>, saturation: f64) -> Option<f64> {
	let subject = subject.filter(|value| value.is_finite() && *value > 0.0)?;
	let candidate = candidate.filter(|value| value.is_finite() && *value > 0.0)?;
	let diff = (candidate - subject).abs() / subject;

	Some((1.0 - diff / saturation).clamp(0.0, 1.0))
}

fn feature_value_similarity(left: &FeatureValue, right: &FeatureValue, partial_credit: bool) -> f64 {
	match (left, right) {
		(FeatureValue::Number(a), FeatureValue::Number(b)) if partial_credit => {
			let larger = a.abs().max(b.abs());

			if larger == 0.0 {
				return 1.0;
			}

			1.0 - ((a - b).abs() / larger).min(1.0)
		},
		(FeatureValue::Text(a), FeatureValue::Text(b)) =>
			if a.trim().eq_ignore_ascii_case(b.trim()) {
				1.0
			} else {
				0.0
			},
		_ =>
			if left == right {
				1.0
			} else {
				0.0
			},
	}
}

/// True only when both sides are known and disagree.
fn differs(left: Option<&str>, right: Option<&str>) -> bool {
	match (left, right) {
		(Some(left), Some(right)) => !left.trim().eq_ignore_ascii_case(right.trim()),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn weights() -> BlendWeights {
		BlendWeights { size: 0.25, location: 0.25, age: 0.15, property_type: 0.2, features: 0.15 }
	}

	#[test]
	fn blend_redistributes_missing_weight() {
		let vector = SimilarityVector {
			size: Some(1.0),
			location: Some(0.5),
			age: None,
			property_type: Some(1.0),
			features: None,
		};
		let expected = (0.25 * 1.0 + 0.25 * 0.5 + 0.2 * 1.0) / (0.25 + 0.25 + 0.2);

		assert!((vector.blend(&weights()) - expected).abs() < 1e-6);
		assert_eq!(vector.missing_dimensions(), 2);
	}

	#[test]
	fn blend_of_empty_vector_is_zero() {
		assert_eq!(SimilarityVector::default().blend(&weights()), 0.0);
	}

	#[test]
	fn relative_similarity_saturates() {
		assert_eq!(relative_similarity(Some(10_000.0), Some(10_000.0), 1.0), Some(1.0));
		assert_eq!(relative_similarity(Some(10_000.0), Some(30_000.0), 1.0), Some(0.0));
		assert_eq!(relative_similarity(Some(10_000.0), Some(15_000.0), 0.5), Some(0.0));
		assert_eq!(relative_similarity(Some(0.0), Some(15_000.0), 1.0), None);
		assert_eq!(relative_similarity(None, Some(15_000.0), 1.0), None);
	}

	#[test]
	fn numeric_features_earn_partial_credit() {
		let a = FeatureValue::Number(4.0);
		let b = FeatureValue::Number(3.0);

		assert!((feature_value_similarity(&a, &b, true) - 0.75).abs() < 1e-9);
		assert_eq!(feature_value_similarity(&a, &b, false), 0.0);
		assert_eq!(
			feature_value_similarity(
				&FeatureValue::Text("Tilt-Up ".to_string()),
				&FeatureValue::Text("tilt-up".to_string()),
				true
			),
			1.0
		);
		assert_eq!(feature_value_similarity(&FeatureValue::Flag(true), &a, true), 0.0);
	}

	#[test]
	fn differs_ignores_unknown_sides() {
		assert!(!differs(None, Some("60601")));
		assert!(!differs(Some("Chicago"), Some("chicago")));
		assert!(differs(Some("60601"), Some("60602")));
	}
}
