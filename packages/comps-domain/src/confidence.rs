use crate::{DataQuality, clamp_unit, similarity::SimilarityVector};

#[derive(Clone, Debug)]
pub struct ConfidencePolicy {
	pub partial_penalty: f32,
	pub suspect_penalty: f32,
	pub missing_dimension_penalty: f32,
	pub floor: f32,
}
impl ConfidencePolicy {
	pub fn from_config(cfg: &comps_config::Confidence) -> Self {
		Self {
			partial_penalty: cfg.partial_penalty,
			suspect_penalty: cfg.suspect_penalty,
			missing_dimension_penalty: cfg.missing_dimension_penalty,
			floor: cfg.floor,
		}
	}

	fn quality_multiplier(&self, quality: DataQuality) -> f64 {
		match quality {
			DataQuality::Complete => 1.0,
			DataQuality::Partial => 1.0 - f64::from(self.partial_penalty),
			DataQuality::Suspect => 1.0 - f64::from(self.suspect_penalty),
		}
	}
}

/// Discount applied to the blended score, in `[floor, 1]`.
pub fn quality_factor(
	policy: &ConfidencePolicy,
	subject: DataQuality,
	candidate: DataQuality,
	missing_dimensions: u32,
) -> f32 {
	let mut factor = policy.quality_multiplier(subject) * policy.quality_multiplier(candidate);

	for _ in 0..missing_dimensions {
		factor *= 1.0 - f64::from(policy.missing_dimension_penalty);
	}

	let floor = f64::from(policy.floor).clamp(0.0, 1.0);

	clamp_unit(factor.max(floor))
}

/// Confidence only ever discounts the blended score.
pub fn score_confidence(
	policy: &ConfidencePolicy,
	blended: f32,
	vector: &SimilarityVector,
	subject: DataQuality,
	candidate: DataQuality,
) -> f32 {
	let blended = clamp_unit(f64::from(blended));
	let factor = quality_factor(policy, subject, candidate, vector.missing_dimensions());

	clamp_unit(f64::from(blended) * f64::from(factor)).min(blended)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy() -> ConfidencePolicy {
		ConfidencePolicy {
			partial_penalty: 0.15,
			suspect_penalty: 0.4,
			missing_dimension_penalty: 0.05,
			floor: 0.1,
		}
	}

	fn full_vector() -> SimilarityVector {
		SimilarityVector {
			size: Some(1.0),
			location: Some(1.0),
			age: Some(1.0),
			property_type: Some(1.0),
			features: Some(1.0),
		}
	}

	#[test]
	fn complete_pair_keeps_blended_score() {
		let confidence = score_confidence(
			&policy(),
			0.8,
			&full_vector(),
			DataQuality::Complete,
			DataQuality::Complete,
		);

		assert!((confidence - 0.8).abs() < 1e-6);
	}

	#[test]
	fn penalties_multiply_per_side() {
		let factor = quality_factor(&policy(), DataQuality::Partial, DataQuality::Suspect, 0);

		assert!((factor - 0.85 * 0.6).abs() < 1e-6);
	}

	#[test]
	fn factor_is_floored() {
		let harsh = ConfidencePolicy { suspect_penalty: 0.95, ..policy() };
		let factor = quality_factor(&harsh, DataQuality::Suspect, DataQuality::Suspect, 5);

		assert!((factor - 0.1).abs() < 1e-6);
	}

	#[test]
	fn degradation_never_raises_confidence() {
		let qualities = [DataQuality::Complete, DataQuality::Partial, DataQuality::Suspect];
		let vector = full_vector();

		for subject in qualities {
			let mut previous = f32::INFINITY;

			for candidate in qualities {
				let confidence = score_confidence(&policy(), 0.9, &vector, subject, candidate);

				assert!(confidence <= previous, "{subject:?}/{candidate:?} raised confidence");
				assert!(confidence <= 0.9);

				previous = confidence;
			}
		}
	}

	#[test]
	fn missing_dimensions_discount_confidence() {
		let mut vector = full_vector();

		vector.age = None;
		vector.features = None;

		let confidence =
			score_confidence(&policy(), 1.0, &vector, DataQuality::Complete, DataQuality::Complete);

		assert!((confidence - 0.95 * 0.95).abs() < 1e-6);
	}
}
