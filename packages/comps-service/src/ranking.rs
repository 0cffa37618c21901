use std::cmp::Ordering;

use serde::Serialize;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};
use comps_domain::{
	DataQuality, Property,
	confidence::{ConfidencePolicy, score_confidence},
	similarity::{CandidateMatch, SimilarityEngine, SimilarityPolicy, SimilarityVector},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparableResult {
	pub county: String,
	pub id: String,
	/// One-based position in the ranked output.
	pub rank: u32,
	pub score: f32,
	pub confidence: f32,
	pub distance_miles: f64,
	pub sub_scores: SimilarityVector,
	pub data_quality: DataQuality,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}

pub struct RankArgs<'a> {
	pub subject: &'a Property,
	pub pool: &'a [Property],
	pub k: usize,
	pub min_similarity: f32,
	pub max_distance_miles: Option<f64>,
}

#[derive(Debug)]
pub struct Ranked {
	pub results: Vec<ComparableResult>,
	/// Candidates removed by a hard filter.
	pub excluded: usize,
	/// Candidates scored but below the minimum similarity.
	pub below_threshold: usize,
}

struct Scored<'a> {
	hit: CandidateMatch<'a>,
	confidence: f32,
}

/// Scores `pool` against the subject and returns the top `k` in tie-break order.
///
/// Cancellation is checked per candidate; a cancelled query yields no partial output.
pub fn rank(
	similarity: &SimilarityPolicy,
	confidence_policy: &ConfidencePolicy,
	args: RankArgs<'_>,
	cancel: &CancellationToken,
) -> Result<Ranked> {
	if args.k == 0 {
		return Err(Error::InvalidArgument { message: "k must be a positive integer.".to_string() });
	}

	let engine = SimilarityEngine::new(similarity.clone().with_max_radius(args.max_distance_miles));
	let anchor = SimilarityEngine::anchor(args.subject)?;
	let mut scored = Vec::new();
	let mut excluded = 0;
	let mut below_threshold = 0;

	for candidate in args.pool {
		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		match engine.evaluate_anchored(args.subject, anchor, candidate) {
			Ok(hit) if hit.score < args.min_similarity => below_threshold += 1,
			Ok(hit) => {
				let confidence = score_confidence(
					confidence_policy,
					hit.score,
					&hit.vector,
					args.subject.data_quality,
					candidate.data_quality,
				);

				scored.push(Scored { hit, confidence });
			},
			Err(exclusion) => {
				excluded += 1;

				tracing::trace!(
					candidate = %candidate.key(),
					reason = exclusion.as_str(),
					"Candidate excluded."
				);
			},
		}
	}

	scored.sort_by(cmp_scored);
	scored.truncate(args.k);

	let results = scored
		.into_iter()
		.enumerate()
		.map(|(idx, Scored { hit, confidence })| ComparableResult {
			county: hit.candidate.county.clone(),
			id: hit.candidate.id.clone(),
			rank: idx as u32 + 1,
			score: hit.score,
			confidence,
			distance_miles: hit.distance_miles,
			sub_scores: hit.vector,
			data_quality: hit.candidate.data_quality,
			updated_at: hit.candidate.updated_at,
		})
		.collect();

	Ok(Ranked { results, excluded, below_threshold })
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

// Score, confidence, distance, recency, then identity.
fn cmp_scored(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
	cmp_f32_desc(a.hit.score, b.hit.score)
		.then_with(|| cmp_f32_desc(a.confidence, b.confidence))
		.then_with(|| a.hit.distance_miles.total_cmp(&b.hit.distance_miles))
		.then_with(|| b.hit.candidate.updated_at.cmp(&a.hit.candidate.updated_at))
		.then_with(|| {
			let left = (a.hit.candidate.county.as_str(), a.hit.candidate.id.as_str());
			let right = (b.hit.candidate.county.as_str(), b.hit.candidate.id.as_str());

			left.cmp(&right)
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nan_sorts_last() {
		let mut values = vec![0.2, f32::NAN, 0.9, 0.5];

		values.sort_by(|a, b| cmp_f32_desc(*a, *b));

		assert_eq!(&values[..3], &[0.9, 0.5, 0.2]);
		assert!(values[3].is_nan());
	}

	#[test]
	fn zero_k_is_rejected_before_scoring() {
		let subject: Property = serde_json::from_value(serde_json::json!({
			"county": "cook",
			"id": "s",
			"updated_at": "2025-01-01T00:00:00Z"
		}))
		.expect("Fixture should deserialize.");
		let err = rank(
			&SimilarityPolicy::from_config(&Default::default()),
			&ConfidencePolicy::from_config(&Default::default()),
			RankArgs { subject: &subject, pool: &[], k: 0, min_similarity: 0.0, max_distance_miles: None },
			&CancellationToken::new(),
		)
		.expect_err("Expected invalid k.");

		assert!(matches!(err, Error::InvalidArgument { .. }));
	}
}
