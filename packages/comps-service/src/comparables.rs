use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
	ComparablesService, Error, Result,
	ranking::{self, RankArgs},
};
use comps_domain::{Property, PropertyKey, quality, similarity::SimilarityEngine};
use comps_storage::CandidateFilter;

pub use crate::ranking::ComparableResult;

/// Per-query overrides; unset fields fall back to the ranking configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ComparableQuery {
	pub k: Option<i64>,
	pub min_similarity: Option<f32>,
	pub max_distance_miles: Option<f64>,
	#[serde(default)]
	pub all_counties: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComparablesResponse {
	pub subject: PropertyKey,
	pub analysis_version: String,
	pub k: usize,
	pub candidates_considered: usize,
	pub excluded: usize,
	pub results: Vec<ComparableResult>,
}

impl ComparablesService {
	/// Looks the subject up in the store and ranks its comparables.
	pub async fn comparables_for(
		&self,
		county: &str,
		id: &str,
		query: &ComparableQuery,
		cancel: &CancellationToken,
	) -> Result<ComparablesResponse> {
		let subject = self.store.get_property(county, id).await?;

		self.comparables_for_subject(&subject, query, cancel).await
	}

	/// Ranks comparables for a subject that need not be stored.
	pub async fn comparables_for_subject(
		&self,
		subject: &Property,
		query: &ComparableQuery,
		cancel: &CancellationToken,
	) -> Result<ComparablesResponse> {
		let filter = self.pool_filter(subject, query.all_counties)?;

		self.find_comparables(subject, &filter, query, cancel).await
	}

	/// Default pool: the subject's county (unless widened), types the subject may be compared
	/// with, and never the subject itself.
	pub fn pool_filter(&self, subject: &Property, all_counties: bool) -> Result<CandidateFilter> {
		let anchor = SimilarityEngine::anchor(subject)?;
		let mut property_types = vec![anchor.property_type];

		for (left, right) in &self.similarity.property_type.related {
			let other = if *left == anchor.property_type {
				*right
			} else if *right == anchor.property_type {
				*left
			} else {
				continue;
			};

			if !property_types.contains(&other) {
				property_types.push(other);
			}
		}

		Ok(CandidateFilter {
			county: (!all_counties).then(|| subject.county.clone()),
			property_types,
			exclude: Some(subject.key()),
		})
	}

	pub async fn find_comparables(
		&self,
		subject: &Property,
		pool_filter: &CandidateFilter,
		query: &ComparableQuery,
		cancel: &CancellationToken,
	) -> Result<ComparablesResponse> {
		let k = self.resolve_k(query.k)?;
		let min_similarity = self.resolve_min_similarity(query.min_similarity)?;
		let max_distance_miles = resolve_max_distance(query.max_distance_miles)?;

		SimilarityEngine::anchor(subject)?;

		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let pool = self.store.query_candidates(pool_filter).await?;

		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let mut subject = subject.clone();

		subject.data_quality =
			quality::effective_quality(&subject, OffsetDateTime::now_utc().year());

		let ranked = ranking::rank(
			&self.similarity,
			&self.confidence,
			RankArgs { subject: &subject, pool: &pool, k, min_similarity, max_distance_miles },
			cancel,
		)?;

		tracing::info!(
			subject = %subject.key(),
			pool = pool.len(),
			excluded = ranked.excluded,
			below_threshold = ranked.below_threshold,
			returned = ranked.results.len(),
			k,
			"Ranked comparables."
		);

		Ok(ComparablesResponse {
			subject: subject.key(),
			analysis_version: self.ranking.analysis_version.clone(),
			k,
			candidates_considered: pool.len(),
			excluded: ranked.excluded,
			results: ranked.results,
		})
	}

	fn resolve_k(&self, k: Option<i64>) -> Result<usize> {
		let max_k = self.ranking.max_k;
		let k = k.unwrap_or(i64::from(self.ranking.default_k));

		if k <= 0 {
			return Err(Error::InvalidArgument {
				message: format!("k must be a positive integer; got {k}."),
			});
		}
		if k > i64::from(max_k) {
			return Err(Error::InvalidArgument {
				message: format!("k must be at most {max_k}; got {k}."),
			});
		}

		usize::try_from(k).map_err(|_| Error::InvalidArgument {
			message: format!("k is out of range; got {k}."),
		})
	}

	fn resolve_min_similarity(&self, min_similarity: Option<f32>) -> Result<f32> {
		let Some(value) = min_similarity else {
			return Ok(self.ranking.min_similarity);
		};

		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::InvalidArgument {
				message: "min_similarity must be between 0.0 and 1.0.".to_string(),
			});
		}

		Ok(value)
	}
}

fn resolve_max_distance(max_distance_miles: Option<f64>) -> Result<Option<f64>> {
	match max_distance_miles {
		Some(value) if !value.is_finite() || value <= 0.0 => Err(Error::InvalidArgument {
			message: "max_distance_miles must be a positive number.".to_string(),
		}),
		other => Ok(other),
	}
}
