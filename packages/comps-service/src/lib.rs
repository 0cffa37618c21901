pub mod comparables;
pub mod ranking;

mod error;

pub use comparables::{ComparableQuery, ComparableResult, ComparablesResponse};
pub use error::{Error, Result};
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use comps_config::Config;
use comps_domain::{confidence::ConfidencePolicy, similarity::SimilarityPolicy};
use comps_storage::PropertyStore;

#[derive(Clone, Debug)]
pub struct RankingPolicy {
	pub default_k: u32,
	pub max_k: u32,
	pub min_similarity: f32,
	pub analysis_version: String,
}
impl RankingPolicy {
	pub fn from_config(cfg: &comps_config::Ranking) -> Self {
		Self {
			default_k: cfg.default_k,
			max_k: cfg.max_k,
			min_similarity: cfg.min_similarity,
			analysis_version: cfg.analysis_version.clone(),
		}
	}
}

/// Ranks comparables for subjects drawn from, or scored against, a property store.
pub struct ComparablesService {
	pub store: Arc<dyn PropertyStore>,
	pub similarity: SimilarityPolicy,
	pub confidence: ConfidencePolicy,
	pub ranking: RankingPolicy,
}
impl ComparablesService {
	pub fn new(cfg: &Config, store: Arc<dyn PropertyStore>) -> Self {
		Self {
			store,
			similarity: SimilarityPolicy::from_config(&cfg.similarity),
			confidence: ConfidencePolicy::from_config(&cfg.confidence),
			ranking: RankingPolicy::from_config(&cfg.ranking),
		}
	}
}
