pub mod memory;
pub mod snapshot;

mod error;

pub use error::{Error, Result};
pub use memory::{IngestReport, MemoryStore};

use std::{future::Future, pin::Pin};

use comps_domain::{Property, PropertyKey, PropertyType};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Candidate pool selection passed to [`PropertyStore::query_candidates`].
#[derive(Clone, Debug, Default)]
pub struct CandidateFilter {
	/// Restricts the pool to one county; `None` spans every county.
	pub county: Option<String>,
	/// Accepted property types; empty accepts any typed or untyped record.
	pub property_types: Vec<PropertyType>,
	pub exclude: Option<PropertyKey>,
}
impl CandidateFilter {
	pub fn matches(&self, property: &Property) -> bool {
		if let Some(county) = self.county.as_deref()
			&& !property.county.eq_ignore_ascii_case(county)
		{
			return false;
		}
		if let Some(exclude) = self.exclude.as_ref()
			&& property.county == exclude.county
			&& property.id == exclude.id
		{
			return false;
		}
		if self.property_types.is_empty() {
			return true;
		}

		property.property_type.is_some_and(|kind| self.property_types.contains(&kind))
	}
}

/// Read interface over the property records the engine ranks.
pub trait PropertyStore
where
	Self: Send + Sync,
{
	fn get_property<'a>(&'a self, county: &'a str, id: &'a str) -> BoxFuture<'a, Result<Property>>;

	fn query_candidates<'a>(
		&'a self,
		filter: &'a CandidateFilter,
	) -> BoxFuture<'a, Result<Vec<Property>>>;
}
