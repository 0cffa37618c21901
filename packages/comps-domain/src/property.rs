use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
	Residential,
	Commercial,
	Industrial,
	Land,
}
impl PropertyType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Residential => "residential",
			Self::Commercial => "commercial",
			Self::Industrial => "industrial",
			Self::Land => "land",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"residential" => Some(Self::Residential),
			"commercial" => Some(Self::Commercial),
			"industrial" => Some(Self::Industrial),
			"land" => Some(Self::Land),
			_ => None,
		}
	}
}
impl fmt::Display for PropertyType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Ordered from best to worst so that `max` picks the more degraded indicator.
#[derive(
	Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
	#[default]
	Complete,
	Partial,
	Suspect,
}
impl DataQuality {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Complete => "complete",
			Self::Partial => "partial",
			Self::Suspect => "suspect",
		}
	}

	pub fn worst(self, other: Self) -> Self {
		self.max(other)
	}
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PropertyKey {
	pub county: String,
	pub id: String,
}
impl PropertyKey {
	pub fn new(county: impl Into<String>, id: impl Into<String>) -> Self {
		Self { county: county.into(), id: id.into() }
	}
}
impl fmt::Display for PropertyKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.county, self.id)
	}
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Coordinates {
	pub latitude: f64,
	pub longitude: f64,
}
impl Coordinates {
	pub fn new(latitude: f64, longitude: f64) -> Self {
		Self { latitude, longitude }
	}

	pub fn is_valid(&self) -> bool {
		self.latitude.is_finite()
			&& self.longitude.is_finite()
			&& (-90.0..=90.0).contains(&self.latitude)
			&& (-180.0..=180.0).contains(&self.longitude)
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Address {
	pub street: Option<String>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub zip_code: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Financials {
	pub assessed_value: Option<f64>,
	pub market_value: Option<f64>,
	pub tax_amount: Option<f64>,
}

/// Value of an attribute outside the fixed schema, e.g. `loading_docks = 4`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
	Flag(bool),
	Number(f64),
	Text(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Property {
	pub county: String,
	pub id: String,
	#[serde(default)]
	pub address: Address,
	pub coordinates: Option<Coordinates>,
	pub property_type: Option<PropertyType>,
	/// Finer classification within the property type, e.g. "warehouse".
	pub subtype: Option<String>,
	pub zoning: Option<String>,
	pub square_feet: Option<f64>,
	pub lot_size: Option<f64>,
	pub year_built: Option<i32>,
	#[serde(default)]
	pub financials: Financials,
	#[serde(default)]
	pub features: BTreeMap<String, FeatureValue>,
	#[serde(default)]
	pub data_quality: DataQuality,
	/// Ingestion version; bumped by the store on re-ingestion.
	#[serde(default = "default_version")]
	pub version: u32,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl Property {
	pub fn key(&self) -> PropertyKey {
		PropertyKey::new(self.county.clone(), self.id.clone())
	}

	pub fn is_same(&self, other: &Property) -> bool {
		self.county == other.county && self.id == other.id
	}
}

/// Full property set published under one version tag.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PropertySnapshot {
	pub version: String,
	pub properties: Vec<Property>,
}

fn default_version() -> u32 {
	1
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn data_quality_worst_prefers_degraded() {
		assert_eq!(DataQuality::Complete.worst(DataQuality::Partial), DataQuality::Partial);
		assert_eq!(DataQuality::Suspect.worst(DataQuality::Partial), DataQuality::Suspect);
		assert_eq!(DataQuality::Complete.worst(DataQuality::Complete), DataQuality::Complete);
	}

	#[test]
	fn property_type_parse_is_case_insensitive() {
		assert_eq!(PropertyType::parse(" Industrial "), Some(PropertyType::Industrial));
		assert_eq!(PropertyType::parse("warehouse"), None);
	}

	#[test]
	fn coordinates_reject_out_of_range_values() {
		assert!(Coordinates::new(41.88, -87.63).is_valid());
		assert!(!Coordinates::new(91.0, 0.0).is_valid());
		assert!(!Coordinates::new(0.0, f64::NAN).is_valid());
	}

	#[test]
	fn key_orders_by_county_then_id() {
		let mut keys =
			vec![PropertyKey::new("dallas", "2"), PropertyKey::new("cook", "9"), PropertyKey::new("cook", "10")];

		keys.sort();

		assert_eq!(keys[0].to_string(), "cook/10");
		assert_eq!(keys[1].to_string(), "cook/9");
		assert_eq!(keys[2].to_string(), "dallas/2");
	}
}
