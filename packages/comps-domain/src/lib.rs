pub mod confidence;
pub mod geo;
pub mod property;
pub mod quality;
pub mod similarity;

mod error;

pub use error::{Error, Result};
pub use property::{
	Address, Coordinates, DataQuality, FeatureValue, Financials, Property, PropertyKey,
	PropertySnapshot, PropertyType,
};

pub(crate) fn clamp_unit(value: f64) -> f32 {
	if value.is_nan() {
		return 0.0;
	}

	value.clamp(0.0, 1.0) as f32
}
