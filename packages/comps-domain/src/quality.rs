use crate::{DataQuality, Property};

pub const MIN_SQUARE_FEET: f64 = 1_000.0;
pub const MAX_SQUARE_FEET: f64 = 1_000_000.0;
pub const MIN_YEAR_BUILT: i32 = 1_800;

/// Derives a quality indicator from the record's own contents.
///
/// Out-of-range values make the record `Suspect`; missing optional attributes make it
/// `Partial`. `current_year` bounds `year_built` from above.
pub fn assess(property: &Property, current_year: i32) -> DataQuality {
	if has_suspect_values(property, current_year) {
		return DataQuality::Suspect;
	}
	if has_missing_values(property) {
		return DataQuality::Partial;
	}

	DataQuality::Complete
}

/// Worse of the declared indicator and the assessed one; ingestion never upgrades quality.
pub fn effective_quality(property: &Property, current_year: i32) -> DataQuality {
	property.data_quality.worst(assess(property, current_year))
}

fn has_suspect_values(property: &Property, current_year: i32) -> bool {
	if let Some(coordinates) = property.coordinates
		&& !coordinates.is_valid()
	{
		return true;
	}
	if let Some(square_feet) = property.square_feet
		&& (!square_feet.is_finite() || !(MIN_SQUARE_FEET..=MAX_SQUARE_FEET).contains(&square_feet))
	{
		return true;
	}
	if let Some(lot_size) = property.lot_size
		&& (!lot_size.is_finite() || lot_size <= 0.0)
	{
		return true;
	}
	if let Some(year_built) = property.year_built
		&& !(MIN_YEAR_BUILT..=current_year).contains(&year_built)
	{
		return true;
	}

	[property.financials.assessed_value, property.financials.market_value]
		.into_iter()
		.flatten()
		.any(|value| !value.is_finite() || value < 0.0)
}

fn has_missing_values(property: &Property) -> bool {
	property.coordinates.is_none()
		|| property.property_type.is_none()
		|| property.square_feet.is_none()
		|| property.lot_size.is_none()
		|| property.year_built.is_none()
		|| property.features.is_empty()
}
