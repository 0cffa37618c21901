use crate::Coordinates;

pub const EARTH_RADIUS_MILES: f64 = 3_959.874_33;

/// Great-circle distance between two points.
pub fn haversine_miles(from: Coordinates, to: Coordinates) -> f64 {
	let lat1 = from.latitude.to_radians();
	let lat2 = to.latitude.to_radians();
	let dlat = lat2 - lat1;
	let dlon = (to.longitude - from.longitude).to_radians();
	let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
	let c = 2.0 * a.sqrt().min(1.0).asin();

	EARTH_RADIUS_MILES * c
}
