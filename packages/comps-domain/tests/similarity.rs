use comps_domain::{
	DataQuality, Error, PropertyType,
	confidence::{ConfidencePolicy, score_confidence},
	quality::{assess, effective_quality},
	similarity::{Exclusion, SimilarityEngine, SimilarityPolicy},
};
use comps_testkit::PropertyBuilder;

const CURRENT_YEAR: i32 = 2025;

fn engine() -> SimilarityEngine {
	SimilarityEngine::new(default_policy())
}

fn default_policy() -> SimilarityPolicy {
	SimilarityPolicy::from_config(&comps_config::Similarity::default())
}

#[test]
fn nearby_industrial_candidate_outranks_distant_residential() {
	let subject = PropertyBuilder::new("cook", "subject").build();
	let near = PropertyBuilder::new("cook", "a")
		.coordinates(41.88, -87.64)
		.square_feet(Some(10_500.0))
		.build();
	let distant = PropertyBuilder::new("los_angeles", "b")
		.coordinates(34.0, -118.2)
		.square_feet(Some(2_000.0))
		.property_type(Some(PropertyType::Residential))
		.build();
	let pool = vec![near, distant];
	let matches = engine().score_pool(&subject, &pool).expect("Subject should be scorable.");

	assert_eq!(matches.len(), 1);

	let hit = &matches[0];

	assert_eq!(hit.candidate.id, "a");
	assert!(hit.distance_miles > 0.4 && hit.distance_miles < 0.6, "{}", hit.distance_miles);
	assert!(hit.score > 0.9, "Expected a strong match, got {}.", hit.score);
	assert!(hit.score <= 1.0);
	assert_eq!(hit.vector.property_type, Some(1.0));
	assert_eq!(hit.vector.missing_dimensions(), 0);
}

#[test]
fn unrelated_type_is_excluded_regardless_of_distance() {
	let mut policy = default_policy();

	policy.location.max_radius_miles = 5_000.0;

	let engine = SimilarityEngine::new(policy);
	let subject = PropertyBuilder::new("cook", "subject").build();
	let residential = PropertyBuilder::new("cook", "r")
		.property_type(Some(PropertyType::Residential))
		.build();
	let far_industrial = PropertyBuilder::new("los_angeles", "f").coordinates(34.0, -118.2).build();
	let outcome = engine.evaluate(&subject, &residential).expect("Subject should be scorable.");

	assert_eq!(outcome.map(|hit| hit.score).unwrap_err(), Exclusion::UnrelatedType);

	let outcome = engine.evaluate(&subject, &far_industrial).expect("Subject should be scorable.");

	assert!(outcome.is_ok(), "A widened radius should admit the distant candidate.");
}

#[test]
fn related_type_and_subtype_mismatch_reduce_type_score() {
	let subject = PropertyBuilder::new("cook", "subject").build();
	let commercial = PropertyBuilder::new("cook", "c")
		.property_type(Some(PropertyType::Commercial))
		.build();
	let flex = PropertyBuilder::new("cook", "x").subtype(Some("flex")).build();
	let rezoned = PropertyBuilder::new("cook", "z").zoning(Some("B2")).build();
	let engine = engine();
	let score_of = |candidate| {
		engine
			.evaluate(&subject, candidate)
			.expect("Subject should be scorable.")
			.map(|hit| hit.vector.property_type)
			.expect("Candidate should pass the hard filters.")
	};

	assert!((score_of(&commercial).unwrap_or_default() - 0.4).abs() < 1e-6);
	assert!((score_of(&flex).unwrap_or_default() - 0.7).abs() < 1e-6);
	assert!((score_of(&rezoned).unwrap_or_default() - 0.7).abs() < 1e-6);
}

#[test]
fn candidates_without_anchor_fields_are_excluded() {
	let subject = PropertyBuilder::new("cook", "subject").build();
	let unlocated = PropertyBuilder::new("cook", "u").no_coordinates().build();
	let untyped = PropertyBuilder::new("cook", "t").property_type(None).build();
	let engine = engine();

	assert_eq!(
		engine.evaluate(&subject, &unlocated).expect("Subject should be scorable.").err(),
		Some(Exclusion::MissingCoordinates)
	);
	assert_eq!(
		engine.evaluate(&subject, &untyped).expect("Subject should be scorable.").err(),
		Some(Exclusion::MissingType)
	);
	assert_eq!(
		engine.evaluate(&subject, &subject).expect("Subject should be scorable.").err(),
		Some(Exclusion::SameProperty)
	);
}

#[test]
fn subject_without_coordinates_is_rejected() {
	let subject = PropertyBuilder::new("cook", "subject").no_coordinates().build();
	let candidate = PropertyBuilder::new("cook", "a").build();
	let err = engine()
		.score_pool(&subject, std::slice::from_ref(&candidate))
		.expect_err("Expected invalid subject.");

	assert!(matches!(err, Error::InvalidArgument { .. }));
	assert!(err.to_string().contains("cook/subject"));
}

#[test]
fn missing_dimensions_are_dropped_not_zeroed() {
	let subject = PropertyBuilder::new("cook", "subject").build();
	let sparse = PropertyBuilder::new("cook", "s")
		.square_feet(None)
		.lot_size(None)
		.year_built(None)
		.no_features()
		.build();
	let hit = engine()
		.evaluate(&subject, &sparse)
		.expect("Subject should be scorable.")
		.expect("Sparse candidate should still be scored.");

	assert_eq!(hit.vector.size, None);
	assert_eq!(hit.vector.age, None);
	assert_eq!(hit.vector.features, None);
	assert_eq!(hit.vector.missing_dimensions(), 3);
	// Only location and type remain; both are near perfect for a same-site record.
	assert!(hit.score > 0.95, "{}", hit.score);
}

#[test]
fn query_radius_narrows_but_never_widens() {
	let subject = PropertyBuilder::new("cook", "subject").build();
	let near = PropertyBuilder::new("cook", "a").coordinates(41.88, -87.64).build();
	let narrowed = SimilarityEngine::new(default_policy().with_max_radius(Some(0.1)));

	assert!(matches!(
		narrowed.evaluate(&subject, &near).expect("Subject should be scorable."),
		Err(Exclusion::OutsideRadius { .. })
	));

	let widened = SimilarityEngine::new(default_policy().with_max_radius(Some(10_000.0)));

	assert_eq!(widened.policy().location.max_radius_miles, 50.0);
}

#[test]
fn market_area_mismatch_lowers_location_score() {
	let subject = PropertyBuilder::new("cook", "subject").build();
	let same_market = PropertyBuilder::new("cook", "m").build();
	let other_market = PropertyBuilder::new("dupage", "o")
		.city("Naperville")
		.zip_code("60540")
		.build();
	let engine = engine();
	let location_of = |candidate| {
		engine
			.evaluate(&subject, candidate)
			.expect("Subject should be scorable.")
			.map(|hit| hit.vector.location.unwrap_or_default())
			.expect("Candidate should pass the hard filters.")
	};
	let expected_other = 0.7 + 0.3 * (0.9 * 0.8 * 0.7);

	assert!((location_of(&same_market) - 1.0).abs() < 1e-6);
	assert!((location_of(&other_market) - expected_other).abs() < 1e-5);
}

#[test]
fn quality_assessment_flags_out_of_range_and_missing_values() {
	let complete = PropertyBuilder::new("cook", "ok").build();
	let tiny = PropertyBuilder::new("cook", "tiny").square_feet(Some(500.0)).build();
	let future = PropertyBuilder::new("cook", "future").year_built(Some(2090)).build();
	let no_lot = PropertyBuilder::new("cook", "lot").lot_size(None).build();
	let declared = PropertyBuilder::new("cook", "declared").quality(DataQuality::Suspect).build();

	assert_eq!(assess(&complete, CURRENT_YEAR), DataQuality::Complete);
	assert_eq!(assess(&tiny, CURRENT_YEAR), DataQuality::Suspect);
	assert_eq!(assess(&future, CURRENT_YEAR), DataQuality::Suspect);
	assert_eq!(assess(&no_lot, CURRENT_YEAR), DataQuality::Partial);
	assert_eq!(effective_quality(&declared, CURRENT_YEAR), DataQuality::Suspect);
	assert_eq!(
		effective_quality(
			&PropertyBuilder::new("cook", "p").lot_size(None).quality(DataQuality::Complete).build(),
			CURRENT_YEAR
		),
		DataQuality::Partial
	);
}

#[test]
fn degraded_candidate_confidence_trails_its_score() {
	let subject = PropertyBuilder::new("cook", "subject").build();
	let suspect = PropertyBuilder::new("cook", "s").quality(DataQuality::Suspect).build();
	let hit = engine()
		.evaluate(&subject, &suspect)
		.expect("Subject should be scorable.")
		.expect("Candidate should pass the hard filters.");
	let policy = ConfidencePolicy::from_config(&comps_config::Confidence::default());
	let confidence = score_confidence(
		&policy,
		hit.score,
		&hit.vector,
		subject.data_quality,
		suspect.data_quality,
	);

	assert!(confidence < hit.score);
	assert!((confidence - hit.score * 0.6).abs() < 1e-5);
}
