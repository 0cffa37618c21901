use std::fs;

use comps_domain::{PropertyKey, PropertyType};
use comps_storage::{CandidateFilter, Error, MemoryStore, PropertyStore};
use comps_testkit::{PropertyBuilder, snapshot, write_temp_file};

const CURRENT_YEAR: i32 = 2025;

#[tokio::test]
async fn reingestion_supersedes_and_keeps_history() {
	let store = MemoryStore::new(true);
	let first = store
		.ingest(vec![PropertyBuilder::new("cook", "1").build()], CURRENT_YEAR)
		.expect("Initial ingest failed.");
	let repeat = store
		.ingest(vec![PropertyBuilder::new("cook", "1").build()], CURRENT_YEAR)
		.expect("Repeat ingest failed.");

	assert_eq!(first.inserted, 1);
	assert_eq!(repeat.unchanged, 1);
	assert_eq!(repeat.version, first.version, "Unchanged content must keep the version tag.");

	let update = store
		.ingest(
			vec![PropertyBuilder::new("cook", "1").square_feet(Some(12_000.0)).build()],
			CURRENT_YEAR,
		)
		.expect("Update ingest failed.");

	assert_eq!(update.superseded, 1);
	assert_ne!(update.version, first.version);

	let latest = store.get_property("cook", "1").await.expect("Property should exist.");

	assert_eq!(latest.version, 2);
	assert_eq!(latest.square_feet, Some(12_000.0));

	let history = store.history(&PropertyKey::new("cook", "1"));

	assert_eq!(history.len(), 1);
	assert_eq!(history[0].version, 1);
	assert_eq!(history[0].square_feet, Some(10_000.0));
}

#[tokio::test]
async fn history_is_dropped_unless_retained() {
	let store = MemoryStore::new(false);

	store.ingest(vec![PropertyBuilder::new("cook", "1").build()], CURRENT_YEAR).expect("Ingest failed.");
	store
		.ingest(vec![PropertyBuilder::new("cook", "1").year_built(Some(2001)).build()], CURRENT_YEAR)
		.expect("Ingest failed.");

	assert!(store.history(&PropertyKey::new("cook", "1")).is_empty());
	assert_eq!(store.get_property("cook", "1").await.expect("Missing property.").version, 2);
}

#[tokio::test]
async fn missing_property_is_not_found() {
	let store = MemoryStore::new(false);
	let err = store.get_property("cook", "nope").await.expect_err("Expected not found.");

	assert!(matches!(err, Error::NotFound(_)));
	assert!(err.to_string().contains("cook/nope"));
}

#[tokio::test]
async fn candidate_filter_scopes_county_type_and_subject() {
	let store = MemoryStore::new(false);

	store
		.ingest(
			vec![
				PropertyBuilder::new("cook", "subject").build(),
				PropertyBuilder::new("cook", "b").build(),
				PropertyBuilder::new("cook", "a").build(),
				PropertyBuilder::new("cook", "home")
					.property_type(Some(PropertyType::Residential))
					.build(),
				PropertyBuilder::new("dupage", "far").build(),
				PropertyBuilder::new("cook", "untyped").property_type(None).build(),
			],
			CURRENT_YEAR,
		)
		.expect("Ingest failed.");

	let filter = CandidateFilter {
		county: Some("COOK".to_string()),
		property_types: vec![PropertyType::Industrial, PropertyType::Commercial],
		exclude: Some(PropertyKey::new("cook", "subject")),
	};
	let pool = store.query_candidates(&filter).await.expect("Query failed.");
	let ids = pool.iter().map(|property| property.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["a", "b"]);

	let everything = store.query_candidates(&CandidateFilter::default()).await.expect("Query failed.");

	assert_eq!(everything.len(), 6);
}

#[test]
fn replace_tracks_removed_records_and_adopts_upstream_version() {
	let store = MemoryStore::new(true);

	store
		.ingest(
			vec![PropertyBuilder::new("cook", "1").build(), PropertyBuilder::new("cook", "2").build()],
			CURRENT_YEAR,
		)
		.expect("Ingest failed.");

	let report = store
		.replace(
			snapshot(
				"upstream-7",
				vec![
					PropertyBuilder::new("cook", "1").build(),
					PropertyBuilder::new("cook", "3").build(),
				],
			),
			CURRENT_YEAR,
		)
		.expect("Replace failed.");

	assert_eq!((report.inserted, report.unchanged, report.removed), (1, 1, 1));
	assert_eq!(store.version_tag(), "upstream-7");
	assert_eq!(store.len(), 2);
	assert_eq!(store.history(&PropertyKey::new("cook", "2")).len(), 1);
}

#[test]
fn snapshot_file_round_trips() {
	let store = MemoryStore::new(false);

	store
		.ingest(
			vec![PropertyBuilder::new("cook", "1").build(), PropertyBuilder::new("cook", "2").build()],
			CURRENT_YEAR,
		)
		.expect("Ingest failed.");

	let path = write_temp_file("comps_store", "{}");

	store.save(&path).expect("Save failed.");

	let restored = MemoryStore::load(&path, false, CURRENT_YEAR).expect("Load failed.");

	fs::remove_file(&path).expect("Failed to remove snapshot.");

	assert_eq!(restored.snapshot(), store.snapshot());
}

#[test]
fn malformed_snapshot_file_is_rejected() {
	let path = write_temp_file("comps_store_bad", "{\"version\": 3}");
	let result = MemoryStore::load(&path, false, CURRENT_YEAR);

	fs::remove_file(&path).expect("Failed to remove snapshot.");

	assert!(matches!(result, Err(Error::SerdeJson(_))));
}

#[test]
fn concurrent_saves_all_succeed() {
	let path = write_temp_file("comps_store_concurrent", "{}");
	let store = MemoryStore::new(false);
	let properties = (0..500)
		.map(|idx| PropertyBuilder::new("cook", &idx.to_string()).build())
		.collect::<Vec<_>>();

	store.ingest(properties, CURRENT_YEAR).expect("Seed ingest failed.");

	let failures = std::thread::scope(|scope| {
		let workers = (0..4)
			.map(|_| {
				scope.spawn(|| (0..10).filter(|_| store.save(&path).is_err()).count())
			})
			.collect::<Vec<_>>();

		workers.into_iter().map(|worker| worker.join().expect("Save thread panicked.")).sum::<usize>()
	});
	let restored =
		MemoryStore::load(&path, false, CURRENT_YEAR).expect("Failed to load saved snapshot.");

	fs::remove_file(&path).expect("Failed to remove snapshot.");

	assert_eq!(failures, 0);
	assert_eq!(restored.len(), 500);
	assert_eq!(restored.version_tag(), store.version_tag());
}
