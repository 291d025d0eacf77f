mod common;

use std::fs;

use assert_matches::assert_matches;

use datapoints::error::DatapointsError;
use datapoints::staging::StagingStore;

use common::{entry_count, temp_root};

#[test]
fn taken_ids_are_redrawn() {
    let (_dir, root) = temp_root();
    let staging = StagingStore::new(root.join("temp"));
    fs::create_dir_all(root.join("temp").join("111")).unwrap();

    let mut ids = vec!["222".to_string(), "111".to_string()];
    let area = staging.begin_with(|| ids.pop().unwrap()).unwrap();

    assert_eq!(area.id(), "222");
    assert_eq!(area.path(), root.join("temp").join("222"));
    assert!(area.path().is_dir());
}

#[test]
fn concurrent_areas_are_distinct() {
    let (_dir, root) = temp_root();
    let staging = StagingStore::new(root.join("temp"));

    let first = staging.begin().unwrap();
    let second = staging.begin().unwrap();

    assert_ne!(first.path(), second.path());
    assert!(first.id().chars().all(|ch| ch.is_ascii_digit()));
    staging.discard(first).unwrap();
    assert!(second.path().is_dir());
}

#[test]
fn promote_moves_member_and_removes_area() {
    let (_dir, root) = temp_root();
    let staging = StagingStore::new(root.join("temp"));
    let area = staging.begin().unwrap();
    fs::write(area.path().join("parcels.gml"), "<gml/>").unwrap();
    fs::write(area.path().join("licence.txt"), "licence").unwrap();
    let area_path = area.path().to_path_buf();

    let cache_dir = root.join("index_polygons");
    let promoted = staging
        .promote(area, "parcels.gml", &cache_dir, "Adur.gml")
        .unwrap();

    assert_eq!(promoted, cache_dir.join("Adur.gml"));
    assert_eq!(fs::read_to_string(&promoted).unwrap(), "<gml/>");
    assert!(!area_path.exists());
    assert_eq!(entry_count(&cache_dir), 1);
    assert_eq!(entry_count(staging.root()), 0);
}

#[test]
fn promote_without_member_discards_area() {
    let (_dir, root) = temp_root();
    let staging = StagingStore::new(root.join("temp"));
    let area = staging.begin().unwrap();
    fs::write(area.path().join("licence.txt"), "licence").unwrap();

    let err = staging
        .promote(area, "parcels.gml", &root.join("index_polygons"), "Adur.gml")
        .unwrap_err();

    assert_matches!(err, DatapointsError::MissingArchiveMember { ref member, .. } if member == "parcels.gml");
    assert_eq!(entry_count(staging.root()), 0);
    assert!(!root.join("index_polygons").join("Adur.gml").exists());
}

#[test]
fn discard_tolerates_missing_directory() {
    let (_dir, root) = temp_root();
    let staging = StagingStore::new(root.join("temp"));
    let area = staging.begin().unwrap();
    fs::remove_dir_all(area.path()).unwrap();

    staging.discard(area).unwrap();
}
