//! Store-level tests exercising load, write, backup and locking together.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use crate::document::DocumentStore;
use crate::error::PersistenceError;
use crate::model::EntityKind;
use crate::value::FieldValue;
use crate::writer::EntityUpdate;

const LIBRARY: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n\
<Hops><Data>\r\n\
 <Hops><_PermID_>1</_PermID_><F_H_NAME>Cascade</F_H_NAME><F_H_ALPHA>5.7500000</F_H_ALPHA><F_H_NOTES>Floral &ndash; citrus</F_H_NOTES></Hops>\r\n\
 <Hops><_PermID_>2</_PermID_><F_H_NAME>Saaz</F_H_NAME><F_H_ALPHA>3.5000000</F_H_ALPHA><F_H_NOTES></F_H_NOTES></Hops>\r\n\
</Data></Hops>\r\n\
<Hops><_PermID_>9</_PermID_><F_H_NAME>Cascade</F_H_NAME><F_H_ALPHA>6.1000000</F_H_ALPHA><F_H_NOTES>home grown</F_H_NOTES></Hops>\r\n";

fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("Hops.bsmx");
    fs::write(&path, LIBRARY).unwrap();
    path
}

#[test]
fn zero_updates_leave_bytes_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let store = DocumentStore::load(&[&path]).unwrap();
    let receipt = store.write(&[]).unwrap();
    assert!(receipt.documents.is_empty());
    assert_eq!(fs::read(&path).unwrap(), LIBRARY.as_bytes());
}

#[test]
fn single_field_update_is_a_minimal_diff() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let store = DocumentStore::load(&[&path]).unwrap();

    let update = EntityUpdate::new(EntityKind::Hop, "2").set("f_h_alpha", FieldValue::Number(4.0));
    store.write(&[update]).unwrap();

    let after = fs::read_to_string(&path).unwrap();
    let expected = LIBRARY.replace(
        "<F_H_ALPHA>3.5000000</F_H_ALPHA>",
        "<F_H_ALPHA>4.0000000</F_H_ALPHA>",
    );
    // Everything outside the one content span is byte-identical, CRLF and
    // raw entities included.
    assert_eq!(after, expected);
    assert!(after.contains("&ndash;"));
}

#[test]
fn update_targets_the_record_by_id_not_name() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let store = DocumentStore::load(&[&path]).unwrap();

    // Two records are named Cascade; only id 1 may change.
    let update = EntityUpdate::new(EntityKind::Hop, "1").set("f_h_alpha", FieldValue::Number(5.9));
    store.write(&[update]).unwrap();

    let after = fs::read_to_string(&path).unwrap();
    assert!(after.contains("<F_H_ALPHA>5.9000000</F_H_ALPHA>"));
    assert!(after.contains("<F_H_ALPHA>6.1000000</F_H_ALPHA>"));
}

#[test]
fn backup_is_a_verbatim_copy_of_the_pre_write_file() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let backups = dir.path().join("backups");
    let store = DocumentStore::load(&[&path])
        .unwrap()
        .with_backup_dir(backups.clone());

    let update =
        EntityUpdate::new(EntityKind::Hop, "9").set("f_h_notes", FieldValue::Text("2025 crop".into()));
    let receipt = store.write(&[update]).unwrap();

    assert_eq!(receipt.backups.len(), 1);
    let backup = &receipt.backups[0];
    assert!(backup.starts_with(&backups));
    assert_eq!(fs::read(backup).unwrap(), LIBRARY.as_bytes());
    assert_ne!(fs::read(&path).unwrap(), LIBRARY.as_bytes());
}

#[test]
fn consecutive_writes_get_distinct_backups() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let backups = dir.path().join("backups");
    let mut store = DocumentStore::load(&[&path])
        .unwrap()
        .with_backup_dir(backups.clone());

    let first = store
        .write(&[EntityUpdate::new(EntityKind::Hop, "1")
            .set("f_h_alpha", FieldValue::Number(5.8))])
        .unwrap();
    store.reload().unwrap();
    let second = store
        .write(&[EntityUpdate::new(EntityKind::Hop, "1")
            .set("f_h_alpha", FieldValue::Number(5.9))])
        .unwrap();

    assert_ne!(first.backups[0], second.backups[0]);
    assert_eq!(fs::read_dir(&backups).unwrap().count(), 2);
}

#[test]
fn unknown_field_rejects_the_whole_batch_before_any_io() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let store = DocumentStore::load(&[&path]).unwrap();

    let good = EntityUpdate::new(EntityKind::Hop, "1").set("f_h_alpha", FieldValue::Number(9.9));
    let bad = EntityUpdate::new(EntityKind::Hop, "2").set("f_h_bogus", FieldValue::Int(1));
    let err = store.write(&[good, bad]).unwrap_err();
    match err {
        PersistenceError::UnknownField { field, .. } => assert_eq!(field, "f_h_bogus"),
        other => panic!("unexpected error: {other}"),
    }
    // The good update must not have landed.
    assert_eq!(fs::read(&path).unwrap(), LIBRARY.as_bytes());
}

#[test]
fn missing_entity_is_reported_with_kind_and_id() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let store = DocumentStore::load(&[&path]).unwrap();

    let err = store
        .write(&[EntityUpdate::new(EntityKind::Yeast, "404")
            .set("f_y_name", FieldValue::Text("x".into()))])
        .unwrap_err();
    match err {
        PersistenceError::NoSuchEntity { kind, id } => {
            assert_eq!(kind, "Yeast");
            assert_eq!(id, "404");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn nested_list_fields_refuse_in_place_updates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Recipe.bsmx");
    fs::write(
        &path,
        "<Recipe><_PermID_>7</_PermID_><F_R_NAME>House IPA</F_R_NAME>\
<Ingredients><Data><Hops><F_H_NAME>Cascade</F_H_NAME></Hops></Data></Ingredients></Recipe>",
    )
    .unwrap();
    let store = DocumentStore::load(&[&path]).unwrap();

    let err = store
        .write(&[EntityUpdate::new(EntityKind::Recipe, "7")
            .set("ingredients", FieldValue::List(Vec::new()))])
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NestedFieldUpdate { .. }));
}

#[test]
fn concurrent_writers_to_one_path_serialize() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);

    let threads: Vec<_> = (0..4)
        .map(|i| {
            let path = path.clone();
            std::thread::spawn(move || {
                let mut store = DocumentStore::load(&[&path])
                    .unwrap()
                    .with_lock_timeout(Duration::from_secs(10));
                store.reload().unwrap();
                let alpha = 5.0 + i as f64;
                store
                    .write(&[EntityUpdate::new(EntityKind::Hop, "1")
                        .set("f_h_alpha", FieldValue::Number(alpha))])
                    .unwrap();
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    // The file stays structurally intact after contended writes.
    let store = DocumentStore::load(&[&path]).unwrap();
    assert_eq!(store.all_records(EntityKind::Hop).count(), 3);
}

#[test]
fn self_closing_field_update_rewrites_the_element() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Hops.bsmx");
    fs::write(
        &path,
        "<Hops><_PermID_>5</_PermID_><F_H_NAME>Fuggle</F_H_NAME><F_H_NOTES/></Hops>",
    )
    .unwrap();
    let mut store = DocumentStore::load(&[&path]).unwrap();

    store
        .write(&[EntityUpdate::new(EntityKind::Hop, "5")
            .set("f_h_notes", FieldValue::Text("restocked".into()))])
        .unwrap();

    let after = fs::read_to_string(&path).unwrap();
    assert!(after.contains("<F_H_NOTES>restocked</F_H_NOTES>"));
    assert!(!after.contains("<F_H_NOTES/>"));

    // The value must survive a reload, not just land somewhere in the file.
    store.reload().unwrap();
    let hop = store.find(EntityKind::Hop, "5").unwrap();
    assert_eq!(hop.text("f_h_notes"), "restocked");
}

#[test]
fn duplicate_updates_to_one_record_coalesce() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let mut store = DocumentStore::load(&[&path]).unwrap();

    // Two updates naming id 1, touching different fields with different
    // value lengths.
    store
        .write(&[
            EntityUpdate::new(EntityKind::Hop, "1")
                .set("f_h_name", FieldValue::Text("Cascade US Whole Leaf".into())),
            EntityUpdate::new(EntityKind::Hop, "1").set("f_h_alpha", FieldValue::Number(6.0)),
        ])
        .unwrap();

    // The file still parses and both fields landed.
    store.reload().unwrap();
    let hop = store.find(EntityKind::Hop, "1").unwrap();
    assert_eq!(hop.name, "Cascade US Whole Leaf");
    assert!((hop.num("f_h_alpha") - 6.0).abs() < 1e-9);

    // Same field twice: the later update wins.
    store
        .write(&[
            EntityUpdate::new(EntityKind::Hop, "2").set("f_h_alpha", FieldValue::Number(3.0)),
            EntityUpdate::new(EntityKind::Hop, "2").set("f_h_alpha", FieldValue::Number(3.9)),
        ])
        .unwrap();
    store.reload().unwrap();
    let saaz = store.find(EntityKind::Hop, "2").unwrap();
    assert!((saaz.num("f_h_alpha") - 3.9).abs() < 1e-9);
}

#[test]
fn held_lock_times_out_as_an_error_and_leaves_the_file_alone() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let store = DocumentStore::load(&[&path])
        .unwrap()
        .with_lock_timeout(Duration::from_millis(50));

    let lock = crate::writer::lock_for(&path);
    let _guard = lock.lock();

    let err = store
        .write(&[EntityUpdate::new(EntityKind::Hop, "1")
            .set("f_h_alpha", FieldValue::Number(9.0))])
        .unwrap_err();
    match err {
        PersistenceError::LockTimeout { timeout_ms, .. } => assert_eq!(timeout_ms, 50),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(&path).unwrap(), LIBRARY.as_bytes());
}

#[test]
fn recipes_inside_table_folders_carry_the_folder_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Recipe.bsmx");
    fs::write(
        &path,
        "<Recipe><Data>\
<Table><Name>Ales</Name><Data>\
<Table><Name>Pale</Name><Data>\
<Recipe><_PermID_>1</_PermID_><F_R_NAME>House IPA</F_R_NAME></Recipe>\
</Data></Table>\
<Recipe><_PermID_>2</_PermID_><F_R_NAME>Best Bitter</F_R_NAME></Recipe>\
</Data></Table>\
<Recipe><_PermID_>3</_PermID_><F_R_NAME>Lager</F_R_NAME></Recipe>\
</Data></Recipe>",
    )
    .unwrap();
    let store = DocumentStore::load(&[&path]).unwrap();

    assert_eq!(
        store.find(EntityKind::Recipe, "1").unwrap().provenance.folder,
        "/Ales/Pale/"
    );
    assert_eq!(
        store.find(EntityKind::Recipe, "2").unwrap().provenance.folder,
        "/Ales/"
    );
    assert_eq!(
        store.find(EntityKind::Recipe, "3").unwrap().provenance.folder,
        "/"
    );
}

#[test]
fn entities_serialize_for_external_callers() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let store = DocumentStore::load(&[&path]).unwrap();

    let saaz = store.find(EntityKind::Hop, "2").unwrap();
    let json = serde_json::to_value(saaz).unwrap();
    assert_eq!(json["kind"], "Hop");
    assert_eq!(json["name"], "Saaz");
    assert_eq!(json["fields"]["f_h_alpha"], 3.5);
}

#[test]
fn multi_document_store_routes_updates_to_the_owning_file() {
    let dir = TempDir::new().unwrap();
    let hops = write_fixture(&dir);
    let grain = dir.path().join("Grain.bsmx");
    fs::write(
        &grain,
        "<Grain><Data><Grain><_PermID_>1</_PermID_><F_G_NAME>Pale Malt</F_G_NAME>\
<F_G_YIELD>80.0000000</F_G_YIELD></Grain></Data></Grain>",
    )
    .unwrap();

    let store = DocumentStore::load(&[&hops, &grain]).unwrap();
    let receipt = store
        .write(&[EntityUpdate::new(EntityKind::Grain, "1")
            .set("f_g_yield", FieldValue::Number(81.5))])
        .unwrap();

    assert_eq!(receipt.documents, vec![grain.clone()]);
    assert_eq!(fs::read(&hops).unwrap(), LIBRARY.as_bytes());
    assert!(fs::read_to_string(&grain)
        .unwrap()
        .contains("<F_G_YIELD>81.5000000</F_G_YIELD>"));
}
