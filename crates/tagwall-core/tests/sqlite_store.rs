#![cfg(feature = "sqlite")]

use std::sync::Arc;
use tagwall_core::{
    ContextKey, ExtractedMetadata, MetadataCache, Namespace, SelectionStore, Store, StoreImpl,
    TagLearningStore,
};
use tempfile::tempdir;

#[test]
fn kv_roundtrip_and_scan_order() {
    let dir = tempdir().unwrap();
    let store = StoreImpl::new_with(dir.path().join("t.db"), true).expect("store");
    store.set(Namespace::TagBank, "b", "{}").unwrap();
    store.set(Namespace::TagBank, "a", "{\"x\":true}").unwrap();
    store.set(Namespace::TagBank, "a", "{\"y\":true}").unwrap();
    store.set(Namespace::MetadataCache, "a", "{}").unwrap();

    assert_eq!(store.get(Namespace::TagBank, "a").unwrap().as_deref(), Some("{\"y\":true}"));
    let keys: Vec<String> = store
        .scan(Namespace::TagBank)
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert!(store.delete(Namespace::TagBank, "b").unwrap());
    assert!(!store.delete(Namespace::TagBank, "b").unwrap());
    assert_eq!(store.scan(Namespace::MetadataCache).unwrap().len(), 1);
}

#[test]
fn state_survives_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("wall.db");
    let ctx = ContextKey::new("movies");
    {
        let store: Arc<dyn Store> = Arc::new(StoreImpl::new(&db).unwrap());
        TagLearningStore::new(store.clone()).learn(&ctx, &["Drama", "Crime"]).unwrap();
        SelectionStore::new(store.clone()).save(&ctx, ["Crime"]).unwrap();
        MetadataCache::new(store, time::Duration::days(7))
            .set("https://example.org/details.php?id=1", ExtractedMetadata {
                video_id: Some("dQw4w9WgXcQ".into()),
                ..Default::default()
            })
            .unwrap();
    }
    let store: Arc<dyn Store> = Arc::new(StoreImpl::new(&db).unwrap());
    assert_eq!(TagLearningStore::new(store.clone()).list(&ctx).unwrap(), vec!["Crime", "Drama"]);
    assert_eq!(SelectionStore::new(store.clone()).load(&ctx).unwrap().tags(), ["Crime"]);
    let hit = MetadataCache::new(store, time::Duration::days(7))
        .get("https://example.org/details.php?id=1")
        .unwrap()
        .unwrap();
    assert_eq!(hit.fields.video_id.as_deref(), Some("dQw4w9WgXcQ"));
}

#[test]
fn migrations_are_tracked() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("m.db");
    let store = StoreImpl::new_with(&db, false).unwrap();
    let st = store.migration_status().unwrap();
    assert_eq!(st.current, 1);
    assert_eq!(st.latest, 2);
    assert_eq!(st.pending, vec!["0002_kv_updated_idx.sql"]);
    store.migrate_all().unwrap();
    let st = store.migration_status().unwrap();
    assert_eq!(st.current, 2);
    assert!(st.pending.is_empty());
}
