use std::sync::Arc;
use tagwall_core::{ContextKey, MemStore, Namespace, SelectionStore, Store, TagLearningStore};

#[test]
fn learning_is_idempotent() {
    let mem = Arc::new(MemStore::new());
    let bank = TagLearningStore::new(mem.clone());
    let ctx = ContextKey::new("movies");

    assert_eq!(bank.learn(&ctx, &["Horror"]).unwrap(), 1);
    let once = mem.get(Namespace::TagBank, "movies").unwrap();
    let writes = mem.write_count();

    assert_eq!(bank.learn(&ctx, &["Horror"]).unwrap(), 0);
    assert_eq!(bank.learn(&ctx, &["horror"]).unwrap(), 0);
    assert_eq!(mem.get(Namespace::TagBank, "movies").unwrap(), once);
    assert_eq!(mem.write_count(), writes, "no-op learn must not persist");
    assert_eq!(bank.list(&ctx).unwrap(), vec!["Horror"]);
}

#[test]
fn list_is_case_insensitively_sorted_and_append_only() {
    let bank = TagLearningStore::new(Arc::new(MemStore::new()));
    let ctx = ContextKey::new("4");
    bank.learn(&ctx, &["western", "Action", "drama"]).unwrap();
    bank.learn(&ctx, &["Biography"]).unwrap();
    assert_eq!(bank.list(&ctx).unwrap(), vec!["Action", "Biography", "drama", "western"]);
}

#[test]
fn accented_tags_sort_with_their_base_letter() {
    let bank = TagLearningStore::new(Arc::new(MemStore::new()));
    let ctx = ContextKey::new("movies");
    bank.learn(&ctx, &["Zombie", "Épique", "Action", "epopée", "Documentaire"]).unwrap();
    assert_eq!(
        bank.list(&ctx).unwrap(),
        vec!["Action", "Documentaire", "Épique", "epopée", "Zombie"]
    );
}

#[test]
fn contexts_are_independent() {
    let bank = TagLearningStore::new(Arc::new(MemStore::new()));
    let movies = ContextKey::new("movies");
    let series = ContextKey::new("series");
    bank.learn(&movies, &["Action | Comedy"]).unwrap();
    bank.learn(&series, &["Documentary"]).unwrap();
    assert_eq!(bank.list(&movies).unwrap(), vec!["Action", "Comedy"]);
    assert_eq!(bank.list(&series).unwrap(), vec!["Documentary"]);
    let ctxs: Vec<String> = bank.contexts().unwrap().iter().map(|c| c.to_string()).collect();
    assert_eq!(ctxs, vec!["movies", "series"]);
}

#[test]
fn corrupt_bank_reads_as_empty() {
    let mem = Arc::new(MemStore::new());
    mem.set(Namespace::TagBank, "x", "not json").unwrap();
    let bank = TagLearningStore::new(mem);
    let ctx = ContextKey::new("x");
    assert!(bank.list(&ctx).unwrap().is_empty());
    assert_eq!(bank.learn(&ctx, &["Drama"]).unwrap(), 1);
    assert_eq!(bank.list(&ctx).unwrap(), vec!["Drama"]);
}

#[test]
fn selection_is_normalized_before_persisting() {
    let mem = Arc::new(MemStore::new());
    let sel = SelectionStore::new(mem.clone());
    let ctx = ContextKey::new("movies");

    let saved = sel.save(&ctx, ["Action | Comedy", " action "]).unwrap();
    assert_eq!(saved.tags(), ["Action", "Comedy"]);

    let raw = mem.get(Namespace::FilterSelection, "movies").unwrap().unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v, serde_json::json!({"Action": true, "Comedy": true}));

    let loaded = sel.load(&ctx).unwrap();
    assert_eq!(loaded, saved);
    assert!(loaded.contains("COMEDY"));
}

#[test]
fn toggle_and_clear_leave_learned_tags_alone() {
    let mem = Arc::new(MemStore::new());
    let sel = SelectionStore::new(mem.clone());
    let bank = TagLearningStore::new(mem);
    let ctx = ContextKey::new("movies");
    bank.learn(&ctx, &["Action", "Drama"]).unwrap();

    assert_eq!(sel.toggle(&ctx, "Drama").unwrap().tags(), ["Drama"]);
    assert_eq!(sel.toggle(&ctx, "action").unwrap().tags(), ["action", "Drama"]);
    assert_eq!(sel.toggle(&ctx, "DRAMA").unwrap().tags(), ["action"]);

    sel.clear(&ctx).unwrap();
    assert!(sel.load(&ctx).unwrap().is_empty());
    assert_eq!(bank.list(&ctx).unwrap(), vec!["Action", "Drama"]);
}
