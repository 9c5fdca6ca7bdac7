use predicates::prelude::*;
use serde_json::json;

mod common;
use common::TestEnv;

fn listing() -> serde_json::Value {
    json!([
        {"id": "1", "title": "First", "raw_tag_text": "Drama, Comedy", "details_url": "details.php?id=1"},
        {"id": "2", "title": "Second", "raw_tag_text": "Horror", "details_url": "details.php?id=2"},
        {"title": "Third", "raw_tag_text": "drama", "details_url": "details.php?id=3"},
        {"title": "no identity", "raw_tag_text": "drama"}
    ])
}

#[test]
fn selection_set_toggle_clear() {
    let t = TestEnv::new();
    let out = t.stdout(&["selection", "set", "-c", "movies", "drama", "Comedy"]);
    assert!(out.contains("selected Comedy, drama"));

    t.stdout(&["selection", "toggle", "-c", "movies", "DRAMA"]);
    let shown: Vec<String> =
        serde_json::from_str(&t.stdout(&["selection", "show", "-c", "movies", "--json"])).unwrap();
    assert_eq!(shown, vec!["Comedy"]);

    t.stdout(&["selection", "clear", "-c", "movies"]);
    assert_eq!(t.stdout(&["selection", "show", "-c", "movies"]), "");
}

#[test]
fn filter_with_empty_selection_shows_everything() {
    let t = TestEnv::new();
    let input = t.write_listing(listing());
    let out = t.stdout(&["filter", "-c", "movies", "--input", input.to_str().unwrap()]);
    let ids: Vec<&str> = out.lines().map(|l| l.split('\t').next().unwrap()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn filter_applies_saved_selection_and_learns_tags() {
    let t = TestEnv::new();
    t.stdout(&["selection", "set", "-c", "movies", "drama"]);
    let input = t.write_listing(listing());
    let out = String::from_utf8(
        t.bin()
            .args(["filter", "-c", "movies", "--json", "--input"])
            .arg(&input)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone(),
    )
    .unwrap();
    let items: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["1", "3"]);

    let known = t.stdout(&["tags", "list", "-c", "movies"]);
    assert_eq!(known.lines().collect::<Vec<_>>(), vec!["Comedy", "Drama", "Horror"]);
}

#[test]
fn filter_reads_stdin() {
    let t = TestEnv::new();
    t.bin()
        .args(["filter", "-c", "movies", "--input", "-"])
        .write_stdin(listing().to_string())
        .assert()
        .success()
        .stderr(predicate::str::contains("3 of 3 visible"));
}

#[test]
fn filter_rejects_malformed_listing() {
    let t = TestEnv::new();
    t.bin()
        .args(["filter", "-c", "movies", "--input", "-"])
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON array"));
}
