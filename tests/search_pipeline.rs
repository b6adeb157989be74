//! End-to-end pipeline: resolve a data directory, ingest documents and
//! chunks, then query them back through the public API.

use ragstore::{DataDir, Metadata, Store, search};

fn seed_corpus(store: &Store) {
    store
        .upsert_document("rust-guide", "The Rust Programming Language", meta())
        .unwrap();
    store
        .replace_chunks(
            "rust-guide",
            &[
                "Rust is a systems programming language.".to_string(),
                "Ownership makes memory safety tractable.".to_string(),
            ],
            &[vec![1.0, 0.0, 0.0], vec![0.8, 0.2, 0.0]],
            None,
        )
        .unwrap();

    store
        .upsert_document("cookbook", "Weeknight Cooking", Metadata::new())
        .unwrap();
    store
        .replace_chunks(
            "cookbook",
            &["Boil water, add salt, cook the pasta.".to_string()],
            &[vec![0.0, 0.0, 1.0]],
            None,
        )
        .unwrap();
}

fn meta() -> Metadata {
    let mut m = Metadata::new();
    m.insert("lang".to_string(), serde_json::Value::from("en"));
    m
}

#[test]
fn ingest_then_search() {
    let tmp = tempfile::tempdir().unwrap();
    let data_dir = DataDir::resolve(Some(tmp.path())).unwrap();
    let store = Store::open(&data_dir.store_db()).unwrap();
    seed_corpus(&store);

    let results = search::search(&store, &[1.0, 0.0, 0.0], 2, None).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk_id, "rust-guide__0");
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert_eq!(results[1].chunk_id, "rust-guide__1");
    assert!(results[0].score >= results[1].score);
    assert!(
        results[0].meta.is_empty(),
        "chunk meta defaults to empty when none was supplied"
    );
}

#[test]
fn filtered_search_never_leaks_other_documents() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Store::open(&tmp.path().join("store.redb")).unwrap();
    seed_corpus(&store);

    // The cookbook chunk is the worst match for this query, yet the filter
    // must keep the better-scoring rust chunks out entirely.
    let filter = vec!["cookbook".to_string()];
    let results =
        search::search(&store, &[1.0, 0.0, 0.0], 10, Some(&filter)).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc_id, "cookbook");
}

#[test]
fn replacing_with_empty_removes_document_from_results() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Store::open(&tmp.path().join("store.redb")).unwrap();
    seed_corpus(&store);

    store.replace_chunks("rust-guide", &[], &[], None).unwrap();

    let filter = vec!["rust-guide".to_string()];
    let results =
        search::search(&store, &[1.0, 0.0, 0.0], 10, Some(&filter)).unwrap();
    assert!(results.is_empty());

    // The document record itself survives; only the chunks are gone.
    assert!(store.get_document("rust-guide").unwrap().is_some());
}

#[test]
fn reingest_after_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("store.redb");

    {
        let store = Store::open(&path).unwrap();
        seed_corpus(&store);
    }

    let store = Store::open(&path).unwrap();
    store
        .replace_chunks(
            "rust-guide",
            &["Updated chapter.".to_string()],
            &[vec![0.0, 1.0, 0.0]],
            None,
        )
        .unwrap();

    let results = search::search(&store, &[0.0, 1.0, 0.0], 5, None).unwrap();
    assert_eq!(results[0].chunk_id, "rust-guide__0");
    assert_eq!(results[0].text, "Updated chapter.");

    assert_eq!(store.count_documents().unwrap(), 2);
    assert_eq!(store.count_chunks().unwrap(), 2);
}
