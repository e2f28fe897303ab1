//! End-to-end engine tests: ingestion, ranking, phrase queries, snapshots

use deltaseek::query::scoring::{idf, tf_norm};
use deltaseek::{EngineConfig, SearchEngine, SearchError, SearchQuery};
use tempfile::TempDir;

fn engine_with(config: EngineConfig, bodies: &[&str]) -> SearchEngine {
    let mut engine = SearchEngine::new(config).unwrap();
    engine.add_documents(bodies.iter().copied()).unwrap();
    engine
}

/// "hello world" padded with filler tokens up to `length` tokens
fn padded_body(length: usize) -> String {
    let mut body = String::from("hello world");
    for _ in 2..length {
        body.push_str(" filler");
    }
    body
}

#[test]
fn test_bm25_reference_values() {
    assert!((idf(1, 1) - 0.288).abs() < 1e-3);
    assert!((idf(3, 1) - 0.981).abs() < 1e-3);
    assert!((tf_norm(1, 3, 3.0) - 1.0).abs() < 1e-12);
}

#[test]
fn test_single_document_score() {
    let engine = engine_with(EngineConfig::default(), &["hello world program"]);

    let result = engine.search(&SearchQuery::new(["hello"])).unwrap();
    assert_eq!(result.doc_ids(), vec![0]);
    assert!((result.entries[0].score - idf(1, 1)).abs() < 1e-9);
}

#[test]
fn test_shorter_documents_rank_higher() {
    for config in [EngineConfig::default(), EngineConfig::for_testing()] {
        let bodies: Vec<String> = [50, 40, 30, 20, 10].iter().map(|&n| padded_body(n)).collect();
        let mut engine = SearchEngine::new(config).unwrap();
        engine.add_documents(bodies.iter().map(String::as_str)).unwrap();

        assert_eq!(engine.doc_lengths().length(0).unwrap(), 50);
        assert_eq!(engine.doc_lengths().length(4).unwrap(), 10);

        let result = engine
            .search(&SearchQuery::new(["hello", "world"]).with_n_results(5))
            .unwrap();
        assert_eq!(result.doc_ids(), vec![4, 3, 2, 1, 0]);

        let top2 = engine
            .search(&SearchQuery::new(["hello", "world"]).with_n_results(2))
            .unwrap();
        assert_eq!(top2.doc_ids(), vec![4, 3]);
    }
}

#[test]
fn test_missing_term_yields_nothing() {
    let engine = engine_with(
        EngineConfig::default(),
        &["hello world", "hello there", "world peace"],
    );

    assert!(engine.search(&SearchQuery::new(["mars"])).unwrap().is_empty());
    assert!(engine
        .search(&SearchQuery::new(["hello", "mars"]))
        .unwrap()
        .is_empty());
    assert!(engine
        .search(&SearchQuery::new(["mars", "hello", "world"]))
        .unwrap()
        .is_empty());
}

#[test]
fn test_and_semantics() {
    let engine = engine_with(
        EngineConfig::for_testing(),
        &[
            "apple banana cherry",
            "apple cherry",
            "banana cherry",
            "apple banana",
            "apple banana cherry date",
        ],
    );

    let mut ids = engine
        .search(&SearchQuery::new(["apple", "banana", "cherry"]))
        .unwrap()
        .doc_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 4]);

    let mut ids = engine
        .search(&SearchQuery::new(["cherry", "apple"]))
        .unwrap()
        .doc_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 4]);
}

#[test]
fn test_phrase_order_matters() {
    let engine = engine_with(
        EngineConfig::default(),
        &["hello world", "world hello", "hello big world"],
    );

    let forward = engine
        .search(&SearchQuery::new(["hello", "world"]).phrase())
        .unwrap();
    assert_eq!(forward.doc_ids(), vec![0]);

    let backward = engine
        .search(&SearchQuery::new(["world", "hello"]).phrase())
        .unwrap();
    assert_eq!(backward.doc_ids(), vec![1]);

    // Without the phrase flag all three documents contain both terms
    let loose = engine.search(&SearchQuery::new(["hello", "world"])).unwrap();
    assert_eq!(loose.len(), 3);
}

#[test]
fn test_three_term_phrase_with_highlights() {
    let engine = engine_with(
        EngineConfig::default(),
        &["my hello world program. hello world again, program", "program hello world"],
    );

    let result = engine
        .search(
            &SearchQuery::new(["hello", "world", "program"])
                .phrase()
                .with_snippets(),
        )
        .unwrap();

    assert_eq!(result.doc_ids(), vec![0]);
    assert_eq!(
        result.entries[0].highlights,
        vec![vec![(3, 7)], vec![(9, 13)], vec![(15, 21)]]
    );
}

#[test]
fn test_scores_are_non_increasing() {
    let bodies: Vec<String> = (0..200)
        .map(|i| {
            let mut body = format!("doc{} common", i);
            for _ in 0..(i % 7) {
                body.push_str(" common");
            }
            for _ in 0..(i % 11) {
                body.push_str(" pad");
            }
            body
        })
        .collect();

    let mut engine = SearchEngine::new(EngineConfig::for_testing()).unwrap();
    engine.add_documents(bodies.iter().map(String::as_str)).unwrap();

    let result = engine
        .search(&SearchQuery::new(["common"]).with_n_results(25))
        .unwrap();
    assert_eq!(result.len(), 25);
    for pair in result.entries.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn test_save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corpus.snap");

    let bodies: Vec<String> = (0..500)
        .map(|i| format!("item {} group{} shared tail", i, i % 13))
        .collect();
    let mut engine = SearchEngine::new(EngineConfig::for_testing()).unwrap();
    engine.add_documents(bodies.iter().map(String::as_str)).unwrap();

    let size = engine.save(&path).unwrap();
    assert_eq!(size, std::fs::metadata(&path).unwrap().len());

    let loaded = SearchEngine::load(&path).unwrap();
    assert_eq!(loaded.doc_count(), 500);
    assert_eq!(loaded.term_count(), engine.term_count());
    assert!((loaded.doc_lengths().avg_length() - engine.doc_lengths().avg_length()).abs() < 1e-9);

    let queries = [
        SearchQuery::new(["group3", "shared"]).with_n_results(100),
        SearchQuery::new(["shared", "tail"]).phrase().with_snippets(),
        SearchQuery::new(["item", "group7"]),
    ];
    for query in &queries {
        assert_eq!(loaded.search(query).unwrap(), engine.search(query).unwrap());
    }

    let group3 = loaded
        .search(&SearchQuery::new(["group3"]).with_n_results(1000))
        .unwrap();
    assert_eq!(group3.len(), (0..500).filter(|i| i % 13 == 3).count());
}

#[test]
fn test_load_rejects_corrupted_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corpus.snap");

    let engine = engine_with(EngineConfig::default(), &["hello world", "hello again"]);
    engine.save(&path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2 + 12;
    bytes[mid] ^= 0x5A;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        SearchEngine::load(&path),
        Err(SearchError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_config_from_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "skip_span": 8, "result_cache_size": 16 }"#).unwrap();

    let config = EngineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.skip_span, 8);
    assert_eq!(config.default_n_results, 10);

    let mut engine = SearchEngine::new(config).unwrap();
    engine.add_document("cached hello").unwrap();
    engine.search_terms(["hello"]).unwrap();
    engine.search_terms(["hello"]).unwrap();

    let stats = engine.stats();
    assert_eq!(stats.documents, 1);
    assert_eq!(stats.queries_served, 2);
    assert_eq!(stats.cache.unwrap().hits, 1);
}
