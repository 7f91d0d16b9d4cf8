//! Contract Integration Tests
//!
//! Runs the shared cache contract against every backend that needs no
//! external server, so the in-memory reference and the file backend are
//! held to the exact same observable semantics.

use std::sync::Once;
use std::thread::sleep;
use std::time::Duration;

use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cachecore::{Cache, DummyCache, FileCache, MemoryCache, ReplaceTtl, Ttl};

// == Test Setup ==
/// Installs a tracing subscriber once for the whole suite, so backend
/// debug logs show up under `RUST_LOG=cachecore=debug`.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "cachecore=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}

// == Shared Suite ==
/// The backend-independent part of the contract.
fn exercise_contract<C: Cache>(cache: &C) {
    init_tracing();

    // set / get / overwrite
    cache.set("k", &json!("v1"), None).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(json!("v1")));
    cache.set("k", &json!("v2"), None).unwrap();
    assert_eq!(cache.get("k").unwrap(), Some(json!("v2")));
    assert_eq!(cache.get("absent").unwrap(), None);

    // stored null is distinguishable from missing
    cache.set("null", &json!(null), None).unwrap();
    assert_eq!(cache.get("null").unwrap(), Some(json!(null)));
    assert!(cache.has_key("null").unwrap());

    // add stores exactly once per generation
    assert!(cache.add("x", &json!(5), None).unwrap());
    assert!(!cache.add("x", &json!(9), None).unwrap());
    assert_eq!(cache.get("x").unwrap(), Some(json!(5)));

    // replace only hits existing keys, keeps TTL by default
    assert!(!cache.replace("fresh", &json!(1), ReplaceTtl::Keep).unwrap());
    cache.set("r", &json!(1), Some(120)).unwrap();
    assert!(cache.replace("r", &json!(2), ReplaceTtl::Keep).unwrap());
    assert_eq!(cache.get("r").unwrap(), Some(json!(2)));
    assert!(matches!(cache.get_ttl("r").unwrap(), Some(Ttl::Seconds(_))));
    assert!(cache.replace("r", &json!(3), ReplaceTtl::Never).unwrap());
    assert_eq!(cache.get_ttl("r").unwrap(), Some(Ttl::Never));

    // delete and pop
    assert!(cache.delete("r").unwrap());
    assert!(!cache.delete("r").unwrap());
    cache.set("p", &json!("take me"), None).unwrap();
    assert_eq!(cache.pop("p").unwrap(), Some(json!("take me")));
    assert_eq!(cache.pop("p").unwrap(), None);

    // ttl bookkeeping on live keys
    cache.set("t", &json!(1), Some(45)).unwrap();
    assert_eq!(cache.get_ttl("t").unwrap(), Some(Ttl::Seconds(45)));
    assert!(cache.set_ttl("t", None).unwrap());
    assert_eq!(cache.get_ttl("t").unwrap(), Some(Ttl::Never));
    assert!(!cache.set_ttl("absent", Some(5)).unwrap());
    assert_eq!(cache.get_ttl("absent").unwrap(), None);

    // counters: create-at-zero, delta application, inversion, TTL survival
    assert_eq!(cache.incr("hits", 1).unwrap(), 1);
    assert_eq!(cache.incr("hits", 4).unwrap(), 5);
    assert_eq!(cache.decr("hits", 2).unwrap(), 3);
    assert_eq!(cache.decr("negative", 4).unwrap(), -4);
    cache.set("timed", &json!(0), Some(90)).unwrap();
    cache.incr("timed", 1).unwrap();
    assert!(matches!(
        cache.get_ttl("timed").unwrap(),
        Some(Ttl::Seconds(_))
    ));

    // bulk operations preserve input order, misses included
    cache
        .set_many(&[("m:a", json!(1)), ("m:b", json!(2))], None)
        .unwrap();
    assert_eq!(
        cache.get_many(&["m:a", "m:miss", "m:b"]).unwrap(),
        vec![Some(json!(1)), None, Some(json!(2))]
    );
    assert_eq!(
        cache.delete_many(&["m:a", "m:miss", "m:b"]).unwrap(),
        vec![true, false, true]
    );

    // pattern iteration sees only live keys
    let mut keys = cache.keys(Some("m:*")).unwrap();
    keys.sort();
    assert!(keys.is_empty());
    let mut hit_keys = cache.keys(Some("hits")).unwrap();
    hit_keys.sort();
    assert_eq!(hit_keys, vec!["hits"]);

    // clear empties the namespace
    cache.clear().unwrap();
    for key in ["k", "null", "x", "t", "hits", "negative", "timed"] {
        assert!(!cache.has_key(key).unwrap(), "{key} survived clear");
    }
    assert!(cache.is_empty().unwrap());
}

/// The time-dependent part: one second of real TTL.
fn exercise_expiry<C: Cache>(cache: &C) {
    init_tracing();

    cache.set("a", &json!(1), Some(1)).unwrap();
    assert_eq!(cache.get("a").unwrap(), Some(json!(1)));
    assert_eq!(cache.get_ttl("a").unwrap(), Some(Ttl::Seconds(1)));

    sleep(Duration::from_millis(1100));

    assert_eq!(cache.get("a").unwrap(), None);
    assert!(!cache.has_key("a").unwrap());
    assert_eq!(cache.get_ttl("a").unwrap(), None);

    // a new generation of the key starts clean
    assert!(cache.add("a", &json!(2), None).unwrap());
    assert_eq!(cache.get("a").unwrap(), Some(json!(2)));
    cache.clear().unwrap();
}

// == Backend Runs ==
#[test]
fn memory_cache_satisfies_contract() {
    exercise_contract(&MemoryCache::new());
}

#[test]
fn memory_cache_expires_lazily() {
    exercise_expiry(&MemoryCache::new());
}

#[test]
fn file_cache_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    exercise_contract(&FileCache::new(dir.path().join("cache")).unwrap());
}

#[test]
fn file_cache_expires_lazily() {
    let dir = tempfile::tempdir().unwrap();
    exercise_expiry(&FileCache::new(dir.path().join("cache")).unwrap());
}

#[test]
fn file_cache_state_survives_reopen() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache");

    {
        let cache = FileCache::new(&path).unwrap();
        cache.set("persisted", &json!({"v": 1}), None).unwrap();
    }

    let reopened = FileCache::new(&path).unwrap();
    assert_eq!(reopened.get("persisted").unwrap(), Some(json!({"v": 1})));
    assert_eq!(reopened.keys(None).unwrap(), vec!["persisted"]);
}

#[test]
fn dummy_cache_stores_nothing() {
    init_tracing();

    let cache = DummyCache::new();

    cache.set("a", &json!(1), None).unwrap();
    assert_eq!(cache.get("a").unwrap(), None);
    assert!(cache.add("a", &json!(1), None).unwrap());
    assert!(!cache.replace("a", &json!(1), ReplaceTtl::Keep).unwrap());
    assert_eq!(cache.incr("a", 2).unwrap(), 2);
    assert!(cache.keys(None).unwrap().is_empty());
}

#[test]
fn backends_interchange_behind_the_trait() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let caches: Vec<Box<dyn Cache>> = vec![
        Box::new(MemoryCache::new()),
        Box::new(FileCache::new(dir.path().join("cache")).unwrap()),
    ];

    for cache in &caches {
        cache.set("shared", &json!(true), Some(60)).unwrap();
        assert_eq!(cache.get("shared").unwrap(), Some(json!(true)));
        assert!(!cache.add("shared", &json!(false), None).unwrap());
    }
}
