//! Integration tests for symlink resolution

use serde_json::json;
use symvault_secrets::readers::ReadCall;
use symvault_secrets::{
    MemoryReader, ResolverConfig, SecretError, SecretMap, SecretValue, SymlinkResolver,
};
use tokio_util::sync::CancellationToken;

fn map(value: serde_json::Value) -> SecretMap {
    serde_json::from_value(value).unwrap()
}

fn call(path: &str, version: Option<&str>) -> ReadCall {
    ReadCall {
        path: path.to_string(),
        version: version.map(str::to_string),
    }
}

#[tokio::test]
async fn test_chained_resolution_reads_in_order() {
    let reader = MemoryReader::from_json(&json!({
        "p1": {"f1": "vault://p2#f2"},
        "p2": {"f2": "done"},
    }))
    .unwrap()
    .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let resolved = resolver
        .resolve_all(&CancellationToken::new(), map(json!({"k": "vault://p1#f1"})))
        .await
        .unwrap();

    assert_eq!(resolved, map(json!({"k": "done"})));
    assert_eq!(reader.calls(), vec![call("p1", None), call("p2", None)]);
}

#[tokio::test]
async fn test_fail_fast_discards_mapping() {
    let mut reader = MemoryReader::from_json(&json!({"ok": {"f": "fine"}}))
        .unwrap()
        .recording();
    reader.fail_on("broken", "permission denied");
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let result = resolver
        .resolve_all(
            &CancellationToken::new(),
            map(json!({
                "a_plain": "untouched",
                "b_number": 3,
                "c_broken": "vault://broken#f",
                "d_ok": "vault://ok#f",
            })),
        )
        .await;

    match result {
        Err(SecretError::Backend { path, message }) => {
            assert_eq!(path, "broken");
            assert_eq!(message, "permission denied");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    // Fields are visited in key order; nothing after the failure is read
    assert_eq!(reader.calls(), vec![call("broken", None)]);
}

#[tokio::test]
async fn test_not_found_is_propagated_unchanged() {
    let reader = MemoryReader::new().recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let result = resolver
        .resolve_all(
            &CancellationToken::new(),
            map(json!({"k": "vault://missing#KEY@2"})),
        )
        .await;

    match result {
        Err(SecretError::NotFound { path, version }) => {
            assert_eq!(path, "missing");
            assert_eq!(version.as_deref(), Some("2"));
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_reference_passthrough() {
    let reader = MemoryReader::new().recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
    let input = map(json!({
        "user": "admin",
        "port": 5432,
        "tls": true,
        "nothing": null,
        "nested": {"inner": "vault://p#f"},
        "list": ["vault://p#f"],
        "almost": "vault:/p#f",
    }));

    let resolved = resolver
        .resolve_all(&CancellationToken::new(), input.clone())
        .await
        .unwrap();

    assert_eq!(resolved, input);
    assert!(reader.calls().is_empty());
}

#[tokio::test]
async fn test_undecodable_reference_reads_empty_path() {
    let reader = MemoryReader::from_json(&json!({"": {"": "resolved"}}))
        .unwrap()
        .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let resolved = resolver
        .resolve_all(&CancellationToken::new(), map(json!({"k": "vault://test"})))
        .await
        .unwrap();

    assert_eq!(resolved["k"], SecretValue::from("resolved"));
    assert_eq!(reader.calls(), vec![call("", None)]);
}

#[tokio::test]
async fn test_missing_field_resolves_to_null() {
    let reader = MemoryReader::from_json(&json!({"p": {"other": "x"}}))
        .unwrap()
        .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let resolved = resolver
        .resolve_all(
            &CancellationToken::new(),
            map(json!({"k": "vault://p#absent", "keep": "v"})),
        )
        .await
        .unwrap();

    assert_eq!(resolved["k"], SecretValue::Null);
    assert_eq!(resolved["keep"], SecretValue::from("v"));
    assert_eq!(resolved.len(), 2);
}

#[tokio::test]
async fn test_versions_are_passed_through() {
    let reader = MemoryReader::from_json(&json!({
        "db": {"versions": {
            "1": {"password": "first"},
            "21": {"password": "pinned"},
            "30": {"password": "latest"},
        }},
    }))
    .unwrap()
    .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let resolved = resolver
        .resolve_all(
            &CancellationToken::new(),
            map(json!({
                "a": "vault://db#password@21",
                "b": "vault://db#password",
                "c": "vault://db#password@",
            })),
        )
        .await
        .unwrap();

    assert_eq!(resolved["a"], SecretValue::from("pinned"));
    assert_eq!(resolved["b"], SecretValue::from("latest"));
    assert_eq!(resolved["c"], SecretValue::from("latest"));
    assert_eq!(
        reader.calls(),
        vec![
            call("db", Some("21")),
            call("db", None),
            call("db", None)
        ]
    );
}

#[tokio::test]
async fn test_reference_can_resolve_to_non_string() {
    let reader = MemoryReader::from_json(&json!({"cfg": {"port": 8200, "debug": false}}))
        .unwrap()
        .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let resolved = resolver
        .resolve_all(
            &CancellationToken::new(),
            map(json!({"port": "vault://cfg#port", "debug": "vault://cfg#debug"})),
        )
        .await
        .unwrap();

    assert_eq!(resolved, map(json!({"port": 8200, "debug": false})));
}

#[tokio::test]
async fn test_path_with_hash_uses_last_separator() {
    let reader = MemoryReader::from_json(&json!({"team#a": {"KEY": "hashed"}}))
        .unwrap()
        .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let resolved = resolver
        .resolve_all(
            &CancellationToken::new(),
            map(json!({"k": "vault://team#a#KEY"})),
        )
        .await
        .unwrap();

    assert_eq!(resolved["k"], SecretValue::from("hashed"));
    assert_eq!(reader.calls(), vec![call("team#a", None)]);
}

#[tokio::test]
async fn test_resolution_reaches_fixed_point() {
    let reader = MemoryReader::from_json(&json!({
        "a": {"x": "vault://b#y", "z": "vault://c#w"},
        "b": {"y": "vault://c#w"},
        "c": {"w": "bottom"},
    }))
    .unwrap()
    .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());

    let resolved = resolver
        .resolve_all(
            &CancellationToken::new(),
            map(json!({
                "one": "vault://a#x",
                "two": "vault://a#z",
                "three": "vault://c#w",
                "four": "literal",
            })),
        )
        .await
        .unwrap();

    assert!(resolved.values().all(|v| !v.is_reference()));
    assert_eq!(resolved["one"], SecretValue::from("bottom"));
    assert_eq!(resolved["two"], SecretValue::from("bottom"));
    assert_eq!(resolved["three"], SecretValue::from("bottom"));
}

#[tokio::test]
async fn test_cycle_is_bounded_by_max_depth() {
    let reader = MemoryReader::from_json(&json!({
        "a": {"next": "vault://b#next"},
        "b": {"next": "vault://a#next"},
    }))
    .unwrap()
    .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::with_max_depth(10));

    let result = resolver
        .resolve_all(&CancellationToken::new(), map(json!({"k": "vault://a#next"})))
        .await;

    assert!(matches!(result, Err(SecretError::ChainTooDeep { depth: 10, .. })));
    assert_eq!(reader.calls().len(), 10);
}

// The in-memory reader never yields, so the canceller needs its own worker
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cycle_is_stopped_by_cancellation() {
    let reader = MemoryReader::from_json(&json!({"loop": {"next": "vault://loop#next"}}))
        .unwrap()
        .recording();
    let resolver = SymlinkResolver::new(&reader, ResolverConfig::default());
    let ctx = CancellationToken::new();

    let canceller = ctx.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = resolver
        .resolve_all(&ctx, map(json!({"k": "vault://loop#next"})))
        .await;
    timer.await.unwrap();

    assert!(matches!(result, Err(SecretError::Cancelled)));
    assert!(!reader.calls().is_empty());
}
