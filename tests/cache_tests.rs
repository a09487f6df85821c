// Cache manager behaviour against an in-memory remote service
// Author: kelexine (https://github.com/kelexine)

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{listed, FakeService};
use gemcache::cache::{checksum, CacheManager};
use gemcache::config::CacheConfig;
use gemcache::models::gemini::{
    Content, FunctionCallingConfig, FunctionDeclaration, ToolConfig, ToolDeclaration,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

const CACHE_KEY: &str = "test-key";
const MODEL: &str = "gemini-2.0-flash";
const TTL: Duration = Duration::from_secs(30 * 60);

fn system_instruction(text: &str) -> Content {
    Content::text("model", text)
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

async fn manager_with(service: &Arc<FakeService>) -> CacheManager {
    CacheManager::new(service.clone()).await.unwrap()
}

#[tokio::test]
async fn test_repeated_calls_create_once() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    let first = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;
    let second = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;
    let third = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(service.create_calls(), 1);
    assert_eq!(service.remote_calls(), 1);
}

#[tokio::test]
async fn test_create_request_carries_content_and_display_name() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");
    let tools = ToolDeclaration {
        function_declarations: vec![FunctionDeclaration {
            name: "lookup".to_string(),
            description: "Look something up".to_string(),
            parameters: None,
        }],
    };
    let tool_config = ToolConfig {
        function_calling_config: FunctionCallingConfig {
            mode: "AUTO".to_string(),
            allowed_function_names: None,
        },
    };

    manager
        .get_or_create(CACHE_KEY, TTL, &content, Some(&tools), Some(&tool_config), MODEL)
        .await
        .unwrap();

    let (model, request) = service.created().remove(0);
    let expected_checksum = checksum(&content, Some(&tools), Some(&tool_config));
    assert_eq!(model, MODEL);
    assert_eq!(request.display_name, Some(format!("{}:{}", CACHE_KEY, expected_checksum)));
    assert_eq!(request.system_instruction, Some(content));
    assert_eq!(request.tools, Some(vec![tools]));
    assert_eq!(request.tool_config, Some(tool_config));
    assert_eq!(request.ttl.as_deref(), Some("1800s"));
}

#[tokio::test]
async fn test_scenario_reuse_then_replace() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let original = system_instruction("You are a helpful assistant");
    let different = system_instruction("different content");

    // Call 1 creates E1
    let e1 = manager.get_or_create("sys", TTL, &original, None, None, MODEL).await.unwrap();
    let entry = manager.entry("sys").await.unwrap();
    assert_eq!(entry.checksum.as_deref(), Some(sha256_hex("You are a helpful assistant").as_str()));

    // Call 2 reuses E1 without touching the remote service
    let calls_before = service.remote_calls();
    let reused = manager.get_or_create("sys", TTL, &original, None, None, MODEL).await;
    assert_eq!(reused.as_deref(), Some(e1.as_str()));
    assert_eq!(service.remote_calls(), calls_before);

    // Call 3 with different content deletes E1 and yields nothing
    let replaced = manager.get_or_create("sys", TTL, &different, None, None, MODEL).await;
    assert!(replaced.is_none());
    assert_eq!(service.deleted(), vec![e1.clone()]);
    assert!(manager.entry("sys").await.is_none());

    // Call 4 creates E2
    let e2 = manager.get_or_create("sys", TTL, &different, None, None, MODEL).await.unwrap();
    assert_ne!(e1, e2);
    assert_eq!(service.create_calls(), 2);
    assert_eq!(service.delete_calls(), 1);
}

#[tokio::test]
async fn test_near_expiry_entry_is_extended() {
    let service = Arc::new(FakeService::new());
    service.created_lifetime(ChronoDuration::seconds(30)); // inside the 60s grace window
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    let id = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await.unwrap();
    let before = manager.entry(CACHE_KEY).await.unwrap();

    let extended = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;

    assert_eq!(extended.as_deref(), Some(id.as_str()));
    assert_eq!(service.update_calls(), 1);
    assert_eq!(service.updated()[0].0, id);
    assert_eq!(service.updated()[0].1.ttl, "1800s");

    let after = manager.entry(CACHE_KEY).await.unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.checksum, before.checksum);
    assert!(after.expire_time > before.expire_time);
    assert!(after.expire_time > Utc::now() + ChronoDuration::minutes(29));

    // Refreshed entry is now reused
    manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await.unwrap();
    assert_eq!(service.update_calls(), 1);
    assert_eq!(service.create_calls(), 1);
}

#[tokio::test]
async fn test_expired_entry_is_recreated_without_delete() {
    let service = Arc::new(FakeService::new());
    service.created_lifetime(ChronoDuration::seconds(-1));
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    let first = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await.unwrap();
    let second = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(service.create_calls(), 2);
    assert_eq!(service.delete_calls(), 0);
    assert_eq!(service.update_calls(), 0);
}

#[tokio::test]
async fn test_create_failure_returns_none_and_leaves_key_absent() {
    let service = Arc::new(FakeService::new());
    service.fail_create(true);
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    let result = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;

    assert!(result.is_none());
    assert!(manager.entry(CACHE_KEY).await.is_none());
    assert!(manager.is_empty());

    // The next call starts from scratch
    service.fail_create(false);
    let retried = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;
    assert!(retried.is_some());
    assert_eq!(service.create_calls(), 2);
}

#[tokio::test]
async fn test_extend_failure_removes_entry() {
    let service = Arc::new(FakeService::new());
    service.created_lifetime(ChronoDuration::seconds(30));
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    let first = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;
    assert_eq!(first.as_deref(), Some("cachedContents/cache-1"));

    service.fail_update(true);
    let second = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;

    assert!(second.is_none());
    assert_eq!(service.update_calls(), 1);
    assert!(manager.entry(CACHE_KEY).await.is_none());

    // Absent again, so the next call creates
    let third = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await;
    assert_eq!(third.as_deref(), Some("cachedContents/cache-2"));
}

#[tokio::test]
async fn test_delete_failure_removes_entry() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let original = system_instruction("original content");
    let different = system_instruction("different content");

    let first = manager.get_or_create(CACHE_KEY, TTL, &original, None, None, MODEL).await;
    assert!(first.is_some());

    service.fail_delete(true);
    let second = manager.get_or_create(CACHE_KEY, TTL, &different, None, None, MODEL).await;

    assert!(second.is_none());
    assert_eq!(service.delete_calls(), 1);
    assert!(manager.entry(CACHE_KEY).await.is_none());

    // Delete is not retried; the next call creates
    let third = manager.get_or_create(CACHE_KEY, TTL, &different, None, None, MODEL).await;
    assert!(third.is_some());
    assert_eq!(service.delete_calls(), 1);
    assert_eq!(service.create_calls(), 2);
}

#[tokio::test]
async fn test_invalidate_forces_new_create() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    let first = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await.unwrap();
    manager.invalidate(CACHE_KEY).await;
    let second = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(service.create_calls(), 2);
    // The orphaned object is left to expire remotely
    assert_eq!(service.delete_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalidate_waits_for_in_flight_create() {
    let service = Arc::new(FakeService::new());
    service.delay(Duration::from_millis(200));
    let manager = manager_with(&service).await;

    let pending = {
        let manager = manager.clone();
        tokio::spawn(async move {
            let content = system_instruction("You are a helpful assistant");
            manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await
        })
    };

    // Let the create reach the remote service before invalidating
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.invalidate(CACHE_KEY).await;

    // The create finished before the entry was dropped
    assert_eq!(service.create_calls(), 1);
    assert!(manager.entry(CACHE_KEY).await.is_none());
    let first = pending.await.unwrap().unwrap();

    service.delay(Duration::ZERO);
    let content = system_instruction("You are a helpful assistant");
    let second = manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(service.create_calls(), 2);
}

#[tokio::test]
async fn test_invalidate_unknown_key_is_noop() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;

    manager.invalidate("non-existent-key").await;
    manager.invalidate("non-existent-key").await;

    assert_eq!(service.remote_calls(), 0);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_invalid_arguments_skip_remote_calls() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    assert!(manager.get_or_create("", TTL, &content, None, None, MODEL).await.is_none());
    assert!(manager
        .get_or_create(CACHE_KEY, Duration::ZERO, &content, None, None, MODEL)
        .await
        .is_none());
    assert_eq!(service.remote_calls(), 0);
}

#[tokio::test]
async fn test_sub_second_ttl_is_rejected() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");

    let id = manager
        .get_or_create(CACHE_KEY, Duration::from_millis(500), &content, None, None, MODEL)
        .await;

    assert!(id.is_none());
    assert_eq!(service.remote_calls(), 0);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_keys_are_independent() {
    let service = Arc::new(FakeService::new());
    let manager = manager_with(&service).await;
    let content = system_instruction("You are a helpful assistant");
    let other = system_instruction("different content");

    let a = manager.get_or_create("a", TTL, &content, None, None, MODEL).await.unwrap();
    let b = manager.get_or_create("b", TTL, &other, None, None, MODEL).await.unwrap();

    // Changing content for "b" does not touch "a"
    let changed = manager.get_or_create("b", TTL, &content, None, None, MODEL).await;
    assert!(changed.is_none());
    assert_eq!(service.deleted(), vec![b]);
    assert_eq!(manager.entry("a").await.unwrap().id, a);
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn test_bootstrap_loads_listed_entries() {
    let content = system_instruction("You are a helpful assistant");
    let digest = checksum(&content, None, None);
    let service = Arc::new(FakeService::with_listed(vec![
        listed("cachedContents/old", &format!("sys:{}", digest), ChronoDuration::minutes(5)),
        listed("cachedContents/new", &format!("sys:{}", digest), ChronoDuration::minutes(20)),
        listed("cachedContents/legacy", "legacy", ChronoDuration::minutes(20)),
    ]));
    let manager = manager_with(&service).await;

    assert_eq!(manager.len(), 2);
    assert_eq!(manager.entry("sys").await.unwrap().id, "cachedContents/new");
    assert!(manager.entry("legacy").await.unwrap().checksum.is_none());

    // Listed entry is reused without any remote call
    let id = manager.get_or_create("sys", TTL, &content, None, None, MODEL).await;
    assert_eq!(id.as_deref(), Some("cachedContents/new"));
    assert_eq!(service.remote_calls(), 0);
}

#[tokio::test]
async fn test_bootstrap_skips_incomplete_objects() {
    let mut no_expiry = listed("cachedContents/x", "x:abc", ChronoDuration::minutes(5));
    no_expiry.expire_time = None;
    let service = Arc::new(FakeService::with_listed(vec![
        no_expiry,
        listed("cachedContents/y", "y:abc", ChronoDuration::minutes(5)),
    ]));
    let manager = manager_with(&service).await;

    assert_eq!(manager.len(), 1);
    assert!(manager.entry("x").await.is_none());
}

#[tokio::test]
async fn test_bootstrap_failure_aborts_construction() {
    let service = Arc::new(FakeService::new());
    service.fail_list(true);

    let result = CacheManager::with_config(service.clone(), &CacheConfig::default()).await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_key_calls_create_once() {
    let service = Arc::new(FakeService::new());
    service.delay(Duration::from_millis(20));
    let manager = manager_with(&service).await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move {
                let content = system_instruction("You are a helpful assistant");
                manager.get_or_create(CACHE_KEY, TTL, &content, None, None, MODEL).await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }

    assert_eq!(service.create_calls(), 1);
    assert!(ids.iter().all(|id| id == &ids[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_proceed_in_parallel() {
    let service = Arc::new(FakeService::new());
    service.delay(Duration::from_millis(100));
    let manager = manager_with(&service).await;

    let tasks: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|key| {
            let manager = manager.clone();
            tokio::spawn(async move {
                let content = system_instruction("You are a helpful assistant");
                manager.get_or_create(key, TTL, &content, None, None, MODEL).await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_some());
    }

    assert_eq!(service.create_calls(), 4);
    assert!(service.max_in_flight() > 1);
    assert_eq!(manager.len(), 4);
}
