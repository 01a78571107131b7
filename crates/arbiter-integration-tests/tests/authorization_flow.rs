//! Integration tests for the full authorization flow.
//!
//! Exercises the system end to end: validation, rule evaluation, decision
//! recording, learned auto-approval, and manual-review deferral.

#![allow(clippy::arithmetic_side_effects)]

use std::sync::Arc;

use arbiter_core::{Request, RequestKind, UserContext};
use arbiter_engine::rule::CustomRule;
use arbiter_engine::{AuthorizationSystem, AuthzError, DecisionHistory, Pattern, Verdict};

fn file_request(id: &str, path: &str) -> Request {
    Request::new(id, RequestKind::FileAccess, "alice")
        .with_field("path", path)
        .with_field("mode", "read")
}

fn file_user() -> UserContext {
    UserContext::new("alice", 1).with_permission("file_access")
}

/// Three identical rule-based approvals make the fourth call auto-approve
/// from history, even for a caller with no permissions.
#[test]
fn test_exact_precedent_convergence() {
    let system = AuthorizationSystem::new();
    let request = file_request("req-1", "/tmp/export.csv");

    for _ in 0..3 {
        let decision = system.authorize(&request, &file_user()).unwrap();
        assert_eq!(decision.verdict, Verdict::Approved);
        assert_eq!(decision.reason, "approved by rule: file-access");
    }

    let stranger = UserContext::new("mallory", 0);
    let decision = system.authorize(&request, &stranger).unwrap();
    assert_eq!(decision.verdict, Verdict::Approved);
    assert_eq!(decision.reason, "auto-approved by decision history");
}

/// A single denial in the pattern's history blocks the exact tier for good.
#[test]
fn test_denied_pattern_does_not_converge() {
    let system = AuthorizationSystem::new();
    let request = file_request("req-1", "/tmp/export.csv");

    // First touch is a denial (no permission).
    let denied = system
        .authorize(&request, &UserContext::new("alice", 1))
        .unwrap();
    assert_eq!(denied.verdict, Verdict::Denied);

    // Many approvals afterwards never make it unanimous.
    for _ in 0..5 {
        system.authorize(&request, &file_user()).unwrap();
    }
    let decision = system
        .authorize(&request, &UserContext::new("mallory", 0))
        .unwrap();
    assert_eq!(decision.verdict, Verdict::Denied);
}

/// Approvals of three distinct same-kind shapes unlock the similar tier for
/// a fourth shape, gated on the caller's security level.
#[test]
fn test_similar_tier_requires_security_floor() {
    let system = AuthorizationSystem::new();
    for (id, path) in [
        ("req-1", "/tmp/a.csv"),
        ("req-2", "/tmp/b.csv"),
        ("req-3", "/tmp/c.csv"),
    ] {
        let decision = system.authorize(&file_request(id, path), &file_user()).unwrap();
        assert_eq!(decision.verdict, Verdict::Approved);
    }

    let novel = file_request("req-4", "/srv/shared/data.csv");
    // Below the file-access floor: falls through to the file-access rule,
    // which the caller lacks permission for.
    let below = system
        .authorize(&novel, &UserContext::new("mallory", 0))
        .unwrap();
    assert_eq!(below.verdict, Verdict::Denied);

    // At the floor, the learning rule approves from similar precedent even
    // without the file_access permission.
    let novel2 = file_request("req-5", "/srv/shared/other.csv");
    let at_floor = system
        .authorize(&novel2, &UserContext::new("mallory", 1))
        .unwrap();
    assert_eq!(at_floor.verdict, Verdict::Approved);
    assert_eq!(at_floor.reason, "approved by rule: learning");
}

/// Malformed requests fail closed: an error, nothing recorded, nothing
/// queued.
#[test]
fn test_invalid_request_leaves_no_trace() {
    let system = AuthorizationSystem::new();
    let invalid = Request::new("", RequestKind::FileAccess, "alice").with_field("path", "/tmp/x");

    let result = system.authorize(&invalid, &file_user());
    assert!(matches!(result, Err(AuthzError::InvalidRequest(_))));
    assert!(system.history().is_empty());
    assert!(system.review_queue().is_empty());
}

/// A system whose rules cover nothing defers to manual review in FIFO order
/// without recording decisions.
#[test]
fn test_deferral_queues_fifo() {
    let history = Arc::new(DecisionHistory::new());
    let system = AuthorizationSystem::bare(Arc::clone(&history));

    let first = system
        .authorize(&file_request("req-1", "/tmp/a"), &file_user())
        .unwrap();
    let second = system
        .authorize(&file_request("req-2", "/tmp/b"), &file_user())
        .unwrap();
    assert_eq!(first.verdict, Verdict::Deferred);
    assert_eq!(second.verdict, Verdict::Deferred);
    assert!(history.is_empty());

    let queue = system.review_queue();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop_next().map(|p| p.request.id), Some("req-1".into()));
    assert_eq!(queue.pop_next().map(|p| p.request.id), Some("req-2".into()));
    assert!(queue.is_empty());
}

/// A caller-registered rule slots into the priority order alongside the
/// built-ins.
#[test]
fn test_custom_rule_in_standard_system() {
    let mut system = AuthorizationSystem::new();
    system.add_rule(
        CustomRule::for_kinds(
            "config-freeze",
            250,
            [RequestKind::ConfigurationChange],
            |_, _| false,
        ),
    );
    system.add_rule(CustomRule::for_kinds(
        "config-allow",
        50,
        [RequestKind::ConfigurationChange],
        |_, context| context.security_level >= 2,
    ));

    let request = Request::new("req-1", RequestKind::ConfigurationChange, "alice")
        .with_field("setting", "timeout")
        .with_field("value", 300_i64);

    // The freeze rule never approves; the low-priority allow rule does.
    let decision = system
        .authorize(&request, &UserContext::new("alice", 2))
        .unwrap();
    assert_eq!(decision.reason, "approved by rule: config-allow");

    let denied = system
        .authorize(&request, &UserContext::new("bob", 1))
        .unwrap();
    assert_eq!(denied.verdict, Verdict::Denied);
}

/// Pattern keys are deterministic across field insertion order and shared
/// between users, so precedent transfers between structurally identical
/// requests.
#[test]
fn test_pattern_identity_across_callers() {
    let a = Request::new("req-1", RequestKind::FileAccess, "alice")
        .with_field("mode", "read")
        .with_field("path", "/tmp/x");
    let b = Request::new("req-2", RequestKind::FileAccess, "bob")
        .with_field("path", "/tmp/x")
        .with_field("mode", "read");
    assert_eq!(Pattern::derive(&a), Pattern::derive(&b));

    let system = AuthorizationSystem::new();
    for id in ["req-1", "req-2", "req-3"] {
        let request = Request::new(id, RequestKind::FileAccess, "alice")
            .with_field("mode", "read")
            .with_field("path", "/tmp/x");
        system.authorize(&request, &file_user()).unwrap();
    }
    // Bob's structurally identical request rides Alice's precedent.
    let decision = system
        .authorize(&b, &UserContext::new("bob", 0))
        .unwrap();
    assert_eq!(decision.reason, "auto-approved by decision history");
}

/// Decisions serialize with snake_case verdicts for downstream consumers.
#[test]
fn test_decision_wire_format() {
    let system = AuthorizationSystem::new();
    let decision = system
        .authorize(&file_request("req-1", "/tmp/x"), &file_user())
        .unwrap();
    let json = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["verdict"], "approved");
    assert!(json["reason"].is_string());
}

/// Concurrent authorization across threads loses no history updates.
#[test]
fn test_concurrent_authorization() {
    let system = Arc::new(AuthorizationSystem::new());
    let threads = 4;
    let per_thread = 20;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let system = Arc::clone(&system);
            std::thread::spawn(move || {
                for i in 0..per_thread {
                    let request = file_request(&format!("req-{t}-{i}"), &format!("/tmp/{t}/{i}"));
                    system.authorize(&request, &file_user()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(system.history().len(), threads * per_thread);
}
