//! Integration tests for `BindingValidator` against instrumented stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nameguard_store::{
    Binding, BindingStore, IdentityKey, MemoryBindingStore, StoreError,
};
use nameguard_validator::{
    AllowOutcome, BindingValidator, Decision, DenyReason, EventError,
    LoginEvent, ValidatorConfig,
};

// =========================================================================
// Instrumented stores
// =========================================================================

/// Wraps the memory store and counts every call.
#[derive(Default)]
struct CountingStore {
    inner: MemoryBindingStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl BindingStore for CountingStore {
    async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Binding>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_name(name).await
    }

    async fn upsert(
        &self,
        identity_key: &IdentityKey,
        name: &str,
        origin_address: Option<&str>,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(identity_key, name, origin_address).await
    }

    async fn touch_last_seen(
        &self,
        identity_key: &IdentityKey,
        origin_address: &str,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.touch_last_seen(identity_key, origin_address).await
    }
}

/// A store whose reads and/or writes fail as if the database were down.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryBindingStore,
    fail_reads: bool,
    fail_writes: bool,
}

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}

impl BindingStore for FlakyStore {
    async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Binding>, StoreError> {
        if self.fail_reads {
            return Err(down());
        }
        self.inner.find_by_name(name).await
    }

    async fn upsert(
        &self,
        identity_key: &IdentityKey,
        name: &str,
        origin_address: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(down());
        }
        self.inner.upsert(identity_key, name, origin_address).await
    }

    async fn touch_last_seen(
        &self,
        identity_key: &IdentityKey,
        origin_address: &str,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(down());
        }
        self.inner.touch_last_seen(identity_key, origin_address).await
    }
}

/// Returns a stale "no binding" for the first `stale_reads` lookups,
/// reproducing a login that read before a concurrent claim committed.
struct StaleReadStore {
    inner: MemoryBindingStore,
    stale_reads: AtomicUsize,
}

impl BindingStore for StaleReadStore {
    async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Binding>, StoreError> {
        let stale = self
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.find_by_name(name).await
    }

    async fn upsert(
        &self,
        identity_key: &IdentityKey,
        name: &str,
        origin_address: Option<&str>,
    ) -> Result<(), StoreError> {
        self.inner.upsert(identity_key, name, origin_address).await
    }

    async fn touch_last_seen(
        &self,
        identity_key: &IdentityKey,
        origin_address: &str,
    ) -> Result<(), StoreError> {
        self.inner.touch_last_seen(identity_key, origin_address).await
    }
}

/// Every write collides (e.g. a concurrent insert of the same identity
/// key under another name) and the name never shows up on re-read.
struct ConflictingStore;

impl BindingStore for ConflictingStore {
    async fn find_by_name(
        &self,
        _name: &str,
    ) -> Result<Option<Binding>, StoreError> {
        Ok(None)
    }

    async fn upsert(
        &self,
        _identity_key: &IdentityKey,
        _name: &str,
        _origin_address: Option<&str>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Violation("duplicate entry for PRIMARY".into()))
    }

    async fn touch_last_seen(
        &self,
        _identity_key: &IdentityKey,
        _origin_address: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Never answers within any sane timeout.
struct HangingStore;

impl BindingStore for HangingStore {
    async fn find_by_name(
        &self,
        _name: &str,
    ) -> Result<Option<Binding>, StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(None)
    }

    async fn upsert(
        &self,
        _identity_key: &IdentityKey,
        _name: &str,
        _origin_address: Option<&str>,
    ) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn touch_last_seen(
        &self,
        _identity_key: &IdentityKey,
        _origin_address: &str,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn counting() -> BindingValidator<CountingStore> {
    BindingValidator::new(CountingStore::default(), ValidatorConfig::default())
}

fn login(name: &str, key: &str, address: &str) -> LoginEvent {
    LoginEvent::new(name, key, address)
}

fn key(raw: &str) -> IdentityKey {
    IdentityKey::new(raw)
}

const CLAIMED: Decision = Decision::Allow {
    outcome: AllowOutcome::Claimed,
};
const REAFFIRMED: Decision = Decision::Allow {
    outcome: AllowOutcome::Reaffirmed,
};
const DENIED: Decision = Decision::Deny {
    reason: DenyReason::NameBoundToOtherIdentity,
};

// =========================================================================
// Decision policy
// =========================================================================

#[tokio::test]
async fn test_evaluate_alice_scenario() {
    let validator = counting();
    let store = &validator.store().inner;

    // 1. Fresh claim.
    let d1 = validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;
    assert_eq!(d1, CLAIMED);
    assert_eq!(
        store.snapshot().await,
        vec![Binding {
            identity_key: key("uuid-1"),
            name: "Alice".into(),
            first_seen_address: Some("1.1.1.1".into()),
            last_seen_address: Some("1.1.1.1".into()),
        }]
    );

    // 2. Same identity from a new address.
    let d2 = validator.evaluate(&login("Alice", "uuid-1", "2.2.2.2")).await;
    assert_eq!(d2, REAFFIRMED);
    let row = store.get(&key("uuid-1")).await.unwrap();
    assert_eq!(row.first_seen_address.as_deref(), Some("1.1.1.1"));
    assert_eq!(row.last_seen_address.as_deref(), Some("2.2.2.2"));

    // 3. Impersonation attempt.
    let before = store.snapshot().await;
    let d3 = validator.evaluate(&login("Alice", "uuid-2", "3.3.3.3")).await;
    assert_eq!(d3, DENIED);
    assert_eq!(store.snapshot().await, before, "deny must not write");
}

#[tokio::test]
async fn test_evaluate_fresh_claim_writes_once() {
    let validator = counting();

    let decision = validator.evaluate(&login("Bob", "uuid-9", "9.9.9.9")).await;

    assert_eq!(decision, CLAIMED);
    assert_eq!(validator.store().reads(), 1);
    assert_eq!(validator.store().writes(), 1);
}

#[tokio::test]
async fn test_evaluate_deny_performs_zero_writes() {
    let validator = counting();
    validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;
    let writes_before = validator.store().writes();

    for i in 2..6 {
        let decision = validator
            .evaluate(&login("Alice", &format!("uuid-{i}"), "6.6.6.6"))
            .await;
        assert_eq!(decision, DENIED);
    }

    assert_eq!(validator.store().writes(), writes_before);
}

#[tokio::test]
async fn test_evaluate_deny_is_case_insensitive() {
    let validator = counting();
    validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;

    let decision = validator.evaluate(&login("aLICE", "uuid-2", "3.3.3.3")).await;

    assert_eq!(decision, DENIED);
}

#[tokio::test]
async fn test_evaluate_reaffirm_with_new_casing_updates_name() {
    let validator = counting();
    validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;

    let decision = validator.evaluate(&login("ALICE", "uuid-1", "2.2.2.2")).await;

    assert_eq!(decision, REAFFIRMED);
    let row = validator.store().inner.get(&key("uuid-1")).await.unwrap();
    assert_eq!(row.name, "ALICE");
    assert_eq!(row.first_seen_address.as_deref(), Some("1.1.1.1"));
    assert_eq!(row.last_seen_address.as_deref(), Some("2.2.2.2"));
}

#[tokio::test]
async fn test_evaluate_uuid_spelling_variants_are_one_identity() {
    let validator = counting();
    validator
        .evaluate(&login("Alice", "0F8FAD5B-D9CB-469F-A165-70867728950E", "1.1.1.1"))
        .await;

    let decision = validator
        .evaluate(&login("Alice", "0f8fad5bd9cb469fa16570867728950e", "2.2.2.2"))
        .await;

    assert_eq!(decision, REAFFIRMED);
}

#[tokio::test]
async fn test_evaluate_known_identity_claims_free_name() {
    // No cross-name enforcement: an identity that already owns a name may
    // claim another free one; its row moves to the new name.
    let validator = counting();
    validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;

    let decision = validator.evaluate(&login("Alicia", "uuid-1", "2.2.2.2")).await;

    assert_eq!(decision, CLAIMED);
    let store = &validator.store().inner;
    assert_eq!(store.len().await, 1);
    assert!(store.find_by_name("Alice").await.unwrap().is_none());
    let row = store.get(&key("uuid-1")).await.unwrap();
    assert_eq!(row.name, "Alicia");
    assert_eq!(row.first_seen_address.as_deref(), Some("1.1.1.1"));
}

// =========================================================================
// Properties
// =========================================================================

#[tokio::test]
async fn test_evaluate_repeated_allow_is_idempotent() {
    let validator = counting();
    let event = login("Carol", "uuid-3", "3.3.3.3");
    validator.evaluate(&event).await;
    let first = validator.store().inner.snapshot().await;

    for _ in 0..5 {
        assert_eq!(validator.evaluate(&event).await, REAFFIRMED);
    }

    assert_eq!(validator.store().inner.snapshot().await, first);
}

#[tokio::test]
async fn test_evaluate_first_seen_is_immutable() {
    let validator = counting();
    validator.evaluate(&login("Dave", "uuid-4", "10.0.0.1")).await;

    for i in 2..10 {
        let address = format!("10.0.0.{i}");
        validator.evaluate(&login("Dave", "uuid-4", &address)).await;
    }

    let row = validator.store().inner.get(&key("uuid-4")).await.unwrap();
    assert_eq!(row.first_seen_address.as_deref(), Some("10.0.0.1"));
    assert_eq!(row.last_seen_address.as_deref(), Some("10.0.0.9"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_evaluate_concurrent_claims_allow_exactly_one() {
    let validator = Arc::new(BindingValidator::new(
        MemoryBindingStore::new(),
        ValidatorConfig::default(),
    ));

    let mut tasks = Vec::new();
    for i in 0..32 {
        let validator = Arc::clone(&validator);
        tasks.push(tokio::spawn(async move {
            let event = login("Alice", &format!("uuid-{i}"), "10.0.0.1");
            (i, validator.evaluate(&event).await)
        }));
    }

    let mut winners = Vec::new();
    for task in tasks {
        let (i, decision) = task.await.expect("task should not panic");
        match decision {
            Decision::Allow { .. } => winners.push(i),
            Decision::Deny { .. } => {}
            other => panic!("unexpected decision: {other}"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one claim may win");
    let rows = validator.store().snapshot().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].identity_key, key(&format!("uuid-{}", winners[0])));
}

// =========================================================================
// Address tracking disabled
// =========================================================================

#[tokio::test]
async fn test_evaluate_untracked_stores_no_addresses() {
    let validator = BindingValidator::new(
        CountingStore::default(),
        ValidatorConfig {
            track_addresses: false,
            ..ValidatorConfig::default()
        },
    );

    assert_eq!(
        validator.evaluate(&login("Erin", "uuid-5", "5.5.5.5")).await,
        CLAIMED
    );
    let writes_after_claim = validator.store().writes();
    assert_eq!(
        validator.evaluate(&login("Erin", "uuid-5", "6.6.6.6")).await,
        REAFFIRMED
    );

    let row = validator.store().inner.get(&key("uuid-5")).await.unwrap();
    assert_eq!(row.first_seen_address, None);
    assert_eq!(row.last_seen_address, None);
    // Nothing changed, so the reaffirming login wrote nothing.
    assert_eq!(validator.store().writes(), writes_after_claim);
}

// =========================================================================
// Invalid events
// =========================================================================

#[tokio::test]
async fn test_evaluate_invalid_event_never_touches_store() {
    let validator = counting();

    let blank = validator.evaluate(&login("", "uuid-1", "1.1.1.1")).await;
    let keyless = validator.evaluate(&login("Alice", "  ", "1.1.1.1")).await;

    assert_eq!(blank, Decision::Invalid { error: EventError::BlankName });
    assert_eq!(
        keyless,
        Decision::Invalid {
            error: EventError::BlankIdentityKey
        }
    );
    assert_eq!(validator.store().reads(), 0);
    assert_eq!(validator.store().writes(), 0);
}

#[tokio::test]
async fn test_evaluate_long_address_on_bound_name_still_denies() {
    let validator = counting();
    validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;
    let before = validator.store().inner.snapshot().await;

    let decision = validator
        .evaluate(&login(
            "Alice",
            "uuid-2",
            "ffff:ffff:ffff:ffff:ffff:ffff:255.255.255.255%eth0",
        ))
        .await;

    assert_eq!(decision, DENIED);
    assert_eq!(validator.store().inner.snapshot().await, before);
}

#[tokio::test]
async fn test_evaluate_long_address_on_free_name_claims_without_address() {
    let validator = counting();

    let decision = validator
        .evaluate(&login("Bob", "uuid-1", &"9".repeat(60)))
        .await;

    assert_eq!(decision, CLAIMED);
    let row = validator.store().inner.get(&key("uuid-1")).await.unwrap();
    assert_eq!(row.first_seen_address, None);
    assert_eq!(row.last_seen_address, None);
}

#[tokio::test]
async fn test_evaluate_long_key_on_bound_name_denies() {
    let validator = counting();
    validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;
    let writes_before = validator.store().writes();

    let decision = validator
        .evaluate(&login("alice", &"x".repeat(40), "3.3.3.3"))
        .await;

    assert_eq!(decision, DENIED);
    assert_eq!(validator.store().writes(), writes_before);
}

#[tokio::test]
async fn test_evaluate_long_key_on_free_name_is_invalid_and_writes_nothing() {
    let validator = counting();

    let decision = validator
        .evaluate(&login("Alice", &"x".repeat(40), "1.1.1.1"))
        .await;

    assert_eq!(
        decision,
        Decision::Invalid {
            error: EventError::IdentityKeyTooLong(40)
        }
    );
    assert_eq!(validator.store().reads(), 1);
    assert_eq!(validator.store().writes(), 0);
    assert!(validator.store().inner.is_empty().await);
}

// =========================================================================
// Store failures
// =========================================================================

#[tokio::test]
async fn test_evaluate_read_failure_is_unresolved() {
    let validator = BindingValidator::new(
        FlakyStore {
            fail_reads: true,
            ..FlakyStore::default()
        },
        ValidatorConfig::default(),
    );

    let decision = validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;

    assert_eq!(decision, Decision::Unresolved { error: down() });
    assert!(validator.store().inner.is_empty().await);
}

#[tokio::test]
async fn test_evaluate_write_failure_is_unresolved_not_deny() {
    let validator = BindingValidator::new(
        FlakyStore {
            fail_writes: true,
            ..FlakyStore::default()
        },
        ValidatorConfig::default(),
    );

    let decision = validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;

    assert!(matches!(decision, Decision::Unresolved { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_evaluate_timeout_is_unresolved() {
    let validator = BindingValidator::new(
        HangingStore,
        ValidatorConfig {
            operation_timeout_ms: 50,
            ..ValidatorConfig::default()
        },
    );

    let decision = validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;

    match decision {
        Decision::Unresolved {
            error: StoreError::Unavailable(detail),
        } => assert!(detail.contains("timed out"), "got {detail}"),
        other => panic!("expected unresolved timeout, got {other}"),
    }
}

// =========================================================================
// Constraint conflicts
// =========================================================================

#[tokio::test]
async fn test_evaluate_lost_race_rechecks_and_denies() {
    // uuid-1 already holds the name, but uuid-2's lookup is stale and
    // sees nothing; the store's unique index stops the write.
    let inner = MemoryBindingStore::new();
    inner.upsert(&key("uuid-1"), "Alice", Some("1.1.1.1")).await.unwrap();
    let validator = BindingValidator::new(
        StaleReadStore {
            inner,
            stale_reads: AtomicUsize::new(1),
        },
        ValidatorConfig::default(),
    );

    let decision = validator.evaluate(&login("Alice", "uuid-2", "3.3.3.3")).await;

    assert_eq!(decision, DENIED);
    let row = validator.store().inner.find_by_name("Alice").await.unwrap().unwrap();
    assert_eq!(row.identity_key, key("uuid-1"));
    assert_eq!(row.last_seen_address.as_deref(), Some("1.1.1.1"));
}

#[tokio::test]
async fn test_evaluate_conflict_without_holder_denies() {
    let validator = BindingValidator::new(ConflictingStore, ValidatorConfig::default());

    let decision = validator.evaluate(&login("Alice", "uuid-1", "1.1.1.1")).await;

    assert_eq!(
        decision,
        Decision::Deny {
            reason: DenyReason::ClaimConflict
        }
    );
}
