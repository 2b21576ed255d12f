//! Integration tests for the broadcast core.
//!
//! SQLite needs no server, so unlike a Postgres-backed suite these run as
//! part of the normal `cargo test` pass. Transport behavior is scripted
//! through `FakeMessenger`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use herald_broadcast::broadcaster::Broadcaster;
use herald_broadcast::delivery::deliver;
use herald_broadcast::resolver::RecipientResolver;
use herald_broadcast::subscription::SubscriptionStore;
use herald_common::messenger::{ChatAdministrator, Messenger, MessengerError};
use herald_common::types::TriggerMessage;

// ============================================================
// Shared helpers
// ============================================================

/// Scripted in-memory messenger. Sends succeed unless a failure queue is
/// scripted for the recipient; each send pops one queued failure.
struct FakeMessenger {
    admins: Mutex<Result<Vec<ChatAdministrator>, MessengerError>>,
    scripts: Mutex<HashMap<i64, VecDeque<MessengerError>>>,
    sent: Mutex<Vec<(i64, String)>>,
}

impl FakeMessenger {
    fn new() -> Self {
        Self {
            admins: Mutex::new(Ok(Vec::new())),
            scripts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn with_admins(self, admins: Vec<ChatAdministrator>) -> Self {
        *self.admins.lock().unwrap() = Ok(admins);
        self
    }

    fn with_failing_admin_lookup(self) -> Self {
        *self.admins.lock().unwrap() = Err(MessengerError::Api("lookup failed".to_string()));
        self
    }

    fn script_failures(self, user_id: i64, failures: Vec<MessengerError>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(user_id, failures.into());
        self
    }

    fn sent_messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Messenger for FakeMessenger {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, MessengerError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&chat_id)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(failure) => Err(failure),
            None => Ok(1),
        }
    }

    async fn chat_administrators(
        &self,
        _chat_id: i64,
    ) -> Result<Vec<ChatAdministrator>, MessengerError> {
        self.admins.lock().unwrap().clone()
    }

    async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> Result<(), MessengerError> {
        Ok(())
    }
}

fn admin(user_id: i64) -> ChatAdministrator {
    ChatAdministrator {
        user_id,
        can_delete_messages: true,
        is_member: true,
    }
}

fn trigger(chat_id: i64) -> TriggerMessage {
    TriggerMessage {
        chat_id,
        message_id: 100,
        title: "Test Group".to_string(),
        username: None,
    }
}

/// Store over a fresh in-memory database, for tests that manage their own
/// runtime (the paused-clock ones).
async fn memory_store() -> SubscriptionStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../../migrations").run(&pool).await.unwrap();
    SubscriptionStore::new(pool)
}

// ============================================================
// SubscriptionStore
// ============================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_subscribe_then_lookup(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);

    store.subscribe(7, 1).await.unwrap();
    assert!(store.subscribers_of(1).await.unwrap().contains(&7));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unsubscribe_removes(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);

    store.subscribe(7, 1).await.unwrap();
    store.unsubscribe(7, 1).await.unwrap();
    assert!(!store.subscribers_of(1).await.unwrap().contains(&7));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unsubscribe_absent_is_noop(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);

    // Never subscribed; must not error.
    store.unsubscribe(7, 1).await.unwrap();
    assert!(store.subscribers_of(1).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_duplicate_subscribe_keeps_single_row(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool.clone());

    store.subscribe(7, 1).await.unwrap();
    store.subscribe(7, 1).await.unwrap();

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE user_id = 7 AND chat_id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count.0, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_forget_removes_across_chats(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);

    store.subscribe(7, 1).await.unwrap();
    store.subscribe(7, 2).await.unwrap();
    store.subscribe(8, 1).await.unwrap();

    store.forget(7).await.unwrap();

    assert!(!store.subscribers_of(1).await.unwrap().contains(&7));
    assert!(!store.subscribers_of(2).await.unwrap().contains(&7));
    // Other subscribers untouched.
    assert!(store.subscribers_of(1).await.unwrap().contains(&8));
}

// ============================================================
// RecipientResolver
// ============================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_resolve_merges_admins_and_subscribers(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(50, 1).await.unwrap();
    store.subscribe(51, 1).await.unwrap();

    let messenger = FakeMessenger::new().with_admins(vec![admin(10), admin(11), admin(12)]);
    let resolver = RecipientResolver::new(5);

    let ids = resolver.resolve(&messenger, &store, 1).await.unwrap();
    assert_eq!(ids.len(), 5);
    for id in [10, 11, 12, 50, 51] {
        assert!(ids.contains(&id));
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resolve_deduplicates_subscribed_admin(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(10, 1).await.unwrap();
    store.subscribe(50, 1).await.unwrap();

    let messenger = FakeMessenger::new().with_admins(vec![admin(10), admin(11)]);
    let resolver = RecipientResolver::new(5);

    let ids = resolver.resolve(&messenger, &store, 1).await.unwrap();
    assert_eq!(ids.len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resolve_excludes_admins_over_cap(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(50, 1).await.unwrap();

    let admins: Vec<ChatAdministrator> = (10..20).map(admin).collect();
    let messenger = FakeMessenger::new().with_admins(admins);
    let resolver = RecipientResolver::new(5);

    // 10 qualifying admins against a cap of 5: all of them are dropped, not
    // a truncated sample.
    let ids = resolver.resolve(&messenger, &store, 1).await.unwrap();
    assert_eq!(ids.len(), 1);
    assert!(ids.contains(&50));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_over_cap_admin_still_reached_via_subscription(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(12, 1).await.unwrap();

    let admins: Vec<ChatAdministrator> = (10..20).map(admin).collect();
    let messenger = FakeMessenger::new().with_admins(admins);
    let resolver = RecipientResolver::new(5);

    // Dropping the admin list must not drop someone who opted in themselves.
    let ids = resolver.resolve(&messenger, &store, 1).await.unwrap();
    assert_eq!(ids.len(), 1);
    assert!(ids.contains(&12));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resolve_filters_unqualified_admins(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);

    let messenger = FakeMessenger::new().with_admins(vec![
        admin(10),
        ChatAdministrator {
            user_id: 11,
            can_delete_messages: false,
            is_member: true,
        },
        ChatAdministrator {
            user_id: 12,
            can_delete_messages: true,
            is_member: false,
        },
    ]);
    let resolver = RecipientResolver::new(5);

    let ids = resolver.resolve(&messenger, &store, 1).await.unwrap();
    assert_eq!(ids.len(), 1);
    assert!(ids.contains(&10));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resolve_survives_admin_lookup_failure(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(50, 1).await.unwrap();

    let messenger = FakeMessenger::new().with_failing_admin_lookup();
    let resolver = RecipientResolver::new(5);

    // Fail open to the subscriber list.
    let ids = resolver.resolve(&messenger, &store, 1).await.unwrap();
    assert_eq!(ids.len(), 1);
    assert!(ids.contains(&50));
}

// ============================================================
// Delivery
// ============================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_delivery_success(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    let messenger = FakeMessenger::new();

    let delivered = deliver(&messenger, &store, 7, "hello").await.unwrap();
    assert!(delivered);
    assert_eq!(messenger.sent_messages().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_blocked_recipient_is_forgotten_everywhere(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(7, 1).await.unwrap();
    store.subscribe(7, 2).await.unwrap();

    let messenger = FakeMessenger::new().script_failures(7, vec![MessengerError::Blocked]);

    let delivered = deliver(&messenger, &store, 7, "hello").await.unwrap();
    assert!(!delivered);
    // No retry for a permanent failure.
    assert_eq!(messenger.sent_messages().len(), 1);
    assert!(store.subscribers_of(1).await.unwrap().is_empty());
    assert!(store.subscribers_of(2).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_deactivated_recipient_is_forgotten(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(7, 1).await.unwrap();

    let messenger = FakeMessenger::new().script_failures(7, vec![MessengerError::Deactivated]);

    assert!(!deliver(&messenger, &store, 7, "hello").await.unwrap());
    assert!(store.subscribers_of(1).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_api_error_keeps_subscription(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(7, 1).await.unwrap();

    let messenger =
        FakeMessenger::new().script_failures(7, vec![MessengerError::Api("500".to_string())]);

    let delivered = deliver(&messenger, &store, 7, "hello").await.unwrap();
    assert!(!delivered);
    // Possibly transient: the recipient stays subscribed.
    assert!(store.subscribers_of(1).await.unwrap().contains(&7));
}

#[tokio::test]
async fn test_rate_limited_delivery_retries_once_after_wait() {
    let store = memory_store().await;
    let messenger = FakeMessenger::new()
        .script_failures(7, vec![MessengerError::RateLimited { retry_after: 3 }]);

    tokio::time::pause();
    let started = tokio::time::Instant::now();
    let delivered = deliver(&messenger, &store, 7, "hello").await.unwrap();
    tokio::time::resume();

    assert!(delivered);
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(messenger.sent_messages().len(), 2);
}

#[tokio::test]
async fn test_second_rate_limit_is_final() {
    let store = memory_store().await;
    let messenger = FakeMessenger::new().script_failures(
        7,
        vec![
            MessengerError::RateLimited { retry_after: 2 },
            MessengerError::RateLimited { retry_after: 30 },
        ],
    );

    tokio::time::pause();
    let started = tokio::time::Instant::now();
    let delivered = deliver(&messenger, &store, 7, "hello").await.unwrap();
    tokio::time::resume();

    assert!(!delivered);
    // Exactly one backoff happened; the second rate limit did not sleep.
    assert_eq!(messenger.sent_messages().len(), 2);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(30));
}

// ============================================================
// Broadcaster
// ============================================================

#[sqlx::test(migrations = "../../migrations")]
async fn test_broadcast_reaches_admins_and_subscribers(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(50, 1).await.unwrap();
    store.subscribe(51, 1).await.unwrap();

    let messenger = FakeMessenger::new().with_admins(vec![admin(10), admin(11), admin(12)]);
    let broadcaster = Broadcaster::new(5);

    let sent = broadcaster
        .broadcast(&messenger, &store, &trigger(1), "Summons:")
        .await
        .unwrap();

    assert!(sent);
    assert_eq!(messenger.sent_messages().len(), 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_broadcast_message_text(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(50, 1).await.unwrap();

    let messenger = FakeMessenger::new();
    let broadcaster = Broadcaster::new(5);

    let trigger = TriggerMessage {
        chat_id: 1,
        message_id: 42,
        title: "Rust Chat".to_string(),
        username: Some("rustchat".to_string()),
    };
    broadcaster
        .broadcast(&messenger, &store, &trigger, "Spam reported.")
        .await
        .unwrap();

    let sent = messenger.sent_messages();
    assert_eq!(
        sent[0].1,
        "Spam reported. Chat \"Rust Chat\": https://t.me/rustchat/42"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_broadcast_without_recipients_sends_nothing(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);

    let messenger = FakeMessenger::new();
    let broadcaster = Broadcaster::new(5);

    let sent = broadcaster
        .broadcast(&messenger, &store, &trigger(1), "Summons:")
        .await
        .unwrap();

    assert!(!sent);
    assert!(messenger.sent_messages().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_broadcast_reports_failure_when_nothing_lands(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(7, 1).await.unwrap();

    let messenger = FakeMessenger::new().script_failures(7, vec![MessengerError::Blocked]);
    let broadcaster = Broadcaster::new(5);

    let sent = broadcaster
        .broadcast(&messenger, &store, &trigger(1), "Summons:")
        .await
        .unwrap();

    assert!(!sent);
    // The failed recipient was unsubscribed along the way.
    assert!(store.subscribers_of(1).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_broadcast_partial_failure_still_succeeds(pool: SqlitePool) {
    let store = SubscriptionStore::new(pool);
    store.subscribe(7, 1).await.unwrap();
    store.subscribe(8, 1).await.unwrap();

    let messenger =
        FakeMessenger::new().script_failures(7, vec![MessengerError::Api("500".to_string())]);
    let broadcaster = Broadcaster::new(5);

    let sent = broadcaster
        .broadcast(&messenger, &store, &trigger(1), "Summons:")
        .await
        .unwrap();

    // One of two deliveries landed; that is enough.
    assert!(sent);
}
