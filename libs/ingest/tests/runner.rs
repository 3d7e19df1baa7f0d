use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use feed_api::{
    CredentialSource, Credentials, ErrorKind, EventStore, FeedConnection, FeedError, FeedTransport,
    StreamFilter,
};
use ingest::{
    FailureCause, IngestError, PartitionStores, ResilientFeedRunner, RunnerConfig, RunnerState,
    StreamListener,
};
use serde_json::{Value, json};
use storage_memory::MemoryEventStore;
use storage_sqlite::{SqliteEventStore, SqliteStoreConfig};

// ═══════════════════════════════════════════════════════════════
//  Scripted transport
// ═══════════════════════════════════════════════════════════════

#[derive(Clone)]
enum End {
    Close,
    Reset,
}

#[derive(Clone)]
enum Step {
    AuthFail,
    SubscribeFail,
    Session(Vec<Value>, End),
}

/// Каждая попытка подключения берёт следующий шаг сценария; когда
/// сценарий закончился, повторяется `fallback`.
struct ScriptedTransport {
    script: VecDeque<Step>,
    fallback: Step,
    pending: Option<Step>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    fn new(script: Vec<Step>, fallback: Step) -> (Self, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let transport = Self {
            script: script.into(),
            fallback,
            pending: None,
            attempts: attempts.clone(),
        };
        (transport, attempts)
    }
}

impl FeedTransport for ScriptedTransport {
    fn authenticate(&mut self, _credentials: &Credentials) -> Result<(), FeedError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.script.pop_front().unwrap_or_else(|| self.fallback.clone());
        if let Step::AuthFail = step {
            return Err(FeedError::auth("401 Unauthorized"));
        }
        self.pending = Some(step);
        Ok(())
    }

    fn subscribe(&mut self, _filter: &StreamFilter) -> Result<Box<dyn FeedConnection>, FeedError> {
        match self.pending.take() {
            Some(Step::Session(events, end)) => Ok(Box::new(ScriptedConnection {
                events: events.into(),
                end,
            })),
            _ => Err(FeedError::io("connection refused")),
        }
    }
}

struct ScriptedConnection {
    events: VecDeque<Value>,
    end: End,
}

impl FeedConnection for ScriptedConnection {
    fn next_event(&mut self) -> Result<Option<Value>, FeedError> {
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }
        match self.end {
            End::Close => Ok(None),
            End::Reset => Err(FeedError::io("connection reset by peer")),
        }
    }
}

struct CountingCredentials {
    loads: Arc<AtomicUsize>,
    fail: bool,
}

impl CredentialSource for CountingCredentials {
    fn load(&self) -> Result<Credentials, FeedError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FeedError::config("config.toml vanished"));
        }
        Ok(Credentials {
            bearer_token: Some("token".into()),
            ..Credentials::default()
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Helpers
// ═══════════════════════════════════════════════════════════════

fn valid(id: &str) -> Value {
    json!({"created_at": "Tue Jan 02 09:00:00 +0000 2024", "id_str": id, "text": "vote"})
}

fn malformed(id: &str) -> Value {
    json!({"created_at": "yesterday", "id_str": id})
}

fn runner_with(transport: ScriptedTransport, stores: PartitionStores) -> ResilientFeedRunner {
    let config = RunnerConfig::default();
    let listener = StreamListener::new("elections", &config, stores);
    ResilientFeedRunner::new(
        Box::new(transport),
        Box::new(Credentials {
            bearer_token: Some("token".into()),
            ..Credentials::default()
        }),
        StreamFilter::new(vec!["vote".into()], vec!["en".into()]),
        listener,
        &config,
    )
}

fn memory_stores() -> (PartitionStores, Arc<MemoryEventStore>, Arc<MemoryEventStore>) {
    let even = Arc::new(MemoryEventStore::new());
    let odd = Arc::new(MemoryEventStore::new());
    (PartitionStores::new(even.clone(), odd.clone()), even, odd)
}

fn exhausted(runner: &mut ResilientFeedRunner) -> (u32, FailureCause) {
    let IngestError::RetriesExhausted { failures, source } = runner.run().unwrap_err();
    (failures, source)
}

// ═══════════════════════════════════════════════════════════════
//  Retry ceiling
// ═══════════════════════════════════════════════════════════════

#[test]
fn terminates_on_eleventh_consecutive_failure() {
    let (transport, attempts) = ScriptedTransport::new(Vec::new(), Step::AuthFail);
    let (stores, _, _) = memory_stores();
    let mut runner = runner_with(transport, stores);

    let (failures, cause) = exhausted(&mut runner);
    assert_eq!(failures, 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 11);
    assert_eq!(runner.state(), RunnerState::Terminated);
    assert!(matches!(cause, FailureCause::Feed(ref e) if e.kind() == ErrorKind::Auth));
}

#[test]
fn processed_event_resets_the_count() {
    // 10 сбоев, сессия с одним событием и обрывом (счётчик 0 → 1),
    // затем ещё 10 сбоев до 11.
    let mut script = vec![Step::AuthFail; 10];
    script.push(Step::Session(vec![valid("1")], End::Reset));
    let (transport, attempts) = ScriptedTransport::new(script, Step::AuthFail);
    let (stores, even, odd) = memory_stores();
    let mut runner = runner_with(transport, stores);

    let (failures, _) = exhausted(&mut runner);
    assert_eq!(failures, 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 21);
    assert_eq!(even.records().len(), 1);
    assert!(odd.records().is_empty());
}

#[test]
fn successful_reconnect_alone_does_not_reset() {
    let script = vec![Step::Session(Vec::new(), End::Close); 3];
    let (transport, attempts) = ScriptedTransport::new(script, Step::SubscribeFail);
    let (stores, _, _) = memory_stores();
    let mut runner = runner_with(transport, stores);

    let (failures, cause) = exhausted(&mut runner);
    assert_eq!(failures, 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 11);
    assert!(matches!(cause, FailureCause::Feed(ref e) if e.kind() == ErrorKind::Io));
}

#[test]
fn clean_close_counts_as_failure() {
    let (transport, attempts) = ScriptedTransport::new(Vec::new(), Step::Session(Vec::new(), End::Close));
    let (stores, _, _) = memory_stores();
    let mut runner = runner_with(transport, stores);

    let (failures, cause) = exhausted(&mut runner);
    assert_eq!(failures, 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 11);
    assert!(matches!(cause, FailureCause::Feed(ref e) if e.kind() == ErrorKind::Closed));
}

#[test]
fn malformed_events_do_not_consume_budget() {
    let events: Vec<Value> = (0..25).map(|i| malformed(&i.to_string())).collect();
    let script = vec![Step::Session(events, End::Reset)];
    let (transport, attempts) = ScriptedTransport::new(script, Step::AuthFail);
    let (stores, even, odd) = memory_stores();
    let mut runner = runner_with(transport, stores);

    let (failures, _) = exhausted(&mut runner);
    assert_eq!(failures, 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 11);
    assert_eq!(runner.listener().stats().rejected, 25);
    assert!(even.records().is_empty());
    assert!(odd.records().is_empty());
}

#[test]
fn malformed_between_valid_events_is_skipped() {
    let script = vec![Step::Session(
        vec![valid("1"), malformed("2"), valid("3")],
        End::Close,
    )];
    let (transport, _) = ScriptedTransport::new(script, Step::AuthFail);
    let (stores, even, _) = memory_stores();
    let mut runner = runner_with(transport, stores);

    exhausted(&mut runner);
    let ids: Vec<String> = even.records().into_iter().map(|r| r.identifier).collect();
    assert_eq!(ids, vec!["1", "3"]);
    let stats = runner.listener().stats();
    assert_eq!(stats.persisted_even, 2);
    assert_eq!(stats.rejected, 1);
}

#[test]
fn store_failure_counts_as_failure() {
    let (transport, attempts) =
        ScriptedTransport::new(Vec::new(), Step::Session(vec![valid("1")], End::Close));
    let stores = PartitionStores::new(
        Arc::new(MemoryEventStore::failing("disk I/O error")),
        Arc::new(MemoryEventStore::new()),
    );
    let mut runner = runner_with(transport, stores);

    let (failures, cause) = exhausted(&mut runner);
    assert_eq!(failures, 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 11);
    assert!(matches!(cause, FailureCause::Store(_)));
    assert!(cause.to_string().contains("disk I/O error"));
}

// ═══════════════════════════════════════════════════════════════
//  Credentials
// ═══════════════════════════════════════════════════════════════

#[test]
fn credentials_loaded_on_every_attempt() {
    let (transport, attempts) = ScriptedTransport::new(Vec::new(), Step::AuthFail);
    let loads = Arc::new(AtomicUsize::new(0));
    let (stores, _, _) = memory_stores();
    let config = RunnerConfig::default();
    let mut runner = ResilientFeedRunner::new(
        Box::new(transport),
        Box::new(CountingCredentials { loads: loads.clone(), fail: false }),
        StreamFilter::new(vec!["vote".into()], Vec::new()),
        StreamListener::new("p", &config, stores),
        &config,
    );

    exhausted(&mut runner);
    assert_eq!(loads.load(Ordering::SeqCst), 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 11);
}

#[test]
fn unreadable_credentials_count_and_skip_transport() {
    let (transport, attempts) = ScriptedTransport::new(Vec::new(), Step::AuthFail);
    let loads = Arc::new(AtomicUsize::new(0));
    let (stores, _, _) = memory_stores();
    let config = RunnerConfig { max_failures: 2, ..RunnerConfig::default() };
    let mut runner = ResilientFeedRunner::new(
        Box::new(transport),
        Box::new(CountingCredentials { loads: loads.clone(), fail: true }),
        StreamFilter::new(vec!["vote".into()], Vec::new()),
        StreamListener::new("p", &config, stores),
        &config,
    );

    let (failures, cause) = exhausted(&mut runner);
    assert_eq!(failures, 3);
    assert_eq!(loads.load(Ordering::SeqCst), 3);
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
    assert!(matches!(cause, FailureCause::Credentials(_)));
}

// ═══════════════════════════════════════════════════════════════
//  End to end on SQLite
// ═══════════════════════════════════════════════════════════════

#[test]
fn persists_to_partition_files() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStoreConfig {
        data_dir: dir.path().join("db").display().to_string(),
        ..SqliteStoreConfig::default()
    };
    let even = Arc::new(SqliteEventStore::open(&storage.path_for(feed_api::Partition::Even), &storage).unwrap());
    let odd = Arc::new(SqliteEventStore::open(&storage.path_for(feed_api::Partition::Odd), &storage).unwrap());

    let events = vec![
        json!({"created_at": "Mon Jan 01 00:00:00 +0000 2024", "id_str": "a", "user": {"created_at": "Sun Dec 31 23:00:00 +0000 2023"}}),
        json!({"created_at": "Tue Jan 02 09:00:00 +0000 2024", "id_str": "b"}),
        json!({"created_at": "Tue Jan 02 10:00:00 +0000 2024", "id_str": "c"}),
        json!({"delete": {"status": {"id_str": "x"}}}),
    ];
    let (transport, _) = ScriptedTransport::new(vec![Step::Session(events, End::Close)], Step::AuthFail);
    let mut runner = runner_with(transport, PartitionStores::new(even.clone(), odd.clone()));

    exhausted(&mut runner);
    assert_eq!(odd.count().unwrap(), 1);
    assert_eq!(even.count().unwrap(), 2);
    assert_eq!(runner.listener().stats().rejected, 1);
}
