#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use castforge_core::config::AppConfig;
use castforge_core::error::StoreError;
use castforge_core::executor::Sleeper;
use castforge_core::handles::MemoryHandleStore;
use castforge_core::notify::{EventBus, Notification, NotificationKind, SessionEvent};
use castforge_core::pipeline::{PersistedRecord, PersistenceStore};
use castforge_core::remote::{
    GenerateRequest, GenerateResponse, GenerationBackend, OperationKind, RemoteFailure,
};
use castforge_core::{GenerationClient, SessionController};
use tokio::sync::broadcast;
use tokio::time::Instant;

pub const KEYWORDS: [&str; 10] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
];

pub const PCM_MIME: &str = "audio/L16;codec=pcm;rate=24000";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("castforge=debug")
        .try_init();
}

type Predicate = Box<dyn Fn(&GenerateRequest) -> bool + Send + Sync>;

/// Backend answering from per-operation scripts.
///
/// Lookup order per call: matching failure rule, queued reply, standing
/// reply, else a 500.
#[derive(Default)]
pub struct ScriptedBackend {
    queued: Mutex<HashMap<OperationKind, VecDeque<Result<GenerateResponse, RemoteFailure>>>>,
    standing: Mutex<HashMap<OperationKind, GenerateResponse>>,
    failures: Mutex<Vec<(OperationKind, Predicate, RemoteFailure)>>,
    calls: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, kind: OperationKind, reply: Result<GenerateResponse, RemoteFailure>) {
        self.queued
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(reply);
    }

    pub fn always(&self, kind: OperationKind, reply: GenerateResponse) {
        self.standing.lock().unwrap().insert(kind, reply);
    }

    pub fn fail_when(
        &self,
        kind: OperationKind,
        predicate: impl Fn(&GenerateRequest) -> bool + Send + Sync + 'static,
        failure: RemoteFailure,
    ) {
        self.failures
            .lock()
            .unwrap()
            .push((kind, Box::new(predicate), failure));
    }

    pub fn calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, kind: OperationKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.operation == kind)
            .count()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, RemoteFailure> {
        let kind = request.operation;
        self.calls.lock().unwrap().push(request.clone());

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(k, predicate, _)| *k == kind && predicate(&request))
            .map(|(_, _, failure)| failure.clone());
        if let Some(failure) = failure {
            return Err(failure);
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        if let Some(reply) = queued {
            return reply;
        }

        self.standing
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .ok_or_else(|| server_failure("unscripted"))
    }
}

pub fn server_failure(message: &str) -> RemoteFailure {
    RemoteFailure::Status {
        status: 500,
        message: message.to_string(),
    }
}

pub fn auth_failure() -> RemoteFailure {
    RemoteFailure::Status {
        status: 403,
        message: "permission denied".to_string(),
    }
}

/// Sleeper that records requested delays and returns at once.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Store recording the tokio instant of every write. A save delay lands the
/// record only after the sleep.
#[derive(Default)]
pub struct InstantStore {
    save_delay: Option<Duration>,
    slot: Mutex<Option<PersistedRecord>>,
    writes: Mutex<Vec<(Instant, PersistedRecord)>>,
    deletes: Mutex<usize>,
}

impl InstantStore {
    pub fn slow(save_delay: Duration) -> Self {
        Self {
            save_delay: Some(save_delay),
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<PersistedRecord> {
        self.slot.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(Instant, PersistedRecord)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn delete_count(&self) -> usize {
        *self.deletes.lock().unwrap()
    }
}

#[async_trait]
impl PersistenceStore for InstantStore {
    async fn load(&self) -> Result<Option<PersistedRecord>, StoreError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        *self.slot.lock().unwrap() = Some(record.clone());
        self.writes
            .lock()
            .unwrap()
            .push((Instant::now(), record.clone()));
        Ok(())
    }

    async fn delete(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = None;
        *self.deletes.lock().unwrap() += 1;
        Ok(())
    }
}

pub struct Harness {
    pub session: SessionController,
    pub backend: Arc<ScriptedBackend>,
    pub handles: Arc<MemoryHandleStore>,
    pub sleeper: Arc<RecordingSleeper>,
    pub events: broadcast::Receiver<SessionEvent>,
}

pub fn test_config(autosave: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.autosave.enabled = autosave;
    config
}

pub fn harness(config: AppConfig, store: Arc<dyn PersistenceStore>) -> Harness {
    let config = Arc::new(config);
    let backend = ScriptedBackend::new();
    let sleeper = Arc::new(RecordingSleeper::default());
    let handles = Arc::new(MemoryHandleStore::new());
    let client =
        GenerationClient::new(backend.clone(), config.clone()).with_sleeper(sleeper.clone());
    let bus = EventBus::default();
    let events = bus.subscribe();
    let session = SessionController::new(config, client, handles.clone(), store, bus);
    Harness {
        session,
        backend,
        handles,
        sleeper,
        events,
    }
}

/// Every notification received so far.
pub fn drain_notifications(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Some(n) = event.as_notification() {
            out.push(n.clone());
        }
    }
    out
}

pub fn of_kind(notifications: &[Notification], kind: NotificationKind) -> Vec<&Notification> {
    notifications.iter().filter(|n| n.kind == kind).collect()
}

/// 100 ms of 24 kHz mono 16-bit silence.
pub fn pcm_reply() -> GenerateResponse {
    GenerateResponse::from_part(PCM_MIME, vec![0u8; 4_800])
}

pub fn png_reply() -> GenerateResponse {
    GenerateResponse::from_part("image/png", vec![0x89, b'P', b'N', b'G'])
}

pub fn keywords_reply() -> GenerateResponse {
    let list: Vec<String> = KEYWORDS.iter().map(|k| k.to_string()).collect();
    GenerateResponse::from_text(serde_json::to_string(&list).unwrap())
}

pub fn prompts_reply() -> GenerateResponse {
    let map: serde_json::Map<String, serde_json::Value> = KEYWORDS
        .iter()
        .map(|k| (k.to_string(), serde_json::Value::String(format!("photo of {k}"))))
        .collect();
    GenerateResponse::from_text(serde_json::Value::Object(map).to_string())
}

/// Run research and script generation against canned replies.
pub async fn with_script(h: &mut Harness, script: &str) {
    h.backend.push(
        OperationKind::Research,
        Ok(GenerateResponse::from_text("Research: Celtics lead the league in threes.")),
    );
    h.backend
        .push(OperationKind::ScriptGen, Ok(GenerateResponse::from_text(script)));
    h.session
        .run_research(castforge_core::ResearchBrief {
            topic: "Celtics vs Heat".into(),
            raw_data: "3PA 42.1".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    h.session.generate_script().await.unwrap();
}
