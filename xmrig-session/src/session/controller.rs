use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::state::{StartMode, WorkingState};
use super::{
    ProcessControl, SessionEvent, SessionHandle, SessionSnapshot, Subscription, WorkerEvent,
};
use crate::config::SessionConfig;
use crate::config_compiler::{self, CompiledConfiguration};
use crate::error::Result;
use crate::hashrate::HashrateHistory;
use crate::log::{self, LogBuffer, LogRecord};
use crate::settings::{ConfigurationMode, SettingsStore};
use crate::status::{AlivePoll, MinerSummary};
use crate::tracing::prelude::*;

/// Owns one mining session.
///
/// | Event | Condition | Action | State |
/// |-------|-----------|--------|-------|
/// | intent START | already START and MINING | none | unchanged |
/// | intent START | config resolves and compiles | `start()` | MINING |
/// | intent START | otherwise | none | unchanged |
/// | intent STOP | not already stopped | `stop()` | NOT_WORKING |
/// | poll alive | | none | MINING |
/// | poll not alive | MINING | intent := STOP, `stop()` | NOT_WORKING |
///
/// A worker found running by a poll still gets `start()` when the user
/// asks for it, so the selected configuration applies. It is stopped exactly
/// once at teardown no matter what state the session is in.
pub struct SessionController {
    process: Arc<dyn ProcessControl>,
    store: Arc<dyn SettingsStore>,
    inbox: mpsc::Receiver<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    subscriptions: Vec<Box<dyn Subscription>>,
    start_mode: StartMode,
    working_state: WorkingState,
    miner_summary: Option<MinerSummary>,
    hashrate: HashrateHistory,
    log: LogBuffer,
    /// Published view of `log`, rebuilt only when a batch lands.
    log_view: Arc<[LogRecord]>,
    torn_down: bool,
}

impl SessionController {
    /// Fails with [`Error::Config`](crate::error::Error::Config) if `config`
    /// does not validate.
    pub fn new(
        config: &SessionConfig,
        process: Arc<dyn ProcessControl>,
        store: Arc<dyn SettingsStore>,
    ) -> Result<(Self, SessionHandle, watch::Receiver<SessionSnapshot>)> {
        config.validate()?;

        let (tx, inbox) = mpsc::channel(config.inbox_depth);
        let hashrate = HashrateHistory::seeded(config.hashrate_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
            hashrate_history: hashrate.samples(),
            ..Default::default()
        });

        let controller = Self {
            process,
            store,
            inbox,
            snapshot_tx,
            subscriptions: Vec::new(),
            start_mode: StartMode::Stop,
            working_state: WorkingState::NotWorking,
            miner_summary: None,
            hashrate,
            log: LogBuffer::new(config.log_capacity),
            log_view: Arc::from([]),
            torn_down: false,
        };

        Ok((controller, SessionHandle::new(tx), snapshot_rx))
    }

    /// Register an event-bridge listener to remove at teardown.
    pub fn attach(&mut self, subscription: Box<dyn Subscription>) {
        self.subscriptions.push(subscription);
    }

    /// Process events until cancelled or every handle is dropped, then
    /// tear the session down.
    pub async fn run(mut self, cancellation: CancellationToken) {
        debug!("Session controller started");

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    debug!("Session cancelled");
                    break;
                }
                event = self.inbox.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            debug!("All session handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        self.teardown();
    }

    pub fn start_mode(&self) -> StartMode {
        self.start_mode
    }

    pub fn working_state(&self) -> WorkingState {
        self.working_state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            start_mode: self.start_mode,
            working_state: self.working_state,
            miner_summary: self.miner_summary.clone(),
            hashrate_history: self.hashrate.samples(),
            log: self.log_view.clone(),
        }
    }

    /// Apply one event and publish the resulting snapshot.
    pub fn handle_event(&mut self, event: SessionEvent) {
        if self.torn_down {
            debug!(event = ?event, "Event after teardown ignored");
            return;
        }

        match event {
            SessionEvent::Intent(mode) => self.set_intent(mode),
            SessionEvent::Poll(poll) => self.on_poll(poll),
            SessionEvent::Worker(WorkerEvent::Log { log }) => self.on_log(&log),
            SessionEvent::Worker(WorkerEvent::ConfigUpdate { config }) => {
                self.on_config_update(config)
            }
        }

        self.publish();
    }

    /// Remove subscriptions, close the inbox, then stop the worker.
    ///
    /// Only the first call does anything.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let removed = self.subscriptions.len();
        for mut subscription in self.subscriptions.drain(..) {
            subscription.remove();
        }
        self.inbox.close();

        info!(
            subscriptions = removed,
            state = %self.working_state,
            "Session ended, stopping worker"
        );
        self.process.stop();
        self.start_mode = StartMode::Stop;
        self.working_state = WorkingState::NotWorking;

        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn transition(&mut self, new_state: WorkingState) {
        if new_state != self.working_state {
            info!(
                previous_state = %self.working_state,
                new_state = %new_state,
                "Working state changed"
            );
            self.working_state = new_state;
        }
    }

    fn set_intent(&mut self, mode: StartMode) {
        match mode {
            StartMode::Start => {
                let already_started = self.start_mode == StartMode::Start
                    && self.working_state == WorkingState::Mining;
                self.start_mode = StartMode::Start;
                if already_started {
                    debug!("Start requested while already mining");
                    return;
                }
                self.start_worker();
            }
            StartMode::Stop => {
                let already_stopped = self.start_mode == StartMode::Stop
                    && self.working_state == WorkingState::NotWorking;
                self.start_mode = StartMode::Stop;
                if already_stopped {
                    debug!("Stop requested while already stopped");
                    return;
                }
                self.stop_worker();
            }
        }
    }

    fn start_worker(&mut self) {
        // Owned snapshot: nothing here aliases the store's live state.
        let settings = self.store.settings();
        let Some(selected) = settings.selected() else {
            info!(
                selected = ?settings.selected_configuration,
                "Start requested but no configuration resolves"
            );
            return;
        };

        let payload = match config_compiler::compile(selected)
            .and_then(|compiled| compiled.to_start_payload().map(|p| (compiled, p)))
        {
            Ok((compiled, payload)) => {
                log_start(&compiled);
                payload
            }
            Err(e) => {
                warn!(
                    id = %selected.id,
                    error = %e,
                    "Not starting worker: configuration does not compile"
                );
                return;
            }
        };

        self.process.start(&payload);
        self.transition(WorkingState::Mining);
    }

    fn stop_worker(&mut self) {
        info!("Stopping worker");
        self.process.stop();
        self.transition(WorkingState::NotWorking);
    }

    fn on_poll(&mut self, poll: AlivePoll) {
        if let Some(sample) = self.hashrate.sample(&poll) {
            trace!(hashrate = sample, "Hashrate sampled");
        }

        if poll.alive {
            if let Some(status) = poll.status {
                self.miner_summary = Some(status);
            }
            self.transition(WorkingState::Mining);
        } else {
            self.miner_summary = None;
            if self.working_state == WorkingState::Mining {
                warn!("Worker stopped responding, forcing stop");
                self.start_mode = StartMode::Stop;
                self.stop_worker();
            }
        }
    }

    fn on_log(&mut self, lines: &[String]) {
        let entries = log::ingest(lines);
        if entries.is_empty() {
            return;
        }

        let added = entries.len();
        let evicted = self.log.prepend_batch(entries);
        self.log_view = self.log.to_vec().into();
        trace!(added, evicted, total = self.log_view.len(), "Worker log batch");
    }

    fn on_config_update(&mut self, reported: String) {
        let settings = self.store.settings();
        let Some(current) = settings.selected() else {
            debug!("Worker configuration update with no configuration selected");
            return;
        };

        let mut updated = current.clone();
        match &current.mode {
            ConfigurationMode::Simple => {
                let parsed: Value = match serde_json::from_str(&reported) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!(
                            id = %current.id,
                            error = %e,
                            "Discarding unparsable worker configuration"
                        );
                        return;
                    }
                };
                let Some(Value::Object(algo_perf)) = parsed.get("algo-perf").cloned() else {
                    debug!(id = %current.id, "Worker configuration has no algo-perf block");
                    return;
                };
                updated.properties.get_or_insert_with(Default::default).algo_perf =
                    Some(algo_perf);
            }
            ConfigurationMode::Advanced => {
                updated.config = Some(reported);
            }
            ConfigurationMode::Unrecognized(mode) => {
                debug!(id = %current.id, %mode, "Worker configuration update for unknown mode");
                return;
            }
        }

        if &updated == current {
            trace!(id = %current.id, "Worker configuration unchanged");
            return;
        }

        info!(id = %updated.id, mode = %updated.mode, "Reconciling worker configuration");
        self.store.update_configuration(updated);
    }
}

fn log_start(compiled: &CompiledConfiguration) {
    info!(
        id = %compiled.id,
        name = %compiled.name,
        mode = %compiled.mode,
        fork = %compiled.xmrig_fork,
        "Starting worker"
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use base64::{Engine, engine::general_purpose::STANDARD};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::error::Error;
    use crate::settings::{
        CpuProperties, MemorySettingsStore, PoolProperties, Settings, SimpleProperties,
        StoredConfiguration,
    };
    use crate::status::Hashrate;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(String),
        Stop,
        Unsubscribed(&'static str),
    }

    type Journal = Arc<Mutex<Vec<Call>>>;

    struct RecordingProcess {
        journal: Journal,
    }

    impl ProcessControl for RecordingProcess {
        fn start(&self, config: &str) {
            self.journal.lock().push(Call::Start(config.to_string()));
        }

        fn stop(&self) {
            self.journal.lock().push(Call::Stop);
        }
    }

    struct RecordingSubscription {
        name: &'static str,
        journal: Journal,
    }

    impl Subscription for RecordingSubscription {
        fn remove(&mut self) {
            self.journal.lock().push(Call::Unsubscribed(self.name));
        }
    }

    fn simple_config() -> StoredConfiguration {
        StoredConfiguration {
            id: "simple".into(),
            name: "Pool".into(),
            mode: ConfigurationMode::Simple,
            xmrig_fork: "original".into(),
            properties: Some(SimpleProperties {
                pool: Some(PoolProperties {
                    hostname: Some("pool.example.org".into()),
                    port: Some(443),
                    username: Some("wallet".into()),
                    password: Some("x".into()),
                    ssl_enabled: Some(true),
                }),
                cpu: Some(CpuProperties {
                    priority: Some(1),
                    yield_: Some(true),
                    max_threads_hint: Some(75),
                    random_x_mode: Some("auto".into()),
                }),
                algos: None,
                algo_perf: Some(serde_json::Map::new()),
            }),
            config: None,
        }
    }

    fn advanced_config() -> StoredConfiguration {
        StoredConfiguration {
            id: "advanced".into(),
            name: "Raw".into(),
            mode: ConfigurationMode::Advanced,
            xmrig_fork: "mo".into(),
            properties: None,
            config: Some("{ pools: [{url: 'pool.example.org:3333'}] }".into()),
        }
    }

    fn store_with(selected: Option<&str>) -> MemorySettingsStore {
        MemorySettingsStore::new(Settings {
            selected_configuration: selected.map(String::from),
            configurations: vec![simple_config(), advanced_config()],
        })
    }

    fn create_controller(
        store: MemorySettingsStore,
    ) -> (
        SessionController,
        SessionHandle,
        watch::Receiver<SessionSnapshot>,
        Journal,
    ) {
        let journal = Journal::default();
        let process = Arc::new(RecordingProcess {
            journal: journal.clone(),
        });
        let (controller, handle, snapshot_rx) =
            SessionController::new(&SessionConfig::default(), process, Arc::new(store)).unwrap();
        (controller, handle, snapshot_rx, journal)
    }

    fn calls(journal: &Journal) -> Vec<Call> {
        journal.lock().clone()
    }

    fn poll_with_total(total: Value) -> AlivePoll {
        AlivePoll::alive(MinerSummary {
            hashrate: Hashrate {
                total: vec![total],
                highest: None,
            },
            ..Default::default()
        })
    }

    fn log_event(lines: &[&str]) -> SessionEvent {
        SessionEvent::Worker(WorkerEvent::Log {
            log: lines.iter().map(|l| l.to_string()).collect(),
        })
    }

    fn config_update(config: &str) -> SessionEvent {
        SessionEvent::Worker(WorkerEvent::ConfigUpdate {
            config: config.to_string(),
        })
    }

    #[test]
    fn should_start_worker_with_compiled_payload() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));

        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        assert_eq!(controller.working_state(), WorkingState::Mining);
        assert_eq!(controller.start_mode(), StartMode::Start);

        let calls = calls(&journal);
        let [Call::Start(payload)] = calls.as_slice() else {
            panic!("expected one start call, got {calls:?}");
        };
        let payload: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(payload["id"], "simple");
        assert_eq!(payload["mode"], "SIMPLE");

        let config = STANDARD.decode(payload["config"].as_str().unwrap()).unwrap();
        let config: Value = serde_json::from_slice(&config).unwrap();
        assert_eq!(config["pools"][0]["url"], "pool.example.org:443");
    }

    #[test]
    fn should_not_start_without_selected_configuration() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(None));

        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        assert_eq!(controller.start_mode(), StartMode::Start);
        assert_eq!(controller.working_state(), WorkingState::NotWorking);
        assert!(calls(&journal).is_empty());
    }

    #[test]
    fn should_not_start_when_selection_is_dangling() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("gone")));

        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        assert_eq!(controller.working_state(), WorkingState::NotWorking);
        assert!(calls(&journal).is_empty());
    }

    #[test]
    fn should_not_start_with_configuration_that_does_not_compile() {
        let store = store_with(Some("advanced"));
        let mut broken = advanced_config();
        broken.config = Some("{ pools: [".into());
        store.update_configuration(broken);
        let (mut controller, _handle, _rx, journal) = create_controller(store);

        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        assert_eq!(controller.working_state(), WorkingState::NotWorking);
        assert!(calls(&journal).is_empty());
    }

    #[test]
    fn should_start_once_while_mining() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));

        controller.handle_event(SessionEvent::Intent(StartMode::Start));
        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        assert_eq!(calls(&journal).len(), 1);
    }

    #[test]
    fn should_stop_worker_on_stop_intent() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));

        controller.handle_event(SessionEvent::Intent(StartMode::Start));
        controller.handle_event(SessionEvent::Intent(StartMode::Stop));

        assert_eq!(controller.working_state(), WorkingState::NotWorking);
        assert!(matches!(calls(&journal).as_slice(), [Call::Start(_), Call::Stop]));
    }

    #[test]
    fn should_ignore_stop_when_already_stopped() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));

        controller.handle_event(SessionEvent::Intent(StartMode::Stop));

        assert!(calls(&journal).is_empty());
    }

    #[test]
    fn should_promote_to_mining_on_alive_poll() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(None));

        controller.handle_event(SessionEvent::Poll(poll_with_total(json!(100.0))));

        assert_eq!(controller.working_state(), WorkingState::Mining);
        assert_eq!(controller.start_mode(), StartMode::Stop);
        assert!(calls(&journal).is_empty());
    }

    #[test]
    fn should_force_stop_when_worker_dies_after_start() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));

        controller.handle_event(SessionEvent::Intent(StartMode::Start));
        controller.handle_event(SessionEvent::Poll(AlivePoll::not_alive()));

        assert_eq!(controller.working_state(), WorkingState::NotWorking);
        assert_eq!(controller.start_mode(), StartMode::Stop);
        assert!(matches!(calls(&journal).as_slice(), [Call::Start(_), Call::Stop]));
    }

    #[test]
    fn should_start_worker_found_running_before_intent() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));

        controller.handle_event(SessionEvent::Poll(poll_with_total(json!(100.0))));
        controller.handle_event(SessionEvent::Intent(StartMode::Start));
        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        assert_eq!(controller.working_state(), WorkingState::Mining);
        assert!(matches!(calls(&journal).as_slice(), [Call::Start(_)]));
    }

    #[test]
    fn should_reject_zero_inbox_depth() {
        let config = SessionConfig {
            inbox_depth: 0,
            ..Default::default()
        };
        let process = Arc::new(RecordingProcess {
            journal: Journal::default(),
        });

        let result = SessionController::new(&config, process, Arc::new(store_with(None)));

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn snapshots_share_the_log_until_it_changes() {
        let (mut controller, _handle, _rx, _journal) = create_controller(store_with(None));
        controller.handle_event(log_event(&["[2024-03-02 18:00:01.000]  miner    a"]));

        let before = controller.snapshot();
        controller.handle_event(SessionEvent::Poll(poll_with_total(json!(1.0))));
        let after_poll = controller.snapshot();
        assert!(Arc::ptr_eq(&before.log, &after_poll.log));

        controller.handle_event(log_event(&["[2024-03-02 18:00:02.000]  miner    b"]));
        assert_eq!(controller.snapshot().log.len(), 2);
    }

    #[test]
    fn should_ignore_not_alive_poll_when_not_working() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));

        controller.handle_event(SessionEvent::Poll(AlivePoll::not_alive()));

        assert_eq!(controller.working_state(), WorkingState::NotWorking);
        assert!(calls(&journal).is_empty());
    }

    #[test]
    fn should_sample_valid_hashrate_only() {
        let (mut controller, _handle, _rx, _journal) = create_controller(store_with(None));

        controller.handle_event(SessionEvent::Poll(poll_with_total(json!("NaN"))));
        assert_eq!(controller.snapshot().hashrate_history, vec![0.0, 0.0]);

        controller.handle_event(SessionEvent::Poll(poll_with_total(json!("12.5"))));
        assert_eq!(controller.snapshot().hashrate_history, vec![0.0, 0.0, 12.5]);
    }

    #[test]
    fn should_keep_latest_summary_until_worker_dies() {
        let (mut controller, _handle, _rx, _journal) = create_controller(store_with(None));

        controller.handle_event(SessionEvent::Poll(poll_with_total(json!(5.0))));
        assert!(controller.snapshot().miner_summary.is_some());

        controller.handle_event(SessionEvent::Poll(AlivePoll::not_alive()));
        assert!(controller.snapshot().miner_summary.is_none());
    }

    #[test]
    fn should_prepend_log_batches() {
        let (mut controller, _handle, _rx, _journal) = create_controller(store_with(None));

        controller.handle_event(log_event(&[
            "[2024-03-02 18:00:02.000]  miner    old2",
            "[2024-03-02 18:00:01.000]  miner    old1",
        ]));
        controller.handle_event(log_event(&[
            "[2024-03-02 18:00:04.000]  miner    c2",
            "   ",
            "[2024-03-02 18:00:03.000]  miner    c1",
        ]));

        let messages: Vec<String> = controller
            .snapshot()
            .log
            .iter()
            .map(|r| r.entry.message.clone())
            .collect();
        assert_eq!(messages, vec!["c1", "c2", "old1", "old2"]);
    }

    #[test]
    fn simple_reconciliation_updates_only_algo_perf() {
        let store = store_with(Some("simple"));
        let before = store.settings().selected().unwrap().clone();
        let (mut controller, _handle, _rx, journal) = create_controller(store.clone());

        controller.handle_event(config_update(
            r#"{"algo-perf": {"x": 1}, "cpu": {"priority": 5}, "pools": []}"#,
        ));

        let after = store.settings().selected().unwrap().clone();
        let (before_props, after_props) =
            (before.properties.unwrap(), after.properties.unwrap());

        let expected = serde_json::Map::from_iter([("x".to_string(), json!(1))]);
        assert_eq!(after_props.algo_perf, Some(expected));
        assert_eq!(
            serde_json::to_string(&after_props.pool).unwrap(),
            serde_json::to_string(&before_props.pool).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&after_props.cpu).unwrap(),
            serde_json::to_string(&before_props.cpu).unwrap()
        );
        assert_eq!(after.name, before.name);
        assert!(calls(&journal).is_empty());
    }

    #[test]
    fn simple_reconciliation_discards_unparsable_config() {
        let store = store_with(Some("simple"));
        let before = store.settings();
        let (mut controller, _handle, _rx, _journal) = create_controller(store.clone());

        controller.handle_event(config_update("{ algo-perf: {x: 1} }"));

        assert_eq!(store.settings(), before);
    }

    #[test]
    fn simple_reconciliation_ignores_missing_algo_perf() {
        let store = store_with(Some("simple"));
        let before = store.settings();
        let (mut controller, _handle, _rx, _journal) = create_controller(store.clone());

        controller.handle_event(config_update(r#"{"cpu": {"enabled": true}}"#));

        assert_eq!(store.settings(), before);
    }

    #[test]
    fn advanced_reconciliation_replaces_text() {
        let store = store_with(Some("advanced"));
        let (mut controller, _handle, _rx, _journal) = create_controller(store.clone());
        let reported = "{\n    \"autosave\": true,\n    \"cpu\": {\"rx\": [0, 1]}\n}";

        controller.handle_event(config_update(reported));

        let settings = store.settings();
        let updated = settings.selected().unwrap();
        assert_eq!(updated.config.as_deref(), Some(reported));
        assert_eq!(updated.name, "Raw");
    }

    #[test]
    fn reconciliation_without_selection_is_ignored() {
        let store = store_with(None);
        let before = store.settings();
        let (mut controller, _handle, _rx, _journal) = create_controller(store.clone());

        controller.handle_event(config_update(r#"{"algo-perf": {"x": 1}}"#));

        assert_eq!(store.settings(), before);
    }

    #[test]
    fn teardown_unsubscribes_before_stopping_and_is_idempotent() {
        let (mut controller, _handle, _rx, journal) = create_controller(store_with(Some("simple")));
        for name in ["onLog", "onConfigUpdate"] {
            controller.attach(Box::new(RecordingSubscription {
                name,
                journal: journal.clone(),
            }));
        }

        controller.teardown();
        controller.teardown();

        assert_eq!(
            calls(&journal),
            vec![
                Call::Unsubscribed("onLog"),
                Call::Unsubscribed("onConfigUpdate"),
                Call::Stop,
            ]
        );
    }

    #[test]
    fn teardown_stops_a_running_worker_and_ignores_later_events() {
        let (mut controller, _handle, rx, journal) = create_controller(store_with(Some("simple")));
        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        controller.teardown();
        controller.handle_event(SessionEvent::Intent(StartMode::Start));

        assert!(matches!(calls(&journal).as_slice(), [Call::Start(_), Call::Stop]));
        assert_eq!(rx.borrow().working_state, WorkingState::NotWorking);
        assert_eq!(rx.borrow().start_mode, StartMode::Stop);
    }

    #[tokio::test]
    async fn teardown_closes_the_inbox() {
        let (mut controller, handle, _rx, _journal) = create_controller(store_with(None));

        controller.teardown();

        assert!(handle.is_closed());
        assert!(handle.start().await.is_err());
    }

    #[tokio::test]
    async fn run_applies_events_in_arrival_order() {
        let (controller, handle, mut rx, journal) = create_controller(store_with(Some("simple")));
        let cancellation = CancellationToken::new();
        let task = tokio::spawn(controller.run(cancellation.clone()));

        handle.start().await.unwrap();
        handle.report_poll(AlivePoll::not_alive()).await.unwrap();

        rx.wait_for(|s| s.start_mode == StartMode::Stop && calls(&journal).len() == 2)
            .await
            .unwrap();
        assert_eq!(rx.borrow().working_state, WorkingState::NotWorking);

        cancellation.cancel();
        task.await.unwrap();

        assert!(matches!(
            calls(&journal).as_slice(),
            [Call::Start(_), Call::Stop, Call::Stop]
        ));
    }

    #[tokio::test]
    async fn run_tears_down_when_handles_are_dropped() {
        let (mut controller, handle, _rx, journal) = create_controller(store_with(Some("simple")));
        let (_bridge_tx, mut bridge_rx) = mpsc::channel::<()>(1);
        let bridge = tokio::spawn(async move {
            bridge_rx.recv().await;
        });
        controller.attach(Box::new(bridge));
        let task = tokio::spawn(controller.run(CancellationToken::new()));

        handle.start().await.unwrap();
        drop(handle);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("controller should exit once handles are gone")
            .unwrap();

        assert!(matches!(calls(&journal).as_slice(), [Call::Start(_), Call::Stop]));
    }
}
