//! The dashboard shell. [`Dashboard::run`] is the single execution context;
//! push events, poll responses, timer ticks and commands reach it through channels.

use chrono::{FixedOffset, Local, Offset};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::api::client::ApiClient;
use crate::api::events::PushEvent;
use crate::api::models::ContactRecord;
use crate::api::socket::{PushChannel, PushHandle, PushSettings};
use crate::app::AppConfig;
use crate::error::ApiError;
use crate::form::ContactSubmission;
use crate::storage::Store;
use crate::sync::filter::Filter;
use crate::sync::ledger::ReadLedger;
use crate::sync::notifications::NotificationSync;
use crate::sync::source::{SourceAction, SourceEvent, UpdateSource};
use crate::ui::commands::{Command, HELP};
use crate::ui::notice::Notice;
use crate::ui::table::TableView;

const EVENT_QUEUE: usize = 64;
const SUBMIT_THANKS: &str = "¡Formulario enviado correctamente! Nos pondremos en contacto contigo pronto.";
const SUBMIT_NOT_SAVED: &str = "Hubo un problema al guardar los datos. Por favor, inténtalo de nuevo.";
const SAVED_LOCALLY: &str = "Los datos se guardaron localmente.";

type PollResult = Result<Vec<ContactRecord>, ApiError>;

pub struct Dashboard {
    client: ApiClient,
    store: Store,
    sync: NotificationSync,
    source: UpdateSource,
    filter: Filter,
    notice: Option<Notice>,
    offset: FixedOffset,

    push_settings: Option<PushSettings>,
    push: Option<PushHandle>,
    push_tx: mpsc::Sender<PushEvent>,
    push_rx: mpsc::Receiver<PushEvent>,

    poll_every: Duration,
    poll_timer: Option<Interval>,
    poll_task: Option<JoinHandle<()>>,
    poll_tx: mpsc::Sender<PollResult>,
    poll_rx: mpsc::Receiver<PollResult>,
}

impl Dashboard {
    pub fn new(config: &AppConfig, client: ApiClient, store: Store) -> Self {
        let push_settings = config.push_settings().unwrap_or_else(|e| {
            log::warn!("push channel unavailable, will poll instead: {e}");
            None
        });
        let ledger = match store.load_read_ids() {
            Ok(ids) => ReadLedger::from_ids(ids),
            Err(e) => {
                log::warn!("could not load read notifications: {e}");
                ReadLedger::default()
            }
        };
        log::info!("dashboard for {} ({} read notifications)", client.base_url(), ledger.len());
        let (push_tx, push_rx) = mpsc::channel(EVENT_QUEUE);
        let (poll_tx, poll_rx) = mpsc::channel(1);

        Self {
            client,
            store,
            sync: NotificationSync::new(ledger),
            source: UpdateSource::new(push_settings.is_some()),
            filter: Filter::default(),
            notice: None,
            offset: Local::now().offset().fix(),
            push_settings,
            push: None,
            push_tx,
            push_rx,
            poll_every: config.poll_interval(),
            poll_timer: None,
            poll_task: None,
            poll_tx,
            poll_rx,
        }
    }

    /// Parse failures arrive on `commands` as `Err(message)`.
    pub async fn run<F>(mut self, mut commands: mpsc::Receiver<Result<Command, String>>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.load().await;
        self.start().await;
        self.print();

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("shutdown requested");
                    break;
                }
                Some(event) = self.push_rx.recv() => self.handle_push(event).await,
                Some(result) = self.poll_rx.recv() => self.handle_poll_result(result),
                _ = next_tick(&mut self.poll_timer) => self.on_poll_tick().await,
                Some(input) = commands.recv() => match input {
                    Ok(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    Err(message) => self.notice = Some(Notice::error(message)),
                },
            }
            self.print();
        }

        self.shutdown().await;
    }

    pub async fn load(&mut self) -> bool {
        match self.sync.initialize(&self.client).await {
            Ok(_) => {
                self.persist_backup();
                self.persist_ledger();
                true
            }
            Err(e) => {
                log::error!("initial load failed: {e}");
                self.notice = Some(Notice::error("Error al conectar con el servidor"));
                false
            }
        }
    }

    pub async fn start(&mut self) {
        let actions = self.source.handle(SourceEvent::Start);
        self.perform(actions).await;
    }

    pub async fn shutdown(&mut self) {
        let actions = self.source.handle(SourceEvent::Shutdown);
        self.perform(actions).await;
        // Covers a push channel opened but never reflected in the state.
        if let Some(push) = self.push.take() {
            push.close().await;
        }
        self.poll_timer = None;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    async fn perform(&mut self, actions: Vec<SourceAction>) {
        for action in actions {
            match action {
                SourceAction::OpenPush => {
                    if let Some(settings) = self.push_settings.clone() {
                        self.push = Some(PushChannel::spawn(settings, self.push_tx.clone()));
                    }
                }
                SourceAction::ClosePush => {
                    if let Some(push) = self.push.take() {
                        push.close().await;
                    }
                }
                SourceAction::StartPolling => {
                    log::info!("polling every {:?}", self.poll_every);
                    let mut timer = tokio::time::interval_at(Instant::now() + self.poll_every, self.poll_every);
                    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.poll_timer = Some(timer);
                }
                SourceAction::StopPolling => {
                    log::info!("polling stopped");
                    self.poll_timer = None;
                }
                SourceAction::FetchPoll => {
                    log::debug!("polling for new contacts");
                    let client = self.client.clone();
                    let tx = self.poll_tx.clone();
                    self.poll_task = Some(tokio::spawn(async move {
                        if tx.send(client.list_forms().await).await.is_err() {
                            log::debug!("poll response dropped, dashboard is gone");
                        }
                    }));
                }
                SourceAction::CatchUp => self.catch_up().await,
            }
        }
    }

    pub async fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Connected => {
                let actions = self.source.handle(SourceEvent::PushConnected);
                self.perform(actions).await;
            }
            PushEvent::Disconnected(reason) => {
                log::warn!("push channel disconnected: {reason}");
                let actions = self.source.handle(SourceEvent::PushDisconnected);
                self.perform(actions).await;
            }
            PushEvent::ConnectError(error) => {
                log::warn!("push channel failed to connect: {error}");
                let actions = self.source.handle(SourceEvent::PushConnectError);
                self.perform(actions).await;
            }
            PushEvent::NewForm(record) if self.source.accepts_push() => {
                let name = record.display_name().to_string();
                if self.sync.apply_insert(record) {
                    self.notice = Notice::new_contacts(&[&name]);
                }
            }
            PushEvent::FormDeleted(id) if self.source.accepts_push() => self.sync.apply_removal(&id),
            other => log::debug!("push event while {:?} ignored: {other:?}", self.source.state()),
        }
    }

    async fn on_poll_tick(&mut self) {
        let actions = self.source.handle(SourceEvent::PollTick);
        self.perform(actions).await;
    }

    pub fn handle_poll_result(&mut self, result: PollResult) {
        let was_polling = self.source.is_polling();
        self.source.handle(SourceEvent::PollFinished);
        if !was_polling {
            log::debug!("discarding poll response, push is driving updates");
            return;
        }
        match result {
            Ok(list) => self.merge_server_list(list),
            Err(e) => {
                log::warn!("poll failed: {e}");
                self.notice = Some(Notice::error("Error al verificar nuevas consultas"));
            }
        }
    }

    // Awaited inline so no push event can be applied before the snapshot lands.
    async fn catch_up(&mut self) {
        match self.client.list_forms().await {
            Ok(list) => self.merge_server_list(list),
            Err(e) => log::warn!("catch-up after push connect failed: {e}"),
        }
    }

    fn merge_server_list(&mut self, list: Vec<ContactRecord>) {
        let inserted = self.sync.reconcile(list);
        self.persist_backup();
        let records = self.sync.records_by_id(&inserted);
        let names: Vec<&str> = records.iter().map(|r| r.display_name()).collect();
        if let Some(notice) = Notice::new_contacts(&names) {
            self.notice = Some(notice);
        }
    }

    /// Returns `false` when the operator asked to quit.
    pub async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Search(text) => self.filter = Filter::new(&text, self.filter.category.clone()),
            Command::Category(category) => self.filter.category = category,
            Command::MarkAllRead => {
                self.sync.mark_all_read();
                self.persist_ledger();
                self.notice = Some(Notice::success("Todas las notificaciones marcadas como leídas"));
            }
            Command::Sync => self.resync().await,
            Command::Delete(id) => self.delete(&id).await,
            Command::Submit(submission) => self.submit(&submission).await,
            Command::Reload => {
                self.filter = Filter::default();
                if self.load().await {
                    self.notice = Some(Notice::success("Datos recargados desde el servidor."));
                }
            }
            Command::Help => self.notice = Some(Notice::info(HELP)),
            Command::Quit => return false,
        }
        true
    }

    /// Manual full resync. Allowed whatever the update source; a racing
    /// push insert is absorbed by duplicate suppression.
    async fn resync(&mut self) {
        match self.client.list_forms().await {
            Ok(list) => {
                self.sync.reconcile(list);
                self.persist_backup();
                self.notice = Some(Notice::success("Sincronización exitosa con el backend"));
            }
            Err(e) => {
                log::error!("sync failed: {e}");
                self.notice =
                    Some(Notice::error("Error al sincronizar con el backend. Verifica la conexión."));
            }
        }
    }

    async fn delete(&mut self, id: &str) {
        match self.client.delete_form(id).await {
            Ok(()) => {
                self.sync.apply_removal(id);
                self.persist_backup();
                self.notice = Some(Notice::success("Consulta eliminada exitosamente"));
            }
            Err(e) => {
                log::error!("delete of {id} failed: {e}");
                self.notice = Some(Notice::error("Error al eliminar la consulta. Intenta nuevamente."));
            }
        }
    }

    /// Validation failures never reach the network. A valid submission is
    /// stored locally before it is sent; without that copy it is not sent.
    async fn submit(&mut self, submission: &ContactSubmission) {
        if let Err(e) = submission.validate() {
            self.notice = Some(Notice::error(e.to_string()));
            return;
        }
        match self.store.append_submission(submission) {
            Ok(count) => log::info!("submission stored locally ({count} kept)"),
            Err(e) => {
                log::error!("could not store submission: {e}");
                self.notice = Some(Notice::error(SUBMIT_NOT_SAVED));
                return;
            }
        }
        self.notice = Some(match self.client.submit_form(submission).await {
            Ok(message) => Notice::success(message.unwrap_or_else(|| SUBMIT_THANKS.to_string())),
            Err(ApiError::Http(e)) => {
                log::error!("form submission failed: {e}");
                Notice::error(format!("No se pudo conectar con el servidor. {SAVED_LOCALLY}"))
            }
            Err(ApiError::Status { message, .. } | ApiError::Rejected(message)) => {
                log::warn!("form submission refused: {message}");
                Notice::error(format!("Error: {message}. {SAVED_LOCALLY}"))
            }
            Err(e @ (ApiError::Malformed(_) | ApiError::InvalidUrl(_))) => {
                log::warn!("form submission: {e}");
                Notice::error(format!("Error en el servidor. {SAVED_LOCALLY}"))
            }
        });
    }

    fn persist_backup(&self) {
        if let Err(e) = self.store.save_contacts(self.sync.cache().as_slice()) {
            log::warn!("could not back up contacts: {e}");
        }
    }

    fn persist_ledger(&self) {
        if let Err(e) = self.store.save_read_ids(&self.sync.ledger().to_sorted_vec()) {
            log::warn!("could not save read notifications: {e}");
        }
    }

    pub fn render(&self) -> String {
        let view = TableView {
            rows: self.sync.filter(&self.filter).collect(),
            total: self.sync.cache().len(),
            unread: self.sync.unread_count(),
            offset: self.offset,
        };
        let table = view.render(|id| self.sync.is_unread(id));
        match &self.notice {
            Some(notice) => format!("{notice}\n{table}"),
            None => table,
        }
    }

    fn print(&self) {
        println!("{}", self.render());
    }

    pub fn sync(&self) -> &NotificationSync {
        &self.sync
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::filter::CategoryFilter;
    use crate::sync::source::SourceState;
    use crate::sync::test_support::record;
    use crate::ui::notice::NoticeKind;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn wire(id: &str, nombre: &str, tags: &[&str]) -> Value {
        serde_json::to_value(record(id, nombre, tags)).unwrap()
    }

    async fn server_with(list: Vec<Value>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/form"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": list })))
            .mount(&server)
            .await;
        server
    }

    fn dashboard(server: &MockServer, push: bool) -> Dashboard {
        let mut config = AppConfig::new();
        config.base_url = Some(server.uri());
        config.push.enabled = push;
        Dashboard::new(&config, ApiClient::new(&server.uri()), Store::open_in_memory().unwrap())
    }

    fn ids(dash: &Dashboard) -> Vec<String> {
        dash.sync().cache().iter().map(|r| r.id.clone()).collect()
    }

    #[tokio::test]
    async fn load_sets_read_baseline_and_persists() {
        let server = server_with(vec![wire("A", "Ana", &[]), wire("B", "Beto", &[])]).await;
        let mut dash = dashboard(&server, false);
        assert!(dash.load().await);
        assert_eq!(dash.sync().unread_count(), 0);
        assert_eq!(dash.store.load_read_ids().unwrap(), ["A", "B"]);
        assert_eq!(dash.store.load_contacts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_load_shows_error_and_keeps_empty_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/form"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
            .mount(&server)
            .await;
        let mut dash = dashboard(&server, false);
        assert!(!dash.load().await);
        assert!(dash.sync().cache().is_empty());
        assert_eq!(dash.notice().map(|n| n.kind), Some(NoticeKind::Error));
        assert!(dash.render().starts_with("[error] Error al conectar con el servidor"));
    }

    #[tokio::test]
    async fn live_push_inserts_and_removes() {
        let server = server_with(vec![wire("A", "Ana", &[]), wire("B", "Beto", &[])]).await;
        let mut dash = dashboard(&server, true);
        dash.load().await;
        dash.start().await;
        assert_eq!(dash.source.state(), SourceState::ConnectingPush);

        dash.handle_push(PushEvent::Connected).await;
        dash.handle_push(PushEvent::NewForm(record("C", "Carla", &[]))).await;
        assert_eq!(ids(&dash), ["C", "A", "B"]);
        assert_eq!(dash.sync().unread_count(), 1);
        assert_eq!(dash.notice().unwrap().message, "Nueva consulta recibida: Carla");

        dash.handle_push(PushEvent::NewForm(record("C", "Carla", &[]))).await;
        assert_eq!(ids(&dash), ["C", "A", "B"]);
        assert_eq!(dash.sync().unread_count(), 1);

        dash.handle_push(PushEvent::FormDeleted("A".into())).await;
        dash.handle_push(PushEvent::FormDeleted("A".into())).await;
        assert_eq!(ids(&dash), ["C", "B"]);

        dash.shutdown().await;
        assert_eq!(dash.source.state(), SourceState::Disconnected);
        assert!(dash.push.is_none());
    }

    #[tokio::test]
    async fn push_events_are_ignored_while_polling() {
        let server = server_with(vec![wire("A", "Ana", &[])]).await;
        let mut dash = dashboard(&server, true);
        dash.load().await;
        dash.start().await;
        dash.handle_push(PushEvent::ConnectError("refused".into())).await;
        assert!(dash.source.is_polling());
        assert!(dash.poll_timer.is_some());

        dash.handle_push(PushEvent::NewForm(record("Z", "Zoe", &[]))).await;
        assert_eq!(ids(&dash), ["A"]);

        dash.handle_push(PushEvent::Connected).await;
        assert!(dash.poll_timer.is_none());
        dash.shutdown().await;
    }

    #[tokio::test]
    async fn poll_result_reconciles_and_notifies() {
        let server = server_with(vec![wire("A", "Ana", &[]), wire("B", "Beto", &[]), wire("C", "Carla", &[])]).await;
        let mut dash = dashboard(&server, false);
        dash.load().await;
        dash.start().await;
        assert!(dash.source.is_polling());

        dash.on_poll_tick().await;
        assert!(dash.source.poll_in_flight());
        // The spawned fetch answers with the mock list; replace it with our own.
        let _ = dash.poll_rx.recv().await;
        dash.handle_poll_result(Ok(vec![record("A", "Ana", &[]), record("D", "Diego", &[])]));

        assert_eq!(ids(&dash), ["A", "D"]);
        assert_eq!(dash.sync().unread_count(), 1);
        assert_eq!(dash.notice().unwrap().message, "Nueva consulta recibida: Diego");
        assert!(!dash.source.poll_in_flight());
        dash.shutdown().await;
        assert!(dash.poll_timer.is_none());
    }

    #[tokio::test]
    async fn push_connect_catches_up_on_missed_records() {
        let server = server_with(vec![wire("A", "Ana", &[])]).await;
        let mut dash = dashboard(&server, true);
        dash.load().await;
        dash.start().await;
        dash.handle_push(PushEvent::ConnectError("refused".into())).await;

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/form"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [wire("N", "Nora", &[]), wire("A", "Ana", &[])]
            })))
            .mount(&server)
            .await;

        dash.handle_push(PushEvent::Connected).await;
        assert!(dash.source.accepts_push());
        assert_eq!(ids(&dash), ["N", "A"]);
        assert_eq!(dash.sync().unread_count(), 1);
        assert_eq!(dash.notice().unwrap().message, "Nueva consulta recibida: Nora");
        dash.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_cancels_poll_in_flight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/form"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "data": [] }))
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        let mut dash = dashboard(&server, false);
        dash.start().await;
        dash.on_poll_tick().await;
        assert!(dash.poll_task.is_some());

        dash.shutdown().await;
        assert!(dash.poll_task.is_none());
        let late = tokio::time::timeout(Duration::from_millis(500), dash.poll_rx.recv()).await;
        assert!(late.is_err(), "aborted fetch must not deliver a result");
    }

    #[tokio::test]
    async fn failed_poll_keeps_state() {
        let server = server_with(vec![wire("A", "Ana", &[])]).await;
        let mut dash = dashboard(&server, false);
        dash.load().await;
        dash.start().await;
        dash.handle_poll_result(Err(ApiError::Malformed("nope".into())));
        assert_eq!(ids(&dash), ["A"]);
        assert_eq!(dash.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[tokio::test]
    async fn poll_response_after_push_recovery_is_discarded() {
        let server = server_with(vec![wire("A", "Ana", &[])]).await;
        let mut dash = dashboard(&server, true);
        dash.load().await;
        dash.start().await;
        dash.handle_push(PushEvent::ConnectError("refused".into())).await;
        dash.handle_push(PushEvent::Connected).await;
        dash.handle_poll_result(Ok(vec![record("X", "Xavier", &[])]));
        assert_eq!(ids(&dash), ["A"]);
        dash.shutdown().await;
    }

    #[tokio::test]
    async fn commands_mark_read_filter_and_delete() {
        let server = server_with(vec![wire("A", "Ana", &["privado"]), wire("B", "Beto", &[])]).await;
        Mock::given(method("DELETE"))
            .and(path("/form/B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;
        let mut dash = dashboard(&server, true);
        dash.load().await;
        dash.start().await;
        dash.handle_push(PushEvent::Connected).await;
        dash.handle_push(PushEvent::NewForm(record("C", "Carla", &[]))).await;

        assert!(dash.handle_command(Command::MarkAllRead).await);
        assert_eq!(dash.sync().unread_count(), 0);
        assert_eq!(dash.store.load_read_ids().unwrap(), ["A", "B", "C"]);

        assert!(dash.handle_command(Command::Category(CategoryFilter::Tag("privado".into()))).await);
        let text = dash.render();
        assert!(text.contains("Consultas: 3  Mostrando: 1"));
        assert!(text.contains("A | Ana"));

        assert!(dash.handle_command(Command::Delete("B".into())).await);
        assert_eq!(ids(&dash), ["C", "A"]);
        assert_eq!(dash.notice().unwrap().kind, NoticeKind::Success);

        assert!(!dash.handle_command(Command::Quit).await);
        dash.shutdown().await;
    }

    #[tokio::test]
    async fn failed_delete_and_sync_keep_cache() {
        let server = server_with(vec![wire("A", "Ana", &[])]).await;
        let mut dash = dashboard(&server, false);
        dash.load().await;
        server.reset().await;

        dash.handle_command(Command::Delete("A".into())).await;
        assert_eq!(ids(&dash), ["A"]);
        assert_eq!(dash.notice().unwrap().kind, NoticeKind::Error);

        dash.handle_command(Command::Sync).await;
        assert_eq!(ids(&dash), ["A"]);
        assert_eq!(
            dash.notice().unwrap().message,
            "Error al sincronizar con el backend. Verifica la conexión."
        );
    }

    #[tokio::test]
    async fn submit_validates_before_posting() {
        let server = server_with(vec![]).await;
        Mock::given(method("POST"))
            .and(path("/form"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;
        let mut dash = dashboard(&server, false);

        let bad = ContactSubmission::new("Ana", "1", "2", "no-es-email", "hola", &[]);
        dash.handle_command(Command::Submit(bad)).await;
        assert_eq!(dash.notice().unwrap().message, "Por favor ingresa un email válido");

        let good = ContactSubmission::new("Ana", "1", "2", "ana@mail.uy", "hola", &["privado"]);
        dash.handle_command(Command::Submit(good)).await;
        assert_eq!(dash.notice().unwrap().kind, NoticeKind::Success);
        assert_eq!(dash.notice().unwrap().message, SUBMIT_THANKS);
        assert_eq!(dash.store.load_submissions().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_submit_keeps_local_copy() {
        let server = server_with(vec![]).await;
        Mock::given(method("POST"))
            .and(path("/form"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "base caída" })))
            .mount(&server)
            .await;
        let mut dash = dashboard(&server, false);

        let sub = ContactSubmission::new("Ana", "1", "2", "ana@mail.uy", "hola", &[]);
        dash.handle_command(Command::Submit(sub.clone())).await;
        assert_eq!(
            dash.notice().unwrap().message,
            "Error: base caída. Los datos se guardaron localmente."
        );
        assert_eq!(dash.store.load_submissions().unwrap(), [sub]);
    }

    #[tokio::test]
    async fn reload_resets_filters() {
        let server = server_with(vec![wire("A", "Ana", &[])]).await;
        let mut dash = dashboard(&server, false);
        dash.handle_command(Command::Search("zzz".into())).await;
        assert!(dash.render().contains("No hay consultas"));
        dash.handle_command(Command::Reload).await;
        assert_eq!(dash.filter, Filter::default());
        assert!(dash.render().contains("A | Ana"));
    }

    #[tokio::test]
    async fn run_stops_on_quit_and_releases_resources() {
        let server = server_with(vec![wire("A", "Ana", &[])]).await;
        let dash = dashboard(&server, false);
        let (tx, rx) = mpsc::channel(4);
        tx.send(Err("comando desconocido: x".to_string())).await.unwrap();
        tx.send(Ok(Command::Quit)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), dash.run(rx, std::future::pending()))
            .await
            .expect("dashboard should stop on quit");
    }
}
