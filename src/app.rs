//! Application controller.
//!
//! [`App`] owns all mutable session state ([`AppState`]) and reacts to
//! [`Event`]s pulled from an [`EventSource`], rendering through a
//! [`Surface`]. Business logic lives in the extractor, store, search, and
//! orchestrator modules; this layer only sequences them and decides what the
//! user sees.
//!
//! ```text
//! EventSource ──▶ App::handle ──▶ extract / store / search / orchestrator
//!                     │
//!                     ▼
//!                  Surface (notifications, transcript, results)
//! ```
//!
//! Events are handled one at a time. A handler that calls a provider awaits
//! it before the next event is read, and there is no way to cancel it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ProvidersConfig;
use crate::credentials::{test_connection, CredentialManager};
use crate::error::Error;
use crate::extract::{extract, has_supported_extension};
use crate::models::{ChatTurn, ConnectionStatus, Provider, SearchResult, Theme, Upload};
use crate::orchestrator::{Orchestrator, APOLOGY};
use crate::search::search;
use crate::storage::{load_theme, save_theme, LocalStorage};
use crate::store::{document_id, DocumentStore};
use crate::transport::Transport;

/// Something the user did.
#[derive(Debug, Clone)]
pub enum Event {
    Upload(Upload),
    RemoveDocument(String),
    Ask(String),
    Search(String),
    Summarize(String),
    SaveConfig {
        provider: Provider,
        api_key: String,
        model: String,
    },
    TestConnection,
    ListDocuments,
    ClearChat,
    ToggleTheme,
    Quit,
}

#[async_trait]
pub trait EventSource: Send {
    /// Next user event, or `None` when the source is exhausted.
    async fn next_event(&mut self) -> Option<Event>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Per-file processing state, keyed by document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Processing,
    Ready,
    Failed,
}

/// One row of the loaded-documents listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub id: String,
    pub chars: usize,
    pub has_summary: bool,
}

/// Where the controller renders. Implementations must not fail.
pub trait Surface: Send {
    fn notify(&mut self, level: NoticeLevel, message: &str);
    fn render_turn(&mut self, turn: &ChatTurn);
    fn set_typing(&mut self, visible: bool);
    fn file_status(&mut self, id: &str, status: FileStatus);
    fn render_search(&mut self, query: &str, results: &[SearchResult]);
    fn render_summary(&mut self, id: &str, summary: &str);
    fn render_connection(&mut self, status: &ConnectionStatus);
    fn render_documents(&mut self, documents: &[DocumentInfo]);
    fn apply_theme(&mut self, theme: Theme);
}

/// Shows the typing indicator for as long as it lives.
struct TypingIndicator<'a, S: Surface> {
    surface: &'a mut S,
}

impl<'a, S: Surface> TypingIndicator<'a, S> {
    fn show(surface: &'a mut S) -> Self {
        surface.set_typing(true);
        Self { surface }
    }
}

impl<S: Surface> Drop for TypingIndicator<'_, S> {
    fn drop(&mut self) {
        self.surface.set_typing(false);
    }
}

/// All mutable session state.
pub struct AppState {
    pub documents: DocumentStore,
    pub credentials: CredentialManager,
    pub transcript: Vec<ChatTurn>,
    pub theme: Theme,
}

pub struct App<S: Surface> {
    state: AppState,
    surface: S,
    transport: Box<dyn Transport>,
    endpoints: ProvidersConfig,
    storage: Arc<dyn LocalStorage>,
}

impl<S: Surface> App<S> {
    /// Build a controller, rehydrating credentials and theme from `storage`.
    pub fn new(
        surface: S,
        transport: Box<dyn Transport>,
        endpoints: ProvidersConfig,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        let state = AppState {
            documents: DocumentStore::new(),
            credentials: CredentialManager::open(storage.clone()),
            transcript: Vec::new(),
            theme: load_theme(storage.as_ref()),
        };
        Self {
            state,
            surface,
            transport,
            endpoints,
            storage,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Drain `source`, handling each event in turn, until it ends or a
    /// [`Event::Quit`] arrives.
    pub async fn run(&mut self, source: &mut dyn EventSource) {
        self.surface.apply_theme(self.state.theme);
        while let Some(event) = source.next_event().await {
            if !self.handle(event).await {
                break;
            }
        }
    }

    /// Handle one event. Returns `false` when the session should end.
    pub async fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Upload(upload) => self.on_upload(upload).await,
            Event::RemoveDocument(id) => self.on_remove(&id),
            Event::Ask(question) => self.on_ask(&question).await,
            Event::Search(query) => self.on_search(&query),
            Event::Summarize(id) => self.on_summarize(&id).await,
            Event::SaveConfig {
                provider,
                api_key,
                model,
            } => self.on_save_config(provider, &api_key, &model),
            Event::TestConnection => self.on_test_connection().await,
            Event::ListDocuments => self.on_list(),
            Event::ClearChat => {
                self.state.transcript.clear();
                self.surface.notify(NoticeLevel::Info, "Chat cleared successfully");
            }
            Event::ToggleTheme => self.on_toggle_theme(),
            Event::Quit => return false,
        }
        true
    }

    async fn on_upload(&mut self, upload: Upload) {
        if !has_supported_extension(&upload.name) {
            self.surface.notify(
                NoticeLevel::Error,
                "Please select valid file types (PDF, DOCX, TXT, MD)",
            );
            return;
        }
        let id = document_id(&upload.name);
        if self.state.documents.contains(&id) {
            self.surface
                .notify(NoticeLevel::Info, &format!("{} is already loaded", id));
            return;
        }

        self.surface.file_status(&id, FileStatus::Processing);
        let name = upload.name.clone();
        let extracted = tokio::task::spawn_blocking(move || extract(&upload))
            .await
            .unwrap_or_else(|e| Err(Error::extraction("upload", format!("task failed: {}", e))));
        let text = match extracted {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %name, error = %e, "extraction failed");
                self.surface.file_status(&id, FileStatus::Failed);
                self.surface
                    .notify(NoticeLevel::Error, &format!("Error processing {}: {}", name, e));
                return;
            }
        };
        let extracted_bytes = text.len();
        if let Err(e) = self.state.documents.put(id.clone(), text) {
            self.surface.file_status(&id, FileStatus::Failed);
            self.surface.notify(NoticeLevel::Error, &e.to_string());
            return;
        }
        info!(document = %id, bytes = extracted_bytes, "document stored");

        self.refresh_summary(&id).await;
        self.push_assistant(format!(
            "I've processed \"{}\" ({} of text extracted). You can now ask me questions about its content!",
            name,
            format_file_size(extracted_bytes as u64)
        ));
        self.surface.file_status(&id, FileStatus::Ready);
        self.surface
            .notify(NoticeLevel::Success, &format!("Successfully processed {}", name));
    }

    async fn refresh_summary(&mut self, id: &str) {
        let Some(text) = self.state.documents.get(id) else {
            return;
        };
        let orchestrator = Orchestrator::new(self.transport.as_ref(), &self.endpoints);
        let summary = orchestrator
            .summarize(text, id, self.state.credentials.current())
            .await;
        if self.state.documents.put_summary(id, summary.clone()) {
            self.surface.render_summary(id, &summary);
        }
    }

    fn on_remove(&mut self, id: &str) {
        match self.state.documents.delete(id) {
            Some(_) => self
                .surface
                .notify(NoticeLevel::Info, "File removed successfully"),
            None => self
                .surface
                .notify(NoticeLevel::Error, &format!("No document named {}", id)),
        }
    }

    async fn on_ask(&mut self, question: &str) {
        let question = question.trim();
        if question.is_empty() {
            return;
        }
        let turn = ChatTurn::user(question);
        self.surface.render_turn(&turn);
        self.state.transcript.push(turn);

        let outcome = {
            let _typing = TypingIndicator::show(&mut self.surface);
            let orchestrator = Orchestrator::new(self.transport.as_ref(), &self.endpoints);
            orchestrator
                .try_answer(question, &self.state.documents, self.state.credentials.current())
                .await
        };
        let reply = match outcome {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "provider call failed");
                self.surface
                    .notify(NoticeLevel::Error, "Error communicating with AI service");
                APOLOGY.to_string()
            }
        };
        self.push_assistant(reply);
    }

    fn on_search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        if self.state.documents.is_empty() {
            self.surface.notify(
                NoticeLevel::Info,
                "Please upload documents first to enable search.",
            );
            return;
        }
        let results = search(query, &self.state.documents);
        self.surface.render_search(query, &results);
    }

    async fn on_summarize(&mut self, id: &str) {
        if !self.state.documents.contains(id) {
            self.surface
                .notify(NoticeLevel::Error, &format!("No document named {}", id));
            return;
        }
        let typing = TypingIndicator::show(&mut self.surface);
        let Some(text) = self.state.documents.get(id) else {
            return;
        };
        let orchestrator = Orchestrator::new(self.transport.as_ref(), &self.endpoints);
        let summary = orchestrator
            .summarize(text, id, self.state.credentials.current())
            .await;
        drop(typing);
        if self.state.documents.put_summary(id, summary.clone()) {
            self.surface.render_summary(id, &summary);
        }
    }

    fn on_save_config(&mut self, provider: Provider, api_key: &str, model: &str) {
        match self.state.credentials.save(provider, api_key, model) {
            Ok(()) => {
                self.surface.render_connection(&ConnectionStatus::Connected);
                self.surface
                    .notify(NoticeLevel::Success, "API configuration saved successfully!");
            }
            Err(e) => self.surface.notify(NoticeLevel::Error, &e.to_string()),
        }
    }

    async fn on_test_connection(&mut self) {
        if self.state.credentials.current().api_key.is_empty() {
            self.surface
                .notify(NoticeLevel::Error, "Please configure API key first");
            return;
        }
        let status = test_connection(
            self.state.credentials.current(),
            &self.endpoints,
            self.transport.as_ref(),
        )
        .await;
        self.surface.render_connection(&status);
        match status {
            ConnectionStatus::Connected => self
                .surface
                .notify(NoticeLevel::Success, "API connection test successful!"),
            ConnectionStatus::Error(_) => self.surface.notify(
                NoticeLevel::Error,
                "API connection test failed. Please check your API key.",
            ),
        }
    }

    fn on_list(&mut self) {
        let docs: Vec<DocumentInfo> = self
            .state
            .documents
            .identifiers()
            .map(|id| DocumentInfo {
                id: id.to_string(),
                chars: self.state.documents.get(id).map(|t| t.chars().count()).unwrap_or(0),
                has_summary: self.state.documents.summary(id).is_some(),
            })
            .collect();
        self.surface.render_documents(&docs);
    }

    fn on_toggle_theme(&mut self) {
        self.state.theme = self.state.theme.toggled();
        if let Err(e) = save_theme(self.storage.as_ref(), self.state.theme) {
            warn!(error = %e, "failed to persist theme");
        }
        self.surface.apply_theme(self.state.theme);
    }

    fn push_assistant(&mut self, text: String) {
        let turn = ChatTurn::assistant(text);
        self.surface.render_turn(&turn);
        self.state.transcript.push(turn);
    }
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::orchestrator::canned_responses;
    use crate::storage::{MemoryStorage, KEY_THEME};
    use crate::transport::mock::MockTransport;

    #[derive(Debug, Clone, PartialEq)]
    enum Rendered {
        Notice(NoticeLevel, String),
        Turn(Role, String),
        Typing(bool),
        Status(String, FileStatus),
        Search(Vec<(String, u32)>),
        Summary(String),
        Connection(ConnectionStatus),
        Documents(Vec<DocumentInfo>),
        Theme(Theme),
    }

    #[derive(Default)]
    struct RecordingSurface {
        log: Vec<Rendered>,
    }

    impl RecordingSurface {
        fn notices(&self, level: NoticeLevel) -> Vec<&str> {
            self.log
                .iter()
                .filter_map(|r| match r {
                    Rendered::Notice(l, m) if *l == level => Some(m.as_str()),
                    _ => None,
                })
                .collect()
        }

        fn typing(&self) -> Vec<bool> {
            self.log
                .iter()
                .filter_map(|r| match r {
                    Rendered::Typing(v) => Some(*v),
                    _ => None,
                })
                .collect()
        }
    }

    impl Surface for RecordingSurface {
        fn notify(&mut self, level: NoticeLevel, message: &str) {
            self.log.push(Rendered::Notice(level, message.to_string()));
        }
        fn render_turn(&mut self, turn: &ChatTurn) {
            self.log.push(Rendered::Turn(turn.role, turn.text.clone()));
        }
        fn set_typing(&mut self, visible: bool) {
            self.log.push(Rendered::Typing(visible));
        }
        fn file_status(&mut self, id: &str, status: FileStatus) {
            self.log.push(Rendered::Status(id.to_string(), status));
        }
        fn render_search(&mut self, _query: &str, results: &[SearchResult]) {
            self.log.push(Rendered::Search(
                results
                    .iter()
                    .map(|r| (r.document_id.clone(), r.relevance))
                    .collect(),
            ));
        }
        fn render_summary(&mut self, _id: &str, summary: &str) {
            self.log.push(Rendered::Summary(summary.to_string()));
        }
        fn render_connection(&mut self, status: &ConnectionStatus) {
            self.log.push(Rendered::Connection(status.clone()));
        }
        fn render_documents(&mut self, documents: &[DocumentInfo]) {
            self.log.push(Rendered::Documents(documents.to_vec()));
        }
        fn apply_theme(&mut self, theme: Theme) {
            self.log.push(Rendered::Theme(theme));
        }
    }

    struct Scripted(std::vec::IntoIter<Event>);

    #[async_trait]
    impl EventSource for Scripted {
        async fn next_event(&mut self) -> Option<Event> {
            self.0.next()
        }
    }

    fn app(transport: MockTransport) -> App<RecordingSurface> {
        App::new(
            RecordingSurface::default(),
            Box::new(transport),
            ProvidersConfig::default(),
            Arc::new(MemoryStorage::new()),
        )
    }

    fn revenue_upload() -> Upload {
        Upload::new("report.txt", "The quarterly revenue grew by 12%.")
    }

    #[tokio::test]
    async fn upload_then_ask_without_provider_gives_canned_answer() {
        let mut app = app(MockTransport::replying("{}"));
        app.handle(Event::Upload(revenue_upload())).await;
        app.handle(Event::Ask("what was the revenue growth?".into()))
            .await;

        let state = app.state();
        assert_eq!(state.documents.get("report.txt"), Some("The quarterly revenue grew by 12%."));
        assert!(state.documents.summary("report.txt").is_some());

        let last = state.transcript.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(canned_responses().any(|c| c == last.text));
        assert_eq!(app.surface().typing(), vec![true, false]);
        assert!(app.surface().log.contains(&Rendered::Status(
            "report.txt".into(),
            FileStatus::Ready
        )));
    }

    #[tokio::test]
    async fn unsupported_upload_never_reaches_store() {
        let mut app = app(MockTransport::replying("{}"));
        app.handle(Event::Upload(Upload::new("tool.exe", vec![0u8, 1, 2])))
            .await;
        assert!(app.state().documents.is_empty());
        assert_eq!(
            app.surface().notices(NoticeLevel::Error),
            vec!["Please select valid file types (PDF, DOCX, TXT, MD)"]
        );
    }

    #[tokio::test]
    async fn failed_extraction_marks_only_that_file() {
        let mut app = app(MockTransport::replying("{}"));
        app.handle(Event::Upload(revenue_upload())).await;
        app.handle(Event::Upload(Upload::new("broken.pdf", b"garbage".to_vec())))
            .await;

        assert_eq!(app.state().documents.len(), 1);
        assert!(app.surface().log.contains(&Rendered::Status(
            "broken.pdf".into(),
            FileStatus::Failed
        )));
        assert!(app.surface().notices(NoticeLevel::Error)[0]
            .starts_with("Error processing broken.pdf"));
    }

    #[tokio::test]
    async fn duplicate_upload_is_skipped() {
        let mut app = app(MockTransport::replying("{}"));
        app.handle(Event::Upload(revenue_upload())).await;
        app.handle(Event::Upload(Upload::new("report.txt", "other text")))
            .await;
        assert_eq!(
            app.state().documents.get("report.txt"),
            Some("The quarterly revenue grew by 12%.")
        );
        assert_eq!(
            app.surface().notices(NoticeLevel::Info),
            vec!["report.txt is already loaded"]
        );
    }

    #[tokio::test]
    async fn provider_failure_hides_typing_and_apologises() {
        let mut app = app(MockTransport::failing("HTTP 503: overloaded"));
        app.handle(Event::SaveConfig {
            provider: Provider::OpenAI,
            api_key: "sk-live".into(),
            model: "gpt-4".into(),
        })
        .await;
        app.handle(Event::Ask("anything".into())).await;

        assert_eq!(app.state().transcript.last().unwrap().text, APOLOGY);
        assert_eq!(app.surface().typing(), vec![true, false]);
        assert_eq!(
            app.surface().notices(NoticeLevel::Error),
            vec!["Error communicating with AI service"]
        );
    }

    #[tokio::test]
    async fn invalid_key_is_reported_and_not_configured() {
        let mut app = app(MockTransport::replying("{}"));
        app.handle(Event::SaveConfig {
            provider: Provider::Gemini,
            api_key: "bad-key".into(),
            model: "gemini-2.0-flash".into(),
        })
        .await;
        assert!(!app.state().credentials.current().configured);
        assert_eq!(app.surface().notices(NoticeLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn search_and_remove() {
        let mut app = app(MockTransport::replying("{}"));
        app.handle(Event::Search("revenue".into())).await;
        assert_eq!(
            app.surface().notices(NoticeLevel::Info),
            vec!["Please upload documents first to enable search."]
        );

        app.handle(Event::Upload(revenue_upload())).await;
        app.handle(Event::Upload(Upload::new("other.md", "# Nothing here")))
            .await;
        app.handle(Event::Search("REVENUE".into())).await;
        let hits = app.surface().log.iter().rev().find_map(|r| match r {
            Rendered::Search(h) => Some(h.clone()),
            _ => None,
        });
        assert_eq!(hits.unwrap().len(), 1);

        app.handle(Event::RemoveDocument("report.txt".into())).await;
        assert!(!app.state().documents.contains("report.txt"));
        assert_eq!(app.state().documents.summary("report.txt"), None);
    }

    #[tokio::test]
    async fn run_stops_at_quit_and_persists_theme() {
        let storage = Arc::new(MemoryStorage::new());
        let mut app = App::new(
            RecordingSurface::default(),
            Box::new(MockTransport::replying("{}")),
            ProvidersConfig::default(),
            storage.clone(),
        );
        let mut source = Scripted(
            vec![
                Event::ToggleTheme,
                Event::Quit,
                Event::Upload(revenue_upload()),
            ]
            .into_iter(),
        );
        app.run(&mut source).await;

        assert!(app.state().documents.is_empty());
        assert_eq!(app.state().theme, Theme::Dark);
        assert_eq!(storage.get(KEY_THEME).as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn connection_test_requires_key() {
        let mut app = app(MockTransport::replying("{}"));
        app.handle(Event::TestConnection).await;
        assert_eq!(
            app.surface().notices(NoticeLevel::Error),
            vec!["Please configure API key first"]
        );
    }

    #[test]
    fn file_sizes_are_humanised() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
    }
}
