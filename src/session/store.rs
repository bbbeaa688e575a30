//! In-memory session store.
//!
//! Each session owns its form, conversation machine and transcript. Spreadsheet
//! writes triggered by a stage are spawned in the background; their outcome is
//! only logged and never blocks or reverses a transition. The status update
//! after a PDF export waits for the session's project append, so it always
//! scans a sheet that already holds the row.
//!
//! Sessions live until they are older than the configured TTL; a sweeper task
//! drops them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::screen::Screen;
use crate::brief::{NOT_SPECIFIED, ProjectBrief};
use crate::conversation::{
    ChatMessage, ConversationMachine, ConversationRecord, ConversationState, ConversationTopic,
    Turn,
};
use crate::error::{Result, SessionError, SinkError};
use crate::intake::IntakeForm;
use crate::sinks::{ClientRow, ProjectRow, SpreadsheetSink, generate_client_id};

/// Topics that must be answered before the chat can be left early.
pub const MIN_TOPICS_TO_FINISH: usize = 3;

/// Status written to the project row when it is first logged.
const PROJECT_IN_PROGRESS: &str = "In Progress";
/// Status written once the brief PDF has been exported.
pub const BRIEF_READY: &str = "Brief Ready";

/// How often the sweeper looks for expired sessions.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Completion of a background spreadsheet write. Cloning shares the same
/// write; awaiting it never re-runs it.
#[derive(Clone)]
pub struct PendingWrite(Shared<BoxFuture<'static, ()>>);

impl PendingWrite {
    async fn wait(self) {
        self.0.await
    }
}

impl fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingWrite")
    }
}

/// One client's pass through the intake flow.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub screen: Screen,
    pub form: IntakeForm,
    pub machine: ConversationMachine,
    pub messages: Vec<ChatMessage>,
    /// Key of this session's rows in the spreadsheet.
    pub client_id: String,
    pub brief: Option<ProjectBrief>,
    /// Whether the project row has been handed to the spreadsheet.
    pub project_logged: bool,
    /// The in-flight or finished project append, if one was started.
    pub project_append: Option<PendingWrite>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(form: IntakeForm) -> Self {
        let machine = ConversationMachine::new(form.conversation_context());
        let messages = machine
            .opening_lines()
            .into_iter()
            .map(ChatMessage::bot)
            .collect();
        Self {
            id: Uuid::new_v4(),
            screen: Screen::Form,
            form,
            machine,
            messages,
            client_id: generate_client_id(),
            brief: None,
            project_logged: false,
            project_append: None,
            created_at: Utc::now(),
        }
    }

    fn transition(&mut self, target: Screen) -> std::result::Result<(), SessionError> {
        if !self.screen.can_transition_to(target) {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                screen: self.screen.to_string(),
                target: target.to_string(),
            });
        }
        info!(session_id = %self.id, from = %self.screen, to = %target, "Session screen changed");
        self.screen = target;
        Ok(())
    }

    fn require_screen(&self, screen: Screen, action: &str) -> std::result::Result<(), SessionError> {
        if self.screen == screen {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                id: self.id,
                screen: self.screen.to_string(),
                target: action.to_string(),
            })
        }
    }

    fn rebuild_brief(&mut self) -> ProjectBrief {
        let brief = ProjectBrief::build(&self.form, self.machine.record());
        self.brief = Some(brief.clone());
        brief
    }

    fn client_row(&self) -> ClientRow {
        ClientRow {
            name: self.form.name.clone(),
            email: self.form.email.clone(),
            company: self.form.company.clone(),
            project_type: self.form.project_type.clone(),
            budget: self.form.budget.clone(),
            timeline: self.form.timeline.clone(),
            description: self.form.description.clone(),
        }
    }

    fn project_row(&self) -> ProjectRow {
        let record = self.machine.record();
        let text = |topic| {
            record
                .text(topic)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string())
        };
        ProjectRow {
            client_id: self.client_id.clone(),
            project_name: format!("{} - {}", self.form.company, self.form.project_type),
            project_type: self.form.project_type.clone(),
            target_audience: text(ConversationTopic::TargetAudience),
            core_features: record.list(ConversationTopic::CoreFeatures),
            design_preferences: text(ConversationTopic::DesignPreferences),
            platform_requirements: record.list(ConversationTopic::PlatformRequirements),
            integrations: record.integrations().to_vec(),
            success_metrics: text(ConversationTopic::SuccessMetrics),
            technical_requirements: NOT_SPECIFIED.to_string(),
            user_flow: NOT_SPECIFIED.to_string(),
            competitor_info: NOT_SPECIFIED.to_string(),
            budget: self.form.budget.clone(),
            timeline: self.form.timeline.clone(),
            status: PROJECT_IN_PROGRESS.to_string(),
            brief_generated: false,
        }
    }

    /// Mark the project as logged and return its row, or `None` if it was
    /// logged already.
    fn take_project_row(&mut self) -> Option<ProjectRow> {
        if self.project_logged {
            return None;
        }
        self.project_logged = true;
        Some(self.project_row())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.machine.state();
        let topic = state.topic();
        let completed = self.machine.completed_topics();
        SessionSnapshot {
            id: self.id,
            screen: self.screen,
            form: self.form.clone(),
            client_id: self.client_id.clone(),
            conversation_state: state,
            current_topic: topic,
            current_topic_label: topic.map(|t| t.label()),
            input_placeholder: topic.map(|t| t.placeholder()),
            completed_topics: completed,
            total_topics: ConversationTopic::ALL.len(),
            can_finish: self.screen == Screen::Chatbot && completed >= MIN_TOPICS_TO_FINISH,
            messages: self.messages.clone(),
            record: self.machine.record().clone(),
            brief_ready: self.brief.is_some(),
            created_at: self.created_at,
        }
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub screen: Screen,
    pub form: IntakeForm,
    pub client_id: String,
    pub conversation_state: ConversationState,
    pub current_topic: Option<ConversationTopic>,
    pub current_topic_label: Option<&'static str>,
    pub input_placeholder: Option<&'static str>,
    pub completed_topics: usize,
    pub total_topics: usize,
    pub can_finish: bool,
    pub messages: Vec<ChatMessage>,
    pub record: ConversationRecord,
    pub brief_ready: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one chat message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReply {
    pub user_message: ChatMessage,
    pub bot_message: ChatMessage,
    pub turn: Turn,
    pub conversation_complete: bool,
}

/// All live sessions, keyed by id.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    sheets: Option<Arc<dyn SpreadsheetSink>>,
}

impl SessionStore {
    pub fn new(sheets: Option<Arc<dyn SpreadsheetSink>>) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            sheets,
        })
    }

    /// Submit the intake form and open the chat.
    pub async fn start(&self, form: IntakeForm) -> Result<SessionSnapshot> {
        form.validate()?;
        let mut session = Session::new(form);
        session.transition(Screen::Chatbot)?;
        let snapshot = session.snapshot();
        let row = session.client_row();

        info!(
            session_id = %session.id,
            client_id = %session.client_id,
            project_type = %session.form.project_type,
            "Intake session started"
        );
        self.sessions.write().await.insert(session.id, session);

        if let Some(sheets) = self.sheets.clone() {
            spawn_sheet_write("append_client", snapshot.id, async move {
                sheets.append_client(&row).await
            });
        } else {
            warn!(session_id = %snapshot.id, "Spreadsheet not configured, client row not logged");
        }
        Ok(snapshot)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(SessionError::NotFound { id })?;
        Ok(session.snapshot())
    }

    /// Feed one chat message to the session's conversation.
    pub async fn send_message(&self, id: Uuid, text: &str) -> Result<MessageReply> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound { id })?;
        session.require_screen(Screen::Chatbot, "message")?;

        let turn = session.machine.advance(text)?;
        let user_message = ChatMessage::user(text);
        let bot_message = ChatMessage::bot(turn.prompt.clone());
        session.messages.push(user_message.clone());
        session.messages.push(bot_message.clone());

        let complete = turn.next_state.is_terminal();
        if complete {
            session.rebuild_brief();
            info!(session_id = %id, "Conversation complete, brief generated");
            self.log_project(session);
        }

        Ok(MessageReply {
            user_message,
            bot_message,
            turn,
            conversation_complete: complete,
        })
    }

    /// Leave the chat for the review screen.
    pub async fn finish_chat(&self, id: Uuid) -> Result<SessionSnapshot> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound { id })?;
        session.require_screen(Screen::Chatbot, "review")?;

        let completed = session.machine.completed_topics();
        if completed < MIN_TOPICS_TO_FINISH {
            return Err(SessionError::NotEnoughTopics {
                completed,
                required: MIN_TOPICS_TO_FINISH,
            }
            .into());
        }
        session.transition(Screen::Review)?;
        self.log_project(session);
        Ok(session.snapshot())
    }

    /// Save the reviewed form and move on to the completion screen.
    pub async fn save_review(&self, id: Uuid, form: IntakeForm) -> Result<SessionSnapshot> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound { id })?;
        session.require_screen(Screen::Review, "completion")?;
        form.validate()?;

        session.machine.set_context(form.conversation_context());
        session.form = form;
        session.rebuild_brief();
        session.transition(Screen::Completion)?;
        Ok(session.snapshot())
    }

    pub async fn back_to_chat(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.move_to(id, Screen::Chatbot).await
    }

    pub async fn complete(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.move_to(id, Screen::Status).await
    }

    pub async fn request_revisions(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.move_to(id, Screen::Review).await
    }

    /// Open the lead dashboard from the status screen.
    pub async fn open_admin(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.move_to(id, Screen::Admin).await
    }

    /// Return from the lead dashboard to the status screen.
    pub async fn close_admin(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.move_to(id, Screen::Status).await
    }

    async fn move_to(&self, id: Uuid, target: Screen) -> Result<SessionSnapshot> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound { id })?;
        session.transition(target)?;
        Ok(session.snapshot())
    }

    /// The session's brief, once the conversation or review has produced one.
    pub async fn brief(&self, id: Uuid) -> Result<ProjectBrief> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(SessionError::NotFound { id })?;
        session
            .brief
            .clone()
            .ok_or_else(|| SessionError::BriefUnavailable.into())
    }

    /// Record that the brief PDF was exported: the project row is marked
    /// "Brief Ready" in the background, once its append has finished.
    pub async fn brief_exported(&self, id: Uuid) -> Result<()> {
        let (client_id, append) = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(&id).ok_or(SessionError::NotFound { id })?;
            (session.client_id.clone(), session.project_append.clone())
        };

        match self.sheets.clone() {
            Some(sheets) => {
                spawn_sheet_write("update_project_status", id, async move {
                    if let Some(append) = append {
                        append.wait().await;
                    }
                    sheets
                        .update_project_status(&client_id, BRIEF_READY, true)
                        .await
                });
            }
            None => warn!(session_id = %id, "Spreadsheet not configured, status not updated"),
        }
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions created more than `ttl` ago. Returns how many went.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at > cutoff);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Expired sessions evicted");
        }
        evicted
    }

    /// Evict expired sessions every `every` until the task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            loop {
                tick.tick().await;
                store.evict_expired(ttl).await;
            }
        })
    }

    /// Start the project append once per session and keep its handle.
    fn log_project(&self, session: &mut Session) {
        let Some(row) = session.take_project_row() else {
            return;
        };
        match self.sheets.clone() {
            Some(sheets) => {
                session.project_append = Some(spawn_sheet_write(
                    "append_project",
                    session.id,
                    async move { sheets.append_project(&row).await },
                ));
            }
            None => warn!(
                session_id = %session.id,
                "Spreadsheet not configured, project row not logged"
            ),
        }
    }
}

/// Run a spreadsheet write in the background and log how it went.
fn spawn_sheet_write<T, F>(action: &'static str, session_id: Uuid, task: F) -> PendingWrite
where
    T: fmt::Debug + Send + 'static,
    F: Future<Output = std::result::Result<T, SinkError>> + Send + 'static,
{
    let write = async move {
        match task.await {
            Ok(outcome) => info!(%session_id, action, ?outcome, "Spreadsheet write finished"),
            Err(e) => warn!(%session_id, action, error = %e, "Spreadsheet write failed"),
        }
    }
    .boxed()
    .shared();
    tokio::spawn(write.clone());
    PendingWrite(write)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::Error;
    use crate::intake::sample_form;

    /// Records every call instead of talking to Google.
    #[derive(Default)]
    struct RecordingSheet {
        clients: Mutex<Vec<ClientRow>>,
        projects: Mutex<Vec<ProjectRow>>,
        updates: Mutex<Vec<(String, String, bool)>>,
    }

    #[async_trait]
    impl SpreadsheetSink for RecordingSheet {
        async fn append_client(&self, row: &ClientRow) -> std::result::Result<(), SinkError> {
            self.clients.lock().unwrap().push(row.clone());
            Ok(())
        }

        async fn append_project(&self, row: &ProjectRow) -> std::result::Result<(), SinkError> {
            self.projects.lock().unwrap().push(row.clone());
            Ok(())
        }

        async fn client_rows(&self) -> std::result::Result<Vec<Vec<String>>, SinkError> {
            Ok(vec![])
        }

        async fn project_rows(&self) -> std::result::Result<Vec<Vec<String>>, SinkError> {
            Ok(vec![])
        }

        async fn update_project_status(
            &self,
            client_id: &str,
            status: &str,
            brief_generated: bool,
        ) -> std::result::Result<bool, SinkError> {
            self.updates.lock().unwrap().push((
                client_id.to_string(),
                status.to_string(),
                brief_generated,
            ));
            Ok(true)
        }
    }

    async fn eventually(check: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("background write did not happen");
    }

    const ANSWERS: [&str; 5] = [
        "Small business owners",
        "We need invoicing and reports",
        "Clean and minimal",
        "Desktop and iPhone, with Stripe payments",
        "100 paying customers in 6 months",
    ];

    #[tokio::test]
    async fn start_rejects_incomplete_form() {
        let store = SessionStore::new(None);
        let form = IntakeForm {
            email: String::new(),
            ..sample_form()
        };
        let err = store.start(form).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ref v) if v.missing == vec!["email"]));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn start_opens_chat_and_logs_client() {
        let sheet = Arc::new(RecordingSheet::default());
        let store = SessionStore::new(Some(sheet.clone()));
        let snapshot = store.start(sample_form()).await.unwrap();

        assert_eq!(snapshot.screen, Screen::Chatbot);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(
            snapshot.current_topic,
            Some(ConversationTopic::TargetAudience)
        );
        assert!(snapshot.client_id.starts_with("CLIENT_"));
        eventually(|| sheet.clients.lock().unwrap().len() == 1).await;
        assert_eq!(sheet.clients.lock().unwrap()[0].name, "Dana Reyes");
    }

    #[tokio::test]
    async fn full_conversation_logs_project_once() {
        let sheet = Arc::new(RecordingSheet::default());
        let store = SessionStore::new(Some(sheet.clone()));
        let id = store.start(sample_form()).await.unwrap().id;

        let mut completions = 0;
        for answer in ANSWERS {
            let reply = store.send_message(id, answer).await.unwrap();
            if reply.conversation_complete {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);

        let snapshot = store.finish_chat(id).await.unwrap();
        assert_eq!(snapshot.screen, Screen::Review);
        assert_eq!(snapshot.messages.len(), 12);
        assert!(snapshot.brief_ready);

        eventually(|| sheet.projects.lock().unwrap().len() == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let projects = sheet.projects.lock().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].project_name, "Reyes Dental - Mobile App");
        assert_eq!(projects[0].integrations, vec!["Payment Processing"]);
        assert_eq!(projects[0].status, "In Progress");
    }

    #[tokio::test]
    async fn finish_needs_three_topics() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        store.send_message(id, ANSWERS[0]).await.unwrap();
        store.send_message(id, ANSWERS[1]).await.unwrap();

        let err = store.finish_chat(id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::NotEnoughTopics {
                completed: 2,
                required: 3
            })
        ));

        store.send_message(id, ANSWERS[2]).await.unwrap();
        let snapshot = store.finish_chat(id).await.unwrap();
        assert_eq!(snapshot.screen, Screen::Review);
    }

    #[tokio::test]
    async fn blank_message_leaves_transcript_alone() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        assert!(store.send_message(id, "   ").await.is_err());
        assert_eq!(store.snapshot(id).await.unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn review_edit_rebuilds_brief() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        for answer in &ANSWERS[..3] {
            store.send_message(id, answer).await.unwrap();
        }
        store.finish_chat(id).await.unwrap();
        assert!(store.brief(id).await.is_err());

        let edited = IntakeForm {
            company: "Reyes Family Dental".into(),
            ..sample_form()
        };
        let snapshot = store.save_review(id, edited).await.unwrap();
        assert_eq!(snapshot.screen, Screen::Completion);

        let brief = store.brief(id).await.unwrap();
        assert_eq!(brief.company, "Reyes Family Dental");
        assert_eq!(brief.section("Target Audience"), Some(ANSWERS[0]));
        assert_eq!(brief.section("Platform & Technology"), Some(NOT_SPECIFIED));
    }

    #[tokio::test]
    async fn review_rejects_invalid_form() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        for answer in &ANSWERS[..3] {
            store.send_message(id, answer).await.unwrap();
        }
        store.finish_chat(id).await.unwrap();

        let err = store
            .save_review(
                id,
                IntakeForm {
                    name: String::new(),
                    ..sample_form()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.snapshot(id).await.unwrap().screen, Screen::Review);
    }

    #[tokio::test]
    async fn screen_round_trip_through_status() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        for answer in ANSWERS {
            store.send_message(id, answer).await.unwrap();
        }
        store.finish_chat(id).await.unwrap();
        assert_eq!(
            store.back_to_chat(id).await.unwrap().screen,
            Screen::Chatbot
        );
        // Chat is complete; further messages are rejected.
        assert!(store.send_message(id, "more").await.is_err());

        store.finish_chat(id).await.unwrap();
        store.save_review(id, sample_form()).await.unwrap();
        assert_eq!(store.complete(id).await.unwrap().screen, Screen::Status);
        assert_eq!(
            store.request_revisions(id).await.unwrap().screen,
            Screen::Review
        );
    }

    #[tokio::test]
    async fn invalid_jump_is_rejected() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        let err = store.complete(id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = SessionStore::new(None);
        let err = store.snapshot(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotFound { .. })));
    }

    #[tokio::test]
    async fn brief_export_marks_row_ready() {
        let sheet = Arc::new(RecordingSheet::default());
        let store = SessionStore::new(Some(sheet.clone()));
        let snapshot = store.start(sample_form()).await.unwrap();
        store.brief_exported(snapshot.id).await.unwrap();

        eventually(|| sheet.updates.lock().unwrap().len() == 1).await;
        let updates = sheet.updates.lock().unwrap();
        assert_eq!(
            updates[0],
            (snapshot.client_id.clone(), BRIEF_READY.to_string(), true)
        );
    }

    /// Appends slowly; the status update reports whether the row was there.
    #[derive(Default)]
    struct SlowAppendSheet {
        projects: Mutex<Vec<String>>,
        found: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl SpreadsheetSink for SlowAppendSheet {
        async fn append_client(&self, _row: &ClientRow) -> std::result::Result<(), SinkError> {
            Ok(())
        }

        async fn append_project(&self, row: &ProjectRow) -> std::result::Result<(), SinkError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.projects.lock().unwrap().push(row.client_id.clone());
            Ok(())
        }

        async fn client_rows(&self) -> std::result::Result<Vec<Vec<String>>, SinkError> {
            Ok(vec![])
        }

        async fn project_rows(&self) -> std::result::Result<Vec<Vec<String>>, SinkError> {
            Ok(vec![])
        }

        async fn update_project_status(
            &self,
            client_id: &str,
            _status: &str,
            _brief_generated: bool,
        ) -> std::result::Result<bool, SinkError> {
            let found = self.projects.lock().unwrap().iter().any(|id| id == client_id);
            self.found.lock().unwrap().push(found);
            Ok(found)
        }
    }

    /// Every write fails.
    struct BrokenSheet;

    #[async_trait]
    impl SpreadsheetSink for BrokenSheet {
        async fn append_client(&self, _row: &ClientRow) -> std::result::Result<(), SinkError> {
            Err(broken())
        }

        async fn append_project(&self, _row: &ProjectRow) -> std::result::Result<(), SinkError> {
            Err(broken())
        }

        async fn client_rows(&self) -> std::result::Result<Vec<Vec<String>>, SinkError> {
            Err(broken())
        }

        async fn project_rows(&self) -> std::result::Result<Vec<Vec<String>>, SinkError> {
            Err(broken())
        }

        async fn update_project_status(
            &self,
            _client_id: &str,
            _status: &str,
            _brief_generated: bool,
        ) -> std::result::Result<bool, SinkError> {
            Err(broken())
        }
    }

    fn broken() -> SinkError {
        SinkError::RequestFailed {
            sink: "sheets".into(),
            reason: "offline".into(),
        }
    }

    #[tokio::test]
    async fn status_update_waits_for_slow_append() {
        let sheet = Arc::new(SlowAppendSheet::default());
        let store = SessionStore::new(Some(sheet.clone()));
        let snapshot = store.start(sample_form()).await.unwrap();
        for answer in ANSWERS {
            store.send_message(snapshot.id, answer).await.unwrap();
        }
        store.brief_exported(snapshot.id).await.unwrap();

        eventually(|| sheet.found.lock().unwrap().len() == 1).await;
        assert_eq!(*sheet.projects.lock().unwrap(), vec![snapshot.client_id]);
        assert_eq!(*sheet.found.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn failing_sheet_never_blocks_the_flow() {
        let store = SessionStore::new(Some(Arc::new(BrokenSheet)));
        let id = store.start(sample_form()).await.unwrap().id;
        for answer in ANSWERS {
            store.send_message(id, answer).await.unwrap();
        }
        store.finish_chat(id).await.unwrap();
        store.save_review(id, sample_form()).await.unwrap();
        store.brief_exported(id).await.unwrap();
        assert_eq!(store.complete(id).await.unwrap().screen, Screen::Status);
        assert!(store.brief(id).await.is_ok());
    }

    #[tokio::test]
    async fn admin_screen_opens_from_status_only() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        assert!(store.open_admin(id).await.is_err());

        for answer in ANSWERS {
            store.send_message(id, answer).await.unwrap();
        }
        store.finish_chat(id).await.unwrap();
        store.save_review(id, sample_form()).await.unwrap();
        store.complete(id).await.unwrap();

        assert_eq!(store.open_admin(id).await.unwrap().screen, Screen::Admin);
        assert_eq!(store.close_admin(id).await.unwrap().screen, Screen::Status);
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted() {
        let store = SessionStore::new(None);
        store.start(sample_form()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fresh = store.start(sample_form()).await.unwrap().id;

        assert_eq!(store.evict_expired(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.evict_expired(Duration::from_millis(10)).await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.snapshot(fresh).await.is_ok());
    }

    #[tokio::test]
    async fn sweeper_drops_expired_sessions() {
        let store = SessionStore::new(None);
        let id = store.start(sample_form()).await.unwrap().id;
        let sweeper = store.spawn_sweeper(Duration::ZERO, Duration::from_millis(10));

        let watched = Arc::clone(&store);
        tokio::time::timeout(Duration::from_secs(2), async move {
            while watched.len().await > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sweeper did not evict");
        sweeper.abort();

        let err = store.snapshot(id).await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotFound { .. })));
    }
}
