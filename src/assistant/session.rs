//! Chat session: the home/chat view state, the in-memory transcript, and
//! the single-flight send path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::extract::{UpdateFragment, extract_update};
use crate::config::DEFAULT_HISTORY_WINDOW;
use crate::error::SessionError;
use crate::llm::prompts::assistant_system_prompt;
use crate::llm::{ChatCompletion, ChatMessage, CompletionRequest};
use crate::profile::{ProfileRepository, chat_greeting};

/// Assistant turn appended when the completion request fails.
pub const FALLBACK_REPLY: &str = "⚠️ Sorry, I encountered an error. Let me try that again.";

/// Which view the presentation layer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Chat,
}

#[derive(Debug, Default)]
struct SessionState {
    view: View,
    transcript: Vec<ChatMessage>,
    /// Prefilled input offered when chat is opened from a quick action.
    draft: Option<String>,
}

/// Snapshot of the session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub view: View,
    pub loading: bool,
    pub draft: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Owns the in-flight flag for one turn and resets it when the turn ends,
/// however it ends.
struct InFlight(Arc<ChatSession>);

impl InFlight {
    fn acquire(session: &Arc<ChatSession>) -> Option<Self> {
        session
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(session)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

/// One chat session. The transcript lives only as long as the session.
pub struct ChatSession {
    id: Uuid,
    profiles: Arc<ProfileRepository>,
    llm: Arc<dyn ChatCompletion>,
    history_window: usize,
    state: RwLock<SessionState>,
    in_flight: AtomicBool,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("history_window", &self.history_window)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(profiles: Arc<ProfileRepository>, llm: Arc<dyn ChatCompletion>) -> Self {
        Self {
            id: Uuid::new_v4(),
            profiles,
            llm,
            history_window: DEFAULT_HISTORY_WINDOW,
            state: RwLock::new(SessionState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Number of trailing messages sent with each request (minimum 1).
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn profiles(&self) -> &Arc<ProfileRepository> {
        &self.profiles
    }

    pub async fn view(&self) -> View {
        self.state.read().await.view
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.state.read().await.transcript.clone()
    }

    pub async fn draft(&self) -> Option<String> {
        self.state.read().await.draft.clone()
    }

    /// Whether a send is in flight. Input should be disabled while true.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            view: state.view,
            loading: self.is_loading(),
            draft: state.draft.clone(),
            messages: state.transcript.clone(),
        }
    }

    /// Switch to the chat view.
    ///
    /// Greets from the current profile only when the transcript is empty;
    /// returning to an existing conversation resumes it as-is.
    pub async fn enter_chat(&self, draft: Option<String>) {
        let greeting = chat_greeting(&self.profiles.snapshot().await);

        let mut state = self.state.write().await;
        state.view = View::Chat;
        if let Some(draft) = draft.filter(|d| !d.trim().is_empty()) {
            state.draft = Some(draft);
        }
        if state.transcript.is_empty() {
            state.transcript.push(ChatMessage::assistant(greeting));
            debug!(session = %self.id, "Greeted new chat");
        }
    }

    /// Switch back to the home view. The transcript is kept.
    pub async fn leave_chat(&self) {
        self.state.write().await.view = View::Home;
    }

    /// Send one user message and return the assistant turn appended for it.
    ///
    /// Only one send may be in flight; a concurrent call fails with
    /// [`SessionError::Busy`] without touching the transcript. Endpoint
    /// failures are not errors here: they produce [`FALLBACK_REPLY`].
    ///
    /// The turn runs on its own task. Dropping the returned future does not
    /// abort it, so the user turn always gets its assistant turn.
    pub async fn send(self: &Arc<Self>, text: &str) -> Result<ChatMessage, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let guard = InFlight::acquire(self).ok_or(SessionError::Busy)?;
        let text = text.to_string();

        let turn = tokio::spawn(async move {
            let session = Arc::clone(&guard.0);
            let reply = session.run_turn(text).await;
            drop(guard);
            reply
        });

        Ok(turn.await.unwrap_or_else(|e| {
            warn!(session = %self.id, error = %e, "Chat turn task failed");
            ChatMessage::assistant(FALLBACK_REPLY)
        }))
    }

    async fn run_turn(&self, text: String) -> ChatMessage {
        let window = {
            let mut state = self.state.write().await;
            state.transcript.push(ChatMessage::user(text));
            state.draft = None;
            request_window(&state.transcript, self.history_window)
        };

        let profile = self.profiles.snapshot().await;
        let request = CompletionRequest::new(assistant_system_prompt(&profile), window);

        let span = info_span!("chat_turn", session = %self.id, model = self.llm.model_name());
        let reply = async move {
            match self.llm.complete(request).await {
                Ok(text) => self.handle_reply(&text).await,
                Err(e) => {
                    warn!(error = %e, "Completion request failed");
                    ChatMessage::assistant(FALLBACK_REPLY)
                }
            }
        }
        .instrument(span)
        .await;

        self.state.write().await.transcript.push(reply.clone());
        reply
    }

    /// Apply any update carried by `text` and build the displayed turn.
    async fn handle_reply(&self, text: &str) -> ChatMessage {
        let extracted = extract_update(text);
        match &extracted.update {
            Some(UpdateFragment::Parsed(Some(data))) => {
                if let Err(e) = self.profiles.apply_update(data).await {
                    warn!(error = %e, "Dropped profile update");
                }
            }
            Some(UpdateFragment::Parsed(None)) => {
                debug!("Update fragment carried no data");
            }
            Some(UpdateFragment::Rejected { .. }) | None => {}
        }
        info!(chars = extracted.display_text.len(), "Assistant replied");
        ChatMessage::assistant(extracted.display_text)
    }
}

/// The trailing `window` messages worth sending. Turns with no visible
/// text (a reply that was only an update block) carry nothing and are not
/// accepted by the endpoint, so they are left out.
fn request_window(transcript: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let sendable: Vec<&ChatMessage> = transcript
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .collect();
    let skip = sendable.len().saturating_sub(window);
    sendable[skip..].iter().map(|m| (*m).clone()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::oneshot;

    use super::*;
    use crate::config::PROFILE_KEY;
    use crate::error::LlmError;
    use crate::llm::Role;
    use crate::store::InMemoryStore;

    /// Replies with canned text and records every request it sees.
    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("ok".to_string()))
        }
    }

    /// Blocks the first request until released.
    struct GatedLlm {
        gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl ChatCompletion for GatedLlm {
        fn model_name(&self) -> &str {
            "gated"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            let gate = self.gate.lock().await.take();
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            Ok("released".to_string())
        }
    }

    async fn repo() -> Arc<ProfileRepository> {
        Arc::new(ProfileRepository::open(Arc::new(InMemoryStore::new()), PROFILE_KEY).await)
    }

    fn failure() -> LlmError {
        LlmError::RequestFailed {
            provider: "test".to_string(),
            reason: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn enter_chat_greets_once() {
        let session = Arc::new(ChatSession::new(repo().await, Arc::new(ScriptedLlm::new(vec![]))));
        assert_eq!(session.view().await, View::Home);

        session.enter_chat(None).await;
        assert_eq!(session.view().await, View::Chat);
        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, Role::Assistant);
        assert!(transcript[0].content.contains("Hello Lucy!"));

        session.send("hi").await.unwrap();
        session.leave_chat().await;
        assert_eq!(session.view().await, View::Home);
        session.leave_chat().await;
        session.enter_chat(None).await;

        let after = session.transcript().await;
        assert_eq!(after.len(), 3);
        assert_eq!(after.iter().filter(|m| m.content.contains("Hello Lucy!")).count(), 1);
    }

    #[tokio::test]
    async fn quick_action_draft_is_kept_until_sent() {
        let session = Arc::new(ChatSession::new(repo().await, Arc::new(ScriptedLlm::new(vec![]))));
        session
            .enter_chat(Some("Show me my shopping list".to_string()))
            .await;
        assert_eq!(session.draft().await.as_deref(), Some("Show me my shopping list"));

        session.send("Show me my shopping list").await.unwrap();
        assert!(session.draft().await.is_none());
    }

    #[tokio::test]
    async fn reply_update_is_merged_and_stripped() {
        let reply = r#"Some text {"action":"update","data":{"preferences":{"theme":"dark"}}} more text"#;
        let profiles = repo().await;
        let session = Arc::new(ChatSession::new(
            Arc::clone(&profiles),
            Arc::new(ScriptedLlm::new(vec![Ok(reply.to_string())])),
        ));
        session.enter_chat(None).await;

        let turn = session.send("make it dark").await.unwrap();
        assert_eq!(turn, ChatMessage::assistant("Some text  more text"));
        assert_eq!(
            profiles.snapshot().await.preference("theme"),
            Some(&json!("dark"))
        );
        assert_eq!(
            profiles.load().await.unwrap().preference("theme"),
            Some(&json!("dark"))
        );
        assert_eq!(session.transcript().await.last(), Some(&turn));
    }

    #[tokio::test]
    async fn nested_update_applies_in_full() {
        let reply = r#"{"action":"update","data":{"lists":{"tasks":[{"text":"X","done":false}]},"nested":{"a":1}}}"#;
        let profiles = repo().await;
        let session = Arc::new(ChatSession::new(
            Arc::clone(&profiles),
            Arc::new(ScriptedLlm::new(vec![Ok(reply.to_string())])),
        ));

        let turn = session.send("add X").await.unwrap();
        assert_eq!(turn.content, "");
        let profile = profiles.snapshot().await;
        assert_eq!(profile.lists.tasks.len(), 1);
        assert_eq!(profile.lists.tasks[0].text, "X");
        assert!(profile.lists.shopping.is_empty());
        assert_eq!(profile.extra.get("nested"), Some(&json!({"a": 1})));
    }

    #[tokio::test]
    async fn malformed_update_leaves_profile_alone() {
        let reply = r#"Hmm {"action":"update","data":{"name": nope} ok"#;
        let profiles = repo().await;
        let session = Arc::new(ChatSession::new(
            Arc::clone(&profiles),
            Arc::new(ScriptedLlm::new(vec![Ok(reply.to_string())])),
        ));

        let turn = session.send("rename me").await.unwrap();
        assert_eq!(turn.content, "Hmm  ok");
        assert_eq!(profiles.snapshot().await, crate::profile::Profile::default());
    }

    #[tokio::test]
    async fn endpoint_failure_appends_fallback() {
        let session = Arc::new(ChatSession::new(
            repo().await,
            Arc::new(ScriptedLlm::new(vec![Err(failure())])),
        ));
        let turn = session.send("hello?").await.unwrap();
        assert_eq!(turn, ChatMessage::assistant(FALLBACK_REPLY));

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0], ChatMessage::user("hello?"));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let session = Arc::new(ChatSession::new(repo().await, Arc::new(ScriptedLlm::new(vec![]))));
        assert_eq!(session.send("   ").await, Err(SessionError::EmptyMessage));
        assert!(session.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn only_last_window_is_sent_with_fresh_prompt() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let session = Arc::new(ChatSession::new(repo().await, llm.clone()).with_history_window(4));
        session.enter_chat(None).await;

        for i in 0..3 {
            session.send(&format!("msg {i}")).await.unwrap();
        }

        let requests = llm.requests();
        assert_eq!(requests.len(), 3);
        // greeting + 3 user + 2 replies before the last reply = 6; last 4 sent.
        let last = &requests[2];
        assert_eq!(last.messages.len(), 4);
        assert_eq!(last.messages.last(), Some(&ChatMessage::user("msg 2")));
        assert!(last.system.contains("Name: Lucy"));
        // First request still included the greeting.
        assert_eq!(requests[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn second_send_is_refused_while_first_is_pending() {
        let (tx, rx) = oneshot::channel();
        let llm = Arc::new(GatedLlm {
            gate: tokio::sync::Mutex::new(Some(rx)),
        });
        let session = Arc::new(ChatSession::new(repo().await, llm));

        let first = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send("first").await })
        };

        tokio::time::timeout(Duration::from_secs(2), async {
            while !session.is_loading() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("first send never started");

        assert_eq!(session.send("second").await, Err(SessionError::Busy));

        tx.send(()).unwrap();
        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.content, "released");
        assert!(!session.is_loading());

        // Re-enabled after the first send resolved.
        assert!(session.send("third").await.is_ok());
        let users: Vec<String> = session
            .transcript()
            .await
            .into_iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content)
            .collect();
        assert_eq!(users, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn loading_clears_after_failure() {
        let session = Arc::new(ChatSession::new(
            repo().await,
            Arc::new(ScriptedLlm::new(vec![Err(failure()), Ok("fine".to_string())])),
        ));
        session.send("a").await.unwrap();
        assert!(!session.is_loading());
        assert_eq!(session.send("b").await.unwrap().content, "fine");
    }

    #[tokio::test]
    async fn update_only_reply_stays_off_later_requests() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(r#"{"action":"update","data":{"name":"Ana"}}"#.to_string()),
            Ok("You're welcome!".to_string()),
        ]));
        let profiles = repo().await;
        let session = Arc::new(ChatSession::new(Arc::clone(&profiles), llm.clone()));

        let first = session.send("rename me").await.unwrap();
        assert_eq!(first.content, "");
        assert_eq!(profiles.snapshot().await.name, "Ana");

        session.send("thanks").await.unwrap();
        let requests = llm.requests();
        assert_eq!(
            requests[1].messages,
            vec![ChatMessage::user("rename me"), ChatMessage::user("thanks")]
        );
        assert!(requests[1].messages.iter().all(|m| !m.content.is_empty()));
        assert_eq!(session.transcript().await.len(), 4);
    }

    #[tokio::test]
    async fn dropped_send_still_completes_turn() {
        let (tx, rx) = oneshot::channel();
        let llm = Arc::new(GatedLlm {
            gate: tokio::sync::Mutex::new(Some(rx)),
        });
        let session = Arc::new(ChatSession::new(repo().await, llm));

        let abandoned = tokio::time::timeout(Duration::from_millis(50), session.send("hi")).await;
        assert!(abandoned.is_err());
        assert!(session.is_loading());

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while session.is_loading() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("turn never finished");

        assert_eq!(
            session.transcript().await,
            vec![ChatMessage::user("hi"), ChatMessage::assistant("released")]
        );
    }

    #[test]
    fn request_window_skips_blank_turns() {
        let transcript = vec![
            ChatMessage::user("a"),
            ChatMessage::assistant(""),
            ChatMessage::user("b"),
            ChatMessage::assistant("c"),
            ChatMessage::user("d"),
        ];
        assert_eq!(
            request_window(&transcript, 3),
            vec![
                ChatMessage::user("b"),
                ChatMessage::assistant("c"),
                ChatMessage::user("d")
            ]
        );
    }
}
