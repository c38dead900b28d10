//! Conversation state for one chat window.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use schoolcatch_transport::{
    ChatClient, ChatRequest, DEFAULT_LANGUAGE, TransportError, TransportErrorKind,
};
use tokio::sync::watch;

use crate::message::{Message, MessageId, SessionId};

/// Bot-visible text for a failed request.
pub fn failure_text(error: &TransportError) -> String {
    format!("😔 {}\n\n잠시 후 다시 시도해보세요.", error.user_message())
}

/// Point-in-time copy of the conversation published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    /// A request is in flight.
    pub loading: bool,
    /// No message has been sent in this session yet.
    pub show_initial: bool,
}

impl ChatSnapshot {
    fn fresh(session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            loading: false,
            show_initial: true,
        }
    }

    pub fn is_initial(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn newest_bot_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|message| message.is_bot())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// Another request is still in flight.
    Busy,
    Answered,
    /// The failure was appended to the transcript as a bot message.
    Failed(TransportErrorKind),
    /// The session was reset before the request settled.
    Discarded,
}

/// Owns the message list and the single in-flight request.
///
/// State changes go through one `watch` channel so every subscriber observes
/// the user message, the loading flag and the reply in order.
pub struct ChatStore {
    client: Arc<dyn ChatClient>,
    language: String,
    state: watch::Sender<ChatSnapshot>,
    next_message_id: AtomicU64,
}

impl ChatStore {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        let (state, _) = watch::channel(ChatSnapshot::fresh(SessionId::generate()));

        Self {
            client,
            language: DEFAULT_LANGUAGE.to_string(),
            state,
            next_message_id: AtomicU64::new(1),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.borrow().clone()
    }

    pub fn session_id(&self) -> SessionId {
        self.state.borrow().session_id.clone()
    }

    /// Sends `text` and appends the reply or a failure message.
    ///
    /// Resolves once the reply is in the transcript, or early with
    /// [`SendOutcome::Discarded`] when [`reset`](Self::reset) runs first. In that
    /// case the request future is dropped and nothing is appended.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let user_id = self.allocate_id();
        let mut accepted_session = None;
        self.state.send_if_modified(|state| {
            if state.loading {
                return false;
            }
            state.show_initial = false;
            state.messages.push(Message::user(user_id, text));
            state.loading = true;
            accepted_session = Some(state.session_id.clone());
            true
        });

        let Some(session_id) = accepted_session else {
            tracing::debug!("request already in flight, ignoring send");
            return SendOutcome::Busy;
        };

        let mut loading = LoadingGuard {
            state: &self.state,
            session_id: &session_id,
            armed: true,
        };

        tracing::info!(session_id = %session_id, chars = text.chars().count(), "sending chat message");

        let request = ChatRequest::new(text, session_id.as_str(), self.language.as_str());
        let mut updates = self.state.subscribe();
        let result = tokio::select! {
            biased;
            _ = session_ended(&mut updates, &session_id) => {
                tracing::info!(session_id = %session_id, "session reset, dropping in-flight request");
                return SendOutcome::Discarded;
            }
            result = self.client.post(request) => result,
        };

        let (reply, outcome) = match result {
            Ok(answer) => (answer, SendOutcome::Answered),
            Err(error) => (failure_text(&error), SendOutcome::Failed(error.kind())),
        };

        let bot_id = self.allocate_id();
        let appended = self.state.send_if_modified(|state| {
            if state.session_id != session_id {
                return false;
            }
            state.messages.push(Message::bot(bot_id, reply));
            state.loading = false;
            true
        });

        if !appended {
            return SendOutcome::Discarded;
        }

        loading.disarm();
        outcome
    }

    /// Starts a fresh session.
    ///
    /// Messages are cleared, loading and the greeting are restored and any
    /// in-flight send resolves as discarded.
    pub fn reset(&self) {
        let session_id = SessionId::generate();
        tracing::info!(session_id = %session_id, "starting new chat session");
        self.state.send_replace(ChatSnapshot::fresh(session_id));
    }

    fn allocate_id(&self) -> MessageId {
        MessageId::new(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }
}

async fn session_ended(updates: &mut watch::Receiver<ChatSnapshot>, session_id: &SessionId) {
    loop {
        let ended = updates.borrow_and_update().session_id != *session_id;
        if ended || updates.changed().await.is_err() {
            return;
        }
    }
}

// Clears the loading flag if a send future is dropped before it settles.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<ChatSnapshot>,
    session_id: &'a SessionId,
    armed: bool,
}

impl LoadingGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.session_id != *self.session_id || !state.loading {
                return false;
            }
            state.loading = false;
            true
        });
    }
}
