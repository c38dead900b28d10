use std::sync::Arc;

use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;
use schoolcatch_chat::{
    ChatSnapshot, ChatStore, Message, MessageId, RevealEngine, RevealObserver, RevealTick,
    RevealTicks, RevealWorker, Sender, TickOutcome,
};

use crate::chat::events::Submit;
use crate::chat::message_list::MessageRow;
use crate::chat::{
    ChatSidebar, MessageInput, MessageList, SidebarNewChatClicked, SidebarToggleClicked,
};
use crate::settings::Settings;

/// Side effects collected while the reveal engine runs.
#[derive(Debug, Default)]
struct RevealEffects {
    text_updated: bool,
    completed: Vec<MessageId>,
}

impl RevealObserver for RevealEffects {
    fn on_text_updated(&mut self, _message_id: MessageId) {
        self.text_updated = true;
    }

    fn on_complete(&mut self, message_id: MessageId) {
        self.completed.push(message_id);
    }
}

/// Parent coordinator wiring the store, the reveal engine and the child views.
pub struct ChatView {
    sidebar: Entity<ChatSidebar>,
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    store: Arc<ChatStore>,
    reveal: RevealEngine,
    snapshot: ChatSnapshot,
    snapshot_task: Option<Task<()>>,
    reveal_tick_task: Option<Task<()>>,
    reveal_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    send_task: Option<Task<()>>,
}

impl EventEmitter<SidebarToggleClicked> for ChatView {}

impl ChatView {
    pub fn new(
        settings: &Settings,
        store: Arc<ChatStore>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let sidebar = cx.new(|cx| ChatSidebar::new(settings, cx));
        let display_name = settings.display_name.clone();
        let message_list = cx.new(|cx| MessageList::new(display_name, cx));
        let message_input = cx.new(|cx| MessageInput::new(window, cx));
        let (reveal, reveal_ticks) = RevealEngine::new(settings.reveal_config());
        let snapshot = store.snapshot();

        let mut this = Self {
            sidebar: sidebar.clone(),
            message_list,
            message_input: message_input.clone(),
            store,
            reveal,
            snapshot: snapshot.clone(),
            snapshot_task: None,
            reveal_tick_task: None,
            reveal_worker_task: None,
            send_task: None,
        };

        this.spawn_snapshot_listener(cx);
        this.spawn_reveal_tick_reader(reveal_ticks, cx);
        this.apply_snapshot(snapshot, cx);

        cx.subscribe(&sidebar, |this, _, _event: &SidebarNewChatClicked, cx| {
            this.new_chat(cx);
        })
        .detach();

        cx.subscribe(&sidebar, |_, _, _event: &SidebarToggleClicked, cx| {
            cx.emit(SidebarToggleClicked);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.handle_submit(event.clone(), cx);
        })
        .detach();

        this
    }

    pub fn sidebar(&self) -> &Entity<ChatSidebar> {
        &self.sidebar
    }

    /// Tears down the conversation: cancels the request and the reveal, then
    /// starts a fresh session.
    pub fn new_chat(&mut self, cx: &mut Context<Self>) {
        self.store.reset();
        self.reveal.reset();
        self.reveal_worker_task = None;

        self.message_list.update(cx, |list, cx| {
            list.reset_scroll(cx);
        });

        self.apply_snapshot(self.store.snapshot(), cx);
    }

    fn handle_submit(&mut self, event: Submit, cx: &mut Context<Self>) {
        if self.snapshot.loading {
            return;
        }

        let store = self.store.clone();
        let request = Tokio::spawn(cx, async move { store.send(&event.content).await });

        self.send_task = Some(cx.spawn(async move |_, _| match request.await {
            Ok(outcome) => tracing::debug!(?outcome, "chat send settled"),
            Err(error) => tracing::error!(?error, "chat send task failed"),
        }));
    }

    fn spawn_snapshot_listener(&mut self, cx: &mut Context<Self>) {
        let mut updates = self.store.subscribe();

        self.snapshot_task = Some(cx.spawn(async move |this, cx| {
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                let applied = this.update(cx, |this, cx| {
                    this.apply_snapshot(snapshot, cx);
                });
                if applied.is_err() {
                    break;
                }
            }
        }));
    }

    fn spawn_reveal_tick_reader(&mut self, mut ticks: RevealTicks, cx: &mut Context<Self>) {
        self.reveal_tick_task = Some(cx.spawn(async move |this, cx| {
            while let Some(tick) = ticks.recv().await {
                let handled = this.update(cx, |this, cx| {
                    this.handle_reveal_tick(tick, cx);
                });
                if handled.is_err() {
                    break;
                }
            }
        }));
    }

    fn spawn_reveal_worker(&mut self, worker: RevealWorker, cx: &mut Context<Self>) {
        self.reveal_worker_task = Some(Tokio::spawn(cx, worker));
    }

    fn apply_snapshot(&mut self, snapshot: ChatSnapshot, cx: &mut Context<Self>) {
        if snapshot.session_id != self.snapshot.session_id {
            // A reset that did not come from this view still drops reveal progress.
            self.reveal.reset();
            self.reveal_worker_task = None;
        }
        self.snapshot = snapshot;

        let mut effects = RevealEffects::default();
        if let Some(worker) = self.reveal.sync(&self.snapshot.messages, &mut effects) {
            self.spawn_reveal_worker(worker, cx);
        }
        self.apply_reveal_effects(&effects);

        let rows = self
            .snapshot
            .messages
            .iter()
            .map(|message| self.row_for(message))
            .collect::<Vec<_>>();
        let loading = self.snapshot.loading;
        let show_greeting = self.snapshot.show_initial && self.snapshot.is_initial();

        self.message_list.update(cx, |list, cx| {
            list.set_greeting(show_greeting, cx);
            list.set_rows(rows, cx);
            list.set_loading(loading, cx);
        });
        self.message_input.update(cx, |input, cx| {
            input.set_loading(loading, cx);
        });

        cx.notify();
    }

    fn handle_reveal_tick(&mut self, tick: RevealTick, cx: &mut Context<Self>) {
        let mut effects = RevealEffects::default();
        let outcome = self
            .reveal
            .on_tick(tick, tokio::time::Instant::now(), &mut effects);

        let message_id = match outcome {
            TickOutcome::Stale => return,
            TickOutcome::Advanced { message_id, .. } | TickOutcome::Completed { message_id } => {
                message_id
            }
        };

        self.apply_reveal_effects(&effects);

        let Some(row) = self
            .snapshot
            .messages
            .iter()
            .find(|message| message.id == message_id)
            .map(|message| self.row_for(message))
        else {
            return;
        };

        let follow = effects.text_updated || !effects.completed.is_empty();
        self.message_list.update(cx, |list, cx| {
            list.update_row(row, cx);
            if follow {
                list.follow_content(cx);
            }
        });
    }

    fn apply_reveal_effects(&mut self, effects: &RevealEffects) {
        if effects.completed.is_empty() {
            return;
        }

        for message_id in &effects.completed {
            tracing::debug!(message_id = ?message_id, "answer fully revealed");
        }

        if self.reveal.active_message().is_none() {
            self.reveal_worker_task = None;
        }
    }

    fn row_for(&self, message: &Message) -> MessageRow {
        match message.sender {
            Sender::User => MessageRow::user(message.id, &message.text),
            Sender::Bot => MessageRow::bot(
                message.id,
                self.reveal.visible_lines(message),
                self.reveal.is_revealing(message.id),
            ),
        }
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-view")
            .relative()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .id("chat-view-message-input")
                    .flex_shrink_0()
                    .w_full()
                    .child(self.message_input.clone()),
            )
    }
}
