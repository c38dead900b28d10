use std::collections::HashSet;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::format::{FormattedLine, format_lines};
use crate::message::{Message, MessageId};

pub const DEFAULT_REVEAL_SPEED: Duration = Duration::from_millis(10);
pub const DEFAULT_TEXT_UPDATE_THROTTLE: Duration = Duration::from_millis(100);
const MIN_REVEAL_SPEED: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealConfig {
    /// Delay between two revealed characters.
    pub speed: Duration,
    /// Minimum wall-clock gap between two text-updated notifications.
    pub text_update_throttle: Duration,
}

impl RevealConfig {
    pub fn new(speed: Duration, text_update_throttle: Duration) -> Self {
        Self {
            speed: speed.max(MIN_REVEAL_SPEED),
            text_update_throttle,
        }
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_SPEED, DEFAULT_TEXT_UPDATE_THROTTLE)
    }
}

/// Reveal progress of one message as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStatus {
    /// Never revealed by this engine; rendered in full.
    Idle,
    Revealing { revealed_chars: usize },
    Complete,
}

/// Timer signal emitted by a [`RevealWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTick {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick from a cancelled or superseded reveal; nothing changed.
    Stale,
    Advanced {
        message_id: MessageId,
        revealed_chars: usize,
    },
    /// The final character was revealed by this tick.
    Completed { message_id: MessageId },
}

/// Interval future that feeds ticks to the engine until its reveal ends.
///
/// The caller spawns it on a tokio runtime. It exits on its own when the engine
/// cancels the reveal, so dropping the join handle is optional.
pub type RevealWorker = BoxFuture<'static, ()>;

/// Callbacks fired from [`RevealEngine::sync`] and [`RevealEngine::on_tick`].
pub trait RevealObserver {
    /// Throttled notification that the visible text grew.
    fn on_text_updated(&mut self, message_id: MessageId);
    /// Fired exactly once per revealed message.
    fn on_complete(&mut self, message_id: MessageId);
}

pub struct RevealTicks {
    ticks: mpsc::UnboundedReceiver<RevealTick>,
}

impl RevealTicks {
    pub async fn recv(&mut self) -> Option<RevealTick> {
        self.ticks.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RevealTick> {
        self.ticks.try_recv().ok()
    }
}

struct ActiveReveal {
    message_id: MessageId,
    text: String,
    total_chars: usize,
    revealed_chars: usize,
    // Dropping this sender stops the worker.
    _cancel_tx: oneshot::Sender<()>,
}

/// Typing animation for the newest bot message.
///
/// The engine only reads message text. At most one message is revealing at any
/// time and it is always the newest bot message; every other message is either
/// complete or was never revealed.
pub struct RevealEngine {
    config: RevealConfig,
    tick_tx: mpsc::UnboundedSender<RevealTick>,
    active: Option<ActiveReveal>,
    completed: HashSet<MessageId>,
    generation: u64,
    last_text_update: Option<Instant>,
}

impl RevealEngine {
    pub fn new(config: RevealConfig) -> (Self, RevealTicks) {
        let (tick_tx, ticks) = mpsc::unbounded_channel();
        let engine = Self {
            config,
            tick_tx,
            active: None,
            completed: HashSet::new(),
            generation: 0,
            last_text_update: None,
        };

        (engine, RevealTicks { ticks })
    }

    pub fn status(&self, message_id: MessageId) -> RevealStatus {
        match &self.active {
            Some(active) if active.message_id == message_id => RevealStatus::Revealing {
                revealed_chars: active.revealed_chars,
            },
            _ if self.completed.contains(&message_id) => RevealStatus::Complete,
            _ => RevealStatus::Idle,
        }
    }

    pub fn is_revealing(&self, message_id: MessageId) -> bool {
        matches!(self.status(message_id), RevealStatus::Revealing { .. })
    }

    pub fn active_message(&self) -> Option<MessageId> {
        self.active.as_ref().map(|active| active.message_id)
    }

    /// Portion of `message` that should currently be on screen.
    pub fn visible_text<'a>(&self, message: &'a Message) -> &'a str {
        match self.status(message.id) {
            RevealStatus::Revealing { revealed_chars } => char_prefix(&message.text, revealed_chars),
            RevealStatus::Idle | RevealStatus::Complete => &message.text,
        }
    }

    /// Formatted lines for the visible part of `message`.
    pub fn visible_lines(&self, message: &Message) -> Vec<FormattedLine> {
        format_lines(self.visible_text(message))
    }

    /// Re-targets the engine after the message list changed.
    ///
    /// Returns a worker when a reveal starts or restarts; the caller must spawn it.
    pub fn sync(
        &mut self,
        messages: &[Message],
        observer: &mut dyn RevealObserver,
    ) -> Option<RevealWorker> {
        if let Some(active) = &self.active
            && !messages.iter().any(|message| message.id == active.message_id)
        {
            tracing::debug!(message_id = ?active.message_id, "revealing message left the list");
            self.active = None;
        }

        let newest = messages.iter().rev().find(|message| message.is_bot())?;

        if let Some(active) = &self.active {
            if active.message_id == newest.id {
                if active.text == newest.text {
                    return None;
                }

                tracing::debug!(message_id = ?newest.id, "message text changed, restarting reveal");
                return self.start(newest, observer);
            }

            // A newer answer arrived; finish the older one instantly.
            let superseded = active.message_id;
            self.active = None;
            self.finish(superseded, observer);
        }

        if self.completed.contains(&newest.id) {
            return None;
        }

        self.start(newest, observer)
    }

    /// Applies one timer tick.
    pub fn on_tick(
        &mut self,
        tick: RevealTick,
        now: Instant,
        observer: &mut dyn RevealObserver,
    ) -> TickOutcome {
        if tick.generation != self.generation {
            return TickOutcome::Stale;
        }

        let Some(active) = self.active.as_mut() else {
            return TickOutcome::Stale;
        };

        active.revealed_chars += 1;
        let message_id = active.message_id;
        let revealed_chars = active.revealed_chars;
        let done = revealed_chars >= active.total_chars;

        if self.text_update_due(now) {
            observer.on_text_updated(message_id);
        }

        if done {
            self.active = None;
            self.finish(message_id, observer);
            return TickOutcome::Completed { message_id };
        }

        TickOutcome::Advanced {
            message_id,
            revealed_chars,
        }
    }

    /// Drops every reveal and cancels the running worker.
    ///
    /// Ticks already queued from the old worker are rejected as stale.
    pub fn reset(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(message_id = ?active.message_id, "cancelling reveal on reset");
        }
        self.completed.clear();
        self.generation = self.generation.wrapping_add(1);
        self.last_text_update = None;
    }

    fn start(&mut self, message: &Message, observer: &mut dyn RevealObserver) -> Option<RevealWorker> {
        self.generation = self.generation.wrapping_add(1);
        self.active = None;

        let total_chars = message.text.chars().count();
        if total_chars == 0 {
            self.finish(message.id, observer);
            return None;
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.active = Some(ActiveReveal {
            message_id: message.id,
            text: message.text.clone(),
            total_chars,
            revealed_chars: 0,
            _cancel_tx: cancel_tx,
        });

        tracing::debug!(
            message_id = ?message.id,
            total_chars,
            generation = self.generation,
            "starting reveal"
        );

        Some(tick_worker(
            self.config.speed,
            self.generation,
            self.tick_tx.clone(),
            cancel_rx,
        ))
    }

    fn finish(&mut self, message_id: MessageId, observer: &mut dyn RevealObserver) {
        if self.completed.insert(message_id) {
            tracing::debug!(message_id = ?message_id, "reveal complete");
            observer.on_complete(message_id);
        }
    }

    fn text_update_due(&mut self, now: Instant) -> bool {
        let due = self.last_text_update.is_none_or(|last| {
            now.saturating_duration_since(last) >= self.config.text_update_throttle
        });
        if due {
            self.last_text_update = Some(now);
        }
        due
    }
}

fn tick_worker(
    period: Duration,
    generation: u64,
    tick_tx: mpsc::UnboundedSender<RevealTick>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> RevealWorker {
    Box::pin(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => break,
                _ = interval.tick() => {
                    if tick_tx.send(RevealTick { generation }).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn char_prefix(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormattedBlock;

    #[derive(Default)]
    struct RecordingObserver {
        text_updates: Vec<MessageId>,
        completed: Vec<MessageId>,
    }

    impl RevealObserver for RecordingObserver {
        fn on_text_updated(&mut self, message_id: MessageId) {
            self.text_updates.push(message_id);
        }

        fn on_complete(&mut self, message_id: MessageId) {
            self.completed.push(message_id);
        }
    }

    fn conversation(answer: &str) -> Vec<Message> {
        vec![
            Message::user(MessageId::new(1), "질문"),
            Message::bot(MessageId::new(2), answer),
        ]
    }

    fn current_tick(engine: &RevealEngine) -> RevealTick {
        RevealTick {
            generation: engine.generation,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn five_characters_take_five_ticks_and_complete_once() {
        let (mut engine, mut ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();
        let messages = conversation("hello");

        let worker = engine.sync(&messages, &mut observer).expect("reveal starts");
        let handle = tokio::spawn(worker);

        let mut advancing_ticks = 0;
        loop {
            let tick = ticks.recv().await.expect("ticks flow until completion");
            match engine.on_tick(tick, Instant::now(), &mut observer) {
                TickOutcome::Advanced { .. } => advancing_ticks += 1,
                TickOutcome::Completed { message_id } => {
                    advancing_ticks += 1;
                    assert_eq!(message_id, MessageId::new(2));
                    break;
                }
                TickOutcome::Stale => {}
            }
        }

        assert_eq!(advancing_ticks, 5);
        assert_eq!(observer.completed, vec![MessageId::new(2)]);
        assert_eq!(engine.status(MessageId::new(2)), RevealStatus::Complete);

        // Completion cancels the worker, so the timer stops on its own.
        handle.await.expect("worker exits cleanly");
        tokio::time::sleep(Duration::from_secs(1)).await;
        while let Some(tick) = ticks.try_recv() {
            assert_eq!(engine.on_tick(tick, Instant::now(), &mut observer), TickOutcome::Stale);
        }
        assert_eq!(observer.completed.len(), 1);
        assert!(engine.sync(&messages, &mut observer).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_pending_ticks() {
        let (mut engine, mut ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();
        let messages = conversation("a fairly long answer that is still typing");

        let handle = tokio::spawn(engine.sync(&messages, &mut observer).expect("reveal starts"));
        for _ in 0..2 {
            let tick = ticks.recv().await.expect("tick");
            engine.on_tick(tick, Instant::now(), &mut observer);
        }
        assert_eq!(
            engine.status(MessageId::new(2)),
            RevealStatus::Revealing { revealed_chars: 2 }
        );

        engine.reset();
        handle.await.expect("worker stops after reset");
        tokio::time::sleep(Duration::from_secs(5)).await;

        let updates_before = observer.text_updates.len();
        while let Some(tick) = ticks.try_recv() {
            assert_eq!(engine.on_tick(tick, Instant::now(), &mut observer), TickOutcome::Stale);
        }
        assert_eq!(observer.text_updates.len(), updates_before);
        assert!(observer.completed.is_empty());
        assert_eq!(engine.status(MessageId::new(2)), RevealStatus::Idle);
        assert!(engine.active_message().is_none());
    }

    #[test]
    fn text_updates_are_throttled() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::new(
            Duration::from_millis(10),
            Duration::from_millis(100),
        ));
        let mut observer = RecordingObserver::default();
        let answer = "x".repeat(25);

        let _worker = engine.sync(&conversation(&answer), &mut observer);
        let start = Instant::now();
        for step in 1..=25u64 {
            let now = start + Duration::from_millis(10 * step);
            engine.on_tick(current_tick(&engine), now, &mut observer);
        }

        // Notified at 10ms, 110ms and 210ms.
        assert_eq!(observer.text_updates.len(), 3);
        assert_eq!(observer.completed, vec![MessageId::new(2)]);
    }

    #[test]
    fn korean_text_reveals_whole_characters() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();
        let messages = conversation("안녕하세요");

        let _worker = engine.sync(&messages, &mut observer);
        assert_eq!(engine.visible_text(&messages[1]), "");

        let now = Instant::now();
        engine.on_tick(current_tick(&engine), now, &mut observer);
        engine.on_tick(current_tick(&engine), now, &mut observer);

        assert_eq!(engine.visible_text(&messages[1]), "안녕");
        assert_eq!(engine.visible_text(&messages[0]), "질문");
    }

    #[test]
    fn visible_lines_format_the_revealed_prefix() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();
        let messages = conversation("5. 공식 링크\nhttps://example.com");

        let _worker = engine.sync(&messages, &mut observer);
        for _ in 0.."5. 공식 링크\n".chars().count() {
            engine.on_tick(current_tick(&engine), Instant::now(), &mut observer);
        }

        let lines = engine.visible_lines(&messages[1]);
        assert_eq!(lines[0].blocks, vec![FormattedBlock::heading("5. 공식 링크")]);
        assert_eq!(lines[1].blocks, vec![FormattedBlock::Break]);

        // A partial URL stays plain until it matches as a whole.
        engine.on_tick(current_tick(&engine), Instant::now(), &mut observer);
        let lines = engine.visible_lines(&messages[1]);
        assert_eq!(lines[1].blocks, vec![FormattedBlock::plain("h")]);

        while engine.is_revealing(MessageId::new(2)) {
            engine.on_tick(current_tick(&engine), Instant::now(), &mut observer);
        }
        let lines = engine.visible_lines(&messages[1]);
        assert_eq!(lines[0].blocks, vec![FormattedBlock::heading("5. 공식 링크")]);
        assert_eq!(
            lines[1].blocks,
            vec![FormattedBlock::link("https://example.com", "https://example.com")]
        );
    }

    #[test]
    fn newer_answer_supersedes_the_running_reveal() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();
        let mut messages = conversation("first answer");

        assert!(engine.sync(&messages, &mut observer).is_some());

        messages.push(Message::user(MessageId::new(3), "또 질문"));
        messages.push(Message::bot(MessageId::new(4), "second answer"));
        assert!(engine.sync(&messages, &mut observer).is_some());

        assert_eq!(observer.completed, vec![MessageId::new(2)]);
        assert_eq!(engine.status(MessageId::new(2)), RevealStatus::Complete);
        assert_eq!(
            engine.status(MessageId::new(4)),
            RevealStatus::Revealing { revealed_chars: 0 }
        );
        assert_eq!(engine.active_message(), Some(MessageId::new(4)));
    }

    #[test]
    fn changed_text_restarts_from_zero_and_rejects_old_ticks() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();

        let _worker = engine.sync(&conversation("original"), &mut observer);
        let old_tick = current_tick(&engine);
        engine.on_tick(old_tick, Instant::now(), &mut observer);
        engine.on_tick(old_tick, Instant::now(), &mut observer);

        assert!(engine.sync(&conversation("rewritten"), &mut observer).is_some());
        assert_eq!(
            engine.status(MessageId::new(2)),
            RevealStatus::Revealing { revealed_chars: 0 }
        );
        assert_eq!(
            engine.on_tick(old_tick, Instant::now(), &mut observer),
            TickOutcome::Stale
        );
        assert!(observer.completed.is_empty());
    }

    #[test]
    fn unchanged_list_does_not_restart() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();
        let messages = conversation("answer");

        assert!(engine.sync(&messages, &mut observer).is_some());
        assert!(engine.sync(&messages, &mut observer).is_none());
    }

    #[test]
    fn empty_answer_completes_without_a_worker() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();

        assert!(engine.sync(&conversation(""), &mut observer).is_none());
        assert_eq!(observer.completed, vec![MessageId::new(2)]);
        assert!(engine.sync(&conversation(""), &mut observer).is_none());
        assert_eq!(observer.completed.len(), 1);
    }

    #[test]
    fn user_only_list_stays_idle() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();
        let messages = vec![Message::user(MessageId::new(1), "hi")];

        assert!(engine.sync(&messages, &mut observer).is_none());
        assert_eq!(engine.status(MessageId::new(1)), RevealStatus::Idle);
    }

    #[test]
    fn cleared_list_drops_the_active_reveal() {
        let (mut engine, _ticks) = RevealEngine::new(RevealConfig::default());
        let mut observer = RecordingObserver::default();

        let _worker = engine.sync(&conversation("answer"), &mut observer);
        assert!(engine.sync(&[], &mut observer).is_none());

        assert!(engine.active_message().is_none());
        assert!(observer.completed.is_empty());
    }

    #[test]
    fn zero_speed_is_clamped() {
        let config = RevealConfig::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(config.speed, MIN_REVEAL_SPEED);
    }
}
