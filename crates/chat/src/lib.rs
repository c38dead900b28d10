#![deny(unsafe_code)]

//! Toolkit-independent chat core: the session store, the answer formatter and the
//! typing-reveal state machine. Any rendering layer subscribes to [`ChatStore`]
//! snapshots and drives a [`RevealEngine`] from its own event loop.

/// Rule-based conversion of answer text into renderable blocks.
pub mod format;
/// Domain entities shared by every layer.
pub mod message;
/// Character-by-character reveal of the newest bot answer.
pub mod reveal;
pub mod session;

pub use format::{FormattedBlock, FormattedLine, format, format_lines};
pub use message::{Message, MessageId, Sender, SessionId};
pub use reveal::{
    RevealConfig, RevealEngine, RevealObserver, RevealStatus, RevealTick, RevealTicks,
    RevealWorker, TickOutcome,
};
pub use session::{ChatSnapshot, ChatStore, SendOutcome, failure_text};
