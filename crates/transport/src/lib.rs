#![deny(unsafe_code)]

//! Client side of the `/api/chat/` endpoint.
//!
//! The chat server is an opaque collaborator: this crate serializes one question,
//! waits for one answer and folds every failure into [`TransportError`].

mod client;
mod error;
mod wire;

pub use client::{ChatClient, ClientConfig, DEFAULT_ENDPOINT, DEFAULT_LANGUAGE, HttpChatClient};
pub use error::{TransportError, TransportErrorKind, TransportResult};
pub use wire::{ChatRequest, ChatResponse};
