#![deny(unsafe_code)]

//! Desktop client for the SchoolCatch campus assistant, built with GPUI and
//! gpui-component on top of `schoolcatch-chat`.

/// Application shell: window chrome, sidebar layout and shell actions.
pub mod app;
pub mod chat;
/// Settings resolution from defaults, the settings file and the environment.
pub mod settings;
