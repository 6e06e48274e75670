//! `osc`: a small interactive shell with a raw-mode line editor, a five-entry
//! recall history, and fork/exec execution with one pipe or one redirection.

pub mod builtins;
pub mod config;
pub mod editor;
pub mod history;
pub mod parser;
pub mod pipeline;
pub mod repl;
pub mod terminal;
pub mod util;
