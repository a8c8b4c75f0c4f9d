//! Studybot: study session tracking daemon

mod event;
mod goal;
mod session;
mod summary;

pub use event::*;
pub use goal::*;
pub use session::*;
pub use summary::*;

pub mod client;
pub mod clock;
pub mod config;
pub mod history;
pub mod ipc;
pub mod question;
pub mod registry;
pub mod report;
pub mod server;
pub mod time;
