//! Core of castforge: resilient remote generation, batch aggregation,
//! audio encoding and the autosaving pipeline state behind a session
//! controller. Network, disk and terminal concerns live in the plugin and
//! CLI crates.

pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod handles;
pub mod notify;
pub mod pipeline;
pub mod remote;
pub mod session;

pub use client::{GenerationClient, ResearchBrief, ResearchReport};
pub use config::AppConfig;
pub use error::{GenerationError, SessionError};
pub use notify::{EventBus, Notification, NotificationKind, SessionEvent};
pub use session::SessionController;
