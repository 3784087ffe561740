//! User profile: the single persisted aggregate behind the dashboard and
//! the chat context.
//!
//! The profile is loaded once from the key-value store, held by a
//! `ProfileRepository`, and mutated only through shallow merges of update
//! objects returned by the assistant.

pub mod dashboard;
pub mod merge;
pub mod model;
pub mod repository;

pub use dashboard::{DashboardSummary, chat_greeting};
pub use merge::shallow_merge;
pub use model::{CalendarEvent, Device, Lists, Profile, SmartHome, Task};
pub use repository::ProfileRepository;
