//! Dashboard summary and chat greeting derived from a profile snapshot.

use serde::Serialize;

use super::model::{CalendarEvent, Device, Profile};

/// How many tasks and shopping items the dashboard previews.
const PREVIEW_LEN: usize = 3;

/// Everything the home view shows, computed from one profile snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DashboardSummary {
    pub name: String,
    /// Up to three pending task texts, in list order.
    pub upcoming_tasks: Vec<String>,
    pub pending_task_count: usize,
    pub shopping_count: usize,
    pub shopping_preview: Vec<String>,
    /// The first calendar entry, if any.
    pub next_event: Option<CalendarEvent>,
    pub devices: Vec<Device>,
}

impl DashboardSummary {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            upcoming_tasks: profile
                .pending_tasks()
                .take(PREVIEW_LEN)
                .map(|t| t.text.clone())
                .collect(),
            pending_task_count: profile.pending_tasks().count(),
            shopping_count: profile.lists.shopping.len(),
            shopping_preview: profile
                .lists
                .shopping
                .iter()
                .take(PREVIEW_LEN)
                .cloned()
                .collect(),
            next_event: profile.calendar.first().cloned(),
            devices: profile.smart_home.devices.clone(),
        }
    }
}

/// Opening assistant message shown when a chat starts with an empty transcript.
pub fn chat_greeting(profile: &Profile) -> String {
    format!(
        "✨ Hello {}! I'm AURA, your personal AI assistant.\n\n\
         I can see you have:\n\
         • {} items on your shopping list\n\
         • {} pending tasks\n\
         • {} upcoming events\n\n\
         What would you like to work on first?",
        profile.name,
        profile.lists.shopping.len(),
        profile.pending_tasks().count(),
        profile.calendar.len(),
    )
}
