//! The assistant turn: extracting structured updates from replies, the
//! home/chat session state machine, and its REST surface.

pub mod extract;
pub mod routes;
pub mod session;

pub use extract::{ExtractedReply, UpdateEnvelope, UpdateFragment, extract_update};
pub use routes::{AssistantRouteState, assistant_routes};
pub use session::{ChatSession, FALLBACK_REPLY, View};
