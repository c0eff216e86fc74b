pub mod gate;
pub mod render;
pub mod session;
pub mod view;

pub use gate::{TurnGate, TurnPermit, TurnPhase};
pub use render::{AssistantView, Region, RenderState, ToolBlock, ToolStatus};
pub use session::ChatSession;
pub use view::{ConversationView, EntryBody, MessageEntry, Placeholder, TurnHandle};
