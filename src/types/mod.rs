mod api;

pub use api::{
    ChatRequest, ConversationId, ConversationSummary, CreateConversationRequest, Message, Role,
    StreamEvent,
};
