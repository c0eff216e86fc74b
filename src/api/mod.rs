pub mod client;
pub mod decode;
pub mod logging;
#[cfg(test)]
pub mod mock_client;
pub mod stream;

pub use client::{ApiClient, ByteStream, ChatService};
pub use decode::{decode_event_line, LineDecodeError};
pub use stream::{LineFramer, StreamParser};
