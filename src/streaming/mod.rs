//! Streaming inference module
//!
//! Backend client, incremental record parser, error classification and the
//! session that turns one completion call into lifecycle events.

pub mod call_log;
pub mod client;
pub mod events;
pub mod parser;
pub mod policy;
pub mod session;

// Re-export commonly used types
pub use call_log::{CallLog, CallLogEntry, CallLogKind};
pub use client::{ByteStream, ChatBackend, ChatRequest, OpenAiClient, DEFAULT_API_BASE};
pub use events::{StreamError, StreamErrorKind, StreamEvent};
pub use parser::{parse_chunk, ChunkContent, RecordParser, SseRecord, MAX_BUFFER_SIZE};
pub use policy::{BackendFault, ErrorPolicy};
pub use session::{CallOutcome, InferenceSession, StreamRequest, TOKEN_MARGIN};
