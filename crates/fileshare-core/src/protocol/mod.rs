//! Protocol module containing the framing layer and the wire vocabulary.

pub mod framing;
pub mod messages;

pub use framing::{send_line, send_payload, FramingError, LineReader, CHUNK_SIZE};
pub use messages::{Command, ProtocolError, ServerLine};
