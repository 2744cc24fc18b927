//! Line framing
//!
//! One message per line, UTF-8 JSON terminated by `\n`.

use super::{ProtocolError, ProtocolMessage};

/// Encode a message as one line, including the trailing newline
pub fn encode_line(message: &ProtocolMessage) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line (with or without its line terminator)
pub fn decode_line(line: &str) -> Result<ProtocolMessage, ProtocolError> {
    Ok(serde_json::from_str(line.trim_end_matches(['\r', '\n']))?)
}
