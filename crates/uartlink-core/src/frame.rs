//! Notification payload sanitization
//!
//! Frames are relayed to the consumer as single well-formed text lines:
//! bytes are decoded as UTF-8 (lossily), carriage returns are stripped, and
//! newlines are escaped as the literal two-character sequence `\n` so an
//! embedded line break can never split one frame across two events.

/// Decode a notification payload into one sanitized text frame
pub fn sanitize(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    let mut frame = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\r' => {}
            '\n' => frame.push_str("\\n"),
            other => frame.push(other),
        }
    }
    frame
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
