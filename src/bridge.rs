/// UI bridge: NDJSON framing between the engine and the app shell.
///
/// The engine streams [`AppMessage`]s as newline-delimited JSON and reads
/// [`UiCommand`]s the same way, one object per line.
use crate::geo::Coordinate;
use crate::protocol::{
    AppMessage, MsgBuffer, ProtocolError, RawCommand, UiCommand, MAX_MSG_LEN,
};

// ── Serialization helpers ──────────────────────────────────────────────

/// Serialize an AppMessage to JSON bytes and write to the output buffer.
/// Returns the number of bytes written including the trailing newline, or
/// None if the message plus newline does not fit.
pub fn serialize_message(msg: &AppMessage, buf: &mut [u8]) -> Option<usize> {
    let len = serde_json_core::to_slice(msg, buf).ok()?;
    // Append newline for NDJSON
    let newline = buf.get_mut(len)?;
    *newline = b'\n';
    Some(len + 1)
}

/// Serialize into a fresh, right-sized message buffer.
pub fn encode_message(msg: &AppMessage) -> Option<MsgBuffer> {
    let mut buf = MsgBuffer::new();
    buf.resize_default(MAX_MSG_LEN).ok()?;
    let len = serialize_message(msg, &mut buf)?;
    buf.truncate(len);
    Some(buf)
}

/// Deserialize a UiCommand from a JSON byte slice.
pub fn parse_command(data: &[u8]) -> Result<UiCommand, ProtocolError> {
    // Strip trailing newline/whitespace
    let trimmed = trim_trailing_whitespace(data);
    if trimmed.is_empty() {
        return Err(ProtocolError::Malformed);
    }

    let mut scratch = [0u8; 64];
    let (raw, _) = serde_json_core::from_slice_escaped::<RawCommand>(trimmed, &mut scratch)
        .map_err(|_| ProtocolError::Malformed)?;

    match raw.cmd.as_str() {
        "fix" => {
            let lat = raw.lat.ok_or(ProtocolError::MissingField("lat"))?;
            let lng = raw.lng.ok_or(ProtocolError::MissingField("lng"))?;
            Ok(UiCommand::Fix {
                coordinate: Coordinate::new(lat, lng)?,
            })
        }
        "nearby" => Ok(UiCommand::Nearby {
            category: raw.category.ok_or(ProtocolError::MissingField("category"))?,
        }),
        "clear" => Ok(UiCommand::Clear),
        "call" => Ok(UiCommand::Call {
            number: raw.number.ok_or(ProtocolError::MissingField("number"))?,
        }),
        _ => Err(ProtocolError::UnknownCommand),
    }
}

// ── NDJSON line reader ─────────────────────────────────────────────────

/// NDJSON reader state machine.
/// Accumulates bytes until a newline is found, then yields the line.
pub struct LineReader {
    buf: [u8; MAX_MSG_LEN],
    pos: usize,
    overflowed: bool,
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_MSG_LEN],
            pos: 0,
            overflowed: false,
        }
    }

    /// Feed a byte into the reader. Returns a complete line (without newline)
    /// when one is detected. An over-long line is discarded up to its
    /// newline.
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        if byte == b'\n' || byte == b'\r' {
            let overflowed = core::mem::replace(&mut self.overflowed, false);
            if self.pos > 0 && !overflowed {
                let line = &self.buf[..self.pos];
                self.pos = 0;
                Some(line)
            } else {
                self.pos = 0;
                None
            }
        } else if self.overflowed {
            None
        } else if self.pos < self.buf.len() {
            self.buf[self.pos] = byte;
            self.pos += 1;
            None
        } else {
            // Overflow, discard until the next newline
            log::warn!("Command line longer than {} bytes, discarding", MAX_MSG_LEN);
            self.pos = 0;
            self.overflowed = true;
            None
        }
    }
}

fn trim_trailing_whitespace(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && matches!(data[end - 1], b' ' | b'\n' | b'\r' | b'\t') {
        end -= 1;
    }
    &data[..end]
}
