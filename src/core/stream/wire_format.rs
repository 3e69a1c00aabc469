// The wire format for relayed generation streams.
//
// Each frame is a single UTF-8 text unit of the form
//
//     data: <JSON object>\n\n
//
// where the JSON object is either `{"chunk": "<fragment text>"}` or
// `{"error": "<message>"}`. The double newline is the frame delimiter.
// serde_json escapes newlines inside string values, so the delimiter can
// never appear inside a frame's payload.

use serde::{Deserialize, Serialize};

/// Prefix every frame line must carry. Units without it are dropped.
pub const FRAME_PREFIX: &str = "data: ";

/// Delimiter terminating every frame. A frame must never be interpreted
/// until the full delimiter has arrived.
pub const FRAME_DELIMITER: &[u8] = b"\n\n";

/// One decoded wire frame: a fragment of generated text, or a terminal
/// error that ends the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Chunk(String),
    Error(String),
}

/// JSON body of a frame. Exactly one of the two fields is set; `chunk`
/// wins if a payload somehow carries both.
#[derive(Debug, Serialize, Deserialize)]
struct FramePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    chunk: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Serializes one frame into its wire form, delimiter included.
pub fn encode_frame(frame: &Frame) -> String {
    let payload = match frame {
        Frame::Chunk(text) => FramePayload {
            chunk: Some(text.clone()),
            error: None,
        },
        Frame::Error(message) => FramePayload {
            chunk: None,
            error: Some(message.clone()),
        },
    };

    // Serializing a struct of plain strings cannot fail.
    let json = serde_json::to_string(&payload).expect("frame payload serializes");
    format!("data: {json}\n\n")
}

/// Incremental frame decoder.
///
/// Network reads do not align with frame boundaries: a read may end in the
/// middle of a frame, in the middle of the delimiter, or even in the middle
/// of a multi-byte UTF-8 sequence. The decoder buffers raw bytes across
/// `feed` calls and only yields a frame once its full delimiter has been
/// observed.
///
/// Malformed units (no `data: ` prefix, or a payload that is not valid
/// JSON) are dropped without aborting the stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network read into the decoder and returns every frame
    /// completed by it, in order. May return nothing.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = find_delimiter(&self.buffer) {
            let unit: Vec<u8> = self
                .buffer
                .drain(..pos + FRAME_DELIMITER.len())
                .take(pos)
                .collect();

            match parse_unit(&unit) {
                Some(frame) => frames.push(frame),
                None => {
                    tracing::debug!(
                        "dropping malformed stream unit ({} bytes)",
                        unit.len()
                    );
                }
            }
        }

        frames
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

fn parse_unit(unit: &[u8]) -> Option<Frame> {
    let text = std::str::from_utf8(unit).ok()?;
    let payload = text.strip_prefix(FRAME_PREFIX)?;
    let parsed: FramePayload = serde_json::from_str(payload).ok()?;

    if let Some(chunk) = parsed.chunk {
        Some(Frame::Chunk(chunk))
    } else {
        parsed.error.map(Frame::Error)
    }
}
