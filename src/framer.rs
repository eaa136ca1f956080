// ABOUTME: Turns a byte stream into a dense, per-connection sequence of framed requests
// ABOUTME: Never raises: every abnormal read is folded into the terminal client-gone event

use crate::config::FramingMode;
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;

/// One event produced by the framer for a connection.
#[derive(Debug)]
pub(crate) enum FrameEvent {
    /// A complete request, dense and zero-based per connection.
    Request { req_num: u64, bytes: Bytes },
    /// The terminal marker. `req_num` is the number that would have been
    /// assigned to the next request had one arrived.
    ClientGone { req_num: u64 },
}

/// Per-connection framing state. Holds whichever discipline's accumulator,
/// plus the next `req_num` to assign.
pub(crate) struct Framer {
    state: FramerState,
    max_frame_size: Option<usize>,
    req_num: u64,
}

enum FramerState {
    Delimiter { delimiter: Bytes, accumulator: Vec<u8> },
    LengthPrefixed,
}

impl Framer {
    pub(crate) fn new(framing: &FramingMode, max_frame_size: Option<usize>) -> Self {
        let state = match framing {
            FramingMode::Delimiter(delimiter) => FramerState::Delimiter {
                delimiter: delimiter.clone(),
                accumulator: Vec::new(),
            },
            FramingMode::LengthPrefixed => FramerState::LengthPrefixed,
        };

        Framer {
            state,
            max_frame_size,
            req_num: 0,
        }
    }

    /// Produce the next frame event, reading as much as necessary from
    /// `reader`. Never returns an error: any I/O failure becomes
    /// `ClientGone`.
    pub(crate) async fn next_frame(&mut self, reader: &mut BufReader<OwnedReadHalf>) -> FrameEvent {
        match &mut self.state {
            FramerState::Delimiter {
                delimiter,
                accumulator,
            } => Self::next_delimiter_frame(
                reader,
                delimiter,
                accumulator,
                self.max_frame_size,
                &mut self.req_num,
            )
            .await,
            FramerState::LengthPrefixed => {
                Self::next_length_prefixed_frame(reader, self.max_frame_size, &mut self.req_num)
                    .await
            }
        }
    }

    async fn next_delimiter_frame(
        reader: &mut BufReader<OwnedReadHalf>,
        delimiter: &Bytes,
        accumulator: &mut Vec<u8>,
        max_frame_size: Option<usize>,
        req_num: &mut u64,
    ) -> FrameEvent {
        // The last byte of a (possibly multi-byte) delimiter is a cheap
        // hint to stop reading at; the actual boundary is a full-string
        // suffix match, checked below.
        let last_byte = *delimiter.last().expect("request_delimiter is non-empty");

        loop {
            let before = accumulator.len();
            match reader.read_until(last_byte, accumulator).await {
                Ok(0) => return FrameEvent::ClientGone { req_num: *req_num },
                Ok(_) => {
                    if let Some(limit) = max_frame_size {
                        if accumulator.len() > limit {
                            return FrameEvent::ClientGone { req_num: *req_num };
                        }
                    }

                    if accumulator.len() > before && accumulator.ends_with(delimiter.as_ref()) {
                        let bytes = Bytes::from(std::mem::take(accumulator));
                        let event = FrameEvent::Request {
                            req_num: *req_num,
                            bytes,
                        };
                        *req_num += 1;
                        return event;
                    }
                    // `last_byte` occurred but the full delimiter hasn't
                    // matched yet (e.g. a `.` inside `"\r\r.\r\r"` before the
                    // trailing `\r\r`), or read_until stopped at EOF without
                    // finding `last_byte` at all; either way, read more.
                }
                Err(_) => return FrameEvent::ClientGone { req_num: *req_num },
            }
        }
    }

    async fn next_length_prefixed_frame(
        reader: &mut BufReader<OwnedReadHalf>,
        max_frame_size: Option<usize>,
        req_num: &mut u64,
    ) -> FrameEvent {
        let mut len_bytes = [0u8; 4];
        if reader.read_exact(&mut len_bytes).await.is_err() {
            return FrameEvent::ClientGone { req_num: *req_num };
        }

        let declared = i32::from_le_bytes(len_bytes);
        if declared < 0 {
            return FrameEvent::ClientGone { req_num: *req_num };
        }

        let len = declared as usize;
        if let Some(limit) = max_frame_size {
            if len > limit {
                return FrameEvent::ClientGone { req_num: *req_num };
            }
        }

        let mut body = vec![0u8; len];
        // `read_exact` loops internally until the buffer is full; a single
        // OS read returning fewer bytes than `len` does not truncate a
        // large frame the way one bounded read would.
        if reader.read_exact(&mut body).await.is_err() {
            return FrameEvent::ClientGone { req_num: *req_num };
        }

        let event = FrameEvent::Request {
            req_num: *req_num,
            bytes: Bytes::from(body),
        };
        *req_num += 1;
        event
    }
}
