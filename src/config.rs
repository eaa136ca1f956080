// ABOUTME: Server construction options: bind address, framing discipline, and optional frame cap
// ABOUTME: Mirrors the bind-credentials/builder style used elsewhere in this codebase

use bytes::Bytes;

/// Which framing discipline a connection uses, chosen from `request_delimiter`.
///
/// An empty delimiter selects length-prefixed framing; any non-empty
/// delimiter selects delimiter framing with that byte string as terminator.
#[derive(Debug, Clone)]
pub enum FramingMode {
    /// Requests are terminated by `delimiter`, which is included verbatim in
    /// the bytes passed to the handler.
    Delimiter(Bytes),
    /// Requests are a little-endian `i32` length followed by exactly that
    /// many bytes.
    LengthPrefixed,
}

/// Construction options for a [`crate::Server`].
///
/// ```
/// use pipeline_tcp::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1:7777", "\n");
/// let config = ServerConfig::new("127.0.0.1:7778", "").max_frame_size(1 << 20);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub(crate) address: String,
    pub(crate) framing: FramingMode,
    pub(crate) max_frame_size: Option<usize>,
}

impl ServerConfig {
    /// Builds a configuration for `address`, deriving the framing mode from
    /// `request_delimiter`: empty means length-prefixed, non-empty means
    /// delimiter-terminated with that byte string.
    pub fn new(address: impl Into<String>, request_delimiter: impl AsRef<[u8]>) -> Self {
        let delimiter = request_delimiter.as_ref();
        let framing = if delimiter.is_empty() {
            FramingMode::LengthPrefixed
        } else {
            FramingMode::Delimiter(Bytes::copy_from_slice(delimiter))
        };

        ServerConfig {
            address: address.into(),
            framing,
            max_frame_size: None,
        }
    }

    /// Caps the size of a single frame (accumulated delimiter buffer, or
    /// declared length-prefixed body). Connections that exceed the cap are
    /// torn down as `client-gone` rather than allocating without bound.
    ///
    /// Unset by default, matching the base spec's unbounded behavior.
    pub fn max_frame_size(mut self, limit: usize) -> Self {
        self.max_frame_size = Some(limit);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn framing(&self) -> &FramingMode {
        &self.framing
    }
}
