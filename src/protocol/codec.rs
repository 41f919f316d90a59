//! Framing for `plustekctl` stdout.
//!
//! The driver writes text one line at a time: banners, `<<<>>>` markers and
//! result lines. [`DriverCodec`] turns the raw byte stream into those lines
//! and bounds how much a single line may buffer, so a driver stuck printing
//! without a newline fails the command instead of growing memory.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{ClientError, Result};

/// Longest stdout line the client buffers (1 MiB).
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Decoder yielding one driver stdout line per item, without its `\n` or
/// `\r\n` terminator.
///
/// An over-long line is reported once as
/// [`ClientError::InvalidResponse`]; its remaining bytes are discarded up to
/// the next newline and decoding carries on from there. Read failures and
/// non-UTF-8 output surface as [`ClientError::Io`].
#[derive(Debug)]
pub struct DriverCodec(LinesCodec);

impl DriverCodec {
    /// Codec with the [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for DriverCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DriverCodec {
    type Item = String;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        self.0.decode(src).map_err(line_error)
    }

    // The driver may exit without terminating its last line.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        self.0.decode_eof(src).map_err(line_error)
    }
}

fn line_error(err: LinesCodecError) -> ClientError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => ClientError::InvalidResponse(format!(
            "line too long: plustekctl wrote more than {MAX_LINE_BYTES} bytes without a newline"
        )),
        LinesCodecError::Io(err) => err.into(),
    }
}
