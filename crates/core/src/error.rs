//! Error types for the streaming stack.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur across the streaming stack.
///
/// Variants map to specific failure modes by layer:
///
/// - **Media**: [`SequenceOverflow`](Self::SequenceOverflow),
///   [`FrameSourceUnavailable`](Self::FrameSourceUnavailable).
/// - **Protocol**: [`Parse`](Self::Parse) — malformed RTSP messages or
///   RTP datagrams.
/// - **Session**: [`IllegalTransition`](Self::IllegalTransition),
///   [`PeerDisconnected`](Self::PeerDisconnected),
///   [`RequestFailed`](Self::RequestFailed).
/// - **Server**: [`AlreadyRunning`](Self::AlreadyRunning).
///
/// Transient conditions (socket timeouts, oversized datagrams) are
/// classified from the raw `std::io::Error` at the loop that observes
/// them and never surface through this enum.
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The RTP sequence number does not fit the 16-bit header field.
    #[error("RTP sequence number {0} exceeds 16 bits")]
    SequenceOverflow(u32),

    /// The requested video file could not be opened (answered with 404).
    #[error("frame source unavailable: {}", .0.display())]
    FrameSourceUnavailable(PathBuf),

    /// Failed to parse an RTSP message or RTP datagram.
    #[error("parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// The method is not legal in the current protocol state.
    #[error("{method} not allowed in state {state}")]
    IllegalTransition {
        method: &'static str,
        state: &'static str,
    },

    /// The peer closed the control connection (zero-length read or
    /// broken pipe). Terminal for that side of the session.
    #[error("peer disconnected")]
    PeerDisconnected,

    /// The server answered a request with a non-200 status.
    #[error("request rejected with status {0}")]
    RequestFailed(u16),

    /// [`Server::start`](crate::Server::start) was called while already
    /// running.
    #[error("server already running")]
    AlreadyRunning,
}

/// Specific kind of parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input was empty (no request or status line).
    EmptyMessage,
    /// Request line did not have the `METHOD FILENAME RTSP/1.0` shape.
    InvalidRequestLine,
    /// Request line named a method outside the supported set.
    UnknownMethod,
    /// Status line did not carry a numeric status code.
    InvalidStatusLine,
    /// The `CSeq:` line was missing or non-numeric.
    InvalidCSeq,
    /// SETUP request without a usable `Transport:` client port.
    MissingClientPort,
    /// PLAY/PAUSE/TEARDOWN request without a usable `Session:` id.
    MissingSessionId,
    /// Frame record length prefix was not ASCII decimal digits.
    InvalidFrameLength,
    /// RTP datagram shorter than the 12-byte fixed header.
    TruncatedPacket,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::UnknownMethod => write!(f, "unknown method"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidCSeq => write!(f, "missing or invalid CSeq"),
            Self::MissingClientPort => write!(f, "missing client RTP port"),
            Self::MissingSessionId => write!(f, "missing session id"),
            Self::InvalidFrameLength => write!(f, "invalid frame length prefix"),
            Self::TruncatedPacket => write!(f, "truncated RTP packet"),
        }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
