//! RTSP message codec (subset of RFC 2326).
//!
//! The dialect is newline-separated ASCII with no carriage returns and a
//! single space between tokens. One TCP read carries one message; there
//! is no blank-line terminator and no body framing.
//!
//! ## Request
//!
//! ```text
//! SETUP movie.Mjpeg RTSP/1.0
//! CSeq: 1
//! Transport: RTP/UDP; client_port= 52341
//! ```
//!
//! The third line is `Transport:` for SETUP, `Session:` for
//! PLAY/PAUSE/TEARDOWN, and absent for DESCRIBE.
//!
//! ## Response
//!
//! ```text
//! RTSP/1.0 200 OK
//! CSeq: 1
//! Session: 415032
//! ```
//!
//! The `Session` line appears once the server has assigned a session id.
//! DESCRIBE responses append `key=value` extension lines after it.
//!
//! ## Supported methods
//!
//! | Method | Purpose |
//! |--------|---------|
//! | SETUP | Open the frame source and negotiate the RTP port |
//! | PLAY | Start paced media delivery |
//! | PAUSE | Suspend media delivery |
//! | TEARDOWN | Destroy session state |
//! | DESCRIBE | Query stream properties (stateless) |

pub mod request;
pub mod response;

pub use request::{Method, RtspRequest};
pub use response::RtspResponse;
