//! Media layer: the RTP wire codec and the framed MJPEG file reader.
//!
//! ## RTP usage (subset of RFC 3550)
//!
//! Each video frame travels in exactly one RTP datagram. The 12-byte
//! fixed header ([`rtp::RtpPacket`]) carries:
//!
//! - **Sequence number** (16-bit) — equal to the source frame number.
//! - **Timestamp** (32-bit) — the POSIX second at encode time, not a
//!   media clock. Deviates from RFC 3550 deliberately.
//! - **SSRC** (32-bit) — fixed at 0 for this stack.
//! - **Payload type** — 26 (MJPEG, RFC 3551 §6).
//!
//! ## MJPEG file format
//!
//! [`mjpeg::MjpegReader`] iterates records of the form
//! `LLLLL<payload of length L>`, where `LLLLL` are five ASCII decimal
//! digits. There is no trailer; end of file ends the stream, and the
//! streamer substitutes a five-zero-byte sentinel payload on the wire.

pub mod mjpeg;
pub mod rtp;

pub use mjpeg::MjpegReader;
pub use rtp::RtpPacket;
