use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ParseErrorKind, Result, RtspError};

/// Size of the fixed RTP header in bytes (RFC 3550 §5.1).
pub const HEADER_SIZE: usize = 12;

/// RTP protocol version carried in every packet.
pub const RTP_VERSION: u8 = 2;

/// Static RTP payload type for MJPEG video (RFC 3551 §6).
pub const PAYLOAD_TYPE_MJPEG: u8 = 26;

/// An RTP packet: 12-byte fixed header followed by an opaque payload.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Multi-byte fields are big-endian. The timestamp is the POSIX second
/// at encode time rather than a 90 kHz media clock; the sequence number
/// equals the source frame number. Both are deliberate deviations from
/// RFC 3550 that the rest of the stack depends on.
///
/// [`encode`](Self::encode) and [`decode`](Self::decode) are pure
/// functions; neither performs I/O or keeps state between calls.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    header: [u8; HEADER_SIZE],
    payload: Vec<u8>,
}

impl RtpPacket {
    /// Pack header fields and payload into wire bytes.
    ///
    /// Fails with [`RtspError::SequenceOverflow`] when `seq_num` does not
    /// fit 16 bits. Other numeric inputs are masked to their declared bit
    /// widths. The timestamp field is filled from the wall clock.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        version: u8,
        padding: bool,
        extension: bool,
        csrc_count: u8,
        marker: bool,
        payload_type: u8,
        seq_num: u32,
        ssrc: u32,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        if seq_num > u16::MAX as u32 {
            return Err(RtspError::SequenceOverflow(seq_num));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;

        let mut packet = Vec::with_capacity(HEADER_SIZE + payload.len());
        packet.push(
            (version & 0x03) << 6
                | (padding as u8) << 5
                | (extension as u8) << 4
                | (csrc_count & 0x0F),
        );
        packet.push((marker as u8) << 7 | (payload_type & 0x7F));
        packet.extend_from_slice(&(seq_num as u16).to_be_bytes());
        packet.extend_from_slice(&timestamp.to_be_bytes());
        packet.extend_from_slice(&ssrc.to_be_bytes());
        packet.extend_from_slice(payload);
        Ok(packet)
    }

    /// Split wire bytes into header and payload.
    ///
    /// Fails with a [`ParseErrorKind::TruncatedPacket`] error when the
    /// input is shorter than the fixed header.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(RtspError::Parse {
                kind: ParseErrorKind::TruncatedPacket,
            });
        }
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&data[..HEADER_SIZE]);
        Ok(Self {
            header,
            payload: data[HEADER_SIZE..].to_vec(),
        })
    }

    pub fn version(&self) -> u8 {
        self.header[0] >> 6
    }

    /// Sequence (frame) number.
    pub fn seq_num(&self) -> u16 {
        u16::from_be_bytes([self.header[2], self.header[3]])
    }

    /// Encode-time POSIX second.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([
            self.header[4],
            self.header[5],
            self.header[6],
            self.header[7],
        ])
    }

    /// Low 7 bits of header byte 1.
    pub fn payload_type(&self) -> u8 {
        self.header[1] & 0x7F
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
