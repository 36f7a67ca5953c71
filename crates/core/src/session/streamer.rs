//! Timer-driven RTP sender bound to one session.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::media::MjpegReader;
use crate::media::rtp::{PAYLOAD_TYPE_MJPEG, RTP_VERSION, RtpPacket};
use crate::sync::StopFlag;

/// Nominal pacing period between RTP datagrams (20 Hz, open loop).
pub const FRAME_PERIOD: Duration = Duration::from_millis(50);

/// End-of-stream sentinel payload. Sent in place of a frame once the
/// source is exhausted; the client recognizes it and tears down locally.
pub const END_OF_STREAM: [u8; 5] = [0; 5];

/// Paced RTP sender for one session.
///
/// Holds a snapshot of the session's streaming resources, taken at PLAY
/// time. The session thread does not touch them while the streamer runs;
/// coordination happens only through the stop flag, which the loop
/// observes within one pacing period.
pub struct Streamer {
    reader: Arc<Mutex<MjpegReader>>,
    socket: Arc<UdpSocket>,
    dest: SocketAddr,
    stop: Arc<StopFlag>,
}

impl Streamer {
    pub fn new(
        reader: Arc<Mutex<MjpegReader>>,
        socket: Arc<UdpSocket>,
        dest: SocketAddr,
        stop: Arc<StopFlag>,
    ) -> Self {
        Self {
            reader,
            socket,
            dest,
            stop,
        }
    }

    /// Start the send loop on its own thread.
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    fn run(self) {
        tracing::debug!(dest = %self.dest, "streaming started");
        loop {
            if self.stop.wait_for(FRAME_PERIOD) {
                break;
            }

            let (payload, frame_number) = {
                let mut reader = self.reader.lock();
                let payload = match reader.next_frame() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(error = %e, "frame read failed");
                        break;
                    }
                };
                (payload, reader.frame_number())
            };
            let payload = if payload.is_empty() {
                END_OF_STREAM.to_vec()
            } else {
                payload
            };

            let packet = match RtpPacket::encode(
                RTP_VERSION,
                false,
                false,
                0,
                false,
                PAYLOAD_TYPE_MJPEG,
                frame_number,
                0,
                &payload,
            ) {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::warn!(error = %e, "packet dropped");
                    continue;
                }
            };

            match self.socket.send_to(&packet, self.dest) {
                Ok(_) => {}
                Err(e) if is_message_too_large(&e) => {
                    tracing::warn!(len = packet.len(), "datagram exceeds host limit, skipped");
                }
                Err(e) => {
                    tracing::error!(error = %e, "RTP send failed");
                    break;
                }
            }
        }
        tracing::debug!(dest = %self.dest, "streaming stopped");
    }
}

/// EMSGSIZE: the datagram exceeds the host's UDP limit (90 on Linux,
/// 40 on macOS, 10040 on Windows). Skipped so streaming continues.
fn is_message_too_large(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(90) | Some(40) | Some(10040))
}
