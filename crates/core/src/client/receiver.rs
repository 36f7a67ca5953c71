//! Client RTP receive loop.

use std::net::UdpSocket;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::media::RtpPacket;
use crate::session::streamer::END_OF_STREAM;
use crate::sync::StopFlag;
use super::Client;

/// Receive timeout so the loop observes its stop flag with bounded
/// latency.
pub(crate) const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Pulls RTP datagrams for one playback period, decodes them, and hands
/// payloads to the frame sink.
///
/// Spawned by PLAY with a fresh stop flag; PAUSE, TEARDOWN and
/// disconnect raise that flag and the loop exits within one receive
/// cycle. A five-zero-byte payload is the end-of-stream sentinel: the
/// loop issues a local TEARDOWN through the shared client state and
/// exits, since the server keeps emitting sentinels instead.
pub(crate) struct Receiver {
    socket: Arc<UdpSocket>,
    stop: Arc<StopFlag>,
    buffer_size: usize,
    client: Client,
}

impl Receiver {
    pub(crate) fn new(
        socket: Arc<UdpSocket>,
        stop: Arc<StopFlag>,
        buffer_size: usize,
        client: Client,
    ) -> Self {
        Self {
            socket,
            stop,
            buffer_size,
            client,
        }
    }

    /// Start the receive loop on its own thread.
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    fn run(self) {
        tracing::debug!("RTP receiver started");
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            if self.stop.is_set() {
                break;
            }
            let n = match self.socket.recv_from(&mut buf) {
                Ok((n, _)) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "RTP receive failed");
                    break;
                }
            };

            let packet = match RtpPacket::decode(&buf[..n]) {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable datagram dropped");
                    continue;
                }
            };

            if packet.payload() == END_OF_STREAM {
                tracing::info!(frame = packet.seq_num(), "end of stream");
                self.client.notify_stream_end();
                break;
            }

            tracing::trace!(
                frame = packet.seq_num(),
                len = packet.payload().len(),
                "frame received"
            );
            self.client.deliver_frame(packet.payload());
        }
        tracing::debug!("RTP receiver stopped");
    }
}
