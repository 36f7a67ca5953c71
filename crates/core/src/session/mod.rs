//! Per-connection RTSP session state machine.
//!
//! A session is the server-side state bound to one accepted control
//! connection. It is created in `Init` when the connection is accepted,
//! assigned a random six-digit id on the first successful SETUP, and
//! destroyed when the connection closes or the peer disappears.
//!
//! ## Lifecycle
//!
//! ```text
//! SETUP      Init -> Ready      (frame source opened, RTP socket bound)
//! PLAY       Ready -> Playing   (paced streamer spawned)
//! PAUSE      Playing -> Ready   (streamer stopped and joined)
//! TEARDOWN   any -> Init        (streamer, socket, frame source dropped)
//! disconnect any -> Stop        (terminal; worker thread exits)
//! ```
//!
//! DESCRIBE is stateless and legal in every live state.
//!
//! Legality lives in one place, [`next_state`]; an illegal (state,
//! method) pair is answered with 500 and changes nothing. Requests are
//! also checked against the expected CSeq (strict: a mismatch is
//! answered with 500 and the expected value is not advanced) and, once a
//! session id exists, against that id.

pub mod streamer;

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

use crate::error::{Result, RtspError};
use crate::media::MjpegReader;
use crate::media::rtp::PAYLOAD_TYPE_MJPEG;
use crate::protocol::{Method, RtspRequest, RtspResponse};
use crate::sync::StopFlag;
use self::streamer::Streamer;

/// Read timeout on the control socket; bounds how fast the worker
/// observes server shutdown.
const CONTROL_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Receive buffer for one RTSP request.
const CONTROL_BUFFER_SIZE: usize = 1024;

const SESSION_ID_MIN: u32 = 100_000;
const SESSION_ID_MAX: u32 = 999_999;

/// Server-side protocol state for one control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Connection accepted, no media resources yet.
    Init,
    /// Frame source open and transport negotiated.
    Ready,
    /// Paced streamer delivering RTP datagrams.
    Playing,
    /// Peer gone; terminal.
    Stop,
}

impl ServerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Ready => "READY",
            Self::Playing => "PLAYING",
            Self::Stop => "STOP",
        }
    }
}

/// Target state for `method` applied in `state`.
///
/// `None` marks an illegal combination, answered with 500 and no state
/// change. This table is the single source of truth for transition
/// legality on the server side.
pub fn next_state(state: ServerState, method: Method) -> Option<ServerState> {
    use Method::*;
    use ServerState::*;
    match (state, method) {
        (Init, Setup) => Some(Ready),
        (Ready, Play) => Some(Playing),
        (Playing, Pause) => Some(Ready),
        (Init | Ready | Playing, Teardown) => Some(Init),
        (Stop, _) => None,
        (state, Describe) => Some(state),
        _ => None,
    }
}

/// Dedicated worker for one accepted control connection.
///
/// Reads requests off the TCP stream, validates CSeq, session id and
/// state legality, and coordinates the paced streamer. The worker owns
/// the frame reader, the RTP send socket and the streamer thread; all of
/// them terminate together.
pub struct SessionWorker {
    control: TcpStream,
    peer_addr: SocketAddr,
    video_folder: PathBuf,
    state: ServerState,
    session_id: Option<u32>,
    expected_cseq: u32,
    client_rtp_port: Option<u16>,
    rtp_socket: Option<Arc<UdpSocket>>,
    reader: Option<Arc<Mutex<MjpegReader>>>,
    stop: Arc<StopFlag>,
    streamer: Option<JoinHandle<()>>,
}

impl SessionWorker {
    pub fn new(control: TcpStream, peer_addr: SocketAddr, video_folder: PathBuf) -> Self {
        Self {
            control,
            peer_addr,
            video_folder,
            state: ServerState::Init,
            session_id: None,
            expected_cseq: 1,
            client_rtp_port: None,
            rtp_socket: None,
            reader: None,
            stop: Arc::new(StopFlag::new()),
            streamer: None,
        }
    }

    /// Run the request loop until the peer disconnects or the server
    /// shuts down, then release all session resources.
    pub fn run(mut self, running: Arc<AtomicBool>) {
        if let Err(e) = self.control.set_read_timeout(Some(CONTROL_READ_TIMEOUT)) {
            tracing::error!(peer = %self.peer_addr, error = %e, "failed to arm control timeout");
            return;
        }
        let reason = self.serve(&running);
        self.shutdown();
        tracing::info!(peer = %self.peer_addr, reason, "session closed");
    }

    /// RTSP request/response loop. Returns the reason for exiting.
    fn serve(&mut self, running: &AtomicBool) -> &'static str {
        let mut buf = vec![0u8; CONTROL_BUFFER_SIZE];
        while running.load(Ordering::SeqCst) {
            let n = match self.control.read(&mut buf) {
                Ok(0) => return "connection closed by peer",
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(_) => return "read error",
            };

            let text = String::from_utf8_lossy(&buf[..n]).into_owned();
            tracing::debug!(peer = %self.peer_addr, request = %text.trim_end(), "request");
            if self.process(&text).is_err() {
                return "write error";
            }
        }
        "server shutting down"
    }

    /// Validate and dispatch one request. `Err` only for control-socket
    /// write failures, which end the session.
    fn process(&mut self, raw: &str) -> Result<()> {
        let request = match RtspRequest::parse(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(peer = %self.peer_addr, error = %e, "malformed request");
                return self.reply(RtspResponse::server_error(self.expected_cseq));
            }
        };

        if request.cseq != self.expected_cseq {
            tracing::warn!(
                peer = %self.peer_addr,
                got = request.cseq,
                expected = self.expected_cseq,
                "CSeq mismatch"
            );
            return self.reply(RtspResponse::server_error(request.cseq));
        }

        let response = self.dispatch(&request);
        self.expected_cseq += 1;
        self.reply(response)
    }

    fn dispatch(&mut self, request: &RtspRequest) -> RtspResponse {
        if next_state(self.state, request.method).is_none() {
            tracing::warn!(
                method = %request.method,
                state = self.state.as_str(),
                "illegal transition"
            );
            return RtspResponse::server_error(request.cseq);
        }

        if matches!(
            request.method,
            Method::Play | Method::Pause | Method::Teardown
        ) && let Some(id) = self.session_id
            && request.session_id != Some(id)
        {
            tracing::warn!(got = ?request.session_id, expected = id, "session id mismatch");
            return RtspResponse::server_error(request.cseq);
        }

        match request.method {
            Method::Setup => self.handle_setup(request),
            Method::Play => self.handle_play(request),
            Method::Pause => self.handle_pause(request),
            Method::Teardown => self.handle_teardown(request),
            Method::Describe => self.handle_describe(request),
        }
    }

    fn handle_setup(&mut self, request: &RtspRequest) -> RtspResponse {
        let Some(port) = request.client_port else {
            return RtspResponse::server_error(request.cseq);
        };

        let path = self.video_folder.join(&request.file_name);
        let reader = match MjpegReader::open(&path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(peer = %self.peer_addr, error = %e, "SETUP rejected");
                return RtspResponse::not_found(request.cseq);
            }
        };

        let rtp_socket = match UdpSocket::bind(("0.0.0.0", 0)) {
            Ok(socket) => Arc::new(socket),
            Err(e) => {
                tracing::error!(peer = %self.peer_addr, error = %e, "RTP socket bind failed");
                return RtspResponse::server_error(request.cseq);
            }
        };

        let session_id = *self.session_id.get_or_insert_with(new_session_id);
        self.client_rtp_port = Some(port);
        self.rtp_socket = Some(rtp_socket);
        self.reader = Some(Arc::new(Mutex::new(reader)));
        self.state = ServerState::Ready;

        tracing::info!(
            session_id,
            file = %request.file_name,
            client_rtp_port = port,
            "session ready"
        );
        RtspResponse::ok(request.cseq)
    }

    fn handle_play(&mut self, request: &RtspRequest) -> RtspResponse {
        let (Some(reader), Some(socket), Some(port)) = (
            self.reader.clone(),
            self.rtp_socket.clone(),
            self.client_rtp_port,
        ) else {
            return RtspResponse::server_error(request.cseq);
        };

        self.stop.clear();
        let dest = SocketAddr::new(self.peer_addr.ip(), port);
        self.streamer = Some(Streamer::new(reader, socket, dest, self.stop.clone()).spawn());
        self.state = ServerState::Playing;

        tracing::info!(peer = %self.peer_addr, %dest, "session playing");
        RtspResponse::ok(request.cseq)
    }

    fn handle_pause(&mut self, request: &RtspRequest) -> RtspResponse {
        self.stop.set();
        if let Some(handle) = self.streamer.take() {
            let _ = handle.join();
        }
        self.state = ServerState::Ready;

        tracing::info!(peer = %self.peer_addr, "session paused");
        RtspResponse::ok(request.cseq)
    }

    fn handle_teardown(&mut self, request: &RtspRequest) -> RtspResponse {
        self.stop.set();
        if let Some(handle) = self.streamer.take() {
            let _ = handle.join();
        }
        self.rtp_socket = None;
        self.reader = None;
        self.client_rtp_port = None;
        self.state = ServerState::Init;

        tracing::info!(peer = %self.peer_addr, "session torn down");
        RtspResponse::ok(request.cseq)
    }

    fn handle_describe(&self, request: &RtspRequest) -> RtspResponse {
        RtspResponse::ok(request.cseq)
            .add_line("encoding=MJPEG")
            .add_line(&format!("payload_type={PAYLOAD_TYPE_MJPEG}"))
            .add_line(&format!("file={}", request.file_name))
    }

    /// Send a response, echoing the session id once one exists.
    fn reply(&mut self, mut response: RtspResponse) -> Result<()> {
        if let Some(id) = self.session_id {
            if response.session_id.is_none() {
                response.session_id = Some(id);
            }
        }
        tracing::debug!(peer = %self.peer_addr, status = response.status_code, "response");
        self.control
            .write_all(response.serialize().as_bytes())
            .map_err(|_| RtspError::PeerDisconnected)
    }

    fn shutdown(&mut self) {
        self.stop.set();
        if let Some(handle) = self.streamer.take() {
            let _ = handle.join();
        }
        self.rtp_socket = None;
        self.reader = None;
        self.state = ServerState::Stop;
    }
}

/// Uniformly random six-digit session id.
fn new_session_id() -> u32 {
    rand::rng().random_range(SESSION_ID_MIN..=SESSION_ID_MAX)
}
