//! Client control-plane state machine.
//!
//! The client mirrors the server's session FSM from the other side of
//! the control connection:
//!
//! ```text
//! connect    Disconnected -> Init
//! SETUP      Init -> Ready        (RTP receive socket bound)
//! PLAY       Ready -> Playing     (receive loop spawned)
//! PAUSE      Playing -> Ready
//! TEARDOWN   Ready/Playing -> Init
//! disconnect any -> Disconnected
//! ```
//!
//! User actions run synchronously on the calling thread; connection
//! establishment and the RTP receive loop each run on their own worker.
//! Shared session state lives behind one mutex, so the receive loop can
//! issue a local TEARDOWN when the end-of-stream sentinel arrives.
//!
//! Attempted actions in illegal states are surfaced through the
//! [`FrameSink`] and do not advance the outgoing CSeq; CSeq moves only
//! along legal transitions.

pub mod receiver;

use std::io::{Read, Write};
use std::net::{TcpStream, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::error::{Result, RtspError};
use crate::protocol::{Method, RtspRequest, RtspResponse};
use crate::sync::StopFlag;
use self::receiver::Receiver;

/// Client-side protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No control connection.
    Disconnected,
    /// Connected, no session negotiated.
    Init,
    /// Session negotiated, playback suspended.
    Ready,
    /// Receive loop consuming RTP datagrams.
    Playing,
}

impl ClientState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Init => "INIT",
            Self::Ready => "READY",
            Self::Playing => "PLAYING",
        }
    }
}

/// Target state for a user action in `state`.
///
/// `None` marks an illegal action: it produces a user-visible notice,
/// sends nothing, and leaves the CSeq untouched. The single source of
/// truth for transition legality on the client side.
pub fn next_state(state: ClientState, method: Method) -> Option<ClientState> {
    use ClientState::*;
    use Method::*;
    match (state, method) {
        (Disconnected, _) => None,
        (Init, Setup) => Some(Ready),
        (Ready, Play) => Some(Playing),
        (Playing, Pause) => Some(Ready),
        (Ready | Playing, Teardown) => Some(Init),
        (state, Describe) => Some(state),
        _ => None,
    }
}

/// Sink for payloads and user-visible reports leaving the control plane.
///
/// The presentation layer implements this; the core never touches
/// pixels. Callbacks arrive from the RTP receive thread and from
/// whichever thread drives user actions, so implementations must be
/// thread-safe.
pub trait FrameSink: Send + Sync {
    /// A JPEG payload arrived on the RTP socket.
    fn on_frame(&self, payload: &[u8]);

    /// Extension lines from a DESCRIBE response.
    fn on_describe(&self, _lines: &[String]) {}

    /// Playback was torn down; any rendered frame should be dropped.
    fn on_teardown(&self) {}

    /// A user-visible notice (illegal action, connection trouble, end
    /// of stream).
    fn on_notice(&self, _message: &str) {}
}

/// Session state shared between the action thread, the connect worker
/// and the RTP receive loop.
struct Inner {
    control: Option<TcpStream>,
    rtp_socket: Option<Arc<UdpSocket>>,
    session_id: u32,
    cseq: u32,
    state: ClientState,
    file_name: String,
    receiver_stop: Option<Arc<StopFlag>>,
    receiver: Option<JoinHandle<()>>,
}

/// RTSP client driving one server session.
///
/// Cheap to clone; clones share the same session state. User actions
/// ([`setup`](Self::setup), [`play`](Self::play), ...) are synchronous
/// and return the protocol outcome; notices for a human are delivered
/// through the [`FrameSink`] as well.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    inner: Arc<Mutex<Inner>>,
    stop_connect: Arc<AtomicBool>,
    sink: Arc<dyn FrameSink>,
}

impl Client {
    pub fn new(config: ClientConfig, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                control: None,
                rtp_socket: None,
                session_id: 0,
                cseq: 0,
                state: ClientState::Disconnected,
                file_name: String::new(),
                receiver_stop: None,
                receiver: None,
            })),
            stop_connect: Arc::new(AtomicBool::new(false)),
            sink,
        }
    }

    pub fn state(&self) -> ClientState {
        self.inner.lock().state
    }

    pub fn session_id(&self) -> u32 {
        self.inner.lock().session_id
    }

    /// Outgoing CSeq of the most recent request (0 before the first).
    pub fn cseq(&self) -> u32 {
        self.inner.lock().cseq
    }

    /// Start connection establishment on a worker thread.
    ///
    /// Runs [`run_connect`](Self::run_connect); the handle completes
    /// when the attempt loop ends either way.
    pub fn connect(&self) -> JoinHandle<()> {
        let client = self.clone();
        thread::spawn(move || client.run_connect())
    }

    /// Bounded-retry connection loop (blocking).
    ///
    /// Makes up to `num_of_retry` attempts, sleeping
    /// `delay_between_retry` seconds in between. Connection refused is
    /// retried; any other error is fatal. Success resets the session:
    /// state `Init`, CSeq 0, session id 0.
    pub fn run_connect(&self) {
        self.stop_connect.store(false, Ordering::SeqCst);
        let addr = format!(
            "{}:{}",
            self.config.connection.server_addr, self.config.connection.server_port
        );
        let attempts = self.config.connection.num_of_retry;

        for attempt in 1..=attempts {
            if self.stop_connect.load(Ordering::SeqCst) {
                tracing::info!(%addr, "connection attempt cancelled");
                return;
            }
            match TcpStream::connect(addr.as_str()) {
                Ok(stream) => {
                    let mut inner = self.inner.lock();
                    inner.control = Some(stream);
                    inner.session_id = 0;
                    inner.cseq = 0;
                    inner.state = ClientState::Init;
                    tracing::info!(%addr, attempt, "connected to server");
                    return;
                }
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                    tracing::warn!(%addr, attempt, "connection refused");
                }
                Err(e) => {
                    tracing::error!(%addr, error = %e, "connection failed");
                    self.sink.on_notice(&format!("connection to {addr} failed: {e}"));
                    return;
                }
            }
            if attempt < attempts {
                self.sleep_between_retries();
            }
        }

        tracing::error!(%addr, attempts, "connection attempts exhausted");
        self.sink
            .on_notice(&format!("could not reach {addr} after {attempts} attempts"));
    }

    /// Abort an in-flight connection attempt.
    pub fn cancel_connect(&self) {
        self.stop_connect.store(true, Ordering::SeqCst);
    }

    /// SETUP: bind the RTP receive socket, advertise its port, and
    /// negotiate a session for `file_name`.
    pub fn setup(&self, file_name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_legal(&inner, Method::Setup)?;

        let rtp_socket = UdpSocket::bind(("0.0.0.0", 0))?;
        rtp_socket.set_read_timeout(Some(receiver::RECV_TIMEOUT))?;
        let rtp_port = rtp_socket.local_addr()?.port();

        inner.cseq += 1;
        inner.file_name = file_name.to_string();
        let request =
            RtspRequest::new(Method::Setup, file_name, inner.cseq).with_client_port(rtp_port);
        let response = self.exchange(&mut inner, &request)?;

        inner.session_id = response.session_id.unwrap_or(0);
        inner.rtp_socket = Some(Arc::new(rtp_socket));
        inner.state = ClientState::Ready;
        tracing::info!(session_id = inner.session_id, rtp_port, "session ready");
        Ok(())
    }

    /// PLAY: start the receive loop and resume delivery.
    pub fn play(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_legal(&inner, Method::Play)?;
        let Some(socket) = inner.rtp_socket.clone() else {
            return Err(RtspError::IllegalTransition {
                method: Method::Play.as_str(),
                state: inner.state.as_str(),
            });
        };

        inner.cseq += 1;
        let file_name = inner.file_name.clone();
        let request = RtspRequest::new(Method::Play, &file_name, inner.cseq)
            .with_session_id(inner.session_id);
        let _ = self.exchange(&mut inner, &request)?;

        let stop = Arc::new(StopFlag::new());
        let receiver = Receiver::new(
            socket,
            stop.clone(),
            self.config.client.rtp_buffer_size,
            self.clone(),
        );
        inner.receiver_stop = Some(stop);
        inner.receiver = Some(receiver.spawn());
        inner.state = ClientState::Playing;
        tracing::info!("session playing");
        Ok(())
    }

    /// PAUSE: stop the receive loop and suspend delivery.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_legal(&inner, Method::Pause)?;

        inner.cseq += 1;
        let file_name = inner.file_name.clone();
        let request = RtspRequest::new(Method::Pause, &file_name, inner.cseq)
            .with_session_id(inner.session_id);
        let _ = self.exchange(&mut inner, &request)?;

        if let Some(stop) = inner.receiver_stop.take() {
            stop.set();
        }
        inner.receiver = None;
        inner.state = ClientState::Ready;
        tracing::info!("session paused");
        Ok(())
    }

    /// TEARDOWN: end the session and release the RTP socket.
    pub fn teardown(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_legal(&inner, Method::Teardown)?;

        inner.cseq += 1;
        let file_name = inner.file_name.clone();
        let request = RtspRequest::new(Method::Teardown, &file_name, inner.cseq)
            .with_session_id(inner.session_id);
        let _ = self.exchange(&mut inner, &request)?;

        if let Some(stop) = inner.receiver_stop.take() {
            stop.set();
        }
        inner.receiver = None;
        inner.rtp_socket = None;
        inner.session_id = 0;
        inner.state = ClientState::Init;
        tracing::info!("session torn down");
        self.sink.on_teardown();
        Ok(())
    }

    /// DESCRIBE: query stream properties; extension lines also go to the
    /// sink.
    pub fn describe(&self, file_name: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.lock();
        self.check_legal(&inner, Method::Describe)?;

        inner.cseq += 1;
        let request = RtspRequest::new(Method::Describe, file_name, inner.cseq);
        let response = self.exchange(&mut inner, &request)?;

        self.sink.on_describe(&response.extension_lines);
        Ok(response.extension_lines)
    }

    /// Drop the control connection and stop every worker. Safe to call
    /// in any state.
    pub fn disconnect(&self) {
        self.cancel_connect();
        let receiver = {
            let mut inner = self.inner.lock();
            self.drop_connection(&mut inner);
            inner.receiver.take()
        };
        if let Some(handle) = receiver {
            let _ = handle.join();
        }
        tracing::info!("disconnected");
    }

    fn check_legal(&self, inner: &Inner, method: Method) -> Result<()> {
        if next_state(inner.state, method).is_none() {
            let state = inner.state.as_str();
            tracing::warn!(method = %method, state, "action not allowed");
            self.sink
                .on_notice(&format!("{method} not allowed in state {state}"));
            return Err(RtspError::IllegalTransition {
                method: method.as_str(),
                state,
            });
        }
        Ok(())
    }

    /// Send one request and read its response off the control socket.
    ///
    /// A zero-length read or any socket failure drops the connection; a
    /// 500 from the server does too (the session on the other side is
    /// gone for good).
    fn exchange(&self, inner: &mut Inner, request: &RtspRequest) -> Result<RtspResponse> {
        let text = request.serialize();
        tracing::debug!(request = %text.trim_end(), "request");

        let read_result = {
            let Some(control) = inner.control.as_mut() else {
                return Err(RtspError::PeerDisconnected);
            };
            control.write_all(text.as_bytes()).and_then(|_| {
                let mut buf = vec![0u8; self.config.client.rtsp_buffer_size];
                let n = control.read(&mut buf)?;
                Ok(buf[..n].to_vec())
            })
        };
        let raw = match read_result {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "control socket failed");
                self.drop_connection(inner);
                self.sink.on_notice("connection to server lost");
                return Err(RtspError::PeerDisconnected);
            }
        };
        if raw.is_empty() {
            self.drop_connection(inner);
            self.sink.on_notice("server closed the connection");
            return Err(RtspError::PeerDisconnected);
        }

        let text = String::from_utf8_lossy(&raw).into_owned();
        tracing::debug!(response = %text.trim_end(), "response");
        let response = RtspResponse::parse(&text)?;
        if response.cseq != inner.cseq {
            tracing::warn!(got = response.cseq, expected = inner.cseq, "response CSeq mismatch");
        }

        if response.is_ok() {
            return Ok(response);
        }
        match response.status_code {
            404 => {
                self.sink
                    .on_notice(&format!("server replied 404 {}", response.status_text));
                Err(RtspError::RequestFailed(404))
            }
            code => {
                self.sink
                    .on_notice(&format!("server replied {code}, disconnecting"));
                self.drop_connection(inner);
                Err(RtspError::RequestFailed(code))
            }
        }
    }

    fn drop_connection(&self, inner: &mut Inner) {
        if let Some(stop) = inner.receiver_stop.take() {
            stop.set();
        }
        inner.control = None;
        inner.rtp_socket = None;
        inner.state = ClientState::Disconnected;
    }

    /// Cancellable sleep between connection attempts.
    fn sleep_between_retries(&self) {
        let deadline =
            Instant::now() + Duration::from_secs(self.config.connection.delay_between_retry);
        while Instant::now() < deadline {
            if self.stop_connect.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }

    pub(crate) fn deliver_frame(&self, payload: &[u8]) {
        self.sink.on_frame(payload);
    }

    /// The end-of-stream sentinel arrived: report it and tear the
    /// session down locally, since the server never will.
    pub(crate) fn notify_stream_end(&self) {
        self.sink.on_notice("end of stream");
        if let Err(e) = self.teardown() {
            tracing::warn!(error = %e, "local teardown failed");
        }
    }
}
