//! # rtsp-stream — RTSP/RTP streaming for length-prefixed MJPEG video
//!
//! A streaming stack with both sides of the wire: a server that accepts
//! RTSP control connections and paces Motion-JPEG frames out as RTP/UDP
//! datagrams, and a client that drives the control dialogue and hands
//! received payloads to a renderer.
//!
//! ## Protocol dialect
//!
//! The control protocol is a newline-separated subset of RTSP (RFC 2326):
//! SETUP, PLAY, PAUSE, TEARDOWN and DESCRIBE, with a strict per-connection
//! CSeq and a six-digit session id. Media travels as one RTP packet per
//! JPEG frame (subset of RFC 3550, payload type 26), paced at 20 Hz. See
//! [`protocol`] and [`media`] for the exact formats, including the
//! deliberate deviations from the RFCs (wall-clock timestamps,
//! sequence number == frame number, in-band end-of-stream sentinel).
//!
//! ## Architecture
//!
//! ```text
//! server side                         client side
//! ┌─────────────────────────┐         ┌─────────────────────────┐
//! │ Server     — acceptor   │  RTSP   │ Client     — control FSM│
//! │ SessionWorker — per-    │◄───TCP──►│ (one mutex-guarded      │
//! │   connection FSM        │         │  session state)         │
//! ├─────────────────────────┤         ├─────────────────────────┤
//! │ Streamer   — paced RTP  │───UDP──►│ Receiver   — decode,    │
//! │   sender, 50 ms period  │         │   forward to FrameSink  │
//! ├─────────────────────────┤         └─────────────────────────┘
//! │ MjpegReader — framed    │
//! │   file source           │
//! └─────────────────────────┘
//! ```
//!
//! Control and media are on distinct transports; each blocking loop has
//! a bounded timeout and a cooperative stop flag, so no thread is ever
//! force-killed.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rtsp_stream::{Client, ClientConfig, FrameSink, Server, ServerConfig};
//!
//! let mut server = Server::new(ServerConfig::default());
//! server.start().unwrap();
//!
//! struct Printer;
//! impl FrameSink for Printer {
//!     fn on_frame(&self, payload: &[u8]) {
//!         println!("frame: {} bytes", payload.len());
//!     }
//! }
//!
//! let client = Client::new(ClientConfig::default(), Arc::new(Printer));
//! client.run_connect();
//! client.setup("movie.Mjpeg").unwrap();
//! client.play().unwrap();
//! ```
//!
//! ## Crate layout
//!
//! - [`server`] — [`Server`] acceptor: bind, listen, one worker per
//!   connection.
//! - [`session`] — server-side state machine and the paced RTP streamer.
//! - [`client`] — [`Client`] control FSM, connect retry loop, RTP
//!   receiver, [`FrameSink`] seam.
//! - [`protocol`] — RTSP request/response codec.
//! - [`media`] — RTP wire codec and the framed MJPEG reader.
//! - [`config`] — TOML configuration for both binaries.
//! - [`sync`] — the cooperative [`sync::StopFlag`].
//! - [`error`] — [`RtspError`] enum and [`Result`] alias.

pub mod client;
pub mod config;
pub mod error;
pub mod media;
pub mod protocol;
pub mod server;
pub mod session;
pub mod sync;

pub use client::{Client, ClientState, FrameSink};
pub use config::{ClientConfig, ServerConfig};
pub use error::{Result, RtspError};
pub use server::Server;
