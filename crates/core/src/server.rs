use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{Result, RtspError};
use crate::session::SessionWorker;

/// High-level server orchestrator.
///
/// Binds the RTSP control listener and spawns one [`SessionWorker`]
/// thread per accepted connection. The acceptor owns the listening
/// socket; session workers own everything session-scoped and exit on
/// their own once [`stop`](Self::stop) flips the shared running flag.
pub struct Server {
    config: ServerConfig,
    running: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            accept_thread: None,
            local_addr: None,
        }
    }

    /// Bind the control listener and start accepting connections.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RtspError::AlreadyRunning);
        }

        let listener = TcpListener::bind((
            self.config.server.hostname.as_str(),
            self.config.server.server_port,
        ))?;
        listener.set_nonblocking(true)?;
        self.local_addr = Some(listener.local_addr()?);
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(
            addr = %self.local_addr.map(|a| a.to_string()).unwrap_or_default(),
            videos = %self.config.server.video_folder.display(),
            backlog = self.config.socket.backlog,
            "RTSP server listening"
        );

        let running = self.running.clone();
        let video_folder = self.config.server.video_folder.clone();
        self.accept_thread = Some(thread::spawn(move || {
            accept_loop(listener, video_folder, running);
        }));
        Ok(())
    }

    /// Stop accepting connections and let session workers unwind.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        tracing::info!("server stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bound address of the control listener, once started. Useful when
    /// the configured port is 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

/// Non-blocking accept loop.
///
/// Checks the running flag between accepts with a 50 ms poll interval
/// so [`Server::stop`] terminates it promptly. Each accepted connection
/// gets its own [`SessionWorker`] thread; the worker sees the same flag
/// through its control-socket read timeout.
fn accept_loop(listener: TcpListener, video_folder: PathBuf, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer_addr)) => {
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                tracing::info!(%peer_addr, "client connected");
                let worker = SessionWorker::new(stream, peer_addr, video_folder.clone());
                let r = running.clone();
                thread::spawn(move || worker.run(r));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    tracing::warn!(error = %e, "accept error");
                }
            }
        }
    }
    tracing::debug!("accept loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.server.hostname = "127.0.0.1".to_string();
        config.server.server_port = 0;
        config
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut server = Server::new(loopback_config());
        server.start().unwrap();
        assert!(matches!(server.start(), Err(RtspError::AlreadyRunning)));
        server.stop();
        assert!(!server.is_running());
    }

    #[test]
    fn bind_failure_surfaces_as_io_error() {
        let mut config = loopback_config();
        config.server.hostname = "256.0.0.1".to_string();
        let mut server = Server::new(config);
        assert!(matches!(server.start(), Err(RtspError::Io(_))));
        assert!(!server.is_running());
    }

    #[test]
    fn local_addr_reports_the_bound_port() {
        let mut server = Server::new(loopback_config());
        server.start().unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        server.stop();
    }
}
