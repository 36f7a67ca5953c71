//! End-to-end tests with the real client against the real server: state
//! and CSeq discipline, connection retry, disconnect handling, and
//! end-of-stream propagation.

mod common;

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rtsp_stream::{Client, ClientConfig, ClientState, FrameSink, RtspError};
use tempfile::TempDir;

use common::{MOVIE, long_movie, start_server, write_movie};

#[derive(Default)]
struct TestSink {
    frames: Mutex<Vec<Vec<u8>>>,
    notices: Mutex<Vec<String>>,
    describes: Mutex<Vec<Vec<String>>>,
    teardowns: AtomicUsize,
}

impl TestSink {
    fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    fn has_notice_containing(&self, needle: &str) -> bool {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .any(|notice| notice.contains(needle))
    }
}

impl FrameSink for TestSink {
    fn on_frame(&self, payload: &[u8]) {
        self.frames.lock().unwrap().push(payload.to_vec());
    }

    fn on_describe(&self, lines: &[String]) {
        self.describes.lock().unwrap().push(lines.to_vec());
    }

    fn on_teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }

    fn on_notice(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

fn client_config(addr: SocketAddr) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.connection.server_addr = addr.ip().to_string();
    config.connection.server_port = addr.port();
    config.connection.num_of_retry = 3;
    config.connection.delay_between_retry = 0;
    config
}

fn connected_client(addr: SocketAddr) -> (Client, Arc<TestSink>) {
    let sink = Arc::new(TestSink::default());
    let client = Client::new(client_config(addr), sink.clone());
    client.run_connect();
    assert_eq!(client.state(), ClientState::Init, "connect failed");
    (client, sink)
}

fn wait_for_state(client: &Client, state: ClientState, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if client.state() == state {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn full_session_cycle() {
    let videos = TempDir::new().unwrap();
    write_movie(videos.path(), MOVIE, &long_movie());
    let (mut server, addr) = start_server(&videos);
    let (client, sink) = connected_client(addr);

    client.setup(MOVIE).unwrap();
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.cseq(), 1);
    assert!((100_000..=999_999).contains(&client.session_id()));
    let session = client.session_id();

    client.play().unwrap();
    assert_eq!(client.state(), ClientState::Playing);
    assert_eq!(client.cseq(), 2);

    std::thread::sleep(Duration::from_millis(700));

    client.pause().unwrap();
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.cseq(), 3);
    assert_eq!(client.session_id(), session);
    assert!(sink.frame_count() > 0, "no frames delivered during PLAY");

    client.teardown().unwrap();
    assert_eq!(client.state(), ClientState::Init);
    assert_eq!(client.cseq(), 4);
    assert_eq!(sink.teardowns.load(Ordering::SeqCst), 1);

    client.disconnect();
    server.stop();
}

#[test]
fn illegal_actions_do_not_advance_cseq() {
    let videos = TempDir::new().unwrap();
    write_movie(videos.path(), MOVIE, &long_movie());
    let (mut server, addr) = start_server(&videos);
    let (client, sink) = connected_client(addr);

    // Pre-SETUP: PAUSE and PLAY send nothing at all.
    assert!(matches!(
        client.pause(),
        Err(RtspError::IllegalTransition { .. })
    ));
    assert!(matches!(
        client.play(),
        Err(RtspError::IllegalTransition { .. })
    ));
    assert_eq!(client.cseq(), 0);
    assert_eq!(client.session_id(), 0);

    client.setup(MOVIE).unwrap();
    assert_eq!(client.cseq(), 1);
    assert!(client.setup(MOVIE).is_err());
    assert_eq!(client.cseq(), 1);
    assert!(client.pause().is_err());
    assert_eq!(client.cseq(), 1);

    client.play().unwrap();
    assert_eq!(client.cseq(), 2);
    assert!(client.play().is_err());
    assert_eq!(client.cseq(), 2);

    client.pause().unwrap();
    assert_eq!(client.cseq(), 3);
    assert!(client.pause().is_err());
    assert_eq!(client.cseq(), 3);

    client.teardown().unwrap();
    assert_eq!(client.cseq(), 4);
    assert!(client.teardown().is_err());
    assert_eq!(client.cseq(), 4);

    assert!(sink.has_notice_containing("not allowed"));

    client.disconnect();
    server.stop();
}

#[test]
fn missing_file_keeps_client_in_init() {
    let videos = TempDir::new().unwrap();
    write_movie(videos.path(), MOVIE, &long_movie());
    let (mut server, addr) = start_server(&videos);
    let (client, sink) = connected_client(addr);

    let err = client.setup("missing.Mjpeg").unwrap_err();
    assert!(matches!(err, RtspError::RequestFailed(404)));
    assert_eq!(client.state(), ClientState::Init);
    assert_eq!(client.cseq(), 1);
    assert_eq!(client.session_id(), 0);
    assert!(sink.has_notice_containing("404"));

    // Both sides advanced their CSeq, so a corrected SETUP succeeds.
    client.setup(MOVIE).unwrap();
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.cseq(), 2);

    client.disconnect();
    server.stop();
}

#[test]
fn end_of_stream_triggers_local_teardown() {
    let videos = TempDir::new().unwrap();
    let frames: Vec<Vec<u8>> = vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()];
    write_movie(videos.path(), MOVIE, &frames);
    let (mut server, addr) = start_server(&videos);
    let (client, sink) = connected_client(addr);

    client.setup(MOVIE).unwrap();
    client.play().unwrap();

    assert!(
        wait_for_state(&client, ClientState::Init, Duration::from_secs(3)),
        "client never returned to INIT after end of stream"
    );
    assert_eq!(sink.teardowns.load(Ordering::SeqCst), 1);
    assert!(sink.has_notice_containing("end of stream"));

    let delivered = sink.frames.lock().unwrap().clone();
    assert!(!delivered.is_empty());
    assert!(delivered.len() <= frames.len());
    for (got, want) in delivered.iter().zip(&frames) {
        assert_eq!(got, want);
    }

    client.disconnect();
    server.stop();
}

#[test]
fn server_shutdown_surfaces_peer_disconnected() {
    let videos = TempDir::new().unwrap();
    write_movie(videos.path(), MOVIE, &long_movie());
    let (mut server, addr) = start_server(&videos);
    let (client, _sink) = connected_client(addr);

    client.setup(MOVIE).unwrap();
    server.stop();
    // Session workers notice the shutdown within their 1 s read timeout.
    std::thread::sleep(Duration::from_millis(1300));

    let err = client.play().unwrap_err();
    assert!(matches!(err, RtspError::PeerDisconnected));
    assert_eq!(client.state(), ClientState::Disconnected);
}

#[test]
fn retry_exhaustion_reports_failure() {
    // Bind and drop a listener so the port is almost certainly closed.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = ClientConfig::default();
    config.connection.server_addr = "127.0.0.1".to_string();
    config.connection.server_port = port;
    config.connection.num_of_retry = 2;
    config.connection.delay_between_retry = 0;

    let sink = Arc::new(TestSink::default());
    let client = Client::new(config, sink.clone());
    client.run_connect();

    assert_eq!(client.state(), ClientState::Disconnected);
    assert!(sink.has_notice_containing("could not reach"));
}

#[test]
fn describe_forwards_extension_lines() {
    let videos = TempDir::new().unwrap();
    write_movie(videos.path(), MOVIE, &long_movie());
    let (mut server, addr) = start_server(&videos);
    let (client, sink) = connected_client(addr);

    let lines = client.describe(MOVIE).unwrap();
    assert!(lines.iter().any(|line| line == "encoding=MJPEG"));
    assert!(lines.iter().any(|line| line == "payload_type=26"));
    assert_eq!(client.cseq(), 1);
    assert_eq!(client.state(), ClientState::Init);
    assert_eq!(sink.describes.lock().unwrap().len(), 1);

    client.disconnect();
    server.stop();
}
