//! Shared helpers for the integration tests: MJPEG fixtures on disk and
//! a loopback server bound to an ephemeral port.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;

use rtsp_stream::{Server, ServerConfig};
use tempfile::TempDir;

pub const MOVIE: &str = "movie.Mjpeg";

/// Write a framed MJPEG file: five ASCII digits of length, then payload.
pub fn write_movie(dir: &Path, name: &str, frames: &[Vec<u8>]) {
    let mut file = File::create(dir.join(name)).expect("create fixture");
    for frame in frames {
        write!(file, "{:05}", frame.len()).unwrap();
        file.write_all(frame).unwrap();
    }
}

/// A long-enough movie that streaming tests never hit end of stream.
pub fn long_movie() -> Vec<Vec<u8>> {
    (0..200u32)
        .map(|i| {
            let mut frame = vec![0xFFu8, 0xD8];
            frame.extend(std::iter::repeat_n(i as u8, 64 + i as usize));
            frame
        })
        .collect()
}

/// Start a server on 127.0.0.1 with an ephemeral port, serving `videos`.
pub fn start_server(videos: &TempDir) -> (Server, SocketAddr) {
    let mut config = ServerConfig::default();
    config.server.hostname = "127.0.0.1".to_string();
    config.server.server_port = 0;
    config.server.video_folder = videos.path().to_path_buf();
    let mut server = Server::new(config);
    server.start().expect("server start");
    let addr = server.local_addr().expect("bound address");
    (server, addr)
}
