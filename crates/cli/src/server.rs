use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rtsp_stream::{Server, ServerConfig};

#[derive(Parser)]
#[command(
    name = "rtsp-server",
    about = "RTSP/RTP server for length-prefixed MJPEG video"
)]
struct Args {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Bind address override
    #[arg(long)]
    hostname: Option<String>,

    /// Control port override
    #[arg(long, short)]
    port: Option<u16>,

    /// Video folder override
    #[arg(long)]
    videos: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ServerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("bad configuration: {e}");
                return ExitCode::from(2);
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(hostname) = args.hostname {
        config.server.hostname = hostname;
    }
    if let Some(port) = args.port {
        config.server.server_port = port;
    }
    if let Some(videos) = args.videos {
        config.server.video_folder = videos;
    }

    let mut server = Server::new(config);
    if let Err(e) = server.start() {
        eprintln!("failed to start server: {e}");
        return ExitCode::FAILURE;
    }

    let addr = server
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    println!("RTSP server on {addr} - press Enter to stop");
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);

    server.stop();
    ExitCode::SUCCESS
}
