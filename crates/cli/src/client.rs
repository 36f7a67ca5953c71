use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use rtsp_stream::{Client, ClientConfig, ClientState, FrameSink};

#[derive(Parser)]
#[command(
    name = "rtsp-client",
    about = "Terminal RTSP client that drives a streaming session"
)]
struct Args {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Server host override
    #[arg(long)]
    server: Option<String>,

    /// Server port override
    #[arg(long, short)]
    port: Option<u16>,

    /// Video file to request
    #[arg(long, short, default_value = "movie.Mjpeg")]
    file: String,
}

/// Stand-in renderer: counts frames and prints occasional progress.
#[derive(Default)]
struct ConsoleSink {
    frames: AtomicUsize,
    bytes: AtomicUsize,
}

impl FrameSink for ConsoleSink {
    fn on_frame(&self, payload: &[u8]) {
        let frames = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
        let bytes = self.bytes.fetch_add(payload.len(), Ordering::SeqCst) + payload.len();
        if frames % 20 == 0 {
            tracing::info!(frames, bytes, "receiving");
        }
    }

    fn on_describe(&self, lines: &[String]) {
        for line in lines {
            println!("  {line}");
        }
    }

    fn on_teardown(&self) {
        let frames = self.frames.swap(0, Ordering::SeqCst);
        self.bytes.store(0, Ordering::SeqCst);
        println!("playback stopped ({frames} frames shown)");
    }

    fn on_notice(&self, message: &str) {
        println!("! {message}");
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ClientConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("bad configuration: {e}");
                return ExitCode::from(2);
            }
        },
        None => ClientConfig::default(),
    };
    if let Some(server) = args.server {
        config.connection.server_addr = server;
    }
    if let Some(port) = args.port {
        config.connection.server_port = port;
    }

    let sink = Arc::new(ConsoleSink::default());
    let client = Client::new(config, sink);

    client.run_connect();
    if client.state() == ClientState::Disconnected {
        return ExitCode::FAILURE;
    }

    println!("commands: setup | play | pause | teardown | describe | quit");
    prompt(&client);
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
            "setup" => report(client.setup(&args.file)),
            "play" => report(client.play()),
            "pause" => report(client.pause()),
            "teardown" => report(client.teardown()),
            "describe" => report(client.describe(&args.file).map(|_| ())),
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command: {other}"),
        }
        prompt(&client);
    }

    client.disconnect();
    ExitCode::SUCCESS
}

fn prompt(client: &Client) {
    print!("[{}] > ", client.state().as_str());
    let _ = io::stdout().flush();
}

fn report(result: rtsp_stream::Result<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "request failed");
    }
}
