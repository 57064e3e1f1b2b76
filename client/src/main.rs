mod render;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use comm::{recv_msg, send_msg, Reply, Request};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct ClientArgs {
    /// Port of manager node.
    #[arg(short, long, default_value_t = 50051)]
    mgr_port: u16,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: RingRequest,
}

#[derive(Subcommand)]
enum RingRequest {
    /// Place a new node at a random position.
    AddNode,
    /// Remove the most recently added node.
    RemoveNode,
    /// Add a data point. Without a key and value the manager invents both.
    AddData {
        /// Key to place on the ring.
        #[arg(requires = "value")]
        key: Option<String>,
        /// Opaque value stored with the key.
        value: Option<String>,
    },
    /// Switch periodic data generation on or off.
    Auto {
        #[arg(value_enum)]
        switch: Switch,
    },
    /// Drop every node and every data point.
    Reset,
    /// Show the ring and how data is spread across it.
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    Start,
    Stop,
}

impl From<RingRequest> for Request {
    fn from(command: RingRequest) -> Self {
        match command {
            RingRequest::AddNode => Request::AddNode,
            RingRequest::RemoveNode => Request::RemoveNode,
            RingRequest::AddData {
                key: Some(key),
                value: Some(value),
            } => Request::AddData { key, value },
            RingRequest::AddData { .. } => Request::GenerateData,
            RingRequest::Auto {
                switch: Switch::Start,
            } => Request::StartAuto,
            RingRequest::Auto {
                switch: Switch::Stop,
            } => Request::StopAuto,
            RingRequest::Reset => Request::Reset,
            RingRequest::Status => Request::Status,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = ClientArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.mgr_port));
    debug!(%addr, "connecting to manager");
    let mut conn = TcpStream::connect(addr)
        .await
        .with_context(|| format!("couldn't reach manager at {addr}"))?;

    let request = Request::from(args.command);
    send_msg(&mut conn, &request).await?;
    let reply: Reply = recv_msg(&mut conn).await?;
    debug!(?reply, "got reply");

    print!("{}", render::reply(&reply));
    if let Reply::Rejected(_) = reply {
        std::process::exit(1);
    }

    Ok(())
}
