mod host;

use anyhow::Context;
use clap::Parser;
use host::Host;
use ring::{Engine, RingConfig};
use std::{net::SocketAddr, time::Duration};
use tokio::{net::TcpListener, sync::mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// One request per connection; anything slower is dropped.
const CONN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(version, about = "Hosts a consistent hashing ring", long_about = None)]
struct ManagerArgs {
    /// Port to serve client requests on.
    #[arg(short, long, default_value_t = 50051)]
    port: u16,
    /// Largest number of nodes the ring accepts.
    #[arg(long, default_value_t = 8)]
    max_nodes: usize,
    /// Smallest number of nodes the ring keeps.
    #[arg(long, default_value_t = 1)]
    min_nodes: usize,
    /// Nodes placed around the ring at startup.
    #[arg(long, default_value_t = 3)]
    initial_nodes: usize,
    /// Random offset (degrees, exclusive) added to each startup node.
    #[arg(long, default_value_t = 30)]
    jitter: u16,
    /// Milliseconds between generated data points.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Seed for node positions and generated keys.
    #[arg(long)]
    seed: Option<u64>,
    /// Start generating data right away.
    #[arg(long)]
    auto: bool,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl ManagerArgs {
    fn ring_config(&self) -> RingConfig {
        RingConfig {
            max_nodes: self.max_nodes,
            min_nodes: self.min_nodes,
            initial_nodes: self.initial_nodes,
            initial_jitter: self.jitter,
            generate_every: Duration::from_millis(self.interval_ms),
            seed: self.seed,
        }
    }
}

// Every engine step runs on this one thread, one at a time.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = ManagerArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let engine = Engine::new(args.ring_config()).context("invalid ring configuration")?;
    let mut host = Host::new(engine);
    if args.auto {
        host.start_auto();
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("couldn't bind {addr}"))?;
    info!(%addr, "listening");

    let (tx, rx) = mpsc::channel(64);
    let owner = tokio::spawn(host.run(rx));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (conn, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    match tokio::time::timeout(CONN_TIMEOUT, host::serve_conn(conn, tx)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => error!(%peer, error = %e, "request failed"),
                        Err(_) => warn!(%peer, "connection timed out"),
                    }
                });
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    drop(tx);
    owner.await.context("ring owner task panicked")?;
    Ok(())
}
