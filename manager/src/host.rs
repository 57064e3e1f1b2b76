//! The task that owns the ring.
//!
//! Connections never touch the engine. They hand their request to the
//! owner over a channel and wait for the reply, so commands and generator
//! ticks run strictly one after another.

use comm::{recv_msg, send_msg, Reply, Request};
use ring::{Engine, RingError, Schedule};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, oneshot},
};
use tracing::{debug, info};

pub struct Command {
    pub request: Request,
    pub reply: oneshot::Sender<Reply>,
}

pub struct Host {
    engine: Engine,
    schedule: Schedule,
}

impl Host {
    pub fn new(engine: Engine) -> Self {
        let schedule = Schedule::new(engine.config().generate_every);
        Self { engine, schedule }
    }

    pub fn start_auto(&mut self) {
        self.schedule.start();
        info!(period = ?self.schedule.period(), "auto generation on");
    }

    pub fn stop_auto(&mut self) {
        self.schedule.stop();
        info!("auto generation off");
    }

    /// Runs one command to completion.
    pub fn handle(&mut self, request: Request) -> Reply {
        debug!(?request, "handling");
        let outcome = match request {
            Request::AddNode => self.engine.add_node().map(Reply::NodeAdded),
            Request::RemoveNode => self.engine.remove_node().map(Reply::NodeRemoved),
            Request::AddData { key, value } => self
                .engine
                .add_data_point(key, value)
                .map(|point| Reply::DataAdded(point.clone())),
            Request::GenerateData => self
                .engine
                .generate_data_point()
                .map(|point| Reply::DataAdded(point.clone())),
            Request::StartAuto => {
                self.start_auto();
                Ok(self.auto_state())
            }
            Request::StopAuto => {
                self.stop_auto();
                Ok(self.auto_state())
            }
            Request::Reset => {
                self.engine.reset();
                Ok(Reply::Done)
            }
            Request::Status => Ok(Reply::Status {
                snapshot: self.engine.snapshot(),
                auto_running: self.schedule.is_running(),
            }),
        };
        outcome.unwrap_or_else(Reply::Rejected)
    }

    /// One generator tick. An empty ring just skips it.
    pub fn on_tick(&mut self) {
        match self.engine.generate_data_point() {
            Ok(point) => debug!(key = %point.key, node = %point.node, "generated"),
            Err(RingError::NoNodes) => debug!("tick skipped, ring is empty"),
            Err(e) => debug!(error = %e, "tick skipped"),
        }
    }

    fn auto_state(&self) -> Reply {
        Reply::Auto {
            running: self.schedule.is_running(),
        }
    }

    /// Serves commands and ticks until every sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(Command { request, reply }) = command else {
                        break;
                    };
                    let response = self.handle(request);
                    // The connection may have given up already.
                    let _ = reply.send(response);
                }
                _ = self.schedule.tick() => self.on_tick(),
            }
        }
        info!("ring owner stopped");
    }
}

/// Reads one request, forwards it to the owner and writes back the reply.
pub async fn serve_conn<C>(mut conn: C, host: mpsc::Sender<Command>) -> comm::Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let request: Request = recv_msg(&mut conn).await?;
    let (tx, rx) = oneshot::channel();
    if host.send(Command { request, reply: tx }).await.is_err() {
        debug!("ring owner gone, dropping request");
        return Ok(());
    }
    let Ok(reply) = rx.await else {
        return Ok(());
    };
    send_msg(&mut conn, &reply).await
}
