//! PUSH socket (§4.9): connects out to a bound PULL peer. `send` is
//! fire-and-forget from the caller's point of view, backpressuring only
//! when the bounded outbound queue fills up.

use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::frame::{write_frame, Frame};

/// Bound on the outbound queue; matches the "bounded outbound queue" called
/// out in §5 as the mechanism behind send-side backpressure.
const QUEUE_CAPACITY: usize = 1024;

pub struct PushSocket {
    tx: mpsc::Sender<Frame>,
}

impl PushSocket {
    /// Spawns a background task that owns the connection to `addr` and
    /// reconnects on any transient I/O failure; the caller never observes
    /// the reconnect, only the backpressure from a full queue.
    pub fn connect(addr: String) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_push_loop(addr, rx));
        Self { tx }
    }

    pub async fn send(&self, routing_key: impl Into<String>, payload: Vec<u8>) {
        let frame = Frame::new(routing_key, payload);
        if self.tx.send(frame).await.is_err() {
            warn!("push socket background task has exited, dropping frame");
        }
    }
}

async fn run_push_loop(addr: String, mut rx: mpsc::Receiver<Frame>) {
    loop {
        let stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!("push socket: failed to connect to {addr}: {err}, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                continue;
            }
        };
        debug!("push socket connected to {addr}");
        let mut stream = stream;

        loop {
            let Some(frame) = rx.recv().await else {
                let _ = stream.shutdown().await;
                return;
            };
            if let Err(err) = write_frame(&mut stream, &frame).await {
                warn!("push socket: write to {addr} failed: {err}, reconnecting");
                break;
            }
        }
    }
}
