//! PULL socket (§4.9): binds a listener, accepts any number of PUSH peers,
//! and merges their frames into one inbound stream. Per-connection order is
//! preserved; order across connections is unspecified, matching §5.

use log::{debug, info, warn};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use super::frame::{read_frame, Frame};

const QUEUE_CAPACITY: usize = 1024;

pub struct PullSocket {
    rx: mpsc::Receiver<Frame>,
}

impl PullSocket {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("pull socket bound on {addr}");
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(accept_loop(listener, tx));
        Ok(Self { rx })
    }

    /// Blocks until the next frame arrives from any connected peer, or
    /// returns `None` once every peer has disconnected and no listener
    /// accept task remains (process shutdown).
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

async fn accept_loop(listener: TcpListener, tx: mpsc::Sender<Frame>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("pull socket: accepted connection from {peer}");
                tokio::spawn(read_peer_loop(stream, peer.to_string(), tx.clone()));
            }
            Err(err) => {
                warn!("pull socket: accept failed: {err}");
            }
        }
    }
}

async fn read_peer_loop(mut stream: tokio::net::TcpStream, peer: String, tx: mpsc::Sender<Frame>) {
    loop {
        match read_frame(&mut stream).await {
            Ok(Some(frame)) => {
                if tx.send(frame).await.is_err() {
                    return;
                }
            }
            Ok(None) => {
                debug!("pull socket: peer {peer} disconnected");
                return;
            }
            Err(err) => {
                warn!("pull socket: read from {peer} failed: {err}");
                return;
            }
        }
    }
}
