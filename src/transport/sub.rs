//! SUB socket (§4.9): connects to an XPUB peer, sends its subscription
//! prefix once on connect, then receives only frames matching that prefix.

use log::{info, warn};
use tokio::sync::mpsc;

use super::frame::{read_frame, write_frame, Frame};
use super::xpub::SUBSCRIBE_KEY;

const QUEUE_CAPACITY: usize = 1024;

pub struct SubSocket {
    rx: mpsc::Receiver<Frame>,
}

impl SubSocket {
    /// Connects to `addr` and subscribes with `prefix`; reconnects
    /// transparently on a transient failure, matching the PUSH socket's
    /// reconnect loop.
    pub fn connect(addr: String, prefix: String) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_sub_loop(addr, prefix, tx));
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

async fn run_sub_loop(addr: String, prefix: String, tx: mpsc::Sender<Frame>) {
    loop {
        let mut stream = match tokio::net::TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!("sub socket: failed to connect to {addr}: {err}, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                continue;
            }
        };

        let handshake = Frame::new(SUBSCRIBE_KEY, prefix.clone().into_bytes());
        if let Err(err) = write_frame(&mut stream, &handshake).await {
            warn!("sub socket: subscribe handshake to {addr} failed: {err}, retrying");
            continue;
        }
        info!("sub socket connected to {addr} with prefix {prefix:?}");

        loop {
            match read_frame(&mut stream).await {
                Ok(Some(frame)) => {
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    warn!("sub socket: {addr} closed the connection, reconnecting");
                    break;
                }
                Err(err) => {
                    warn!("sub socket: read from {addr} failed: {err}, reconnecting");
                    break;
                }
            }
        }
    }
}
