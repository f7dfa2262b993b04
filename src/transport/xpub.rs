//! XPUB socket (§4.9): binds a listener, accepts any number of SUB peers,
//! and demultiplexes outgoing frames by forwarding only to peers whose
//! subscribed prefix matches the routing key.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex as SyncMutex;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;

use super::frame::{read_frame, write_frame, Frame};

/// The routing key a freshly connected SUB peer sends once, carrying its
/// subscription prefix as the payload.
pub const SUBSCRIBE_KEY: &str = "__subscribe__";

struct Subscriber {
    prefix: String,
    writer: Arc<AsyncMutex<OwnedWriteHalf>>,
}

#[derive(Clone)]
pub struct XPubSocket {
    subscribers: Arc<SyncMutex<Vec<Subscriber>>>,
}

impl XPubSocket {
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("xpub socket bound on {addr}");
        let subscribers = Arc::new(SyncMutex::new(Vec::new()));
        tokio::spawn(accept_loop(listener, subscribers.clone()));
        Ok(Self { subscribers })
    }

    /// Publishes `payload` under `routing_key` to every currently connected
    /// subscriber whose prefix is a prefix of `routing_key`. Dead
    /// connections are pruned on write failure.
    pub async fn publish(&self, routing_key: &str, payload: &[u8]) {
        let frame = Frame::new(routing_key, payload.to_vec());

        let matched: Vec<(usize, Arc<AsyncMutex<OwnedWriteHalf>>)> = {
            let subs = self.subscribers.lock();
            subs.iter()
                .enumerate()
                .filter(|(_, sub)| routing_key.starts_with(sub.prefix.as_str()))
                .map(|(idx, sub)| (idx, sub.writer.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        for (idx, writer) in matched {
            let mut guard = writer.lock().await;
            if write_frame(&mut *guard, &frame).await.is_err() {
                dead.push(idx);
            }
        }

        if !dead.is_empty() {
            let mut subs = self.subscribers.lock();
            for idx in dead.into_iter().rev() {
                subs.remove(idx);
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, subscribers: Arc<SyncMutex<Vec<Subscriber>>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let (mut read_half, write_half) = stream.into_split();
                match read_frame(&mut read_half).await {
                    Ok(Some(frame)) if frame.routing_key == SUBSCRIBE_KEY => {
                        let prefix = String::from_utf8_lossy(&frame.payload).into_owned();
                        debug!("xpub socket: {peer} subscribed with prefix {prefix:?}");
                        subscribers.lock().push(Subscriber {
                            prefix,
                            writer: Arc::new(AsyncMutex::new(write_half)),
                        });
                        // SUB peers never send anything past the handshake.
                        drop(read_half);
                    }
                    Ok(_) => warn!("xpub socket: {peer} sent an unexpected first frame, dropping"),
                    Err(err) => warn!("xpub socket: handshake with {peer} failed: {err}"),
                }
            }
            Err(err) => warn!("xpub socket: accept failed: {err}"),
        }
    }
}
