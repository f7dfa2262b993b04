//! The brokerless transport substrate (§4.9): four TCP socket roles
//! (PUSH, PULL, XPUB, SUB) matching ZeroMQ's classic patterns by name, over
//! the frame codec in [`frame`]. No broker, no clustering — each socket
//! talks directly to the peer(s) named in its address.

pub mod frame;
pub mod pull;
pub mod push;
pub mod sub;
pub mod xpub;

pub use frame::Frame;
pub use pull::PullSocket;
pub use push::PushSocket;
pub use sub::SubSocket;
pub use xpub::XPubSocket;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn free_addr() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    }

    #[tokio::test]
    async fn xpub_only_forwards_frames_matching_the_subscribed_prefix() {
        let addr = free_addr().await;
        let xpub = XPubSocket::bind(&addr).await.unwrap();
        let mut sub = SubSocket::connect(addr.clone(), "event".to_string());

        // give the subscribe handshake time to land before publishing
        tokio::time::sleep(Duration::from_millis(100)).await;

        xpub.publish("agg", b"should not arrive").await;
        xpub.publish("event.created", b"should arrive").await;

        let received = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("channel closed");
        assert_eq!(received.routing_key, "event.created");
        assert_eq!(received.payload, b"should arrive");

        let second = tokio::time::timeout(Duration::from_millis(300), sub.recv()).await;
        assert!(second.is_err(), "subscriber should not have received the non-matching frame");
    }

    #[tokio::test]
    async fn pull_socket_preserves_per_peer_order_across_two_peers() {
        let addr = free_addr().await;
        let mut pull = PullSocket::bind(&addr).await.unwrap();

        let push_a = PushSocket::connect(addr.clone());
        let push_b = PushSocket::connect(addr.clone());

        for i in 0..5 {
            push_a.send("a", format!("a{i}").into_bytes()).await;
        }
        for i in 0..5 {
            push_b.send("b", format!("b{i}").into_bytes()).await;
        }

        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        for _ in 0..10 {
            let frame = tokio::time::timeout(Duration::from_secs(2), pull.recv())
                .await
                .expect("timed out")
                .expect("channel closed");
            let payload = String::from_utf8(frame.payload).unwrap();
            if frame.routing_key == "a" {
                seen_a.push(payload);
            } else {
                seen_b.push(payload);
            }
        }

        assert_eq!(seen_a, vec!["a0", "a1", "a2", "a3", "a4"]);
        assert_eq!(seen_b, vec!["b0", "b1", "b2", "b3", "b4"]);
    }
}
