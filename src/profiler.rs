//! profiler.rs
//! Scope-bound throughput counters (§4.1): one per running processor.
//! Increment on every message in/out, and log a summary automatically when
//! the scope exits — success, error, or SIGINT — via `Drop`, so no call
//! site has to remember to flush it.

use std::time::Instant;

use log::info;

pub struct ThroughputProfiler {
    name: &'static str,
    start: Instant,
    count_in: u64,
    count_out: u64,
    bytes_in: u64,
    bytes_out: u64,
}

impl ThroughputProfiler {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            count_in: 0,
            count_out: 0,
            bytes_in: 0,
            bytes_out: 0,
        }
    }

    pub fn msg_received(&mut self, bytes: usize) {
        self.count_in += 1;
        self.bytes_in += bytes as u64;
    }

    pub fn msg_sent(&mut self, bytes: usize) {
        self.count_out += 1;
        self.bytes_out += bytes as u64;
    }
}

impl Drop for ThroughputProfiler {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_secs_f64().max(1e-9);
        info!(
            "{}: {} in / {} out over {:.2}s ({:.1} msg/s in, {:.1} msg/s out, {:.0} B/s in, {:.0} B/s out)",
            self.name,
            self.count_in,
            self.count_out,
            elapsed,
            self.count_in as f64 / elapsed,
            self.count_out as f64 / elapsed,
            self.bytes_in as f64 / elapsed,
            self.bytes_out as f64 / elapsed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_messages_in_and_out() {
        let mut profiler = ThroughputProfiler::start("test");
        profiler.msg_received(10);
        profiler.msg_received(20);
        profiler.msg_sent(5);
        assert_eq!(profiler.count_in, 2);
        assert_eq!(profiler.count_out, 1);
        assert_eq!(profiler.bytes_in, 30);
        assert_eq!(profiler.bytes_out, 5);
    }
}
