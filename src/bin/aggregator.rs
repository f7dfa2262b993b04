//! Aggregator (§4.7): subscribes to the CEP engine's `"agg"` stream and
//! detects spatially adjacent sensors reporting within the same time
//! bucket, publishing a synthetic EXCEPTION_AGG event for every run of
//! length ≥ 2. Remaining open buckets are finalized on SIGINT.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use traffic_cep::aggregator::AggregatorState;
use traffic_cep::config::PipelineConfig;
use traffic_cep::model::Event;
use traffic_cep::profiler::ThroughputProfiler;
use traffic_cep::transport::{PushSocket, SubSocket};

const AGG_FILTER: &str = "agg";

#[derive(Parser, Debug)]
struct Cli {
    /// CEP engine XPUB address to subscribe to.
    #[arg(long, default_value = "127.0.0.1:15000")]
    connect: String,

    /// Data sink PULL address.
    #[arg(long, default_value = "127.0.0.1:13000")]
    push_to: String,

    /// Path to a TOML file overriding the pipeline's default tunables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match PipelineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("aggregator: failed to load pipeline config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut sub = SubSocket::connect(cli.connect.clone(), AGG_FILTER.to_string());
    let push = PushSocket::connect(cli.push_to.clone());
    let mut state = AggregatorState::new(config.bucket_width_secs);
    let mut profiler = ThroughputProfiler::start("aggregator");

    info!("aggregator: {} -> {}", cli.connect, cli.push_to);

    loop {
        tokio::select! {
            frame = sub.recv() => {
                let Some(frame) = frame else {
                    error!("aggregator: subscription closed");
                    break;
                };
                profiler.msg_received(frame.payload.len());

                let mut event: Event = match serde_json::from_slice(&frame.payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("aggregator: dropping malformed event on {:?}: {err}", frame.routing_key);
                        continue;
                    }
                };
                event.profiler.aggregator_ts = Some(traffic_cep::model::now_epoch_secs());

                for synthetic in state.ingest(event.sensor_id, event.event_ts) {
                    publish_synthetic(&push, &mut profiler, synthetic).await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("aggregator: received SIGINT, finalizing remaining buckets");
                break;
            }
        }
    }

    for synthetic in state.finalize_remaining() {
        publish_synthetic(&push, &mut profiler, synthetic).await;
    }

    ExitCode::SUCCESS
}

async fn publish_synthetic(push: &PushSocket, profiler: &mut ThroughputProfiler, event: Event) {
    let routing_key = event
        .notification
        .expect("synthetic events always carry a notification")
        .level
        .routing_key();
    match serde_json::to_vec(&event) {
        Ok(payload) => {
            profiler.msg_sent(payload.len());
            push.send(routing_key, payload).await;
        }
        Err(err) => warn!("aggregator: failed to encode synthetic event: {err}"),
    }
}
