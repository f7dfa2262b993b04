//! One sensor process (§4.3): subscribes to the generator bus filtered on
//! its own `sensor_id`, stamps `sensor_received_ts`, and re-publishes every
//! event toward the receiver under the fixed routing key `"event"`.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use traffic_cep::config::PipelineConfig;
use traffic_cep::model::Event;
use traffic_cep::profiler::ThroughputProfiler;
use traffic_cep::sensor::{stamp_received, EVENT_ROUTING_KEY};
use traffic_cep::transport::{PushSocket, SubSocket};

#[derive(Parser, Debug)]
struct Cli {
    /// This process's sensor id; also the generator subscription prefix.
    #[arg(long)]
    sensor_id: i64,

    /// Generator XPUB address to connect to.
    #[arg(long, default_value = "127.0.0.1:10000")]
    connect: String,

    /// Receiver PULL address to push re-emitted events to.
    #[arg(long, default_value = "127.0.0.1:11000")]
    push_to: String,

    /// Path to a TOML file overriding the pipeline's default tunables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = PipelineConfig::load(cli.config.as_deref()) {
        error!("sensor {}: failed to load pipeline config: {err}", cli.sensor_id);
        return ExitCode::FAILURE;
    }

    let prefix = cli.sensor_id.to_string();
    let mut sub = SubSocket::connect(cli.connect.clone(), prefix.clone());
    let push = PushSocket::connect(cli.push_to.clone());
    let mut profiler = ThroughputProfiler::start("sensor");

    info!("sensor {}: {} -> {}", cli.sensor_id, cli.connect, cli.push_to);

    loop {
        tokio::select! {
            frame = sub.recv() => {
                let Some(frame) = frame else {
                    error!("sensor {}: subscription closed", cli.sensor_id);
                    return ExitCode::FAILURE;
                };
                profiler.msg_received(frame.payload.len());

                let event: Event = match serde_json::from_slice(&frame.payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("sensor {}: dropping malformed event on {:?}: {err}", cli.sensor_id, frame.routing_key);
                        continue;
                    }
                };

                let stamped = stamp_received(event);
                match serde_json::to_vec(&stamped) {
                    Ok(payload) => {
                        profiler.msg_sent(payload.len());
                        push.send(EVENT_ROUTING_KEY, payload).await;
                    }
                    Err(err) => warn!("sensor {}: failed to encode event: {err}", cli.sensor_id),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("sensor {}: received SIGINT, shutting down", cli.sensor_id);
                return ExitCode::SUCCESS;
            }
        }
    }
}
