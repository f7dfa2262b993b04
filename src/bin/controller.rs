//! Controller (§4.5): subscribes to the receiver's `"event"` stream and
//! tees each event toward the data sink and the CEP engine on independent
//! PUSH sockets. The two sends are independent; a slow CEP engine must not
//! block the data-sink branch beyond ordinary transport backpressure.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use traffic_cep::config::PipelineConfig;
use traffic_cep::controller::{stamp_forwarded, SUBSCRIBE_FILTER};
use traffic_cep::model::Event;
use traffic_cep::profiler::ThroughputProfiler;
use traffic_cep::transport::{PushSocket, SubSocket};

#[derive(Parser, Debug)]
struct Cli {
    /// Receiver XPUB address to subscribe to.
    #[arg(long, default_value = "127.0.0.1:12000")]
    connect: String,

    /// Data sink PULL address.
    #[arg(long, default_value = "127.0.0.1:13000")]
    push_to_sink: String,

    /// CEP engine PULL address.
    #[arg(long, default_value = "127.0.0.1:14000")]
    push_to_cep: String,

    /// Path to a TOML file overriding the pipeline's default tunables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = PipelineConfig::load(cli.config.as_deref()) {
        error!("controller: failed to load pipeline config: {err}");
        return ExitCode::FAILURE;
    }

    let mut sub = SubSocket::connect(cli.connect.clone(), SUBSCRIBE_FILTER.to_string());
    let push_sink = PushSocket::connect(cli.push_to_sink.clone());
    let push_cep = PushSocket::connect(cli.push_to_cep.clone());
    let mut profiler = ThroughputProfiler::start("controller");

    info!(
        "controller: {} -> sink {} + cep {}",
        cli.connect, cli.push_to_sink, cli.push_to_cep
    );

    loop {
        tokio::select! {
            frame = sub.recv() => {
                let Some(frame) = frame else {
                    error!("controller: subscription closed");
                    return ExitCode::FAILURE;
                };
                profiler.msg_received(frame.payload.len());

                let event: Event = match serde_json::from_slice(&frame.payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("controller: dropping malformed event on {:?}: {err}", frame.routing_key);
                        continue;
                    }
                };

                let stamped = stamp_forwarded(event);
                match serde_json::to_vec(&stamped) {
                    Ok(payload) => {
                        profiler.msg_sent(payload.len() * 2);
                        push_sink.send(frame.routing_key.clone(), payload.clone()).await;
                        push_cep.send(frame.routing_key, payload).await;
                    }
                    Err(err) => warn!("controller: failed to encode event: {err}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("controller: received SIGINT, shutting down");
                return ExitCode::SUCCESS;
            }
        }
    }
}
