//! Receiver (§4.4): fans in from every sensor process over a single PULL
//! socket and republishes each frame unchanged on an XPUB fan-out, after
//! stamping `receiver_ts`. No filtering by routing key.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use traffic_cep::config::PipelineConfig;
use traffic_cep::model::Event;
use traffic_cep::profiler::ThroughputProfiler;
use traffic_cep::receiver::stamp_received;
use traffic_cep::transport::{PullSocket, XPubSocket};

#[derive(Parser, Debug)]
struct Cli {
    /// Address to bind the inbound PULL socket on.
    #[arg(long, default_value = "0.0.0.0:11000")]
    bind_pull: String,

    /// Address to bind the outgoing XPUB socket on.
    #[arg(long, default_value = "0.0.0.0:12000")]
    bind_xpub: String,

    /// Path to a TOML file overriding the pipeline's default tunables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = PipelineConfig::load(cli.config.as_deref()) {
        error!("receiver: failed to load pipeline config: {err}");
        return ExitCode::FAILURE;
    }

    let mut pull = match PullSocket::bind(&cli.bind_pull).await {
        Ok(socket) => socket,
        Err(err) => {
            error!("receiver: failed to bind PULL on {}: {err}", cli.bind_pull);
            return ExitCode::FAILURE;
        }
    };
    let xpub = match XPubSocket::bind(&cli.bind_xpub).await {
        Ok(socket) => socket,
        Err(err) => {
            error!("receiver: failed to bind XPUB on {}: {err}", cli.bind_xpub);
            return ExitCode::FAILURE;
        }
    };
    let mut profiler = ThroughputProfiler::start("receiver");

    info!("receiver: {} -> {}", cli.bind_pull, cli.bind_xpub);

    loop {
        tokio::select! {
            frame = pull.recv() => {
                let Some(frame) = frame else {
                    info!("receiver: inbound PULL socket closed");
                    return ExitCode::SUCCESS;
                };
                profiler.msg_received(frame.payload.len());

                let event: Event = match serde_json::from_slice(&frame.payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("receiver: dropping malformed event on {:?}: {err}", frame.routing_key);
                        continue;
                    }
                };

                let stamped = stamp_received(event);
                match serde_json::to_vec(&stamped) {
                    Ok(payload) => {
                        profiler.msg_sent(payload.len());
                        xpub.publish(&frame.routing_key, &payload).await;
                    }
                    Err(err) => warn!("receiver: failed to encode event: {err}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("receiver: received SIGINT, shutting down");
                return ExitCode::SUCCESS;
            }
        }
    }
}
