//! CEP engine (§4.6): the analytical heart of the pipeline. Classifies each
//! incoming event's speed against its sensor's rolling history and, per the
//! per-action notify-id whitelist, publishes toward the data sink and/or
//! the aggregator.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use traffic_cep::cep::CepEngine;
use traffic_cep::config::PipelineConfig;
use traffic_cep::model::Event;
use traffic_cep::notification::ActionWhitelist;
use traffic_cep::profiler::ThroughputProfiler;
use traffic_cep::transport::{PullSocket, PushSocket, XPubSocket};

/// Literal routing key carrying aggregation-eligible events out of the CEP
/// engine toward the aggregator (§4.6).
const AGG_ROUTING_KEY: &str = "agg";

#[derive(Parser, Debug)]
struct Cli {
    /// Address to bind the inbound PULL socket on.
    #[arg(long, default_value = "0.0.0.0:14000")]
    bind_pull: String,

    /// Data sink PULL address.
    #[arg(long, default_value = "127.0.0.1:13000")]
    push_to_sink: String,

    /// Address to bind the outgoing XPUB socket on (carries `"agg"`).
    #[arg(long, default_value = "0.0.0.0:15000")]
    bind_xpub: String,

    /// Path to a TOML file overriding the pipeline's default tunables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut pull = match PullSocket::bind(&cli.bind_pull).await {
        Ok(socket) => socket,
        Err(err) => {
            error!("cep_engine: failed to bind PULL on {}: {err}", cli.bind_pull);
            return ExitCode::FAILURE;
        }
    };
    let push_sink = PushSocket::connect(cli.push_to_sink.clone());
    let xpub_agg = match XPubSocket::bind(&cli.bind_xpub).await {
        Ok(socket) => socket,
        Err(err) => {
            error!("cep_engine: failed to bind XPUB on {}: {err}", cli.bind_xpub);
            return ExitCode::FAILURE;
        }
    };

    let config = match PipelineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("cep_engine: failed to load pipeline config: {err}");
            return ExitCode::FAILURE;
        }
    };

    let engine = CepEngine::with_config(ActionWhitelist::from_config(&config), &config);
    let mut profiler = ThroughputProfiler::start("cep_engine");

    info!(
        "cep_engine: {} -> sink {} + agg {}",
        cli.bind_pull, cli.push_to_sink, cli.bind_xpub
    );

    loop {
        tokio::select! {
            frame = pull.recv() => {
                let Some(frame) = frame else {
                    info!("cep_engine: inbound PULL socket closed");
                    return ExitCode::SUCCESS;
                };
                profiler.msg_received(frame.payload.len());

                let event: Event = match serde_json::from_slice(&frame.payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("cep_engine: dropping malformed event on {:?}: {err}", frame.routing_key);
                        continue;
                    }
                };

                for dispatch in engine.process(event) {
                    let level = dispatch.event.notification.expect("classify always attaches a notification").level;
                    let payload = match serde_json::to_vec(&dispatch.event) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!("cep_engine: failed to encode classified event: {err}");
                            continue;
                        }
                    };

                    if dispatch.send_event {
                        profiler.msg_sent(payload.len());
                        push_sink.send(level.routing_key(), payload.clone()).await;
                    }
                    if dispatch.cep_agg {
                        profiler.msg_sent(payload.len());
                        xpub_agg.publish(AGG_ROUTING_KEY, &payload).await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("cep_engine: received SIGINT, shutting down");
                return ExitCode::SUCCESS;
            }
        }
    }
}
