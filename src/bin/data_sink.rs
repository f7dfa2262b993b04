//! Data sink (§4.8): binds a PULL socket and appends one CSV row per
//! received event. This is the pipeline's canonical, user-visible output
//! (§7); on SIGINT the CSV writer is flushed and closed and the process
//! exits 0.

use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use traffic_cep::config::PipelineConfig;
use traffic_cep::model::Event;
use traffic_cep::profiler::ThroughputProfiler;
use traffic_cep::sink::DataSink;
use traffic_cep::transport::PullSocket;

#[derive(Parser, Debug)]
struct Cli {
    /// Address to bind the inbound PULL socket on.
    #[arg(long, default_value = "0.0.0.0:13000")]
    bind: String,

    /// Path of the CSV file to write.
    #[arg(long, default_value = "traffic_events.csv")]
    output_file_path: String,

    /// Path to a TOML file overriding the pipeline's default tunables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = PipelineConfig::load(cli.config.as_deref()) {
        error!("data_sink: failed to load pipeline config: {err}");
        return ExitCode::FAILURE;
    }

    let mut pull = match PullSocket::bind(&cli.bind).await {
        Ok(socket) => socket,
        Err(err) => {
            error!("data_sink: failed to bind PULL on {}: {err}", cli.bind);
            return ExitCode::FAILURE;
        }
    };
    let mut sink = match DataSink::create(&cli.output_file_path) {
        Ok(sink) => sink,
        Err(err) => {
            error!("data_sink: failed to open {}: {err}", cli.output_file_path);
            return ExitCode::FAILURE;
        }
    };
    let mut profiler = ThroughputProfiler::start("data_sink");

    info!("data_sink: {} -> {}", cli.bind, cli.output_file_path);

    loop {
        tokio::select! {
            frame = pull.recv() => {
                let Some(frame) = frame else {
                    info!("data_sink: inbound PULL socket closed");
                    return ExitCode::SUCCESS;
                };
                profiler.msg_received(frame.payload.len());

                let mut event: Event = match serde_json::from_slice(&frame.payload) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("data_sink: dropping malformed event on {:?}: {err}", frame.routing_key);
                        continue;
                    }
                };

                if let Err(err) = sink.write_event(&frame.routing_key, &mut event) {
                    error!("data_sink: failed to write row: {err}");
                    return ExitCode::FAILURE;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("data_sink: received SIGINT, closing {}", cli.output_file_path);
                return ExitCode::SUCCESS;
            }
        }
    }
}
