//! Trace-driven event generator (§4.2). Reads a CSV traffic trace and
//! publishes synthetic events on an XPUB bus, keyed by `str(sensor_id)` so
//! a per-sensor subscriber only ever sees its own readings.

use std::fs::File;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use traffic_cep::config::PipelineConfig;
use traffic_cep::generator::{expand_row, TraceRow};
use traffic_cep::profiler::ThroughputProfiler;
use traffic_cep::transport::XPubSocket;

/// Generator: reads a trace CSV and republishes it as a live event stream.
#[derive(Parser, Debug)]
struct Cli {
    /// Path to the trace CSV to read.
    #[arg(long)]
    input_file_path: String,

    /// Address to bind the outgoing XPUB socket on.
    #[arg(long, default_value = "0.0.0.0:10000")]
    bind: String,

    /// Path to a TOML file overriding the pipeline's default tunables.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = PipelineConfig::load(cli.config.as_deref()) {
        error!("generator: failed to load pipeline config: {err}");
        return ExitCode::FAILURE;
    }

    let xpub = match XPubSocket::bind(&cli.bind).await {
        Ok(socket) => socket,
        Err(err) => {
            error!("generator: failed to bind {}: {err}", cli.bind);
            return ExitCode::FAILURE;
        }
    };

    let file = match File::open(&cli.input_file_path) {
        Ok(file) => file,
        Err(err) => {
            error!("generator: failed to open {}: {err}", cli.input_file_path);
            return ExitCode::FAILURE;
        }
    };

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut rng = rand::rng();
    let mut next_event_id: u64 = 0;
    let mut profiler = ThroughputProfiler::start("generator");

    info!("generator: reading {} and publishing on {}", cli.input_file_path, cli.bind);

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                error!("generator: malformed CSV row: {err}");
                return ExitCode::FAILURE;
            }
        };

        let row = match TraceRow::parse(&record) {
            Ok(row) => row,
            Err(err) => {
                error!("generator: malformed trace row: {err}");
                return ExitCode::FAILURE;
            }
        };

        for event in expand_row(&row, &mut next_event_id, &mut rng) {
            let routing_key = event.sensor_id.to_string();
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("generator: failed to encode event: {err}");
                    continue;
                }
            };
            profiler.msg_sent(payload.len());
            xpub.publish(&routing_key, &payload).await;
        }
    }

    info!("generator: finished reading trace, {next_event_id} events emitted");
    ExitCode::SUCCESS
}
