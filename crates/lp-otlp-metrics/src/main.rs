use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use lp_otlp_metrics::{Converter, Error, Point, PointWriter};
use opentelemetry_proto::tonic::collector::metrics::v1::{
    metrics_service_client::MetricsServiceClient, ExportMetricsServiceRequest,
};
use tracing_subscriber::EnvFilter;

/// Converts metrics between line-protocol points and OTLP.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reads JSON points (one per line) and converts them to an OTLP export request.
    Ingest {
        #[command(flatten)]
        common: CommonArgs,

        /// Send the request to this OTLP/gRPC endpoint instead of printing it.
        #[arg(short, long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
        otlp_endpoint: Option<String>,
    },
    /// Reads an OTLP export request as JSON and prints one JSON point per line.
    Export {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Line-protocol schema: telegraf-prometheus-v1 or telegraf-prometheus-v2.
    #[arg(
        short,
        long,
        env = "LP_OTLP_SCHEMA",
        default_value = "telegraf-prometheus-v1"
    )]
    schema: String,

    /// Input file; standard input when absent.
    #[arg(short, long)]
    input: Option<PathBuf>,
}

impl CommonArgs {
    fn converter(&self) -> Result<Converter, Error> {
        Converter::from_schema_name(&self.schema)
    }

    fn open(&self) -> Result<Box<dyn BufRead>, Error> {
        Ok(match &self.input {
            Some(path) => Box::new(BufReader::new(File::open(path)?)),
            None => Box::new(BufReader::new(io::stdin())),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let args = Args::try_parse()?;
    let stdout = io::stdout();
    run(args.command, &mut stdout.lock()).await
}

async fn run(command: Command, out: &mut impl Write) -> Result<(), Error> {
    match command {
        Command::Ingest {
            common,
            otlp_endpoint,
        } => {
            let converter = common.converter()?;
            let (request, dropped) = read_batch(&converter, common.open()?)?;
            tracing::info!(
                resources = request.resource_metrics.len(),
                dropped,
                "converted points"
            );
            match otlp_endpoint {
                Some(endpoint) => {
                    let mut client = MetricsServiceClient::connect(endpoint).await?;
                    client.export(request).await?;
                }
                None => {
                    serde_json::to_writer(&mut *out, &request)?;
                    writeln!(out)?;
                }
            }
        }
        Command::Export { common } => {
            let converter = common.converter()?;
            let request: ExportMetricsServiceRequest = serde_json::from_reader(common.open()?)?;
            let mut writer = JsonLinesWriter { out };
            let stats = converter.write_metrics(&request.resource_metrics, &mut writer)?;
            tracing::info!(
                points = stats.points_written,
                dropped = stats.metrics_dropped,
                "exported metrics"
            );
        }
    }
    Ok(())
}

/// Converts every point of the input into one batch.
///
/// Returns the request and the number of lines that were dropped.
fn read_batch(
    converter: &Converter,
    input: impl BufRead,
) -> Result<(ExportMetricsServiceRequest, usize), Error> {
    let mut batch = converter.new_batch();
    let mut dropped = 0;
    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = serde_json::from_str::<Point>(&line)
            .map_err(Error::from)
            .and_then(|point| batch.add_point(point));
        if let Err(e) = result {
            tracing::warn!(line = idx + 1, error = %e, "dropping point");
            dropped += 1;
        }
    }
    Ok((batch.into_request(), dropped))
}

struct JsonLinesWriter<'a, W: Write> {
    out: &'a mut W,
}

impl<W: Write> PointWriter for JsonLinesWriter<'_, W> {
    fn write_point(&mut self, point: Point) -> Result<(), Error> {
        serde_json::to_writer(&mut *self.out, &point)?;
        writeln!(self.out)?;
        Ok(())
    }
}
