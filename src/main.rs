//! Replay a recorded unit trace through the reassembly engine.
//!
//! Prints one line per closed transfer and per anomaly.

mod cli;

use std::{error::Error, fs};

use clap::Parser;
use faxframe::{
    EngineConfig,
    engine::{Engine, UnitReport},
    trace::{self, TraceRecord},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn render(report: &UnitReport, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if verbose || !report.completed.is_empty() || report.anomalies().next().is_some() {
        lines.push(format!("{:>6}  {}  {}", report.unit, report.endpoints, report.info()));
    }
    for transfer in &report.completed {
        let mut line = format!(
            "        transfer {} {} {} bytes from unit {}",
            transfer.transfer_id,
            transfer.direction,
            transfer.payload.len(),
            transfer.first_unit
        );
        if let Some(summary) = transfer.loss_summary() {
            line.push_str(", ");
            line.push_str(&summary);
        }
        lines.push(line);
    }
    lines
}

fn run_pass(engine: &mut Engine, records: &[TraceRecord], verbose: bool) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| trace::feed(engine, record))
        .flat_map(|report| render(&report, verbose))
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    let records = trace::read_trace(&fs::read(&cli.trace)?)?;
    info!(
        "trace loaded: path={}, records={}",
        cli.trace.display(),
        records.len()
    );

    let config = EngineConfig::default()
        .with_max_fragment_len(cli.max_fragment_len)
        .with_history(!cli.no_history);
    let mut engine = Engine::new(config);
    let mut output = Vec::new();
    for pass in 1..=cli.passes.max(1) {
        let lines = run_pass(&mut engine, &records, cli.verbose);
        if pass > 1 && lines != output {
            return Err(format!("pass {pass} diverged from pass {}", pass - 1).into());
        }
        debug!("pass finished: pass={pass}, lines={}", lines.len());
        output = lines;
    }

    for line in output {
        println!("{line}");
    }
    if engine.open_transfers() > 0 {
        info!("trace ended with open transfers: count={}", engine.open_transfers());
    }
    Ok(())
}
