use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use pipestamp::filter::Endpoint;
use pipestamp::probe::{init_logging, Config, LogSink, Logger, Mode, Probe, Statistics};
use tracing::{error, info};

fn main() {
    // Parse failures exit with clap's usage code and usage text on stderr
    let config = Config::parse();

    init_logging(&config.log_level, config.is_json_format());

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        report_error(&e.to_string());
        std::process::exit(1);
    }

    if let Err(e) = run(config) {
        error!(error = %e, "Probe failed");
        report_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn report_error(msg: &str) {
    eprintln!("[{}]\n{}\n", "Error".blue(), msg);
}

fn run(config: Config) -> Result<()> {
    let encoding = config.encoding()?;
    info!(
        mode = %config.mode(),
        count = config.count,
        block = config.block,
        encoding = %encoding,
        "Starting probe"
    );

    match config.mode() {
        Mode::Send => {
            let mut probe = Probe::sender(config.block, encoding)?;
            probe
                .send(config.count, Endpoint::stdout())?
                .ensure_complete()?;
        }
        Mode::Receive => {
            let path = config
                .log
                .as_ref()
                .context("receiver record log is not configured")?;
            let sink = LogSink::open(path)
                .with_context(|| format!("Failed to open record log {}", path.display()))?;
            let logger = Logger::new(sink, config.record_format()?);

            let mut probe = Probe::receiver(config.block, encoding, logger)?;
            let exchange = probe.recv(config.count, Endpoint::stdin())?;
            if config.summary {
                print_summary(probe.statistics());
            }
            exchange.ensure_complete()?;
        }
    }
    Ok(())
}

/// Colored report on stderr, mirrored as one structured event for log consumers.
fn print_summary(stats: &Statistics) {
    let ms = |ns: u64| ns as f64 / 1_000_000.0;

    info!(
        frames = stats.count(),
        negative = stats.negative_count(),
        clamped = stats.clamped_count(),
        min_ns = stats.min(),
        mean_ns = stats.mean(),
        p50_ns = stats.percentile(0.50),
        p99_ns = stats.percentile(0.99),
        max_ns = stats.max(),
        "Latency summary"
    );

    eprintln!("{}", "Latency summary".bold());
    eprintln!("  frames   : {}", stats.count());
    if stats.negative_count() > 0 {
        eprintln!(
            "  {} : {} (clocks disagree)",
            "negative".yellow(),
            stats.negative_count()
        );
    }
    if stats.count() > 0 {
        eprintln!("  min      : {:.3} ms", ms(stats.min()));
        eprintln!("  mean     : {:.3} ms", stats.mean() / 1_000_000.0);
        eprintln!("  p50      : {:.3} ms", ms(stats.percentile(0.50)));
        eprintln!("  p99      : {:.3} ms", ms(stats.percentile(0.99)));
        eprintln!("  max      : {:.3} ms", ms(stats.max()));
    }
}
