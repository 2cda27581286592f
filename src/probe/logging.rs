use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured diagnostic logging on standard error.
///
/// Standard output and standard input usually carry the frame stream, so
/// nothing diagnostic may go there. `RUST_LOG` overrides `level` when set:
/// - `RUST_LOG=debug` - one event per frame
/// - `RUST_LOG=pipestamp=trace` - codec and byte-level detail
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_line_number(true)
                    .with_file(true),
            )
            .init();
    }
}
