use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize logging to stderr at `level`, as JSON when `json` is set.
///
/// `SYNCCRAFT_LOG` overrides the level (e.g. `SYNCCRAFT_LOG=synccraft=debug`).
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init(level: LevelFilter, json: bool) {
    let filter = EnvFilter::builder()
        .with_env_var("SYNCCRAFT_LOG")
        .with_default_directive(level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

/// Level implied by the CLI verbosity flags. `debug` wins over `verbose`.
pub fn level_for(verbose: bool, debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::DEBUG
    } else if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}
