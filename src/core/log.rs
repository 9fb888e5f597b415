//! Tracing subscriber setup
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const APP_TARGETS: [&str; 2] = ["tricount_report", "tricount"];

/// Filter directives used when `RUST_LOG` is not set.
///
/// Warnings from every crate are shown; `verbose` adds debug output from
/// this crate only, so HTTP internals stay quiet.
fn default_directives(verbose: bool) -> String {
    let mut directives = vec!["warn".to_string()];
    if verbose {
        directives.extend(APP_TARGETS.iter().map(|target| format!("{target}=debug")));
    }
    directives.join(",")
}

/// Installs the global subscriber. `RUST_LOG` replaces the default filter.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_target(verbose))
        .with(filter)
        .init();
}
