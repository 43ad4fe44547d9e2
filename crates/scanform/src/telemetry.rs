//! Process-wide logging setup.
//!
//! Library code logs through `tracing` (pipeline, OCR) and the `log` facade
//! (database, worker pool). `init_logging` installs a single subscriber and
//! bridges `log` records into it.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

const DEFAULT_FILTER: &str = "scanform=info,scanform_cli=info";

static INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Later calls are no-ops.
pub fn init_logging(format: LogFormat) {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match format {
            LogFormat::Pretty => tracing::subscriber::set_global_default(
                registry.with(fmt::layer().with_target(true)),
            ),
            LogFormat::Json => tracing::subscriber::set_global_default(
                registry.with(fmt::layer().json().with_current_span(true)),
            ),
        };

        match installed {
            // Route `log` records from the db and worker modules into tracing.
            Ok(()) => {
                let _ = tracing_log::LogTracer::init();
            }
            Err(e) => eprintln!("scanform: logging already initialized: {}", e),
        }
    });
}
