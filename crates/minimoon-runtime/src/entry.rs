//! Process entry point and runtime configuration

use std::ffi::c_int;
use std::io::{self, Write};

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::runtime::Runtime;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "MINIMOON_LOG";

/// Environment variable enabling a handle statistics report at exit
pub const STATS_ENV: &str = "MINIMOON_STATS";

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Settings read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub log_filter: String,
    pub report_stats: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            report_stats: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let log_filter = lookup(LOG_ENV)
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or(defaults.log_filter);
        let report_stats = lookup(STATS_ENV)
            .map(|value| parse_flag(&value))
            .unwrap_or(defaults.report_stats);

        Self {
            log_filter,
            report_stats,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Install a stderr `tracing` subscriber. Later calls are no-ops.
pub fn init_logging(config: &RuntimeConfig) {
    let filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run a compiled program's entry routine once and return its exit status
pub fn run_entry(entry: extern "C" fn()) -> c_int {
    let config = RuntimeConfig::from_env();
    init_logging(&config);
    debug!(?config, "runtime started");

    entry();

    if let Err(err) = io::stdout().flush() {
        warn!(%err, "failed to flush stdout");
    }

    if config.report_stats {
        let stats = Runtime::global().stats();
        info!(
            allocated = stats.allocated,
            released = stats.released,
            peak = stats.peak,
            "handle statistics"
        );
        eprintln!(
            "minimoon: {} handles allocated, {} released, {} live at peak",
            stats.allocated, stats.released, stats.peak
        );
    }

    0
}

/// C `main` for linking a compiled program against this library
#[cfg(feature = "entry")]
mod process_main {
    use std::ffi::c_int;

    unsafe extern "C" {
        fn moonbit_main();
    }

    extern "C" fn call_moonbit_main() {
        unsafe { moonbit_main() }
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn main() -> c_int {
        super::run_entry(call_moonbit_main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[]));
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.log_filter, "warn");
        assert!(!config.report_stats);
    }

    #[test]
    fn test_config_from_vars() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            (LOG_ENV, "minimoon_runtime=trace"),
            (STATS_ENV, "True"),
        ]));
        assert_eq!(config.log_filter, "minimoon_runtime=trace");
        assert!(config.report_stats);
    }

    #[test]
    fn test_config_ignores_blank_filter() {
        let config = RuntimeConfig::from_lookup(lookup(&[(LOG_ENV, "  "), (STATS_ENV, "0")]));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(!config.report_stats);
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn counting_entry() {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_run_entry_invokes_once() {
        assert_eq!(run_entry(counting_entry), 0);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
