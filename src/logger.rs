// A small stderr logger for the `log` crate. Messages from dependencies are
// dropped, and debug messages are tagged with the module they came from so
// that compiled SQL can be traced back to the search that produced it.

use log::{self, Level, Log, Metadata, Record};

use crate::Result;

/// Initialize the logger as the global logger.
pub fn init() -> Result<()> {
    log::set_logger(LOGGER)?;
    Ok(())
}

/// A logger that writes to stderr.
///
/// Level filtering is left to the `log` crate's global max level. This
/// logger only filters by target.
#[derive(Debug)]
struct Logger {
    targets: &'static [&'static str],
}

const LOGGER: &Logger = &Logger { targets: &["imdb_query", "imdb_search"] };

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let target = metadata.target();
        self.targets.iter().any(|t| target.starts_with(t))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Debug | Level::Trace => eprintln!(
                "{}[{}]: {}",
                record.level(),
                record.module_path().unwrap_or_else(|| record.target()),
                record.args()
            ),
            level => eprintln!("{}: {}", level, record.args()),
        }
    }

    fn flush(&self) {}
}
