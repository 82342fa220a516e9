//! ITM logger.
//!
//! Implements the `log::Log` trait to route records to ITM stimulus port 0,
//! readable over SWO. Records are written inside a critical section
//! so lines from Thread mode and exceptions never interleave.

use cortex_m::peripheral::{itm, ITM};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// Global logger instance
static LOGGER: ItmLogger = ItmLogger;

struct ItmLogger;

impl log::Log for ItmLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        cortex_m::interrupt::free(|_cs| {
            // SAFETY: stimulus port 0 is only written here, with interrupts
            // masked, so there is no concurrent access.
            let stim = unsafe { &mut (*(ITM::PTR as *mut itm::RegisterBlock)).stim[0] };
            cortex_m::iprintln!(stim, "[{}] {}", record.level(), record.args());
        });
    }

    fn flush(&self) {}
}

/// Install the ITM logger.
///
/// # Arguments
/// * `max_level` - The most verbose level that is emitted.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}
