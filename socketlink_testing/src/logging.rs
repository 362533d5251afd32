use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use logtest::Logger;
use rstest::fixture;

/// Handle to the global logger with exclusive access.
///
/// This guard ensures tests do not interfere with each other's log capture by
/// serialising access to a [`logtest::Logger`].
pub struct LoggerHandle {
    guard: MutexGuard<'static, Logger>,
}

impl LoggerHandle {
    /// Acquire the global [`Logger`] instance.
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let guard = logger.lock().unwrap_or_else(PoisonError::into_inner);

        Self { guard }
    }

    /// Discard every captured record.
    pub fn clear(&mut self) { while self.guard.pop().is_some() {} }

    /// Drain captured records, returning the messages that contain `needle`.
    pub fn drain_matching(&mut self, needle: &str) -> Vec<(log::Level, String)> {
        let mut found = Vec::new();
        while let Some(record) = self.guard.pop() {
            let message = record.args().to_string();
            if message.contains(needle) {
                found.push((record.level(), message));
            }
        }
        found
    }
}

impl Default for LoggerHandle {
    fn default() -> Self { Self::new() }
}

impl std::ops::Deref for LoggerHandle {
    type Target = Logger;

    fn deref(&self) -> &Self::Target { &self.guard }
}

impl std::ops::DerefMut for LoggerHandle {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.guard }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }
