// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logger initialisation and RAII log-level overrides.

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::sync::{Mutex, PoisonError};

/// Installs the process logger, filtered by `RUST_LOG` and falling back to
/// `default_filter` (e.g. `"info"`).
///
/// Calling this more than once is harmless: only the first call installs a
/// logger.
pub fn init_logging(default_filter: &str) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        log::debug!("Logger initialized with default filter '{default_filter}'.");
    }
}

struct OverrideState {
    depth: usize,
    restore: LevelFilter,
}

static OVERRIDE_STATE: Mutex<OverrideState> = Mutex::new(OverrideState {
    depth: 0,
    restore: LevelFilter::Trace,
});

/// Lowers the global log level for the lifetime of the guard.
///
/// Guards are depth-counted: the level in effect when the first guard was
/// created is restored when the last outstanding guard is dropped, in any
/// drop order. This lets overlapping probes from interleaved tasks share the
/// override without restoring a stale level.
///
/// The level is restored on every exit path, including early returns, `?`
/// propagation, and unwinding.
#[must_use = "the override is lifted as soon as the guard is dropped"]
pub struct ScopedLogLevel {
    _private: (),
}

impl ScopedLogLevel {
    /// Caps the global log level at `level` until the guard is dropped.
    /// Never raises the level.
    pub fn enter(level: LevelFilter) -> Self {
        let mut state = OVERRIDE_STATE.lock().unwrap_or_else(PoisonError::into_inner);
        if state.depth == 0 {
            state.restore = log::max_level();
        }
        state.depth += 1;

        if level < log::max_level() {
            log::set_max_level(level);
        }

        Self { _private: () }
    }

    /// Silences everything below errors, for calls that are expected to log
    /// noise on a miss.
    pub fn quiet() -> Self {
        Self::enter(LevelFilter::Error)
    }
}

impl Drop for ScopedLogLevel {
    fn drop(&mut self) {
        let mut state = OVERRIDE_STATE.lock().unwrap_or_else(PoisonError::into_inner);
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            log::set_max_level(state.restore);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The log level is process-wide, so every scenario lives in one test to
    // keep them from racing each other.
    #[test]
    fn test_scoped_log_level_restores_on_every_path() {
        log::set_max_level(LevelFilter::Debug);

        {
            let _quiet = ScopedLogLevel::quiet();
            assert_eq!(log::max_level(), LevelFilter::Error);
        }
        assert_eq!(log::max_level(), LevelFilter::Debug);

        // Overlapping guards dropped out of order.
        let outer = ScopedLogLevel::enter(LevelFilter::Warn);
        let inner = ScopedLogLevel::enter(LevelFilter::Error);
        assert_eq!(log::max_level(), LevelFilter::Error);
        drop(outer);
        assert_eq!(log::max_level(), LevelFilter::Error);
        drop(inner);
        assert_eq!(log::max_level(), LevelFilter::Debug);

        // Early return through `?`.
        fn failing_probe() -> Result<(), String> {
            let _quiet = ScopedLogLevel::quiet();
            let probe: Result<(), String> = Err("miss".to_string());
            probe?;
            Ok(())
        }
        assert!(failing_probe().is_err());
        assert_eq!(log::max_level(), LevelFilter::Debug);

        // Unwinding.
        let unwound = std::panic::catch_unwind(|| {
            let _quiet = ScopedLogLevel::quiet();
            panic!("probe blew up");
        });
        assert!(unwound.is_err());
        assert_eq!(log::max_level(), LevelFilter::Debug);

        // Never raises the level.
        log::set_max_level(LevelFilter::Off);
        {
            let _quiet = ScopedLogLevel::enter(LevelFilter::Trace);
            assert_eq!(log::max_level(), LevelFilter::Off);
        }
        assert_eq!(log::max_level(), LevelFilter::Off);
    }
}
