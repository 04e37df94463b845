//! Lifecycle for the process-wide default engine.
//!
//! The original library registers `deactivate` with the C runtime's
//! `atexit`; Rust has no safe equivalent (static destructors would need
//! `unsafe extern "C"` plumbing around a `OnceLock`, and ordering against
//! other `atexit` handlers is undefined anyway). Instead `activate`
//! returns a [`DeactivateGuard`] whose `Drop` calls `deactivate` — the
//! idiomatic stand-in used by `tracing-appender`'s `WorkerGuard` and
//! similar crates. Holding the guard in `main`'s local scope reproduces
//! "runs at process exit"; dropping it early reproduces an explicit call
//! to `deactivate`. The idempotency itself is the same guarded-flag shape
//! as `ringmpsc_stream::shutdown::ShutdownState` (an `AtomicBool`-style
//! flip), done here with `Option::take` since the engine handle is the
//! only state worth guarding.

use std::sync::{Mutex, OnceLock};

use ringlog_core::EngineOptions;
use ringlog_engine::Engine;
use ringlog_format::Formatter;
use ringlog_sink::Sink;

use std::sync::Arc;

static DEFAULT_ENGINE: OnceLock<Mutex<Option<Arc<Engine>>>> = OnceLock::new();

/// Bundles the sink and formatter the default engine writes through — the
/// two halves `Engine::start` needs, packaged as the single `output`
/// parameter the producer API names.
pub struct Output {
    pub sink: Box<dyn Sink>,
    pub format: Box<dyn Formatter>,
}

/// Dropping this guard deactivates the default engine it was returned
/// from. Keep it alive for as long as the process should keep logging.
#[must_use = "dropping this immediately deactivates the default engine"]
pub struct DeactivateGuard(());

impl Drop for DeactivateGuard {
    fn drop(&mut self) {
        deactivate();
    }
}

/// Start the process-wide default engine, replacing any previous one.
/// The previous engine (if any) is dropped first, which blocks until its
/// worker thread has joined.
pub fn activate(output: Output, options: EngineOptions) -> DeactivateGuard {
    let engine = Engine::start(options, output.sink, output.format);
    let slot = DEFAULT_ENGINE.get_or_init(|| Mutex::new(None));
    *slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(engine);
    DeactivateGuard(())
}

/// Tear down the default engine, if one is active. Idempotent: calling
/// this twice, or dropping a [`DeactivateGuard`] after an explicit call,
/// is a no-op the second time.
pub fn deactivate() {
    if let Some(slot) = DEFAULT_ENGINE.get() {
        slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
    }
}

/// Clone of the currently active default engine handle, if any.
#[must_use]
pub fn default_engine() -> Option<Arc<Engine>> {
    DEFAULT_ENGINE.get()?.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringlog_format::{RawFormatter, WireVersion};
    use ringlog_sink::NullSink;

    // Both tests below touch the process-wide `DEFAULT_ENGINE` static;
    // serialize them so one test's activate/deactivate can't race another's.
    static TEST_SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn activate_then_deactivate_clears_the_default_engine() {
        let _serial = TEST_SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let guard = activate(
            Output { sink: Box::new(NullSink::new()), format: Box::new(RawFormatter::new(WireVersion::V1_1)) },
            EngineOptions::default(),
        );
        assert!(default_engine().is_some());
        drop(guard);
        assert!(default_engine().is_none());
    }

    #[test]
    fn deactivate_without_activate_is_a_harmless_no_op() {
        let _serial = TEST_SERIAL.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        deactivate();
        deactivate();
    }
}
