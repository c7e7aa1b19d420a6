//! Status reporting and cancellation for long-running corpus operations.
//!
//! A [`StatusSetter`] bundles three callbacks supplied by the surrounding
//! runtime: one for status messages, one for progress, and one polling
//! whether the operation is still supposed to run. Any callback returning
//! `false` tells the running operation to abort; in-place operations then
//! return without committing, copy operations leave partial output the
//! caller is expected to discard.

use tracing::trace;

/// Progress changes smaller than this are dropped unless forced.
const MIN_PROGRESS_CHANGE: f32 = 0.01;

type ChangeFn<'a> = Box<dyn FnMut(&str) -> bool + 'a>;
type ProgressFn<'a> = Box<dyn FnMut(f32) -> bool + 'a>;
type RunningFn<'a> = Box<dyn Fn() -> bool + 'a>;

/// Callback trio consumed by long-running operations.
pub struct StatusSetter<'a> {
    on_change: ChangeFn<'a>,
    on_progress: ProgressFn<'a>,
    is_running: RunningFn<'a>,
    last_progress: f32,
}

impl<'a> StatusSetter<'a> {
    pub fn new(
        on_change: impl FnMut(&str) -> bool + 'a,
        on_progress: impl FnMut(f32) -> bool + 'a,
        is_running: impl Fn() -> bool + 'a,
    ) -> Self {
        Self {
            on_change: Box::new(on_change),
            on_progress: Box::new(on_progress),
            is_running: Box::new(is_running),
            last_progress: 0.,
        }
    }

    /// A setter that swallows all updates and never cancels.
    pub fn noop() -> StatusSetter<'static> {
        StatusSetter::new(|_| true, |_| true, || true)
    }

    /// Sets a new status message. Returns whether to keep running.
    pub fn change(&mut self, status: &str) -> bool {
        trace!(status);

        self.last_progress = 0.;

        (self.on_change)(status) && self.is_running()
    }

    /// Reports progress as `done` out of `total`. Small changes are
    /// dropped unless `force` is set. Returns whether to keep running.
    pub fn update(&mut self, done: usize, total: usize, force: bool) -> bool {
        if total == 0 {
            return self.is_running();
        }

        let progress = done as f32 / total as f32;

        if force || progress - self.last_progress >= MIN_PROGRESS_CHANGE {
            self.last_progress = progress;

            return (self.on_progress)(progress) && self.is_running();
        }

        self.is_running()
    }

    /// Reports completion.
    pub fn finish(&mut self) {
        (self.on_progress)(1.);

        self.last_progress = 0.;
    }

    /// Whether the operation is still supposed to run.
    pub fn is_running(&self) -> bool {
        (self.is_running)()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    #[test]
    fn messages_and_progress_are_forwarded() {
        let messages = RefCell::new(Vec::new());
        let progress = RefCell::new(Vec::new());

        {
            let mut status = StatusSetter::new(
                |msg: &str| {
                    messages.borrow_mut().push(msg.to_string());
                    true
                },
                |p| {
                    progress.borrow_mut().push(p);
                    true
                },
                || true,
            );

            assert!(status.change("Merging corpora (1/2)..."));
            assert!(status.update(1, 4, true));
            status.finish();
        }

        assert_eq!(*messages.borrow(), vec!["Merging corpora (1/2)..."]);
        assert_eq!(*progress.borrow(), vec![0.25, 1.]);
    }

    #[test]
    fn small_updates_are_throttled() {
        let calls = Cell::new(0usize);

        let mut status = StatusSetter::new(
            |_| true,
            |_| {
                calls.set(calls.get() + 1);
                true
            },
            || true,
        );

        for done in 1..=1000 {
            status.update(done, 100_000, false);
        }

        // 1% of 100,000 is 1,000, so only the very last step fires
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn cancellation_propagates() {
        let mut cancelled = StatusSetter::new(|_| true, |_| true, || false);

        assert!(!cancelled.is_running());
        assert!(!cancelled.change("working..."));
        assert!(!cancelled.update(1, 2, true));
    }
}
