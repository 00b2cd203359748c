use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::teardown::Teardown;

/// Cooperative, single-threaded task source.
///
/// Every returned [`Teardown`] cancels the timer it guards. Cancelling a timer
/// that already fired is a no-op.
pub trait Scheduler {
    fn timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> Teardown;

    fn interval(&self, period: Duration, task: Box<dyn FnMut()>) -> Teardown;

    /// Runs `task` before the next repaint.
    fn animation_frame(&self, task: Box<dyn FnOnce()>) -> Teardown;

    /// Drives a future to completion on the UI thread.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

pub(crate) fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}
