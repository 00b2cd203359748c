use std::fmt;

/// Paired cleanup for a listener, timer or frame request.
///
/// Runs its cleanup exactly once: either through [`Teardown::run`] or when
/// dropped. Every setup in this crate hands one of these back to its caller.
#[must_use = "dropping a Teardown immediately cancels what it guards"]
pub struct Teardown {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl Teardown {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    pub fn noop() -> Self {
        Self { cleanup: None }
    }

    /// Merges several teardowns into one that runs them in order.
    pub fn all(parts: Vec<Teardown>) -> Self {
        Self::new(move || {
            for part in parts {
                part.run();
            }
        })
    }

    pub fn run(mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("armed", &self.cleanup.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting() -> (Rc<Cell<u32>>, Teardown) {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        (count, Teardown::new(move || counter.set(counter.get() + 1)))
    }

    #[test]
    fn runs_once_when_run_explicitly() {
        let (count, teardown) = counting();
        teardown.run();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn runs_on_drop() {
        let (count, teardown) = counting();
        drop(teardown);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn all_runs_every_part() {
        let (first, a) = counting();
        let (second, b) = counting();
        Teardown::all(vec![a, b, Teardown::noop()]).run();
        assert_eq!((first.get(), second.get()), (1, 1));
    }
}
