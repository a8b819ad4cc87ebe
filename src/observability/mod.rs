pub mod console;
pub mod log;
pub mod traits;

pub use self::console::ConsoleObserver;
pub use self::log::LogObserver;
pub use traits::{Observer, ObserverEvent};

use crate::config::ObservabilityConfig;

/// Drops every event.
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn record_event(&self, _event: &ObserverEvent) {}

    fn name(&self) -> &str {
        "noop"
    }
}

/// Fans each event out to several observers.
pub struct MultiObserver {
    observers: Vec<Box<dyn Observer>>,
}

impl MultiObserver {
    pub fn new(observers: Vec<Box<dyn Observer>>) -> Self {
        Self { observers }
    }
}

impl Observer for MultiObserver {
    fn record_event(&self, event: &ObserverEvent) {
        for observer in &self.observers {
            observer.record_event(event);
        }
    }

    fn flush(&self) {
        for observer in &self.observers {
            observer.flush();
        }
    }

    fn name(&self) -> &str {
        "multi"
    }
}

/// Build the observer named by `[observability].backend`.
///
/// A comma-separated list (e.g. `console,log`) fans out to each backend.
pub fn create_observer(config: &ObservabilityConfig) -> Box<dyn Observer> {
    let mut observers: Vec<Box<dyn Observer>> = config
        .backend
        .split(',')
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .map(|name| backend(&name))
        .collect();
    match observers.len() {
        0 => Box::new(ConsoleObserver::new()),
        1 => observers.remove(0),
        _ => Box::new(MultiObserver::new(observers)),
    }
}

fn backend(name: &str) -> Box<dyn Observer> {
    match name {
        "console" => Box::new(ConsoleObserver::new()),
        "log" => Box::new(LogObserver),
        "none" | "noop" => Box::new(NoopObserver),
        other => {
            tracing::warn!(backend = other, "Unknown observability backend, using console");
            Box::new(ConsoleObserver::new())
        }
    }
}
