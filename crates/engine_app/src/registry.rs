//! Update callback registry.
//!
//! The registry holds the per-tick system callbacks in registration order.
//! That order is the execution order: later callbacks observe every write
//! made by earlier ones within the same tick.

use std::time::Instant;

use tracing::debug;

use crate::sim::SimState;

/// A per-tick system callback.
pub type Callback = Box<dyn FnMut(&mut SimState) + Send>;

struct Entry {
    name: &'static str,
    callback: Callback,
}

/// Ordered list of named tick callbacks.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: Vec<Entry>,
}

impl CallbackRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback. It runs after every callback registered before it.
    pub fn register<F>(&mut self, name: &'static str, callback: F)
    where
        F: FnMut(&mut SimState) + Send + 'static,
    {
        self.entries.push(Entry {
            name,
            callback: Box::new(callback),
        });
    }

    /// Callback names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every callback once, in order.
    ///
    /// A panicking callback is not caught: the simulation would otherwise
    /// continue from a partially applied tick.
    pub fn run_all(&mut self, sim: &mut SimState) {
        for entry in &mut self.entries {
            let start = Instant::now();
            (entry.callback)(sim);
            debug!(
                tick = sim.tick,
                system = entry.name,
                elapsed_us = start.elapsed().as_micros() as u64,
                "system ran"
            );
        }
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn test_runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        for name in ["movement", "collision", "health"] {
            let log = Arc::clone(&log);
            registry.register(name, move |_| log.lock().unwrap().push(name));
        }
        let mut sim = SimState::new(SimConfig::default());
        registry.run_all(&mut sim);
        registry.run_all(&mut sim);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["movement", "collision", "health", "movement", "collision", "health"]
        );
    }

    #[test]
    fn test_later_callbacks_see_earlier_writes() {
        let mut registry = CallbackRegistry::new();
        registry.register("spawn", |sim| {
            sim.world.create_entity();
        });
        let seen = Arc::new(Mutex::new(0));
        let seen_in = Arc::clone(&seen);
        registry.register("count", move |sim| {
            *seen_in.lock().unwrap() = sim.world.entity_count();
        });
        let mut sim = SimState::new(SimConfig::default());
        registry.run_all(&mut sim);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_names() {
        let mut registry = CallbackRegistry::new();
        registry.register("a", |_| {});
        registry.register("b", |_| {});
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.len(), 2);
    }
}
