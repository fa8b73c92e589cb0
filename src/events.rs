//! Cross-system notifications.
//!
//! Publishers (collision handling, resource drain) push typed notifications
//! to an explicit list of registered listeners; they never know who is
//! subscribed. This replaces ambient global dispatch with a service owned by
//! the simulation session.

/// Implement what you care about; everything defaults to a no-op.
pub trait SimObserver: Send {
    fn on_damage(&mut self, _id: &str, _amount: f32, _hp_left: f32) {}
    fn on_gas_change(&mut self, _id: &str, _gas: f32) {}
    fn on_gas_empty(&mut self, _id: &str) {}
    fn on_destroyed(&mut self, _id: &str) {}
}

#[derive(Default)]
pub struct Observers {
    listeners: Vec<Box<dyn SimObserver>>,
}

impl Observers {
    pub fn register(&mut self, listener: Box<dyn SimObserver>) {
        self.listeners.push(listener);
    }

    pub fn damage(&mut self, id: &str, amount: f32, hp_left: f32) {
        for l in self.listeners.iter_mut() {
            l.on_damage(id, amount, hp_left);
        }
    }

    pub fn gas_change(&mut self, id: &str, gas: f32) {
        for l in self.listeners.iter_mut() {
            l.on_gas_change(id, gas);
        }
    }

    pub fn gas_empty(&mut self, id: &str) {
        for l in self.listeners.iter_mut() {
            l.on_gas_empty(id);
        }
    }

    pub fn destroyed(&mut self, id: &str) {
        for l in self.listeners.iter_mut() {
            l.on_destroyed(id);
        }
    }
}

/// Default listener: structured log lines for game-state changes.
pub struct LogObserver;

impl SimObserver for LogObserver {
    fn on_damage(&mut self, id: &str, amount: f32, hp_left: f32) {
        log::info!("{id} took {amount:.0} damage, {hp_left:.0} hp left");
    }

    fn on_gas_empty(&mut self, id: &str) {
        log::info!("{id} ran out of gas");
    }

    fn on_destroyed(&mut self, id: &str) {
        log::info!("{id} destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl SimObserver for Recorder {
        fn on_damage(&mut self, id: &str, amount: f32, _hp_left: f32) {
            self.0.lock().unwrap().push(format!("{id}:{amount}"));
        }
        fn on_destroyed(&mut self, id: &str) {
            self.0.lock().unwrap().push(format!("{id}:destroyed"));
        }
    }

    #[test]
    fn all_registered_listeners_are_notified() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::default();
        observers.register(Box::new(Recorder(Arc::clone(&seen))));
        observers.register(Box::new(Recorder(Arc::clone(&seen))));

        observers.damage("chaser-1", 10.0, 90.0);
        observers.destroyed("chaser-1");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], "chaser-1:10");
        assert_eq!(seen[3], "chaser-1:destroyed");
    }
}
