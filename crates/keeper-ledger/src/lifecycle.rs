//! Named-state register for strategy code.
//!
//! Holds a state name and a counter of ticks spent in it. Any name may follow
//! any other; the transition table belongs to the strategy.

/// State every bot starts in.
pub const INITIAL_STATE: &str = "waiting";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    name: String,
    counter: u32,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            name: INITIAL_STATE.to_string(),
            counter: 0,
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `name` and reset the counter. Returns the previous name.
    pub fn change_state(&mut self, name: impl Into<String>) -> String {
        self.counter = 0;
        std::mem::replace(&mut self.name, name.into())
    }

    pub fn increment_counter(&mut self) {
        self.counter = self.counter.saturating_add(1);
    }

    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    /// Current `(name, counter)`.
    pub fn state(&self) -> (&str, u32) {
        (&self.name, self.counter)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_waiting() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), ("waiting", 0));
    }

    #[test]
    fn test_change_state_resets_counter() {
        let mut lc = Lifecycle::new();
        lc.increment_counter();
        lc.increment_counter();
        assert_eq!(lc.counter(), 2);

        let previous = lc.change_state("placing");

        assert_eq!(previous, "waiting");
        assert_eq!(lc.state(), ("placing", 0));
    }

    #[test]
    fn test_any_transition_is_allowed() {
        let mut lc = Lifecycle::new();
        lc.change_state("monitoring");
        lc.change_state("monitoring");
        lc.change_state("waiting");
        assert!(lc.is("waiting"));
    }

    #[test]
    fn test_reset_counter_keeps_name() {
        let mut lc = Lifecycle::new();
        lc.change_state("placing");
        lc.increment_counter();
        lc.reset_counter();
        assert_eq!(lc.state(), ("placing", 0));
    }
}
