/// Keeps the displayed percentage from moving backwards within a session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonotonicGuard {
    max_seen: f64,
}

impl MonotonicGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a raw estimate and returns the value to display.
    ///
    /// With `reset` set the high-water mark is zeroed before admission, so the
    /// returned value is exactly `raw`. Non-finite input leaves the mark untouched.
    pub fn admit(&mut self, raw: f64, reset: bool) -> f64 {
        if reset {
            self.reset();
        }
        if raw.is_finite() {
            self.max_seen = self.max_seen.max(raw.clamp(0.0, 100.0));
        }
        self.max_seen
    }

    pub fn reset(&mut self) {
        self.max_seen = 0.0;
    }

    pub fn current(&self) -> f64 {
        self.max_seen
    }
}

#[cfg(test)]
mod tests {
    use super::MonotonicGuard;
    use proptest::prelude::*;

    #[test]
    fn lower_values_are_held() {
        let mut guard = MonotonicGuard::new();
        assert_eq!(guard.admit(40.0, false), 40.0);
        assert_eq!(guard.admit(20.0, false), 40.0);
        assert_eq!(guard.admit(55.0, false), 55.0);
    }

    #[test]
    fn reset_admits_lower_value_exactly() {
        let mut guard = MonotonicGuard::new();
        assert_eq!(guard.admit(60.0, false), 60.0);
        assert_eq!(guard.admit(5.0, true), 5.0);
        assert_eq!(guard.admit(3.0, false), 5.0);
    }

    #[test]
    fn nan_is_ignored() {
        let mut guard = MonotonicGuard::new();
        guard.admit(12.0, false);
        assert_eq!(guard.admit(f64::NAN, false), 12.0);
    }

    proptest! {
        #[test]
        fn output_never_decreases(values in prop::collection::vec(0.0f64..=100.0, 1..64)) {
            let mut guard = MonotonicGuard::new();
            let mut last = 0.0;
            for value in values {
                let shown = guard.admit(value, false);
                prop_assert!(shown >= last);
                prop_assert!(shown >= value);
                last = shown;
            }
        }

        #[test]
        fn reset_returns_the_new_value(first in 0.1f64..=100.0, second in 0.0f64..=100.0) {
            prop_assume!(second < first);
            let mut guard = MonotonicGuard::new();
            guard.admit(first, false);
            prop_assert_eq!(guard.admit(second, true), second);
        }
    }
}
