/// One-shot notification from the tracker to whoever renders it.
///
/// Raising stores a payload that stays pending until taken; taking consumes
/// it, so each raise is observed at most once. Raising again before the
/// previous payload is taken replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal<T> {
    pending: Option<T>,
}

impl<T> Signal<T> {
    pub fn raise(&mut self, value: T) {
        self.pending = Some(value);
    }

    pub fn is_raised(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let signal: Signal<i64> = Signal::default();
        assert!(!signal.is_raised());
        assert_eq!(signal.pending(), None);
    }

    #[test]
    fn take_consumes_the_payload_once() {
        let mut signal = Signal::default();
        signal.raise(7);

        assert!(signal.is_raised());
        assert_eq!(signal.take(), Some(7));
        assert_eq!(signal.take(), None);
        assert!(!signal.is_raised());
    }

    #[test]
    fn raising_again_replaces_an_untaken_payload() {
        let mut signal = Signal::default();
        signal.raise(1);
        signal.raise(2);

        assert_eq!(signal.take(), Some(2));
        assert_eq!(signal.take(), None);
    }
}
