//! Reveal-on-scroll trigger. The host reports how much of the target is
//! visible; the first report at or above the threshold adds the class and the
//! observer stops listening.

use kuchiki::NodeRef;
use log::trace;

use crate::dom;

#[derive(Debug)]
pub struct RevealObserver {
    target: NodeRef,
    class: &'static str,
    threshold: f64,
    observing: bool,
}

impl RevealObserver {
    pub fn new(target: NodeRef, class: &'static str, threshold: f64) -> Self {
        RevealObserver {
            target,
            class,
            threshold,
            observing: true,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Feed one intersection ratio in `0.0..=1.0`. Returns true when this call
    /// revealed the target.
    pub fn observe(&mut self, ratio: f64) -> bool {
        if !self.observing || ratio <= 0.0 || ratio < self.threshold {
            return false;
        }
        dom::add_class(&self.target, self.class);
        self.observing = false;
        trace!("revealed with ratio {:.2}", ratio);
        true
    }

    pub fn disconnect(&mut self) {
        self.observing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveals_once_past_threshold() {
        let target = dom::element("div");
        let mut observer = RevealObserver::new(target.clone(), "shown", 0.1);

        assert!(!observer.observe(0.05));
        assert!(!dom::has_class(&target, "shown"));
        assert!(observer.observe(0.1));
        assert!(dom::has_class(&target, "shown"));

        dom::remove_class(&target, "shown");
        assert!(!observer.observe(1.0));
        assert!(!dom::has_class(&target, "shown"));
    }

    #[test]
    fn test_disconnected_observer_ignores_entries() {
        let target = dom::element("div");
        let mut observer = RevealObserver::new(target.clone(), "shown", 0.1);
        observer.disconnect();
        assert!(!observer.observe(0.5));
        assert!(!observer.is_observing());
    }
}
