//! Progress reporting for long-running operations like bulk training.

use std::fmt;

use serde::Serialize;

/// A progress report. We don't type the topic and just use a string instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub topic: &'static str,
    pub total: usize,
    pub current: usize,
}

impl Progress {
    pub fn new(topic: &'static str, total: usize, current: usize) -> Self {
        Self {
            topic,
            total,
            current,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.total
    }

    /// Reports every `every`-th step, the first and the last one.
    pub fn is_milestone(&self, every: usize) -> bool {
        self.current == 1 || self.is_finished() || (every > 0 && self.current % every == 0)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.topic, self.current, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestones() {
        let at = |current| Progress::new("test", 100, current);
        assert!(at(1).is_milestone(20));
        assert!(at(40).is_milestone(20));
        assert!(!at(41).is_milestone(20));
        assert!(at(100).is_milestone(20));
        assert!(at(100).is_finished());
        assert_eq!(at(3).to_string(), "test 3/100");
    }
}
