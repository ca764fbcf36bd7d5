use std::ops::Range;
use std::time::{Duration, Instant};

use crate::LineLog;

/// Debounced intake: every chunk is logged immediately and re-arms a single
/// quiet-period timer. One pass covers everything appended since the last pass.
#[derive(Debug, Clone)]
pub struct IntakeLoop {
    log: LineLog,
    processed_upto: usize,
    quiet_period: Duration,
    /// `Some` while the timer is armed.
    deadline: Option<Instant>,
    pass_pending: bool,
}

impl IntakeLoop {
    pub fn new(separator: char, quiet_period: Duration) -> Self {
        Self {
            log: LineLog::new(separator),
            processed_upto: 0,
            quiet_period,
            deadline: None,
            pass_pending: false,
        }
    }

    pub fn on_output(&mut self, chunk: &[u8], now: Instant) {
        self.log.append(chunk);
        self.pass_pending = true;
        // Overflow fires on the next poll.
        self.deadline = Some(now.checked_add(self.quiet_period).unwrap_or(now));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fires the timer if it has expired, returning the index range of lines
    /// to classify. The cursor moves past them.
    pub fn poll(&mut self, now: Instant) -> Option<Range<usize>> {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return None,
        }
        self.deadline = None;
        if !std::mem::take(&mut self.pass_pending) {
            return None;
        }

        let from = self.processed_upto;
        let (_, next) = self.log.slice_since(from);
        self.processed_upto = next;
        Some(from..next)
    }

    pub fn log(&self) -> &LineLog {
        &self.log
    }

    pub fn processed_upto(&self) -> usize {
        self.processed_upto
    }
}
