use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Issues timestamp-derived session identifiers (epoch milliseconds).
///
/// Values are strictly increasing for the life of the issuer, so two turns
/// that start within the same millisecond still get distinct sessions.
#[derive(Debug, Default)]
pub struct SessionIds {
    last: AtomicI64,
}

impl SessionIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(current) => last = current,
            }
        }
    }

    /// The caller's identifier when it supplied a non-empty one, a fresh one otherwise.
    pub fn resolve(&self, supplied: Option<&str>) -> String {
        match supplied {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.next_id(),
        }
    }
}
