//! Rolling-window write rate guard.
//!
//! Writes are admitted per `(identity, domain)` key against a per-domain
//! ceiling over a sliding window. Admission is a check-and-set on the key's
//! own entry; callers against different keys never contend.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use timecard_core::{Error, Result};

/// Write domains metered independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteDomain {
    Timelogs,
    Leaves,
}

impl WriteDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteDomain::Timelogs => "timelogs",
            WriteDomain::Leaves => "leaves",
        }
    }
}

pub struct WriteRateGuard {
    window: Duration,
    stamps: DashMap<(String, WriteDomain), VecDeque<Instant>>,
}

impl WriteRateGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: DashMap::new(),
        }
    }

    /// Admit one write for `identity` in `domain`, or refuse with
    /// [`Error::RateLimited`] when the ceiling is already reached within the
    /// window. Refused attempts do not consume budget.
    pub fn admit(&self, identity: &str, domain: WriteDomain, ceiling: u32) -> Result<()> {
        if ceiling == 0 {
            return Err(Error::RateLimited {
                domain: domain.as_str().to_string(),
            });
        }

        let now = Instant::now();
        let mut entry = self
            .stamps
            .entry((identity.to_string(), domain))
            .or_default();

        while entry
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            entry.pop_front();
        }
        if entry.len() >= ceiling as usize {
            tracing::warn!(
                identity,
                domain = domain.as_str(),
                ceiling,
                "write refused by rate guard"
            );
            return Err(Error::RateLimited {
                domain: domain.as_str().to_string(),
            });
        }
        entry.push_back(now);
        Ok(())
    }
}
