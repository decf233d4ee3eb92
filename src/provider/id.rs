use crate::config::IdStrategy;

use chrono::Utc;

/// Issues the computed `id` for every new state. Ids from a single clock are always strictly
/// increasing, even if the wall clock goes backwards or two states are created within the same
/// nanosecond.
///
/// Issuing an id happens in two steps: `peek` returns the next id without using it up, and
/// `commit` records it once the state that carries it has actually been stored. That way a failed
/// operation never leaves a gap in a `Sequence`.
///
/// Once `i64::MAX` has been issued there is no larger id, so `peek` returns `None` from then on.
#[derive(Debug, Clone)]
pub struct IdClock {
    strategy: IdStrategy,
    last: Option<i64>,
}

impl IdClock {
    pub fn new(strategy: IdStrategy) -> IdClock {
        IdClock {
            strategy,
            last: None,
        }
    }

    pub fn peek(&self) -> Option<i64> {
        let after_last = match self.last {
            Some(last) => Some(last.checked_add(1)?),
            None => None,
        };
        match self.strategy {
            IdStrategy::Sequence { start } => Some(after_last.unwrap_or(start)),
            IdStrategy::WallClock => {
                // only `None` after the year 2262
                let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
                Some(after_last.map(|after_last| now.max(after_last)).unwrap_or(now))
            }
        }
    }

    pub fn commit(&mut self, id: i64) {
        self.last = Some(self.last.map(|last| last.max(id)).unwrap_or(id));
    }

    /// Returns the next id and immediately commits it
    pub fn next_id(&mut self) -> Option<i64> {
        let id = self.peek()?;
        self.commit(id);
        Some(id)
    }
}
