use std::collections::BTreeMap;

/// Identifier handed out by [`TimerRegistry::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32);

#[derive(Debug)]
struct PendingTimer<T> {
    deadline_ms: u64,
    payload: T,
}

/// One-shot timers on a virtual clock.
///
/// Nothing fires on its own: the owner advances the clock and drains the
/// timers that came due, so time-sequenced effects are deterministic under
/// test. Timers due at the same instant fire in registration order.
#[derive(Debug)]
pub struct TimerRegistry<T> {
    now_ms: u64,
    next_id: u32,
    timers: BTreeMap<TimerId, PendingTimer<T>>,
}

impl<T> Default for TimerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerRegistry<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 1,
            timers: BTreeMap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn set_timeout(&mut self, delay_ms: u64, payload: T) -> TimerId {
        let timer_id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            timer_id,
            PendingTimer {
                deadline_ms: self.now_ms.saturating_add(delay_ms),
                payload,
            },
        );
        timer_id
    }

    /// Cancels a pending timer. Returns `false` if it already fired or was cleared.
    pub fn clear_timer(&mut self, timer_id: TimerId) -> bool {
        self.timers.remove(&timer_id).is_some()
    }

    /// Pops the earliest timer due at or before `until_ms` and moves the clock
    /// to its deadline. Call repeatedly, then [`finish_advance`], so timers
    /// scheduled by fired payloads still fire within the same window.
    ///
    /// [`finish_advance`]: TimerRegistry::finish_advance
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerId, T)> {
        let (timer_id, deadline_ms) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline_ms <= until_ms)
            .min_by_key(|(id, timer)| (timer.deadline_ms, **id))
            .map(|(id, timer)| (*id, timer.deadline_ms))?;

        let timer = self.timers.remove(&timer_id)?;
        self.now_ms = self.now_ms.max(deadline_ms);
        Some((timer_id, timer.payload))
    }

    pub fn finish_advance(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}
