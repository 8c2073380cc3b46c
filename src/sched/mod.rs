//! Priority Scheduler
//!
//! Fixed set of run queues; queue 0 runs first, the last queue holds the
//! idle process, which is always ready, so picking always succeeds once
//! idle has been enqueued.
//!
//! # Policy
//! - Quantum left on enqueue: front of its queue, runs again soon
//! - Quantum used up: fresh quantum, back of the queue, and a priority
//!   change. Exhausting quanta back to back costs one level; otherwise the
//!   process climbs one level toward its maximum
//! - Yielding with quantum left also climbs one level toward the maximum
//! - Priorities stay between the process maximum and the queue above idle

use alloc::collections::VecDeque;

use crate::config::{IDLE_QUEUE, NR_SCHED_QUEUES};

/// Scheduling parameters of one process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedParams {
    /// Current queue.
    pub priority: u8,
    /// Best queue this process may reach.
    pub max_priority: u8,
    /// Ticks in a fresh quantum.
    pub quantum: u32,
    /// Ticks left in the current quantum.
    pub ticks_left: u32,
    /// Priority never adjusted (idle and kernel tasks).
    pub fixed: bool,
    pub(crate) queued: Option<u8>,
}

impl SchedParams {
    pub const fn new(priority: u8, quantum: u32) -> Self {
        Self {
            priority,
            max_priority: priority,
            quantum,
            ticks_left: quantum,
            fixed: false,
            queued: None,
        }
    }

    /// Parameters of the idle process.
    pub const fn idle() -> Self {
        Self {
            priority: IDLE_QUEUE,
            max_priority: IDLE_QUEUE,
            quantum: 1,
            ticks_left: 1,
            fixed: true,
            queued: None,
        }
    }

    #[inline]
    pub fn is_queued(&self) -> bool {
        self.queued.is_some()
    }
}

/// The ready queues.
#[derive(Debug)]
pub struct RunQueues {
    queues: [VecDeque<usize>; NR_SCHED_QUEUES],
    /// Last process that exhausted a full quantum.
    last_exhausted: Option<usize>,
}

impl RunQueues {
    pub fn new() -> Self {
        Self {
            queues: core::array::from_fn(|_| VecDeque::new()),
            last_exhausted: None,
        }
    }

    /// Make `slot` ready. A process already queued stays where it is.
    pub fn enqueue(&mut self, slot: usize, params: &mut SchedParams) {
        if params.queued.is_some() {
            return;
        }

        let time_left = params.ticks_left > 0;
        let mut penalty: i32 = 0;
        if !time_left {
            params.ticks_left = params.quantum;
            penalty = if self.last_exhausted == Some(slot) { 1 } else { -1 };
            self.last_exhausted = Some(slot);
        } else if params.priority > params.max_priority {
            penalty = -1;
        }

        if penalty != 0 && !params.fixed {
            let lowest = i32::from(IDLE_QUEUE) - 1;
            let next = (i32::from(params.priority) + penalty)
                .clamp(i32::from(params.max_priority), lowest);
            params.priority = next as u8;
        }

        let q = &mut self.queues[params.priority as usize];
        if time_left {
            q.push_front(slot);
        } else {
            q.push_back(slot);
        }
        params.queued = Some(params.priority);
    }

    /// Remove `slot` from its queue, if it is on one.
    pub fn dequeue(&mut self, slot: usize, params: &mut SchedParams) {
        if let Some(q) = params.queued.take() {
            let queue = &mut self.queues[q as usize];
            if let Some(pos) = queue.iter().position(|&s| s == slot) {
                queue.remove(pos);
            }
        }
    }

    /// Head of the highest-priority non-empty queue.
    pub fn pick(&self) -> Option<usize> {
        self.queues.iter().find_map(|q| q.front().copied())
    }

    /// Processes in queue `q`, head first.
    pub fn queue(&self, q: u8) -> impl Iterator<Item = usize> + '_ {
        self.queues[q as usize].iter().copied()
    }

    pub fn ready_count(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }
}

impl Default for RunQueues {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_pick_highest_priority_first() {
        let mut rq = RunQueues::new();
        let mut idle = SchedParams::idle();
        let mut low = SchedParams::new(9, 4);
        let mut high = SchedParams::new(3, 4);
        rq.enqueue(0, &mut idle);
        rq.enqueue(1, &mut low);
        assert_eq!(rq.pick(), Some(1));
        rq.enqueue(2, &mut high);
        assert_eq!(rq.pick(), Some(2));
        rq.dequeue(2, &mut high);
        rq.dequeue(1, &mut low);
        assert_eq!(rq.pick(), Some(0));
    }

    #[test]
    fn test_time_left_goes_to_front() {
        let mut rq = RunQueues::new();
        let mut a = SchedParams::new(5, 4);
        let mut b = SchedParams::new(5, 4);
        rq.enqueue(1, &mut a);
        rq.enqueue(2, &mut b);
        assert_eq!(rq.queue(5).collect::<Vec<_>>(), [2, 1]);
    }

    #[test]
    fn test_consecutive_exhaustion_lowers_priority() {
        let mut rq = RunQueues::new();
        let mut p = SchedParams::new(5, 4);
        p.max_priority = 2;
        p.ticks_left = 0;
        // first exhaustion: climbs toward max
        rq.enqueue(1, &mut p);
        assert_eq!(p.priority, 4);
        assert_eq!(p.ticks_left, 4);
        rq.dequeue(1, &mut p);
        p.ticks_left = 0;
        // same process again: penalized
        rq.enqueue(1, &mut p);
        assert_eq!(p.priority, 5);
        assert_eq!(rq.queue(5).collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn test_early_yield_boosts_toward_max() {
        let mut rq = RunQueues::new();
        let mut p = SchedParams::new(6, 4);
        p.max_priority = 4;
        p.ticks_left = 2;
        rq.enqueue(1, &mut p);
        assert_eq!(p.priority, 5);
        rq.dequeue(1, &mut p);
        rq.enqueue(1, &mut p);
        rq.dequeue(1, &mut p);
        rq.enqueue(1, &mut p);
        assert_eq!(p.priority, 4);
    }

    #[test]
    fn test_priority_never_reaches_idle_queue() {
        let mut rq = RunQueues::new();
        let mut p = SchedParams::new(IDLE_QUEUE - 1, 1);
        p.ticks_left = 0;
        rq.enqueue(1, &mut p);
        rq.dequeue(1, &mut p);
        p.ticks_left = 0;
        rq.enqueue(1, &mut p);
        assert_eq!(p.priority, IDLE_QUEUE - 1);
    }

    #[test]
    fn test_idle_is_fixed() {
        let mut rq = RunQueues::new();
        let mut idle = SchedParams::idle();
        idle.ticks_left = 0;
        rq.enqueue(0, &mut idle);
        rq.dequeue(0, &mut idle);
        idle.ticks_left = 0;
        rq.enqueue(0, &mut idle);
        assert_eq!(idle.priority, IDLE_QUEUE);
    }

    #[test]
    fn test_double_enqueue_is_noop() {
        let mut rq = RunQueues::new();
        let mut p = SchedParams::new(5, 4);
        rq.enqueue(1, &mut p);
        rq.enqueue(1, &mut p);
        assert_eq!(rq.ready_count(), 1);
    }
}
