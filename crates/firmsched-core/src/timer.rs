//! The waketime-ordered timer queue.
//!
//! Ported from an intrusive singly-linked list to a slab: every timer lives
//! in a `Vec<TimerNode>` and is addressed by a [`TimerId`] handle instead of
//! a pointer. `PERIODIC` and `SENTINEL` occupy fixed slots 0 and 1 and are
//! never freed; the list is always at least `[periodic, ..., sentinel]`.

use std::fmt;

use crate::constants::{PERIODIC_INTERVAL_US, SENTINEL_OFFSET};
use crate::error::{CoreError, CoreResult};
use crate::outcome::DispatchOutcome;
use crate::ticks::{from_us, is_before};

/// Handle into a [`TimerQueue`]'s slab.
///
/// Carries a generation counter alongside the slot index so that a handle
/// from a since-removed-and-reused slot is rejected instead of silently
/// aliasing whatever now occupies that slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(usize, u32);

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({}, gen={})", self.0, self.1)
    }
}

/// Outcome of [`TimerQueue::dispatch_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStep {
    /// A timer ran; `waketime` is the new head's waketime.
    Ran { waketime: u32 },
    /// Dispatch reached the sentinel without a legitimate timer in front of
    /// it. This indicates queue corruption and should drive a shutdown.
    SentinelReached,
}

enum Slot {
    Periodic,
    Sentinel,
    User(Box<dyn FnMut(u32) -> DispatchOutcome>),
    Free,
}

struct TimerNode {
    waketime: u32,
    next: TimerId,
    slot: Slot,
    gen: u32,
}

pub struct TimerQueue {
    nodes: Vec<TimerNode>,
    free: Vec<usize>,
    head: TimerId,
    last_insert: TimerId,
    clock_freq: u32,
}

impl TimerQueue {
    pub const PERIODIC: TimerId = TimerId(0, 0);
    pub const SENTINEL: TimerId = TimerId(1, 0);

    /// Builds a fresh queue anchored at tick `now`, at the given clock
    /// frequency (used to convert the periodic timer's microsecond interval
    /// into ticks).
    pub fn new(clock_freq: u32, now: u32) -> Self {
        let periodic_wake = now.wrapping_add(from_us(PERIODIC_INTERVAL_US, clock_freq));
        let sentinel_wake = periodic_wake.wrapping_add(SENTINEL_OFFSET);
        let nodes = vec![
            TimerNode { waketime: periodic_wake, next: Self::SENTINEL, slot: Slot::Periodic, gen: 0 },
            TimerNode { waketime: sentinel_wake, next: Self::SENTINEL, slot: Slot::Sentinel, gen: 0 },
        ];
        Self {
            nodes,
            free: Vec::new(),
            head: Self::PERIODIC,
            last_insert: Self::PERIODIC,
            clock_freq,
        }
    }

    fn node(&self, id: TimerId) -> &TimerNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: TimerId) -> &mut TimerNode {
        &mut self.nodes[id.0]
    }

    /// The current head's waketime.
    pub fn head_waketime(&self) -> u32 {
        self.node(self.head).waketime
    }

    /// Number of user timers currently queued (excludes periodic/sentinel).
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cur = self.head;
        while cur != Self::SENTINEL {
            count += 1;
            cur = self.node(cur).next;
        }
        count - 1 // exclude periodic, which is always in the walk
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn alloc_slot(&mut self, waketime: u32, slot: Slot) -> TimerId {
        if let Some(idx) = self.free.pop() {
            let gen = self.nodes[idx].gen.wrapping_add(1);
            self.nodes[idx] = TimerNode { waketime, next: Self::SENTINEL, slot, gen };
            TimerId(idx, gen)
        } else {
            self.nodes.push(TimerNode { waketime, next: Self::SENTINEL, slot, gen: 0 });
            TimerId(self.nodes.len() - 1, 0)
        }
    }

    fn free_slot(&mut self, id: TimerId) {
        self.node_mut(id).slot = Slot::Free;
        self.free.push(id.0);
    }

    /// Finds `(prev, cur)` such that a node with the given waketime belongs
    /// between them: ties go after existing entries with the same waketime,
    /// and the walk never advances past the sentinel.
    fn find_insert_point(&self, waketime: u32) -> (Option<TimerId>, TimerId) {
        let mut prev = None;
        let mut cur = self.head;
        if is_before(self.node(self.last_insert).waketime, waketime) {
            prev = Some(self.last_insert);
            cur = self.node(self.last_insert).next;
        }
        while cur != Self::SENTINEL && !is_before(waketime, self.node(cur).waketime) {
            prev = Some(cur);
            cur = self.node(cur).next;
        }
        (prev, cur)
    }

    fn link_in(&mut self, id: TimerId, prev: Option<TimerId>, cur: TimerId) {
        self.node_mut(id).next = cur;
        match prev {
            Some(p) => self.node_mut(p).next = id,
            None => self.head = id,
        }
    }

    /// Registers a timer at `waketime`, ticking the clock at `now`.
    ///
    /// Returns the new timer's id and whether it became the new head (the
    /// caller should set its must-wake flag in that case). Fails with
    /// [`CoreError::AlreadyTooClose`]-shaped error if the new head's
    /// waketime is already behind `now`.
    pub fn add(
        &mut self,
        now: u32,
        waketime: u32,
        callback: impl FnMut(u32) -> DispatchOutcome + 'static,
    ) -> CoreResult<(TimerId, bool)> {
        let (prev, cur) = self.find_insert_point(waketime);
        let became_head = prev.is_none();
        if became_head && is_before(waketime, now) {
            return Err(CoreError::InvalidConfig("timer too close"));
        }
        let id = self.alloc_slot(waketime, Slot::User(Box::new(callback)));
        self.link_in(id, prev, cur);
        self.last_insert = id;
        Ok((id, became_head))
    }

    /// Removes `id` from the queue. A timer that is not present is a no-op
    /// error rather than a panic, matching the core's infallible-operation
    /// design where fatal conditions are reported, not unwound through.
    pub fn del(&mut self, id: TimerId) -> CoreResult<()> {
        if id == Self::PERIODIC || id == Self::SENTINEL {
            return Err(CoreError::InvalidConfig("cannot delete a fixed singleton timer"));
        }
        let mut prev = None;
        let mut cur = self.head;
        loop {
            if cur == id {
                break;
            }
            if cur == Self::SENTINEL {
                return Err(CoreError::UnknownTimer);
            }
            prev = Some(cur);
            cur = self.node(cur).next;
        }
        let next = self.node(cur).next;
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        if self.last_insert == id {
            self.last_insert = Self::PERIODIC;
        }
        self.free_slot(id);
        Ok(())
    }

    /// Re-arms the current head at `new_wake`, leaving it in place if that
    /// still sorts before its successor, otherwise unlinking and
    /// re-inserting it.
    fn reschedule_head(&mut self, new_wake: u32) {
        let head = self.head;
        let succ = self.node(head).next;
        self.node_mut(head).waketime = new_wake;
        if is_before(new_wake, self.node(succ).waketime) {
            return;
        }
        self.head = succ;
        let (prev, cur) = self.find_insert_point(new_wake);
        self.link_in(head, prev, cur);
        self.last_insert = head;
    }

    /// Runs the current head's callback and re-places or removes it.
    /// Returns the new head's waketime, or [`DispatchStep::SentinelReached`]
    /// if the queue has been corrupted into running off the end.
    pub fn dispatch_one(&mut self) -> DispatchStep {
        let head = self.head;
        if head == Self::SENTINEL {
            return DispatchStep::SentinelReached;
        }
        if head == Self::PERIODIC {
            let new_wake =
                self.node(head).waketime.wrapping_add(from_us(PERIODIC_INTERVAL_US, self.clock_freq));
            self.node_mut(Self::SENTINEL).waketime = new_wake.wrapping_add(SENTINEL_OFFSET);
            self.reschedule_head(new_wake);
            return DispatchStep::Ran { waketime: self.head_waketime() };
        }

        let outcome = {
            let node = &mut self.nodes[head.0];
            match &mut node.slot {
                Slot::User(cb) => cb(node.waketime),
                _ => unreachable!("only periodic/sentinel/user slots are ever head"),
            }
        };

        match outcome {
            DispatchOutcome::Done => {
                let next = self.node(head).next;
                self.head = next;
                if self.last_insert == head {
                    self.last_insert = Self::PERIODIC;
                }
                self.free_slot(head);
            }
            DispatchOutcome::Reschedule(new_wake) => {
                self.reschedule_head(new_wake);
            }
        }
        DispatchStep::Ran { waketime: self.head_waketime() }
    }

    /// Drops every user timer and restores `[periodic, sentinel]`.
    pub fn reset(&mut self, now: u32) {
        let periodic_wake = now.wrapping_add(from_us(PERIODIC_INTERVAL_US, self.clock_freq));
        let sentinel_wake = periodic_wake.wrapping_add(SENTINEL_OFFSET);
        self.nodes.clear();
        self.free.clear();
        self.nodes.push(TimerNode { waketime: periodic_wake, next: Self::SENTINEL, slot: Slot::Periodic, gen: 0 });
        self.nodes.push(TimerNode { waketime: sentinel_wake, next: Self::SENTINEL, slot: Slot::Sentinel, gen: 0 });
        self.head = Self::PERIODIC;
        self.last_insert = Self::PERIODIC;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOCK_FREQ: u32 = 20_000_000;

    fn order_after_n_dispatches(q: &mut TimerQueue, n: usize) -> Vec<u32> {
        let mut seen = Vec::new();
        for _ in 0..n {
            match q.dispatch_one() {
                DispatchStep::Ran { waketime } => seen.push(waketime),
                DispatchStep::SentinelReached => panic!("hit sentinel"),
            }
        }
        seen
    }

    #[test]
    fn starts_with_periodic_and_sentinel() {
        let q = TimerQueue::new(CLOCK_FREQ, 1000);
        assert_eq!(q.head, TimerQueue::PERIODIC);
        assert_eq!(q.node(TimerQueue::SENTINEL).waketime, q.node(TimerQueue::PERIODIC).waketime.wrapping_add(SENTINEL_OFFSET));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn basic_order_scenario() {
        // Scenario 1: B before A before C, all ahead of the periodic timer.
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        let order = std::cell::RefCell::new(Vec::new());
        let push = |tag: &'static str| {
            let order = &order;
            move |_now: u32| {
                order.borrow_mut().push(tag);
                DispatchOutcome::Done
            }
        };
        let (_a, _) = q.add(0, 1000, push("A")).unwrap();
        let (_b, _) = q.add(0, 500, push("B")).unwrap();
        let (_c, _) = q.add(0, 2000, push("C")).unwrap();

        q.dispatch_one();
        q.dispatch_one();
        q.dispatch_one();
        assert_eq!(*order.borrow(), vec!["B", "A", "C"]);
    }

    #[test]
    fn self_reschedule_scenario() {
        // Scenario 2: a timer reschedules itself five times, 100 ticks apart.
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        let (id, became_head) = q
            .add(0, 100, |now| DispatchOutcome::Reschedule(now + 100))
            .unwrap();
        assert!(became_head);

        for _ in 0..5 {
            q.dispatch_one();
        }
        assert_eq!(q.head_waketime(), 600);
        assert_eq!(q.len(), 1);
        let _ = id; // still queued, not re-added
    }

    #[test]
    fn wrap_around_scenario() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0xFFFF_FF00);
        // periodic is far in the future relative to a wrapped "now"; force a
        // known head by adding one timer before it.
        let (_before, became_head) = q.add(0xFFFF_FF00, 0xFFFF_FF00, |_| DispatchOutcome::Done).unwrap();
        assert!(became_head);
        let (_y, became_head) = q.add(0xFFFF_FF00, 0x0000_0010, |_| DispatchOutcome::Done).unwrap();
        assert!(!became_head, "Y must sort after the already-due head");

        assert_eq!(q.head_waketime(), 0xFFFF_FF00);
        let order = order_after_n_dispatches(&mut q, 1);
        assert_eq!(order, vec![0xFFFF_FF00]);
        assert_eq!(q.head_waketime(), 0x0000_0010);
    }

    #[test]
    fn tie_goes_to_incumbent() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        let (_first, became_head) = q.add(0, 1000, |_| DispatchOutcome::Done).unwrap();
        assert!(became_head);
        let (_second, became_head) = q.add(0, 1000, |_| DispatchOutcome::Done).unwrap();
        assert!(!became_head, "equal waketime must not displace the incumbent head");
    }

    #[test]
    fn add_then_del_restores_queue() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        let before = q.len();
        let (id, _) = q.add(0, 5000, |_| DispatchOutcome::Done).unwrap();
        assert_eq!(q.len(), before + 1);
        q.del(id).unwrap();
        assert_eq!(q.len(), before);
    }

    #[test]
    fn del_unknown_timer_errors() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        let (id, _) = q.add(0, 5000, |_| DispatchOutcome::Done).unwrap();
        q.del(id).unwrap();
        assert!(q.del(id).is_err());
    }

    #[test]
    fn stale_handle_after_slot_reuse_is_rejected() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        let (stale, _) = q.add(0, 5000, |_| DispatchOutcome::Done).unwrap();
        q.del(stale).unwrap();
        // Reuses the freed slot with a bumped generation.
        let (_fresh, _) = q.add(0, 6000, |_| DispatchOutcome::Done).unwrap();
        assert!(q.del(stale).is_err(), "a stale handle must not alias the reused slot");
    }

    #[test]
    fn del_fixed_singleton_errors() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        assert!(q.del(TimerQueue::PERIODIC).is_err());
        assert!(q.del(TimerQueue::SENTINEL).is_err());
    }

    #[test]
    fn add_past_head_is_rejected() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 10_000);
        let result = q.add(10_000, 5_000, |_| DispatchOutcome::Done);
        assert!(result.is_err());
    }

    #[test]
    fn reset_drops_user_timers() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        q.add(0, 100, |_| DispatchOutcome::Done).unwrap();
        q.add(0, 200, |_| DispatchOutcome::Done).unwrap();
        assert_eq!(q.len(), 2);
        q.reset(500);
        assert_eq!(q.len(), 0);
        assert_eq!(q.head, TimerQueue::PERIODIC);
    }

    #[test]
    fn reschedule_keeps_position_when_still_earliest() {
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        q.add(0, 10_000, |_| DispatchOutcome::Done).unwrap();
        let (id, _) = q.add(0, 100, |now| DispatchOutcome::Reschedule(now + 50)).unwrap();
        q.dispatch_one(); // 100 -> 150, still before 10_000 and periodic
        assert_eq!(q.head_waketime(), 150);
        let _ = id;
    }

    #[test]
    fn sentinel_caps_dispatch_loop() {
        // Draining a small queue never runs past the sentinel unexpectedly;
        // periodic keeps re-arming itself forever instead.
        let mut q = TimerQueue::new(CLOCK_FREQ, 0);
        for _ in 0..10 {
            match q.dispatch_one() {
                DispatchStep::Ran { .. } => {}
                DispatchStep::SentinelReached => panic!("periodic loop should never expose sentinel"),
            }
        }
    }
}
