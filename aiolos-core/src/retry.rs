//! Declarative retry ladders
//!
//! Modem bring-up is a sequence of "try, wait, try again, and if it still
//! does not work, do something more drastic". Instead of nesting loops with
//! inline delays, each ladder is a [`RetryPolicy`]: a number of attempts, a
//! per-attempt timeout, a pause between attempts, and escalation actions
//! pinned to specific attempt indices. [`execute`] runs any policy against
//! any target.
//!
//! ```
//! use aiolos_core::retry::{execute, Escalation, RetryPolicy};
//!
//! #[derive(Clone, Copy, Debug, PartialEq)]
//! enum Kick { Harder }
//!
//! const POLICY: RetryPolicy<Kick> = RetryPolicy {
//!     attempts: 4,
//!     timeout_ms: 100,
//!     pause_ms: 10,
//!     escalations: &[Escalation { before_attempt: 2, action: Kick::Harder }],
//! };
//!
//! let mut kicked = false;
//! let outcome = execute(
//!     &mut kicked,
//!     &POLICY,
//!     |kicked, _timeout| *kicked,
//!     |kicked, _action| *kicked = true,
//!     |_, _pause| {},
//! );
//! assert_eq!(outcome, Some(2));
//! ```

/// Escalation action pinned to an attempt index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation<A> {
    /// Zero-based attempt index the action runs before
    pub before_attempt: u8,
    /// What to do
    pub action: A,
}

/// Bounded retry ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy<A: 'static> {
    /// Total attempts, zero means the ladder always fails
    pub attempts: u8,
    /// Timeout handed to each attempt (ms)
    pub timeout_ms: u32,
    /// Pause after a failed attempt when another one follows (ms)
    pub pause_ms: u32,
    /// Escalations, in any order
    pub escalations: &'static [Escalation<A>],
}

impl<A: Copy> RetryPolicy<A> {
    /// Single attempt, no escalation
    pub const fn once(timeout_ms: u32) -> Self {
        Self { attempts: 1, timeout_ms, pause_ms: 0, escalations: &[] }
    }

    /// Actions scheduled before attempt `index`
    pub fn actions_before(&self, index: u8) -> impl Iterator<Item = A> + '_ {
        self.escalations
            .iter()
            .filter(move |e| e.before_attempt == index)
            .map(|e| e.action)
    }

    /// Worst-case time spent in attempts and pauses, escalations excluded (ms)
    pub fn budget_ms(&self) -> u64 {
        let attempts = self.attempts as u64;
        attempts * self.timeout_ms as u64 + attempts.saturating_sub(1) * self.pause_ms as u64
    }
}

/// Run `policy` against `target`
///
/// `attempt` receives the per-attempt timeout and reports success,
/// `escalate` performs a scheduled action and `pause` waits between
/// attempts. Returns the index of the attempt that succeeded.
pub fn execute<T, A, F, E, P>(
    target: &mut T,
    policy: &RetryPolicy<A>,
    mut attempt: F,
    mut escalate: E,
    mut pause: P,
) -> Option<u8>
where
    A: Copy,
    F: FnMut(&mut T, u32) -> bool,
    E: FnMut(&mut T, A),
    P: FnMut(&mut T, u32),
{
    for index in 0..policy.attempts {
        for action in policy.actions_before(index) {
            escalate(target, action);
        }
        if attempt(target, policy.timeout_ms) {
            return Some(index);
        }
        if index + 1 < policy.attempts && policy.pause_ms > 0 {
            pause(target, policy.pause_ms);
        }
    }
    None
}
