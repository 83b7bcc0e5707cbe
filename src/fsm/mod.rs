//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │  StateTable                                        │
//! │  ┌─────────────────┬──────────────────────────────┐│
//! │  │ SystemState     │ on_enter                     ││
//! │  ├─────────────────┼──────────────────────────────┤│
//! │  │ Idle            │ fn(ctx) -> Option<next>      ││
//! │  │ Scanning        │ fn(ctx) -> Option<next>      ││
//! │  │ Success         │ fn(ctx) -> Option<next>      ││
//! │  │ Failure         │ fn(ctx) -> Option<next>      ││
//! │  │ AlreadyScanned  │ fn(ctx) -> Option<next>      ││
//! │  │ Error           │ fn(ctx) -> Option<next>      ││
//! │  └─────────────────┴──────────────────────────────┘│
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! There is no tick: the machine only moves when asked to.  A transition
//! updates `previous`/`current`, then runs the new state's `on_enter`, which
//! plays that state's feedback to completion.  If the handler returns
//! `Some(next)` the engine transitions again before returning, which is how
//! the terminal states fall back to `Idle`.

pub mod context;
pub mod patterns;
pub mod states;

use core::fmt;
use core::str::FromStr;

pub use context::{Feedback, FsmContext};
use heapless::Deque;
use log::info;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state the node can be in.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SystemState {
    Idle = 0,
    Scanning = 1,
    Success = 2,
    Failure = 3,
    AlreadyScanned = 4,
    Error = 5,
}

impl SystemState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Idle,
        Self::Scanning,
        Self::Success,
        Self::Failure,
        Self::AlreadyScanned,
        Self::Error,
    ];

    /// Wire name, exactly as it appears in a state message payload.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Scanning => "SCANNING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::AlreadyScanned => "ALREADY_SCANNED",
            Self::Error => "ERROR",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Convert a table index back to a state.  Panics on out-of-range in
    /// debug builds; returns `Error` in release.
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(state) => *state,
            None => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemState {
    type Err = Error;

    /// Exact, case-sensitive match on the wire name.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| Error::InvalidState(s.into()))
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Entry action.  Plays the state's feedback; returns `Some(next)` to chain
/// straight into another state.
pub type StateEnterFn<C> = fn(&mut C) -> Option<SystemState>;

/// Static descriptor for a single state.
pub struct StateDescriptor<C> {
    pub id: SystemState,
    pub name: &'static str,
    pub on_enter: StateEnterFn<C>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// How many `(from, to)` pairs are kept for [`StateMachine::drain_transitions`].
const JOURNAL_LEN: usize = 8;

/// The state machine.  Owns its table and the context threaded through every
/// handler; build as many as needed.
pub struct StateMachine<C> {
    /// Fixed-size table indexed by `SystemState as usize`.
    table: [StateDescriptor<C>; SystemState::COUNT],
    current: SystemState,
    previous: Option<SystemState>,
    ctx: C,
    /// Transitions not yet collected by the caller, oldest first.
    journal: Deque<(SystemState, SystemState), JOURNAL_LEN>,
}

impl<C: Feedback> StateMachine<C> {
    /// Construct a machine in `Idle`.  No feedback plays until [`start`](Self::start).
    pub fn new(table: [StateDescriptor<C>; SystemState::COUNT], ctx: C) -> Self {
        for (i, row) in table.iter().enumerate() {
            debug_assert_eq!(row.id.index(), i, "state table row {i} is {}", row.name);
        }
        Self {
            table,
            current: SystemState::Idle,
            previous: None,
            ctx,
            journal: Deque::new(),
        }
    }

    /// Run the initial state's entry action once (blue LED at boot).
    pub fn start(&mut self) -> Result<()> {
        info!("FSM: starting in {}", self.current);
        self.enter_current()
    }

    /// Move to `next` and play its feedback to completion.
    ///
    /// Requesting the current state is a logged no-op.  Device faults don't
    /// stop the transition: the bookkeeping (and any chained transition)
    /// still completes and the first fault is returned afterwards.
    pub fn transition_to(&mut self, next: SystemState) -> Result<()> {
        if next == self.current {
            info!("FSM: already in {}, ignoring", next);
            return Ok(());
        }

        let from = self.current;
        info!("FSM: {} -> {}", from, next);
        self.previous = Some(from);
        self.current = next;
        if self.journal.is_full() {
            self.journal.pop_front();
        }
        // Capacity was just ensured above.
        let _ = self.journal.push_back((from, next));

        self.enter_current()
    }

    /// Leave a latched `Error`.  Returns `Ok(false)` without touching any
    /// device when the machine is not in `Error`.
    pub fn reset_error(&mut self) -> Result<bool> {
        if self.current != SystemState::Error {
            info!("FSM: reset ignored in {}", self.current);
            return Ok(false);
        }
        self.transition_to(SystemState::Idle)?;
        Ok(true)
    }

    pub fn current_state(&self) -> SystemState {
        self.current
    }

    /// `None` until the first transition.
    pub fn previous_state(&self) -> Option<SystemState> {
        self.previous
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// Take every `(from, to)` transition recorded since the last call.
    /// Only the newest few are kept if nobody collects them.
    pub fn drain_transitions(&mut self) -> impl Iterator<Item = (SystemState, SystemState)> + '_ {
        core::iter::from_fn(move || self.journal.pop_front())
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn enter_current(&mut self) -> Result<()> {
        let enter = self.table[self.current.index()].on_enter;
        let chained = enter(&mut self.ctx);
        let fault = self.ctx.take_fault();

        let chained_result = match chained {
            Some(next) => self.transition_to(next),
            None => Ok(()),
        };

        match fault {
            Some(e) => Err(e),
            None => chained_result,
        }
    }
}
