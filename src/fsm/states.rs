//! Concrete state handler functions and table builder.
//!
//! Each state is one plain `fn` pointer: play the state's feedback script,
//! then say where to go next.
//!
//! ```text
//!  IDLE ──▶ SCANNING ──▶ SUCCESS ─────────┐
//!    ▲          │                          │
//!    │          ├──────▶ FAILURE ──────────┤
//!    │          │                          │
//!    │          └──────▶ ALREADY_SCANNED ──┤
//!    │                                     │
//!    └──────────[after feedback]───────────┘
//!
//!  Any state ──▶ ERROR ──[after feedback, or on reset if latched]──▶ IDLE
//! ```
//!
//! Any state may be requested from any other; the arrows show the usual
//! check-in flow.

use super::context::Feedback;
use super::patterns;
use super::{StateDescriptor, SystemState};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table for a context type.  Called once per machine.
pub fn build_state_table<C: Feedback>() -> [StateDescriptor<C>; SystemState::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: SystemState::Idle,
            name: "Idle",
            on_enter: idle_enter::<C>,
        },
        // Index 1: Scanning
        StateDescriptor {
            id: SystemState::Scanning,
            name: "Scanning",
            on_enter: scanning_enter::<C>,
        },
        // Index 2: Success
        StateDescriptor {
            id: SystemState::Success,
            name: "Success",
            on_enter: success_enter::<C>,
        },
        // Index 3: Failure
        StateDescriptor {
            id: SystemState::Failure,
            name: "Failure",
            on_enter: failure_enter::<C>,
        },
        // Index 4: AlreadyScanned
        StateDescriptor {
            id: SystemState::AlreadyScanned,
            name: "AlreadyScanned",
            on_enter: already_scanned_enter::<C>,
        },
        // Index 5: Error
        StateDescriptor {
            id: SystemState::Error,
            name: "Error",
            on_enter: error_enter::<C>,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE / SCANNING: steady states, stay until told otherwise
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter<C: Feedback>(ctx: &mut C) -> Option<SystemState> {
    ctx.play(&patterns::IDLE);
    info!("IDLE: ready");
    None
}

fn scanning_enter<C: Feedback>(ctx: &mut C) -> Option<SystemState> {
    ctx.play(&patterns::SCANNING);
    info!("SCANNING: waiting for result");
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SUCCESS / FAILURE / ALREADY_SCANNED: play once, then back to Idle
// ═══════════════════════════════════════════════════════════════════════════

fn success_enter<C: Feedback>(ctx: &mut C) -> Option<SystemState> {
    ctx.play(&patterns::SUCCESS);
    info!("SUCCESS: check-in accepted");
    Some(SystemState::Idle)
}

fn failure_enter<C: Feedback>(ctx: &mut C) -> Option<SystemState> {
    ctx.play(&patterns::FAILURE);
    info!("FAILURE: check-in rejected");
    Some(SystemState::Idle)
}

fn already_scanned_enter<C: Feedback>(ctx: &mut C) -> Option<SystemState> {
    ctx.play(&patterns::ALREADY_SCANNED);
    info!("ALREADY_SCANNED: duplicate check-in");
    Some(SystemState::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR: clears itself unless configured to latch
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter<C: Feedback>(ctx: &mut C) -> Option<SystemState> {
    ctx.play(&patterns::ERROR);
    if ctx.error_latches() {
        warn!("ERROR: latched, waiting for reset");
        None
    } else {
        warn!("ERROR: signalled, returning to idle");
        Some(SystemState::Idle)
    }
}
