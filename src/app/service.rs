//! Feedback service: the hexagonal core.
//!
//! [`FeedbackService`] owns the state machine (and through it the devices)
//! plus the event sink.  It is the command router: every bus message goes
//! through [`FeedbackService::route`], one at a time.
//!
//! ```text
//!                  ┌──────────────────────────────┐
//!  MessageHandler ─▶│       FeedbackService        │──▶ EventSink
//!                  │  parse · StateMachine · I/O  │
//!                  └───────┬───────────────┬──────┘
//!                          ▼               ▼
//!               LightDevice + Random   SoundDevice
//! ```
//!
//! Callers are serialised by a mutex: a message that arrives while a
//! feedback sequence is playing waits for it to finish.

use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::NodeConfig;
use crate::error::Result;
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{StateMachine, SystemState};

use super::commands::{BuzzerCommand, Command, DeviceCommand, RgbCommand, parse_message};
use super::events::AppEvent;
use super::ports::{EventSink, LightDevice, MessageHandler, RandomColorMode, SoundDevice};

// ───────────────────────────────────────────────────────────────
// FeedbackService
// ───────────────────────────────────────────────────────────────

struct Inner<L, S, D, E> {
    fsm: StateMachine<FsmContext<L, S, D>>,
    sink: E,
}

/// The command router.  Share it behind an `Arc` with the bus gateway.
pub struct FeedbackService<L, S, D, E> {
    inner: Mutex<Inner<L, S, D, E>>,
    prefix: String,
}

impl<L, S, D, E> FeedbackService<L, S, D, E>
where
    L: LightDevice + RandomColorMode + Send,
    S: SoundDevice,
    D: DelayNs + Send,
    E: EventSink,
{
    /// Construct the service.  Does **not** play anything; call [`start`](Self::start).
    pub fn new(ctx: FsmContext<L, S, D>, sink: E, config: &NodeConfig) -> Self {
        let fsm = StateMachine::new(build_state_table(), ctx);
        Self {
            inner: Mutex::new(Inner { fsm, sink }),
            prefix: config.topic_prefix.clone(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Play the initial state's feedback (blue LED).
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock();
        let result = inner.fsm.start();
        let state = inner.fsm.current_state();
        inner.sink.emit(&AppEvent::Started(state));
        info!("FeedbackService started in {}", state);
        result
    }

    /// Stop random cycling and release the devices; each switches itself
    /// off when dropped.
    pub fn shutdown(self) {
        let mut inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        inner.sink.emit(&AppEvent::ShuttingDown);
        inner.fsm.context_mut().light_mut().stop_random();
        info!("FeedbackService shut down in {}", inner.fsm.current_state());
    }

    // ── Command handling ──────────────────────────────────────

    /// Parse and execute one bus message, returning once any feedback it
    /// triggered has finished.
    ///
    /// Rejected messages leave state and devices untouched and are also
    /// reported as [`AppEvent::CommandRejected`].
    pub fn route(&self, topic: &str, payload: &str) -> Result<()> {
        let mut inner = self.lock();
        let result = parse_message(&self.prefix, topic, payload)
            .and_then(|cmd| Self::dispatch(&mut inner, cmd));
        Self::publish_transitions(&mut inner);
        if let Err(e) = &result {
            inner.sink.emit(&AppEvent::CommandRejected(e.clone()));
        }
        result
    }

    /// Request a state directly, bypassing message parsing.
    pub fn transition_to(&self, state: SystemState) -> Result<()> {
        let mut inner = self.lock();
        let result = inner.fsm.transition_to(state);
        Self::publish_transitions(&mut inner);
        result
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SystemState {
        self.lock().fsm.current_state()
    }

    pub fn previous_state(&self) -> Option<SystemState> {
        self.lock().fsm.previous_state()
    }

    pub fn topic_prefix(&self) -> &str {
        &self.prefix
    }

    // ── Internal ──────────────────────────────────────────────

    /// A panic mid-sequence leaves the machine consistent (state is updated
    /// before feedback plays), so a poisoned lock is taken over.
    fn lock(&self) -> MutexGuard<'_, Inner<L, S, D, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(inner: &mut Inner<L, S, D, E>, cmd: Command) -> Result<()> {
        match cmd {
            Command::State(state) => {
                info!("router: state {}", state);
                inner.fsm.transition_to(state)
            }
            Command::Reset => {
                info!("router: reset");
                inner.fsm.reset_error().map(|_| ())
            }
            Command::Device(device_cmd) => {
                info!("router: {:?}", device_cmd);
                Self::apply(inner.fsm.context_mut(), device_cmd)?;
                inner.sink.emit(&AppEvent::DeviceCommandApplied(device_cmd));
                Ok(())
            }
        }
    }

    fn apply(ctx: &mut FsmContext<L, S, D>, cmd: DeviceCommand) -> Result<()> {
        match cmd {
            DeviceCommand::Buzzer(BuzzerCommand::Beep { secs }) => ctx.sound_mut().beep(secs),
            DeviceCommand::Buzzer(BuzzerCommand::Pattern {
                count,
                interval_secs,
            }) => ctx.sound_mut().pattern(count, interval_secs),
            DeviceCommand::Rgb(RgbCommand::Color(color)) => ctx.light_mut().set_color(color),
            DeviceCommand::Rgb(RgbCommand::Random) => {
                if !ctx.light_mut().start_random()? {
                    info!("router: random mode already running");
                }
                Ok(())
            }
        }
    }

    fn publish_transitions(inner: &mut Inner<L, S, D, E>) {
        let Inner { fsm, sink } = inner;
        for (from, to) in fsm.drain_transitions() {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }
}

impl<L, S, D, E> MessageHandler for FeedbackService<L, S, D, E>
where
    L: LightDevice + RandomColorMode + Send,
    S: SoundDevice + Send,
    D: DelayNs + Send,
    E: EventSink + Send,
{
    fn handle_message(&self, topic: &str, payload: &str) {
        if let Err(e) = self.route(topic, payload) {
            warn!("router: {} {:?} rejected: {}", topic, payload, e);
        }
    }
}
