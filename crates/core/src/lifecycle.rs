//! Call phase tracking for a single voice session.
//!
//! A call moves `Idle -> Connecting -> Active -> Finished` and never back.
//! Every transition is computed by [`CallPhase::next`], which matches every
//! `(phase, signal)` pair explicitly so a new phase or signal cannot be added
//! without deciding how it moves.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallPhase {
    Idle,
    Connecting,
    Active,
    Finished,
}

impl CallPhase {
    /// Position of the phase in the forward order.
    pub fn rank(self) -> u8 {
        match self {
            CallPhase::Idle => 0,
            CallPhase::Connecting => 1,
            CallPhase::Active => 2,
            CallPhase::Finished => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == CallPhase::Finished
    }

    pub fn next(self, signal: CallSignal) -> Result<CallPhase, IllegalTransition> {
        use CallPhase::*;
        use CallSignal::*;

        match (self, signal) {
            (Idle, Start) => Ok(Connecting),
            (Connecting, Established) => Ok(Active),
            (Active, Stop) => Ok(Finished),
            (Connecting | Active, Ended) => Ok(Finished),
            (Connecting, StartFailed) => Ok(Finished),
            (Idle, Established | Stop | Ended | StartFailed)
            | (Connecting, Start | Stop)
            | (Active, Start | Established | StartFailed)
            | (Finished, _) => Err(IllegalTransition { from: self, signal }),
        }
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallPhase::Idle => "idle",
            CallPhase::Connecting => "connecting",
            CallPhase::Active => "active",
            CallPhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Inputs that can move a call between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSignal {
    /// The user asked to start the call.
    Start,
    /// The transport reported that the call is live.
    Established,
    /// The user asked to end the call.
    Stop,
    /// The transport reported that the call ended.
    Ended,
    /// The transport could not start the call.
    StartFailed,
}

/// Why a call reached `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stopped,
    Ended,
    StartFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal call transition: {signal:?} while {from}")]
pub struct IllegalTransition {
    pub from: CallPhase,
    pub signal: CallSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CallPhase,
    pub to: CallPhase,
    pub signal: CallSignal,
}

impl Transition {
    pub fn is_finish(&self) -> bool {
        self.to.is_terminal()
    }
}

#[derive(Debug)]
pub struct CallLifecycle {
    phase: CallPhase,
    finish_reason: Option<FinishReason>,
}

impl Default for CallLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl CallLifecycle {
    pub fn new() -> Self {
        Self {
            phase: CallPhase::Idle,
            finish_reason: None,
        }
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Applies a signal. Illegal signals leave the phase untouched and return `None`.
    pub fn apply(&mut self, signal: CallSignal) -> Option<Transition> {
        match self.phase.next(signal) {
            Ok(to) => {
                let transition = Transition {
                    from: self.phase,
                    to,
                    signal,
                };
                self.phase = to;
                if to.is_terminal() {
                    self.finish_reason = Some(match signal {
                        CallSignal::StartFailed => FinishReason::StartFailed,
                        CallSignal::Stop => FinishReason::Stopped,
                        _ => FinishReason::Ended,
                    });
                }
                tracing::debug!("call phase {} -> {} ({:?})", transition.from, to, signal);
                Some(transition)
            }
            Err(e) => {
                tracing::debug!("ignoring signal: {}", e);
                None
            }
        }
    }

    pub fn start(&mut self) -> Option<Transition> {
        self.apply(CallSignal::Start)
    }

    pub fn established(&mut self) -> Option<Transition> {
        self.apply(CallSignal::Established)
    }

    pub fn stop(&mut self) -> Option<Transition> {
        self.apply(CallSignal::Stop)
    }

    pub fn ended(&mut self) -> Option<Transition> {
        self.apply(CallSignal::Ended)
    }

    pub fn start_failed(&mut self) -> Option<Transition> {
        self.apply(CallSignal::StartFailed)
    }
}
