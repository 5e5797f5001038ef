//! Pure transition functions for the countdown machine.
//!
//! Nothing in here touches storage, sound or the clock. Each function takes
//! the current state and settings and returns the next state, so the whole
//! work/break cycle can be exercised without a scheduler.

use crate::models::{CompletionEvent, Phase, TimerSettings, TimerState};

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TimerState,
    /// Set when the tick ran the current phase out.
    pub completed: Option<CompletionEvent>,
}

/// Starts or resumes counting. Leaving `Idle` enters a fresh work phase.
pub fn start(state: &TimerState, settings: &TimerSettings) -> TimerState {
    if state.running {
        return state.clone();
    }
    let mut next = state.clone();
    if next.phase == Phase::Idle {
        next.phase = Phase::Work;
        next.remaining_secs = settings.work_duration_secs;
    }
    next.running = true;
    next
}

/// Stops counting without touching the remaining time.
pub fn pause(state: &TimerState) -> TimerState {
    TimerState {
        running: false,
        ..state.clone()
    }
}

/// Returns to `Idle`. Session counters are cumulative and survive a reset.
pub fn reset(state: &TimerState, settings: &TimerSettings) -> TimerState {
    TimerState {
        phase: Phase::Idle,
        remaining_secs: settings.work_duration_secs,
        running: false,
        ..state.clone()
    }
}

/// Advances the countdown by one second.
///
/// A tick on a stopped or idle machine changes nothing. When the remaining
/// time reaches zero the next phase is entered in the same step, so the
/// machine never rests at zero inside a running phase.
pub fn tick(state: &TimerState, settings: &TimerSettings) -> Transition {
    if !state.running || state.phase == Phase::Idle {
        return Transition {
            state: state.clone(),
            completed: None,
        };
    }

    let mut next = state.clone();
    next.remaining_secs = next.remaining_secs.saturating_sub(1);
    if next.remaining_secs > 0 {
        return Transition {
            state: next,
            completed: None,
        };
    }

    let event = match state.phase {
        Phase::Work => {
            next.completed_sessions = next.completed_sessions.saturating_add(1);
            next.focus_minutes += settings.work_duration_secs as f64 / 60.0;
            let following = if is_long_break_due(next.completed_sessions, settings) {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            enter(&mut next, following, settings);
            CompletionEvent::WorkComplete {
                count: next.completed_sessions,
                next: following,
            }
        }
        Phase::ShortBreak | Phase::LongBreak => {
            enter(&mut next, Phase::Work, settings);
            CompletionEvent::BreakComplete
        }
        Phase::Idle => {
            return Transition {
                state: state.clone(),
                completed: None,
            }
        }
    };

    Transition {
        state: next,
        completed: Some(event),
    }
}

/// True when the `completed`-th session earns a long break.
pub fn is_long_break_due(completed: u32, settings: &TimerSettings) -> bool {
    let interval = settings.long_break_interval.max(1);
    completed > 0 && completed % interval == 0
}

fn enter(state: &mut TimerState, phase: Phase, settings: &TimerSettings) {
    state.phase = phase;
    state.remaining_secs = state.phase_duration(settings);
    state.running = settings.auto_starts(phase);
}
