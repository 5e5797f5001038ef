//! Data models for the study session timer.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for any phase duration (one day).
pub const MAX_DURATION_SECS: u32 = 24 * 60 * 60;

/// The four named states of the countdown machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Nothing counting yet, ready to start a work session.
    #[default]
    Idle,
    /// Focused work session.
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    /// Returns true for either break phase.
    pub fn is_break(self) -> bool {
        matches!(self, Self::ShortBreak | Self::LongBreak)
    }

    /// Human-readable label shown next to the countdown.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready to Focus",
            Self::Work => "Focus Time",
            Self::ShortBreak => "Short Break",
            Self::LongBreak => "Long Break",
        }
    }
}

/// Preferred colour scheme for the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Rejected settings update. The previous settings stay in effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be between 1 and 86400 seconds (got {value})")]
    InvalidDuration { field: &'static str, value: i64 },
    #[error("Long break interval must be at least 1 (got {0})")]
    InvalidInterval(i64),
    #[error("Sound volume must be between 0.0 and 1.0 (got {0})")]
    InvalidVolume(f32),
}

/// User-configurable settings for the study timer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerSettings {
    /// Duration of a work session in seconds.
    pub work_duration_secs: u32,
    /// Duration of a short break in seconds.
    pub short_break_secs: u32,
    /// Duration of a long break in seconds.
    pub long_break_secs: u32,
    /// Number of completed work sessions between long breaks.
    pub long_break_interval: u32,
    /// Keep counting when a work session rolls into a break.
    pub auto_start_breaks: bool,
    /// Keep counting when a break rolls into a work session.
    pub auto_start_work: bool,
    pub sound_enabled: bool,
    /// Alert volume in [0.0, 1.0].
    pub sound_volume: f32,
    pub notifications_enabled: bool,
    pub theme: Theme,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
            long_break_interval: 4,
            auto_start_breaks: false,
            auto_start_work: false,
            sound_enabled: true,
            sound_volume: 0.5,
            notifications_enabled: true,
            theme: Theme::System,
        }
    }
}

impl TimerSettings {
    /// Checks every field against its invariant.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_duration("Work duration", self.work_duration_secs as i64)?;
        check_duration("Short break duration", self.short_break_secs as i64)?;
        check_duration("Long break duration", self.long_break_secs as i64)?;
        check_interval(self.long_break_interval as i64)?;
        check_volume(self.sound_volume)?;
        Ok(())
    }

    /// Whether the given phase starts counting on its own when entered.
    pub fn auto_starts(&self, phase: Phase) -> bool {
        match phase {
            Phase::Work => self.auto_start_work,
            Phase::ShortBreak | Phase::LongBreak => self.auto_start_breaks,
            Phase::Idle => false,
        }
    }
}

fn check_duration(field: &'static str, value: i64) -> Result<u32, SettingsError> {
    if value < 1 || value > MAX_DURATION_SECS as i64 {
        return Err(SettingsError::InvalidDuration { field, value });
    }
    Ok(value as u32)
}

fn check_interval(value: i64) -> Result<u32, SettingsError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or(SettingsError::InvalidInterval(value))
}

fn check_volume(value: f32) -> Result<f32, SettingsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SettingsError::InvalidVolume(value))
    }
}

/// A partial settings update. Numeric fields are signed so that raw user
/// input can be represented and rejected rather than silently wrapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub work_duration_secs: Option<i64>,
    pub short_break_secs: Option<i64>,
    pub long_break_secs: Option<i64>,
    pub long_break_interval: Option<i64>,
    pub auto_start_breaks: Option<bool>,
    pub auto_start_work: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub sound_volume: Option<f32>,
    pub notifications_enabled: Option<bool>,
    pub theme: Option<Theme>,
}

impl SettingsPatch {
    /// Merges this patch over `base`, returning the validated result.
    /// `base` itself is never modified.
    pub fn apply(&self, base: &TimerSettings) -> Result<TimerSettings, SettingsError> {
        let mut merged = base.clone();
        if let Some(v) = self.work_duration_secs {
            merged.work_duration_secs = check_duration("Work duration", v)?;
        }
        if let Some(v) = self.short_break_secs {
            merged.short_break_secs = check_duration("Short break duration", v)?;
        }
        if let Some(v) = self.long_break_secs {
            merged.long_break_secs = check_duration("Long break duration", v)?;
        }
        if let Some(v) = self.long_break_interval {
            merged.long_break_interval = check_interval(v)?;
        }
        if let Some(v) = self.sound_volume {
            merged.sound_volume = check_volume(v)?;
        }
        if let Some(v) = self.auto_start_breaks {
            merged.auto_start_breaks = v;
        }
        if let Some(v) = self.auto_start_work {
            merged.auto_start_work = v;
        }
        if let Some(v) = self.sound_enabled {
            merged.sound_enabled = v;
        }
        if let Some(v) = self.notifications_enabled {
            merged.notifications_enabled = v;
        }
        if let Some(v) = self.theme {
            merged.theme = v;
        }
        Ok(merged)
    }
}

/// The live countdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub phase: Phase,
    pub remaining_secs: u32,
    pub running: bool,
    /// Completed work sessions since the stats were last cleared.
    pub completed_sessions: u32,
    /// Cumulative focus time in minutes.
    pub focus_minutes: f64,
}

impl TimerState {
    /// Creates the initial idle state for the given settings.
    pub fn new(settings: &TimerSettings) -> Self {
        Self {
            phase: Phase::Idle,
            remaining_secs: settings.work_duration_secs,
            running: false,
            completed_sessions: 0,
            focus_minutes: 0.0,
        }
    }

    /// Full length of the current phase in seconds.
    pub fn phase_duration(&self, settings: &TimerSettings) -> u32 {
        match self.phase {
            Phase::Idle | Phase::Work => settings.work_duration_secs,
            Phase::ShortBreak => settings.short_break_secs,
            Phase::LongBreak => settings.long_break_secs,
        }
    }

    /// Percentage of the current phase already elapsed, clamped to [0, 100].
    pub fn progress_percent(&self, settings: &TimerSettings) -> f64 {
        let total = self.phase_duration(settings);
        if total == 0 {
            return 100.0;
        }
        let elapsed = total as f64 - self.remaining_secs as f64;
        (elapsed / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// A short to-do item attached to the study session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Local>,
}

impl Task {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            created_at: Local::now(),
        }
    }
}

/// Aggregated counters, recomputed when a session completes or a task
/// changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerStats {
    pub completed_sessions: u32,
    pub focus_minutes: f64,
    pub tasks_completed: u32,
    pub last_session_at: Option<DateTime<Local>>,
}

impl TimerStats {
    /// Counts the completed tasks in `tasks`.
    pub fn count_completed(tasks: &[Task]) -> u32 {
        tasks.iter().filter(|t| t.completed).count() as u32
    }
}

/// Emitted when a phase runs out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionEvent {
    /// A work session finished; `count` is the total completed so far.
    WorkComplete { count: u32, next: Phase },
    BreakComplete,
}

/// Formats time in MM:SS format.
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
