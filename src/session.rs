//! The study session timer: countdown machine, task list and statistics
//! wired to storage, a tick source, sound and notifications.

use crate::audio::{Cue, Sound};
use crate::machine;
use crate::models::{
    format_time, CompletionEvent, Phase, SettingsError, SettingsPatch, Task, TimerSettings,
    TimerState, TimerStats,
};
use crate::notifications::Notifier;
use crate::scheduler::{Scheduler, TickHandle};
use crate::store::{
    KeyValueStore, StoreError, SETTINGS_KEY, STATE_KEY, STATS_KEY, TASKS_KEY, TASK_COUNTER_KEY,
};
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Reverse;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval between ticks while the countdown runs.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the countdown state, settings, tasks and statistics.
///
/// Every public operation either succeeds or reports a structured error;
/// storage and playback failures are logged and never surface as panics.
/// State restored from storage always comes back paused.
pub struct SessionTimer {
    settings: TimerSettings,
    state: TimerState,
    tasks: Vec<Task>,
    stats: TimerStats,
    next_task_id: u64,
    tick_handle: Option<TickHandle>,
    store: Box<dyn KeyValueStore>,
    scheduler: Box<dyn Scheduler>,
    sound: Box<dyn Sound>,
    notifier: Box<dyn Notifier>,
}

impl SessionTimer {
    /// Creates a timer, seeding it from whatever `store` holds.
    pub fn new(
        store: impl KeyValueStore + 'static,
        scheduler: impl Scheduler + 'static,
        sound: impl Sound + 'static,
        notifier: impl Notifier + 'static,
    ) -> Self {
        let settings = match load::<TimerSettings>(&store, SETTINGS_KEY) {
            Some(settings) => match settings.validate() {
                Ok(()) => settings,
                Err(e) => {
                    warn!("Persisted settings are invalid, using defaults: {}", e);
                    TimerSettings::default()
                }
            },
            None => TimerSettings::default(),
        };

        let stats = load::<TimerStats>(&store, STATS_KEY).unwrap_or_default();
        let mut state = load::<TimerState>(&store, STATE_KEY).unwrap_or_else(|| {
            // The counters also live in the stats blob
            let mut fresh = TimerState::new(&settings);
            fresh.completed_sessions = stats.completed_sessions;
            fresh.focus_minutes = stats.focus_minutes;
            fresh
        });
        // Nothing is ticking yet after a cold start
        state.running = false;

        let mut tasks = load::<Vec<Task>>(&store, TASKS_KEY).unwrap_or_default();
        let stored_counter = load::<u64>(&store, TASK_COUNTER_KEY).unwrap_or(1);
        let next_task_id = match tasks.iter().map(|t| t.id).max().unwrap_or(0).checked_add(1) {
            Some(after_max) => after_max.max(stored_counter),
            None => {
                warn!("Persisted task ids are exhausted, renumbering");
                renumber(&mut tasks)
            }
        };

        let mut timer = Self {
            settings,
            state,
            tasks,
            stats,
            next_task_id,
            tick_handle: None,
            store: Box::new(store),
            scheduler: Box::new(scheduler),
            sound: Box::new(sound),
            notifier: Box::new(notifier),
        };
        timer.sync_stats();
        debug!(
            phase = ?timer.state.phase,
            remaining = timer.state.remaining_secs,
            tasks = timer.tasks.len(),
            "session restored"
        );
        timer
    }

    /// Starts counting, entering a work phase from idle. Calling it while
    /// already running changes nothing.
    pub fn start(&mut self) {
        if self.state.running && self.tick_handle.is_some() {
            return;
        }
        self.state = machine::start(&self.state, &self.settings);
        self.arm();
        debug!(phase = ?self.state.phase, remaining = self.state.remaining_secs, "started");
        self.persist();
    }

    /// Stops counting. The tick source is cancelled before the state
    /// changes, so no tick can land after this returns.
    pub fn pause(&mut self) {
        self.disarm();
        self.state = machine::pause(&self.state);
        debug!(remaining = self.state.remaining_secs, "paused");
        self.persist();
    }

    /// Returns to idle with a full work duration. Statistics are kept.
    pub fn reset(&mut self) {
        self.disarm();
        self.state = machine::reset(&self.state, &self.settings);
        debug!("reset");
        self.persist();
    }

    /// Handles one tick from `handle`. Ticks from any handle other than the
    /// one currently armed are ignored.
    pub fn tick(&mut self, handle: TickHandle) -> Option<CompletionEvent> {
        if self.tick_handle != Some(handle) {
            debug!(handle = handle.id(), "ignoring stale tick");
            return None;
        }

        let transition = machine::tick(&self.state, &self.settings);
        self.state = transition.state;

        let event = transition.completed;
        if let Some(event) = event {
            self.complete_phase(event);
        }
        self.persist();
        event
    }

    fn complete_phase(&mut self, event: CompletionEvent) {
        match event {
            CompletionEvent::WorkComplete { count, next } => {
                self.stats.last_session_at = Some(Local::now());
                info!(count, next = ?next, "work session complete");
            }
            CompletionEvent::BreakComplete => info!("break over"),
        }
        self.sync_stats();

        if !self.state.running {
            self.disarm();
        }

        if self.settings.sound_enabled {
            let cue = match event {
                CompletionEvent::WorkComplete { .. } => Cue::WorkComplete,
                CompletionEvent::BreakComplete => Cue::BreakComplete,
            };
            if let Err(e) = self.sound.play(cue, self.settings.sound_volume) {
                warn!("Failed to play alert: {}", e);
                self.toast(&format!("Could not play alert sound: {}", e));
            }
        }

        if self.settings.notifications_enabled {
            self.notifier.phase_complete(&event, &self.settings);
        }
    }

    /// Adds a task. Blank text is ignored and returns `None`.
    pub fn add_task(&mut self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let id = self.next_task_id;
        let Some(next) = id.checked_add(1) else {
            warn!("Task ids are exhausted, not adding task");
            return None;
        };
        self.next_task_id = next;
        self.tasks.push(Task::new(id, text));
        self.sync_stats();
        self.persist();
        Some(id)
    }

    /// Flips the completed flag. Returns false if no task has `id`.
    pub fn toggle_task(&mut self, id: u64) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.completed = !task.completed;
        self.sync_stats();
        self.persist();
        true
    }

    /// Removes a task. Returns false if no task has `id`.
    pub fn delete_task(&mut self, id: u64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return false;
        }
        self.sync_stats();
        self.persist();
        true
    }

    /// Removes every completed task, returning how many were removed.
    pub fn clear_completed_tasks(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            self.sync_stats();
            self.persist();
        }
        removed
    }

    /// Applies a partial settings change. On error the previous settings
    /// stay in effect and the message is also shown to the user.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<(), SettingsError> {
        match patch.apply(&self.settings) {
            Ok(settings) => {
                self.replace_settings(settings);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected settings update: {}", e);
                self.toast(&e.to_string());
                Err(e)
            }
        }
    }

    /// Restores the default settings.
    pub fn reset_settings(&mut self) {
        self.replace_settings(TimerSettings::default());
    }

    fn replace_settings(&mut self, settings: TimerSettings) {
        self.settings = settings;
        if let Err(e) = self.save(SETTINGS_KEY, &self.settings) {
            warn!("Failed to save settings: {}", e);
        }
        // An untouched idle countdown follows the configured work length
        if self.state.phase == Phase::Idle && !self.state.running {
            self.state.remaining_secs = self.settings.work_duration_secs;
            self.persist();
        }
    }

    /// Zeroes the cumulative session statistics.
    pub fn clear_stats(&mut self) {
        self.state.completed_sessions = 0;
        self.state.focus_minutes = 0.0;
        self.stats.last_session_at = None;
        self.sync_stats();
        self.persist();
    }

    /// Cancels any pending tick, e.g. when the timer view goes away.
    pub fn shutdown(&mut self) {
        self.disarm();
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn stats(&self) -> &TimerStats {
        &self.stats
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks for display: open tasks first, newest first within each group.
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut sorted: Vec<&Task> = self.tasks.iter().collect();
        sorted.sort_by_key(|t| (t.completed, Reverse(t.created_at), Reverse(t.id)));
        sorted
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn progress_percent(&self) -> f64 {
        self.state.progress_percent(&self.settings)
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_remaining(&self) -> String {
        format_time(self.state.remaining_secs)
    }

    pub fn phase_label(&self) -> &'static str {
        self.state.phase.label()
    }

    /// Shows `text` to the user unless notifications are turned off.
    fn toast(&self, text: &str) {
        if self.settings.notifications_enabled {
            self.notifier.message(text);
        }
    }

    fn arm(&mut self) {
        if self.tick_handle.is_none() {
            self.tick_handle = Some(self.scheduler.schedule(TICK_INTERVAL));
        }
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.tick_handle.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn sync_stats(&mut self) {
        self.stats.completed_sessions = self.state.completed_sessions;
        self.stats.focus_minutes = self.state.focus_minutes;
        self.stats.tasks_completed = TimerStats::count_completed(&self.tasks);
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)
    }

    /// Writes the countdown, tasks and stats snapshot.
    fn persist(&self) {
        let result = self
            .save(STATE_KEY, &self.state)
            .and_then(|_| self.save(TASKS_KEY, &self.tasks))
            .and_then(|_| self.save(TASK_COUNTER_KEY, &self.next_task_id))
            .and_then(|_| self.save(STATS_KEY, &self.stats));
        if let Err(e) = result {
            warn!("Failed to persist session: {}", e);
        }
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Gives `tasks` the ids `1..=n` in storage order and returns the next free id.
fn renumber(tasks: &mut [Task]) -> u64 {
    for (id, task) in (1..).zip(tasks.iter_mut()) {
        task.id = id;
    }
    tasks.len() as u64 + 1
}

fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, "Discarding unparsable persisted value: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, "Failed to read persisted value: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioError;
    use crate::persistence::Database;
    use crate::scheduler::ManualScheduler;
    use crate::store::MemoryStore;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingSound {
        played: Rc<RefCell<Vec<(Cue, f32)>>>,
        fail: Rc<Cell<bool>>,
    }

    impl Sound for RecordingSound {
        fn play(&self, cue: Cue, volume: f32) -> Result<(), AudioError> {
            if self.fail.get() {
                return Err(AudioError::Unavailable("autoplay blocked".to_string()));
            }
            self.played.borrow_mut().push((cue, volume));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        events: Rc<RefCell<Vec<CompletionEvent>>>,
        messages: Rc<RefCell<Vec<String>>>,
    }

    impl Notifier for RecordingNotifier {
        fn phase_complete(&self, event: &CompletionEvent, _settings: &TimerSettings) {
            self.events.borrow_mut().push(*event);
        }

        fn message(&self, text: &str) {
            self.messages.borrow_mut().push(text.to_string());
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("disk unplugged".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk unplugged".to_string()))
        }
    }

    struct Harness {
        timer: SessionTimer,
        store: MemoryStore,
        scheduler: ManualScheduler,
        sound: RecordingSound,
        notifier: RecordingNotifier,
    }

    impl Harness {
        fn with_store(store: MemoryStore) -> Self {
            let scheduler = ManualScheduler::new();
            let sound = RecordingSound::default();
            let notifier = RecordingNotifier::default();
            let timer = SessionTimer::new(
                store.clone(),
                scheduler.clone(),
                sound.clone(),
                notifier.clone(),
            );
            Self {
                timer,
                store,
                scheduler,
                sound,
                notifier,
            }
        }

        fn new() -> Self {
            Self::with_store(MemoryStore::new())
        }

        /// Delivers `n` ticks from the armed handle, stopping early if the
        /// timer disarms.
        fn tick_n(&mut self, n: u32) -> Vec<CompletionEvent> {
            let mut events = Vec::new();
            for _ in 0..n {
                let Some(handle) = self.scheduler.current() else {
                    break;
                };
                if let Some(event) = self.timer.tick(handle) {
                    events.push(event);
                }
            }
            events
        }

        fn set(&mut self, patch: SettingsPatch) {
            self.timer.update_settings(&patch).unwrap();
        }
    }

    #[test]
    fn test_initial_state() {
        let h = Harness::new();
        assert_eq!(h.timer.state().phase, Phase::Idle);
        assert_eq!(h.timer.state().remaining_secs, 1500);
        assert!(!h.timer.is_running());
        assert_eq!(h.timer.phase_label(), "Ready to Focus");
        assert_eq!(h.timer.formatted_remaining(), "25:00");
        assert_eq!(h.timer.progress_percent(), 0.0);
        assert!(h.scheduler.active().is_empty());
    }

    #[test]
    fn test_start_arms_one_tick_source() {
        let mut h = Harness::new();
        h.timer.start();
        assert_eq!(h.timer.state().phase, Phase::Work);
        assert!(h.timer.is_running());
        assert_eq!(h.timer.phase_label(), "Focus Time");
        assert!(h.scheduler.current().is_some());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut h = Harness::new();
        h.timer.start();
        h.tick_n(5);
        h.timer.start();
        h.timer.start();

        assert_eq!(h.timer.state().remaining_secs, 1495);
        assert_eq!(h.scheduler.scheduled_count(), 1);
        assert_eq!(h.scheduler.active().len(), 1);
    }

    #[test]
    fn test_pause_preserves_remaining_time() {
        let mut h = Harness::new();
        h.timer.start();
        let handle = h.scheduler.current().unwrap();
        h.tick_n(2);
        h.timer.pause();

        assert!(!h.timer.is_running());
        assert_eq!(h.timer.state().remaining_secs, 1498);
        assert!(h.scheduler.active().is_empty());

        // A tick already in flight when pause ran is dropped
        assert!(h.timer.tick(handle).is_none());
        assert_eq!(h.timer.state().remaining_secs, 1498);

        h.timer.start();
        assert_eq!(h.timer.state().remaining_secs, 1498);
        h.tick_n(1);
        assert_eq!(h.timer.state().remaining_secs, 1497);
    }

    #[test]
    fn test_stale_handle_after_restart_is_ignored() {
        let mut h = Harness::new();
        h.timer.start();
        let old = h.scheduler.current().unwrap();
        h.timer.pause();
        h.timer.start();
        let new = h.scheduler.current().unwrap();
        assert_ne!(old, new);

        h.timer.tick(old);
        assert_eq!(h.timer.state().remaining_secs, 1500);
        h.timer.tick(new);
        assert_eq!(h.timer.state().remaining_secs, 1499);
    }

    #[test]
    fn test_reset_keeps_statistics() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            work_duration_secs: Some(60),
            ..SettingsPatch::default()
        });
        h.timer.start();
        h.tick_n(60);
        h.timer.start();
        h.tick_n(10);

        h.timer.reset();
        let state = h.timer.state();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.remaining_secs, 60);
        assert!(!state.running);
        assert_eq!(state.completed_sessions, 1);
        assert!((state.focus_minutes - 1.0).abs() < 1e-9);
        assert_eq!(h.timer.stats().completed_sessions, 1);
        assert!(h.scheduler.active().is_empty());
    }

    #[test]
    fn test_clear_stats() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            work_duration_secs: Some(60),
            ..SettingsPatch::default()
        });
        h.timer.start();
        h.tick_n(60);
        assert!(h.timer.stats().last_session_at.is_some());

        h.timer.clear_stats();
        assert_eq!(h.timer.state().completed_sessions, 0);
        assert_eq!(h.timer.stats().completed_sessions, 0);
        assert_eq!(h.timer.stats().focus_minutes, 0.0);
        assert!(h.timer.stats().last_session_at.is_none());
        // The countdown itself is untouched
        assert_eq!(h.timer.state().phase, Phase::ShortBreak);
    }

    #[test]
    fn test_scenario_first_session_rolls_into_short_break() {
        let mut h = Harness::new();
        h.timer.start();
        let events = h.tick_n(1500);

        let state = h.timer.state();
        assert_eq!(state.phase, Phase::ShortBreak);
        assert_eq!(state.remaining_secs, 300);
        assert_eq!(state.completed_sessions, 1);
        assert!((state.focus_minutes - 25.0).abs() < 1e-9);
        assert_eq!(
            events,
            vec![CompletionEvent::WorkComplete {
                count: 1,
                next: Phase::ShortBreak
            }]
        );

        // No auto-start: the break waits for the user
        assert!(!state.running);
        assert!(h.scheduler.active().is_empty());
        assert_eq!(h.timer.phase_label(), "Short Break");
        assert_eq!(h.timer.formatted_remaining(), "05:00");
    }

    #[test]
    fn test_scenario_fourth_session_earns_long_break() {
        let mut h = Harness::new();
        h.timer.start();
        h.tick_n(1500);

        for _ in 0..3 {
            // short break
            h.timer.start();
            h.tick_n(300);
            assert_eq!(h.timer.state().phase, Phase::Work);
            // work
            h.timer.start();
            h.tick_n(1500);
        }

        let state = h.timer.state();
        assert_eq!(state.completed_sessions, 4);
        assert_eq!(state.phase, Phase::LongBreak);
        assert_eq!(state.remaining_secs, 900);
        assert!((state.focus_minutes - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_break_cadence_with_auto_start() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            work_duration_secs: Some(3),
            short_break_secs: Some(2),
            long_break_secs: Some(5),
            long_break_interval: Some(3),
            auto_start_breaks: Some(true),
            auto_start_work: Some(true),
            ..SettingsPatch::default()
        });
        h.timer.start();
        let handle = h.scheduler.current().unwrap();

        let events = h.tick_n(200);
        let work_events: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                CompletionEvent::WorkComplete { count, next } => Some((*count, *next)),
                CompletionEvent::BreakComplete => None,
            })
            .collect();
        assert!(!work_events.is_empty());
        for (count, next) in work_events {
            let expected = if count % 3 == 0 {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            };
            assert_eq!(next, expected, "session {count}");
        }

        // Auto-start never re-arms, the same source keeps ticking
        assert_eq!(h.scheduler.current(), Some(handle));
        assert_eq!(h.scheduler.scheduled_count(), 1);
    }

    #[test]
    fn test_never_negative_time() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            work_duration_secs: Some(2),
            short_break_secs: Some(1),
            long_break_secs: Some(1),
            auto_start_breaks: Some(true),
            auto_start_work: Some(true),
            ..SettingsPatch::default()
        });
        h.timer.start();
        for _ in 0..50 {
            h.tick_n(1);
            assert!(h.timer.state().remaining_secs > 0);
            assert!(h.timer.progress_percent() >= 0.0);
            assert!(h.timer.progress_percent() <= 100.0);
        }
    }

    #[test]
    fn test_completion_plays_sound_and_notifies() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            work_duration_secs: Some(2),
            short_break_secs: Some(1),
            sound_volume: Some(0.8),
            ..SettingsPatch::default()
        });
        h.timer.start();
        h.tick_n(2);
        h.timer.start();
        h.tick_n(1);

        assert_eq!(
            *h.sound.played.borrow(),
            vec![(Cue::WorkComplete, 0.8), (Cue::BreakComplete, 0.8)]
        );
        assert_eq!(
            *h.notifier.events.borrow(),
            vec![
                CompletionEvent::WorkComplete {
                    count: 1,
                    next: Phase::ShortBreak
                },
                CompletionEvent::BreakComplete
            ]
        );
    }

    #[test]
    fn test_sound_and_notifications_respect_settings() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            work_duration_secs: Some(1),
            sound_enabled: Some(false),
            notifications_enabled: Some(false),
            ..SettingsPatch::default()
        });
        h.timer.start();
        h.tick_n(1);

        assert_eq!(h.timer.state().completed_sessions, 1);
        assert!(h.sound.played.borrow().is_empty());
        assert!(h.notifier.events.borrow().is_empty());
    }

    #[test]
    fn test_sound_failure_is_a_warning() {
        let mut h = Harness::new();
        h.sound.fail.set(true);
        h.set(SettingsPatch {
            work_duration_secs: Some(1),
            auto_start_breaks: Some(true),
            ..SettingsPatch::default()
        });
        h.timer.start();
        h.tick_n(1);

        assert_eq!(h.timer.state().phase, Phase::ShortBreak);
        assert!(h.timer.is_running());
        let messages = h.notifier.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("autoplay blocked"));
        // The phase-complete notification still goes out
        assert_eq!(h.notifier.events.borrow().len(), 1);
    }

    #[test]
    fn test_round_trip_persistence() {
        let store = MemoryStore::new();
        let mut h = Harness::with_store(store.clone());
        h.set(SettingsPatch {
            work_duration_secs: Some(120),
            ..SettingsPatch::default()
        });
        h.timer.start();
        h.tick_n(120);
        h.timer.start();
        h.tick_n(17);
        let before = h.timer.state().clone();
        assert!(before.running);
        drop(h);

        let reloaded = Harness::with_store(store);
        let after = reloaded.timer.state();
        assert_eq!(after.phase, before.phase);
        assert_eq!(after.remaining_secs, before.remaining_secs);
        assert_eq!(after.completed_sessions, before.completed_sessions);
        assert_eq!(after.focus_minutes, before.focus_minutes);
        // Cold reload comes back paused
        assert!(!after.running);
        assert!(reloaded.scheduler.active().is_empty());
        assert_eq!(reloaded.timer.settings().work_duration_secs, 120);
        assert_eq!(reloaded.timer.stats().completed_sessions, 1);
    }

    #[test]
    fn test_every_tick_is_persisted() {
        let mut h = Harness::new();
        h.timer.start();
        h.tick_n(3);
        let json = h.store.get(STATE_KEY).unwrap().unwrap();
        let saved: TimerState = serde_json::from_str(&json).unwrap();
        assert_eq!(saved.remaining_secs, 1497);
        assert!(saved.running);
    }

    #[test]
    fn test_malformed_persisted_data_falls_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(STATE_KEY, "{not json").unwrap();
        store.set(SETTINGS_KEY, "\"not settings\"").unwrap();
        store.set(TASKS_KEY, "\"nope\"").unwrap();
        store.set(STATS_KEY, "42").unwrap();

        let h = Harness::with_store(store);
        assert_eq!(h.timer.state(), &TimerState::new(&TimerSettings::default()));
        assert_eq!(h.timer.settings(), &TimerSettings::default());
        assert!(h.timer.tasks().is_empty());
        assert_eq!(h.timer.stats(), &TimerStats::default());
    }

    #[test]
    fn test_out_of_range_persisted_settings_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, r#"{"workDurationSecs": 0, "soundVolume": 3.0}"#)
            .unwrap();
        let h = Harness::with_store(store);
        assert_eq!(h.timer.settings(), &TimerSettings::default());
    }

    #[test]
    fn test_corrupt_state_keeps_persisted_stats() {
        let store = MemoryStore::new();
        store.set(STATE_KEY, "{not json").unwrap();
        store
            .set(
                STATS_KEY,
                r#"{"completedSessions":7,"focusMinutes":175.0,"tasksCompleted":0}"#,
            )
            .unwrap();

        let mut h = Harness::with_store(store.clone());
        assert_eq!(h.timer.state().phase, Phase::Idle);
        assert_eq!(h.timer.state().completed_sessions, 7);
        assert_eq!(h.timer.stats().completed_sessions, 7);
        assert_eq!(h.timer.stats().focus_minutes, 175.0);

        h.timer.add_task("x");
        let saved: TimerStats =
            serde_json::from_str(&store.get(STATS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved.completed_sessions, 7);
        assert_eq!(saved.focus_minutes, 175.0);
    }

    #[test]
    fn test_corrupt_tasks_keep_other_blobs() {
        let store = MemoryStore::new();
        {
            let mut h = Harness::with_store(store.clone());
            h.set(SettingsPatch {
                work_duration_secs: Some(600),
                ..SettingsPatch::default()
            });
            h.timer.add_task("kept until corrupted");
            h.timer.start();
            h.timer.pause();
        }
        store.set(TASKS_KEY, "{not json").unwrap();

        let h = Harness::with_store(store);
        assert!(h.timer.tasks().is_empty());
        assert_eq!(h.timer.settings().work_duration_secs, 600);
        assert_eq!(h.timer.state().phase, Phase::Work);
        assert_eq!(h.timer.state().remaining_secs, 600);
    }

    #[test]
    fn test_corrupt_settings_keep_state_and_tasks() {
        let store = MemoryStore::new();
        {
            let mut h = Harness::with_store(store.clone());
            h.timer.add_task("read");
            h.timer.start();
            h.tick_n(10);
        }
        store.set(SETTINGS_KEY, "[").unwrap();

        let h = Harness::with_store(store);
        assert_eq!(h.timer.settings(), &TimerSettings::default());
        assert_eq!(h.timer.state().remaining_secs, 1490);
        assert_eq!(h.timer.tasks()[0].text, "read");
    }

    #[test]
    fn test_exhausted_task_ids_are_renumbered() {
        let store = MemoryStore::new();
        store
            .set(
                TASKS_KEY,
                r#"[{"id":18446744073709551615,"text":"edge","completed":false,"createdAt":"2026-01-05T10:00:00+00:00"}]"#,
            )
            .unwrap();

        let mut h = Harness::with_store(store);
        assert_eq!(h.timer.tasks()[0].id, 1);
        assert_eq!(h.timer.add_task("next"), Some(2));
    }

    #[test]
    fn test_add_task_stops_at_last_id() {
        let store = MemoryStore::new();
        store.set(TASK_COUNTER_KEY, &u64::MAX.to_string()).unwrap();

        let mut h = Harness::with_store(store);
        assert_eq!(h.timer.add_task("no room"), None);
        assert!(h.timer.tasks().is_empty());
    }

    #[test]
    fn test_deleted_task_id_is_not_reused_after_reload() {
        let store = MemoryStore::new();
        let mut h = Harness::with_store(store.clone());
        h.timer.add_task("one");
        let newest = h.timer.add_task("two").unwrap();
        h.timer.delete_task(newest);
        drop(h);

        let mut reloaded = Harness::with_store(store);
        let id = reloaded.timer.add_task("three").unwrap();
        assert!(id > newest);
    }

    #[test]
    fn test_session_counter_saturates() {
        let store = MemoryStore::new();
        store
            .set(
                STATE_KEY,
                r#"{"phase":"work","remainingSecs":1,"running":false,"completedSessions":4294967295,"focusMinutes":0.0}"#,
            )
            .unwrap();

        let mut h = Harness::with_store(store);
        h.timer.start();
        let events = h.tick_n(1);
        assert_eq!(events.len(), 1);
        assert_eq!(h.timer.state().completed_sessions, u32::MAX);
    }

    #[test]
    fn test_messages_respect_notification_setting() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            notifications_enabled: Some(false),
            ..SettingsPatch::default()
        });
        let result = h.timer.update_settings(&SettingsPatch {
            long_break_interval: Some(0),
            ..SettingsPatch::default()
        });
        assert!(result.is_err());
        assert!(h.notifier.messages.borrow().is_empty());
    }

    #[test]
    fn test_broken_store_never_blocks_the_timer() {
        let scheduler = ManualScheduler::new();
        let mut timer = SessionTimer::new(
            BrokenStore,
            scheduler.clone(),
            RecordingSound::default(),
            RecordingNotifier::default(),
        );
        assert_eq!(timer.state().phase, Phase::Idle);

        timer.start();
        timer.tick(scheduler.current().unwrap());
        assert_eq!(timer.state().remaining_secs, 1499);
        assert!(timer.add_task("still works").is_some());
    }

    #[test]
    fn test_add_task_rejects_blank_text() {
        let mut h = Harness::new();
        assert_eq!(h.timer.add_task(""), None);
        assert_eq!(h.timer.add_task("   "), None);
        assert_eq!(h.timer.add_task("\t\n"), None);
        assert!(h.timer.tasks().is_empty());

        let id = h.timer.add_task("  buy milk  ").unwrap();
        assert_eq!(h.timer.tasks().len(), 1);
        assert_eq!(h.timer.tasks()[0].id, id);
        assert_eq!(h.timer.tasks()[0].text, "buy milk");
        assert!(!h.timer.tasks()[0].completed);
    }

    #[test]
    fn test_task_toggle_and_delete_update_stats() {
        let mut h = Harness::new();
        let id = h.timer.add_task("Write report").unwrap();

        assert!(h.timer.toggle_task(id));
        assert_eq!(h.timer.stats().tasks_completed, 1);

        assert!(h.timer.delete_task(id));
        assert!(h.timer.tasks().is_empty());
        assert_eq!(h.timer.stats().tasks_completed, 0);

        let saved: TimerStats =
            serde_json::from_str(&h.store.get(STATS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved.tasks_completed, 0);
    }

    #[test]
    fn test_unknown_task_id_is_noop() {
        let mut h = Harness::new();
        h.timer.add_task("a");
        assert!(!h.timer.toggle_task(999));
        assert!(!h.timer.delete_task(999));
        assert_eq!(h.timer.tasks().len(), 1);
        assert_eq!(h.timer.stats().tasks_completed, 0);
    }

    #[test]
    fn test_clear_completed_tasks() {
        let mut h = Harness::new();
        let a = h.timer.add_task("a").unwrap();
        h.timer.add_task("b");
        let c = h.timer.add_task("c").unwrap();
        h.timer.toggle_task(a);
        h.timer.toggle_task(c);

        assert_eq!(h.timer.clear_completed_tasks(), 2);
        assert_eq!(h.timer.tasks().len(), 1);
        assert_eq!(h.timer.tasks()[0].text, "b");
        assert_eq!(h.timer.stats().tasks_completed, 0);
        assert_eq!(h.timer.clear_completed_tasks(), 0);
    }

    #[test]
    fn test_sorted_tasks_open_first_newest_first() {
        let mut h = Harness::new();
        let first = h.timer.add_task("first").unwrap();
        h.timer.add_task("second");
        h.timer.add_task("third");
        h.timer.toggle_task(first);

        let order: Vec<&str> = h
            .timer
            .sorted_tasks()
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(order, vec!["third", "second", "first"]);
        // Storage order is untouched
        assert_eq!(h.timer.tasks()[0].text, "first");
    }

    #[test]
    fn test_task_ids_continue_after_reload() {
        let store = MemoryStore::new();
        let mut h = Harness::with_store(store.clone());
        h.timer.add_task("one");
        let second = h.timer.add_task("two").unwrap();
        drop(h);

        let mut reloaded = Harness::with_store(store);
        assert_eq!(reloaded.timer.tasks().len(), 2);
        let third = reloaded.timer.add_task("three").unwrap();
        assert!(third > second);
    }

    #[test]
    fn test_update_settings_rejects_invalid_values() {
        let mut h = Harness::new();
        let result = h.timer.update_settings(&SettingsPatch {
            work_duration_secs: Some(-5),
            ..SettingsPatch::default()
        });

        assert!(matches!(
            result,
            Err(SettingsError::InvalidDuration { value: -5, .. })
        ));
        assert_eq!(h.timer.settings().work_duration_secs, 1500);
        assert_eq!(h.notifier.messages.borrow().len(), 1);
        assert!(h.store.get(SETTINGS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_settings_persists_and_reseeds_idle_countdown() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            work_duration_secs: Some(3000),
            ..SettingsPatch::default()
        });
        assert_eq!(h.timer.state().remaining_secs, 3000);
        assert_eq!(h.timer.formatted_remaining(), "50:00");

        let saved: TimerSettings =
            serde_json::from_str(&h.store.get(SETTINGS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved.work_duration_secs, 3000);
    }

    #[test]
    fn test_update_settings_mid_phase_keeps_remaining() {
        let mut h = Harness::new();
        h.timer.start();
        h.tick_n(100);
        h.set(SettingsPatch {
            work_duration_secs: Some(600),
            ..SettingsPatch::default()
        });
        assert_eq!(h.timer.state().remaining_secs, 1400);
        assert_eq!(h.timer.progress_percent(), 0.0);
    }

    #[test]
    fn test_reset_settings() {
        let mut h = Harness::new();
        h.set(SettingsPatch {
            long_break_interval: Some(2),
            sound_volume: Some(0.1),
            ..SettingsPatch::default()
        });
        h.timer.reset_settings();
        assert_eq!(h.timer.settings(), &TimerSettings::default());

        let saved: TimerSettings =
            serde_json::from_str(&h.store.get(SETTINGS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved, TimerSettings::default());
    }

    #[test]
    fn test_shutdown_and_drop_cancel_ticks() {
        let mut h = Harness::new();
        h.timer.start();
        h.timer.shutdown();
        assert!(h.scheduler.active().is_empty());

        let scheduler = ManualScheduler::new();
        {
            let mut timer = SessionTimer::new(
                MemoryStore::new(),
                scheduler.clone(),
                RecordingSound::default(),
                RecordingNotifier::default(),
            );
            timer.start();
            assert_eq!(scheduler.active().len(), 1);
        }
        assert!(scheduler.active().is_empty());
    }

    #[test]
    fn test_sqlite_backed_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studybar.db");

        {
            let mut timer = SessionTimer::new(
                Database::open(&path).unwrap(),
                ManualScheduler::new(),
                RecordingSound::default(),
                RecordingNotifier::default(),
            );
            timer.add_task("Revise chapter 3");
            timer.start();
            timer.pause();
        }

        let timer = SessionTimer::new(
            Database::open(&path).unwrap(),
            ManualScheduler::new(),
            RecordingSound::default(),
            RecordingNotifier::default(),
        );
        assert_eq!(timer.state().phase, Phase::Work);
        assert_eq!(timer.tasks()[0].text, "Revise chapter 3");
    }
}
