//! Studybar - a study session Pomodoro timer.
//!
//! The countdown cycles through work, short-break and long-break phases,
//! keeps a small task list and running statistics, and persists everything
//! to a key-value store after each change so a restart resumes where it
//! left off. Storage, the tick source, sound and notifications are traits
//! injected into [`SessionTimer`], so the whole machine runs headlessly.

pub mod audio;
pub mod machine;
pub mod models;
pub mod notifications;
pub mod persistence;
pub mod scheduler;
pub mod session;
pub mod store;

pub use audio::{AudioError, Cue, Silent, Sound};
#[cfg(feature = "desktop")]
pub use audio::AudioPlayer;
pub use models::{
    format_time, CompletionEvent, Phase, SettingsError, SettingsPatch, Task, Theme,
    TimerSettings, TimerState, TimerStats,
};
pub use notifications::{DesktopNotifier, Notifier};
pub use persistence::Database;
pub use scheduler::{ManualScheduler, Scheduler, ThreadScheduler, TickHandle};
pub use session::SessionTimer;
pub use store::{KeyValueStore, MemoryStore, StoreError};
