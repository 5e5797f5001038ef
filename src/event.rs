//! Menu event handling.

use crate::menu::{
    ID_AUTO_BREAKS, ID_AUTO_WORK, ID_CLEAR_DONE, ID_CLEAR_STATS, ID_NOTIF_TOGGLE, ID_PAUSE,
    ID_QUIT, ID_RESET, ID_RESET_SETTINGS, ID_SOUND_TOGGLE, ID_START, TASK_PREFIX,
};
use muda::MenuEvent;
use studybar::{SessionTimer, SettingsPatch};

/// Result of handling a menu event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// Event handled, nothing visible changed.
    Continue,
    /// User requested quit.
    Quit,
    /// Countdown changed, menu texts need update.
    StateChanged,
    /// Settings or tasks changed, menu needs rebuild.
    MenuChanged,
}

/// What a clicked menu item asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    Start,
    Pause,
    Reset,
    ToggleTask(u64),
    ClearCompletedTasks,
    UpdateSettings(SettingsPatch),
    ToggleSound,
    ToggleNotifications,
    ToggleAutoBreaks,
    ToggleAutoWork,
    ResetSettings,
    ClearStats,
    Quit,
}

/// Handles a menu event and updates the timer accordingly.
pub fn handle_menu_event(timer: &mut SessionTimer, event: MenuEvent) -> EventResult {
    match parse_menu_id(event.id().as_ref()) {
        Some(action) => apply(timer, action),
        None => EventResult::Continue,
    }
}

/// Maps a menu item id to the action it stands for.
pub fn parse_menu_id(id: &str) -> Option<MenuAction> {
    let action = match id {
        ID_START => MenuAction::Start,
        ID_PAUSE => MenuAction::Pause,
        ID_RESET => MenuAction::Reset,
        ID_CLEAR_DONE => MenuAction::ClearCompletedTasks,
        ID_SOUND_TOGGLE => MenuAction::ToggleSound,
        ID_NOTIF_TOGGLE => MenuAction::ToggleNotifications,
        ID_AUTO_BREAKS => MenuAction::ToggleAutoBreaks,
        ID_AUTO_WORK => MenuAction::ToggleAutoWork,
        ID_RESET_SETTINGS => MenuAction::ResetSettings,
        ID_CLEAR_STATS => MenuAction::ClearStats,
        ID_QUIT => MenuAction::Quit,
        _ => return parse_prefixed(id),
    };
    Some(action)
}

/// Handles the `{prefix}{number}` ids of tasks and setting choices.
fn parse_prefixed(id: &str) -> Option<MenuAction> {
    let (prefix, number) = id.split_at(id.find(|c: char| c.is_ascii_digit())?);

    if prefix == TASK_PREFIX {
        return number.parse().ok().map(MenuAction::ToggleTask);
    }

    let value: i64 = number.parse().ok()?;
    let patch = match prefix {
        "work_" => SettingsPatch {
            work_duration_secs: Some(value),
            ..SettingsPatch::default()
        },
        "short_" => SettingsPatch {
            short_break_secs: Some(value),
            ..SettingsPatch::default()
        },
        "long_" => SettingsPatch {
            long_break_secs: Some(value),
            ..SettingsPatch::default()
        },
        "interval_" => SettingsPatch {
            long_break_interval: Some(value),
            ..SettingsPatch::default()
        },
        "volume_" => SettingsPatch {
            sound_volume: Some(value as f32 / 100.0),
            ..SettingsPatch::default()
        },
        _ => return None,
    };
    Some(MenuAction::UpdateSettings(patch))
}

/// Applies an action to the timer.
pub fn apply(timer: &mut SessionTimer, action: MenuAction) -> EventResult {
    let settings = timer.settings().clone();

    match action {
        MenuAction::Start => {
            timer.start();
            EventResult::StateChanged
        }
        MenuAction::Pause => {
            timer.pause();
            EventResult::StateChanged
        }
        MenuAction::Reset => {
            timer.reset();
            EventResult::StateChanged
        }
        MenuAction::ToggleTask(id) => {
            if timer.toggle_task(id) {
                EventResult::MenuChanged
            } else {
                EventResult::Continue
            }
        }
        MenuAction::ClearCompletedTasks => {
            timer.clear_completed_tasks();
            EventResult::MenuChanged
        }
        MenuAction::UpdateSettings(patch) => match timer.update_settings(&patch) {
            Ok(()) => EventResult::MenuChanged,
            Err(_) => EventResult::Continue,
        },
        MenuAction::ToggleSound => apply(
            timer,
            MenuAction::UpdateSettings(SettingsPatch {
                sound_enabled: Some(!settings.sound_enabled),
                ..SettingsPatch::default()
            }),
        ),
        MenuAction::ToggleNotifications => apply(
            timer,
            MenuAction::UpdateSettings(SettingsPatch {
                notifications_enabled: Some(!settings.notifications_enabled),
                ..SettingsPatch::default()
            }),
        ),
        MenuAction::ToggleAutoBreaks => apply(
            timer,
            MenuAction::UpdateSettings(SettingsPatch {
                auto_start_breaks: Some(!settings.auto_start_breaks),
                ..SettingsPatch::default()
            }),
        ),
        MenuAction::ToggleAutoWork => apply(
            timer,
            MenuAction::UpdateSettings(SettingsPatch {
                auto_start_work: Some(!settings.auto_start_work),
                ..SettingsPatch::default()
            }),
        ),
        MenuAction::ResetSettings => {
            timer.reset_settings();
            EventResult::MenuChanged
        }
        MenuAction::ClearStats => {
            timer.clear_stats();
            EventResult::MenuChanged
        }
        MenuAction::Quit => EventResult::Quit,
    }
}
