//! Menu building and updating for the tray dropdown.

use muda::accelerator::Accelerator;
use muda::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu};
use studybar::{format_time, Phase, SessionTimer, TimerSettings, TimerState, TimerStats};
use thiserror::Error;

// Menu item IDs as constants
pub const ID_STATUS: &str = "status";
pub const ID_PROGRESS: &str = "progress";
pub const ID_STATS: &str = "stats";
pub const ID_START: &str = "start";
pub const ID_PAUSE: &str = "pause";
pub const ID_RESET: &str = "reset";
pub const ID_SOUND_TOGGLE: &str = "sound_toggle";
pub const ID_NOTIF_TOGGLE: &str = "notif_toggle";
pub const ID_AUTO_BREAKS: &str = "auto_breaks";
pub const ID_AUTO_WORK: &str = "auto_work";
pub const ID_RESET_SETTINGS: &str = "reset_settings";
pub const ID_CLEAR_STATS: &str = "clear_stats";
pub const ID_CLEAR_DONE: &str = "clear_done";
pub const ID_QUIT: &str = "quit";

/// Prefix for per-task check items, followed by the task id.
pub const TASK_PREFIX: &str = "task_";

/// How many tasks fit in the dropdown before the rest are summarized.
const MAX_MENU_TASKS: usize = 10;

const WORK_CHOICES_MINS: [u32; 6] = [15, 20, 25, 30, 45, 60];
const SHORT_CHOICES_MINS: [u32; 4] = [3, 5, 10, 15];
const LONG_CHOICES_MINS: [u32; 4] = [10, 15, 20, 30];
const INTERVAL_CHOICES: [u32; 5] = [2, 3, 4, 5, 6];
const VOLUME_CHOICES_PCT: [u32; 4] = [25, 50, 75, 100];

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Menu error: {0}")]
    Muda(#[from] muda::Error),
}

/// Holds references to menu items that change on every tick.
pub struct MenuItems {
    pub status: MenuItem,
    pub progress: MenuItem,
    pub stats: MenuItem,
    pub start: MenuItem,
    pub pause: MenuItem,
    pub reset: MenuItem,
}

/// Builds the complete menu structure from the current session.
pub fn build_menu(timer: &SessionTimer) -> Result<(Menu, MenuItems), MenuError> {
    let state = timer.state();
    let menu = Menu::new();

    // Status display (disabled, info only)
    let status = info_item(ID_STATUS, format_status(timer));
    menu.append(&status)?;
    let progress = info_item(ID_PROGRESS, format_progress(timer.progress_percent()));
    menu.append(&progress)?;

    menu.append(&PredefinedMenuItem::separator())?;

    let stats = info_item(ID_STATS, format_stats(timer.stats()));
    menu.append(&stats)?;
    menu.append(&build_tasks_submenu(timer)?)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Control buttons
    let start = MenuItem::with_id(
        MenuId::new(ID_START),
        start_label(state, timer.settings()),
        !state.running,
        None::<Accelerator>,
    );
    let pause = MenuItem::with_id(
        MenuId::new(ID_PAUSE),
        "⏸  Pause",
        state.running,
        None::<Accelerator>,
    );
    let reset = MenuItem::with_id(
        MenuId::new(ID_RESET),
        "⏹  Reset",
        can_reset(state),
        None::<Accelerator>,
    );
    menu.append(&start)?;
    menu.append(&pause)?;
    menu.append(&reset)?;

    menu.append(&PredefinedMenuItem::separator())?;

    menu.append(&build_settings_submenu(timer.settings())?)?;

    menu.append(&PredefinedMenuItem::separator())?;

    let quit = MenuItem::with_id(MenuId::new(ID_QUIT), "Quit Studybar", true, None::<Accelerator>);
    menu.append(&quit)?;

    let items = MenuItems {
        status,
        progress,
        stats,
        start,
        pause,
        reset,
    };

    Ok((menu, items))
}

fn info_item(id: &str, text: String) -> MenuItem {
    MenuItem::with_id(MenuId::new(id), text, false, None::<Accelerator>)
}

fn build_tasks_submenu(timer: &SessionTimer) -> Result<Submenu, MenuError> {
    let tasks = timer.sorted_tasks();
    let open = tasks.iter().filter(|t| !t.completed).count();
    let submenu = Submenu::new(format!("📋  Tasks ({} open)", open), true);

    if tasks.is_empty() {
        submenu.append(&MenuItem::new("No tasks yet", false, None::<Accelerator>))?;
        return Ok(submenu);
    }

    for task in tasks.iter().take(MAX_MENU_TASKS) {
        let item = CheckMenuItem::with_id(
            MenuId::new(format!("{}{}", TASK_PREFIX, task.id)),
            &task.text,
            true,
            task.completed,
            None::<Accelerator>,
        );
        submenu.append(&item)?;
    }
    if tasks.len() > MAX_MENU_TASKS {
        submenu.append(&MenuItem::new(
            format!("… and {} more", tasks.len() - MAX_MENU_TASKS),
            false,
            None::<Accelerator>,
        ))?;
    }

    submenu.append(&PredefinedMenuItem::separator())?;
    submenu.append(&MenuItem::with_id(
        MenuId::new(ID_CLEAR_DONE),
        "Clear Completed",
        timer.stats().tasks_completed > 0,
        None::<Accelerator>,
    ))?;
    Ok(submenu)
}

/// Builds a submenu of mutually exclusive choices. Item ids are
/// `{prefix}{value}`; the item matching `current` is checked.
fn choice_submenu(
    title: String,
    prefix: &str,
    choices: &[u32],
    current: u32,
    label: impl Fn(u32) -> String,
    value: impl Fn(u32) -> u32,
) -> Result<Submenu, MenuError> {
    let submenu = Submenu::new(title, true);
    for &choice in choices {
        let item = CheckMenuItem::with_id(
            MenuId::new(format!("{}{}", prefix, value(choice))),
            label(choice),
            true,
            value(choice) == current,
            None::<Accelerator>,
        );
        submenu.append(&item)?;
    }
    Ok(submenu)
}

fn toggle_item(id: &str, text: &str, checked: bool) -> CheckMenuItem {
    CheckMenuItem::with_id(MenuId::new(id), text, true, checked, None::<Accelerator>)
}

fn build_settings_submenu(settings: &TimerSettings) -> Result<Submenu, MenuError> {
    let submenu = Submenu::new("⚙  Settings", true);
    let mins = |m: u32| format!("{} min", m);
    let to_secs = |m: u32| m * 60;

    submenu.append(&choice_submenu(
        format!("Focus: {}", format_time(settings.work_duration_secs)),
        "work_",
        &WORK_CHOICES_MINS,
        settings.work_duration_secs,
        mins,
        to_secs,
    )?)?;
    submenu.append(&choice_submenu(
        format!("Short Break: {}", format_time(settings.short_break_secs)),
        "short_",
        &SHORT_CHOICES_MINS,
        settings.short_break_secs,
        mins,
        to_secs,
    )?)?;
    submenu.append(&choice_submenu(
        format!("Long Break: {}", format_time(settings.long_break_secs)),
        "long_",
        &LONG_CHOICES_MINS,
        settings.long_break_secs,
        mins,
        to_secs,
    )?)?;
    submenu.append(&choice_submenu(
        format!("Long Break After: {} sessions", settings.long_break_interval),
        "interval_",
        &INTERVAL_CHOICES,
        settings.long_break_interval,
        |c| format!("{} sessions", c),
        |c| c,
    )?)?;
    submenu.append(&choice_submenu(
        format!("Volume: {}%", (settings.sound_volume * 100.0).round() as u32),
        "volume_",
        &VOLUME_CHOICES_PCT,
        (settings.sound_volume * 100.0).round() as u32,
        |p| format!("{}%", p),
        |p| p,
    )?)?;

    submenu.append(&PredefinedMenuItem::separator())?;

    submenu.append(&toggle_item(ID_SOUND_TOGGLE, "Sound Enabled", settings.sound_enabled))?;
    submenu.append(&toggle_item(
        ID_NOTIF_TOGGLE,
        "Notifications Enabled",
        settings.notifications_enabled,
    ))?;
    submenu.append(&toggle_item(
        ID_AUTO_BREAKS,
        "Auto-start Breaks",
        settings.auto_start_breaks,
    ))?;
    submenu.append(&toggle_item(
        ID_AUTO_WORK,
        "Auto-start Focus",
        settings.auto_start_work,
    ))?;

    submenu.append(&PredefinedMenuItem::separator())?;

    submenu.append(&MenuItem::with_id(
        MenuId::new(ID_RESET_SETTINGS),
        "Restore Default Settings",
        true,
        None::<Accelerator>,
    ))?;
    submenu.append(&MenuItem::with_id(
        MenuId::new(ID_CLEAR_STATS),
        "Clear Statistics",
        true,
        None::<Accelerator>,
    ))?;

    Ok(submenu)
}

/// Updates the menu items based on the current state.
pub fn update_menu_items(items: &MenuItems, timer: &SessionTimer) {
    let state = timer.state();

    items.status.set_text(format_status(timer));
    items.progress.set_text(format_progress(timer.progress_percent()));
    items.stats.set_text(format_stats(timer.stats()));

    items.start.set_text(start_label(state, timer.settings()));
    items.start.set_enabled(!state.running);
    items.pause.set_enabled(state.running);
    items.reset.set_enabled(can_reset(state));
}

fn start_label(state: &TimerState, settings: &TimerSettings) -> &'static str {
    if state.phase != Phase::Idle && state.remaining_secs < state.phase_duration(settings) {
        return "▶  Resume";
    }
    if state.phase.is_break() {
        "▶  Start Break"
    } else {
        "▶  Start Focus"
    }
}

fn can_reset(state: &TimerState) -> bool {
    state.phase != Phase::Idle
}

/// Formats the status line for the menu.
pub fn format_status(timer: &SessionTimer) -> String {
    let state = timer.state();
    let remaining = timer.formatted_remaining();
    match state.phase {
        Phase::Idle => format!("{} ({})", timer.phase_label(), remaining),
        _ if state.running => format!("⏱  {} - {}", timer.phase_label(), remaining),
        _ => format!("⏸  {} - {} (paused)", timer.phase_label(), remaining),
    }
}

/// Formats the progress bar for the menu.
pub fn format_progress(percent: f64) -> String {
    let filled = (percent / 5.0).round() as usize;
    let empty = 20 - filled.min(20);
    format!(
        "{}{}  {}%",
        "█".repeat(filled.min(20)),
        "░".repeat(empty),
        percent.round() as u32
    )
}

/// Formats the session statistics for the menu.
pub fn format_stats(stats: &TimerStats) -> String {
    let sessions = stats.completed_sessions;
    let books = "📚".repeat(sessions.min(10) as usize);
    let extra = if sessions > 10 {
        format!("+{}", sessions - 10)
    } else {
        String::new()
    };
    let minutes = stats.focus_minutes.round() as u32;

    if sessions == 0 {
        format!("Sessions: —  0 (0 min) · {} tasks done", stats.tasks_completed)
    } else {
        format!(
            "Sessions: {}{}  {} ({} min) · {} tasks done",
            books, extra, sessions, minutes, stats.tasks_completed
        )
    }
}
