//! Studybar - a menubar study session timer.
//!
//! Any command-line arguments are added as tasks before the menu appears,
//! e.g. `studybar "Read chapter 4" "Practice problems"`.

use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use muda::MenuEvent;
use tracing::{info, warn};
use tray_icon::{TrayIcon, TrayIconBuilder};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

mod event;
mod menu;
mod tray;

use event::EventResult;
use menu::MenuItems;
use studybar::{
    AudioPlayer, Database, DesktopNotifier, SessionTimer, Silent, ThreadScheduler, TickHandle,
};

/// How often the event loop wakes up to drain ticks and menu clicks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Application handler for the winit event loop.
struct Studybar {
    timer: SessionTimer,
    tray: Option<TrayIcon>,
    menu_items: Option<MenuItems>,
    tick_rx: Receiver<TickHandle>,
}

impl Studybar {
    fn new(timer: SessionTimer, tray: TrayIcon, tick_rx: Receiver<TickHandle>) -> Self {
        Self {
            timer,
            tray: Some(tray),
            menu_items: None,
            tick_rx,
        }
    }

    fn set_menu_items(&mut self, items: MenuItems) {
        self.menu_items = Some(items);
    }

    fn update_menu(&self) {
        if let Some(ref items) = self.menu_items {
            menu::update_menu_items(items, &self.timer);
        }
    }

    fn rebuild_menu(&mut self) {
        match menu::build_menu(&self.timer) {
            Ok((built_menu, items)) => {
                if let Some(ref icon) = self.tray {
                    icon.set_menu(Some(Box::new(built_menu)));
                }
                self.menu_items = Some(items);
            }
            Err(e) => warn!("Failed to rebuild menu: {}", e),
        }
    }

    fn update_tray_title(&self) {
        if let Some(ref icon) = self.tray {
            icon.set_title(Some(tray::format_tray_title(&self.timer)));
        }
    }

    fn process_ticks(&mut self) {
        let mut ticked = false;
        let mut completed = false;
        while let Ok(handle) = self.tick_rx.try_recv() {
            ticked = true;
            completed |= self.timer.tick(handle).is_some();
        }

        if completed {
            // Stats line and the task counts may have moved
            self.rebuild_menu();
        } else if ticked {
            self.update_menu();
        }
        if ticked {
            self.update_tray_title();
        }
    }

    fn process_menu_events(&mut self, event_loop: &ActiveEventLoop) {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            match event::handle_menu_event(&mut self.timer, event) {
                EventResult::Quit => {
                    event_loop.exit();
                    return;
                }
                EventResult::StateChanged => {
                    self.update_menu();
                    self.update_tray_title();
                }
                EventResult::MenuChanged => {
                    self.rebuild_menu();
                    self.update_tray_title();
                }
                EventResult::Continue => {}
            }
        }
    }
}

impl ApplicationHandler for Studybar {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        // Nothing to do on resume for a tray-only app
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        _event: WindowEvent,
    ) {
        // No window events for a tray-only app
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL));

        self.process_ticks();
        self.process_menu_events(event_loop);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.timer.shutdown();
        info!("Studybar exiting");
    }
}

/// Initialize tracing subscriber with env filter
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studybar=info".into()),
        )
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let db = Database::new()?;

    // Ticks arrive from the scheduler's sleeper threads over this channel
    let (tx, rx) = mpsc::channel();
    let scheduler = ThreadScheduler::new(tx);

    // Audio is created on the main thread to avoid Send issues
    let mut timer = match AudioPlayer::new() {
        Ok(player) => SessionTimer::new(db, scheduler, player, DesktopNotifier),
        Err(e) => {
            warn!("No audio output, alerts will be silent: {}", e);
            SessionTimer::new(db, scheduler, Silent, DesktopNotifier)
        }
    };

    for text in std::env::args().skip(1) {
        if timer.add_task(&text).is_none() {
            warn!("Skipping blank task argument");
        }
    }

    // Create event loop (required for tray on macOS)
    let event_loop = EventLoop::new()?;

    let (built_menu, menu_items) = menu::build_menu(&timer)?;

    let tray_icon = TrayIconBuilder::new()
        .with_menu(Box::new(built_menu))
        .with_icon(tray::load_icon()?)
        .with_title(tray::format_tray_title(&timer))
        .with_tooltip("Studybar - Study Session Timer")
        .build()?;

    let mut studybar = Studybar::new(timer, tray_icon, rx);
    studybar.set_menu_items(menu_items);

    info!("Studybar running");
    event_loop.run_app(&mut studybar)?;

    Ok(())
}
