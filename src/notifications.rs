//! System notifications and transient messages for timer events.

use crate::models::{format_time, CompletionEvent, Phase, TimerSettings};
use notify_rust::Notification;
use std::thread;
use tracing::warn;

/// Fire-and-forget user messaging. Failures are handled inside the
/// implementation and never reach the timer.
pub trait Notifier {
    /// A phase ran out.
    fn phase_complete(&self, event: &CompletionEvent, settings: &TimerSettings);

    /// A short toast-style message, e.g. a rejected settings change. The
    /// timer only sends these while notifications are enabled.
    fn message(&self, text: &str);
}

/// Summary and body for a completion notification.
pub fn completion_text(event: &CompletionEvent, settings: &TimerSettings) -> (String, String) {
    match *event {
        CompletionEvent::WorkComplete {
            next: Phase::LongBreak,
            ..
        } => (
            "Long Break Time! 🎉".to_string(),
            format!(
                "You've earned a {} break. Great job staying focused!",
                format_time(settings.long_break_secs)
            ),
        ),
        CompletionEvent::WorkComplete { count, .. } => {
            let body = if count == 1 {
                "Great work! You've completed 1 study session.\nTime for a break.".to_string()
            } else {
                format!(
                    "Great work! You've completed {} study sessions.\nTime for a break.",
                    count
                )
            };
            ("Session Complete! 📚".to_string(), body)
        }
        CompletionEvent::BreakComplete => (
            "Break Over! ☕".to_string(),
            "Ready to start another session?".to_string(),
        ),
    }
}

/// Desktop notifications via the platform notification center.
/// Each notification is shown from a background thread to avoid blocking.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn show(summary: String, body: String) {
        thread::spawn(move || {
            if let Err(e) = Notification::new()
                .summary(&summary)
                .body(&body)
                .sound_name("default")
                .show()
            {
                warn!("Failed to show notification: {}", e);
            }
        });
    }
}

impl Notifier for DesktopNotifier {
    fn phase_complete(&self, event: &CompletionEvent, settings: &TimerSettings) {
        let (summary, body) = completion_text(event, settings);
        Self::show(summary, body);
    }

    fn message(&self, text: &str) {
        Self::show("Studybar".to_string(), text.to_string());
    }
}
