//! Tray icon and title for the menubar.

use studybar::{Phase, SessionTimer};
use thiserror::Error;
use tray_icon::Icon;

const ICON_SIZE: u32 = 22;
const COVER: [u8; 3] = [63, 81, 181];
const SPINE: [u8; 3] = [40, 53, 147];
const PAGE: [u8; 3] = [245, 245, 245];

#[derive(Error, Debug)]
pub enum TrayError {
    #[error("Failed to load icon: {0}")]
    IconLoad(#[from] tray_icon::BadIcon),
}

/// Generates a small notebook icon: an indigo cover with a darker spine and
/// a strip of page showing along the right edge.
pub fn load_icon() -> Result<Icon, TrayError> {
    let rgba = notebook_pixels(ICON_SIZE);
    Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE).map_err(TrayError::IconLoad)
}

fn notebook_pixels(size: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    let (left, right, top, bottom) = (4, size - 4, 2, size - 2);

    for y in 0..size {
        for x in 0..size {
            let inside = x >= left && x < right && y >= top && y < bottom;
            // Knock out the corners for a slightly rounded cover
            let corner = (x == left || x == right - 1) && (y == top || y == bottom - 1);

            let pixel = if !inside || corner {
                None
            } else if x < left + 3 {
                Some(SPINE)
            } else if x == right - 2 && y > top && y < bottom - 1 {
                Some(PAGE)
            } else {
                Some(COVER)
            };
            match pixel {
                Some([r, g, b]) => rgba.extend_from_slice(&[r, g, b, 255]),
                None => rgba.extend_from_slice(&[0, 0, 0, 0]),
            }
        }
    }
    rgba
}

/// Formats the tray title based on the current countdown.
pub fn format_tray_title(timer: &SessionTimer) -> String {
    let state = timer.state();
    let remaining = timer.formatted_remaining();
    match state.phase {
        Phase::Idle => "📚".to_string(),
        _ if !state.running => format!("⏸ {}", remaining),
        Phase::Work => format!("📚 {}", remaining),
        Phase::ShortBreak | Phase::LongBreak => format!("☕ {}", remaining),
    }
}
