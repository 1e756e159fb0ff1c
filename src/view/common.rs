use cosmic::widget::icon;

use crate::brightness::Level;
use crate::icon::level_icon;

/// Get the appropriate brightness icon based on brightness level
pub fn brightness_icon(brightness: f32) -> icon::Handle {
    level_icon(Level::of(brightness))
}
