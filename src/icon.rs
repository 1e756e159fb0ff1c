use cosmic::widget::icon;

use crate::brightness::Level;

/// Themed symbolic icon for a brightness level
pub fn level_icon(level: Level) -> icon::Handle {
    icon::from_name(level.icon_name()).symbolic(true).handle()
}
