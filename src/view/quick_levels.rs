use crate::app::{AppMsg, AppState};
use crate::brightness;
use crate::fl;
use cosmic::Element;
use cosmic::iced::Alignment;
use cosmic::widget::{button, horizontal_space, row, text};
use cosmic::{cosmic_theme, theme};

impl AppState {
    /// Buttons setting every output at once
    pub fn quick_levels_view(&self) -> Element<'_, AppMsg> {
        let cosmic_theme::Spacing {
            space_xxs,
            space_xs,
            ..
        } = theme::spacing();

        let enabled = self.controls_enabled() && !self.session.is_empty();

        let mut levels = row()
            .spacing(space_xxs)
            .align_y(Alignment::Center)
            .push(text(fl!("all_monitors")).size(12))
            .push(horizontal_space());

        for fraction in self.config.quick_fractions() {
            levels = levels.push(
                button::text(format!("{}%", brightness::to_percent(fraction)))
                    .padding([space_xxs, space_xs])
                    .on_press_maybe(enabled.then_some(AppMsg::SetAllBrightness(fraction))),
            );
        }

        levels
            .push(
                button::suggested(fl!("reset_all"))
                    .on_press_maybe(enabled.then_some(AppMsg::ResetAll)),
            )
            .into()
    }
}
