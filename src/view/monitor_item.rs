use crate::app::{AppMsg, AppState};
use crate::brightness;
use crate::fl;
use crate::session::MonitorState;
use crate::xrandr::BrightnessSource;
use cosmic::Element;
use cosmic::iced::{Alignment, Length};
use cosmic::widget::{column, container, horizontal_space, icon, mouse_area, row, slider, text, tooltip};
use cosmic::{cosmic_theme, theme};

use super::common::brightness_icon;

impl AppState {
    /// One card per output, in xrandr order
    pub fn monitors_view(&self) -> Option<Element<'_, AppMsg>> {
        let cosmic_theme::Spacing {
            space_xs,
            space_s,
            ..
        } = theme::spacing();

        (!self.session.is_empty()).then(|| {
            column()
                .padding(space_xs)
                .spacing(space_s)
                .extend(
                    self.session
                        .monitors()
                        .iter()
                        .map(|monitor| self.monitor_view(monitor)),
                )
                .into()
        })
    }

    /// Name, slider and percentage for a single output
    pub fn monitor_view<'a>(&self, monitor: &'a MonitorState) -> Element<'a, AppMsg> {
        let cosmic_theme::Spacing {
            space_xxxs,
            space_xxs,
            space_xs,
            space_s,
            ..
        } = theme::spacing();

        let name = monitor.name.as_str();
        let percent = brightness::to_percent(monitor.slider);
        let enabled = self.controls_enabled();

        let toggle_icon = mouse_area(icon::icon(brightness_icon(monitor.slider)).size(20));
        let toggle_icon = if enabled {
            toggle_icon.on_press(AppMsg::ToggleMinMaxBrightness(name.to_string()))
        } else {
            toggle_icon
        };

        let slider_row = row()
            .spacing(space_s)
            .align_y(Alignment::Center)
            .push(slider(0..=100, percent, move |value| {
                AppMsg::SetScreenBrightness(name.to_string(), brightness::from_percent(value))
            }))
            .push(
                text(format!("{percent}%"))
                    .size(16)
                    .width(Length::Fixed(45.0)),
            );

        container(
            column()
                .spacing(space_xs)
                .padding(space_xxs)
                .push(
                    row()
                        .spacing(space_xs)
                        .align_y(Alignment::Center)
                        .push(tooltip(
                            toggle_icon,
                            text(fl!("toggle_min_max")),
                            tooltip::Position::Top,
                        ))
                        .push(
                            column()
                                .spacing(space_xxxs)
                                .push(text(name).size(14))
                                .push_maybe(
                                    monitor
                                        .primary
                                        .then(|| text(fl!("primary")).size(10)),
                                )
                                .push_maybe(
                                    matches!(monitor.source, BrightnessSource::Ddc { .. })
                                        .then(|| text(fl!("hardware_backlight")).size(10)),
                                ),
                        )
                        .push(horizontal_space()),
                )
                .push(slider_row),
        )
        .padding(space_xs)
        .class(cosmic::style::Container::Card)
        .into()
    }
}
