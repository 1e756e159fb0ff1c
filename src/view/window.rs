use crate::app::{AppMsg, AppState};
use crate::fl;
use cosmic::Element;
use cosmic::iced::{Alignment, Length};
use cosmic::widget::{
    Space, button, column, divider, horizontal_space, icon, row, scrollable, text, toggler,
    tooltip,
};
use cosmic::{cosmic_theme, theme};

use super::empty_state::empty_state_view;
use super::environment::environment_view;

impl AppState {
    pub fn window_view(&self) -> Element<'_, AppMsg> {
        let cosmic_theme::Spacing {
            space_xs,
            space_s,
            space_m,
            ..
        } = theme::spacing();

        let tray_active = self.capabilities.tray.is_active();

        let toolbar = row()
            .spacing(space_xs)
            .align_y(Alignment::Center)
            .push(text(fl!("app_title")).size(18))
            .push(horizontal_space())
            .push(tooltip(
                button::icon(icon::from_name("view-refresh-symbolic"))
                    .on_press(AppMsg::RefreshMonitors),
                text(fl!("refresh_monitors")),
                tooltip::Position::Bottom,
            ))
            .push(tooltip(
                button::icon(icon::from_name("security-medium-symbolic"))
                    .on_press(AppMsg::ToggleEnvironmentView),
                text(fl!("environment")),
                tooltip::Position::Bottom,
            ))
            .push_maybe(tray_active.then(|| {
                tooltip(
                    button::icon(icon::from_name("go-down-symbolic")).on_press(AppMsg::HideWindow),
                    text(fl!("hide_to_tray")),
                    tooltip::Position::Bottom,
                )
            }));

        let mut content = column().spacing(space_s).push(toolbar);

        if self.show_environment_view {
            let report: Element<'_, AppMsg> = match &self.environment {
                Some(report) => environment_view(report),
                None => text(fl!("environment_pending")).into(),
            };
            return column()
                .padding(space_m)
                .push(content.push(report).push(divider::horizontal::default()).push(
                    row()
                        .align_y(Alignment::Center)
                        .push(text(fl!("close")))
                        .push(horizontal_space())
                        .push(
                            button::icon(icon::from_name("window-close-symbolic"))
                                .on_press(AppMsg::ToggleEnvironmentView),
                        ),
                ))
                .into();
        }

        content = content
            .push_maybe(self.notices_view())
            .push_maybe(self.monitors_view())
            .push_maybe(
                self.session
                    .is_empty()
                    .then(|| empty_state_view(self.discovered)),
            )
            .push(divider::horizontal::default())
            .push(self.quick_levels_view())
            .push(divider::horizontal::default())
            .push(
                row()
                    .align_y(Alignment::Center)
                    .push(text(fl!("restore_on_start")))
                    .push(horizontal_space())
                    .push(toggler(self.config.restore_on_start).on_toggle(AppMsg::SetRestoreOnStart)),
            )
            .push(
                row()
                    .align_y(Alignment::Center)
                    .push(text(fl!("use_ddc")))
                    .push(horizontal_space())
                    .push(toggler(self.config.use_ddc).on_toggle(AppMsg::SetUseDdc)),
            )
            .push(Space::with_height(space_xs));

        scrollable(column().padding(space_m).push(content))
            .height(Length::Fill)
            .into()
    }
}
