use crate::app::AppMsg;
use crate::fl;
use cosmic::Element;
use cosmic::iced::{Alignment, Length};
use cosmic::widget::{button, column, container, icon, text};

/// Shown while no output is known, before and after the first enumeration
pub fn empty_state_view(discovered: bool) -> Element<'static, AppMsg> {
    let mut content = column()
        .spacing(12)
        .align_x(Alignment::Center)
        .push(
            icon::from_name("video-display-symbolic")
                .size(64)
                .symbolic(true),
        );

    if discovered {
        content = content
            .push(text(fl!("no_monitors")).size(14))
            .push(text(fl!("no_monitors_hint")).size(12))
            .push(button::text(fl!("refresh_monitors")).on_press(AppMsg::RefreshMonitors));
    } else {
        content = content.push(text(fl!("searching_monitors")).size(14));
    }

    container(content)
        .width(Length::Fill)
        .center_x(Length::Fill)
        .padding([40, 20])
        .into()
}
