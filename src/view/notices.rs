use crate::app::{AppMsg, AppState};
use crate::error::NoticeKind;
use cosmic::Element;
use cosmic::iced::Alignment;
use cosmic::widget::{button, column, container, horizontal_space, icon, row, text};
use cosmic::{cosmic_theme, theme};

fn notice_icon(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::ToolUnavailable => "dialog-error-symbolic",
        NoticeKind::QueryParseFailure | NoticeKind::SettingsIoFailure => "dialog-warning-symbolic",
        NoticeKind::ApplyFailure => "dialog-information-symbolic",
    }
}

impl AppState {
    /// Banners for current problems; only the missing tool can't be dismissed
    pub fn notices_view(&self) -> Option<Element<'_, AppMsg>> {
        let cosmic_theme::Spacing {
            space_xxs,
            space_xs,
            ..
        } = theme::spacing();

        (!self.notices.is_empty()).then(|| {
            column()
                .spacing(space_xxs)
                .extend(self.notices.iter().enumerate().map(|(index, notice)| {
                    container(
                        row()
                            .spacing(space_xs)
                            .align_y(Alignment::Center)
                            .push(icon::from_name(notice_icon(notice.kind)).size(16).symbolic(true))
                            .push(text(notice.message.as_str()).size(12))
                            .push(horizontal_space())
                            .push_maybe((!notice.disables_controls()).then(|| {
                                button::icon(icon::from_name("window-close-symbolic"))
                                    .on_press(AppMsg::DismissNotice(index))
                            })),
                    )
                    .padding(space_xs)
                    .class(cosmic::style::Container::Card)
                    .into()
                }))
                .into()
        })
    }
}
