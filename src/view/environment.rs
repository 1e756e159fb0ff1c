use crate::app::AppMsg;
use crate::fl;
use crate::preflight::{EnvironmentReport, RequirementStatus};
use cosmic::Element;
use cosmic::iced::{Alignment, Length};
use cosmic::widget::{column, container, icon, row, text};

/// Environment report with one line per requirement
pub fn environment_view(report: &EnvironmentReport) -> Element<'_, AppMsg> {
    let mut requirements_column = column().spacing(8);

    for req in &report.requirements {
        let status_icon = match req.status {
            RequirementStatus::Met => "checkbox-checked-symbolic",
            RequirementStatus::NotMet => "window-close-symbolic",
            RequirementStatus::NotApplicable => "view-more-symbolic",
            RequirementStatus::Partial => "dialog-information-symbolic",
        };

        requirements_column = requirements_column.push(
            row()
                .spacing(12)
                .align_y(Alignment::Center)
                .push(icon::from_name(status_icon).size(16).symbolic(true))
                .push(
                    column()
                        .spacing(2)
                        .push(text(req.name.as_str()).size(13))
                        .push(text(req.description.as_str()).size(11)),
                ),
        );
    }

    container(
        column()
            .spacing(16)
            .align_x(Alignment::Start)
            .push(
                row()
                    .spacing(12)
                    .align_y(Alignment::Center)
                    .push(
                        icon::from_name(if report.has_issues() {
                            "dialog-warning-symbolic"
                        } else {
                            "emblem-ok-symbolic"
                        })
                        .size(48)
                        .symbolic(true),
                    )
                    .push(
                        column()
                            .spacing(4)
                            .push(
                                text(if report.has_issues() {
                                    fl!("environment_issues_title")
                                } else {
                                    fl!("environment_ok_title")
                                })
                                .size(16),
                            )
                            .push(text(report.summary()).size(12)),
                    ),
            )
            .push(requirements_column)
            .push_maybe(
                report
                    .has_issues()
                    .then(|| text(fl!("environment_hint")).size(11)),
            ),
    )
    .width(Length::Fill)
    .padding([20, 20])
    .into()
}
