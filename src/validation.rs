use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;

const MAX_TITLE_LEN: usize = 250;

pub fn require_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::validation(
            "title",
            "invalid_title",
            "Title must be between 1 and 250 characters",
        ));
    }
    Ok(())
}

/// Hours with at most two decimal places and at most three integer digits.
fn is_hours(value: Decimal) -> bool {
    value.normalize().scale() <= 2 && value < Decimal::from(1000)
}

pub fn require_estimate(estimate: Decimal) -> Result<(), AppError> {
    if estimate.is_sign_negative() || !is_hours(estimate) {
        return Err(AppError::validation(
            "estimate",
            "invalid_estimate",
            "Estimate must be a non-negative number of hours below 1000 \
             with at most two decimal places",
        ));
    }
    Ok(())
}

pub fn require_logged_time(time: Decimal) -> Result<(), AppError> {
    if time <= Decimal::ZERO || !is_hours(time) {
        return Err(AppError::validation(
            "time",
            "invalid_time",
            "Logged time must be a positive number of hours below 1000 \
             with at most two decimal places",
        ));
    }
    Ok(())
}

pub fn require_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::validation(
            "content",
            "blank",
            "Comment content must not be empty",
        ));
    }
    Ok(())
}

pub fn require_epic_in_project(issue_project: Uuid, epic_project: Uuid) -> Result<(), AppError> {
    if issue_project != epic_project {
        return Err(AppError::validation(
            "epic",
            "epic_has_wrong_project",
            "The epic must belong to the same project as the issue.",
        ));
    }
    Ok(())
}

pub fn require_parent_in_project(
    issue_project: Uuid,
    parent_project: Uuid,
) -> Result<(), AppError> {
    if issue_project != parent_project {
        return Err(AppError::validation(
            "parent",
            "parent_has_wrong_project",
            "The parent issue must belong to the same project as the issue.",
        ));
    }
    Ok(())
}

pub fn require_not_own_parent(
    issue_id: Option<Uuid>,
    parent_id: Option<Uuid>,
) -> Result<(), AppError> {
    if issue_id.is_some() && issue_id == parent_id {
        return Err(AppError::validation(
            "parent",
            "parent_is_self",
            "An issue cannot be its own parent.",
        ));
    }
    Ok(())
}

pub fn does_not_exist(field: &'static str) -> AppError {
    AppError::validation(field, "does_not_exist", format!("The referenced {field} does not exist."))
}
