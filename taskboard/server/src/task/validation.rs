//! Field rules for task payloads.
//!
//! Validation never stops at the first problem: callers get every violated
//! rule so a client can report them together.

use crate::task::{Category, Priority, TaskInput, parse_deadline};

pub const TEXT_MIN_CHARS: usize = 3;
pub const TEXT_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Validates a payload for a new task. `text` is mandatory.
pub fn validate_task(input: &TaskInput) -> Vec<String> {
    let mut errors = Vec::new();
    check_text(input.text_value(), &mut errors);
    check_optional_fields(input, &mut errors);
    errors
}

/// Validates a patch for an existing task. Only fields present in the patch
/// are checked; a `null` text counts as present.
pub fn validate_task_patch(patch: &TaskInput) -> Vec<String> {
    let mut errors = Vec::new();
    if patch.text.is_some() {
        check_text(patch.text_value(), &mut errors);
    }
    check_optional_fields(patch, &mut errors);
    errors
}

fn check_text(text: Option<&str>, errors: &mut Vec<String>) {
    let length = text.map(|text| text.trim().chars().count()).unwrap_or(0);
    if length == 0 {
        errors.push("Task text is required".to_string());
    } else if length < TEXT_MIN_CHARS {
        errors.push(format!(
            "Task text must be at least {} characters",
            TEXT_MIN_CHARS
        ));
    } else if length > TEXT_MAX_CHARS {
        errors.push(format!(
            "Task text must be less than {} characters",
            TEXT_MAX_CHARS
        ));
    }
}

fn check_optional_fields(input: &TaskInput, errors: &mut Vec<String>) {
    if let Some(description) = &input.description {
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.push(format!(
                "Description must be less than {} characters",
                DESCRIPTION_MAX_CHARS
            ));
        }
    }

    if let Some(priority) = non_empty(&input.priority) {
        if priority.parse::<Priority>().is_err() {
            errors.push("Priority must be low, medium, or high".to_string());
        }
    }

    if let Some(category) = non_empty(&input.category) {
        if category.parse::<Category>().is_err() {
            errors.push("Category must be personal, work, shopping, or health".to_string());
        }
    }

    if let Some(deadline) = input.deadline_value() {
        if parse_deadline(deadline).is_none() {
            errors.push("Invalid deadline format".to_string());
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
