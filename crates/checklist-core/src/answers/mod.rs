//! Answer model operations over an assignment's question tree.
//!
//! Every edit returns a new tree; inputs are never mutated. Pages are
//! addressed by 1-based step, sections and items by 0-based index.

mod normalize;

pub use normalize::*;

use crate::models::{ChecklistFormat, ItemField, Question, Rating};

/// Page for a 1-based step.
pub fn question_at_step(answers: &[Question], step: usize) -> Option<&Question> {
    step.checked_sub(1).and_then(|index| answers.get(index))
}

/// Replace one rating leaf.
///
/// Fields outside `format` (frequency on a new-format tree, for instance)
/// and out-of-range indices leave the tree unchanged.
pub fn set_item_value(
    answers: &[Question],
    step: usize,
    section_idx: usize,
    item_idx: usize,
    field: ItemField,
    value: Option<Rating>,
    format: ChecklistFormat,
) -> Vec<Question> {
    let mut updated = answers.to_vec();

    if !format.accepts(field) {
        tracing::debug!(
            field = field.as_str(),
            format = format.as_str(),
            "Ignoring rating for field outside checklist format"
        );
        return updated;
    }

    let item = step
        .checked_sub(1)
        .and_then(|index| updated.get_mut(index))
        .and_then(|question| question.sections.get_mut(section_idx))
        .and_then(|section| section.items.get_mut(item_idx));

    match item {
        Some(item) => item.set_rating(field, value),
        None => tracing::debug!(step, section_idx, item_idx, "Ignoring rating for unknown item"),
    }

    updated
}

/// Mark every item of a section as N/A for `field`.
///
/// Only offered when the agency allows N/A skipping; the gate lives with the caller.
pub fn skip_section(
    answers: &[Question],
    step: usize,
    section_idx: usize,
    field: ItemField,
    format: ChecklistFormat,
) -> Vec<Question> {
    let mut updated = answers.to_vec();
    if !format.accepts(field) {
        return updated;
    }

    let section = step
        .checked_sub(1)
        .and_then(|index| updated.get_mut(index))
        .and_then(|question| question.sections.get_mut(section_idx));

    if let Some(section) = section {
        for item in &mut section.items {
            item.set_rating(field, Some(Rating::NOT_APPLICABLE));
        }
    }

    updated
}

/// 0-based index of the highest page with any non-null rating.
///
/// Scans from the end, so an untouched page before an answered one does not
/// stop the scan.
pub fn find_last_completed_page(answers: &[Question]) -> Option<usize> {
    answers.iter().rposition(Question::has_answers)
}
