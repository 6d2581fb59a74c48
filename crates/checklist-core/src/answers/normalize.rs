//! Format-aware shaping of question trees for storage and editing.

use crate::models::{ChecklistFormat, Item, ItemField, Question};

const ALL_FIELDS: [ItemField; 3] = [ItemField::Skill, ItemField::Frequency, ItemField::Proficiency];

fn map_items(question: &Question, mut f: impl FnMut(&mut Item)) -> Question {
    let mut question = question.clone();
    for section in &mut question.sections {
        for item in &mut section.items {
            f(item);
        }
    }
    question
}

/// Strip fields that do not belong to `format` before writing.
pub fn normalize_for_persistence(question: &Question, format: ChecklistFormat) -> Question {
    map_items(question, |item| {
        for field in ALL_FIELDS {
            if !format.accepts(field) {
                item.strip(field);
            }
        }
    })
}

/// Shape a loaded or freshly copied tree for editing: every format field
/// present (unanswered when missing), cross-format leftovers removed.
pub fn hydrate(questions: &[Question], format: ChecklistFormat) -> Vec<Question> {
    questions
        .iter()
        .map(|question| {
            map_items(question, |item| {
                for field in ALL_FIELDS {
                    if format.accepts(field) {
                        item.ensure(field);
                    } else {
                        item.strip(field);
                    }
                }
            })
        })
        .collect()
}

/// Reset every present rating to unanswered.
pub fn clear_ratings(answers: &[Question]) -> Vec<Question> {
    answers
        .iter()
        .map(|question| {
            map_items(question, |item| {
                for field in ALL_FIELDS {
                    if item.has_field(field) {
                        item.set_rating(field, None);
                    }
                }
            })
        })
        .collect()
}
