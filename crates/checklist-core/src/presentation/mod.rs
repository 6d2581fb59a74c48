//! View models for the edit, review and print surfaces.
//!
//! The views only shape data. Every average shown comes from
//! [`crate::scoring`].

mod print;

pub use print::*;

use serde::{Deserialize, Serialize};

use crate::answers::{normalize_for_persistence, question_at_step};
use crate::models::{ChecklistFormat, ItemField, Question, Rating};
use crate::scoring::{score, section_averages, ScoreSummary, SectionAverages};

/// Rating columns shown for a format. New format has no frequency column.
pub fn columns(format: ChecklistFormat) -> &'static [ItemField] {
    format.scored_fields()
}

/// Display text for a rating cell.
pub fn rating_label(value: Option<Rating>) -> String {
    match value {
        None => "-".to_string(),
        Some(rating) if rating.is_not_applicable() => "N/A".to_string(),
        Some(rating) => rating.value().to_string(),
    }
}

/// Replace the page at `step` with `question` and normalize the whole tree
/// for saving.
///
/// An out-of-range step leaves the pages as they were; the result is still
/// normalized.
pub fn merge_page(
    answers: &[Question],
    step: usize,
    question: &Question,
    format: ChecklistFormat,
) -> Vec<Question> {
    let target = step.checked_sub(1).filter(|index| *index < answers.len());
    if target.is_none() {
        tracing::debug!(step, pages = answers.len(), "Ignoring page merge for unknown step");
    }

    answers
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let page = if Some(index) == target { question } else { page };
            normalize_for_persistence(page, format)
        })
        .collect()
}

/// One row of a rendered section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRow {
    pub title: String,
    /// Cell labels in [`columns`] order
    pub cells: Vec<String>,
}

/// A section with its header averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionView {
    pub title: String,
    pub excluded_from_score: bool,
    pub averages: SectionAverages,
    pub rows: Vec<ItemRow>,
}

/// A question page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub prompt: String,
    pub sections: Vec<SectionView>,
}

impl QuestionView {
    fn build(question: &Question, format: ChecklistFormat) -> Self {
        let fields = columns(format);
        let sections = question
            .sections
            .iter()
            .map(|section| SectionView {
                title: section.title.clone(),
                excluded_from_score: section.exclude_from_score,
                averages: section_averages(section, format),
                rows: section
                    .items
                    .iter()
                    .map(|item| ItemRow {
                        title: item.title.clone(),
                        cells: fields.iter().map(|field| rating_label(item.rating(*field))).collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            prompt: question.prompt.clone(),
            sections,
        }
    }
}

/// Editable page with live totals over the whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormView {
    /// 1-based page number
    pub step: usize,
    pub total_steps: usize,
    pub columns: Vec<ItemField>,
    pub page: QuestionView,
    pub summary: ScoreSummary,
}

impl FormView {
    /// View for `step`, or `None` when the step is out of range.
    pub fn for_step(answers: &[Question], step: usize, format: ChecklistFormat) -> Option<Self> {
        let question = question_at_step(answers, step)?;
        Some(Self {
            step,
            total_steps: answers.len(),
            columns: columns(format).to_vec(),
            page: QuestionView::build(question, format),
            summary: score(answers, format),
        })
    }

    pub fn is_last_step(&self) -> bool {
        self.step == self.total_steps
    }
}

/// Read-only view of every page plus the overall summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewView {
    pub title: String,
    pub format: ChecklistFormat,
    pub columns: Vec<ItemField>,
    pub questions: Vec<QuestionView>,
    pub summary: ScoreSummary,
}

impl ReviewView {
    pub fn build(title: &str, answers: &[Question], format: ChecklistFormat) -> Self {
        Self {
            title: title.to_string(),
            format,
            columns: columns(format).to_vec(),
            questions: answers
                .iter()
                .map(|question| QuestionView::build(question, format))
                .collect(),
            summary: score(answers, format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, Section};

    fn r(value: u8) -> Option<Rating> {
        Some(Rating::new(value).unwrap())
    }

    fn new_format_tree() -> Vec<Question> {
        vec![
            Question {
                prompt: "Neuro".into(),
                sections: vec![
                    Section {
                        title: "Assessment".into(),
                        exclude_from_score: false,
                        items: vec![
                            Item::proficiency("GCS", r(4)),
                            Item::proficiency("Pupil check", r(0)),
                            Item::proficiency("NIH stroke scale", None),
                        ],
                    },
                    Section {
                        title: "Orientation".into(),
                        exclude_from_score: true,
                        items: vec![Item::proficiency("Unit tour", r(1))],
                    },
                ],
            },
            Question {
                prompt: "Pain".into(),
                sections: vec![],
            },
        ]
    }

    #[test]
    fn test_columns_per_format() {
        assert_eq!(columns(ChecklistFormat::New), &[ItemField::Proficiency]);
        assert_eq!(
            columns(ChecklistFormat::Legacy),
            &[ItemField::Skill, ItemField::Frequency]
        );
    }

    #[test]
    fn test_rating_labels() {
        assert_eq!(rating_label(None), "-");
        assert_eq!(rating_label(r(0)), "N/A");
        assert_eq!(rating_label(r(3)), "3");
    }

    #[test]
    fn test_form_view_live_summary() {
        let tree = new_format_tree();
        let view = FormView::for_step(&tree, 1, ChecklistFormat::New).unwrap();

        assert_eq!(view.total_steps, 2);
        assert!(!view.is_last_step());
        assert_eq!(view.summary.overall_avg, 4.0);
        let assessment = &view.page.sections[0];
        assert_eq!(assessment.rows[1].cells, vec!["N/A".to_string()]);
        assert_eq!(assessment.rows[2].cells, vec!["-".to_string()]);
        // 4 / 3 items, N/A and unanswered stay in the denominator
        assert!((assessment.averages.proficiency.unwrap() - 4.0 / 3.0).abs() < 1e-9);

        assert!(FormView::for_step(&tree, 0, ChecklistFormat::New).is_none());
        assert!(FormView::for_step(&tree, 2, ChecklistFormat::New).unwrap().is_last_step());
    }

    #[test]
    fn test_review_shows_excluded_sections() {
        let view = ReviewView::build("Neuro RN", &new_format_tree(), ChecklistFormat::New);

        let orientation = &view.questions[0].sections[1];
        assert!(orientation.excluded_from_score);
        assert_eq!(orientation.averages.proficiency, Some(1.0));
        assert_eq!(view.summary.proficiency_average, Some(4.0));
        assert_eq!(view.summary.frequency_average, None);
    }

    #[test]
    fn test_merge_page_normalizes_every_page() {
        let mut tree = new_format_tree();
        tree[1].sections.push(Section {
            title: "Scales".into(),
            exclude_from_score: false,
            items: vec![Item::legacy("FLACC", r(2), r(3))],
        });

        let edited = Question {
            prompt: "Neuro".into(),
            sections: vec![Section {
                title: "Assessment".into(),
                exclude_from_score: false,
                items: vec![Item::proficiency("GCS", r(2))],
            }],
        };
        let merged = merge_page(&tree, 1, &edited, ChecklistFormat::New);

        assert_eq!(merged[0], edited);
        let stale = &merged[1].sections[0].items[0];
        assert!(!stale.has_field(ItemField::Skill));
        assert!(!stale.has_field(ItemField::Frequency));
        assert_eq!(tree[0].sections[0].items.len(), 3);
    }

    #[test]
    fn test_merge_page_unknown_step_keeps_pages() {
        let tree = new_format_tree();
        let merged = merge_page(&tree, 5, &Question::default(), ChecklistFormat::New);
        assert_eq!(merged, tree);
    }
}
