//! Plain-text print layout.

use std::fmt::Write;

use super::ReviewView;
use crate::models::ItemField;

const TITLE_WIDTH: usize = 48;
const CELL_WIDTH: usize = 12;

fn format_average(value: f64) -> String {
    format!("{:.2}", value)
}

/// Render a review view as a printable document.
pub fn render_print(review: &ReviewView) -> String {
    let mut out = String::new();
    write_review(&mut out, review).ok();
    out
}

fn write_review(out: &mut String, review: &ReviewView) -> std::fmt::Result {
    writeln!(out, "{}", review.title)?;
    writeln!(out, "{}", "=".repeat(review.title.chars().count()))?;

    for (index, question) in review.questions.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "{}. {}", index + 1, question.prompt)?;

        for section in &question.sections {
            let averages: Vec<String> = review
                .columns
                .iter()
                .filter_map(|field| {
                    section
                        .averages
                        .get(*field)
                        .map(|avg| format!("{} avg {}", field.label(), format_average(avg)))
                })
                .collect();
            let marker = if section.excluded_from_score {
                " (not scored)"
            } else {
                ""
            };
            writeln!(out, "  {}{} [{}]", section.title, marker, averages.join(", "))?;

            write!(out, "    {:<width$}", "Item", width = TITLE_WIDTH)?;
            for field in &review.columns {
                write!(out, "{:>width$}", field.label(), width = CELL_WIDTH)?;
            }
            writeln!(out)?;

            for row in &section.rows {
                write!(out, "    {:<width$}", row.title, width = TITLE_WIDTH)?;
                for cell in &row.cells {
                    write!(out, "{:>width$}", cell, width = CELL_WIDTH)?;
                }
                writeln!(out)?;
            }
        }
    }

    writeln!(out)?;
    for field in [ItemField::Skill, ItemField::Frequency, ItemField::Proficiency] {
        if let Some(avg) = review.summary.average(field) {
            writeln!(out, "{} average: {}", field.label(), format_average(avg))?;
        }
    }
    writeln!(out, "Overall average: {}", format_average(review.summary.overall_avg))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChecklistFormat, Item, Question, Rating, Section};

    fn r(value: u8) -> Option<Rating> {
        Some(Rating::new(value).unwrap())
    }

    #[test]
    fn test_print_legacy_review() {
        let answers = vec![Question {
            prompt: "IV therapy".into(),
            sections: vec![
                Section {
                    title: "Access".into(),
                    exclude_from_score: false,
                    items: vec![
                        Item::legacy("Peripheral IV", r(4), r(2)),
                        Item::legacy("PICC care", r(4), r(0)),
                    ],
                },
                Section {
                    title: "Orientation".into(),
                    exclude_from_score: true,
                    items: vec![Item::legacy("Policy review", None, None)],
                },
            ],
        }];
        let review = ReviewView::build("IV RN", &answers, ChecklistFormat::Legacy);
        let printed = render_print(&review);

        assert!(printed.starts_with("IV RN\n=====\n"));
        assert!(printed.contains("1. IV therapy"));
        assert!(printed.contains("Access [Skill avg 4.00, Frequency avg 1.00]"));
        assert!(printed.contains("Orientation (not scored)"));
        assert!(printed.contains("N/A"));
        assert!(printed.contains("Skill average: 4.00"));
        assert!(printed.contains("Frequency average: 2.00"));
        // pooled (4 + 4 + 2) / 3
        assert!(printed.contains("Overall average: 3.33"));
        assert!(!printed.contains("Proficiency"));
    }
}
