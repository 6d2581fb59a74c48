//! Checklist scoring.
//!
//! Two averages are shown to users and they are intentionally different:
//!
//! - [`score`]: overall and per-axis averages. N/A (`0`) and unanswered
//!   ratings are dropped from both sum and count, and sections marked
//!   `exclude_from_score` are skipped entirely.
//! - [`section_averages`]: the figure printed in section headers. Sum of
//!   answered ratings divided by the number of items in the section, so N/A
//!   and unanswered items pull the average down.
//!
//! Edit, review and print surfaces all call these; nothing else computes an
//! average.

use serde::{Deserialize, Serialize};

use crate::models::{ChecklistFormat, ItemField, Question, Section};

/// Averages over a full question tree.
///
/// Legacy trees carry skill and frequency averages; new-format trees carry
/// the proficiency average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency_average: Option<f64>,
    pub overall_avg: f64,
}

impl ScoreSummary {
    /// Average for one axis, if the format carries it.
    pub fn average(&self, field: ItemField) -> Option<f64> {
        match field {
            ItemField::Skill => self.skill_average,
            ItemField::Frequency => self.frequency_average,
            ItemField::Proficiency => self.proficiency_average,
        }
    }
}

/// Display averages for a single section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionAverages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<f64>,
}

impl SectionAverages {
    pub fn get(&self, field: ItemField) -> Option<f64> {
        match field {
            ItemField::Skill => self.skill,
            ItemField::Frequency => self.frequency,
            ItemField::Proficiency => self.proficiency,
        }
    }

    fn set(&mut self, field: ItemField, value: f64) {
        match field {
            ItemField::Skill => self.skill = Some(value),
            ItemField::Frequency => self.frequency = Some(value),
            ItemField::Proficiency => self.proficiency = Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    sum: u32,
    count: u32,
}

impl Tally {
    fn average(self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            f64::from(self.sum) / f64::from(self.count)
        }
    }
}

/// Overall and per-axis averages for `questions` under `format`.
pub fn score(questions: &[Question], format: ChecklistFormat) -> ScoreSummary {
    let fields = format.scored_fields();
    let mut tallies = vec![Tally::default(); fields.len()];

    let scored_items = questions
        .iter()
        .flat_map(|question| &question.sections)
        .filter(|section| !section.exclude_from_score)
        .flat_map(|section| &section.items);

    for item in scored_items {
        for (tally, field) in tallies.iter_mut().zip(fields) {
            if let Some(rating) = item.rating(*field) {
                if !rating.is_not_applicable() {
                    tally.sum += u32::from(rating.value());
                    tally.count += 1;
                }
            }
        }
    }

    match format {
        ChecklistFormat::New => {
            let proficiency = tallies[0].average();
            ScoreSummary {
                skill_average: None,
                frequency_average: None,
                proficiency_average: Some(proficiency),
                overall_avg: proficiency,
            }
        }
        ChecklistFormat::Legacy => {
            let (skill, frequency) = (tallies[0], tallies[1]);
            // pooled across both axes, not the mean of the two averages
            let pooled = Tally {
                sum: skill.sum + frequency.sum,
                count: skill.count + frequency.count,
            };
            ScoreSummary {
                skill_average: Some(skill.average()),
                frequency_average: Some(frequency.average()),
                proficiency_average: None,
                overall_avg: pooled.average(),
            }
        }
    }
}

/// Header averages for one section: answered sum over item count.
pub fn section_averages(section: &Section, format: ChecklistFormat) -> SectionAverages {
    let mut averages = SectionAverages::default();
    let item_count = section.items.len();

    for field in format.scored_fields() {
        let sum: u32 = section
            .items
            .iter()
            .filter_map(|item| item.rating(*field))
            .map(|rating| u32::from(rating.value()))
            .sum();
        let average = if item_count == 0 {
            0.0
        } else {
            f64::from(sum) / item_count as f64
        };
        averages.set(*field, average);
    }

    averages
}
