//! Question tree models shared by checklist versions and assignments.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Answer model errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    #[error("Rating {0} is outside the 0..=4 scale")]
    RatingOutOfRange(u8),
}

/// A single self-assessment rating on the 1-4 scale, or `0` for "Not Applicable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// The N/A sentinel. Distinct from an unanswered item.
    pub const NOT_APPLICABLE: Rating = Rating(0);

    /// Highest rating on the scale.
    pub const MAX: u8 = 4;

    /// Create a rating, rejecting values above [`Rating::MAX`].
    pub fn new(value: u8) -> Result<Self, AnswerError> {
        if value > Self::MAX {
            return Err(AnswerError::RatingOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Raw numeric value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// True for the N/A sentinel.
    pub fn is_not_applicable(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u8> for Rating {
    type Error = AnswerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Rating axes an item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    /// Legacy: how skilled the clinician is
    Skill,
    /// Legacy: how often the clinician performs the procedure
    Frequency,
    /// New format: single proficiency axis
    Proficiency,
}

impl ItemField {
    /// Column heading used by review and print surfaces.
    pub fn label(self) -> &'static str {
        match self {
            ItemField::Skill => "Skill",
            ItemField::Frequency => "Frequency",
            ItemField::Proficiency => "Proficiency",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemField::Skill => "skill",
            ItemField::Frequency => "frequency",
            ItemField::Proficiency => "proficiency",
        }
    }
}

/// Question format of a checklist version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistFormat {
    /// Two-axis rating (skill + frequency)
    Legacy,
    /// Single-axis rating (proficiency)
    New,
}

impl ChecklistFormat {
    /// Fields that are scored (and stored) for this format, in column order.
    pub fn scored_fields(self) -> &'static [ItemField] {
        match self {
            ChecklistFormat::Legacy => &[ItemField::Skill, ItemField::Frequency],
            ChecklistFormat::New => &[ItemField::Proficiency],
        }
    }

    /// Whether `field` belongs to this format.
    pub fn accepts(self, field: ItemField) -> bool {
        self.scored_fields().contains(&field)
    }

    /// Format a newly authored version gets when the new-format toggle is set.
    pub fn authoring_default(new_format_enabled: bool) -> Self {
        if new_format_enabled {
            ChecklistFormat::New
        } else {
            ChecklistFormat::Legacy
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChecklistFormat::Legacy => "legacy",
            ChecklistFormat::New => "new",
        }
    }

    /// Parse the stored format flag.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "legacy" => Some(ChecklistFormat::Legacy),
            "new" => Some(ChecklistFormat::New),
            _ => None,
        }
    }
}

/// A single procedural skill being self-assessed.
///
/// Each rating field is tri-state: `None` when the field is not part of the
/// stored document, `Some(None)` when present but unanswered, and
/// `Some(Some(rating))` when answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Skill description
    pub title: String,
    /// Legacy skill rating
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub skill: Option<Option<Rating>>,
    /// Legacy frequency rating
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub frequency: Option<Option<Rating>>,
    /// New-format proficiency rating
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub proficiency: Option<Option<Rating>>,
}

/// Maps a JSON `null` to `Some(None)` so it stays distinguishable from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<Rating>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Rating>::deserialize(deserializer).map(Some)
}

impl Item {
    /// An item with no rating fields yet (template form).
    pub fn blank(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// A legacy-format item.
    pub fn legacy(title: impl Into<String>, skill: Option<Rating>, frequency: Option<Rating>) -> Self {
        Self {
            title: title.into(),
            skill: Some(skill),
            frequency: Some(frequency),
            proficiency: None,
        }
    }

    /// A new-format item.
    pub fn proficiency(title: impl Into<String>, proficiency: Option<Rating>) -> Self {
        Self {
            title: title.into(),
            skill: None,
            frequency: None,
            proficiency: Some(proficiency),
        }
    }

    fn slot(&self, field: ItemField) -> &Option<Option<Rating>> {
        match field {
            ItemField::Skill => &self.skill,
            ItemField::Frequency => &self.frequency,
            ItemField::Proficiency => &self.proficiency,
        }
    }

    fn slot_mut(&mut self, field: ItemField) -> &mut Option<Option<Rating>> {
        match field {
            ItemField::Skill => &mut self.skill,
            ItemField::Frequency => &mut self.frequency,
            ItemField::Proficiency => &mut self.proficiency,
        }
    }

    /// The answered rating for `field`, if any.
    pub fn rating(&self, field: ItemField) -> Option<Rating> {
        self.slot(field).flatten()
    }

    /// Whether `field` is part of this item's document.
    pub fn has_field(&self, field: ItemField) -> bool {
        self.slot(field).is_some()
    }

    /// Set (or clear, with `None`) the rating for `field`.
    pub fn set_rating(&mut self, field: ItemField, value: Option<Rating>) {
        *self.slot_mut(field) = Some(value);
    }

    /// Remove `field` from the document entirely.
    pub fn strip(&mut self, field: ItemField) {
        *self.slot_mut(field) = None;
    }

    /// Make `field` present, leaving an existing answer untouched.
    pub fn ensure(&mut self, field: ItemField) {
        let slot = self.slot_mut(field);
        if slot.is_none() {
            *slot = Some(None);
        }
    }

    /// True if any field carries a rating (N/A included).
    pub fn is_answered(&self) -> bool {
        [ItemField::Skill, ItemField::Frequency, ItemField::Proficiency]
            .iter()
            .any(|field| self.rating(*field).is_some())
    }
}

/// A titled group of items. Excluded sections are shown but never scored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub exclude_from_score: bool,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// One checklist page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Question {
    /// True if at least one item on the page has a non-null rating.
    pub fn has_answers(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|section| &section.items)
            .any(Item::is_answered)
    }
}
