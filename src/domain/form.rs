//! The "sell your account" form as typed values.
//!
//! Every field holds the raw text the seller typed; interpretation (numbers,
//! trimming) happens in the estimator, the validator and payload assembly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the ten numeric account statistics.
///
/// Declaration order is the order the fields appear in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    Level,
    MythicCount,
    LegendaryCount,
    XsuitCount,
    GiltCount,
    HonorGiltSet,
    UpgradableGuns,
    RareGlider,
    VehicleSkin,
    SpecialTitles,
}

impl StatField {
    pub const ALL: [StatField; 10] = [
        StatField::Level,
        StatField::MythicCount,
        StatField::LegendaryCount,
        StatField::XsuitCount,
        StatField::GiltCount,
        StatField::HonorGiltSet,
        StatField::UpgradableGuns,
        StatField::RareGlider,
        StatField::VehicleSkin,
        StatField::SpecialTitles,
    ];

    /// Form field name, also the payload key.
    pub fn name(self) -> &'static str {
        match self {
            StatField::Level => "level",
            StatField::MythicCount => "mythic_count",
            StatField::LegendaryCount => "legendary_count",
            StatField::XsuitCount => "xsuit_count",
            StatField::GiltCount => "gilt_count",
            StatField::HonorGiltSet => "honor_gilt_set",
            StatField::UpgradableGuns => "upgradable_guns",
            StatField::RareGlider => "rare_glider",
            StatField::VehicleSkin => "vehicle_skin",
            StatField::SpecialTitles => "special_titles",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Any named field of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormField {
    Uid,
    Title,
    Highlights,
    Rank,
    Stat(StatField),
}

impl FormField {
    pub fn name(self) -> &'static str {
        match self {
            FormField::Uid => "uid",
            FormField::Title => "title",
            FormField::Highlights => "highlights",
            FormField::Rank => "rank",
            FormField::Stat(stat) => stat.name(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uid" => Some(FormField::Uid),
            "title" => Some(FormField::Title),
            "highlights" => Some(FormField::Highlights),
            "rank" => Some(FormField::Rank),
            other => StatField::from_name(other).map(FormField::Stat),
        }
    }

    /// All fields in form order.
    pub fn all() -> impl Iterator<Item = FormField> {
        [
            FormField::Uid,
            FormField::Title,
            FormField::Highlights,
            FormField::Rank,
        ]
        .into_iter()
        .chain(StatField::ALL.into_iter().map(FormField::Stat))
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current contents of the listing form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingForm {
    pub uid: String,
    pub title: String,
    pub highlights: String,
    pub rank: String,
    stats: [String; 10],
}

impl ListingForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Uid => &self.uid,
            FormField::Title => &self.title,
            FormField::Highlights => &self.highlights,
            FormField::Rank => &self.rank,
            FormField::Stat(stat) => self.stat(stat),
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Uid => self.uid = value,
            FormField::Title => self.title = value,
            FormField::Highlights => self.highlights = value,
            FormField::Rank => self.rank = value,
            FormField::Stat(stat) => self.stats[stat.index()] = value,
        }
    }

    /// Builder-style [`ListingForm::set`].
    pub fn with(mut self, field: FormField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn stat(&self, stat: StatField) -> &str {
        &self.stats[stat.index()]
    }

    /// Parse a stat the way the page does: an integer or a truncated finite
    /// float, anything else is 0.
    pub fn stat_value(&self, stat: StatField) -> i64 {
        parse_count(self.stat(stat))
    }

    /// Clear every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Lenient integer parse: surrounding whitespace is ignored, a fractional part
/// is truncated, and anything unparsable (including empty) counts as 0.
pub fn parse_count(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}
