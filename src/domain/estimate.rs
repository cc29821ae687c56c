//! Price estimation from account statistics.

use super::form::{ListingForm, StatField};

impl StatField {
    /// Price contribution of one unit of this stat.
    pub fn weight(self) -> i64 {
        match self {
            StatField::Level => 10,
            StatField::MythicCount => 500,
            StatField::LegendaryCount => 300,
            StatField::XsuitCount => 2000,
            StatField::GiltCount => 150,
            StatField::HonorGiltSet => 200,
            StatField::UpgradableGuns => 100,
            StatField::RareGlider => 150,
            StatField::VehicleSkin => 100,
            StatField::SpecialTitles => 200,
        }
    }
}

/// Weighted sum of the ten stats. Unparsable or empty inputs count as 0.
pub fn estimate(form: &ListingForm) -> i64 {
    StatField::ALL.into_iter().fold(0i64, |total, stat| {
        total.saturating_add(form.stat_value(stat).saturating_mul(stat.weight()))
    })
}

/// What the price display should show for an estimate: nothing when zero.
pub fn price_display(total: i64) -> Option<i64> {
    (total != 0).then_some(total)
}
