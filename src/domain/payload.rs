//! The create-listing request body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::form::{ListingForm, StatField};
use crate::session::SessionUser;

/// Body of `POST {api_base}/create`. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPayload {
    /// Usually the numeric user id, but see [`seller_id`] for the fallbacks
    pub seller_id: Value,
    pub uid: String,
    pub title: String,
    pub description: String,
    pub rank: String,
    pub level: i64,
    pub mythic_count: i64,
    pub legendary_count: i64,
    pub xsuit_count: i64,
    pub gilt_count: i64,
    pub honor_gilt_set: i64,
    pub upgradable_guns: i64,
    pub rare_glider: i64,
    pub vehicle_skin: i64,
    pub special_titles: i64,
    pub images: Vec<String>,
}

impl ListingPayload {
    /// Assemble the payload from the form and gallery.
    ///
    /// An empty gallery sends `[placeholder]` instead.
    pub fn build(
        user: &SessionUser,
        form: &ListingForm,
        images: &[String],
        placeholder: &str,
    ) -> Self {
        let images = if images.is_empty() {
            vec![placeholder.to_string()]
        } else {
            images.to_vec()
        };

        Self {
            seller_id: seller_id(user),
            uid: form.uid.trim().to_string(),
            title: form.title.trim().to_string(),
            description: form.highlights.trim().to_string(),
            rank: form.rank.trim().to_string(),
            level: form.stat_value(StatField::Level),
            mythic_count: form.stat_value(StatField::MythicCount),
            legendary_count: form.stat_value(StatField::LegendaryCount),
            xsuit_count: form.stat_value(StatField::XsuitCount),
            gilt_count: form.stat_value(StatField::GiltCount),
            honor_gilt_set: form.stat_value(StatField::HonorGiltSet),
            upgradable_guns: form.stat_value(StatField::UpgradableGuns),
            rare_glider: form.stat_value(StatField::RareGlider),
            vehicle_skin: form.stat_value(StatField::VehicleSkin),
            special_titles: form.stat_value(StatField::SpecialTitles),
            images,
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Resolve the seller id sent with a listing.
///
/// Precedence, first match wins:
/// 1. `user.id` when truthy, sent as-is (a number stays a number)
/// 2. `user.username` when non-empty
/// 3. `user.id` rendered as a string, when that string is non-empty
///    (so `0` becomes `"0"` and a missing id becomes `"undefined"`)
/// 4. `"unknown"`
pub fn seller_id(user: &SessionUser) -> Value {
    if let Some(id) = user.id.as_ref().filter(|id| is_truthy(id)) {
        return id.clone();
    }
    if let Some(username) = user.username.as_deref().filter(|u| !u.is_empty()) {
        return Value::String(username.to_string());
    }
    let rendered = match &user.id {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    if rendered.is_empty() {
        Value::String("unknown".to_string())
    } else {
        Value::String(rendered)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
