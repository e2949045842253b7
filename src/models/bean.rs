// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Coffee bean model.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// One axis of a bean's flavor profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FlavorIntensity {
    #[validate(length(min = 1, max = 40))]
    pub name: String,
    /// Intensity on a 1-5 scale
    #[validate(range(min = 1, max = 5))]
    pub intensity: u8,
}

/// A coffee bean stored in the `beans` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Bean {
    /// Document ID
    pub id: String,
    /// Owning roaster
    pub roaster_id: String,
    pub name: String,
    #[serde(default)]
    pub origin: String,
    /// Processing method (washed, natural, honey, ...)
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub roast_level: String,
    #[serde(default)]
    pub tasting_notes: Vec<String>,
    #[serde(default)]
    pub flavor_profile: Vec<FlavorIntensity>,
    #[serde(default)]
    pub price: Option<f64>,
    /// Mean review rating, None until the first review
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// Mean of the given ratings rounded to two decimals.
pub fn average_rating(ratings: &[u8]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(*r)).sum();
    let mean = f64::from(sum) / ratings.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}
