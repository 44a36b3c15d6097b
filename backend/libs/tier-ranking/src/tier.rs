use crate::error::{RankingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bottom of the rating scale.
pub const SCALE_MIN: f64 = 0.0;
/// Top of the rating scale. The highest tier always reaches it.
pub const SCALE_MAX: f64 = 10.0;

/// A named band of the rating scale, closed at its upper cutoff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tier {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Presentation hint, never interpreted here.
    #[serde(default)]
    pub color_hint: String,
    pub cutoff: f64,
}

impl Tier {
    pub fn new(id: impl Into<String>, name: impl Into<String>, cutoff: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color_hint: String::new(),
            cutoff,
        }
    }

    pub fn with_color(mut self, color_hint: impl Into<String>) -> Self {
        self.color_hint = color_hint.into();
        self
    }
}

/// Half-open interval `(lower, upper]` covered by one tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl TierBounds {
    pub fn contains(&self, rating: f64) -> bool {
        rating > self.lower && rating <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Sort tiers ascending by cutoff and validate the partition they describe.
///
/// Rejects empty lists, blank or duplicate ids, cutoffs outside the scale
/// (or non-finite), a zero first cutoff, and cutoffs that are not strictly
/// increasing once sorted.
pub fn sort_tiers(mut tiers: Vec<Tier>) -> Result<Vec<Tier>> {
    if tiers.is_empty() {
        return Err(RankingError::InvalidTierData(
            "at least one tier is required".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(tiers.len());
    for tier in &tiers {
        if tier.id.trim().is_empty() {
            return Err(RankingError::InvalidTierData(
                "tier id must not be blank".to_string(),
            ));
        }
        if !seen.insert(tier.id.as_str()) {
            return Err(RankingError::InvalidTierData(format!(
                "duplicate tier id '{}'",
                tier.id
            )));
        }
        if !tier.cutoff.is_finite() || tier.cutoff < SCALE_MIN || tier.cutoff > SCALE_MAX {
            return Err(RankingError::InvalidTierData(format!(
                "tier '{}' cutoff {} is outside [{}, {}]",
                tier.id, tier.cutoff, SCALE_MIN, SCALE_MAX
            )));
        }
    }

    // Finite cutoffs only past this point, so partial_cmp never fails.
    tiers.sort_by(|a, b| {
        a.cutoff
            .partial_cmp(&b.cutoff)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if tiers[0].cutoff <= SCALE_MIN {
        return Err(RankingError::InvalidTierData(format!(
            "lowest tier '{}' has an empty band",
            tiers[0].id
        )));
    }

    for pair in tiers.windows(2) {
        if pair[1].cutoff <= pair[0].cutoff {
            return Err(RankingError::InvalidTierData(format!(
                "cutoffs must be strictly increasing: '{}' and '{}' both at {}",
                pair[0].id, pair[1].id, pair[1].cutoff
            )));
        }
    }

    Ok(tiers)
}

/// Bounds of `tier_id` within an already sorted tier list.
pub fn bounds_of(sorted_tiers: &[Tier], tier_id: &str) -> Result<TierBounds> {
    let position = sorted_tiers
        .iter()
        .position(|t| t.id == tier_id)
        .ok_or_else(|| RankingError::InvalidTierData(format!("unknown tier '{}'", tier_id)))?;

    let lower = match position {
        0 => SCALE_MIN,
        n => sorted_tiers[n - 1].cutoff,
    };
    let upper = if position + 1 == sorted_tiers.len() {
        SCALE_MAX
    } else {
        sorted_tiers[position].cutoff
    };

    Ok(TierBounds { lower, upper })
}

/// Tier owning `rating`: the smallest cutoff at or above it, falling back to
/// the highest tier. `sorted_tiers` must be non-empty.
pub fn classify(rating: f64, sorted_tiers: &[Tier]) -> Option<&Tier> {
    sorted_tiers
        .iter()
        .find(|t| t.cutoff >= rating)
        .or_else(|| sorted_tiers.last())
}

/// A validated, cutoff-ordered tier list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TierLadder {
    tiers: Vec<Tier>,
}

impl TierLadder {
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        Ok(Self {
            tiers: sort_tiers(tiers)?,
        })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn into_tiers(self) -> Vec<Tier> {
        self.tiers
    }

    pub fn bounds_of(&self, tier_id: &str) -> Result<TierBounds> {
        bounds_of(&self.tiers, tier_id)
    }

    pub fn classify(&self, rating: f64) -> &Tier {
        // A ladder is never empty, so the fallback index is always valid.
        classify(rating, &self.tiers).unwrap_or(&self.tiers[self.tiers.len() - 1])
    }
}
