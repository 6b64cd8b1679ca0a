//! Eligibility classification of asset instances.
//!
//! Classification is pure: the same instance, cooldown and clock reading
//! always produce the same state, so it is recomputed every pass instead of
//! being cached.
//!
//! # Claim timestamp reconstruction
//!
//! Assets record their last production as a "claim reference": the
//! millisecond epoch with trailing digits truncated (e.g. `1650000000` for
//! `1650000000000`). [`reconstruct_claim_ms`] right-pads the digits with `0`
//! to [`CLAIM_REFERENCE_WIDTH`] characters and reads the result as
//! milliseconds. A reference that is empty, non-numeric or wider than the
//! full width is rejected; the classifier treats such an asset as cooling
//! down so that a bad marker never triggers a production.

use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::{AssetId, MS_PER_HOUR};

/// Width in digits of a millisecond Unix timestamp.
pub const CLAIM_REFERENCE_WIDTH: usize = 13;

/// Raw, possibly truncated, claim marker as reported by the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimReference(pub String);

impl ClaimReference {
    /// Wrap a raw marker.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

/// One externally owned unit of an asset class, as fetched this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInstance {
    /// Asset identifier.
    pub id: AssetId,
    /// Current charge count; `None` when the asset has never produced.
    pub charges: Option<u32>,
    /// Last production marker, if any.
    pub last_claim: Option<ClaimReference>,
}

impl AssetInstance {
    /// An instance with no production history.
    pub fn fresh(id: impl Into<AssetId>) -> Self {
        Self {
            id: id.into(),
            charges: None,
            last_claim: None,
        }
    }

    /// An instance with a charge count and claim marker.
    pub fn with_history(id: impl Into<AssetId>, charges: u32, last_claim: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            charges: Some(charges),
            last_claim: Some(ClaimReference::new(last_claim)),
        }
    }
}

/// Derived per-pass state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eligibility {
    /// Charges are depleted; a recharge is required before producing.
    NeedsCharge,
    /// Produced too recently.
    Cooldown,
    /// Ready to produce.
    Eligible,
}

/// Rebuild the full millisecond timestamp from a truncated claim reference.
///
/// # Errors
///
/// Returns [`SchedulerError::Malformed`] if the reference is empty, contains
/// anything but ASCII digits, or is wider than [`CLAIM_REFERENCE_WIDTH`].
pub fn reconstruct_claim_ms(reference: &ClaimReference) -> Result<u128, SchedulerError> {
    let digits = reference.0.trim();
    if digits.is_empty()
        || digits.len() > CLAIM_REFERENCE_WIDTH
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(SchedulerError::Malformed(format!(
            "claim reference `{}`",
            reference.0
        )));
    }
    let padded = format!("{digits:0<width$}", width = CLAIM_REFERENCE_WIDTH);
    padded
        .parse::<u128>()
        .map_err(|e| SchedulerError::Malformed(format!("claim reference `{}`: {e}", reference.0)))
}

/// Classify an instance for this pass.
#[must_use]
pub fn classify(instance: &AssetInstance, cooldown_hours: u32, now_ms: u128) -> Eligibility {
    let Some(charges) = instance.charges else {
        return Eligibility::Eligible;
    };
    if charges == 0 {
        return Eligibility::NeedsCharge;
    }
    let Some(reference) = instance.last_claim.as_ref() else {
        return Eligibility::Eligible;
    };

    match reconstruct_claim_ms(reference) {
        Ok(claimed_at) => {
            let cooldown_ms = u128::from(cooldown_hours) * MS_PER_HOUR;
            // A claim in the future counts as zero elapsed time.
            let elapsed = now_ms.saturating_sub(claimed_at);
            if claimed_at > now_ms || elapsed < cooldown_ms {
                Eligibility::Cooldown
            } else {
                Eligibility::Eligible
            }
        }
        Err(e) => {
            tracing::warn!("asset {} held in cooldown: {}", instance.id, e);
            Eligibility::Cooldown
        }
    }
}

/// Instances of one class grouped by eligibility, each in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    /// Depleted instances.
    pub needs_charge: Vec<AssetId>,
    /// Instances still cooling down.
    pub cooldown: Vec<AssetId>,
    /// Instances ready to produce.
    pub eligible: Vec<AssetId>,
}

/// Classify a whole fetch result, preserving order within each group.
#[must_use]
pub fn partition(instances: &[AssetInstance], cooldown_hours: u32, now_ms: u128) -> Classified {
    let mut out = Classified::default();
    for instance in instances {
        let bucket = match classify(instance, cooldown_hours, now_ms) {
            Eligibility::NeedsCharge => &mut out.needs_charge,
            Eligibility::Cooldown => &mut out.cooldown,
            Eligibility::Eligible => &mut out.eligible,
        };
        bucket.push(instance.id.clone());
    }
    out
}
