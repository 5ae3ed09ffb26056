//! Bidirectional weight ↔ quantity inference.
//!
//! A scale reading is the only cheap, reliable signal about a physical
//! item's quantity. Calibration fixes the per-unit weight; forward
//! inference turns a later total weight into a quantity, reverse
//! inference turns a known quantity back into an expected weight.
//! All functions are pure arithmetic over explicit inputs; the
//! `*_item` variants read from and write back to an entity's property
//! map.

use serde::{Deserialize, Serialize};

use crate::model::{keys, Entity, InventoryItemView, TrackingMode};
use crate::{Error, Result};

/// Result of calibrating from a known quantity at a known total weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub unit_weight: f64,
    pub tare_weight: f64,
}

/// Result of inferring a quantity from a weight reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightInference {
    pub net_weight: f64,
    /// Whole units in discrete mode, fractional in continuous mode.
    pub quantity: f64,
    /// Percent confidence: how close the reading was to a whole number
    /// of units. Always in [50, 100] for discrete mode, 100 for
    /// continuous mode.
    pub confidence: f64,
    pub mode: TrackingMode,
}

/// Result of inferring a weight from a known quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEstimate {
    pub net_weight: f64,
    pub total_weight: f64,
    /// Always 100 — the reverse direction is exact by construction.
    pub confidence: f64,
}

/// Derive the unit weight from a reading at a known quantity:
/// `unit_weight = (total_weight − tare) / known_quantity`.
///
/// Fails when `known_quantity <= 0`, or when the reading is below the
/// tare (a negative net weight cannot calibrate anything).
pub fn calibrate(total_weight: f64, known_quantity: f64, tare_weight: Option<f64>) -> Result<Calibration> {
    if known_quantity <= 0.0 {
        return Err(Error::Precondition(format!(
            "calibration requires a positive known quantity, got {known_quantity}"
        )));
    }
    let tare = tare_weight.unwrap_or(0.0);
    let net = total_weight - tare;
    if net < 0.0 {
        return Err(Error::Precondition(format!(
            "total weight {total_weight} is below tare {tare}"
        )));
    }
    Ok(Calibration { unit_weight: net / known_quantity, tare_weight: tare })
}

/// Forward inference: quantity from a total-weight reading.
///
/// Discrete mode floors `net / unit_weight` to whole units and scores
/// confidence by the distance to that floor; continuous mode keeps the
/// fraction and is exact.
pub fn infer_from_weight(
    mode: TrackingMode,
    total_weight: f64,
    tare_weight: f64,
    unit_weight: f64,
) -> Result<WeightInference> {
    if unit_weight <= 0.0 {
        return Err(Error::Precondition(format!(
            "inference requires a positive unit weight, got {unit_weight}"
        )));
    }
    let net_weight = total_weight - tare_weight;
    if net_weight < 0.0 {
        return Err(Error::Precondition(format!(
            "total weight {total_weight} is below tare {tare_weight}"
        )));
    }

    let exact = net_weight / unit_weight;
    let (quantity, confidence) = match mode {
        TrackingMode::Discrete => {
            let floored = exact.floor();
            let confidence = (100.0 * (1.0 - (exact - floored).abs())).clamp(50.0, 100.0);
            (floored, confidence)
        }
        TrackingMode::Continuous => (exact, 100.0),
    };

    Ok(WeightInference { net_weight, quantity, confidence, mode })
}

/// Reverse inference: expected weight from a known quantity. Exact
/// algebraic inverse of [`infer_from_weight`], confidence always 100.
pub fn infer_from_quantity(quantity: f64, tare_weight: f64, unit_weight: f64) -> Result<WeightEstimate> {
    if unit_weight <= 0.0 {
        return Err(Error::Precondition(format!(
            "inference requires a positive unit weight, got {unit_weight}"
        )));
    }
    if quantity < 0.0 {
        return Err(Error::Precondition(format!(
            "quantity must be non-negative, got {quantity}"
        )));
    }
    let net_weight = quantity * unit_weight;
    Ok(WeightEstimate {
        net_weight,
        total_weight: net_weight + tare_weight,
        confidence: 100.0,
    })
}

// ============================================================================
// Entity-coupled variants
// ============================================================================

fn item_view<'a>(entity: &'a Entity) -> Result<InventoryItemView<'a>> {
    InventoryItemView::of(entity).ok_or_else(|| {
        Error::Precondition(format!(
            "{} is a {}, not an inventory item",
            entity.id(),
            entity.entity_type
        ))
    })
}

/// Calibrate an inventory item in place: reads the stored tare (absent
/// means zero), writes the derived `unit_weight` back.
pub fn calibrate_item(entity: &mut Entity, total_weight: f64, known_quantity: f64) -> Result<Calibration> {
    let tare = item_view(entity)?.tare_weight();
    let calibration = calibrate(total_weight, known_quantity, tare)?;
    entity.set_property(keys::UNIT_WEIGHT, calibration.unit_weight);
    if tare.is_none() {
        entity.set_property(keys::TARE_WEIGHT, calibration.tare_weight);
    }
    Ok(calibration)
}

/// Apply a scale reading to an inventory item: runs forward inference
/// from the stored tare/unit weight/tracking mode, then writes
/// `current_weight` and `current_quantity` back.
///
/// Fails when the item has no stored tare or unit weight — a reading
/// cannot be interpreted without calibration.
pub fn apply_weight_reading(entity: &mut Entity, total_weight: f64) -> Result<WeightInference> {
    let view = item_view(entity)?;
    let mode = view.tracking_mode();
    let tare = view.tare_weight().ok_or_else(|| {
        Error::Precondition(format!("{} has no tare weight", entity.id()))
    })?;
    let unit = view.unit_weight().ok_or_else(|| {
        Error::Precondition(format!("{} has no unit weight", entity.id()))
    })?;

    let inference = infer_from_weight(mode, total_weight, tare, unit)?;
    entity.set_property(keys::CURRENT_WEIGHT, total_weight);
    entity.set_property(keys::CURRENT_QUANTITY, inference.quantity);
    Ok(inference)
}
