//! Inventory inference: calibration, weight ↔ quantity conversion, and
//! consumption distribution.
//!
//! Pure arithmetic over inventory entities — this layer consumes the
//! graph and the entity primitives but adds no storage structure of its
//! own.

pub mod distribution;
pub mod inference;

pub use distribution::{
    distribute, record_consumption, DistributionStrategy, Share, RECONCILE_TOLERANCE,
};
pub use inference::{
    apply_weight_reading, calibrate, calibrate_item, infer_from_quantity, infer_from_weight,
    Calibration, WeightEstimate, WeightInference,
};
