//! # Inventory Graph Model
//!
//! Pure DTOs for the typed inventory graph. These types cross every
//! boundary: graph store ↔ derivation cache ↔ inference layer ↔ caller.
//!
//! Design rule: no storage types, no provider types here. This module is
//! pure data — no I/O, no state, no locks.

pub mod value;
pub mod entity;
pub mod edge;
pub mod views;

pub use value::{PropertyValue, Quantity};
pub use entity::{Entity, EntityId, EntityMetadata, EntityType};
pub use edge::{Edge, EdgeId, EdgeMetadata};
pub use views::{
    keys, ActivityView, IdentifierView, InventoryItemView, StockDefinitionView,
    TrackingMode, VirtualView,
};
