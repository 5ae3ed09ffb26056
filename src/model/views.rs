//! Typed views over the generic entity envelope.
//!
//! The entity hierarchy (physical component, identifier, activity,
//! inventory item, …) is a closed set of variants over one envelope, not a
//! class tree. Each view borrows an [`Entity`], checks the discriminator
//! once, and exposes typed accessors over the property map.

use chrono::{DateTime, Utc};

use super::{Entity, EntityType};

/// Well-known property keys. Factories, views, and the inference layer
/// must agree on these.
pub mod keys {
    // Inventory items
    pub const TRACKING_MODE: &str = "tracking_mode";
    pub const CURRENT_QUANTITY: &str = "current_quantity";
    pub const CURRENT_WEIGHT: &str = "current_weight";
    pub const TARE_WEIGHT: &str = "tare_weight";
    pub const UNIT_WEIGHT: &str = "unit_weight";

    // Raw-scan identifiers
    pub const RAW_PAYLOAD: &str = "raw_payload";
    pub const CONTENT_HASH: &str = "content_hash";
    pub const SCAN_FORMAT: &str = "scan_format";

    // Activities
    pub const ACTIVITY_TYPE: &str = "activity_type";
    pub const AMOUNT: &str = "amount";
    pub const OCCURRED_AT: &str = "occurred_at";

    // Stock definitions
    pub const PRODUCT_NAME: &str = "product_name";
    pub const MATERIAL: &str = "material";
    pub const NOMINAL_QUANTITY: &str = "nominal_quantity";

    // Virtual entities
    pub const VIRTUAL_TYPE: &str = "virtual_type";
}

/// Discrete (countable units) vs continuous (weight/volume) quantity
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    Discrete,
    Continuous,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Discrete => "discrete",
            TrackingMode::Continuous => "continuous",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "discrete" => Some(TrackingMode::Discrete),
            "continuous" => Some(TrackingMode::Continuous),
            _ => None,
        }
    }
}

/// View over an `InventoryItem` entity.
#[derive(Debug, Clone, Copy)]
pub struct InventoryItemView<'a> {
    entity: &'a Entity,
}

impl<'a> InventoryItemView<'a> {
    pub fn of(entity: &'a Entity) -> Option<Self> {
        (entity.entity_type == EntityType::InventoryItem).then_some(Self { entity })
    }

    pub fn entity(&self) -> &'a Entity {
        self.entity
    }

    /// Defaults to discrete when the property is absent or unparseable.
    pub fn tracking_mode(&self) -> TrackingMode {
        self.entity
            .property(keys::TRACKING_MODE)
            .and_then(|v| v.as_text())
            .and_then(TrackingMode::parse)
            .unwrap_or(TrackingMode::Discrete)
    }

    pub fn current_quantity(&self) -> Option<f64> {
        self.entity.property(keys::CURRENT_QUANTITY).and_then(|v| v.as_double())
    }

    pub fn current_weight(&self) -> Option<f64> {
        self.entity.property(keys::CURRENT_WEIGHT).and_then(|v| v.as_double())
    }

    pub fn tare_weight(&self) -> Option<f64> {
        self.entity.property(keys::TARE_WEIGHT).and_then(|v| v.as_double())
    }

    pub fn unit_weight(&self) -> Option<f64> {
        self.entity.property(keys::UNIT_WEIGHT).and_then(|v| v.as_double())
    }
}

/// View over an `Identifier` entity (an RFID/NFC scan source).
#[derive(Debug, Clone, Copy)]
pub struct IdentifierView<'a> {
    entity: &'a Entity,
}

impl<'a> IdentifierView<'a> {
    pub fn of(entity: &'a Entity) -> Option<Self> {
        (entity.entity_type == EntityType::Identifier).then_some(Self { entity })
    }

    pub fn raw_payload(&self) -> Option<&'a [u8]> {
        self.entity.property(keys::RAW_PAYLOAD).and_then(|v| v.as_bytes())
    }

    /// Content hash declared by the scanner, not recomputed here.
    pub fn content_hash(&self) -> Option<&'a str> {
        self.entity.property(keys::CONTENT_HASH).and_then(|v| v.as_text())
    }

    pub fn scan_format(&self) -> Option<&'a str> {
        self.entity.property(keys::SCAN_FORMAT).and_then(|v| v.as_text())
    }
}

/// View over an `Activity` entity (movement, consumption, calibration).
#[derive(Debug, Clone, Copy)]
pub struct ActivityView<'a> {
    entity: &'a Entity,
}

impl<'a> ActivityView<'a> {
    pub fn of(entity: &'a Entity) -> Option<Self> {
        (entity.entity_type == EntityType::Activity).then_some(Self { entity })
    }

    pub fn activity_type(&self) -> Option<&'a str> {
        self.entity.property(keys::ACTIVITY_TYPE).and_then(|v| v.as_text())
    }

    pub fn amount(&self) -> Option<f64> {
        self.entity.property(keys::AMOUNT).and_then(|v| v.as_double())
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.entity.property(keys::OCCURRED_AT).and_then(|v| v.as_datetime())
    }
}

/// View over a `StockDefinition` entity (a product/filament template).
#[derive(Debug, Clone, Copy)]
pub struct StockDefinitionView<'a> {
    entity: &'a Entity,
}

impl<'a> StockDefinitionView<'a> {
    pub fn of(entity: &'a Entity) -> Option<Self> {
        (entity.entity_type == EntityType::StockDefinition).then_some(Self { entity })
    }

    pub fn product_name(&self) -> Option<&'a str> {
        self.entity.property(keys::PRODUCT_NAME).and_then(|v| v.as_text())
    }

    pub fn material(&self) -> Option<&'a str> {
        self.entity.property(keys::MATERIAL).and_then(|v| v.as_text())
    }

    pub fn nominal_quantity(&self) -> Option<f64> {
        self.entity.property(keys::NOMINAL_QUANTITY).and_then(|v| v.as_double())
    }
}

/// View over a `Virtual` entity (e.g. a filament tray grouping).
#[derive(Debug, Clone, Copy)]
pub struct VirtualView<'a> {
    entity: &'a Entity,
}

impl<'a> VirtualView<'a> {
    pub fn of(entity: &'a Entity) -> Option<Self> {
        (entity.entity_type == EntityType::Virtual).then_some(Self { entity })
    }

    pub fn virtual_type(&self) -> Option<&'a str> {
        self.entity.property(keys::VIRTUAL_TYPE).and_then(|v| v.as_text())
    }
}
