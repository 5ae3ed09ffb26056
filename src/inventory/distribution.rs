//! Consumption distribution across multiple consumable items.
//!
//! When a tray-level consumption is recorded (e.g. a print job drew 30g
//! from a multi-spool tray), the total must be split across the tray's
//! items. The split must reconcile: the distributed amounts sum to the
//! requested total within a small absolute tolerance, or the whole
//! operation fails — a split that cannot reconcile is never rounded
//! into success.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::model::{keys, Edge, Entity, EntityId, EntityType, InventoryItemView};
use crate::{Error, Result};

/// Maximum absolute divergence between the requested total and the sum
/// of distributed amounts.
pub const RECONCILE_TOLERANCE: f64 = 0.01;

/// How to split a total across items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DistributionStrategy {
    /// Split in proportion to each item's current quantity. The default.
    ProportionalByQuantity,
    /// Split evenly regardless of quantity.
    EqualSplit,
    /// Caller-specified amount per item id. Every item must be covered.
    Specified(HashMap<EntityId, f64>),
}

impl Default for DistributionStrategy {
    fn default() -> Self {
        DistributionStrategy::ProportionalByQuantity
    }
}

/// One item's share of a distributed total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub item_id: EntityId,
    pub amount: f64,
}

/// Split `total` across `items` (pairs of id and current quantity).
///
/// The result always reconciles: `Σ amount == total` within
/// [`RECONCILE_TOLERANCE`], or an [`Error::DistributionMismatch`] is
/// returned.
pub fn distribute(
    items: &[(EntityId, f64)],
    total: f64,
    strategy: &DistributionStrategy,
) -> Result<Vec<Share>> {
    if items.is_empty() {
        return Err(Error::Precondition(
            "cannot distribute consumption across zero items".into(),
        ));
    }
    if total < 0.0 {
        return Err(Error::Precondition(format!(
            "consumption total must be non-negative, got {total}"
        )));
    }

    let shares: Vec<Share> = match strategy {
        DistributionStrategy::ProportionalByQuantity => {
            let quantity_sum: f64 = items.iter().map(|(_, q)| q).sum();
            if quantity_sum <= 0.0 {
                return Err(Error::Precondition(format!(
                    "proportional distribution requires a positive quantity sum, got {quantity_sum}"
                )));
            }
            items
                .iter()
                .map(|(id, quantity)| Share {
                    item_id: id.clone(),
                    amount: total * quantity / quantity_sum,
                })
                .collect()
        }
        DistributionStrategy::EqualSplit => {
            let each = total / items.len() as f64;
            items
                .iter()
                .map(|(id, _)| Share { item_id: id.clone(), amount: each })
                .collect()
        }
        DistributionStrategy::Specified(amounts) => items
            .iter()
            .map(|(id, _)| {
                amounts
                    .get(id)
                    .map(|amount| Share { item_id: id.clone(), amount: *amount })
                    .ok_or_else(|| {
                        Error::Precondition(format!("no specified amount for item {id}"))
                    })
            })
            .collect::<Result<Vec<Share>>>()?,
    };

    let distributed: f64 = shares.iter().map(|s| s.amount).sum();
    if (distributed - total).abs() > RECONCILE_TOLERANCE {
        return Err(Error::DistributionMismatch { requested: total, distributed });
    }
    Ok(shares)
}

/// Distribute a consumption across inventory items in the graph and
/// record it.
///
/// Resolves each item's current quantity, splits `total` with the given
/// strategy, decrements every item, and records an `Activity` entity
/// (`activity_type = "consumption"`) with one directional `hadMovement`
/// edge per touched item carrying that item's share. Returns the
/// activity's id.
///
/// Nothing is mutated until every precondition has passed: missing
/// entities, non-inventory entities, items without a quantity, and
/// shares exceeding an item's current quantity all fail up front.
pub fn record_consumption(
    graph: &mut Graph,
    item_ids: &[EntityId],
    total: f64,
    strategy: &DistributionStrategy,
) -> Result<EntityId> {
    let mut items: Vec<(EntityId, f64)> = Vec::with_capacity(item_ids.len());
    for id in item_ids {
        let entity = graph
            .get_entity(id)
            .ok_or_else(|| Error::NotFound(format!("inventory item {id}")))?;
        let view = InventoryItemView::of(entity).ok_or_else(|| {
            Error::Precondition(format!("{id} is a {}, not an inventory item", entity.entity_type))
        })?;
        let quantity = view.current_quantity().ok_or_else(|| {
            Error::Precondition(format!("{id} has no current quantity"))
        })?;
        items.push((id.clone(), quantity));
    }

    let shares = distribute(&items, total, strategy)?;

    for (share, (_, quantity)) in shares.iter().zip(&items) {
        if share.amount > quantity + RECONCILE_TOLERANCE {
            return Err(Error::Precondition(format!(
                "share {} for item {} exceeds its current quantity {}",
                share.amount, share.item_id, quantity
            )));
        }
    }

    for (share, (_, quantity)) in shares.iter().zip(&items) {
        let entity = graph
            .get_entity_mut(&share.item_id)
            .ok_or_else(|| Error::NotFound(format!("inventory item {}", share.item_id)))?;
        entity.set_property(keys::CURRENT_QUANTITY, quantity - share.amount);
    }

    let activity = Entity::new(EntityType::Activity, "consumption")
        .with_property(keys::ACTIVITY_TYPE, "consumption")
        .with_property(keys::AMOUNT, total)
        .with_property(keys::OCCURRED_AT, Utc::now());
    let activity_id = activity.id().clone();
    graph.add_entity(activity);

    for share in &shares {
        graph.add_edge(
            Edge::new(activity_id.clone(), share.item_id.clone(), "hadMovement")
                .with_property(keys::AMOUNT, share.amount),
        );
    }

    Ok(activity_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<EntityId> {
        names.iter().map(|n| EntityId::new(*n)).collect()
    }

    #[test]
    fn test_proportional_distribution_scenario() {
        // 30g across {A:50, B:30, C:20} → {A:15, B:9, C:6}.
        let items: Vec<(EntityId, f64)> = ids(&["A", "B", "C"])
            .into_iter()
            .zip([50.0, 30.0, 20.0])
            .collect();
        let shares = distribute(&items, 30.0, &DistributionStrategy::ProportionalByQuantity).unwrap();

        assert_eq!(shares[0].amount, 15.0);
        assert_eq!(shares[1].amount, 9.0);
        assert_eq!(shares[2].amount, 6.0);
        let sum: f64 = shares.iter().map(|s| s.amount).sum();
        assert_eq!(sum, 30.0);
    }

    #[test]
    fn test_equal_split() {
        let items: Vec<(EntityId, f64)> =
            ids(&["A", "B", "C"]).into_iter().zip([50.0, 30.0, 20.0]).collect();
        let shares = distribute(&items, 30.0, &DistributionStrategy::EqualSplit).unwrap();
        assert!(shares.iter().all(|s| s.amount == 10.0));
    }

    #[test]
    fn test_specified_must_cover_every_item() {
        let items: Vec<(EntityId, f64)> =
            ids(&["A", "B"]).into_iter().zip([50.0, 30.0]).collect();

        let mut amounts = HashMap::new();
        amounts.insert(EntityId::new("A"), 20.0);
        let missing = distribute(&items, 30.0, &DistributionStrategy::Specified(amounts.clone()));
        assert!(matches!(missing, Err(Error::Precondition(_))));

        amounts.insert(EntityId::new("B"), 10.0);
        let shares = distribute(&items, 30.0, &DistributionStrategy::Specified(amounts)).unwrap();
        assert_eq!(shares.len(), 2);
    }

    #[test]
    fn test_specified_amounts_must_reconcile() {
        let items: Vec<(EntityId, f64)> =
            ids(&["A", "B"]).into_iter().zip([50.0, 30.0]).collect();
        let mut amounts = HashMap::new();
        amounts.insert(EntityId::new("A"), 20.0);
        amounts.insert(EntityId::new("B"), 5.0);

        let result = distribute(&items, 30.0, &DistributionStrategy::Specified(amounts));
        match result {
            Err(Error::DistributionMismatch { requested, distributed }) => {
                assert_eq!(requested, 30.0);
                assert_eq!(distributed, 25.0);
            }
            other => panic!("expected DistributionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_proportional_rejects_zero_quantity_sum() {
        let items: Vec<(EntityId, f64)> =
            ids(&["A", "B"]).into_iter().zip([0.0, 0.0]).collect();
        assert!(distribute(&items, 30.0, &DistributionStrategy::ProportionalByQuantity).is_err());
    }

    #[test]
    fn test_empty_items_rejected() {
        assert!(distribute(&[], 30.0, &DistributionStrategy::ProportionalByQuantity).is_err());
    }
}
