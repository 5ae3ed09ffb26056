//! End-to-end tests for inventory inference: the calibration scenario,
//! the weight/quantity round trip, and consumption distribution over
//! graph entities.

use std::collections::HashMap;

use proptest::prelude::*;
use stocktrace::{
    calibrate, distribute, infer_from_quantity, infer_from_weight, keys, record_consumption,
    DistributionStrategy, Edge, Entity, EntityId, EntityType, Graph, PropertyValue,
    TrackingMode,
};

// ============================================================================
// 1. The calibration scenario
// ============================================================================

#[test]
fn test_calibrate_then_infer_scenario() {
    // Calibrate: 247g total, 47g tare, 100 known units → 2.0g per unit.
    let cal = calibrate(247.0, 100.0, Some(47.0)).unwrap();
    assert_eq!(cal.unit_weight, 2.0);

    // Later reading: 187g total → 140g net → 70 units, exact.
    let inf = infer_from_weight(TrackingMode::Discrete, 187.0, 47.0, cal.unit_weight).unwrap();
    assert_eq!(inf.net_weight, 140.0);
    assert_eq!(inf.quantity, 70.0);
    assert_eq!(inf.confidence, 100.0);
}

// ============================================================================
// 2. Round trip: weight → calibration → quantity → weight
// ============================================================================

proptest! {
    #[test]
    fn prop_quantity_inference_inverts_calibration(
        tare in 0.0f64..500.0,
        net in 0.1f64..5000.0,
        quantity in 0.1f64..1000.0,
    ) {
        let total = tare + net;
        let cal = calibrate(total, quantity, Some(tare)).unwrap();
        let est = infer_from_quantity(quantity, cal.tare_weight, cal.unit_weight).unwrap();

        let tolerance = 1e-9 * total.max(1.0);
        prop_assert!((est.total_weight - total).abs() <= tolerance);
        prop_assert_eq!(est.confidence, 100.0);
    }
}

// ============================================================================
// 3. Distribution arithmetic
// ============================================================================

#[test]
fn test_proportional_distribution_reconciles_exactly() {
    let items: Vec<(EntityId, f64)> = [("A", 50.0), ("B", 30.0), ("C", 20.0)]
        .into_iter()
        .map(|(id, q)| (EntityId::new(id), q))
        .collect();

    let shares = distribute(&items, 30.0, &DistributionStrategy::ProportionalByQuantity).unwrap();
    let amounts: Vec<f64> = shares.iter().map(|s| s.amount).collect();
    assert_eq!(amounts, vec![15.0, 9.0, 6.0]);
    assert_eq!(amounts.iter().sum::<f64>(), 30.0);
}

proptest! {
    #[test]
    fn prop_distribution_always_reconciles_or_fails(
        quantities in proptest::collection::vec(0.1f64..1000.0, 1..10),
        total in 0.0f64..500.0,
    ) {
        let items: Vec<(EntityId, f64)> = quantities
            .iter()
            .enumerate()
            .map(|(i, q)| (EntityId::new(format!("item-{i}")), *q))
            .collect();

        for strategy in [
            DistributionStrategy::ProportionalByQuantity,
            DistributionStrategy::EqualSplit,
        ] {
            if let Ok(shares) = distribute(&items, total, &strategy) {
                let sum: f64 = shares.iter().map(|s| s.amount).sum();
                prop_assert!((sum - total).abs() <= 0.01);
                prop_assert_eq!(shares.len(), items.len());
            }
        }
    }
}

// ============================================================================
// 4. Graph-coupled consumption recording
// ============================================================================

fn tray_with_spools(graph: &mut Graph, quantities: &[f64]) -> (EntityId, Vec<EntityId>) {
    let tray = Entity::new(EntityType::Virtual, "tray")
        .with_property(keys::VIRTUAL_TYPE, "filament_tray");
    let tray_id = tray.id().clone();
    graph.add_entity(tray);

    let spool_ids: Vec<EntityId> = quantities
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let spool = Entity::new(EntityType::InventoryItem, format!("spool {i}"))
                .with_property(keys::TRACKING_MODE, "continuous")
                .with_property(keys::CURRENT_QUANTITY, *q);
            let id = spool.id().clone();
            graph.add_entity(spool);
            graph.add_edge(Edge::new(tray_id.clone(), id.clone(), "tracks"));
            id
        })
        .collect();
    (tray_id, spool_ids)
}

#[test]
fn test_record_consumption_updates_items_and_records_activity() {
    let mut graph = Graph::new();
    let (_, spools) = tray_with_spools(&mut graph, &[50.0, 30.0, 20.0]);

    let activity_id = record_consumption(
        &mut graph,
        &spools,
        30.0,
        &DistributionStrategy::ProportionalByQuantity,
    )
    .unwrap();

    // Quantities decremented proportionally.
    let remaining: Vec<f64> = spools
        .iter()
        .map(|id| {
            graph
                .get_entity(id)
                .unwrap()
                .property(keys::CURRENT_QUANTITY)
                .and_then(|v| v.as_double())
                .unwrap()
        })
        .collect();
    assert_eq!(remaining, vec![35.0, 21.0, 14.0]);
    assert_eq!(remaining.iter().sum::<f64>(), 70.0);

    // One activity entity with one hadMovement edge per spool.
    let activity = graph.get_entity(&activity_id).unwrap();
    assert_eq!(activity.entity_type, EntityType::Activity);
    assert_eq!(
        activity.property(keys::AMOUNT).and_then(|v| v.as_double()),
        Some(30.0),
    );
    let movements = graph.edges_of_relationship("hadMovement");
    assert_eq!(movements.len(), 3);
    for edge in &movements {
        assert_eq!(edge.from, activity_id);
        assert!(spools.contains(&edge.to));
    }

    // Movements are queryable through the property filter path too.
    let largest = graph.find_edges(&[(keys::AMOUNT, PropertyValue::from(15.0))]);
    assert_eq!(largest.len(), 1);
    assert_eq!(largest[0].to, spools[0]);
}

#[test]
fn test_record_consumption_rejects_overdraw_without_mutating() {
    let mut graph = Graph::new();
    let (_, spools) = tray_with_spools(&mut graph, &[5.0, 5.0]);

    let mut amounts = HashMap::new();
    amounts.insert(spools[0].clone(), 9.0);
    amounts.insert(spools[1].clone(), 1.0);
    let result = record_consumption(
        &mut graph,
        &spools,
        10.0,
        &DistributionStrategy::Specified(amounts),
    );
    assert!(result.is_err());

    // No partial decrement, no activity, no edges.
    for id in &spools {
        let quantity = graph
            .get_entity(id)
            .unwrap()
            .property(keys::CURRENT_QUANTITY)
            .and_then(|v| v.as_double());
        assert_eq!(quantity, Some(5.0));
    }
    assert!(graph.entities_of_type(EntityType::Activity).is_empty());
    assert!(graph.edges_of_relationship("hadMovement").is_empty());
}

#[test]
fn test_record_consumption_requires_known_items() {
    let mut graph = Graph::new();
    let ghost = EntityId::new("ghost");
    let result = record_consumption(
        &mut graph,
        &[ghost],
        10.0,
        &DistributionStrategy::EqualSplit,
    );
    assert!(matches!(result, Err(stocktrace::Error::NotFound(_))));
}
