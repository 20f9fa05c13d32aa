//! Snapshot round-trips of a fully planned graph.
//!
//! A planned factory serializes through bitcode and comes back
//! structurally identical, including the creation-order iteration
//! contract, and planning can resume on the restored graph.

use fabrica_core::factory::{Requirement, build_factory};
use fabrica_core::graph::FactoryGraph;
use fabrica_core::id::ItemId;
use fabrica_core::test_utils::{demand, fixture_catalog};
use fabrica_core::validation::audit;
use std::collections::BTreeMap;

fn planned_graph() -> (fabrica_core::catalog::Catalog, FactoryGraph, BTreeMap<ItemId, Requirement>) {
    let cat = fixture_catalog();
    let aluminium = cat.item_id("aluminium").unwrap();
    let refined_iron = cat.item_id("refined_iron").unwrap();
    let polycarbonate = cat.item_id("polycarbonate").unwrap();
    let requirements = demand(&[
        (aluminium, 5, 100),
        (refined_iron, 2, 0),
        (polycarbonate, 2, 50),
    ]);
    let mut graph = FactoryGraph::new();
    build_factory(&cat, &mut graph, &requirements).unwrap();
    (cat, graph, requirements)
}

#[test]
fn bitcode_round_trip_preserves_graph() {
    let (cat, graph, requirements) = planned_graph();

    let bytes = bitcode::serialize(&graph).expect("serialize planned graph");
    let restored: FactoryGraph = bitcode::deserialize(&bytes).expect("deserialize planned graph");

    assert_eq!(restored.node_count(), graph.node_count());
    assert_eq!(restored.link_count(), graph.link_count());
    assert_eq!(restored.node_ids(), graph.node_ids());

    for &item in requirements.keys() {
        assert_eq!(restored.outputs_of(item), graph.outputs_of(item));
        for output in graph.outputs_of(item) {
            assert_eq!(restored.output_spec(output), graph.output_spec(output));
            assert_eq!(restored.ingress(output), graph.ingress(output));
            assert_eq!(restored.egress(output), graph.egress(output));
        }
    }

    audit(&cat, &restored).unwrap();
}

#[test]
fn planning_resumes_on_restored_graph() {
    let (cat, graph, _) = planned_graph();
    let bytes = bitcode::serialize(&graph).expect("serialize planned graph");
    let mut restored: FactoryGraph = bitcode::deserialize(&bytes).expect("deserialize planned graph");

    // Add demand for a new item onto the snapshot.
    let screw = cat.item_id("screw").unwrap();
    build_factory(&cat, &mut restored, &demand(&[(screw, 2, 10)])).unwrap();

    let outputs = restored.outputs_of(screw);
    assert_eq!(outputs.len(), 1);
    assert!(restored.container(outputs[0]).unwrap().changed);
}
