//! Factory orchestration.
//!
//! [`build_factory`] turns a demand map into a complete production chain:
//! it sets up (or reuses) an output container per requested item, spawns
//! the requested producer industries, plans their supply recursively, and
//! then runs the fixed post-pass sequence -- catalyst loop closure,
//! byproduct reclamation, fan-in limiting, and the structural audit.
//! Requirements are keyed by `ItemId` in a `BTreeMap`, so planning order
//! is deterministic regardless of how the caller assembled the map.
//!
//! The graph may already hold a previous build. Output containers are
//! baselined before planning and re-checked afterwards, flagging the ones
//! whose demand or supplier set this build altered.

use crate::byproduct::reclaim_byproducts;
use crate::catalog::Catalog;
use crate::catalyst::close_catalyst_loops;
use crate::error::PlanError;
use crate::fanin::limit_industry_fan_in;
use crate::fixed::{Fixed64, ceil_scaled};
use crate::graph::{FactoryGraph, MAX_CONTAINER_LINKS};
use crate::id::{ItemId, NodeId};
use crate::planner::{catalyst_unit, supply_industry};
use crate::validation::audit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Demand for one item: how many producer industries to dedicate to it and
/// how much finished stock its output container should hold back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub count: u32,
    pub maintain: u64,
}

/// Plan production chains for every requirement, then close catalyst
/// loops, reclaim byproducts, limit industry fan-in, and audit the result.
///
/// On error the graph may be partially mutated and must be discarded.
pub fn build_factory(
    catalog: &Catalog,
    graph: &mut FactoryGraph,
    requirements: &BTreeMap<ItemId, Requirement>,
) -> Result<(), PlanError> {
    graph.record_baseline();

    for (&item, requirement) in requirements {
        if requirement.count == 0 {
            continue;
        }
        plan_requirement(catalog, graph, item, requirement)?;
    }

    close_catalyst_loops(catalog, graph)?;
    reclaim_byproducts(catalog, graph)?;
    limit_industry_fan_in(catalog, graph)?;
    audit(catalog, graph)?;
    graph.reconcile_changed();
    Ok(())
}

/// Plan a fresh graph from a demand map.
pub fn build_new_factory(
    catalog: &Catalog,
    requirements: &BTreeMap<ItemId, Requirement>,
) -> Result<FactoryGraph, PlanError> {
    let mut graph = FactoryGraph::new();
    build_factory(catalog, &mut graph, requirements)?;
    Ok(graph)
}

/// Set up output containers for one requirement and spawn its producers.
fn plan_requirement(
    catalog: &Catalog,
    graph: &mut FactoryGraph,
    item: ItemId,
    requirement: &Requirement,
) -> Result<(), PlanError> {
    let recipe = catalog.recipe_for(item)?;
    let product_rate = recipe.product_rate();
    let count = requirement.count as usize;
    let total_rate = product_rate * Fixed64::from_num(requirement.count);

    // Reuse an existing output of the item if it can take every new
    // producer, and its catalyst stock can feed them.
    let mut targets: Vec<NodeId> = Vec::new();
    for output in graph.outputs_of(item) {
        if !graph.can_add_incoming(output, count) {
            continue;
        }
        if let Some(unit) = catalyst_unit(catalog, graph, output)
            && !graph.can_add_outgoing(unit, count)
        {
            continue;
        }
        graph.bump_output(output, total_rate, requirement.maintain);
        targets.push(output);
        break;
    }

    // Failing that, promote a plain container in place, keeping its links
    // and its node identity.
    if targets.is_empty() {
        for container in graph.containers_of(item) {
            let already_special = match graph.container(container) {
                Some(c) => c.output.is_some() || c.split.is_some(),
                None => continue,
            };
            if already_special || !graph.can_add_incoming(container, count) {
                continue;
            }
            if let Some(unit) = catalyst_unit(catalog, graph, container)
                && !graph.can_add_outgoing(unit, count)
            {
                continue;
            }
            graph.promote_to_output(container, total_rate, requirement.maintain);
            targets.push(container);
            break;
        }
    }

    // Fresh outputs. A demand for more producers than one container can
    // accept is chunked greedily; each chunk records its share of the
    // total flow and of the maintained stock.
    if targets.is_empty() {
        if count <= MAX_CONTAINER_LINKS {
            targets.push(graph.add_output(item, total_rate, requirement.maintain));
        } else {
            let mut remaining = count;
            while remaining > 0 {
                let allot = remaining.min(MAX_CONTAINER_LINKS);
                let fraction =
                    Fixed64::from_num(allot as i64) / Fixed64::from_num(count as i64);
                let maintain = ceil_scaled(requirement.maintain, fraction);
                targets.push(graph.add_split_output(
                    item,
                    product_rate * Fixed64::from_num(allot as i64),
                    maintain,
                    fraction,
                ));
                remaining -= allot;
            }
        }
    }

    // Spawn the producers, first-fit across the output containers.
    for _ in 0..count {
        let industry = graph.add_industry(item);
        let target = targets
            .iter()
            .copied()
            .find(|&t| graph.can_add_incoming(t, 1))
            .ok_or(PlanError::MissingOutput { node: industry })?;
        graph.link(industry, target, Some(item), product_rate);
        let unit = catalyst_unit(catalog, graph, target);
        supply_industry(catalog, graph, industry, recipe, unit)?;
    }
    Ok(())
}
