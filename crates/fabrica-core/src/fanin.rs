//! Industry fan-in limiting.
//!
//! An industry accepts at most [`MAX_INDUSTRY_LINKS`] incoming links, but a
//! recipe may have more ingredients than that once catalyst stock and
//! split suppliers are wired in. This pass funnels the lowest-volume
//! ingredients through a transfer container: each funneled item keeps its
//! own transfer unit feeding the shared container, and the industry draws
//! the whole bundle through a single mixed link.
//!
//! Funneling the `n` cheapest ingredients frees `n - 1` links, so an
//! industry exceeding the limit by `k` needs `k + 1` items funneled.
//! Ingredients are ranked by per-craft quantity so the heaviest flows keep
//! their direct links.

use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::fixed::Rate;
use crate::graph::{FactoryGraph, MAX_INDUSTRY_LINKS};
use crate::id::{ItemId, LinkId, NodeId};

/// Rewire every industry exceeding the incoming link limit through a
/// transfer container.
pub fn limit_industry_fan_in(catalog: &Catalog, graph: &mut FactoryGraph) -> Result<(), PlanError> {
    for industry in graph.industries() {
        let item = match graph.node_item(industry) {
            Some(i) => i,
            None => continue,
        };
        let incoming = graph.incoming_count(industry);
        if incoming <= MAX_INDUSTRY_LINKS {
            continue;
        }
        let exceeding = incoming - MAX_INDUSTRY_LINKS;

        let recipe = catalog.recipe_for(item)?;
        let mut ranked = recipe.ingredients.clone();
        ranked.sort_by_key(|e| e.quantity);
        let ingredient_items: Vec<ItemId> = ranked.iter().map(|e| e.item).collect();

        let tc = select_transfer_container(graph, industry, exceeding, &ingredient_items);

        // Move each funneled item's direct supply behind the container's
        // transfer unit, then account the combined flow on one mixed link.
        let items = graph
            .transfer_container_items(tc)
            .map(<[ItemId]>::to_vec)
            .unwrap_or_default();
        let mut total = Rate::ZERO;
        for funneled in items {
            let link = movable_input(graph, industry, funneled).ok_or(
                PlanError::MissingIngredientLink {
                    node: industry,
                    item: funneled,
                },
            )?;
            let (from, rate) = match graph.link_data(link) {
                Some(l) => (l.from, l.rate),
                None => continue,
            };
            graph.unlink(link);
            let transfer = feeder_transfer(graph, tc, funneled);
            graph.link(from, transfer, Some(funneled), rate);
            total += rate;
        }
        match graph.find_link(tc, industry) {
            Some(link) => graph.bump_link_rate(link, total),
            None => {
                graph.link(tc, industry, None, total);
            }
        }
    }
    Ok(())
}

/// Pick the transfer container to funnel through: one already feeding the
/// industry, else an existing one carrying a usable item subset, else a
/// fresh one over the `exceeding + 1` smallest ingredients.
fn select_transfer_container(
    graph: &mut FactoryGraph,
    industry: NodeId,
    exceeding: usize,
    ingredient_items: &[ItemId],
) -> NodeId {
    let attached = graph
        .producers(industry)
        .into_iter()
        .find(|&p| graph.is_transfer_container(p));
    if let Some(tc) = attached {
        let items = graph
            .transfer_container_items(tc)
            .map(<[ItemId]>::to_vec)
            .unwrap_or_default();
        // An attached container carries an existing mixed link, so moving
        // its items frees one link apiece.
        if items.len() >= exceeding
            && items
                .iter()
                .all(|&i| movable_input(graph, industry, i).is_some())
            && feeders_accept(graph, tc)
        {
            return tc;
        }
    }

    let reusable = graph
        .transfer_containers_within(ingredient_items)
        .into_iter()
        .find(|&tc| {
            let items = graph
                .transfer_container_items(tc)
                .map(<[ItemId]>::to_vec)
                .unwrap_or_default();
            items.len() > exceeding
                && graph.can_add_outgoing(tc, 1)
                && items
                    .iter()
                    .all(|&i| movable_input(graph, industry, i).is_some())
                && feeders_accept(graph, tc)
        });
    if let Some(tc) = reusable {
        return tc;
    }

    let chosen: Vec<ItemId> = ingredient_items
        .iter()
        .copied()
        .take(exceeding + 1)
        .collect();
    let tc = graph.add_transfer_container(chosen.clone());
    for item in chosen {
        let t = graph.add_transfer(item);
        graph.link(t, tc, Some(item), Rate::ZERO);
    }
    tc
}

/// A direct container link carrying `item` into `industry`, eligible to be
/// moved behind a transfer unit.
fn movable_input(graph: &FactoryGraph, industry: NodeId, item: ItemId) -> Option<LinkId> {
    graph
        .incoming_links(industry)
        .iter()
        .copied()
        .find(|&link| {
            graph
                .link_data(link)
                .is_some_and(|l| l.item == Some(item) && graph.is_container(l.from))
        })
}

/// Whether every transfer unit feeding the container can accept one more
/// source.
fn feeders_accept(graph: &FactoryGraph, tc: NodeId) -> bool {
    graph
        .producers(tc)
        .iter()
        .all(|&p| !graph.is_transfer(p) || graph.can_add_incoming(p, 1))
}

/// The container's transfer unit for `item`, created on demand.
fn feeder_transfer(graph: &mut FactoryGraph, tc: NodeId, item: ItemId) -> NodeId {
    let existing = graph
        .producers(tc)
        .into_iter()
        .find(|&p| graph.is_transfer(p) && graph.node_item(p) == Some(item));
    match existing {
        Some(t) => t,
        None => {
            let t = graph.add_transfer(item);
            graph.link(t, tc, Some(item), Rate::ZERO);
            t
        }
    }
}
