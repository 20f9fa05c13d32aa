//! Recursive demand planner.
//!
//! [`produce`] satisfies a demand for `rate` units per minute of one item
//! and returns the container(s) the caller should draw from. It prefers,
//! in order: reusing an existing container with spare flow, extending an
//! existing container with more producer industries, and finally creating
//! fresh containers. When a single container cannot accept every producer
//! link, the industries are partitioned across sibling split containers
//! as evenly as possible, each recording its share of the total flow.
//!
//! Catalyst demands are never planned recursively here: each one gets a
//! fresh temporary staging container, and the catalyst loop closer later
//! consolidates all of them onto shared circulating stock.

use crate::catalog::{Catalog, RecipeDef};
use crate::error::PlanError;
use crate::fixed::{Fixed64, Rate, ceil_units};
use crate::graph::{FactoryGraph, MAX_CONTAINER_LINKS};
use crate::id::{ItemId, NodeId};

/// Plan production of `rate` units per minute of `item`.
///
/// Returns the containers holding the produced flow, in creation order.
/// More than one container is returned only when the demand was split
/// across siblings; each split container carries its fraction of the
/// total, and the caller scales its draw accordingly.
pub fn produce(
    catalog: &Catalog,
    graph: &mut FactoryGraph,
    item: ItemId,
    rate: Rate,
) -> Result<Vec<NodeId>, PlanError> {
    // Ores are externally stocked: no producers, just a container to draw
    // from. Reuse the first one with link headroom.
    if catalog.is_ore(item) {
        for container in graph.containers_of(item) {
            if graph.can_add_outgoing(container, 1) {
                return Ok(vec![container]);
            }
        }
        return Ok(vec![graph.add_container(item)]);
    }

    // Catalysts circulate instead of being reproduced. Stage the demand in
    // a temporary container for the loop closer to consolidate.
    if catalog.is_catalyst(item) {
        return Ok(vec![graph.add_temporary_container(item)]);
    }

    let recipe = catalog.recipe_for(item)?;

    // Reuse: a container whose producers already outpace its consumers by
    // more than the requested rate absorbs the demand with no new industry.
    for container in graph.containers_of(item) {
        if graph.split_fraction(container).is_some() {
            continue;
        }
        if graph.egress(container) + rate < graph.ingress(container)
            && graph.can_add_outgoing(container, 1)
        {
            return Ok(vec![container]);
        }
    }

    // Extend: add just enough industries onto an existing container to
    // cover the shortfall. New industries share the catalyst stock already
    // feeding the container's producers, if any.
    for container in graph.containers_of(item) {
        if graph.split_fraction(container).is_some() {
            continue;
        }
        let shortfall = rate + graph.egress(container) - graph.ingress(container);
        let extra = ceil_units(shortfall, recipe.product_rate()) as usize;

        let unit = catalyst_unit(catalog, graph, container);

        if !graph.can_add_incoming(container, extra) || !graph.can_add_outgoing(container, 1) {
            continue;
        }
        if let Some(u) = unit
            && !graph.can_add_outgoing(u, extra)
        {
            continue;
        }

        spawn_industries(catalog, graph, item, recipe, extra, &[container], unit)?;
        return Ok(vec![container]);
    }

    // Fresh containers. A demand needing more producers than one container
    // can accept is split across siblings, balanced to within one industry.
    let extra = ceil_units(rate, recipe.product_rate()) as usize;
    let targets = if extra <= MAX_CONTAINER_LINKS {
        vec![graph.add_container(item)]
    } else {
        let allotments = balanced_partition(extra, MAX_CONTAINER_LINKS);
        allotments
            .iter()
            .map(|&allot| {
                let fraction = Fixed64::from_num(allot as i64) / Fixed64::from_num(extra as i64);
                graph.add_split_container(item, fraction)
            })
            .collect()
    };
    spawn_industries(catalog, graph, item, recipe, extra, &targets, None)?;
    Ok(targets)
}

/// Partition `total` producers into groups no larger than `max`, sized as
/// evenly as possible. 16 with a limit of 7 becomes `[6, 5, 5]`.
fn balanced_partition(total: usize, max: usize) -> Vec<usize> {
    let groups = total.div_ceil(max);
    let base = total / groups;
    let remainder = total % groups;
    (0..groups)
        .map(|g| if g < remainder { base + 1 } else { base })
        .collect()
}

/// Create `count` industries producing `item`, assign them round-robin to
/// `targets`, and plan their ingredient supply recursively.
///
/// Round-robin assignment over targets produced by [`balanced_partition`]
/// lands exactly the planned allotment on each container. A `unit`
/// container, when given, supplies the recipe's catalyst ingredient
/// directly instead of staging a new temporary.
pub(crate) fn spawn_industries(
    catalog: &Catalog,
    graph: &mut FactoryGraph,
    item: ItemId,
    recipe: &RecipeDef,
    count: usize,
    targets: &[NodeId],
    unit: Option<NodeId>,
) -> Result<(), PlanError> {
    for i in 0..count {
        let target = targets[i % targets.len()];
        let industry = graph.add_industry(item);
        graph.link(industry, target, Some(item), recipe.product_rate());
        supply_industry(catalog, graph, industry, recipe, unit)?;
    }
    Ok(())
}

/// Wire an industry's ingredient supply: the catalyst demand draws from
/// `unit` when given, everything else is planned recursively.
///
/// Drawing from `unit` bypasses the staging the loop closer accounts for,
/// so the regenerated catalyst is settled on the existing drain here.
pub(crate) fn supply_industry(
    catalog: &Catalog,
    graph: &mut FactoryGraph,
    industry: NodeId,
    recipe: &RecipeDef,
    unit: Option<NodeId>,
) -> Result<(), PlanError> {
    for ingredient in &recipe.ingredients {
        let ing_rate = recipe.rate_of(ingredient.quantity);
        if catalog.is_catalyst(ingredient.item)
            && let Some(u) = unit
        {
            graph.link(u, industry, Some(ingredient.item), ing_rate);
            bump_catalyst_drain(graph, industry, u, ingredient.item, recipe);
            continue;
        }
        let sources = produce(catalog, graph, ingredient.item, ing_rate)?;
        for source in sources {
            let share = graph.split_fraction(source).unwrap_or(Fixed64::ONE);
            graph.link(source, industry, Some(ingredient.item), ing_rate * share);
        }
    }
    Ok(())
}

/// Account one more consumer's regenerated catalyst on the drain that
/// recirculates `catalyst` from the industry's product container into
/// `stock`. The drain rate is otherwise settled when the loop closes, so
/// an industry wired straight from circulating stock must top it up, or
/// the stock's recorded ingress falls behind its egress.
fn bump_catalyst_drain(
    graph: &mut FactoryGraph,
    industry: NodeId,
    stock: NodeId,
    catalyst: ItemId,
    recipe: &RecipeDef,
) {
    let regenerated = recipe
        .byproducts
        .iter()
        .find(|e| e.item == catalyst)
        .map(|e| recipe.rate_of(e.quantity));
    if let Some(back) = regenerated
        && let Some(end) = graph.output_of(industry)
        && let Some(drain) = graph.consumers(end).into_iter().find(|&c| {
            graph.is_transfer(c)
                && graph.node_item(c) == Some(catalyst)
                && graph.output_of(c) == Some(stock)
        })
        && let Some(link) = graph.find_link(end, drain)
    {
        graph.bump_link_rate(link, back);
    }
}

/// The circulating catalyst stock already feeding `container`'s producers:
/// the destination of the catalyst transfer unit draining it.
pub(crate) fn catalyst_unit(
    catalog: &Catalog,
    graph: &FactoryGraph,
    container: NodeId,
) -> Option<NodeId> {
    graph
        .consumers(container)
        .into_iter()
        .find(|&c| {
            graph.is_transfer(c) && graph.node_item(c).is_some_and(|i| catalog.is_catalyst(i))
        })
        .and_then(|t| graph.output_of(t))
}
