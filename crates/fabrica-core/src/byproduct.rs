//! Byproduct reclamation.
//!
//! A recipe's secondary outputs land in the same container as its primary
//! product and would accumulate without bound. This pass attaches a drain
//! to every producing container: a transfer unit moves each non-catalyst
//! byproduct into a container of its own item type, where it joins the
//! ordinary supply of that item. Catalyst byproducts are excluded here;
//! the loop closer already recirculates them.
//!
//! The pass is idempotent: a container whose consumers already include a
//! node of the byproduct's item is considered drained, and its drain link
//! is topped up to match the current producer count.

use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::fixed::{Fixed64, Rate};
use crate::graph::FactoryGraph;

/// Drain every undrained non-catalyst byproduct into the general supply.
pub fn reclaim_byproducts(catalog: &Catalog, graph: &mut FactoryGraph) -> Result<(), PlanError> {
    for container in graph.containers() {
        let (item, temporary) = match graph.container(container) {
            Some(c) => (c.item, c.temporary),
            None => continue,
        };
        if temporary || !catalog.is_craftable(item) {
            continue;
        }
        let recipe = catalog.recipe_for(item)?;
        let producer_industries = graph
            .producers(container)
            .iter()
            .filter(|&&p| graph.is_industry(p))
            .count();
        if producer_industries == 0 {
            continue;
        }

        for byproduct in &recipe.byproducts {
            if catalog.is_catalyst(byproduct.item) {
                continue;
            }
            // Every producer industry deposits one byproduct stream here.
            let rate =
                recipe.rate_of(byproduct.quantity) * Fixed64::from_num(producer_industries as i64);

            let drained = graph
                .consumers(container)
                .into_iter()
                .find(|&consumer| graph.node_item(consumer) == Some(byproduct.item));
            if let Some(consumer) = drained {
                // Producers added since the drain was attached deposit too;
                // bring the recorded rate up to the current count.
                if graph.is_transfer(consumer)
                    && let Some(current) = graph.rate_between(container, consumer)
                    && current < rate
                    && let Some(link) = graph.find_link(container, consumer)
                {
                    graph.bump_link_rate(link, rate - current);
                }
                continue;
            }

            let transfer = graph
                .transfers_of(byproduct.item)
                .into_iter()
                .find(|&t| graph.can_add_incoming(t, 1));
            let transfer = match transfer {
                Some(t) => t,
                None => {
                    let t = graph.add_transfer(byproduct.item);
                    let dest = graph
                        .containers_of(byproduct.item)
                        .into_iter()
                        .find(|&d| graph.can_add_incoming(d, 1));
                    let dest = match dest {
                        Some(d) => d,
                        None => graph.add_container(byproduct.item),
                    };
                    graph.link(t, dest, Some(byproduct.item), Rate::ZERO);
                    t
                }
            };
            graph.link(container, transfer, Some(byproduct.item), rate);
        }
    }
    Ok(())
}
