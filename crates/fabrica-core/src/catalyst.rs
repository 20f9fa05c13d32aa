//! Catalyst loop closure.
//!
//! The planner stages every catalyst demand in its own temporary container.
//! This pass consolidates those placeholders onto shared circulating stock:
//! each consuming industry is rewired to draw from a catalyst stock
//! container, the regenerated catalyst byproduct is drained back out of the
//! industry's product container by a transfer unit, and any stock container
//! without a producer gets one dedicated industry to mint the initial
//! charge. After this pass no temporary container remains; steady-state
//! catalyst flow is a closed loop topped up only by that one producer.

use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::fixed::{Fixed64, Rate};
use crate::graph::FactoryGraph;
use crate::id::NodeId;
use crate::planner::spawn_industries;

/// Replace every temporary catalyst container with links into shared
/// circulating stock, then ensure each stock container has a producer.
pub fn close_catalyst_loops(catalog: &Catalog, graph: &mut FactoryGraph) -> Result<(), PlanError> {
    for &catalyst in catalog.catalysts() {
        let temps: Vec<NodeId> = graph
            .temporary_containers()
            .into_iter()
            .filter(|&t| graph.node_item(t) == Some(catalyst))
            .collect();

        // Group staged demands by the product container their consuming
        // industry feeds: the regenerated catalyst surfaces there, so the
        // whole group shares one drain.
        let mut groups: Vec<(NodeId, Vec<(NodeId, NodeId)>)> = Vec::new();
        for temp in temps {
            let consumers = graph.consumers(temp);
            if consumers.len() != 1 {
                return Err(PlanError::StagedConsumerCount { node: temp });
            }
            let industry = consumers[0];
            let end = graph
                .output_of(industry)
                .ok_or(PlanError::MissingOutput { node: industry })?;
            if graph.is_transfer_container(end) {
                return Err(PlanError::TransferIntoTransferContainer { node: industry });
            }
            if !graph.is_container(end) {
                return Err(PlanError::ExpectedContainer { node: end });
            }
            match groups.iter_mut().find(|(e, _)| *e == end) {
                Some((_, members)) => members.push((temp, industry)),
                None => groups.push((end, vec![(temp, industry)])),
            }
        }

        for (end, members) in groups {
            let item = graph
                .node_item(end)
                .ok_or(PlanError::ExpectedContainer { node: end })?;
            let recipe = catalog.recipe_for(item)?;
            let ingredient_rate = recipe
                .ingredients
                .iter()
                .find(|e| e.item == catalyst)
                .map(|e| recipe.rate_of(e.quantity))
                .unwrap_or(Rate::ZERO);
            let byproduct_rate = recipe
                .byproducts
                .iter()
                .find(|e| e.item == catalyst)
                .map(|e| recipe.rate_of(e.quantity))
                .unwrap_or(Rate::ZERO);

            // Drain preference: the transfer unit already draining this
            // container, then any existing catalyst transfer with headroom,
            // then a fresh unit with a fresh stock container.
            let attached = graph
                .consumers(end)
                .into_iter()
                .find(|&c| graph.is_transfer(c) && graph.node_item(c) == Some(catalyst));

            let (transfer, stock) = if let Some(unit) = attached {
                let out = graph
                    .output_of(unit)
                    .ok_or(PlanError::MissingOutput { node: unit })?;
                let existing = members
                    .iter()
                    .filter(|&&(_, industry)| graph.has_link(out, industry))
                    .count();
                if !graph.can_add_outgoing(out, members.len() - existing) {
                    return Err(PlanError::DoubleCatalystDrain { node: end });
                }
                (unit, out)
            } else if let Some(found) = graph.transfers_of(catalyst).into_iter().find_map(|t| {
                let out = graph.output_of(t)?;
                (graph.is_container(out)
                    && graph.can_add_incoming(t, 1)
                    && graph.can_add_outgoing(out, members.len()))
                .then_some((t, out))
            }) {
                found
            } else {
                let t = graph.add_transfer(catalyst);
                let out = graph.add_container(catalyst);
                graph.link(t, out, Some(catalyst), Rate::ZERO);
                (t, out)
            };

            for &(temp, industry) in &members {
                graph.remove_node(temp);
                if !graph.has_link(stock, industry) {
                    graph.link(stock, industry, Some(catalyst), ingredient_rate);
                }
            }

            let drained = byproduct_rate * Fixed64::from_num(members.len() as i64);
            match graph.find_link(end, transfer) {
                Some(link) => graph.bump_link_rate(link, drained),
                None => {
                    graph.link(end, transfer, Some(catalyst), drained);
                }
            }
        }

        // Initial charge: every stock container needs exactly one producer
        // minting catalyst from its own recipe.
        for container in graph.containers_of(catalyst) {
            let has_producer = graph
                .producers(container)
                .iter()
                .any(|&p| graph.is_industry(p));
            if !has_producer {
                let recipe = catalog.recipe_for(catalyst)?;
                spawn_industries(catalog, graph, catalyst, recipe, 1, &[container], None)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, RecipeEntry, Tier};
    use crate::fixed::Minutes;
    use crate::id::ItemId;
    use crate::planner::produce;

    fn entry(item: ItemId, quantity: u32) -> RecipeEntry {
        RecipeEntry { item, quantity }
    }

    fn minutes(v: u32) -> Minutes {
        Minutes::from_num(v)
    }

    /// hydrogen circulates through polymer and resin; quartz mints it.
    fn catalyst_catalog() -> Catalog {
        let mut b = CatalogBuilder::new();
        let quartz = b.register_ore("quartz", Tier::Basic);
        let carbon = b.register_ore("carbon", Tier::Basic);
        let hydrogen = b.register_catalyst("hydrogen", Tier::Basic);
        let polymer = b.register_product("polymer", Tier::Uncommon);
        let resin = b.register_product("resin", Tier::Uncommon);
        b.register_recipe(entry(hydrogen, 1), minutes(1), vec![entry(quartz, 1)], vec![]);
        b.register_recipe(
            entry(polymer, 1),
            minutes(1),
            vec![entry(carbon, 2), entry(hydrogen, 1)],
            vec![entry(hydrogen, 1)],
        );
        b.register_recipe(
            entry(resin, 1),
            minutes(1),
            vec![entry(carbon, 1), entry(hydrogen, 1)],
            vec![entry(hydrogen, 1)],
        );
        b.build().unwrap()
    }

    // -----------------------------------------------------------------------
    // Test 1: Temporaries consolidate onto one circulating stock
    // -----------------------------------------------------------------------
    #[test]
    fn consolidates_temporaries_into_loop() {
        let cat = catalyst_catalog();
        let hydrogen = cat.item_id("hydrogen").unwrap();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        let out = produce(&cat, &mut g, polymer, Rate::from_num(2)).unwrap();
        assert_eq!(g.temporary_containers().len(), 2);

        close_catalyst_loops(&cat, &mut g).unwrap();

        assert!(g.temporary_containers().is_empty());
        let transfers = g.transfers_of(hydrogen);
        assert_eq!(transfers.len(), 1);
        let stocks = g.containers_of(hydrogen);
        assert_eq!(stocks.len(), 1);
        let stock = stocks[0];

        // Both polymer industries now draw circulating stock at 1/min.
        let polymer_industries: Vec<_> = g
            .industries()
            .into_iter()
            .filter(|&i| g.node_item(i) == Some(polymer))
            .collect();
        assert_eq!(polymer_industries.len(), 2);
        for industry in &polymer_industries {
            let link = g.find_link(stock, *industry).unwrap();
            assert_eq!(g.link_data(link).unwrap().rate, Rate::from_num(1));
        }

        // The product container drains 2/min of regenerated catalyst back.
        let drain = g.find_link(out[0], transfers[0]).unwrap();
        assert_eq!(g.link_data(drain).unwrap().rate, Rate::from_num(2));
        // Drain is invisible to the product's own flow.
        assert_eq!(g.egress(out[0]), Rate::ZERO);

        // One dedicated industry mints the initial charge into the stock.
        let minters: Vec<_> = g
            .producers(stock)
            .into_iter()
            .filter(|&p| g.is_industry(p))
            .collect();
        assert_eq!(minters.len(), 1);
        // Stock ingress: 2/min recirculated plus 1/min minted.
        assert_eq!(g.ingress(stock), Rate::from_num(3));
        assert_eq!(g.egress(stock), Rate::from_num(2));
    }

    // -----------------------------------------------------------------------
    // Test 2: A later product reuses the existing transfer and stock
    // -----------------------------------------------------------------------
    #[test]
    fn second_product_shares_existing_stock() {
        let cat = catalyst_catalog();
        let hydrogen = cat.item_id("hydrogen").unwrap();
        let polymer = cat.item_id("polymer").unwrap();
        let resin = cat.item_id("resin").unwrap();
        let mut g = FactoryGraph::new();

        produce(&cat, &mut g, polymer, Rate::from_num(2)).unwrap();
        close_catalyst_loops(&cat, &mut g).unwrap();

        produce(&cat, &mut g, resin, Rate::from_num(1)).unwrap();
        close_catalyst_loops(&cat, &mut g).unwrap();

        // Still one shared transfer unit and one stock container.
        assert_eq!(g.transfers_of(hydrogen).len(), 1);
        assert_eq!(g.containers_of(hydrogen).len(), 1);
        assert!(g.temporary_containers().is_empty());

        let transfer = g.transfers_of(hydrogen)[0];
        // Drains from both product containers: polymer 2/min, resin 1/min.
        assert_eq!(g.incoming_count(transfer), 2);
        let stock = g.containers_of(hydrogen)[0];
        assert_eq!(g.egress(stock), Rate::from_num(3));
    }

    // -----------------------------------------------------------------------
    // Test 3: Idempotent once the loop is closed
    // -----------------------------------------------------------------------
    #[test]
    fn closed_loop_is_stable() {
        let cat = catalyst_catalog();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        produce(&cat, &mut g, polymer, Rate::from_num(2)).unwrap();
        close_catalyst_loops(&cat, &mut g).unwrap();

        let nodes = g.node_count();
        let links = g.link_count();
        close_catalyst_loops(&cat, &mut g).unwrap();
        assert_eq!(g.node_count(), nodes);
        assert_eq!(g.link_count(), links);
    }

    // -----------------------------------------------------------------------
    // Test 4: Extending a closed loop keeps the drain in step
    // -----------------------------------------------------------------------
    #[test]
    fn extension_over_closed_loop_bumps_drain() {
        let cat = catalyst_catalog();
        let hydrogen = cat.item_id("hydrogen").unwrap();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        let out = produce(&cat, &mut g, polymer, Rate::from_num(2)).unwrap();
        close_catalyst_loops(&cat, &mut g).unwrap();

        // Consume the headroom so the next demand must add an industry.
        let sink = g.add_industry(cat.item_id("resin").unwrap());
        g.link(out[0], sink, Some(polymer), Rate::from_num(2));

        let again = produce(&cat, &mut g, polymer, Rate::from_num(1)).unwrap();
        assert_eq!(again, out);
        // The new industry drew straight from circulating stock, with no
        // staging left behind for the closer.
        assert!(g.temporary_containers().is_empty());

        let stock = g.containers_of(hydrogen)[0];
        let transfer = g.transfers_of(hydrogen)[0];
        assert_eq!(g.egress(stock), Rate::from_num(3));
        // Its regenerated catalyst landed on the existing drain.
        assert_eq!(g.rate_between(out[0], transfer), Some(Rate::from_num(3)));
        // Stock ingress: 3/min recirculated plus the 1/min initial charge.
        assert_eq!(g.ingress(stock), Rate::from_num(4));
    }

    // -----------------------------------------------------------------------
    // Test 5: A staged container without its consumer is fatal
    // -----------------------------------------------------------------------
    #[test]
    fn orphan_temporary_is_fatal() {
        let cat = catalyst_catalog();
        let hydrogen = cat.item_id("hydrogen").unwrap();
        let mut g = FactoryGraph::new();

        let orphan = g.add_temporary_container(hydrogen);
        let err = close_catalyst_loops(&cat, &mut g).unwrap_err();
        assert_eq!(err, PlanError::StagedConsumerCount { node: orphan });
    }
}
