//! Post-build consistency audit.
//!
//! [`audit`] walks the finished graph read-only and fails on the first
//! structural contradiction: a node over its link budget, a consumer pool
//! outdrawing its supply, a transfer unit with nowhere to send, a split
//! container fanning out, a leftover staging container, or one-sided link
//! bookkeeping. Flow comparisons allow [`rate_tolerance`] of slack to
//! absorb fixed-point division rounding accumulated across summed links.
//!
//! Ore containers are exempt from the supply check: they are stocked from
//! outside the planned chain and legitimately show egress with no ingress.

use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::fixed::rate_tolerance;
use crate::graph::{FactoryGraph, MAX_CONTAINER_LINKS, MAX_INDUSTRY_LINKS, Node};

/// Check the graph's structural invariants. Returns the first violation.
pub fn audit(catalog: &Catalog, graph: &FactoryGraph) -> Result<(), PlanError> {
    let tol = rate_tolerance();

    for node in graph.node_ids() {
        let data = match graph.node(node) {
            Some(d) => d,
            None => return Err(PlanError::NodeNotFound { node }),
        };

        let (in_bound, out_bound) = match data {
            Node::Industry(_) => (MAX_INDUSTRY_LINKS, usize::MAX),
            _ => (MAX_CONTAINER_LINKS, MAX_CONTAINER_LINKS),
        };
        if graph.incoming_count(node) > in_bound || graph.outgoing_count(node) > out_bound {
            return Err(PlanError::LinkLimitExceeded { node });
        }

        match data {
            Node::Container(c) => {
                if c.temporary {
                    return Err(PlanError::TemporaryRemains { node });
                }
                if !catalog.is_ore(c.item) && graph.egress(node) > graph.ingress(node) + tol {
                    return Err(PlanError::FlowImbalance { node });
                }
                if c.split.is_some() {
                    let direct = graph
                        .consumers(node)
                        .iter()
                        .filter(|&&consumer| !graph.is_transfer(consumer))
                        .count();
                    if direct > 1 {
                        return Err(PlanError::SplitFanOut { node });
                    }
                }
            }
            Node::Transfer(_) => {
                if graph.outgoing_count(node) == 0 {
                    return Err(PlanError::MissingOutput { node });
                }
                if graph.egress(node) > graph.ingress(node) + tol {
                    return Err(PlanError::FlowImbalance { node });
                }
            }
            Node::TransferContainer(_) => {
                if graph.egress(node) > graph.ingress(node) + tol {
                    return Err(PlanError::FlowImbalance { node });
                }
            }
            Node::Industry(_) => {}
        }

        // Both sides of every link must agree on its endpoints.
        for &link in graph.incoming_links(node) {
            match graph.link_data(link) {
                Some(l) if l.to == node => {}
                _ => return Err(PlanError::AsymmetricLink { node }),
            }
        }
        for &link in graph.outgoing_links(node) {
            match graph.link_data(link) {
                Some(l) if l.from == node => {}
                _ => return Err(PlanError::AsymmetricLink { node }),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byproduct::reclaim_byproducts;
    use crate::catalog::{CatalogBuilder, RecipeEntry, Tier};
    use crate::catalyst::close_catalyst_loops;
    use crate::fixed::{Fixed64, Minutes, Rate};
    use crate::id::ItemId;
    use crate::planner::produce;

    fn entry(item: ItemId, quantity: u32) -> RecipeEntry {
        RecipeEntry { item, quantity }
    }

    fn minutes(v: u32) -> Minutes {
        Minutes::from_num(v)
    }

    fn catalog() -> Catalog {
        let mut b = CatalogBuilder::new();
        let quartz = b.register_ore("quartz", Tier::Basic);
        let carbon = b.register_ore("carbon", Tier::Basic);
        let hydrogen = b.register_catalyst("hydrogen", Tier::Basic);
        let polymer = b.register_product("polymer", Tier::Uncommon);
        b.register_recipe(entry(hydrogen, 1), minutes(1), vec![entry(quartz, 1)], vec![]);
        b.register_recipe(
            entry(polymer, 1),
            minutes(1),
            vec![entry(carbon, 2), entry(hydrogen, 1)],
            vec![entry(hydrogen, 1)],
        );
        b.build().unwrap()
    }

    // -----------------------------------------------------------------------
    // Test 1: A fully planned chain audits clean
    // -----------------------------------------------------------------------
    #[test]
    fn planned_chain_audits_clean() {
        let cat = catalog();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        produce(&cat, &mut g, polymer, Rate::from_num(2)).unwrap();
        close_catalyst_loops(&cat, &mut g).unwrap();
        reclaim_byproducts(&cat, &mut g).unwrap();

        audit(&cat, &g).unwrap();
    }

    // -----------------------------------------------------------------------
    // Test 2: Link budget violations
    // -----------------------------------------------------------------------
    #[test]
    fn detects_link_limit_excess() {
        let cat = catalog();
        let carbon = cat.item_id("carbon").unwrap();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        let c = g.add_container(carbon);
        for _ in 0..MAX_CONTAINER_LINKS + 1 {
            let sink = g.add_industry(polymer);
            g.link(c, sink, Some(carbon), Rate::from_num(1));
        }
        assert_eq!(audit(&cat, &g), Err(PlanError::LinkLimitExceeded { node: c }));
    }

    // -----------------------------------------------------------------------
    // Test 3: Overdrawn producer-fed container
    // -----------------------------------------------------------------------
    #[test]
    fn detects_flow_imbalance() {
        let cat = catalog();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        let c = g.add_container(polymer);
        let producer = g.add_industry(polymer);
        let sink = g.add_industry(polymer);
        g.link(producer, c, Some(polymer), Rate::from_num(1));
        g.link(c, sink, Some(polymer), Rate::from_num(2));
        assert_eq!(audit(&cat, &g), Err(PlanError::FlowImbalance { node: c }));
    }

    // -----------------------------------------------------------------------
    // Test 4: Ore containers are externally stocked
    // -----------------------------------------------------------------------
    #[test]
    fn ore_egress_without_ingress_is_fine() {
        let cat = catalog();
        let carbon = cat.item_id("carbon").unwrap();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        let c = g.add_container(carbon);
        let sink = g.add_industry(polymer);
        g.link(c, sink, Some(carbon), Rate::from_num(5));
        audit(&cat, &g).unwrap();
    }

    // -----------------------------------------------------------------------
    // Test 5: Transfer unit without a destination
    // -----------------------------------------------------------------------
    #[test]
    fn detects_transfer_without_output() {
        let cat = catalog();
        let hydrogen = cat.item_id("hydrogen").unwrap();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        let src = g.add_container(polymer);
        let t = g.add_transfer(hydrogen);
        g.link(src, t, Some(hydrogen), Rate::from_num(1));
        assert_eq!(audit(&cat, &g), Err(PlanError::MissingOutput { node: t }));
    }

    // -----------------------------------------------------------------------
    // Test 6: Split containers feed exactly one direct consumer
    // -----------------------------------------------------------------------
    #[test]
    fn detects_split_fan_out() {
        let cat = catalog();
        let polymer = cat.item_id("polymer").unwrap();
        let mut g = FactoryGraph::new();

        let half = Fixed64::from_num(1) / Fixed64::from_num(2);
        let c = g.add_split_container(polymer, half);
        let producer = g.add_industry(polymer);
        g.link(producer, c, Some(polymer), Rate::from_num(2));
        let a = g.add_industry(polymer);
        let b = g.add_industry(polymer);
        g.link(c, a, Some(polymer), Rate::from_num(1));
        g.link(c, b, Some(polymer), Rate::from_num(1));
        assert_eq!(audit(&cat, &g), Err(PlanError::SplitFanOut { node: c }));
    }

    // -----------------------------------------------------------------------
    // Test 7: Leftover staging container
    // -----------------------------------------------------------------------
    #[test]
    fn detects_leftover_temporary() {
        let cat = catalog();
        let hydrogen = cat.item_id("hydrogen").unwrap();
        let mut g = FactoryGraph::new();

        let tmp = g.add_temporary_container(hydrogen);
        assert_eq!(audit(&cat, &g), Err(PlanError::TemporaryRemains { node: tmp }));
    }
}
