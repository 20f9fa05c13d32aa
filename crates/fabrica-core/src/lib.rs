//! Fabrica Core -- a production chain generator for crafting economies.
//!
//! Given an immutable item/recipe catalog and a demand map, this crate
//! plans a complete factory graph: which producer industries to build,
//! which containers buffer each item, and which transfer units move flow
//! between them, all under per-node link limits and deterministic
//! fixed-point rate arithmetic.
//!
//! # Build Pipeline
//!
//! Each call to [`factory::build_factory`] runs the following phases:
//!
//! 1. **Plan** -- Set up an output container per requested item and spawn
//!    its producers, planning ingredient supply recursively and reusing
//!    existing capacity where flow headroom and link budgets allow.
//! 2. **Close catalyst loops** -- Consolidate staged catalyst demands onto
//!    shared circulating stock that regenerating byproducts replenish.
//! 3. **Reclaim byproducts** -- Drain secondary outputs into the general
//!    supply of their own item type.
//! 4. **Limit fan-in** -- Funnel low-volume ingredients of overcommitted
//!    industries through transfer containers.
//! 5. **Audit** -- Check link budgets, flow conservation, and symmetric
//!    link bookkeeping; any violation aborts the build.
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Immutable item and recipe definitions
//!   (frozen at startup via [`catalog::CatalogBuilder`]).
//! - [`graph::FactoryGraph`] -- Arena of containers, industries, and
//!   transfer infrastructure with symmetric link bookkeeping and a
//!   creation-order iteration contract.
//! - [`factory::build_factory`] -- Demand-map orchestrator over the whole
//!   pipeline.
//! - [`planner::produce`] -- Recursive single-demand planner.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`error::PlanError`] -- The single fatal error kind; a failed build
//!   leaves the graph partially mutated.

pub mod byproduct;
pub mod catalog;
pub mod catalyst;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod error;
pub mod factory;
pub mod fanin;
pub mod fixed;
pub mod graph;
pub mod id;
pub mod planner;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
