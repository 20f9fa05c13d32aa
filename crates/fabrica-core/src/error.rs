//! The single fatal error kind for factory planning.
//!
//! Every variant signals a contradiction between the graph's state and an
//! algorithmic assumption. There is no recovery path: a `PlanError` aborts
//! the whole build and the caller must discard the graph, which may be
//! partially mutated. Each variant carries the stable identity of the
//! offending node or item; diagnostic formatting beyond `Display` is the
//! caller's concern.

use crate::id::{ItemId, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("no recipe registered for craftable item {item:?}")]
    MissingRecipe { item: ItemId },
    #[error("node not found: {node:?}")]
    NodeNotFound { node: NodeId },
    #[error("expected a container node: {node:?}")]
    ExpectedContainer { node: NodeId },
    #[error("catalyst staging container {node:?} must have exactly one consumer")]
    StagedConsumerCount { node: NodeId },
    #[error("node {node:?} has no output link")]
    MissingOutput { node: NodeId },
    #[error("transfer output of {node:?} is a transfer container")]
    TransferIntoTransferContainer { node: NodeId },
    #[error("container {node:?} is already drained by another catalyst transfer unit")]
    DoubleCatalystDrain { node: NodeId },
    #[error("no movable link for item {item:?} into industry {node:?}")]
    MissingIngredientLink { node: NodeId, item: ItemId },
    #[error("node {node:?} exceeds its link limit")]
    LinkLimitExceeded { node: NodeId },
    #[error("container {node:?} egress exceeds ingress")]
    FlowImbalance { node: NodeId },
    #[error("split container {node:?} has more than one non-transfer consumer")]
    SplitFanOut { node: NodeId },
    #[error("temporary container {node:?} survived catalyst consolidation")]
    TemporaryRemains { node: NodeId },
    #[error("link bookkeeping on node {node:?} is not bidirectionally consistent")]
    AsymmetricLink { node: NodeId },
}
