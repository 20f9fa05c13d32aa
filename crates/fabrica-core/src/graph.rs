//! The shared mutable factory graph.
//!
//! All nodes live in one arena keyed by stable [`NodeId`]s, and every link
//! is stored symmetrically as a [`LinkId`] in both endpoints' adjacency
//! lists, so relinking during the post-passes is always a local, two-sided
//! update. Iteration over nodes follows creation order -- that order is a
//! documented contract, because the planner's first-fit decisions depend
//! on it for deterministic results.
//!
//! Flow accounting is per item type: a container's ingress and egress sum
//! only the link rates carrying the container's own item. A transfer unit
//! draining a byproduct out of a product container therefore does not
//! count against that container's product flow.

use crate::fixed::{Fixed64, Rate};
use crate::id::{ItemId, LinkId, NodeId};
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

/// Maximum incoming and outgoing links on containers, transfer units, and
/// transfer containers.
pub const MAX_CONTAINER_LINKS: usize = 7;

/// Maximum incoming links on an industry. Outgoing links are unbounded.
pub const MAX_INDUSTRY_LINKS: usize = 7;

// ---------------------------------------------------------------------------
// Node data
// ---------------------------------------------------------------------------

/// Requested output rate and maintained-stock target of an output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub rate: Rate,
    pub maintain: u64,
}

/// Baseline recorded for external incremental re-planning: the maintain
/// target and supplier set a container had before the current build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub maintain: u64,
    pub suppliers: Vec<NodeId>,
}

/// A storage node holding one item type.
///
/// Temporary containers stage a catalyst byproduct between its producing
/// industry and consolidation; they must not survive past the catalyst
/// loop closer. Split containers share total flow with their siblings,
/// each carrying the recorded fraction. Output containers additionally
/// carry an [`OutputSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub item: ItemId,
    pub temporary: bool,
    pub split: Option<Fixed64>,
    pub output: Option<OutputSpec>,
    pub baseline: Option<Baseline>,
    pub changed: bool,
}

/// A producer node crafting one item via its catalog recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Industry {
    pub item: ItemId,
}

/// A transfer unit moving one item type from one or more sources to
/// exactly one destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub item: ItemId,
}

/// A node aggregating several distinct item types, each fed by its own
/// transfer unit, so a producer can draw many ingredients through one link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferContainer {
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Container(Container),
    Industry(Industry),
    Transfer(Transfer),
    TransferContainer(TransferContainer),
}

/// A directed link carrying one item type's flow at a fixed rate.
/// `item` is `None` only for transfer-container-to-industry links, which
/// carry a mixed set of item types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub item: Option<ItemId>,
    pub rate: Rate,
}

/// Adjacency lists for a single node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NodeAdjacency {
    /// Links whose destination is this node.
    inputs: Vec<LinkId>,
    /// Links whose source is this node.
    outputs: Vec<LinkId>,
}

// ---------------------------------------------------------------------------
// FactoryGraph
// ---------------------------------------------------------------------------

/// The factory graph: containers, industries, and transfer infrastructure,
/// owned by one arena with symmetric link bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactoryGraph {
    nodes: SlotMap<NodeId, Node>,
    links: SlotMap<LinkId, Link>,
    adjacency: SecondaryMap<NodeId, NodeAdjacency>,
    /// Node iteration contract: creation order, minus removed nodes.
    order: Vec<NodeId>,
}

impl FactoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Node constructors
    // -----------------------------------------------------------------------

    fn insert(&mut self, node: Node) -> NodeId {
        let id = self.nodes.insert(node);
        self.adjacency.insert(id, NodeAdjacency::default());
        self.order.push(id);
        id
    }

    pub fn add_container(&mut self, item: ItemId) -> NodeId {
        self.insert(Node::Container(Container {
            item,
            temporary: false,
            split: None,
            output: None,
            baseline: None,
            changed: false,
        }))
    }

    /// A catalyst staging container. Exactly one producer and one consumer;
    /// removed by the catalyst loop closer.
    pub fn add_temporary_container(&mut self, item: ItemId) -> NodeId {
        self.insert(Node::Container(Container {
            item,
            temporary: true,
            split: None,
            output: None,
            baseline: None,
            changed: false,
        }))
    }

    pub fn add_split_container(&mut self, item: ItemId, fraction: Fixed64) -> NodeId {
        self.insert(Node::Container(Container {
            item,
            temporary: false,
            split: Some(fraction),
            output: None,
            baseline: None,
            changed: false,
        }))
    }

    pub fn add_output(&mut self, item: ItemId, rate: Rate, maintain: u64) -> NodeId {
        self.insert(Node::Container(Container {
            item,
            temporary: false,
            split: None,
            output: Some(OutputSpec { rate, maintain }),
            baseline: None,
            changed: false,
        }))
    }

    pub fn add_split_output(
        &mut self,
        item: ItemId,
        rate: Rate,
        maintain: u64,
        fraction: Fixed64,
    ) -> NodeId {
        self.insert(Node::Container(Container {
            item,
            temporary: false,
            split: Some(fraction),
            output: Some(OutputSpec { rate, maintain }),
            baseline: None,
            changed: false,
        }))
    }

    pub fn add_industry(&mut self, item: ItemId) -> NodeId {
        self.insert(Node::Industry(Industry { item }))
    }

    pub fn add_transfer(&mut self, item: ItemId) -> NodeId {
        self.insert(Node::Transfer(Transfer { item }))
    }

    pub fn add_transfer_container(&mut self, items: Vec<ItemId>) -> NodeId {
        self.insert(Node::TransferContainer(TransferContainer { items }))
    }

    /// Upgrade a plain container into an output node in place, keeping its
    /// identity and every existing link.
    pub fn promote_to_output(&mut self, node: NodeId, rate: Rate, maintain: u64) {
        if let Some(Node::Container(c)) = self.nodes.get_mut(node) {
            c.output = Some(OutputSpec { rate, maintain });
        }
    }

    /// Add demand onto an existing output node.
    pub fn bump_output(&mut self, node: NodeId, rate: Rate, maintain: u64) {
        if let Some(Node::Container(c)) = self.nodes.get_mut(node)
            && let Some(spec) = c.output.as_mut()
        {
            spec.rate += rate;
            spec.maintain += maintain;
        }
    }

    /// Remove a node and every link attached to it.
    pub fn remove_node(&mut self, node: NodeId) {
        let attached: Vec<LinkId> = match self.adjacency.get(node) {
            Some(adj) => adj.inputs.iter().chain(adj.outputs.iter()).copied().collect(),
            None => return,
        };
        for link in attached {
            self.unlink(link);
        }
        self.nodes.remove(node);
        self.adjacency.remove(node);
        self.order.retain(|&n| n != node);
    }

    // -----------------------------------------------------------------------
    // Link mutations
    // -----------------------------------------------------------------------

    /// Register a link in both endpoints' adjacency lists.
    ///
    /// Transfer units conserve flow: a link out of a transfer starts at the
    /// sum of the transfer's current input rates, and later inputs bump the
    /// output link by their rate.
    pub fn link(&mut self, from: NodeId, to: NodeId, item: Option<ItemId>, rate: Rate) -> LinkId {
        let rate = if matches!(self.nodes.get(from), Some(Node::Transfer(_))) {
            self.transfer_input_sum(from)
        } else {
            rate
        };
        let id = self.links.insert(Link { from, to, item, rate });
        if let Some(adj) = self.adjacency.get_mut(from) {
            adj.outputs.push(id);
        }
        if let Some(adj) = self.adjacency.get_mut(to) {
            adj.inputs.push(id);
        }
        if matches!(self.nodes.get(to), Some(Node::Transfer(_))) {
            self.bump_transfer_output(to, rate);
        }
        id
    }

    /// Remove a link from both endpoints.
    pub fn unlink(&mut self, link: LinkId) {
        if let Some(data) = self.links.remove(link) {
            if let Some(adj) = self.adjacency.get_mut(data.from) {
                adj.outputs.retain(|&l| l != link);
            }
            if let Some(adj) = self.adjacency.get_mut(data.to) {
                adj.inputs.retain(|&l| l != link);
            }
            if matches!(self.nodes.get(data.to), Some(Node::Transfer(_))) {
                self.bump_transfer_output(data.to, -data.rate);
            }
        }
    }

    /// Add `delta` onto an existing link's rate, propagating through a
    /// transfer destination.
    pub fn bump_link_rate(&mut self, link: LinkId, delta: Rate) {
        let to = match self.links.get_mut(link) {
            Some(l) => {
                l.rate += delta;
                l.to
            }
            None => return,
        };
        if matches!(self.nodes.get(to), Some(Node::Transfer(_))) {
            self.bump_transfer_output(to, delta);
        }
    }

    fn bump_transfer_output(&mut self, transfer: NodeId, delta: Rate) {
        let out = self
            .adjacency
            .get(transfer)
            .and_then(|adj| adj.outputs.first().copied());
        if let Some(link) = out
            && let Some(l) = self.links.get_mut(link)
        {
            l.rate += delta;
        }
    }

    fn transfer_input_sum(&self, transfer: NodeId) -> Rate {
        self.adjacency
            .get(transfer)
            .map(|adj| {
                adj.inputs
                    .iter()
                    .filter_map(|&l| self.links.get(l))
                    .map(|l| l.rate)
                    .sum()
            })
            .unwrap_or(Rate::ZERO)
    }

    // -----------------------------------------------------------------------
    // Node access
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn container(&self, id: NodeId) -> Option<&Container> {
        match self.nodes.get(id) {
            Some(Node::Container(c)) => Some(c),
            _ => None,
        }
    }

    pub fn container_mut(&mut self, id: NodeId) -> Option<&mut Container> {
        match self.nodes.get_mut(id) {
            Some(Node::Container(c)) => Some(c),
            _ => None,
        }
    }

    pub fn is_container(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id), Some(Node::Container(_)))
    }

    pub fn is_industry(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id), Some(Node::Industry(_)))
    }

    pub fn is_transfer(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id), Some(Node::Transfer(_)))
    }

    pub fn is_transfer_container(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id), Some(Node::TransferContainer(_)))
    }

    /// The single item a node carries or produces. `None` for transfer
    /// containers, which carry a set.
    pub fn node_item(&self, id: NodeId) -> Option<ItemId> {
        match self.nodes.get(id)? {
            Node::Container(c) => Some(c.item),
            Node::Industry(i) => Some(i.item),
            Node::Transfer(t) => Some(t.item),
            Node::TransferContainer(_) => None,
        }
    }

    /// The item set carried by a transfer container.
    pub fn transfer_container_items(&self, id: NodeId) -> Option<&[ItemId]> {
        match self.nodes.get(id)? {
            Node::TransferContainer(tc) => Some(&tc.items),
            _ => None,
        }
    }

    pub fn split_fraction(&self, id: NodeId) -> Option<Fixed64> {
        self.container(id).and_then(|c| c.split)
    }

    pub fn output_spec(&self, id: NodeId) -> Option<OutputSpec> {
        self.container(id).and_then(|c| c.output)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_data(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    // -----------------------------------------------------------------------
    // Adjacency and capacity queries
    // -----------------------------------------------------------------------

    pub fn incoming_count(&self, id: NodeId) -> usize {
        self.adjacency.get(id).map(|a| a.inputs.len()).unwrap_or(0)
    }

    pub fn outgoing_count(&self, id: NodeId) -> usize {
        self.adjacency.get(id).map(|a| a.outputs.len()).unwrap_or(0)
    }

    pub fn incoming_links(&self, id: NodeId) -> &[LinkId] {
        self.adjacency
            .get(id)
            .map(|a| a.inputs.as_slice())
            .unwrap_or(&[])
    }

    pub fn outgoing_links(&self, id: NodeId) -> &[LinkId] {
        self.adjacency
            .get(id)
            .map(|a| a.outputs.as_slice())
            .unwrap_or(&[])
    }

    fn incoming_bound(&self, id: NodeId) -> usize {
        match self.nodes.get(id) {
            Some(Node::Industry(_)) => MAX_INDUSTRY_LINKS,
            _ => MAX_CONTAINER_LINKS,
        }
    }

    fn outgoing_bound(&self, id: NodeId) -> usize {
        match self.nodes.get(id) {
            Some(Node::Industry(_)) => usize::MAX,
            _ => MAX_CONTAINER_LINKS,
        }
    }

    pub fn can_add_incoming(&self, id: NodeId, n: usize) -> bool {
        self.incoming_count(id) + n <= self.incoming_bound(id)
    }

    pub fn can_add_outgoing(&self, id: NodeId, n: usize) -> bool {
        let bound = self.outgoing_bound(id);
        bound == usize::MAX || self.outgoing_count(id) + n <= bound
    }

    /// Nodes feeding this node, in link creation order.
    pub fn producers(&self, id: NodeId) -> Vec<NodeId> {
        self.incoming_links(id)
            .iter()
            .filter_map(|&l| self.links.get(l).map(|l| l.from))
            .collect()
    }

    /// Nodes fed by this node, in link creation order.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.outgoing_links(id)
            .iter()
            .filter_map(|&l| self.links.get(l).map(|l| l.to))
            .collect()
    }

    pub fn find_link(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.outgoing_links(from)
            .iter()
            .copied()
            .find(|&l| self.links.get(l).map(|l| l.to) == Some(to))
    }

    pub fn has_link(&self, from: NodeId, to: NodeId) -> bool {
        self.find_link(from, to).is_some()
    }

    /// Rate of the link from `from` to `to`, if one exists.
    pub fn rate_between(&self, from: NodeId, to: NodeId) -> Option<Rate> {
        self.find_link(from, to)
            .and_then(|l| self.links.get(l))
            .map(|l| l.rate)
    }

    /// Destination of a transfer unit or industry: the target of its first
    /// output link.
    pub fn output_of(&self, id: NodeId) -> Option<NodeId> {
        self.outgoing_links(id)
            .first()
            .and_then(|&l| self.links.get(l))
            .map(|l| l.to)
    }

    // -----------------------------------------------------------------------
    // Flow accounting
    // -----------------------------------------------------------------------

    /// Total incoming rate of the node's own item. Transfer containers sum
    /// every incoming rate regardless of item.
    pub fn ingress(&self, id: NodeId) -> Rate {
        self.flow_sum(id, self.incoming_links(id))
    }

    /// Total outgoing rate of the node's own item. Transfer containers sum
    /// every outgoing rate regardless of item.
    pub fn egress(&self, id: NodeId) -> Rate {
        self.flow_sum(id, self.outgoing_links(id))
    }

    fn flow_sum(&self, id: NodeId, links: &[LinkId]) -> Rate {
        let own_item = self.node_item(id);
        links
            .iter()
            .filter_map(|&l| self.links.get(l))
            .filter(|l| own_item.is_none() || l.item == own_item)
            .map(|l| l.rate)
            .sum()
    }

    // -----------------------------------------------------------------------
    // Item-indexed queries (creation order)
    // -----------------------------------------------------------------------

    /// Non-temporary containers holding `item`, including outputs and splits.
    pub fn containers_of(&self, item: ItemId) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&n| {
                self.container(n)
                    .map(|c| c.item == item && !c.temporary)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Output containers holding `item`.
    pub fn outputs_of(&self, item: ItemId) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&n| {
                self.container(n)
                    .map(|c| c.item == item && c.output.is_some())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Transfer units moving `item`.
    pub fn transfers_of(&self, item: ItemId) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&n| match self.nodes.get(n) {
                Some(Node::Transfer(t)) => t.item == item,
                _ => false,
            })
            .collect()
    }

    /// Transfer containers whose carried item set is a subset of `items`.
    pub fn transfer_containers_within(&self, items: &[ItemId]) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&n| match self.nodes.get(n) {
                Some(Node::TransferContainer(tc)) => {
                    tc.items.iter().all(|i| items.contains(i))
                }
                _ => false,
            })
            .collect()
    }

    /// All temporary catalyst staging containers.
    pub fn temporary_containers(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&n| self.container(n).map(|c| c.temporary).unwrap_or(false))
            .collect()
    }

    /// All industries.
    pub fn industries(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&n| self.is_industry(n))
            .collect()
    }

    /// All containers, temporary ones included.
    pub fn containers(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&n| self.is_container(n))
            .collect()
    }

    /// All nodes in creation order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.order.clone()
    }

    // -----------------------------------------------------------------------
    // Baselines for incremental re-planning
    // -----------------------------------------------------------------------

    /// Snapshot every output container's maintain target and supplier set.
    /// After a later build, containers diverging from this baseline are
    /// flagged as changed.
    pub fn record_baseline(&mut self) {
        let outputs: Vec<NodeId> = self
            .order
            .iter()
            .copied()
            .filter(|&n| self.output_spec(n).is_some())
            .collect();
        for node in outputs {
            let mut suppliers = self.producers(node);
            suppliers.sort();
            let maintain = match self.output_spec(node) {
                Some(spec) => spec.maintain,
                None => continue,
            };
            if let Some(c) = self.container_mut(node) {
                c.baseline = Some(Baseline { maintain, suppliers });
                c.changed = false;
            }
        }
    }

    /// Flag output containers whose maintain target or supplier set
    /// diverges from the recorded baseline. Outputs created after the
    /// baseline have none and are flagged unconditionally.
    pub fn reconcile_changed(&mut self) {
        let candidates: Vec<NodeId> = self
            .order
            .iter()
            .copied()
            .filter(|&n| self.output_spec(n).is_some())
            .collect();
        for node in candidates {
            let mut suppliers = self.producers(node);
            suppliers.sort();
            let maintain = self.output_spec(node).map(|s| s.maintain);
            if let Some(c) = self.container_mut(node) {
                match c.baseline.as_ref() {
                    None => c.changed = true,
                    Some(baseline) => {
                        if maintain != Some(baseline.maintain) || suppliers != baseline.suppliers {
                            c.changed = true;
                        }
                    }
                }
            }
        }
    }
}
