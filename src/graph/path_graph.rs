
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use rustc_hash::FxHashSet;

use crate::data_types::kmer;
use crate::data_types::kmer_node::KmerNode;
use crate::graph::path_node::KmerPathNode;
use crate::util::intervals::{overlap_width_closed, overlaps_closed};

/// Handle to a node slot in a [`KmerPathGraph`] arena.
/// The generation is bumped every time a slot is freed, so a handle to an invalidated
/// node can never silently alias a newer node in the same slot.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

struct Slot {
    generation: u32,
    node: Option<KmerPathNode>,
}

/// Arena-owned positional de Bruijn path graph for one assembly window.
///
/// All nodes live in the arena and are addressed by [`NodeId`]; each edge is stored
/// redundantly in both endpoints' adjacency lists (there is no separate edge object), so
/// symmetric updates are O(1). The graph is not internally synchronized: one instance is
/// owned and mutated by exactly one thread at a time.
///
/// Precondition violations (mismatched windows, duplicate edges, operating on an
/// invalidated node) are caller bugs, not data conditions: they panic and abort the
/// enclosing unit of work.
pub struct KmerPathGraph {
    k: usize,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live_nodes: usize,
}

impl KmerPathGraph {
    /// Creates an empty graph for k-mers of the given size.
    /// # Panics
    /// * if `k` is outside `[1, MAX_K]`
    pub fn new(k: usize) -> Self {
        assert!(k >= 1 && k <= kmer::MAX_K, "unsupported k-mer size: {k}");
        KmerPathGraph {
            k,
            slots: Vec::new(),
            free: Vec::new(),
            live_nodes: 0,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of valid nodes currently in the graph
    pub fn live_node_count(&self) -> usize {
        self.live_nodes
    }

    /// Number of edges currently in the graph, counted once per edge
    pub fn live_edge_count(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|s| s.node.as_ref())
            .map(|n| n.next.len())
            .sum()
    }

    /// Snapshot of all valid node handles, in slot order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.node.is_some())
            .map(|(i, s)| NodeId {
                index: i as u32,
                generation: s.generation,
            })
            .collect()
    }

    /// Returns true if the handle still refers to a valid node
    pub fn is_valid(&self, id: NodeId) -> bool {
        match self.slots.get(id.index as usize) {
            Some(slot) => slot.generation == id.generation && slot.node.is_some(),
            None => false,
        }
    }

    /// Dereferences a node handle.
    /// # Panics
    /// * if the handle is stale or the node has been invalidated
    pub fn node(&self, id: NodeId) -> &KmerPathNode {
        let slot = &self.slots[id.index as usize];
        assert!(
            slot.generation == id.generation,
            "stale node handle dereferenced: slot {} was freed",
            id.index
        );
        slot.node.as_ref().expect("invalidated node dereferenced")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut KmerPathNode {
        let slot = &mut self.slots[id.index as usize];
        assert!(
            slot.generation == id.generation,
            "stale node handle dereferenced: slot {} was freed",
            id.index
        );
        slot.node.as_mut().expect("invalidated node dereferenced")
    }

    fn insert(&mut self, node: KmerPathNode) -> NodeId {
        self.live_nodes += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// Takes the node out of its slot and frees the slot, regardless of remaining edges.
    /// Callers are responsible for having detached or absorbed every edge first.
    fn free_slot(&mut self, id: NodeId) -> KmerPathNode {
        let slot = &mut self.slots[id.index as usize];
        assert!(slot.generation == id.generation, "stale node handle freed");
        let node = slot.node.take().expect("invalidated node freed twice");
        slot.generation += 1;
        self.free.push(id.index);
        self.live_nodes -= 1;
        node
    }

    /// Promotes a single k-mer of evidence to a path node.
    pub fn add_node<N: KmerNode>(&mut self, node: &N) -> NodeId {
        let id = self.insert(KmerPathNode::single(node));
        if cfg!(debug_assertions) {
            self.sanity_check(id);
        }
        id
    }

    /// Marks the node as deleted and frees its slot.
    /// # Panics
    /// * if the node still has edges on either side
    pub fn invalidate(&mut self, id: NodeId) {
        let node = self.node(id);
        assert!(node.next.is_empty(), "invalidating a node with successors");
        assert!(node.prev.is_empty(), "invalidating a node with predecessors");
        self.free_slot(id);
    }

    /// Wires a new edge between two valid nodes.
    ///
    /// The adjacency lists are only marked unsorted when the appended entry actually
    /// breaks the existing order, so bulk construction in sorted order never pays for a
    /// resort.
    /// # Panics
    /// * if either node is invalid or the edge already exists
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        assert!(self.is_valid(from), "add_edge from an invalid node");
        assert!(self.is_valid(to), "add_edge to an invalid node");
        assert!(!self.node(from).next.contains(&to), "edge already present");
        assert!(!self.node(to).prev.contains(&from), "edge already present");

        if let Some(&tail) = self.node(from).next.last() {
            if self.node(tail).first_start() > self.node(to).first_start() {
                self.node_mut(from).edges_sorted = false;
            }
        }
        self.node_mut(from).next.push(to);

        if let Some(&tail) = self.node(to).prev.last() {
            if self.node(tail).last_start() > self.node(from).last_start() {
                self.node_mut(to).edges_sorted = false;
            }
        }
        self.node_mut(to).prev.push(from);

        if cfg!(debug_assertions) {
            self.sanity_check(from);
            self.sanity_check(to);
        }
    }

    /// Successor handles, sorted by first-k-mer start position.
    pub fn next(&mut self, id: NodeId) -> &[NodeId] {
        self.ensure_edges_sorted(id);
        &self.node(id).next
    }

    /// Predecessor handles, sorted by terminal start position.
    pub fn prev(&mut self, id: NodeId) -> &[NodeId] {
        self.ensure_edges_sorted(id);
        &self.node(id).prev
    }

    pub(crate) fn ensure_edges_sorted(&mut self, id: NodeId) {
        if self.node(id).edges_sorted {
            return;
        }
        let mut next = std::mem::take(&mut self.node_mut(id).next);
        let mut prev = std::mem::take(&mut self.node_mut(id).prev);
        next.sort_by_key(|&n| self.node(n).first_start());
        prev.sort_by_key(|&n| self.node(n).last_start());
        let node = self.node_mut(id);
        node.next = next;
        node.prev = prev;
        node.edges_sorted = true;
    }

    /// Extends the path by one k-mer at its end.
    ///
    /// The evidence window must be the node's terminal window shifted by one on both
    /// bounds, and the node must have no successors yet (the appended k-mer supplants
    /// them as part of the node's own body).
    /// # Panics
    /// * if the windows are not contiguous or the node already has successors
    pub fn append<N: KmerNode>(&mut self, id: NodeId, node: &N) {
        {
            let n = self.node(id);
            assert!(node.start() == n.last_start() + 1, "append window not contiguous");
            assert!(node.end() == n.last_end() + 1, "append window not contiguous");
            assert!(n.next.is_empty(), "append to a node with successors");
            debug_assert!(kmer::is_successor(self.k, n.last_kmer(), node.kmer()));
        }
        let n = self.node_mut(id);
        n.kmers.push(node.kmer());
        n.weights.push(node.weight());
        n.total_weight += node.weight();
        n.reference |= node.is_reference();
        n.version += 1;
        if cfg!(debug_assertions) {
            self.sanity_check(id);
        }
    }

    /// Absorbs a whole predecessor node onto the front of this one.
    ///
    /// The predecessor's only successor must be `id`, and `id`'s only predecessor must be
    /// the predecessor. Its inbound edges are retargeted to `id`, its collapsed k-mers
    /// carry over with their offsets, and it is invalidated.
    /// # Panics
    /// * if the nodes are not an exclusive contiguous pair
    pub fn prepend(&mut self, id: NodeId, pred: NodeId) {
        {
            let n = self.node(id);
            let p = self.node(pred);
            assert!(n.first_start() == p.last_start() + 1, "prepend window not contiguous");
            assert!(n.first_end() == p.last_end() + 1, "prepend window not contiguous");
            assert!(p.next == [id], "prepend requires an exclusive successor");
            assert!(n.prev == [pred], "prepend requires an exclusive predecessor");
            debug_assert!(kmer::is_successor(self.k, p.last_kmer(), n.first_kmer()));
        }

        let mut pred_node = self.free_slot(pred);
        let pred_len = pred_node.length();
        let node = self.node_mut(id);

        let mut kmers = std::mem::take(&mut pred_node.kmers);
        kmers.append(&mut node.kmers);
        node.kmers = kmers;
        let mut weights = std::mem::take(&mut pred_node.weights);
        weights.append(&mut node.weights);
        node.weights = weights;
        node.total_weight += pred_node.total_weight;
        node.reference |= pred_node.reference;

        // collapsed records: ours shift down the path by the absorbed length, the
        // predecessor's keep their offsets
        for offset in node.collapsed_offsets.iter_mut() {
            *offset += pred_len;
        }
        node.collapsed_kmers.append(&mut pred_node.collapsed_kmers);
        node.collapsed_offsets.append(&mut pred_node.collapsed_offsets);

        node.start = pred_node.start;
        node.end = pred_node.end;
        node.version += 1;

        // the pred -> id edge dies with pred; pred's inbound edges become ours
        node.prev = std::mem::take(&mut pred_node.prev);
        node.edges_sorted &= pred_node.edges_sorted;
        for p in self.node(id).prev.clone() {
            replace_first(&mut self.node_mut(p).next, pred, id);
            self.node_mut(p).edges_sorted = false;
        }

        if cfg!(debug_assertions) {
            self.sanity_check(id);
        }
    }

    /// Returns true if `earlier` holds identical content in the window immediately
    /// preceding `id`'s, i.e. the pair was split for positional bookkeeping only.
    pub fn can_coalesce_before_adjacent(&self, id: NodeId, earlier: NodeId) -> bool {
        let n = self.node(id);
        let e = self.node(earlier);
        n.start == e.end + 1
            && n.length() == e.length()
            && n.reference == e.reference
            && n.total_weight == e.total_weight
            && n.kmers == e.kmers
            && n.weights == e.weights
    }

    /// Recombines an equal-content node occupying the immediately preceding disjoint
    /// window into `id`, widening `id`'s window leftward. The earlier node's edges are
    /// re-homed onto `id` and it is invalidated.
    /// # Panics
    /// * if [`Self::can_coalesce_before_adjacent`] does not hold
    pub fn coalesce_before_adjacent(&mut self, id: NodeId, earlier: NodeId) {
        assert!(
            self.can_coalesce_before_adjacent(id, earlier),
            "coalesce requires equal content in adjacent windows"
        );
        self.replace_edges(earlier, id);
        let start = self.node(earlier).start;
        let node = self.node_mut(id);
        node.start = start;
        node.version += 1;
        self.invalidate(earlier);
        if cfg!(debug_assertions) {
            self.sanity_check(id);
        }
    }

    /// Merges an alternate path occupying the identical window and length into `id`.
    ///
    /// Weights are summed k-mer-wise, the other node's primary and collapsed k-mers are
    /// recorded as collapsed alternates, its edges are redirected onto `id` (deduplicated,
    /// never doubled), and it is invalidated.
    /// # Panics
    /// * if the windows or lengths differ
    pub fn merge(&mut self, id: NodeId, other: NodeId) {
        if id == other {
            return;
        }
        {
            let n = self.node(id);
            let o = self.node(other);
            assert!(o.start == n.start && o.end == n.end, "merge requires an identical window");
            assert!(o.length() == n.length(), "merge requires equal lengths");
        }

        let o = self.node(other);
        let other_kmers = o.kmers.clone();
        let other_weights = o.weights.clone();
        let other_total = o.total_weight;
        let other_reference = o.reference;
        let other_collapsed = o.collapsed_kmers.clone();
        let other_collapsed_offsets = o.collapsed_offsets.clone();

        let node = self.node_mut(id);
        node.reference |= other_reference;
        node.collapsed_offsets.extend(0..other_kmers.len());
        node.collapsed_kmers.extend(other_kmers);
        node.collapsed_kmers.extend(other_collapsed);
        node.collapsed_offsets.extend(other_collapsed_offsets);
        node.total_weight += other_total;
        for (w, ow) in node.weights.iter_mut().zip(other_weights) {
            *w += ow;
        }
        node.version += 1;

        self.replace_edges(other, id);
        self.invalidate(other);
        if cfg!(debug_assertions) {
            self.sanity_check(id);
        }
    }

    /// Moves every edge touching `source` onto `target`, deduplicating so a neighbor
    /// already linked to `target` is not double-linked. Affected lists are marked
    /// unsorted; `source` is left with no edges.
    fn replace_edges(&mut self, source: NodeId, target: NodeId) {
        let next = std::mem::take(&mut self.node_mut(source).next);
        if !next.is_empty() {
            for n in next {
                replace_unique(&mut self.node_mut(n).prev, source, target);
                self.node_mut(n).edges_sorted = false;
                if !self.node(target).next.contains(&n) {
                    self.node_mut(target).next.push(n);
                }
            }
            self.node_mut(target).edges_sorted = false;
        }

        let prev = std::mem::take(&mut self.node_mut(source).prev);
        if !prev.is_empty() {
            for p in prev {
                replace_unique(&mut self.node_mut(p).next, source, target);
                self.node_mut(p).edges_sorted = false;
                if !self.node(target).prev.contains(&p) {
                    self.node_mut(target).prev.push(p);
                }
            }
            self.node_mut(target).edges_sorted = false;
        }
    }

    /// Splits out a new node containing the first `first_len` k-mers.
    ///
    /// Inbound edges re-home onto the new predecessor and exactly one edge wires
    /// predecessor to continuation; collapsed records are partitioned by offset. Passing
    /// `0` or the full length is a no-op that returns `id` itself.
    /// # Arguments
    /// * `id` - the node to split; becomes the `[first_len, length)` continuation
    /// * `first_len` - number of k-mers in the new predecessor
    /// # Panics
    /// * if `first_len` exceeds the node length
    pub fn split_at_length(&mut self, id: NodeId, first_len: usize) -> NodeId {
        let len = self.node(id).length();
        if first_len == 0 || first_len == len {
            return id;
        }
        assert!(first_len < len, "split length {first_len} out of range for length {len}");

        let node = self.node_mut(id);
        let tail_kmers = node.kmers.split_off(first_len);
        let tail_weights = node.weights.split_off(first_len);
        let front_kmers = std::mem::replace(&mut node.kmers, tail_kmers);
        let front_weights = std::mem::replace(&mut node.weights, tail_weights);
        let front_total: u32 = front_weights.iter().sum();
        node.total_weight -= front_total;

        // partition the collapsed records across the cut
        let collapsed_kmers = std::mem::take(&mut node.collapsed_kmers);
        let collapsed_offsets = std::mem::take(&mut node.collapsed_offsets);
        let mut front_collapsed = (Vec::new(), Vec::new());
        for (ck, co) in collapsed_kmers.into_iter().zip(collapsed_offsets) {
            if co < first_len {
                front_collapsed.0.push(ck);
                front_collapsed.1.push(co);
            } else {
                node.collapsed_kmers.push(ck);
                node.collapsed_offsets.push(co - first_len);
            }
        }

        let start = node.start;
        let end = node.end;
        let reference = node.reference;
        let edges_sorted = node.edges_sorted;
        node.start += first_len as i64;
        node.end += first_len as i64;
        node.version += 1;
        let inbound = std::mem::take(&mut node.prev);

        let split = self.insert(KmerPathNode {
            kmers: front_kmers,
            weights: front_weights,
            total_weight: front_total,
            start,
            end,
            reference,
            version: 0,
            collapsed_kmers: front_collapsed.0,
            collapsed_offsets: front_collapsed.1,
            next: Vec::new(),
            prev: inbound,
            edges_sorted,
        });
        for p in self.node(split).prev.clone() {
            replace_first(&mut self.node_mut(p).next, id, split);
        }
        self.add_edge(split, id);

        if cfg!(debug_assertions) {
            self.sanity_check(id);
            self.sanity_check(split);
        }
        split
    }

    /// Splits the node's positional window at the given absolute position, returning a
    /// new node covering `[start, at - 1]` with identical k-mer content while `id` keeps
    /// `[at, end]`. Each side keeps only the edges whose neighbor window still overlaps
    /// its narrowed shifted window; edges that no longer overlap are dropped from both
    /// endpoints.
    /// # Arguments
    /// * `id` - the node to split; keeps the later window
    /// * `at` - first-k-mer position where the later window begins; `start < at <= end`
    /// # Panics
    /// * if `at` is outside `(start, end]`
    pub fn split_at_start_position(&mut self, id: NodeId, at: i64) -> NodeId {
        {
            let n = self.node(id);
            assert!(at > n.start, "position split must be inside the window");
            assert!(at <= n.end, "position split must be inside the window");
        }

        let (earlier, next, prev) = {
            let node = self.node_mut(id);
            let earlier = KmerPathNode {
                kmers: node.kmers.clone(),
                weights: node.weights.clone(),
                total_weight: node.total_weight,
                start: node.start,
                end: at - 1,
                reference: node.reference,
                version: 0,
                collapsed_kmers: node.collapsed_kmers.clone(),
                collapsed_offsets: node.collapsed_offsets.clone(),
                next: Vec::new(),
                prev: Vec::new(),
                edges_sorted: node.edges_sorted,
            };
            node.start = at;
            node.version += 1;
            let next = std::mem::take(&mut node.next);
            let prev = std::mem::take(&mut node.prev);
            (earlier, next, prev)
        };
        let split = self.insert(earlier);
        self.redistribute_next(id, split, next);
        self.redistribute_prev(id, split, prev);

        if cfg!(debug_assertions) {
            self.sanity_check(id);
            self.sanity_check(split);
        }
        split
    }

    fn redistribute_next(&mut self, id: NodeId, split: NodeId, next: Vec<NodeId>) {
        let (this_start, this_end) = {
            let n = self.node(id);
            (n.last_start() + 1, n.last_end() + 1)
        };
        let (split_start, split_end) = {
            let n = self.node(split);
            (n.last_start() + 1, n.last_end() + 1)
        };
        let mut keep = Vec::with_capacity(next.len());
        let mut for_split = Vec::new();
        for adj in next {
            let (afs, afe) = {
                let a = self.node(adj);
                (a.first_start(), a.first_end())
            };
            if overlaps_closed(this_start, this_end, afs, afe) {
                keep.push(adj);
            } else {
                remove_entry(&mut self.node_mut(adj).prev, id);
            }
            if overlaps_closed(split_start, split_end, afs, afe) {
                for_split.push(adj);
                self.node_mut(adj).prev.push(split);
                self.node_mut(adj).edges_sorted = false;
            }
        }
        self.node_mut(id).next = keep;
        self.node_mut(split).next = for_split;
    }

    fn redistribute_prev(&mut self, id: NodeId, split: NodeId, prev: Vec<NodeId>) {
        let (this_start, this_end) = {
            let n = self.node(id);
            (n.first_start(), n.first_end())
        };
        let (split_start, split_end) = {
            let n = self.node(split);
            (n.first_start(), n.first_end())
        };
        let mut keep = Vec::with_capacity(prev.len());
        let mut for_split = Vec::new();
        for adj in prev {
            let (als, ale) = {
                let a = self.node(adj);
                (a.last_start() + 1, a.last_end() + 1)
            };
            if overlaps_closed(als, ale, this_start, this_end) {
                keep.push(adj);
            } else {
                remove_entry(&mut self.node_mut(adj).next, id);
            }
            if overlaps_closed(als, ale, split_start, split_end) {
                for_split.push(adj);
                self.node_mut(adj).next.push(split);
                self.node_mut(adj).edges_sorted = false;
            }
        }
        self.node_mut(id).prev = keep;
        self.node_mut(split).prev = for_split;
    }

    /// Deletes a single k-mer position from the node.
    ///
    /// An interior offset length-splits first and recurses into the boundary case,
    /// returning the detached front fragment; the first or last offset additionally
    /// detaches the corresponding edge side. A node emptied of k-mers is invalidated.
    /// # Arguments
    /// * `id` - the node to remove from; keeps the k-mers after an interior offset
    /// * `offset` - in-path offset of the k-mer to delete
    pub(crate) fn remove_kmer(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let len = self.node(id).length();
        assert!(offset < len, "remove_kmer offset {offset} out of range for length {len}");

        if offset > 0 && offset < len - 1 {
            let split = self.split_at_length(id, offset + 1);
            let extra = self.remove_kmer(split, offset);
            debug_assert!(extra.is_none());
            return Some(split);
        }

        if offset == len - 1 {
            for n in self.node(id).next.clone() {
                remove_entry(&mut self.node_mut(n).prev, id);
            }
            self.node_mut(id).next.clear();
        }
        if offset == 0 {
            for p in self.node(id).prev.clone() {
                remove_entry(&mut self.node_mut(p).next, id);
            }
            self.node_mut(id).prev.clear();
        }

        let node = self.node_mut(id);
        let removed = node.weights.remove(offset);
        node.kmers.remove(offset);
        node.total_weight -= removed;
        node.version += 1;
        if offset == 0 && !node.kmers.is_empty() {
            // the run now begins one k-mer later
            node.start += 1;
            node.end += 1;
        }

        if !node.collapsed_kmers.is_empty() && !node.kmers.is_empty() {
            let shift: isize = if offset == 0 { 1 } else { 0 };
            let remaining = node.kmers.len();
            let mut i = node.collapsed_offsets.len();
            while i > 0 {
                i -= 1;
                let adjusted = node.collapsed_offsets[i] as isize - shift;
                if adjusted < 0 || adjusted as usize >= remaining {
                    node.collapsed_offsets.remove(i);
                    node.collapsed_kmers.remove(i);
                } else {
                    node.collapsed_offsets[i] = adjusted as usize;
                }
            }
        }

        if self.node(id).length() == 0 {
            self.node_mut(id).collapsed_kmers.clear();
            self.node_mut(id).collapsed_offsets.clear();
            self.invalidate(id);
        } else if cfg!(debug_assertions) {
            self.sanity_check(id);
        }
        None
    }

    /// Retracts evidence-derived weight from the node, splitting as needed so that
    /// zero-weight k-mers are excised and every surviving fragment stays internally
    /// consistent.
    ///
    /// `to_remove` holds, per k-mer offset, the evidence intervals whose weight is to be
    /// retracted; offsets are processed from last to first so earlier offsets' node
    /// identity stays stable across the loop. The returned collection holds every
    /// surviving fragment exactly once; a fully-consumed fragment is simply absent.
    ///
    /// In debug builds the exact conservation property is asserted:
    /// `sum(fragment weight x width) + sum(removed weight x overlap width)` equals the
    /// original `weight x width`.
    /// # Arguments
    /// * `node` - the node to retract support from
    /// * `to_remove` - per-offset removal lists; may be shorter than the node
    /// # Panics
    /// * if a removal list retracts more weight than the node holds at that position
    pub fn remove_weight<N: KmerNode>(
        &mut self,
        node: NodeId,
        mut to_remove: Vec<Option<Vec<N>>>,
    ) -> VecDeque<NodeId> {
        assert!(
            to_remove.len() <= self.node(node).length(),
            "removal list longer than the node"
        );

        let (pre_area, removed_area) = if cfg!(debug_assertions) {
            let n = self.node(node);
            let pre = n.total_weight as i64 * n.width();
            let removed: i64 = to_remove
                .iter()
                .enumerate()
                .filter_map(|(offset, list)| list.as_ref().map(|l| (offset, l)))
                .map(|(offset, list)| {
                    let (s, e) = (n.start_of(offset), n.end_of(offset));
                    list.iter()
                        .map(|r| r.weight() as i64 * overlap_width_closed(r.start(), r.end(), s, e))
                        .sum::<i64>()
                })
                .sum();
            (pre, removed)
        } else {
            (0, 0)
        };

        let mut replacement: VecDeque<NodeId> = VecDeque::new();
        let mut current = Some(node);
        while let Some(list) = to_remove.pop() {
            let offset = to_remove.len();
            if let Some(mut list) = list {
                if list.is_empty() {
                    continue;
                }
                list.sort_by_key(|n| n.start());
                let id = current.expect("node consumed before all removal offsets were processed");
                current = self.remove_weight_at(&mut replacement, id, offset, &list);
            }
        }
        if let Some(id) = current {
            replacement.push_front(id);
        }

        if cfg!(debug_assertions) {
            for &id in replacement.iter() {
                self.sanity_check(id);
            }
            let post_area: i64 = replacement
                .iter()
                .map(|&id| {
                    let n = self.node(id);
                    n.total_weight as i64 * n.width()
                })
                .sum();
            assert!(
                post_area + removed_area == pre_area,
                "weight not conserved: {post_area} surviving + {removed_area} removed != {pre_area}"
            );
        }
        replacement
    }

    /// Removes weight from a single k-mer offset.
    ///
    /// The sorted removal list is swept by start position with a min-heap of active
    /// intervals keyed by end position, yielding maximal sub-ranges of the offset's
    /// window with a constant weight to subtract. A sub-range spanning the whole window
    /// decrements in place; a partial sub-range first isolates the offset by length
    /// splits, then isolates the sub-range by position splits and recurses the simple
    /// case onto the isolated single-k-mer node.
    ///
    /// Returns the fragment holding the k-mers before `offset` (for the caller to keep
    /// processing), or `None` when no such fragment remains; all other fragments are
    /// pushed onto `out`.
    fn remove_weight_at<N: KmerNode>(
        &mut self,
        out: &mut VecDeque<NodeId>,
        mut node: NodeId,
        mut offset: usize,
        to_remove: &[N],
    ) -> Option<NodeId> {
        let mut active: BinaryHeap<Reverse<(i64, u32)>> = BinaryHeap::new();
        let mut it = to_remove.iter().peekable();
        let mut start = self.node(node).start_of(offset);
        let scope_end = self.node(node).end_of(offset);
        let mut weight_to_remove: u32 = 0;
        let mut pre: Option<NodeId> = None;

        while start <= scope_end {
            // admit removals now in scope, expire the ones we passed
            while it.peek().is_some_and(|n| n.start() <= start) {
                let n = it.next().unwrap();
                weight_to_remove += n.weight();
                active.push(Reverse((n.end(), n.weight())));
            }
            while active.peek().is_some_and(|&Reverse((e, _))| e < start) {
                let Reverse((_, w)) = active.pop().unwrap();
                weight_to_remove -= w;
            }

            // the constant-weight sub-range ends at the nearest upcoming boundary
            let mut end = scope_end;
            if let Some(n) = it.peek() {
                if n.start() <= end {
                    end = n.start() - 1;
                }
            }
            if let Some(&Reverse((e, _))) = active.peek() {
                if e < end {
                    end = e;
                }
            }

            if start == self.node(node).start_of(offset) && end == self.node(node).end_of(offset) {
                // the sub-range spans the node's entire window at this offset
                let res = self.remove_weight_simple(out, node, offset, weight_to_remove);
                debug_assert!(pre.is_none() || res.is_none());
                return pre.or(res);
            }

            if self.node(node).length() != 1 {
                // reduce the node to exactly this offset; the k-mers after it can no
                // longer be touched by this or any earlier offset
                if offset + 1 < self.node(node).length() {
                    out.push_front(node);
                    node = self.split_at_length(node, offset + 1);
                }
                if offset > 0 {
                    pre = Some(self.split_at_length(node, offset));
                }
                offset = 0;
            }

            // isolate the sub-range by position; the remainder is processed next round
            debug_assert!(start == self.node(node).start_of(0));
            debug_assert!(end < self.node(node).end_of(0));
            let after = node;
            let target = self.split_at_start_position(node, end + 1);
            if weight_to_remove > 0 {
                let leftover = self.remove_weight_simple(out, target, 0, weight_to_remove);
                debug_assert!(leftover.is_none());
            } else {
                out.push_front(target);
            }
            node = after;
            start = end + 1;
        }
        pre
    }

    /// Subtracts a flat weight from one k-mer, excising the k-mer when it reaches zero.
    /// Returns the fragment preceding `offset`, or `None` when it was emitted or nothing
    /// survives.
    fn remove_weight_simple(
        &mut self,
        out: &mut VecDeque<NodeId>,
        mut node: NodeId,
        offset: usize,
        weight_to_remove: u32,
    ) -> Option<NodeId> {
        let current = self.node(node).weight_of(offset);
        assert!(
            weight_to_remove <= current,
            "removing {weight_to_remove} support from a k-mer holding {current}"
        );
        if weight_to_remove == current {
            if let Some(split) = self.remove_kmer(node, offset) {
                out.push_front(node);
                node = split;
            }
        } else if weight_to_remove > 0 {
            let n = self.node_mut(node);
            n.weights[offset] -= weight_to_remove;
            n.total_weight -= weight_to_remove;
        }

        if !self.is_valid(node) {
            return None;
        }
        if offset == 0 {
            out.push_front(node);
            return None;
        }
        Some(node)
    }

    /// Verifies every node invariant, panicking on the first violation. Runs after every
    /// public mutation in debug builds; callable explicitly from release code.
    pub fn sanity_check(&self, id: NodeId) {
        let node = self.node(id);
        assert!(node.start <= node.end, "window start exceeds end");
        assert!(node.total_weight > 0, "valid node with zero weight");
        assert!(!node.kmers.is_empty(), "valid node with no k-mers");
        assert!(node.kmers.len() == node.weights.len(), "k-mer/weight arrays diverged");
        let sum: u32 = node.weights.iter().sum();
        assert!(sum == node.total_weight, "cached total weight diverged");
        assert!(
            node.collapsed_kmers.len() == node.collapsed_offsets.len(),
            "collapsed k-mer/offset arrays diverged"
        );
        for &offset in node.collapsed_offsets.iter() {
            assert!(offset < node.length(), "collapsed offset out of range");
        }
        for pair in node.kmers.windows(2) {
            assert!(
                kmer::is_successor(self.k, pair[0], pair[1]),
                "path k-mers not de Bruijn adjacent"
            );
        }
        self.sanity_check_edges(id, true);
    }

    fn sanity_check_edges(&self, id: NodeId, check_neighbors: bool) {
        let node = self.node(id);
        for &n in node.next.iter() {
            assert!(self.is_valid(n), "edge to an invalidated node");
            let adj = self.node(n);
            assert!(
                overlaps_closed(node.last_start() + 1, node.last_end() + 1, adj.first_start(), adj.first_end()),
                "successor window does not overlap"
            );
            assert!(adj.prev.contains(&id), "asymmetric successor edge");
            assert!(
                kmer::is_successor(self.k, node.last_kmer(), adj.first_kmer()),
                "successor k-mer not de Bruijn adjacent"
            );
            if check_neighbors {
                self.sanity_check_edges(n, false);
            }
        }
        if node.edges_sorted {
            for pair in node.next.windows(2) {
                assert!(
                    self.node(pair[0]).first_start() <= self.node(pair[1]).first_start(),
                    "successor list claims sorted but is not"
                );
            }
        }
        for &p in node.prev.iter() {
            assert!(self.is_valid(p), "edge from an invalidated node");
            let adj = self.node(p);
            assert!(
                overlaps_closed(adj.last_start() + 1, adj.last_end() + 1, node.first_start(), node.first_end()),
                "predecessor window does not overlap"
            );
            assert!(adj.next.contains(&id), "asymmetric predecessor edge");
            assert!(
                kmer::is_successor(self.k, adj.last_kmer(), node.first_kmer()),
                "predecessor k-mer not de Bruijn adjacent"
            );
            if check_neighbors {
                self.sanity_check_edges(p, false);
            }
        }
        if node.edges_sorted {
            for pair in node.prev.windows(2) {
                assert!(
                    self.node(pair[0]).last_start() <= self.node(pair[1]).last_start(),
                    "predecessor list claims sorted but is not"
                );
            }
        }
    }

    /// Runs [`Self::sanity_check`] over every node reachable from `id`.
    pub fn sanity_check_reachable(&self, id: NodeId) {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            if !visited.insert(current) {
                continue;
            }
            self.sanity_check(current);
            let node = self.node(current);
            frontier.extend(node.next.iter().copied());
            frontier.extend(node.prev.iter().copied());
        }
    }
}

/// Replaces the first occurrence of `existing` with `replacement`.
/// # Panics
/// * if `existing` is not present
fn replace_first(list: &mut [NodeId], existing: NodeId, replacement: NodeId) {
    let slot = list
        .iter_mut()
        .find(|n| **n == existing)
        .expect("edge list is missing the expected neighbor");
    *slot = replacement;
}

/// Replaces `existing` with `replacement` unless `replacement` is already present, in
/// which case `existing` is simply dropped so the entry is never doubled.
/// # Panics
/// * if `existing` is not present
fn replace_unique(list: &mut Vec<NodeId>, existing: NodeId, replacement: NodeId) {
    let mut existing_at = None;
    let mut replacement_at = None;
    for (i, &n) in list.iter().enumerate() {
        if n == existing {
            existing_at = Some(i);
        } else if n == replacement {
            replacement_at = Some(i);
        }
    }
    let existing_at = existing_at.expect("edge list is missing the expected neighbor");
    if replacement_at.is_some() {
        list.remove(existing_at);
    } else {
        list[existing_at] = replacement;
    }
}

/// Removes the single occurrence of `entry`.
/// # Panics
/// * if `entry` is not present
fn remove_entry(list: &mut Vec<NodeId>, entry: NodeId) {
    let at = list
        .iter()
        .position(|&n| n == entry)
        .expect("edge list is missing the expected neighbor");
    list.remove(at);
}
