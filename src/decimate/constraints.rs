use std::collections::HashSet;

use glam::DVec3;

use crate::{element::VH, grid::AxisBox};

/// Restrictions on which collapses the simplifier may perform. Every method
/// has a permissive default.
pub trait CollapseConstraints {
    /// Whether the edge between `a` and `b` must not be collapsed at all.
    fn is_edge_fully_constrained(&self, _a: VH, _b: VH) -> bool {
        false
    }

    fn can_remove_vertex(&self, _v: VH) -> bool {
        true
    }

    fn can_move_vertex(&self, _v: VH) -> bool {
        true
    }

    /// Last check before a planned collapse of `removed` into `kept`, which
    /// will be placed at `pos`.
    fn violates_collapse(&self, _kept: VH, _removed: VH, _pos: DVec3) -> bool {
        false
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct NoConstraints;

impl CollapseConstraints for NoConstraints {}

/**
 * Constraints stored with the mesh.
 *
 * Pinned vertices are never removed or moved. Constrained edges are never
 * collapsed, and their endpoints are never removed, so the edges survive the
 * simplification. If a region is set, collapses that would place a vertex
 * outside it are rejected.
 */
#[derive(Clone, Debug, Default)]
pub struct MeshConstraints {
    pinned: HashSet<VH>,
    edges: HashSet<(VH, VH)>,
    region: Option<AxisBox>,
}

fn edge_key(a: VH, b: VH) -> (VH, VH) {
    (a.min(b), a.max(b))
}

impl MeshConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin_vertex(&mut self, v: VH) {
        self.pinned.insert(v);
    }

    pub fn constrain_edge(&mut self, a: VH, b: VH) {
        self.edges.insert(edge_key(a, b));
    }

    pub fn with_pinned(mut self, verts: impl IntoIterator<Item = VH>) -> Self {
        self.pinned.extend(verts);
        self
    }

    pub fn with_edges(mut self, edges: impl IntoIterator<Item = (VH, VH)>) -> Self {
        self.edges
            .extend(edges.into_iter().map(|(a, b)| edge_key(a, b)));
        self
    }

    pub fn with_region(mut self, region: AxisBox) -> Self {
        self.region = Some(region);
        self
    }

    pub fn is_pinned(&self, v: VH) -> bool {
        self.pinned.contains(&v)
    }

    fn on_constrained_edge(&self, v: VH) -> bool {
        self.edges.iter().any(|&(a, b)| a == v || b == v)
    }
}

impl CollapseConstraints for MeshConstraints {
    fn is_edge_fully_constrained(&self, a: VH, b: VH) -> bool {
        self.edges.contains(&edge_key(a, b))
    }

    fn can_remove_vertex(&self, v: VH) -> bool {
        !self.is_pinned(v) && !self.on_constrained_edge(v)
    }

    fn can_move_vertex(&self, v: VH) -> bool {
        !self.is_pinned(v)
    }

    fn violates_collapse(&self, _kept: VH, _removed: VH, pos: DVec3) -> bool {
        self.region.is_some_and(|region| !region.contains(pos))
    }
}
