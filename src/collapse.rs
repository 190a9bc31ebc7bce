use arrayvec::ArrayVec;

use crate::{
    element::{EH, FH, VH},
    error::Error,
    topol::Topology,
};

/// What an edge collapse removed from the mesh.
#[derive(Clone, Debug)]
pub struct CollapseInfo {
    pub kept: VH,
    pub removed_vertex: VH,
    /// The collapsed edge, followed by the edges merged into their twins.
    pub removed_edges: ArrayVec<EH, 3>,
    pub removed_tris: ArrayVec<FH, 2>,
}

fn remove_from(list: &mut Vec<EH>, e: EH) {
    if let Some(i) = list.iter().position(|&x| x == e) {
        list.swap_remove(i);
    }
}

impl Topology {
    /// Whether collapsing `e` keeps the mesh a manifold with the same
    /// topology.
    pub fn check_edge_collapse(&self, e: EH) -> bool {
        if self.is_deleted_edge(e) {
            return false;
        }
        let [a, b] = self.edge_vertices(e);
        let mut opposite: ArrayVec<VH, 2> = ArrayVec::new();
        for f in self.edge_triangles(e) {
            // A triangle hanging by this edge alone would leave a dangling
            // edge behind.
            let others: ArrayVec<EH, 3> = self
                .triangle_edges(f)
                .into_iter()
                .filter(|&x| x != e)
                .collect();
            if others.iter().all(|&x| self.is_boundary_edge(x)) {
                return false;
            }
            opposite.push(self.opposite_vertex(f, e));
        }
        if let [c, d] = opposite[..] {
            if c == d {
                return false;
            }
        }
        // Joining two different boundaries through the interior.
        if !self.is_boundary_edge(e) && self.is_boundary_vertex(a) && self.is_boundary_vertex(b) {
            return false;
        }
        // Link condition: the only vertices adjacent to both endpoints are
        // the ones opposite the edge.
        for c in self.vertex_neighbors(a) {
            if c != b && !opposite.contains(&c) && self.find_edge(b, c).is_some() {
                return false;
            }
        }
        // Both triangles on the edge between the opposite vertices would
        // become copies of each other.
        if let [c, d] = opposite[..] {
            if let Some(cd) = self.find_edge(c, d) {
                let mut apexes = self.edge_triangles(cd).map(|f| self.opposite_vertex(f, cd));
                if let (Some(x), Some(y)) = (apexes.next(), apexes.next()) {
                    if (x == a && y == b) || (x == b && y == a) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn detach_triangle(&mut self, f: FH) {
        let edges = self.triangles[f.slot()].edges;
        for e in edges {
            let tris = &mut self.edges[e.slot()].tris;
            if tris[0] == Some(f) {
                tris[0] = tris[1].take();
            } else if tris[1] == Some(f) {
                tris[1] = None;
            }
        }
        self.triangles[f.slot()].deleted = true;
        self.num_live_triangles -= 1;
    }

    fn delete_edge(&mut self, e: EH) {
        let [a, b] = self.edges[e.slot()].verts;
        remove_from(&mut self.vertices[a.slot()].edges, e);
        remove_from(&mut self.vertices[b.slot()].edges, e);
        let edge = &mut self.edges[e.slot()];
        edge.deleted = true;
        edge.tris = [None, None];
        self.num_live_edges -= 1;
    }

    /// Collapse `e` into its endpoint `keep`. The other endpoint is deleted,
    /// along with the triangles on `e`. Each of those triangles also takes
    /// one of its remaining edges with it, which is merged into the edge it
    /// now coincides with.
    pub fn collapse_edge(&mut self, e: EH, keep: VH) -> Result<CollapseInfo, Error> {
        if self.is_deleted_edge(e) {
            return Err(Error::DeletedEdge(e));
        }
        let [a, b] = self.edge_vertices(e);
        let rem = match keep {
            k if k == a => b,
            k if k == b => a,
            _ => return Err(Error::NotAnEndpoint(keep, e)),
        };
        if !self.check_edge_collapse(e) {
            return Err(Error::IllegalCollapse(e));
        }
        let collapsed: ArrayVec<FH, 2> = self.edge_triangles(e).collect();
        let relabel: Vec<FH> = self
            .vertex_triangles(rem)
            .into_iter()
            .filter(|f| !collapsed.contains(f))
            .collect();
        let mut info = CollapseInfo {
            kept: keep,
            removed_vertex: rem,
            removed_edges: ArrayVec::new(),
            removed_tris: ArrayVec::new(),
        };
        info.removed_edges.push(e);
        // Each collapsed triangle merges its edge `erc` into `ekc`, and the
        // triangle across `erc` moves onto `ekc`. Look everything up before
        // editing anything.
        let mut merges: ArrayVec<(FH, EH, EH, Option<FH>), 2> = ArrayVec::new();
        for &f in &collapsed {
            let c = self.opposite_vertex(f, e);
            let (Some(ekc), Some(erc)) = (self.find_edge(keep, c), self.find_edge(rem, c)) else {
                return Err(Error::InvalidFace(f));
            };
            let across = self.edges[erc.slot()]
                .tris
                .into_iter()
                .flatten()
                .find(|&g| g != f);
            let slots = self.edges[ekc.slot()].tris;
            let full = matches!(slots, [Some(x), Some(y)] if x != f && y != f);
            if across.is_some() && full {
                return Err(Error::InvalidEdge(ekc));
            }
            merges.push((f, ekc, erc, across));
        }
        for (f, ekc, erc, across) in merges {
            self.detach_triangle(f);
            info.removed_tris.push(f);
            if let Some(g) = across {
                let slots = &mut self.edges[ekc.slot()].tris;
                match slots[0] {
                    None => slots[0] = Some(g),
                    Some(_) => slots[1] = Some(g),
                }
                for x in self.triangles[g.slot()].edges.iter_mut() {
                    if *x == erc {
                        *x = ekc;
                    }
                }
            }
            self.delete_edge(erc);
            info.removed_edges.push(erc);
        }
        self.delete_edge(e);
        let moved = std::mem::take(&mut self.vertices[rem.slot()].edges);
        for &x in &moved {
            for v in self.edges[x.slot()].verts.iter_mut() {
                if *v == rem {
                    *v = keep;
                }
            }
        }
        self.vertices[keep.slot()].edges.extend(moved);
        for f in relabel {
            for v in self.triangles[f.slot()].verts.iter_mut() {
                if *v == rem {
                    *v = keep;
                }
            }
        }
        self.vertices[rem.slot()].deleted = true;
        self.num_live_vertices -= 1;
        Ok(info)
    }
}
