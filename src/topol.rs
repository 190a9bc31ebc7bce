/*!
Editable triangle mesh connectivity.

Every vertex knows its incident edges, every edge knows its two endpoints and
up to two triangles, and every triangle knows its three vertices and three
edges. Elements are never moved: removing one marks it deleted, so handles
held by the simplifier stay valid for the whole run.
*/

use std::collections::HashMap;

use crate::{
    element::{EH, FH, VH},
    error::Error,
};

#[derive(Clone, Debug, Default)]
pub(crate) struct Vertex {
    pub edges: Vec<EH>,
    pub deleted: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Edge {
    pub verts: [VH; 2],
    /// Triangles on either side. If there is only one, it is the first.
    pub tris: [Option<FH>; 2],
    pub deleted: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Triangle {
    pub verts: [VH; 3],
    /// `edges[i]` joins `verts[i]` and `verts[(i + 1) % 3]`.
    pub edges: [EH; 3],
    pub deleted: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Topology {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) num_live_vertices: usize,
    pub(crate) num_live_edges: usize,
    pub(crate) num_live_triangles: usize,
}

impl Topology {
    /// Build the connectivity of `nverts` vertices connected by the given
    /// triangles. Every edge must be shared by at most two triangles.
    pub fn from_triangles(nverts: usize, triangles: &[[u32; 3]]) -> Result<Self, Error> {
        let mut topol = Topology {
            vertices: vec![Vertex::default(); nverts],
            edges: Vec::with_capacity(triangles.len() * 3 / 2 + 1),
            triangles: Vec::with_capacity(triangles.len()),
            num_live_vertices: nverts,
            num_live_edges: 0,
            num_live_triangles: 0,
        };
        let mut edge_map: HashMap<(VH, VH), EH> = HashMap::with_capacity(triangles.len() * 3 / 2);
        for (fi, tri) in triangles.iter().enumerate() {
            if let Some(&vi) = tri.iter().find(|&&vi| vi as usize >= nverts) {
                return Err(Error::InvalidVertexIndex(fi, vi, nverts));
            }
            let verts = tri.map(VH::from);
            if verts[0] == verts[1] || verts[1] == verts[2] || verts[2] == verts[0] {
                return Err(Error::DegenerateTriangle(fi));
            }
            let f = FH::from(topol.triangles.len() as u32);
            let mut edges = [EH::from(0u32); 3];
            for i in 0..3 {
                let (a, b) = (verts[i], verts[(i + 1) % 3]);
                let e = *edge_map
                    .entry((a.min(b), a.max(b)))
                    .or_insert_with(|| topol.add_edge(a, b));
                let etris = &mut topol.edges[e.slot()].tris;
                match etris {
                    [None, _] => etris[0] = Some(f),
                    [Some(_), None] => etris[1] = Some(f),
                    [Some(_), Some(_)] => return Err(Error::NonManifoldEdge(a, b)),
                }
                edges[i] = e;
            }
            topol.triangles.push(Triangle {
                verts,
                edges,
                deleted: false,
            });
            topol.num_live_triangles += 1;
        }
        Ok(topol)
    }

    fn add_edge(&mut self, a: VH, b: VH) -> EH {
        let e = EH::from(self.edges.len() as u32);
        self.edges.push(Edge {
            verts: [a, b],
            tris: [None, None],
            deleted: false,
        });
        self.vertices[a.slot()].edges.push(e);
        self.vertices[b.slot()].edges.push(e);
        self.num_live_edges += 1;
        e
    }

    pub fn num_vertices(&self) -> usize {
        self.num_live_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.num_live_edges
    }

    pub fn num_triangles(&self) -> usize {
        self.num_live_triangles
    }

    /// Number of edge slots, including deleted edges.
    pub fn edge_capacity(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.deleted)
            .map(|(i, _)| VH::from(i as u32))
    }

    pub fn edges(&self) -> impl Iterator<Item = EH> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.deleted)
            .map(|(i, _)| EH::from(i as u32))
    }

    pub fn triangles(&self) -> impl Iterator<Item = FH> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.deleted)
            .map(|(i, _)| FH::from(i as u32))
    }

    pub fn is_deleted_vertex(&self, v: VH) -> bool {
        self.vertices[v.slot()].deleted
    }

    pub fn is_deleted_edge(&self, e: EH) -> bool {
        self.edges.get(e.slot()).is_none_or(|e| e.deleted)
    }

    pub fn is_deleted_triangle(&self, f: FH) -> bool {
        self.triangles[f.slot()].deleted
    }

    pub fn edge_vertices(&self, e: EH) -> [VH; 2] {
        self.edges[e.slot()].verts
    }

    pub fn edge_triangles(&self, e: EH) -> impl Iterator<Item = FH> + '_ {
        self.edges[e.slot()].tris.iter().flatten().copied()
    }

    pub fn triangle_vertices(&self, f: FH) -> [VH; 3] {
        self.triangles[f.slot()].verts
    }

    pub fn triangle_edges(&self, f: FH) -> [EH; 3] {
        self.triangles[f.slot()].edges
    }

    pub fn vertex_edges(&self, v: VH) -> &[EH] {
        &self.vertices[v.slot()].edges
    }

    /// The endpoint of `e` that is not `v`.
    pub fn other_vertex(&self, e: EH, v: VH) -> VH {
        let [a, b] = self.edge_vertices(e);
        if a == v { b } else { a }
    }

    pub fn vertex_neighbors(&self, v: VH) -> impl Iterator<Item = VH> + '_ {
        self.vertex_edges(v)
            .iter()
            .map(move |&e| self.other_vertex(e, v))
    }

    /// Triangles incident on `v`, each listed once.
    pub fn vertex_triangles(&self, v: VH) -> Vec<FH> {
        let mut tris: Vec<FH> = self
            .vertex_edges(v)
            .iter()
            .flat_map(|&e| self.edge_triangles(e))
            .collect();
        tris.sort_unstable();
        tris.dedup();
        tris
    }

    pub fn find_edge(&self, a: VH, b: VH) -> Option<EH> {
        self.vertex_edges(a)
            .iter()
            .copied()
            .find(|&e| self.other_vertex(e, a) == b)
    }

    /// The vertex of triangle `f` that is not an endpoint of `e`.
    pub fn opposite_vertex(&self, f: FH, e: EH) -> VH {
        let [a, b] = self.edge_vertices(e);
        let verts = self.triangle_vertices(f);
        verts
            .into_iter()
            .find(|&v| v != a && v != b)
            .unwrap_or(verts[0])
    }

    pub fn is_boundary_edge(&self, e: EH) -> bool {
        self.edges[e.slot()].tris[1].is_none()
    }

    pub fn is_boundary_vertex(&self, v: VH) -> bool {
        self.vertex_edges(v)
            .iter()
            .any(|&e| self.is_boundary_edge(e))
    }

    /// Live triangles as index triples into the list of live vertices, in
    /// the order of [`Topology::vertices`].
    pub fn compact_triangles(&self) -> Vec<[u32; 3]> {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        for (i, v) in self.vertices().enumerate() {
            remap[v.slot()] = i as u32;
        }
        self.triangles()
            .map(|f| self.triangle_vertices(f).map(|v| remap[v.slot()]))
            .collect()
    }
}
