use std::collections::HashMap;

use glam::DVec3;

use crate::{
    element::{FH, Handle, VH},
    error::Error,
    grid::AxisBox,
};

/// Indexed triangle mesh.
///
/// This is the exchange format of the crate: marching cubes writes into it,
/// and the simplifier reads from and writes back to it. Triangles are stored
/// as triples of vertex indices with counter-clockwise winding when seen from
/// the side the normal points to.
#[derive(Clone, Debug, Default)]
pub struct TriMesh {
    positions: Vec<DVec3>,
    triangles: Vec<[u32; 3]>,
    normals: Option<Vec<DVec3>>,
}

impl TriMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nverts: usize, ntris: usize) -> Self {
        TriMesh {
            positions: Vec::with_capacity(nverts),
            triangles: Vec::with_capacity(ntris),
            normals: None,
        }
    }

    /// Create a mesh from position and index buffers.
    ///
    /// Every index must refer to an existing position, and no triangle may
    /// use the same vertex twice.
    pub fn from_buffers(positions: Vec<DVec3>, triangles: Vec<[u32; 3]>) -> Result<Self, Error> {
        let nverts = positions.len();
        for (fi, tri) in triangles.iter().enumerate() {
            if let Some(&vi) = tri.iter().find(|&&vi| vi as usize >= nverts) {
                return Err(Error::InvalidVertexIndex(fi, vi, nverts));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
                return Err(Error::DegenerateTriangle(fi));
            }
        }
        Ok(TriMesh {
            positions,
            triangles,
            normals: None,
        })
    }

    /// Assemble a mesh from buffers that are already known to be consistent.
    pub(crate) fn from_parts(
        positions: Vec<DVec3>,
        triangles: Vec<[u32; 3]>,
        normals: Option<Vec<DVec3>>,
    ) -> Self {
        debug_assert!(normals.as_ref().is_none_or(|n| n.len() == positions.len()));
        TriMesh {
            positions,
            triangles,
            normals,
        }
    }

    /// Attach a per-vertex normal overlay.
    pub fn with_normals(mut self, normals: Vec<DVec3>) -> Result<Self, Error> {
        if normals.len() != self.positions.len() {
            return Err(Error::MismatchedArrayLengths(
                self.positions.len(),
                normals.len(),
            ));
        }
        self.normals = Some(normals);
        Ok(self)
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn points(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn normals(&self) -> Option<&[DVec3]> {
        self.normals.as_deref()
    }

    pub fn point(&self, v: VH) -> DVec3 {
        self.positions[v.slot()]
    }

    pub fn triangle(&self, f: FH) -> [VH; 3] {
        self.triangles[f.slot()].map(VH::from)
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> {
        (0..self.positions.len() as u32).map(VH::from)
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> {
        (0..self.triangles.len() as u32).map(FH::from)
    }

    /// Consume the mesh and return its position and index buffers.
    pub fn into_buffers(self) -> (Vec<DVec3>, Vec<[u32; 3]>) {
        (self.positions, self.triangles)
    }

    pub fn add_vertex(&mut self, pos: DVec3) -> VH {
        let v = VH::from(self.positions.len() as u32);
        self.positions.push(pos);
        if let Some(normals) = self.normals.as_mut() {
            normals.push(DVec3::ZERO);
        }
        v
    }

    /// Append a triangle. Returns `None` if any two of the vertices coincide.
    pub fn add_triangle(&mut self, verts: [VH; 3]) -> Option<FH> {
        let [a, b, c] = verts;
        if a == b || b == c || c == a {
            return None;
        }
        let f = FH::from(self.triangles.len() as u32);
        self.triangles.push(verts.map(|v| v.index()));
        Some(f)
    }

    pub fn triangle_points(&self, f: FH) -> [DVec3; 3] {
        self.triangles[f.slot()].map(|vi| self.positions[vi as usize])
    }

    /// Unit normal of the triangle, or zero for a degenerate triangle.
    pub fn triangle_normal(&self, f: FH) -> DVec3 {
        let [a, b, c] = self.triangle_points(f);
        (b - a).cross(c - a).normalize_or_zero()
    }

    pub fn triangle_area(&self, f: FH) -> f64 {
        let [a, b, c] = self.triangle_points(f);
        0.5 * (b - a).cross(c - a).length()
    }

    pub fn area(&self) -> f64 {
        self.faces().map(|f| self.triangle_area(f)).sum()
    }

    /// Signed volume enclosed by the mesh. This is only meaningful for closed
    /// meshes, and is positive when the triangles face outward.
    pub fn signed_volume(&self) -> f64 {
        self.faces()
            .map(|f| {
                let [a, b, c] = self.triangle_points(f);
                a.dot(b.cross(c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Bounding box of the vertices, or `None` if the mesh has no vertices.
    pub fn bounding_box(&self) -> Option<AxisBox> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold(AxisBox::new(first, first), |bx, &p| bx.include(p)),
        )
    }

    /// Count how many times each undirected edge is used, and in which
    /// direction. The key is the sorted vertex pair, the value holds the
    /// number of uses in (ascending, descending) direction.
    fn edge_uses(&self) -> HashMap<(u32, u32), (u32, u32)> {
        let mut uses: HashMap<(u32, u32), (u32, u32)> =
            HashMap::with_capacity(self.triangles.len() * 3 / 2);
        for tri in &self.triangles {
            for i in 0..3 {
                let (a, b) = (tri[i], tri[(i + 1) % 3]);
                let entry = uses.entry((a.min(b), a.max(b))).or_default();
                if a < b {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }
        uses
    }

    /// Number of edges used by exactly one triangle.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_uses()
            .values()
            .filter(|(fwd, bwd)| fwd + bwd == 1)
            .count()
    }

    /// Check that every edge is shared by exactly two triangles that traverse
    /// it in opposite directions, i.e. the mesh is watertight and consistently
    /// oriented.
    pub fn is_closed_manifold(&self) -> bool {
        !self.triangles.is_empty() && self.edge_uses().values().all(|&uses| uses == (1, 1))
    }
}
