use crate::{error::Error, topol::Topology};

fn check_vertices(topol: &Topology, nbr_flags: &mut [bool]) -> Result<(), Error> {
    for v in topol.vertices() {
        for &e in topol.vertex_edges(v) {
            if topol.is_deleted_edge(e) {
                return Err(Error::DeletedEdge(e));
            }
            if !topol.edge_vertices(e).contains(&v) {
                return Err(Error::InvalidVertexEdges(v));
            }
            // Two edges to the same neighbor, or the same edge listed twice.
            let nbr = topol.other_vertex(e, v);
            if std::mem::replace(&mut nbr_flags[nbr.slot()], true) {
                return Err(Error::InvalidVertexEdges(v));
            }
        }
        for nbr in topol.vertex_neighbors(v) {
            nbr_flags[nbr.slot()] = false;
        }
    }
    Ok(())
}

fn check_edges(topol: &Topology) -> Result<(), Error> {
    for e in topol.edges() {
        let [a, b] = topol.edge_vertices(e);
        if a == b {
            return Err(Error::InvalidEdge(e));
        }
        for v in [a, b] {
            if topol.is_deleted_vertex(v) {
                return Err(Error::DeletedVertex(v));
            }
            if !topol.vertex_edges(v).contains(&e) {
                return Err(Error::InvalidEdge(e));
            }
        }
        let tris = topol.edges[e.slot()].tris;
        match tris {
            [None, Some(_)] => return Err(Error::InvalidEdge(e)),
            [Some(f), Some(g)] if f == g => return Err(Error::InvalidEdge(e)),
            _ => {}
        }
        for f in tris.into_iter().flatten() {
            if topol.is_deleted_triangle(f) {
                return Err(Error::DeletedFace(f));
            }
            if !topol.triangle_edges(f).contains(&e) {
                return Err(Error::InvalidEdge(e));
            }
        }
    }
    Ok(())
}

fn check_triangles(topol: &Topology) -> Result<(), Error> {
    for f in topol.triangles() {
        let verts = topol.triangle_vertices(f);
        let edges = topol.triangle_edges(f);
        for i in 0..3 {
            let (v, w) = (verts[i], verts[(i + 1) % 3]);
            if v == w {
                return Err(Error::InvalidFace(f));
            }
            if topol.is_deleted_vertex(v) {
                return Err(Error::DeletedVertex(v));
            }
            let e = edges[i];
            if topol.is_deleted_edge(e) {
                return Err(Error::DeletedEdge(e));
            }
            let [a, b] = topol.edge_vertices(e);
            if !((a == v && b == w) || (a == w && b == v)) {
                return Err(Error::InvalidFace(f));
            }
            if !topol.edge_triangles(e).any(|g| g == f) {
                return Err(Error::InvalidFace(f));
            }
        }
    }
    Ok(())
}

fn check_counts(topol: &Topology) -> Result<(), Error> {
    let counts = (
        topol.vertices().count(),
        topol.edges().count(),
        topol.triangles().count(),
    );
    if counts != (topol.num_vertices(), topol.num_edges(), topol.num_triangles()) {
        return Err(Error::InconsistentCounts);
    }
    Ok(())
}

impl Topology {
    /// Check the connectivity for internal consistency. Returns the first
    /// error found.
    pub fn check_topology(&self) -> Result<(), Error> {
        let mut nbr_flags = vec![false; self.vertex_capacity()].into_boxed_slice();
        check_vertices(self, &mut nbr_flags)?;
        check_edges(self)?;
        check_triangles(self)?;
        check_counts(self)
    }
}

#[cfg(test)]
mod test {
    use crate::{error::Error, mesh::TriMesh, topol::Topology};

    #[test]
    fn t_fresh_topology_is_valid() {
        for mesh in [
            TriMesh::tetrahedron(1.0),
            TriMesh::octahedron(1.0),
            TriMesh::icosahedron(1.0),
            TriMesh::plane_grid(glam::DVec3::ZERO, glam::DVec3::ONE, 4, 3),
        ] {
            let mesh = mesh.expect("Cannot create mesh");
            Topology::from_triangles(mesh.num_vertices(), mesh.triangles())
                .expect("Cannot build topology")
                .check_topology()
                .expect("Topological errors found");
        }
    }

    #[test]
    fn t_corruption_detected() {
        let mesh = TriMesh::octahedron(1.0).expect("Cannot create octahedron");
        let topol = Topology::from_triangles(mesh.num_vertices(), mesh.triangles())
            .expect("Cannot build topology");
        let mut broken = topol.clone();
        broken.edges[0].tris[0] = None;
        assert!(matches!(broken.check_topology(), Err(Error::InvalidEdge(_))));
        let mut broken = topol.clone();
        broken.triangles[2].deleted = true;
        assert!(broken.check_topology().is_err());
        let mut broken = topol.clone();
        broken.num_live_vertices -= 1;
        assert!(matches!(broken.check_topology(), Err(Error::InconsistentCounts)));
    }
}
