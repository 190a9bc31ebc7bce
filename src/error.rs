use thiserror::Error;

use crate::element::{EH, FH, VH};

#[derive(Debug, Error)]
pub enum Error {
    // Input buffers.
    #[error("Triangle {0} references vertex {1}, but the mesh has {2} vertices")]
    InvalidVertexIndex(usize, u32, usize),
    #[error("Triangle {0} uses the same vertex more than once")]
    DegenerateTriangle(usize),
    #[error("Mismatched array lengths: {0} and {1}")]
    MismatchedArrayLengths(usize, usize),
    // Topology.
    #[error("The edge between {0} and {1} is shared by more than two triangles")]
    NonManifoldEdge(VH, VH),
    #[error("{0} is deleted")]
    DeletedVertex(VH),
    #[error("{0} is deleted")]
    DeletedEdge(EH),
    #[error("{0} is deleted")]
    DeletedFace(FH),
    #[error("{0} is not an endpoint of {1}")]
    NotAnEndpoint(VH, EH),
    #[error("{0} has inconsistent incident edges")]
    InvalidVertexEdges(VH),
    #[error("{0} has inconsistent vertices or triangles")]
    InvalidEdge(EH),
    #[error("{0} has inconsistent vertices or edges")]
    InvalidFace(FH),
    #[error("Collapsing {0} would break the topology of the mesh")]
    IllegalCollapse(EH),
    #[error("The element counts do not match the live elements")]
    InconsistentCounts,
}

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn t_error_display() {
        let err = Error::NonManifoldEdge(2u32.into(), 7u32.into());
        assert_eq!(
            "The edge between VH(2) and VH(7) is shared by more than two triangles",
            format!("{err}")
        );
        let err = Error::InvalidVertexIndex(4, 10, 8);
        assert!(format!("{err}").contains("has 8 vertices"));
    }
}
