#[cfg(any(feature = "parallel", test))]
use std::sync::{Mutex, PoisonError};

use glam::DVec3;

use crate::{element::VH, mesh::TriMesh};

/// Append-only destination for the vertices and triangles produced by the
/// polygonizer.
pub trait MeshSink {
    fn append_vertex(&mut self, pos: DVec3) -> VH;

    /// Append a triangle. Returns false if the triangle was rejected because
    /// two of its vertices coincide.
    fn append_triangle(&mut self, verts: [VH; 3]) -> bool;
}

impl MeshSink for TriMesh {
    fn append_vertex(&mut self, pos: DVec3) -> VH {
        self.add_vertex(pos)
    }

    fn append_triangle(&mut self, verts: [VH; 3]) -> bool {
        self.add_triangle(verts).is_some()
    }
}

/// A mesh shared between threads. Every append takes the lock.
#[cfg(any(feature = "parallel", test))]
#[derive(Copy, Clone)]
pub struct SharedMesh<'a>(&'a Mutex<TriMesh>);

#[cfg(any(feature = "parallel", test))]
impl<'a> SharedMesh<'a> {
    pub fn new(mesh: &'a Mutex<TriMesh>) -> Self {
        SharedMesh(mesh)
    }
}

#[cfg(any(feature = "parallel", test))]
impl MeshSink for SharedMesh<'_> {
    fn append_vertex(&mut self, pos: DVec3) -> VH {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_vertex(pos)
    }

    fn append_triangle(&mut self, verts: [VH; 3]) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_triangle(verts)
            .is_some()
    }
}
