/*!
Isosurface extraction and mesh simplification.

# Overview

+ [`MarchingCubes`] polygonizes an implicit [`ScalarField`] over a regular
  grid into a watertight, shared-vertex [`TriMesh`]. The grid can be swept
  completely, optionally in parallel over Z slabs using
  [`rayon`](https://crates.io/crates/rayon), or it can be flood filled from
  seed points with [`MarchingCubes::generate_continuation`], which only
  samples the cells near the surface.

+ [`Simplifier`] reduces a triangle mesh by collapsing edges in the order of
  their quadric error. The stopping criterion is a [`SimplificationTarget`].
  The error metric is pluggable through [`QuadricMetric`]: plain
  [`Quadric`]s measure the squared distance to the planes of the original
  triangles, and [`ProbabilisticQuadric`]s add uncertainty to those planes,
  which keeps flat regions solvable. Collapses can be restricted with
  [`CollapseConstraints`].

+ Both operations can be canceled from another thread, in which case they
  return what they produced so far, flagged as incomplete.

Points and vectors use [`glam::DVec3`].
*/

mod check;
mod collapse;
mod cursor;
mod decimate;
mod dedup;
mod element;
mod error;
mod field;
mod grid;
mod macros;
mod mesh;
mod polygonize;
mod primitive;
mod queue;
mod sink;
mod topol;

use std::sync::Arc;

pub use collapse::CollapseInfo;
pub use decimate::{
    CollapseConstraints, CollapseMode, CollapseOutcome, FieldProjection, MeshConstraints,
    NoConstraints, ProbabilisticParams, ProbabilisticQuadric, ProjectionTarget, Quadric,
    QuadricMetric, SimplificationTarget, Simplifier, SimplifyOptions, SimplifyReport,
};
pub use element::{EH, FH, Handle, VH};
pub use error::Error;
pub use field::{ScalarField, ValidatedField};
pub use grid::{AxisBox, DEFAULT_SAFETY_MAX};
pub use mesh::TriMesh;
pub use polygonize::{
    DEFAULT_DEGENERATE_BIAS, Extraction, ExtractionStatus, ISO_EPSILON, MarchingCubes, RootMode,
};
pub use queue::Queue;
pub use topol::Topology;

/// Predicate polled by long running operations. Returning true stops the
/// operation early.
pub type Cancel = Arc<dyn Fn() -> bool + Send + Sync>;
