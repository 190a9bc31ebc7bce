/*!
Isosurface extraction with marching cubes.

The grid is swept cell by cell. Each cell classifies its eight corners
against the isovalue, looks up which of its twelve edges the surface crosses,
places one vertex on every crossed edge, and connects them into triangles
according to the classic lookup tables. Vertices on an edge shared by several
cells are created once and reused through an [`EdgeVertexMap`].
*/

mod rootfind;
pub(crate) mod tables;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
#[cfg(feature = "parallel")]
use std::sync::{Mutex, PoisonError};

use glam::{DVec3, IVec3, UVec3};
use tracing::{debug, info, warn};

use crate::{
    Cancel,
    cursor::{Axis, CellCursor, GridCell},
    dedup::{EdgeKey, EdgeVertexMap},
    element::VH,
    field::{self, ScalarField},
    grid::{AxisBox, DEFAULT_SAFETY_MAX, DenseValueCache, GridLayout},
    mesh::TriMesh,
    sink::MeshSink,
};
#[cfg(feature = "parallel")]
use crate::sink::SharedMesh;

pub use rootfind::{DEFAULT_DEGENERATE_BIAS, ISO_EPSILON, RootMode};
use rootfind::RootFinder;
use tables::{CORNER_OFFSETS, EDGE_AXIS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExtractionStatus {
    Complete,
    /// The cancel predicate returned true. The mesh holds whatever was
    /// extracted up to that point.
    Canceled,
    /// The bounds or the cell size cannot form a grid. The mesh is empty.
    InvalidGrid,
}

/// Result of an extraction.
#[derive(Debug)]
pub struct Extraction {
    pub mesh: TriMesh,
    pub status: ExtractionStatus,
    /// The cell size actually used, which is larger than the requested one if
    /// the grid hit the safety maximum.
    pub cell_size: f64,
    pub cells: UVec3,
}

impl Extraction {
    fn invalid() -> Self {
        Extraction {
            mesh: TriMesh::new(),
            status: ExtractionStatus::InvalidGrid,
            cell_size: 0.0,
            cells: UVec3::ZERO,
        }
    }

    /// The extraction ran to completion on a valid grid.
    pub fn is_ok(&self) -> bool {
        self.status == ExtractionStatus::Complete
    }
}

/// Marching cubes configuration.
///
/// ```
/// use glam::DVec3;
/// use isomesh::{AxisBox, MarchingCubes};
///
/// let mc = MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 2.0), 0.25).with_parallel(false);
/// let result = mc.generate(&|p: DVec3| p.length() - 1.0);
/// assert!(result.is_ok());
/// assert!(result.mesh.is_closed_manifold());
/// ```
#[derive(Clone)]
pub struct MarchingCubes {
    pub bounds: AxisBox,
    pub cell_size: f64,
    pub isovalue: f64,
    pub root_mode: RootMode,
    /// Iterations used by [`RootMode::LerpSteps`] and [`RootMode::Bisection`].
    pub root_steps: u32,
    /// Fraction of the edge length by which vertices are moved off a corner
    /// lying on the surface.
    pub degenerate_bias: f64,
    /// Maximum number of cells along any axis.
    pub safety_max: u32,
    /// Sweep in parallel. Without the `parallel` feature this has no effect.
    pub parallel: bool,
    /// Thread pool for parallel extraction. The global rayon pool is used if
    /// this is `None`.
    #[cfg(feature = "parallel")]
    pub thread_pool: Option<Arc<rayon::ThreadPool>>,
    pub cancel: Option<Cancel>,
}

impl Default for MarchingCubes {
    fn default() -> Self {
        MarchingCubes {
            bounds: AxisBox::cube(DVec3::ZERO, 1.0),
            cell_size: 0.1,
            isovalue: 0.0,
            root_mode: RootMode::SingleLerp,
            root_steps: 5,
            degenerate_bias: DEFAULT_DEGENERATE_BIAS,
            safety_max: DEFAULT_SAFETY_MAX,
            parallel: true,
            #[cfg(feature = "parallel")]
            thread_pool: None,
            cancel: None,
        }
    }
}

impl MarchingCubes {
    pub fn new(bounds: AxisBox, cell_size: f64) -> Self {
        MarchingCubes {
            bounds,
            cell_size,
            ..Default::default()
        }
    }

    pub fn with_isovalue(mut self, isovalue: f64) -> Self {
        self.isovalue = isovalue;
        self
    }

    pub fn with_root_mode(mut self, mode: RootMode, steps: u32) -> Self {
        self.root_mode = mode;
        self.root_steps = steps;
        self
    }

    pub fn with_degenerate_bias(mut self, bias: f64) -> Self {
        self.degenerate_bias = bias;
        self
    }

    pub fn with_safety_max(mut self, safety_max: u32) -> Self {
        self.safety_max = safety_max;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[cfg(feature = "parallel")]
    pub fn with_thread_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    pub fn with_cancel(mut self, cancel: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.cancel = Some(Arc::new(cancel));
        self
    }

    /// Polygonize the whole grid.
    pub fn generate<S: ScalarField + ?Sized>(&self, field: &S) -> Extraction {
        let Some(poly) = self.polygonizer(field) else {
            return Extraction::invalid();
        };
        let cells = poly.layout.cells();
        info!(
            cells = ?cells,
            cell_size = poly.layout.cell_size(),
            parallel = self.parallel,
            "Marching cubes sweep"
        );
        #[cfg(feature = "parallel")]
        if self.parallel {
            let mesh = self.in_pool(|| {
                use rayon::prelude::*;
                let mesh = Mutex::new(TriMesh::new());
                (0..cells.z as i32).into_par_iter().for_each(|k| {
                    let mut sink = SharedMesh::new(&mesh);
                    poly.sweep_slab(k, &mut sink);
                });
                mesh.into_inner().unwrap_or_else(PoisonError::into_inner)
            });
            return poly.finish(mesh);
        }
        let mut mesh = TriMesh::new();
        for k in 0..cells.z as i32 {
            if !poly.sweep_slab(k, &mut mesh) {
                break;
            }
        }
        poly.finish(mesh)
    }

    /// Polygonize only the part of the surface connected to the seed points.
    ///
    /// Starting from the cell containing each seed, cells are visited in a
    /// flood fill across shared faces, as long as they produce triangles.
    /// Seeds outside the grid start from the nearest cell. Field values are
    /// cached so that no corner is evaluated twice.
    pub fn generate_continuation<S: ScalarField + ?Sized>(
        &self,
        field: &S,
        seeds: &[DVec3],
    ) -> Extraction {
        let Some(poly) = self.polygonizer(field) else {
            return Extraction::invalid();
        };
        info!(
            cells = ?poly.layout.cells(),
            cell_size = poly.layout.cell_size(),
            seeds = seeds.len(),
            parallel = self.parallel,
            "Marching cubes continuation"
        );
        let cache = DenseValueCache::new(&poly.layout);
        let done: Vec<AtomicBool> = (0..poly.layout.num_cells())
            .map(|_| AtomicBool::new(false))
            .collect();
        let start = |seed: &DVec3| {
            poly.layout
                .clamp_cell(poly.layout.indexer().to_grid(*seed))
        };
        #[cfg(feature = "parallel")]
        if self.parallel {
            let mesh = self.in_pool(|| {
                use rayon::prelude::*;
                let mesh = Mutex::new(TriMesh::new());
                seeds.par_iter().for_each(|seed| {
                    let mut sink = SharedMesh::new(&mesh);
                    poly.flood(start(seed), &cache, &done, &mut sink);
                });
                mesh.into_inner().unwrap_or_else(PoisonError::into_inner)
            });
            debug!(evaluated = cache.num_evaluated(), "Corner values");
            return poly.finish(mesh);
        }
        let mut mesh = TriMesh::new();
        for seed in seeds {
            if !poly.flood(start(seed), &cache, &done, &mut mesh) {
                break;
            }
        }
        debug!(evaluated = cache.num_evaluated(), "Corner values");
        poly.finish(mesh)
    }

    fn polygonizer<'a, S: ScalarField + ?Sized>(
        &'a self,
        field: &'a S,
    ) -> Option<Polygonizer<'a, S>> {
        let Some(layout) = GridLayout::new(self.bounds, self.cell_size, self.safety_max) else {
            warn!(
                bounds = ?self.bounds,
                cell_size = self.cell_size,
                "Invalid grid, nothing to extract"
            );
            return None;
        };
        Some(Polygonizer {
            field,
            layout,
            isovalue: self.isovalue,
            roots: RootFinder {
                field,
                isovalue: self.isovalue,
                mode: self.root_mode,
                steps: self.root_steps,
                bias: self.degenerate_bias,
            },
            edges: EdgeVertexMap::new(),
            cancel: self.cancel.as_ref(),
            canceled: AtomicBool::new(false),
        })
    }

    #[cfg(feature = "parallel")]
    fn in_pool<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.thread_pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// State shared by all cells of one extraction.
struct Polygonizer<'a, S: ScalarField + ?Sized> {
    field: &'a S,
    layout: GridLayout,
    isovalue: f64,
    roots: RootFinder<'a, S>,
    edges: EdgeVertexMap,
    cancel: Option<&'a Cancel>,
    canceled: AtomicBool,
}

impl<S: ScalarField + ?Sized> Polygonizer<'_, S> {
    fn is_canceled(&self) -> bool {
        if self.canceled.load(Ordering::Relaxed) {
            return true;
        }
        match self.cancel {
            Some(cancel) if cancel() => {
                self.canceled.store(true, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    fn corner_value(&self, c: IVec3) -> f64 {
        field::sample(self.field, self.layout.corner_pos(c))
    }

    /// Sweep one Z slab row by row, sliding a cursor along X. Returns false
    /// if the extraction was canceled.
    fn sweep_slab<K: MeshSink>(&self, k: i32, sink: &mut K) -> bool {
        let cells = self.layout.cells().as_ivec3();
        for j in 0..cells.y {
            if self.is_canceled() {
                return false;
            }
            let mut cursor = CellCursor::new(IVec3::new(0, j, k), |c| self.corner_value(c));
            for i in 0..cells.x {
                if i > 0 {
                    cursor.advance(Axis::X);
                }
                self.polygonize_cell(cursor.cell(), sink);
            }
        }
        true
    }

    /// Flood fill from `start` through cells that produce triangles. Returns
    /// false if the extraction was canceled.
    fn flood<K: MeshSink>(
        &self,
        start: IVec3,
        cache: &DenseValueCache,
        done: &[AtomicBool],
        sink: &mut K,
    ) -> bool {
        let mut stack = vec![start];
        while let Some(c) = stack.pop() {
            if self.is_canceled() {
                return false;
            }
            if done[self.layout.cell_index(c)].swap(true, Ordering::AcqRel) {
                continue;
            }
            let cell = GridCell::sample(c, |corner| {
                cache.get_or_compute(corner, || self.corner_value(corner))
            });
            if self.polygonize_cell(&cell, sink) == 0 {
                continue;
            }
            for axis in Axis::ALL {
                for n in [c - axis.unit(), c + axis.unit()] {
                    if self.layout.contains_cell(n)
                        && !done[self.layout.cell_index(n)].load(Ordering::Relaxed)
                    {
                        stack.push(n);
                    }
                }
            }
        }
        true
    }

    /// Emit the triangles of one cell. Returns the number of triangles added.
    fn polygonize_cell<K: MeshSink>(&self, cell: &GridCell, sink: &mut K) -> usize {
        if cell.has_invalid() {
            return 0;
        }
        let cube = cell.cube_index(self.isovalue) as usize;
        let crossed = EDGE_TABLE[cube];
        if crossed == 0 {
            return 0;
        }
        let mut verts: [Option<VH>; 12] = [None; 12];
        for (e, vert) in verts.iter_mut().enumerate() {
            if crossed & (1 << e) != 0 {
                *vert = Some(self.edge_vertex(cell, e, sink));
            }
        }
        let mut count = 0;
        for tri in TRI_TABLE[cube].chunks_exact(3).take_while(|tri| tri[0] >= 0) {
            if let (Some(a), Some(b), Some(c)) = (
                verts[tri[0] as usize],
                verts[tri[1] as usize],
                verts[tri[2] as usize],
            ) {
                // The tables wind triangles toward the inside. Flip them so
                // the normals point toward increasing field values.
                if sink.append_triangle([a, c, b]) {
                    count += 1;
                }
            }
        }
        count
    }

    /// The vertex on edge `e` of the cell, creating it if this is the first
    /// cell to visit the edge.
    fn edge_vertex<K: MeshSink>(&self, cell: &GridCell, e: usize, sink: &mut K) -> VH {
        let (a, b) = EDGE_CORNERS[e];
        // Lower corner first, so every cell sharing the edge places the vertex
        // at the same point.
        let (lo, hi) = if CORNER_OFFSETS[a].element_sum() < CORNER_OFFSETS[b].element_sum() {
            (a, b)
        } else {
            (b, a)
        };
        let (clo, chi) = (cell.corner_coord(lo), cell.corner_coord(hi));
        self.edges.find_or_insert(EdgeKey::new(clo, EDGE_AXIS[e]), || {
            let pos = self.roots.find(
                self.layout.corner_pos(clo),
                cell.values[lo],
                self.layout.corner_pos(chi),
                cell.values[hi],
            );
            sink.append_vertex(pos)
        })
    }

    fn finish(&self, mesh: TriMesh) -> Extraction {
        let status = if self.canceled.load(Ordering::Relaxed) {
            ExtractionStatus::Canceled
        } else {
            ExtractionStatus::Complete
        };
        debug!(
            vertices = mesh.num_vertices(),
            crossed_edges = self.edges.len(),
            triangles = mesh.num_triangles(),
            status = ?status,
            "Marching cubes finished"
        );
        Extraction {
            mesh,
            status,
            cell_size: self.layout.cell_size(),
            cells: self.layout.cells(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        f64::consts::PI,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use glam::{DVec3, IVec3};

    use crate::{
        field::ValidatedField,
        grid::{AxisBox, DEFAULT_SAFETY_MAX, GridLayout},
        macros::assert_f64_eq,
    };

    use super::{ExtractionStatus, MarchingCubes, RootMode};

    fn unit_sphere(p: DVec3) -> f64 {
        p.length() - 1.0
    }

    fn offset_sphere(p: DVec3) -> f64 {
        (p - DVec3::new(0.1, 0.05, -0.07)).length() - 0.8
    }

    fn reference() -> MarchingCubes {
        MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 2.0), 0.25).with_parallel(false)
    }

    #[test]
    fn t_sphere_reference_band() {
        let result = reference().generate(&unit_sphere);
        assert!(result.is_ok());
        let mesh = &result.mesh;
        assert!((500..=900).contains(&mesh.num_triangles()));
        assert_eq!(0, mesh.boundary_edge_count());
        assert!(mesh.is_closed_manifold());
        // Enclosed volume converges to the sphere's, from below.
        let volume = mesh.signed_volume();
        assert!(volume > 0.0);
        assert_f64_eq!(4.0 / 3.0 * PI, volume, 0.25);
        for p in mesh.points() {
            assert!(unit_sphere(*p).abs() < 0.02);
        }
    }

    #[test]
    fn t_volume_converges() {
        let coarse = reference().generate(&unit_sphere).mesh.signed_volume();
        let fine = MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 2.0), 0.1)
            .with_parallel(false)
            .generate(&unit_sphere)
            .mesh
            .signed_volume();
        let exact = 4.0 / 3.0 * PI;
        assert!((fine - exact).abs() < (coarse - exact).abs());
        assert_f64_eq!(exact, fine, 0.05);
    }

    #[test]
    fn t_one_vertex_per_crossed_edge() {
        let bounds = AxisBox::cube(DVec3::ZERO, 1.2);
        let layout = GridLayout::new(bounds, 0.2, DEFAULT_SAFETY_MAX).expect("Valid grid");
        let dims = layout.corners().as_ivec3();
        let inside = |c: IVec3| offset_sphere(layout.corner_pos(c)) < 0.0;
        let mut crossed = 0;
        for k in 0..dims.z {
            for j in 0..dims.y {
                for i in 0..dims.x {
                    let c = IVec3::new(i, j, k);
                    for d in [IVec3::X, IVec3::Y, IVec3::Z] {
                        let n = c + d;
                        if n.cmplt(dims).all() && inside(c) != inside(n) {
                            crossed += 1;
                        }
                    }
                }
            }
        }
        for parallel in [false, true] {
            let result = MarchingCubes::new(bounds, 0.2)
                .with_parallel(parallel)
                .generate(&offset_sphere);
            assert_eq!(crossed, result.mesh.num_vertices());
            assert!(result.mesh.is_closed_manifold());
        }
    }

    #[test]
    fn t_parallel_matches_sequential() {
        let seq = reference().generate(&unit_sphere);
        let par = reference().with_parallel(true).generate(&unit_sphere);
        assert!(par.is_ok());
        assert_eq!(seq.mesh.num_vertices(), par.mesh.num_vertices());
        assert_eq!(seq.mesh.num_triangles(), par.mesh.num_triangles());
        assert_f64_eq!(seq.mesh.signed_volume(), par.mesh.signed_volume(), 1e-9);
        assert!(par.mesh.is_closed_manifold());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn t_custom_thread_pool() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .expect("Cannot build thread pool");
        let result = reference()
            .with_parallel(true)
            .with_thread_pool(std::sync::Arc::new(pool))
            .generate(&unit_sphere);
        assert!(result.is_ok());
        assert_eq!(536, result.mesh.num_triangles());
    }

    #[test]
    fn t_continuation_matches_sweep() {
        let evals = AtomicUsize::new(0);
        let counted = |p: DVec3| {
            evals.fetch_add(1, Ordering::Relaxed);
            unit_sphere(p)
        };
        let full = reference().generate(&counted);
        let full_evals = evals.swap(0, Ordering::Relaxed);
        for parallel in [false, true] {
            let cont = reference()
                .with_parallel(parallel)
                .generate_continuation(&counted, &[DVec3::new(0.9, 0.1, 0.1)]);
            let cont_evals = evals.swap(0, Ordering::Relaxed);
            assert!(cont.is_ok());
            assert_eq!(full.mesh.num_vertices(), cont.mesh.num_vertices());
            assert_eq!(full.mesh.num_triangles(), cont.mesh.num_triangles());
            assert!(cont.mesh.is_closed_manifold());
            assert!(cont_evals < full_evals);
            // Each corner is evaluated at most once.
            assert!(cont_evals <= 18 * 18 * 18);
        }
    }

    #[test]
    fn t_continuation_disjoint_surfaces() {
        let left = |p: DVec3| (p - DVec3::new(-1.0, 0.0, 0.0)).length() - 0.6;
        let right = |p: DVec3| (p - DVec3::new(1.0, 0.0, 0.0)).length() - 0.6;
        let both = |p: DVec3| left(p).min(right(p));
        let mc = MarchingCubes::new(
            AxisBox::new(DVec3::new(-2.0, -1.0, -1.0), DVec3::new(2.0, 1.0, 1.0)),
            0.1,
        )
        .with_parallel(false);
        let full = mc.generate(&both);
        let alone = mc.generate(&left);
        let one = mc.generate_continuation(&both, &[DVec3::new(-0.45, 0.02, 0.03)]);
        assert!(one.mesh.is_closed_manifold());
        assert_eq!(alone.mesh.num_triangles(), one.mesh.num_triangles());
        assert!(one.mesh.num_triangles() < full.mesh.num_triangles());
        assert_f64_eq!(alone.mesh.signed_volume(), one.mesh.signed_volume(), 1e-12);
        let two = mc.generate_continuation(
            &both,
            &[DVec3::new(-0.45, 0.02, 0.03), DVec3::new(0.45, 0.02, 0.03)],
        );
        assert_eq!(full.mesh.num_triangles(), two.mesh.num_triangles());
        assert_eq!(full.mesh.num_vertices(), two.mesh.num_vertices());
    }

    #[test]
    fn t_continuation_clamps_seed() {
        let plane = |p: DVec3| p.y - 0.05;
        let mc = MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 1.0), 0.25).with_parallel(false);
        let full = mc.generate(&plane);
        let cont = mc.generate_continuation(&plane, &[DVec3::new(10.0, 0.0, -7.0)]);
        assert!(cont.is_ok());
        assert_eq!(2 * 9 * 9, full.mesh.num_triangles());
        assert_eq!(full.mesh.num_triangles(), cont.mesh.num_triangles());
        // Nothing to extract from seeds in empty space.
        let empty = mc.generate_continuation(&plane, &[DVec3::new(0.0, 0.9, 0.0)]);
        assert!(empty.is_ok());
        assert!(empty.mesh.is_empty());
    }

    #[test]
    fn t_invalid_grid() {
        let bad = [
            MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 1.0), 0.0),
            MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 1.0), -0.5),
            MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 1.0), f64::INFINITY),
            MarchingCubes::new(AxisBox::new(DVec3::ONE, DVec3::ZERO), 0.1),
            MarchingCubes::new(AxisBox::new(DVec3::ZERO, DVec3::splat(f64::NAN)), 0.1),
        ];
        for mc in bad {
            let result = mc.generate(&unit_sphere);
            assert_eq!(ExtractionStatus::InvalidGrid, result.status);
            assert!(!result.is_ok());
            assert!(result.mesh.is_empty());
            assert_eq!(0, result.mesh.num_vertices());
            let cont = mc.generate_continuation(&unit_sphere, &[DVec3::X]);
            assert_eq!(ExtractionStatus::InvalidGrid, cont.status);
        }
    }

    #[test]
    fn t_cancel() {
        let polls = AtomicUsize::new(0);
        let result = reference()
            .with_cancel(|| true)
            .generate(&unit_sphere);
        assert_eq!(ExtractionStatus::Canceled, result.status);
        assert!(!result.is_ok());
        assert!(result.mesh.is_empty());
        // Cancel halfway through the rows.
        let mc = reference().with_cancel(move || polls.fetch_add(1, Ordering::Relaxed) >= 144);
        let result = mc.generate(&unit_sphere);
        assert_eq!(ExtractionStatus::Canceled, result.status);
        assert!(result.mesh.num_triangles() > 0);
        assert!(result.mesh.num_triangles() < 536);
        let cont = reference()
            .with_cancel(|| true)
            .generate_continuation(&unit_sphere, &[DVec3::new(0.9, 0.1, 0.1)]);
        assert_eq!(ExtractionStatus::Canceled, cont.status);
    }

    #[test]
    fn t_root_modes() {
        // Not a distance field, so linear interpolation is inexact. The center
        // is off the lattice, so no corner lies on the surface.
        let center = DVec3::new(0.1, 0.05, -0.07);
        let squared = move |p: DVec3| (p - center).length_squared() - 0.64;
        let single = reference().generate(&squared);
        let worst = |mesh: &crate::mesh::TriMesh| {
            mesh.points()
                .iter()
                .map(|p| ((*p - center).length() - 0.8).abs())
                .fold(0.0, f64::max)
        };
        assert!(worst(&single.mesh) > 1e-3);
        for mode in [RootMode::LerpSteps, RootMode::Bisection] {
            let refined = reference().with_root_mode(mode, 30).generate(&squared);
            assert_eq!(single.mesh.num_triangles(), refined.mesh.num_triangles());
            assert!(worst(&refined.mesh) < 1e-6);
        }
    }

    #[test]
    fn t_corner_on_surface_bias() {
        // Six corners of the reference grid lie exactly on the unit sphere.
        // Their vertices are moved toward the inside corner by bias * h.
        let squared = |p: DVec3| p.length_squared() - 1.0;
        let shift = super::DEFAULT_DEGENERATE_BIAS * 0.25;
        for mode in [RootMode::SingleLerp, RootMode::Bisection] {
            let result = reference().with_root_mode(mode, 30).generate(&squared);
            let mesh = &result.mesh;
            assert!(mesh.is_closed_manifold());
            for axis in [DVec3::X, DVec3::Y, DVec3::Z] {
                for corner in [axis, -axis] {
                    let expected = corner * (1.0 - shift);
                    let nearest = mesh
                        .points()
                        .iter()
                        .map(|p| p.distance(expected))
                        .fold(f64::MAX, f64::min);
                    assert_f64_eq!(0.0, nearest, 1e-12);
                }
            }
            let biased = mesh
                .points()
                .iter()
                .filter(|p| (p.length() - (1.0 - shift)).abs() < 1e-12)
                .count();
            assert_eq!(6, biased);
        }
    }

    #[test]
    fn t_isovalue() {
        let result = MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 3.0), 0.25)
            .with_isovalue(0.5)
            .with_parallel(false)
            .generate(&unit_sphere);
        assert!(result.mesh.is_closed_manifold());
        let exact = 4.0 / 3.0 * PI * 1.5f64.powi(3);
        assert!((result.mesh.signed_volume() - exact).abs() / exact < 0.03);
    }

    #[test]
    fn t_invalid_region_skipped() {
        let field = ValidatedField::new(unit_sphere, |p: DVec3| p.x < 0.3);
        let result = reference().generate(&field);
        assert!(result.is_ok());
        let mesh = &result.mesh;
        assert!(mesh.num_triangles() > 0);
        assert!(mesh.num_triangles() < 536);
        assert!(mesh.boundary_edge_count() > 0);
        assert!(mesh.points().iter().all(|p| p.is_finite() && p.x < 0.3));
    }

    #[test]
    fn t_safety_max_enlarges_cells() {
        let result = MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 2.0), 0.001)
            .with_safety_max(17)
            .with_parallel(false)
            .generate(&unit_sphere);
        assert!(result.is_ok());
        assert_f64_eq!(0.25, result.cell_size, 1e-12);
        assert_eq!(17, result.cells.x);
        assert!(result.mesh.is_closed_manifold());
    }
}
