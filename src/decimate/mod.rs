/*!
Mesh simplification with quadric error metrics.

Every vertex carries the sum of the quadrics of the triangles around it,
which measures the squared distance to those triangles' planes. Edges are
collapsed in the order of the error of their best collapse position, and the
surviving vertex inherits the sum of both quadrics, so the error keeps
measuring the distance to the original surface as the mesh gets coarser.
*/

pub mod constraints;
mod fast;
mod project;
mod quadric;
mod report;

use std::sync::Arc;

use arrayvec::ArrayVec;
use glam::DVec3;
use tracing::{debug, info, trace};

use crate::{
    Cancel,
    collapse::CollapseInfo,
    element::{EH, FH, VH},
    error::Error,
    mesh::TriMesh,
    queue::Queue,
    topol::Topology,
};

pub use constraints::{CollapseConstraints, MeshConstraints, NoConstraints};
pub use project::{FieldProjection, ProjectionTarget};
pub use quadric::{ProbabilisticParams, ProbabilisticQuadric, Quadric, QuadricMetric};
pub use report::{CollapseOutcome, SimplifyReport};

/// When a simplification run stops.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SimplificationTarget {
    TriangleCount(usize),
    VertexCount(usize),
    /// Collapse edges shorter than this length.
    MinEdgeLength(f64),
    /// Collapse edges as long as the quadric error stays below this value.
    MaxError(f64),
}

/// Where the vertex produced by a collapse is placed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CollapseMode {
    /// The minimizer of the combined quadric, or the midpoint of the edge if
    /// the quadric has none.
    #[default]
    MinimalError,
    /// Always the midpoint of the edge. More collapses get rejected for
    /// flipping triangles.
    Midpoint,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimplifyOptions {
    pub collapse_mode: CollapseMode,
    /// Boundary vertices are never merged into interior vertices, and
    /// boundary edges collapse to a point on the edge.
    pub preserve_boundary: bool,
    /// Reject collapses that flip or degenerate a triangle.
    pub check_flips: bool,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        SimplifyOptions {
            collapse_mode: CollapseMode::MinimalError,
            preserve_boundary: false,
            check_flips: true,
        }
    }
}

impl SimplifyOptions {
    pub fn with_collapse_mode(mut self, mode: CollapseMode) -> Self {
        self.collapse_mode = mode;
        self
    }

    pub fn with_preserve_boundary(mut self, flag: bool) -> Self {
        self.preserve_boundary = flag;
        self
    }

    pub fn with_check_flips(mut self, flag: bool) -> Self {
        self.check_flips = flag;
        self
    }
}

/// A triangle whose doubled area shrinks by more than this factor counts as
/// degenerate.
const DEGENERATE_AREA_RATIO: f64 = 1e-12;

/// Planned collapse of an edge.
#[derive(Copy, Clone, Debug)]
struct Candidate {
    keep: VH,
    removed: VH,
    pos: DVec3,
    cost: f64,
    midpoint_fallback: bool,
}

/// Which endpoint survives a collapse, and whether it stays where it is.
#[derive(Copy, Clone, Debug)]
struct Endpoints {
    keep: VH,
    removed: VH,
    fixed: bool,
}

/**
 * Edge collapse simplifier for closed or open manifold triangle meshes.
 *
 * The simplifier works on its own copy of the mesh. Runs can be chained, e.g.
 * a [`fast_collapse_pass`](Simplifier::fast_collapse_pass) to get rid of
 * tiny edges followed by a quadric driven run to a triangle budget. The
 * result is read back with [`to_mesh`](Simplifier::to_mesh).
 *
 * ```
 * use glam::DVec3;
 * use isomesh::{AxisBox, MarchingCubes, Simplifier};
 *
 * let sphere = MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 2.0), 0.25)
 *     .generate(&|p: DVec3| p.length() - 1.0)
 *     .mesh;
 * let mut simplifier = Simplifier::new(&sphere).expect("Cannot simplify mesh");
 * let report = simplifier.simplify_to_triangle_count(100);
 * assert!(report.final_triangles <= 100);
 * assert!(simplifier.to_mesh().is_closed_manifold());
 * ```
 */
pub struct Simplifier<Q: QuadricMetric = Quadric, C: CollapseConstraints = NoConstraints> {
    topol: Topology,
    points: Vec<DVec3>,
    normals: Option<Vec<DVec3>>,
    quadrics: Vec<Q>,
    params: Q::Params,
    constraints: C,
    options: SimplifyOptions,
    cancel: Option<Cancel>,
}

impl Simplifier {
    /// Simplifier with plain quadrics and no constraints.
    pub fn new(mesh: &TriMesh) -> Result<Self, Error> {
        Self::with_metric(mesh, ())
    }
}

impl<Q: QuadricMetric> Simplifier<Q, NoConstraints> {
    pub fn with_metric(mesh: &TriMesh, params: Q::Params) -> Result<Self, Error> {
        let topol = Topology::from_triangles(mesh.num_vertices(), mesh.triangles())?;
        let mut simplifier = Simplifier {
            topol,
            points: mesh.points().to_vec(),
            normals: mesh.normals().map(<[DVec3]>::to_vec),
            quadrics: vec![Q::default(); mesh.num_vertices()],
            params,
            constraints: NoConstraints,
            options: SimplifyOptions::default(),
            cancel: None,
        };
        simplifier.init_quadrics();
        Ok(simplifier)
    }
}

impl<Q: QuadricMetric, C: CollapseConstraints> Simplifier<Q, C> {
    pub fn with_constraints<D: CollapseConstraints>(self, constraints: D) -> Simplifier<Q, D> {
        Simplifier {
            topol: self.topol,
            points: self.points,
            normals: self.normals,
            quadrics: self.quadrics,
            params: self.params,
            constraints,
            options: self.options,
            cancel: self.cancel,
        }
    }

    pub fn with_options(mut self, options: SimplifyOptions) -> Self {
        self.options = options;
        self
    }

    /// Install a predicate that is polled before every collapse. When it
    /// returns true the run stops and its report is flagged as canceled.
    pub fn with_cancel(mut self, cancel: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.cancel = Some(Arc::new(cancel));
        self
    }

    pub fn options(&self) -> &SimplifyOptions {
        &self.options
    }

    pub fn constraints(&self) -> &C {
        &self.constraints
    }

    pub fn topology(&self) -> &Topology {
        &self.topol
    }

    pub fn num_vertices(&self) -> usize {
        self.topol.num_vertices()
    }

    pub fn num_edges(&self) -> usize {
        self.topol.num_edges()
    }

    pub fn num_triangles(&self) -> usize {
        self.topol.num_triangles()
    }

    pub fn point(&self, v: VH) -> DVec3 {
        self.points[v.slot()]
    }

    pub fn quadric(&self, v: VH) -> &Q {
        &self.quadrics[v.slot()]
    }

    fn init_quadrics(&mut self) {
        self.quadrics.fill(Q::default());
        for f in self.topol.triangles() {
            let verts = self.topol.triangle_vertices(f);
            let q = Q::from_triangle(verts.map(|v| self.points[v.slot()]), &self.params);
            for v in verts {
                self.quadrics[v.slot()] += q;
            }
        }
    }

    fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancel| cancel())
    }

    /// Residual error of every live vertex against its own quadric. The
    /// largest of these bounds how far the mesh has drifted from the planes
    /// of the original triangles.
    pub fn max_vertex_error(&self) -> f64 {
        self.topol
            .vertices()
            .map(|v| self.quadrics[v.slot()].evaluate_error(self.points[v.slot()]))
            .fold(0.0, f64::max)
    }

    /// The current mesh with deleted elements compacted away.
    pub fn to_mesh(&self) -> TriMesh {
        let positions = self
            .topol
            .vertices()
            .map(|v| self.points[v.slot()])
            .collect();
        let normals = self.normals.as_ref().map(|normals| {
            self.topol
                .vertices()
                .map(|v| normals[v.slot()])
                .collect()
        });
        TriMesh::from_parts(positions, self.topol.compact_triangles(), normals)
    }

    /// Check the connectivity of the working mesh.
    pub fn check_topology(&self) -> Result<(), Error> {
        self.topol.check_topology()
    }

    pub fn simplify_to_triangle_count(&mut self, count: usize) -> SimplifyReport {
        self.simplify(SimplificationTarget::TriangleCount(count))
    }

    pub fn simplify_to_vertex_count(&mut self, count: usize) -> SimplifyReport {
        self.simplify(SimplificationTarget::VertexCount(count))
    }

    pub fn simplify_to_edge_length(&mut self, length: f64) -> SimplifyReport {
        self.simplify(SimplificationTarget::MinEdgeLength(length))
    }

    pub fn simplify_to_max_error(&mut self, error: f64) -> SimplifyReport {
        self.simplify(SimplificationTarget::MaxError(error))
    }

    fn reached(&self, target: SimplificationTarget) -> bool {
        match target {
            SimplificationTarget::TriangleCount(n) => self.num_triangles() <= n,
            SimplificationTarget::VertexCount(n) => self.num_vertices() <= n,
            SimplificationTarget::MinEdgeLength(_) | SimplificationTarget::MaxError(_) => false,
        }
    }

    /// Collapse edges in the order of increasing error until `target` is
    /// reached, or no edge can be collapsed any more.
    ///
    /// A collapse removes two triangles, or one on the boundary, so the final
    /// triangle count can be one below the requested count.
    pub fn simplify(&mut self, target: SimplificationTarget) -> SimplifyReport {
        let mut report = SimplifyReport::new(self.num_vertices(), self.num_triangles());
        info!(
            vertices = self.num_vertices(),
            triangles = self.num_triangles(),
            target = ?target,
            "Starting simplification"
        );
        let mut queue = Queue::<EH, f64>::new(self.topol.edge_capacity());
        for e in self.topol.edges() {
            queue.insert(e, self.score(e));
        }
        while !self.reached(target) {
            if self.is_canceled() {
                report.canceled = true;
                break;
            }
            let Some((e, cost)) = queue.pop() else {
                break;
            };
            if let SimplificationTarget::MaxError(max) = target {
                if cost > max {
                    break;
                }
            }
            let outcome = self.try_collapse(e, target, &mut queue, &mut report);
            if outcome != CollapseOutcome::Collapsed {
                trace!(edge = %e, outcome = ?outcome, "Collapse rejected");
            }
            report.record(outcome);
        }
        self.finish(&mut report);
        info!(
            final_triangles = report.final_triangles,
            collapses = report.collapsed,
            rejected = report.rejected(),
            midpoint_fallbacks = report.midpoint_fallbacks,
            canceled = report.canceled,
            "Simplification complete"
        );
        report
    }

    fn finish(&self, report: &mut SimplifyReport) {
        report.final_vertices = self.num_vertices();
        report.final_triangles = self.num_triangles();
        report.max_error = self.max_vertex_error();
    }

    fn try_collapse(
        &mut self,
        e: EH,
        target: SimplificationTarget,
        queue: &mut Queue<EH, f64>,
        report: &mut SimplifyReport,
    ) -> CollapseOutcome {
        if self.topol.is_deleted_edge(e) {
            return CollapseOutcome::NotAnEdge;
        }
        let [a, b] = self.topol.edge_vertices(e);
        if self.constraints.is_edge_fully_constrained(a, b) {
            return CollapseOutcome::EdgeFullyConstrained;
        }
        if let SimplificationTarget::MinEdgeLength(len) = target {
            if self.edge_length(e) >= len {
                return CollapseOutcome::EdgeTooLong;
            }
        }
        if !self.topol.check_edge_collapse(e) {
            return CollapseOutcome::CannotCollapse;
        }
        let cand = match self.plan(e) {
            Ok(cand) => cand,
            Err(outcome) => return outcome,
        };
        if self
            .constraints
            .violates_collapse(cand.keep, cand.removed, cand.pos)
        {
            return CollapseOutcome::Constrained;
        }
        if self.options.check_flips && self.creates_flip(e, cand.pos) {
            return CollapseOutcome::CreatesFlip;
        }
        let info = match self.topol.collapse_edge(e, cand.keep) {
            Ok(info) => info,
            Err(err) => {
                debug!(edge = %e, error = %err, "Edge collapse failed");
                return CollapseOutcome::OpNotSuccessful;
            }
        };
        if cand.midpoint_fallback {
            report.midpoint_fallbacks += 1;
        }
        self.apply_collapse(&info, cand.pos);
        for &x in &info.removed_edges {
            queue.remove(x);
        }
        for &x in self.topol.vertex_edges(info.kept) {
            queue.insert(x, self.score(x));
        }
        CollapseOutcome::Collapsed
    }

    fn edge_length(&self, e: EH) -> f64 {
        let [a, b] = self.topol.edge_vertices(e);
        self.points[a.slot()].distance(self.points[b.slot()])
    }

    /// Cost of the best collapse of `e`. Edges that cannot be collapsed go to
    /// the back of the queue.
    fn score(&self, e: EH) -> f64 {
        match self.plan(e) {
            Ok(cand) if !cand.cost.is_nan() => cand.cost,
            _ => f64::INFINITY,
        }
    }

    /// Decide which endpoint of `e` survives.
    fn choose_endpoints(&self, e: EH) -> Result<Endpoints, CollapseOutcome> {
        let [a, b] = self.topol.edge_vertices(e);
        let (ba, bb) = if self.options.preserve_boundary {
            (self.topol.is_boundary_vertex(a), self.topol.is_boundary_vertex(b))
        } else {
            (false, false)
        };
        // A boundary vertex may only disappear into another boundary vertex.
        let removable = |v: VH, on_boundary: bool, other_on_boundary: bool| {
            self.constraints.can_remove_vertex(v) && (!on_boundary || other_on_boundary)
        };
        let (keep, removed, keep_boundary, removed_boundary) = if removable(b, bb, ba) {
            (a, b, ba, bb)
        } else if removable(a, ba, bb) {
            (b, a, bb, ba)
        } else {
            return Err(CollapseOutcome::Constrained);
        };
        let fixed = !self.constraints.can_move_vertex(keep) || (keep_boundary && !removed_boundary);
        Ok(Endpoints {
            keep,
            removed,
            fixed,
        })
    }

    fn plan(&self, e: EH) -> Result<Candidate, CollapseOutcome> {
        let ends = self.choose_endpoints(e)?;
        let (pk, pr) = (self.points[ends.keep.slot()], self.points[ends.removed.slot()]);
        let q = self.quadrics[ends.keep.slot()].combine(&self.quadrics[ends.removed.slot()]);
        let mid = 0.5 * (pk + pr);
        let mut midpoint_fallback = false;
        let pos = if ends.fixed {
            pk
        } else if self.options.preserve_boundary
            && self.topol.is_boundary_vertex(ends.keep)
            && self.topol.is_boundary_vertex(ends.removed)
        {
            segment_optimum(&q, pk, pr)
        } else {
            match self.options.collapse_mode {
                CollapseMode::Midpoint => mid,
                CollapseMode::MinimalError => q.solve_optimal_point().unwrap_or_else(|| {
                    midpoint_fallback = true;
                    mid
                }),
            }
        };
        Ok(Candidate {
            keep: ends.keep,
            removed: ends.removed,
            pos,
            cost: q.evaluate_error(pos).max(0.0),
            midpoint_fallback,
        })
    }

    /// Whether moving both endpoints of `e` to `pos` flips or degenerates any
    /// of the triangles that survive the collapse.
    fn creates_flip(&self, e: EH, pos: DVec3) -> bool {
        let [a, b] = self.topol.edge_vertices(e);
        let removed: ArrayVec<FH, 2> = self.topol.edge_triangles(e).collect();
        for v in [a, b] {
            for f in self.topol.vertex_triangles(v) {
                if removed.contains(&f) {
                    continue;
                }
                let verts = self.topol.triangle_vertices(f);
                let before = triangle_normal(verts.map(|x| self.points[x.slot()]));
                let after = triangle_normal(verts.map(|x| {
                    if x == a || x == b {
                        pos
                    } else {
                        self.points[x.slot()]
                    }
                }));
                if after.length_squared() <= DEGENERATE_AREA_RATIO * before.length_squared()
                    || before.dot(after) <= 0.0
                {
                    return true;
                }
            }
        }
        false
    }

    /// Update the geometry after the topology collapsed an edge.
    fn apply_collapse(&mut self, info: &CollapseInfo, pos: DVec3) {
        let (k, r) = (info.kept.slot(), info.removed_vertex.slot());
        if let Some(normals) = self.normals.as_mut() {
            let (pk, pr) = (self.points[k], self.points[r]);
            let len2 = pk.distance_squared(pr);
            let t = if len2 > 0.0 {
                ((pos - pk).dot(pr - pk) / len2).clamp(0.0, 1.0)
            } else {
                0.5
            };
            let nk = normals[k];
            normals[k] = nk.lerp(normals[r], t).try_normalize().unwrap_or(nk);
        }
        self.points[k] = pos;
        let merged = self.quadrics[k].combine(&self.quadrics[r]);
        self.quadrics[k] = merged;
    }
}

fn triangle_normal([a, b, c]: [DVec3; 3]) -> DVec3 {
    (b - a).cross(c - a)
}

/// The point on the segment from `p0` to `p1` with the smallest error, found
/// by fitting a parabola through the errors at the ends and the middle.
fn segment_optimum<Q: QuadricMetric>(q: &Q, p0: DVec3, p1: DVec3) -> DVec3 {
    let e0 = q.evaluate_error(p0);
    let e1 = q.evaluate_error(p1);
    let em = q.evaluate_error(0.5 * (p0 + p1));
    let a = 2.0 * (e0 + e1) - 4.0 * em;
    let b = e1 - e0 - a;
    let (mut best_t, mut best_err) = if e0 <= e1 { (0.0, e0) } else { (1.0, e1) };
    if a > 0.0 {
        let t = (-b / (2.0 * a)).clamp(0.0, 1.0);
        let err = q.evaluate_error(p0.lerp(p1, t));
        if err < best_err {
            (best_t, best_err) = (t, err);
        }
    }
    trace!(t = best_t, error = best_err, "Boundary collapse position");
    p0.lerp(p1, best_t)
}

#[cfg(test)]
mod test {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use glam::DVec3;

    use crate::{
        element::VH,
        grid::AxisBox,
        macros::{assert_f64_eq, assert_point_eq},
        mesh::TriMesh,
        polygonize::MarchingCubes,
    };

    use super::{
        CollapseMode, MeshConstraints, ProbabilisticParams, ProbabilisticQuadric, Quadric,
        QuadricMetric, SimplificationTarget, Simplifier, SimplifyOptions, segment_optimum,
    };

    fn unit_sphere(p: DVec3) -> f64 {
        p.length() - 1.0
    }

    pub(super) fn sphere_mesh() -> TriMesh {
        let result = MarchingCubes::new(AxisBox::cube(DVec3::ZERO, 2.0), 0.25)
            .with_parallel(false)
            .generate(&unit_sphere);
        assert!(result.is_ok());
        result.mesh
    }

    fn plane() -> TriMesh {
        TriMesh::plane_grid(DVec3::ZERO, DVec3::new(5.0, 5.0, 0.0), 5, 5)
            .expect("Cannot create plane grid")
    }

    #[test]
    fn t_sphere_to_100() {
        let sphere = sphere_mesh();
        assert_eq!(536, sphere.num_triangles());
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let report = simplifier.simplify_to_triangle_count(100);
        assert!((99..=100).contains(&report.final_triangles), "{report}");
        assert_eq!(report.final_triangles, simplifier.num_triangles());
        assert_eq!((536 - 100) / 2, report.collapsed);
        assert!(!report.canceled);
        assert!(report.max_error < 0.01, "{}", report.max_error);
        simplifier
            .check_topology()
            .expect("Topological errors after simplification");
        let mesh = simplifier.to_mesh();
        assert_eq!(report.final_vertices, mesh.num_vertices());
        assert!(mesh.is_closed_manifold());
        assert!(mesh.signed_volume() > 3.0);
        for &p in mesh.points() {
            assert!((p.length() - 1.0).abs() < 0.1);
        }
    }

    #[test]
    fn t_counts_never_increase() {
        let sphere = sphere_mesh();
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let mut prev = simplifier.num_triangles();
        for target in [500, 400, 301, 200, 150] {
            let report = simplifier.simplify_to_triangle_count(target);
            assert!(report.final_triangles <= prev);
            assert!(report.final_triangles <= target && report.final_triangles + 1 >= target);
            prev = report.final_triangles;
        }
        // Asking for more triangles than there are does nothing.
        let report = simplifier.simplify_to_triangle_count(1000);
        assert_eq!(0, report.collapsed);
        assert_eq!(prev, report.final_triangles);
    }

    #[test]
    fn t_planar_to_two() {
        let plane = plane();
        assert_eq!(50, plane.num_triangles());
        let mut simplifier = Simplifier::new(&plane).expect("Cannot create simplifier");
        let report = simplifier.simplify_to_triangle_count(2);
        assert_eq!(2, report.final_triangles, "{report}");
        assert_eq!(2, simplifier.num_triangles());
        assert!(report.collapsed > 0);
        assert!(report.midpoint_fallbacks > 0);
        simplifier
            .check_topology()
            .expect("Topological errors after simplification");
        // Everything stays in the plane.
        let mesh = simplifier.to_mesh();
        assert!(mesh.points().iter().all(|p| p.z.abs() < 1e-12));
        assert!(report.max_error < 1e-12);
    }

    #[test]
    fn t_vertex_count() {
        let sphere = sphere_mesh();
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let report = simplifier.simplify_to_vertex_count(60);
        assert_eq!(60, report.final_vertices);
        // Euler characteristic of a sphere.
        assert_eq!(2 * 60 - 4, report.final_triangles);
        assert!(simplifier.to_mesh().is_closed_manifold());
    }

    #[test]
    fn t_edge_length() {
        let sphere = sphere_mesh();
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let report = simplifier.simplify_to_edge_length(0.3);
        assert!(report.collapsed > 0);
        assert!(report.too_long > 0);
        assert!(report.final_triangles < 536);
        assert!(simplifier.to_mesh().is_closed_manifold());
    }

    #[test]
    fn t_max_error() {
        let sphere = sphere_mesh();
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let report = simplifier.simplify_to_max_error(1e-4);
        assert!(report.collapsed > 0);
        assert!(report.final_triangles < 536);
        assert!(report.max_error <= 1e-4 + 1e-12, "{}", report.max_error);
        let mut coarser = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let coarse = coarser.simplify(SimplificationTarget::MaxError(1e-2));
        assert!(coarse.final_triangles < report.final_triangles);
    }

    #[test]
    fn t_midpoint_mode() {
        let sphere = sphere_mesh();
        let mut simplifier = Simplifier::new(&sphere)
            .expect("Cannot create simplifier")
            .with_options(SimplifyOptions::default().with_collapse_mode(CollapseMode::Midpoint));
        let report = simplifier.simplify_to_triangle_count(300);
        assert!(report.final_triangles <= 300);
        assert_eq!(0, report.midpoint_fallbacks);
        assert!(simplifier.to_mesh().is_closed_manifold());
    }

    #[test]
    fn t_constraints() {
        let sphere = sphere_mesh();
        let pinned = VH::from(0u32);
        let (a, b) = (sphere.triangle(5u32.into())[0], sphere.triangle(5u32.into())[1]);
        let before = sphere.point(pinned);
        let mut simplifier = Simplifier::new(&sphere)
            .expect("Cannot create simplifier")
            .with_constraints(
                MeshConstraints::new()
                    .with_pinned([pinned])
                    .with_edges([(a, b)]),
            );
        let report = simplifier.simplify_to_triangle_count(100);
        assert!(report.final_triangles <= 102, "{report}");
        assert!(!simplifier.topology().is_deleted_vertex(pinned));
        assert_point_eq!(before, simplifier.point(pinned), 0.0);
        assert!(simplifier.topology().find_edge(a, b).is_some());
        simplifier
            .check_topology()
            .expect("Topological errors after simplification");
    }

    #[test]
    fn t_cancel() {
        let sphere = sphere_mesh();
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut simplifier = Simplifier::new(&sphere)
            .expect("Cannot create simplifier")
            .with_cancel(move || counter.fetch_add(1, Ordering::Relaxed) >= 10);
        let report = simplifier.simplify_to_triangle_count(100);
        assert!(report.canceled);
        assert!(report.collapsed + report.rejected() == 10);
        assert!(report.final_triangles > 100);
        assert_eq!(11, polls.load(Ordering::Relaxed));
    }

    #[test]
    fn t_probabilistic_metric() {
        let sphere = sphere_mesh();
        let mut simplifier =
            Simplifier::<ProbabilisticQuadric>::with_metric(&sphere, ProbabilisticParams::default())
                .expect("Cannot create simplifier");
        let report = simplifier.simplify_to_triangle_count(100);
        assert!((99..=100).contains(&report.final_triangles), "{report}");
        assert!(simplifier.to_mesh().is_closed_manifold());
        // Flat regions have a well defined optimum.
        let mut flat = Simplifier::<ProbabilisticQuadric>::with_metric(
            &plane(),
            ProbabilisticParams::default(),
        )
        .expect("Cannot create simplifier");
        let report = flat.simplify_to_triangle_count(10);
        assert!(report.collapsed > 0);
        assert_eq!(0, report.midpoint_fallbacks);
    }

    #[test]
    fn t_normals_follow_collapses() {
        let sphere = sphere_mesh();
        let normals: Vec<DVec3> = sphere.points().iter().map(|p| p.normalize()).collect();
        let sphere = sphere.with_normals(normals).expect("Cannot attach normals");
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        simplifier.simplify_to_triangle_count(200);
        let mesh = simplifier.to_mesh();
        let normals = mesh.normals().expect("Normals must be carried over");
        assert_eq!(mesh.num_vertices(), normals.len());
        for (p, n) in mesh.points().iter().zip(normals) {
            assert_f64_eq!(1.0, n.length(), 1e-12);
            assert!(n.dot(p.normalize()) > 0.9);
        }
    }

    #[test]
    fn t_preserve_boundary() {
        let plane = plane();
        let mut simplifier = Simplifier::new(&plane)
            .expect("Cannot create simplifier")
            .with_options(SimplifyOptions::default().with_preserve_boundary(true));
        let report = simplifier.simplify_to_triangle_count(10);
        assert!(report.collapsed > 0);
        let topol = simplifier.topology();
        let on_outline = |p: DVec3| {
            p.x.abs() < 1e-12
                || (p.x - 5.0).abs() < 1e-12
                || p.y.abs() < 1e-12
                || (p.y - 5.0).abs() < 1e-12
        };
        for v in topol.vertices().filter(|&v| topol.is_boundary_vertex(v)) {
            assert!(on_outline(simplifier.point(v)), "{}", simplifier.point(v));
        }
    }

    #[test]
    fn t_segment_optimum() {
        let q = Quadric::plane(DVec3::new(0.3, 0.0, 0.0), DVec3::X, 1.0);
        let p = segment_optimum(&q, DVec3::ZERO, DVec3::X);
        assert_point_eq!(DVec3::new(0.3, 0.0, 0.0), p, 1e-12);
        // Minimum beyond the end of the segment.
        let q = Quadric::plane(DVec3::new(3.0, 0.0, 0.0), DVec3::X, 1.0);
        let p = segment_optimum(&q, DVec3::ZERO, DVec3::X);
        assert_point_eq!(DVec3::X, p, 1e-12);
        assert_f64_eq!(4.0, q.evaluate_error(p), 1e-12);
    }
}
