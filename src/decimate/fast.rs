use tracing::{debug, info};

use crate::element::EH;

use super::{CollapseConstraints, CollapseOutcome, QuadricMetric, Simplifier, SimplifyReport};

/// Primes used as the step between visited edges. The first one that does
/// not divide the number of edges is used, so every edge is visited once per
/// round.
const STRIDES: [usize; 3] = [31337, 7919, 104729];

fn edge_stride(num_edges: usize) -> usize {
    STRIDES
        .into_iter()
        .find(|&p| num_edges % p != 0)
        .unwrap_or(1)
}

impl<Q: QuadricMetric, C: CollapseConstraints> Simplifier<Q, C> {
    /// Collapse every edge shorter than `min_edge_length` to its midpoint,
    /// without ranking them by error.
    ///
    /// Edges are visited in a scattered order, stepping through the edge ids
    /// with a large prime stride, so regular grids do not collapse in sweeps.
    /// The pass repeats for at most `rounds` rounds and stops early once a
    /// round collapses nothing. Quadrics are still merged, so a quadric run
    /// afterwards measures the error against the original mesh.
    pub fn fast_collapse_pass(&mut self, min_edge_length: f64, rounds: usize) -> SimplifyReport {
        let mut report = SimplifyReport::new(self.num_vertices(), self.num_triangles());
        info!(
            triangles = self.num_triangles(),
            min_edge_length,
            rounds,
            "Starting fast collapse pass"
        );
        let min_len2 = min_edge_length * min_edge_length;
        'rounds: for round in 0..rounds {
            let num_slots = self.topol.edge_capacity();
            if num_slots == 0 {
                break;
            }
            report.rounds += 1;
            let stride = edge_stride(num_slots);
            let mut idx = 0usize;
            let mut collapsed = 0usize;
            for _ in 0..num_slots {
                idx = (idx + stride) % num_slots;
                let e = EH::from(idx as u32);
                if self.topol.is_deleted_edge(e) {
                    continue;
                }
                if self.is_canceled() {
                    report.canceled = true;
                    break 'rounds;
                }
                let outcome = self.fast_collapse(e, min_len2);
                if outcome == CollapseOutcome::Collapsed {
                    collapsed += 1;
                }
                report.record(outcome);
            }
            debug!(round, collapsed, "Fast collapse round");
            if collapsed == 0 {
                break;
            }
        }
        self.finish(&mut report);
        info!(
            final_triangles = report.final_triangles,
            collapses = report.collapsed,
            rounds = report.rounds,
            canceled = report.canceled,
            "Fast collapse pass complete"
        );
        report
    }

    fn fast_collapse(&mut self, e: EH, min_len2: f64) -> CollapseOutcome {
        let [a, b] = self.topol.edge_vertices(e);
        if self.constraints.is_edge_fully_constrained(a, b) {
            return CollapseOutcome::EdgeFullyConstrained;
        }
        if self.points[a.slot()].distance_squared(self.points[b.slot()]) >= min_len2 {
            return CollapseOutcome::EdgeTooLong;
        }
        if !self.topol.check_edge_collapse(e) {
            return CollapseOutcome::CannotCollapse;
        }
        let ends = match self.choose_endpoints(e) {
            Ok(ends) => ends,
            Err(outcome) => return outcome,
        };
        let (pk, pr) = (self.points[ends.keep.slot()], self.points[ends.removed.slot()]);
        let pos = if ends.fixed { pk } else { 0.5 * (pk + pr) };
        if self.constraints.violates_collapse(ends.keep, ends.removed, pos) {
            return CollapseOutcome::Constrained;
        }
        if self.options.check_flips && self.creates_flip(e, pos) {
            return CollapseOutcome::CreatesFlip;
        }
        match self.topol.collapse_edge(e, ends.keep) {
            Ok(info) => {
                self.apply_collapse(&info, pos);
                CollapseOutcome::Collapsed
            }
            Err(err) => {
                debug!(edge = %e, error = %err, "Edge collapse failed");
                CollapseOutcome::OpNotSuccessful
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{decimate::Simplifier, mesh::TriMesh};

    use super::edge_stride;

    #[test]
    fn t_edge_stride() {
        assert_eq!(31337, edge_stride(100));
        assert_eq!(7919, edge_stride(31337 * 3));
        assert_eq!(104729, edge_stride(31337 * 7919));
    }

    #[test]
    fn t_huge_threshold_stops() {
        let sphere = super::super::test::sphere_mesh();
        let diagonal = sphere
            .bounding_box()
            .expect("Sphere is not empty")
            .diagonal();
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let report = simplifier.fast_collapse_pass(10.0 * diagonal, 5);
        assert!(report.rounds <= 5);
        assert!(report.collapsed > 0);
        assert!(report.final_triangles < report.initial_triangles);
        simplifier
            .check_topology()
            .expect("Topological errors after fast pass");
        assert!(simplifier.to_mesh().is_closed_manifold());
    }

    #[test]
    fn t_tiny_threshold_is_noop() {
        let ico = TriMesh::icosahedron(1.0).expect("Cannot create icosahedron");
        let mut simplifier = Simplifier::new(&ico).expect("Cannot create simplifier");
        let report = simplifier.fast_collapse_pass(1e-6, 10);
        assert_eq!(1, report.rounds);
        assert_eq!(0, report.collapsed);
        assert_eq!(30, report.too_long);
        assert_eq!(20, simplifier.num_triangles());
    }

    #[test]
    fn t_fast_pass_then_quadrics() {
        let sphere = super::super::test::sphere_mesh();
        let mut simplifier = Simplifier::new(&sphere).expect("Cannot create simplifier");
        let fast = simplifier.fast_collapse_pass(0.1, 3);
        assert!(fast.collapsed > 0);
        let report = simplifier.simplify_to_triangle_count(100);
        assert!(report.final_triangles <= 100, "{report}");
        assert!(simplifier.to_mesh().is_closed_manifold());
    }
}
