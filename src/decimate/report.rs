use std::fmt;

/// What happened to an edge taken off the queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollapseOutcome {
    Collapsed,
    /// The collapse would change the topology of the mesh.
    CannotCollapse,
    EdgeFullyConstrained,
    /// Longer than the target edge length.
    EdgeTooLong,
    /// Neither endpoint may be removed, or the constraints reject the planned
    /// position.
    Constrained,
    /// A triangle around the collapsed edge would flip or degenerate.
    CreatesFlip,
    /// The topology refused a collapse that passed every check.
    OpNotSuccessful,
    /// The edge no longer exists.
    NotAnEdge,
}

/// Statistics of one simplification run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimplifyReport {
    pub initial_vertices: usize,
    pub initial_triangles: usize,
    pub final_vertices: usize,
    pub final_triangles: usize,
    pub collapsed: usize,
    pub cannot_collapse: usize,
    pub fully_constrained: usize,
    pub too_long: usize,
    pub constrained: usize,
    pub creates_flip: usize,
    pub op_failed: usize,
    pub not_an_edge: usize,
    /// Collapses placed at the edge midpoint because the quadric had no
    /// usable minimizer.
    pub midpoint_fallbacks: usize,
    /// Rounds swept by a fast collapse pass.
    pub rounds: usize,
    /// Largest residual quadric error over the vertices at the end of the run.
    pub max_error: f64,
    pub canceled: bool,
}

impl SimplifyReport {
    pub(crate) fn new(vertices: usize, triangles: usize) -> Self {
        SimplifyReport {
            initial_vertices: vertices,
            initial_triangles: triangles,
            final_vertices: vertices,
            final_triangles: triangles,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: CollapseOutcome) {
        *self.counter(outcome) += 1;
    }

    fn counter(&mut self, outcome: CollapseOutcome) -> &mut usize {
        match outcome {
            CollapseOutcome::Collapsed => &mut self.collapsed,
            CollapseOutcome::CannotCollapse => &mut self.cannot_collapse,
            CollapseOutcome::EdgeFullyConstrained => &mut self.fully_constrained,
            CollapseOutcome::EdgeTooLong => &mut self.too_long,
            CollapseOutcome::Constrained => &mut self.constrained,
            CollapseOutcome::CreatesFlip => &mut self.creates_flip,
            CollapseOutcome::OpNotSuccessful => &mut self.op_failed,
            CollapseOutcome::NotAnEdge => &mut self.not_an_edge,
        }
    }

    /// How many edges ended with `outcome`.
    pub fn count(&self, outcome: CollapseOutcome) -> usize {
        match outcome {
            CollapseOutcome::Collapsed => self.collapsed,
            CollapseOutcome::CannotCollapse => self.cannot_collapse,
            CollapseOutcome::EdgeFullyConstrained => self.fully_constrained,
            CollapseOutcome::EdgeTooLong => self.too_long,
            CollapseOutcome::Constrained => self.constrained,
            CollapseOutcome::CreatesFlip => self.creates_flip,
            CollapseOutcome::OpNotSuccessful => self.op_failed,
            CollapseOutcome::NotAnEdge => self.not_an_edge,
        }
    }

    /// Edges taken off the queue without being collapsed.
    pub fn rejected(&self) -> usize {
        self.cannot_collapse
            + self.fully_constrained
            + self.too_long
            + self.constrained
            + self.creates_flip
            + self.op_failed
            + self.not_an_edge
    }

    /// Final triangle count over the initial one.
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.initial_triangles as f64
        }
    }

    pub fn reduction_percent(&self) -> f64 {
        (1.0 - self.reduction_ratio()) * 100.0
    }
}

impl fmt::Display for SimplifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Simplification: {} → {} triangles ({:.1}% reduction, {} collapses, {} rejected)",
            self.initial_triangles,
            self.final_triangles,
            self.reduction_percent(),
            self.collapsed,
            self.rejected()
        )?;
        if self.canceled {
            write!(f, " [canceled]")?;
        }
        Ok(())
    }
}
