use glam::DVec3;
use tracing::debug;

use crate::field::{ScalarField, gradient};

use super::{CollapseConstraints, QuadricMetric, Simplifier};

/// Moves points onto a target surface.
pub trait ProjectionTarget {
    fn project(&self, p: DVec3) -> DVec3;
}

impl<F> ProjectionTarget for F
where
    F: Fn(DVec3) -> DVec3,
{
    fn project(&self, p: DVec3) -> DVec3 {
        self(p)
    }
}

/// Projects points onto an isosurface of a scalar field with Newton steps
/// along the field gradient.
pub struct FieldProjection<'a, S: ScalarField + ?Sized> {
    field: &'a S,
    isovalue: f64,
    steps: usize,
    gradient_step: f64,
    tolerance: f64,
}

impl<'a, S: ScalarField + ?Sized> FieldProjection<'a, S> {
    pub fn new(field: &'a S) -> Self {
        FieldProjection {
            field,
            isovalue: 0.0,
            steps: 8,
            gradient_step: 1e-6,
            tolerance: 1e-10,
        }
    }

    pub fn with_isovalue(mut self, isovalue: f64) -> Self {
        self.isovalue = isovalue;
        self
    }

    /// Maximum number of Newton steps per point.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Step used for the central difference gradient.
    pub fn with_gradient_step(mut self, step: f64) -> Self {
        self.gradient_step = step;
        self
    }

    /// Stop once the field is this close to the isovalue.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl<S: ScalarField + ?Sized> ProjectionTarget for FieldProjection<'_, S> {
    fn project(&self, p: DVec3) -> DVec3 {
        let mut x = p;
        for _ in 0..self.steps {
            let residual = self.field.value(x) - self.isovalue;
            if !residual.is_finite() {
                return p;
            }
            if residual.abs() <= self.tolerance {
                break;
            }
            let grad = gradient(self.field, x, self.gradient_step);
            let len2 = grad.length_squared();
            if len2 <= 0.0 || !len2.is_finite() {
                break;
            }
            x -= grad * (residual / len2);
        }
        if x.is_finite() { x } else { p }
    }
}

impl<Q: QuadricMetric, C: CollapseConstraints> Simplifier<Q, C> {
    /// Move every live vertex to its projection onto `target`. Connectivity
    /// and quadrics are left untouched.
    pub fn project_to(&mut self, target: &impl ProjectionTarget) {
        let mut moved = 0usize;
        for v in self.topol.vertices() {
            let p = &mut self.points[v.slot()];
            let q = target.project(*p);
            if q != *p {
                moved += 1;
            }
            *p = q;
        }
        debug!(moved, "Projected vertices");
    }
}
