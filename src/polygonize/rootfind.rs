use glam::DVec3;

use crate::field::ScalarField;

/// Fraction of the edge length by which a vertex is moved away from a corner
/// that lies on the surface.
pub const DEFAULT_DEGENERATE_BIAS: f64 = 0.01;

/// Values closer than this to the isovalue count as lying on the surface.
pub const ISO_EPSILON: f64 = 1e-8;

/// How the crossing point along a grid edge is located.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RootMode {
    /// Linear interpolation between the corner values.
    #[default]
    SingleLerp,
    /// Repeated linear interpolation, re-evaluating the field at each estimate
    /// and keeping the sub-interval that still brackets the crossing.
    LerpSteps,
    /// Halve the bracketing interval each step, then interpolate linearly in
    /// the final interval.
    Bisection,
}

pub(crate) struct RootFinder<'a, S: ScalarField + ?Sized> {
    pub field: &'a S,
    pub isovalue: f64,
    pub mode: RootMode,
    pub steps: u32,
    pub bias: f64,
}

impl<S: ScalarField + ?Sized> RootFinder<'_, S> {
    /// Find the crossing between `p0` and `p1`, with field values `f0` and
    /// `f1` on either side of the isovalue.
    pub fn find(&self, p0: DVec3, f0: f64, p1: DVec3, f1: f64) -> DVec3 {
        let iso = self.isovalue;
        // A corner on the surface would produce a vertex shared by several
        // edges. Move it slightly toward the other corner.
        if (f0 - iso).abs() < ISO_EPSILON {
            return p0.lerp(p1, self.bias);
        }
        if (f1 - iso).abs() < ISO_EPSILON {
            return p1.lerp(p0, self.bias);
        }
        if (f1 - f0).abs() < ISO_EPSILON {
            return p0.lerp(p1, self.bias);
        }
        let (mut a, mut fa, mut b, mut fb) = (p0, f0, p1, f1);
        let steps = match self.mode {
            RootMode::SingleLerp => 0,
            RootMode::LerpSteps | RootMode::Bisection => self.steps,
        };
        for _ in 0..steps {
            let p = match self.mode {
                RootMode::Bisection => 0.5 * (a + b),
                _ => interpolate(a, fa, b, fb, iso),
            };
            let fp = self.field.value(p);
            if !fp.is_finite() {
                break;
            }
            if (fp - iso).abs() < ISO_EPSILON {
                return p;
            }
            if (fa < iso) == (fp < iso) {
                (a, fa) = (p, fp);
            } else {
                (b, fb) = (p, fp);
            }
        }
        interpolate(a, fa, b, fb, iso)
    }
}

fn interpolate(a: DVec3, fa: f64, b: DVec3, fb: f64, iso: f64) -> DVec3 {
    let denom = fb - fa;
    if denom.abs() < ISO_EPSILON {
        return 0.5 * (a + b);
    }
    a.lerp(b, ((iso - fa) / denom).clamp(0.0, 1.0))
}
