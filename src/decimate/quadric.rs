use std::ops::{Add, AddAssign};

use glam::DVec3;

/// Error metric attached to every vertex during simplification. Metrics of
/// merged vertices are combined by addition.
pub trait QuadricMetric: Copy + Default + Add<Output = Self> + AddAssign {
    type Params: Default + Clone;

    /// The metric of a single triangle, weighted by its area.
    fn from_triangle(points: [DVec3; 3], params: &Self::Params) -> Self;

    fn combine(&self, other: &Self) -> Self {
        *self + *other
    }

    fn evaluate_error(&self, p: DVec3) -> f64;

    /// The point with the smallest error, or `None` if the metric is too
    /// close to singular to have a unique minimizer.
    fn solve_optimal_point(&self) -> Option<DVec3>;
}

/// Relative threshold for the pivots of the LDLᵀ factorization.
const PIVOT_TOLERANCE: f64 = 1e-8;

/// Symmetric 3x3 matrix `A`, vector `b` and constant `c` of the quadratic
/// form `xᵀAx - 2bᵀx + c`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Quadric {
    a00: f64,
    a01: f64,
    a02: f64,
    a11: f64,
    a12: f64,
    a22: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    c: f64,
}

impl Quadric {
    /// Squared distance to the plane through `pos` with unit `normal`, scaled
    /// by `weight`.
    pub fn plane(pos: DVec3, normal: DVec3, weight: f64) -> Self {
        let d = normal.dot(pos);
        let n = normal * weight;
        Self {
            a00: n.x * normal.x,
            a01: n.x * normal.y,
            a02: n.x * normal.z,
            a11: n.y * normal.y,
            a12: n.y * normal.z,
            a22: n.z * normal.z,
            b0: n.x * d,
            b1: n.y * d,
            b2: n.z * d,
            c: weight * d * d,
        }
    }

    fn mul_a(&self, p: DVec3) -> DVec3 {
        DVec3::new(
            self.a00 * p.x + self.a01 * p.y + self.a02 * p.z,
            self.a01 * p.x + self.a11 * p.y + self.a12 * p.z,
            self.a02 * p.x + self.a12 * p.y + self.a22 * p.z,
        )
    }

    fn b(&self) -> DVec3 {
        DVec3::new(self.b0, self.b1, self.b2)
    }

    /// Solve `Ax = b` with an LDLᵀ factorization.
    fn minimizer(&self) -> Option<DVec3> {
        let trace = self.a00 + self.a11 + self.a22;
        if trace.is_nan() || trace <= 0.0 {
            return None;
        }
        let tol = PIVOT_TOLERANCE * trace;
        let d0 = self.a00;
        if d0 <= tol {
            return None;
        }
        let l10 = self.a01 / d0;
        let l20 = self.a02 / d0;
        let d1 = self.a11 - l10 * self.a01;
        if d1 <= tol {
            return None;
        }
        let l21 = (self.a12 - l20 * self.a01) / d1;
        let d2 = self.a22 - l20 * self.a02 - l21 * l21 * d1;
        if d2 <= tol {
            return None;
        }
        // Forward substitution, scaling, back substitution.
        let y0 = self.b0;
        let y1 = self.b1 - l10 * y0;
        let y2 = self.b2 - l20 * y0 - l21 * y1;
        let x2 = y2 / d2;
        let x1 = y1 / d1 - l21 * x2;
        let x0 = y0 / d0 - l10 * x1 - l20 * x2;
        let x = DVec3::new(x0, x1, x2);
        x.is_finite().then_some(x)
    }
}

impl QuadricMetric for Quadric {
    type Params = ();

    fn from_triangle(points: [DVec3; 3], _params: &()) -> Self {
        let [a, b, c] = points;
        let cross = (b - a).cross(c - a);
        let len = cross.length();
        if len == 0.0 {
            return Self::default();
        }
        Self::plane(a, cross / len, 0.5 * len)
    }

    fn evaluate_error(&self, p: DVec3) -> f64 {
        p.dot(self.mul_a(p)) - 2.0 * p.dot(self.b()) + self.c
    }

    fn solve_optimal_point(&self) -> Option<DVec3> {
        self.minimizer()
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        self.a00 += rhs.a00;
        self.a01 += rhs.a01;
        self.a02 += rhs.a02;
        self.a11 += rhs.a11;
        self.a12 += rhs.a12;
        self.a22 += rhs.a22;
        self.b0 += rhs.b0;
        self.b1 += rhs.b1;
        self.b2 += rhs.b2;
        self.c += rhs.c;
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

/// Uncertainty of the plane of each triangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProbabilisticParams {
    /// Standard deviation of the plane normal.
    pub sigma_normal: f64,
    /// Standard deviation of the point on the plane.
    pub sigma_position: f64,
}

impl Default for ProbabilisticParams {
    fn default() -> Self {
        Self {
            sigma_normal: 0.05,
            sigma_position: 0.0,
        }
    }
}

impl ProbabilisticParams {
    pub fn with_sigma_normal(mut self, sigma: f64) -> Self {
        self.sigma_normal = sigma;
        self
    }

    pub fn with_sigma_position(mut self, sigma: f64) -> Self {
        self.sigma_position = sigma;
        self
    }
}

/**
 * Expected squared distance to a plane whose normal and position are normally
 * distributed (Trettner and Kobbelt, "Fast and Robust QEF Minimization using
 * Probabilistic Quadrics"). The isotropic normal noise keeps the matrix full
 * rank on flat regions, so the optimal point always exists and stays close to
 * the vertices that were merged.
 */
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ProbabilisticQuadric(Quadric);

impl ProbabilisticQuadric {
    pub fn plane(pos: DVec3, normal: DVec3, weight: f64, params: &ProbabilisticParams) -> Self {
        let sn2 = params.sigma_normal * params.sigma_normal;
        let sp2 = params.sigma_position * params.sigma_position;
        let mut q = Quadric::plane(pos, normal, weight);
        let ws = weight * sn2;
        q.a00 += ws;
        q.a11 += ws;
        q.a22 += ws;
        q.b0 += ws * pos.x;
        q.b1 += ws * pos.y;
        q.b2 += ws * pos.z;
        q.c += ws * pos.length_squared()
            + weight * sp2 * normal.length_squared()
            + weight * 3.0 * sp2 * sn2;
        Self(q)
    }
}

impl QuadricMetric for ProbabilisticQuadric {
    type Params = ProbabilisticParams;

    fn from_triangle(points: [DVec3; 3], params: &ProbabilisticParams) -> Self {
        let [a, b, c] = points;
        let cross = (b - a).cross(c - a);
        let len = cross.length();
        if len == 0.0 {
            return Self::default();
        }
        Self::plane(a, cross / len, 0.5 * len, params)
    }

    fn evaluate_error(&self, p: DVec3) -> f64 {
        self.0.evaluate_error(p)
    }

    fn solve_optimal_point(&self) -> Option<DVec3> {
        self.0.minimizer()
    }
}

impl AddAssign for ProbabilisticQuadric {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Add for ProbabilisticQuadric {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

#[cfg(test)]
mod test {
    use glam::DVec3;

    use crate::macros::{assert_f64_eq, assert_point_eq};

    use super::{ProbabilisticParams, ProbabilisticQuadric, Quadric, QuadricMetric};

    /// Sum of the plane quadrics of the three faces of a cube meeting at `corner`.
    fn corner_quadric(corner: DVec3) -> Quadric {
        [DVec3::X, DVec3::Y, DVec3::Z]
            .into_iter()
            .fold(Quadric::default(), |q, n| q + Quadric::plane(corner, n, 1.0))
    }

    #[test]
    fn t_plane_error_is_squared_distance() {
        let q = Quadric::plane(DVec3::new(0.0, 0.0, 2.0), DVec3::Z, 1.0);
        assert_f64_eq!(9.0, q.evaluate_error(DVec3::new(4.0, -7.0, 5.0)), 1e-12);
        assert_f64_eq!(0.0, q.evaluate_error(DVec3::new(1.0, 1.0, 2.0)), 1e-12);
        let q = Quadric::plane(DVec3::new(0.0, 0.0, 2.0), DVec3::Z, 3.0);
        assert_f64_eq!(12.0, q.evaluate_error(DVec3::new(0.0, 0.0, 4.0)), 1e-12);
    }

    #[test]
    fn t_corner_minimizer() {
        let corner = DVec3::new(1.5, -2.0, 0.25);
        let q = corner_quadric(corner);
        let opt = q.solve_optimal_point().expect("Three planes meet at a point");
        assert_point_eq!(corner, opt, 1e-12);
        assert_f64_eq!(0.0, q.evaluate_error(opt), 1e-12);
    }

    #[test]
    fn t_general_minimizer() {
        // Planes in general position.
        let normals = [
            DVec3::new(1.0, 2.0, 0.5).normalize(),
            DVec3::new(-0.3, 1.0, 2.0).normalize(),
            DVec3::new(2.0, -1.0, 1.0).normalize(),
            DVec3::new(0.2, 0.1, -1.0).normalize(),
        ];
        let target = DVec3::new(0.3, -0.7, 1.1);
        let q = normals
            .iter()
            .fold(Quadric::default(), |q, &n| q + Quadric::plane(target, n, 0.7));
        let opt = q.solve_optimal_point().expect("Quadric is full rank");
        assert_point_eq!(target, opt, 1e-9);
    }

    #[test]
    fn t_planar_is_singular() {
        let q = Quadric::from_triangle([DVec3::ZERO, DVec3::X, DVec3::Y], &())
            + Quadric::from_triangle([DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y], &());
        assert!(q.solve_optimal_point().is_none());
        assert!(Quadric::default().solve_optimal_point().is_none());
        // Two planes meet along a line.
        let q =
            Quadric::plane(DVec3::ZERO, DVec3::X, 1.0) + Quadric::plane(DVec3::ZERO, DVec3::Y, 1.0);
        assert!(q.solve_optimal_point().is_none());
    }

    #[test]
    fn t_triangle_area_weight() {
        let q = Quadric::from_triangle([DVec3::ZERO, 2.0 * DVec3::X, 2.0 * DVec3::Y], &());
        // Area 2, distance 3.
        assert_f64_eq!(18.0, q.evaluate_error(DVec3::new(0.5, 0.5, 3.0)), 1e-12);
        let degenerate = Quadric::from_triangle([DVec3::ZERO, DVec3::X, 2.0 * DVec3::X], &());
        assert_eq!(Quadric::default(), degenerate);
    }

    #[test]
    fn t_combine_is_sum() {
        let a = corner_quadric(DVec3::ONE);
        let b = Quadric::plane(DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0).normalize(), 2.0);
        let p = DVec3::new(0.2, -0.4, 0.9);
        assert_f64_eq!(
            a.evaluate_error(p) + b.evaluate_error(p),
            a.combine(&b).evaluate_error(p),
            1e-12
        );
    }

    #[test]
    fn t_probabilistic_planar_is_regular() {
        let params = ProbabilisticParams::default();
        let pts = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let q = ProbabilisticQuadric::from_triangle(pts, &params)
            + ProbabilisticQuadric::from_triangle(
                [DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y],
                &params,
            );
        let opt = q.solve_optimal_point().expect("Probabilistic quadric is full rank");
        // On the plane, pulled toward the points the planes were built from.
        assert_point_eq!(DVec3::new(0.5, 0.0, 0.0), opt, 1e-12);
    }

    #[test]
    fn t_probabilistic_reduces_to_plain() {
        let params = ProbabilisticParams::default()
            .with_sigma_normal(0.0)
            .with_sigma_position(0.0);
        let pts = [
            DVec3::new(0.1, 0.2, 0.3),
            DVec3::new(1.0, 0.0, 0.5),
            DVec3::new(0.0, 1.0, -0.2),
        ];
        let p = DVec3::new(0.7, -0.1, 2.0);
        assert_f64_eq!(
            Quadric::from_triangle(pts, &()).evaluate_error(p),
            ProbabilisticQuadric::from_triangle(pts, &params).evaluate_error(p),
            1e-12
        );
    }
}
