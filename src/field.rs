use glam::DVec3;

/// Implicit scalar field sampled by the polygonizer.
///
/// The field is shared between worker threads during parallel extraction, so
/// it must be `Sync`. Evaluation must not have side effects that the caller
/// relies on, because there is no guarantee on how many times, or in which
/// order, points are sampled.
pub trait ScalarField: Sync {
    fn value(&self, p: DVec3) -> f64;

    /// Whether the field is defined at `p`. Cells touching a corner where the
    /// field is not defined are skipped.
    fn is_valid(&self, _p: DVec3) -> bool {
        true
    }
}

impl<F> ScalarField for F
where
    F: Fn(DVec3) -> f64 + Sync,
{
    fn value(&self, p: DVec3) -> f64 {
        self(p)
    }
}

/// A scalar field paired with a validity predicate.
pub struct ValidatedField<F, V> {
    value: F,
    valid: V,
}

impl<F, V> ValidatedField<F, V>
where
    F: Fn(DVec3) -> f64 + Sync,
    V: Fn(DVec3) -> bool + Sync,
{
    pub fn new(value: F, valid: V) -> Self {
        ValidatedField { value, valid }
    }
}

impl<F, V> ScalarField for ValidatedField<F, V>
where
    F: Fn(DVec3) -> f64 + Sync,
    V: Fn(DVec3) -> bool + Sync,
{
    fn value(&self, p: DVec3) -> f64 {
        (self.value)(p)
    }

    fn is_valid(&self, p: DVec3) -> bool {
        (self.valid)(p)
    }
}

/// Sample a field, mapping points where it is not defined, or where it
/// returns a non-finite number, to NaN.
pub(crate) fn sample<S: ScalarField + ?Sized>(field: &S, p: DVec3) -> f64 {
    if !field.is_valid(p) {
        return f64::NAN;
    }
    let val = field.value(p);
    if val.is_finite() { val } else { f64::NAN }
}

/// Central difference gradient of the field.
pub(crate) fn gradient<S: ScalarField + ?Sized>(field: &S, p: DVec3, step: f64) -> DVec3 {
    let dx = DVec3::new(step, 0.0, 0.0);
    let dy = DVec3::new(0.0, step, 0.0);
    let dz = DVec3::new(0.0, 0.0, step);
    DVec3::new(
        field.value(p + dx) - field.value(p - dx),
        field.value(p + dy) - field.value(p - dy),
        field.value(p + dz) - field.value(p - dz),
    ) / (2.0 * step)
}
