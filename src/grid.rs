use std::sync::{Mutex, PoisonError};

use glam::{DVec3, IVec3, UVec3};
use tracing::warn;

/// Default cap on the number of cells along any axis.
pub const DEFAULT_SAFETY_MAX: u32 = 4096;

/// Largest cell count along an axis that still fits in an [`EdgeKey`](crate::dedup::EdgeKey).
const MAX_KEY_CELLS: u32 = (1 << 20) - 2;

/// Axis aligned box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AxisBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl AxisBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        AxisBox { min, max }
    }

    /// Cube centered at `center` with half side length `half`.
    pub fn cube(center: DVec3, half: f64) -> Self {
        AxisBox {
            min: center - DVec3::splat(half),
            max: center + DVec3::splat(half),
        }
    }

    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f64 {
        self.extent().length()
    }

    pub fn center(&self) -> DVec3 {
        0.5 * (self.min + self.max)
    }

    /// Smallest box containing this box and `p`.
    pub fn include(self, p: DVec3) -> Self {
        AxisBox {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// The box is finite and not inverted. A box with zero extent along some
    /// axis is valid.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
    }
}

/// Transform between world space points and integer grid coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridIndexer {
    pub origin: DVec3,
    pub cell_size: f64,
}

impl GridIndexer {
    pub fn new(origin: DVec3, cell_size: f64) -> Self {
        GridIndexer { origin, cell_size }
    }

    /// The cell containing `p`.
    pub fn to_grid(&self, p: DVec3) -> IVec3 {
        ((p - self.origin) / self.cell_size).floor().as_ivec3()
    }

    /// World position of the grid corner `c`.
    pub fn from_grid(&self, c: IVec3) -> DVec3 {
        self.origin + c.as_dvec3() * self.cell_size
    }
}

/// Cell counts and spacing of a grid covering a box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridLayout {
    indexer: GridIndexer,
    cells: UVec3,
}

impl GridLayout {
    /// Lay out a grid over `bounds` with the given cell size.
    ///
    /// The number of cells along each axis is `floor(extent / cell_size) + 1`.
    /// If that exceeds `safety_max` along any axis, the cell size is enlarged
    /// so the largest axis fits. Returns `None` if the bounds are not finite
    /// or inverted, or if the cell size is not a positive finite number.
    pub fn new(bounds: AxisBox, cell_size: f64, safety_max: u32) -> Option<Self> {
        if !bounds.is_valid() || !cell_size.is_finite() || cell_size <= 0.0 {
            return None;
        }
        let safety_max = safety_max.clamp(2, MAX_KEY_CELLS);
        let extent = bounds.extent();
        let counts = |h: f64| (extent / h).floor() + DVec3::ONE;
        let mut cell_size = cell_size;
        let mut cells = counts(cell_size);
        if cells.max_element() > safety_max as f64 {
            let enlarged = extent.max_element() / (safety_max - 1) as f64;
            warn!(
                requested = cell_size,
                enlarged, safety_max, "Grid exceeds the safety maximum, enlarging cell size"
            );
            cell_size = enlarged;
            cells = counts(cell_size);
        }
        if !cells.is_finite() {
            return None;
        }
        Some(GridLayout {
            indexer: GridIndexer::new(bounds.min, cell_size),
            cells: cells.as_uvec3().min(UVec3::splat(safety_max)),
        })
    }

    pub fn indexer(&self) -> &GridIndexer {
        &self.indexer
    }

    pub fn cell_size(&self) -> f64 {
        self.indexer.cell_size
    }

    pub fn cells(&self) -> UVec3 {
        self.cells
    }

    pub fn corners(&self) -> UVec3 {
        self.cells + UVec3::ONE
    }

    pub fn num_cells(&self) -> usize {
        let c = self.cells.as_u64vec3();
        (c.x * c.y * c.z) as usize
    }

    pub fn num_corners(&self) -> usize {
        let c = self.corners().as_u64vec3();
        (c.x * c.y * c.z) as usize
    }

    pub fn corner_pos(&self, c: IVec3) -> DVec3 {
        self.indexer.from_grid(c)
    }

    pub fn contains_cell(&self, c: IVec3) -> bool {
        c.cmpge(IVec3::ZERO).all() && c.as_uvec3().cmplt(self.cells).all()
    }

    /// The nearest cell to `c` inside the grid.
    pub fn clamp_cell(&self, c: IVec3) -> IVec3 {
        c.clamp(IVec3::ZERO, self.cells.as_ivec3() - IVec3::ONE)
    }

    /// Linear index of a cell. The cell must be inside the grid.
    pub fn cell_index(&self, c: IVec3) -> usize {
        let (nx, ny) = (self.cells.x as usize, self.cells.y as usize);
        c.x as usize + nx * (c.y as usize + ny * c.z as usize)
    }

    /// Linear index of a corner. The corner must be inside the grid.
    pub fn corner_index(&self, c: IVec3) -> usize {
        let dims = self.corners();
        let (nx, ny) = (dims.x as usize, dims.y as usize);
        c.x as usize + nx * (c.y as usize + ny * c.z as usize)
    }
}

/// Field values memoized per grid corner.
///
/// Every corner is evaluated at most once, even when many threads ask for it
/// at the same time: evaluation happens while holding the lock.
pub struct DenseValueCache {
    layout: GridLayout,
    /// `None` until the corner is evaluated.
    values: Mutex<Vec<Option<f64>>>,
}

impl DenseValueCache {
    pub fn new(layout: &GridLayout) -> Self {
        DenseValueCache {
            layout: *layout,
            values: Mutex::new(vec![None; layout.num_corners()]),
        }
    }

    /// Get the cached value of `corner`, or compute it with `eval` and store
    /// it.
    pub fn get_or_compute(&self, corner: IVec3, eval: impl FnOnce() -> f64) -> f64 {
        let index = self.layout.corner_index(corner);
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        *values[index].get_or_insert_with(eval)
    }

    /// Number of corners evaluated so far.
    pub fn num_evaluated(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|v| v.is_some())
            .count()
    }
}
