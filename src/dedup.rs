use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, PoisonError},
};

use glam::IVec3;

use crate::{cursor::Axis, element::VH};

const COORD_BITS: u32 = 20;
const COORD_MASK: u64 = (1 << COORD_BITS) - 1;

/// Key identifying an undirected edge of the grid: the coordinates of its
/// lower corner, 20 bits each, and the axis it runs along.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey(u64);

impl EdgeKey {
    /// Key of the edge starting at `lower` and running along `axis`. The
    /// coordinates must be non-negative and below 2^20.
    pub fn new(lower: IVec3, axis: Axis) -> Self {
        let c = lower.as_u64vec3();
        EdgeKey(
            (c.x & COORD_MASK)
                | ((c.y & COORD_MASK) << COORD_BITS)
                | ((c.z & COORD_MASK) << (2 * COORD_BITS))
                | ((axis.index() as u64) << (3 * COORD_BITS)),
        )
    }

    pub fn lower(&self) -> IVec3 {
        IVec3::new(
            (self.0 & COORD_MASK) as i32,
            ((self.0 >> COORD_BITS) & COORD_MASK) as i32,
            ((self.0 >> (2 * COORD_BITS)) & COORD_MASK) as i32,
        )
    }

    pub fn axis(&self) -> Axis {
        Axis::ALL[((self.0 >> (3 * COORD_BITS)) & 3) as usize]
    }
}

impl fmt::Debug for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.lower();
        write!(f, "EdgeKey({}, {}, {}, {:?})", c.x, c.y, c.z, self.axis())
    }
}

/// Map from grid edges to the output vertex created on them.
#[derive(Default)]
pub struct EdgeVertexMap {
    map: Mutex<HashMap<EdgeKey, VH>>,
}

impl EdgeVertexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the vertex on the edge, or create it with `create`.
    ///
    /// The lock is held while `create` runs, so exactly one vertex is ever
    /// created per edge no matter how many threads race for it.
    pub fn find_or_insert(&self, key: EdgeKey, create: impl FnOnce() -> VH) -> VH {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        *map.entry(key).or_insert_with(create)
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
