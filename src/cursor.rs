use glam::IVec3;

use crate::polygonize::tables::CORNER_OFFSETS;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> IVec3 {
        match self {
            Axis::X => IVec3::X,
            Axis::Y => IVec3::Y,
            Axis::Z => IVec3::Z,
        }
    }

    /// Pairs of corners `(back, front)` such that after stepping one cell
    /// along this axis, the new `back` corner is the old `front` corner.
    fn face_pairs(self) -> [(usize, usize); 4] {
        match self {
            Axis::X => [(0, 1), (3, 2), (4, 5), (7, 6)],
            Axis::Y => [(0, 3), (1, 2), (4, 7), (5, 6)],
            Axis::Z => [(0, 4), (1, 5), (2, 6), (3, 7)],
        }
    }
}

/// A grid cell with its eight corner values.
#[derive(Clone, Debug, PartialEq)]
pub struct GridCell {
    /// Lower corner of the cell in grid coordinates.
    pub corner: IVec3,
    pub values: [f64; 8],
}

impl GridCell {
    /// Sample all eight corners of the cell at `corner`.
    pub fn sample(corner: IVec3, mut eval: impl FnMut(IVec3) -> f64) -> Self {
        GridCell {
            corner,
            values: CORNER_OFFSETS.map(|offset| eval(corner + offset)),
        }
    }

    /// Grid coordinates of corner `i`.
    pub fn corner_coord(&self, i: usize) -> IVec3 {
        self.corner + CORNER_OFFSETS[i]
    }

    /// Bit `i` is set when corner `i` is below the isovalue.
    pub fn cube_index(&self, isovalue: f64) -> u8 {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v < isovalue)
            .fold(0u8, |index, (i, _)| index | (1 << i))
    }

    /// Any corner where the field is not defined.
    pub fn has_invalid(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }
}

/// A cell that slides through the grid one step at a time, only sampling the
/// four corners it has not seen before.
pub struct CellCursor<F>
where
    F: FnMut(IVec3) -> f64,
{
    cell: GridCell,
    eval: F,
}

impl<F> CellCursor<F>
where
    F: FnMut(IVec3) -> f64,
{
    pub fn new(start: IVec3, mut eval: F) -> Self {
        CellCursor {
            cell: GridCell::sample(start, &mut eval),
            eval,
        }
    }

    pub fn cell(&self) -> &GridCell {
        &self.cell
    }

    /// Step one cell along `axis`.
    pub fn advance(&mut self, axis: Axis) {
        let pairs = axis.face_pairs();
        for (back, front) in pairs {
            self.cell.values[back] = self.cell.values[front];
        }
        self.cell.corner += axis.unit();
        for (_, front) in pairs {
            self.cell.values[front] = (self.eval)(self.cell.corner_coord(front));
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use glam::{IVec3, ivec3};

    use super::{Axis, CellCursor, GridCell};

    fn field(c: IVec3) -> f64 {
        (c.x * 100 + c.y * 10 + c.z) as f64
    }

    #[test]
    fn t_cube_index() {
        let mut cell = GridCell::sample(IVec3::ZERO, |_| 1.0);
        assert_eq!(0, cell.cube_index(0.5));
        assert_eq!(255, cell.cube_index(2.0));
        cell.values[3] = 0.0;
        cell.values[6] = 0.0;
        assert_eq!(0b0100_1000, cell.cube_index(0.5));
        assert!(!cell.has_invalid());
        cell.values[7] = f64::NAN;
        assert!(cell.has_invalid());
    }

    #[test]
    fn t_cursor_matches_fresh_cell() {
        let mut cursor = CellCursor::new(ivec3(2, 3, 4), field);
        for axis in [Axis::X, Axis::X, Axis::Y, Axis::Z, Axis::Y, Axis::X, Axis::Z] {
            cursor.advance(axis);
            let fresh = GridCell::sample(cursor.cell().corner, field);
            assert_eq!(&fresh, cursor.cell());
        }
        assert_eq!(ivec3(5, 5, 6), cursor.cell().corner);
    }

    #[test]
    fn t_cursor_reuses_corners() {
        let count = Cell::new(0usize);
        let mut cursor = CellCursor::new(IVec3::ZERO, |c| {
            count.set(count.get() + 1);
            field(c)
        });
        assert_eq!(8, count.get());
        for _ in 0..9 {
            cursor.advance(Axis::X);
        }
        assert_eq!(8 + 4 * 9, count.get());
    }
}
