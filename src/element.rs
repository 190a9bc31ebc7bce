use std::fmt::{Debug, Display};

/**
 * All elements of a mesh implement this trait. They are identified by their
 * index.
 */
pub trait Handle: Copy {
    /**
     * The index of the element.
     */
    fn index(&self) -> u32;
}

/**
 * Vertex handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VH {
    idx: u32,
}

/**
 * Edge handle. Edges are undirected.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EH {
    idx: u32,
}

/**
 * Face handle. All faces handled by this crate are triangles.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FH {
    idx: u32,
}

macro_rules! impl_handle {
    ($handle:ident, $name:literal) => {
        impl Handle for $handle {
            fn index(&self) -> u32 {
                self.idx
            }
        }

        impl From<u32> for $handle {
            fn from(idx: u32) -> Self {
                $handle { idx }
            }
        }

        impl From<&u32> for $handle {
            fn from(idx: &u32) -> Self {
                $handle { idx: *idx }
            }
        }

        impl Display for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $name, self.index())
            }
        }

        impl Debug for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $name, self.index())
            }
        }
    };
}

impl_handle!(VH, "VH");
impl_handle!(EH, "EH");
impl_handle!(FH, "FH");

impl VH {
    /// Index of this vertex as a `usize`, for addressing per-vertex buffers.
    pub(crate) fn slot(self) -> usize {
        self.idx as usize
    }
}

impl EH {
    pub(crate) fn slot(self) -> usize {
        self.idx as usize
    }
}

impl FH {
    pub(crate) fn slot(self) -> usize {
        self.idx as usize
    }
}
