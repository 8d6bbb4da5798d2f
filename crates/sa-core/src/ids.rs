//! Dense indices into a road graph.
//!
//! | Type           | Indexes                                  | Width |
//! |----------------|------------------------------------------|-------|
//! | [`NodeId`]     | `node_pos` and the CSR adjacency offsets | `u32` |
//! | [`EdgeId`]     | per-edge length and tag arrays           | `u32` |
//! | [`RoadTypeId`] | names interned by `RoadTypeRegistry`     | `u16` |
//!
//! An id is issued while a graph is built and written verbatim into the
//! on-disk cache; it means nothing against any other graph.

use std::fmt;

macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Fill value for unset adjacency slots and predecessor arrays.
            pub const INVALID: $name = $name(<$inner>::MAX);

            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        /// Fails once a graph outgrows the id width.
        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Road graph vertex: one distinct rounded coordinate.
    pub struct NodeId(u32);
}

typed_id! {
    /// Undirected road segment between two vertices.
    pub struct EdgeId(u32);
}

typed_id! {
    /// Interned `highway` value (`primary`, `residential`, …).
    pub struct RoadTypeId(u16);
}
