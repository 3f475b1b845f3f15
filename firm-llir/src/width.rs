//! Value widths shared between the source graph and the LLIR.
//!
//! The source graph's node "mode" and the LLIR's virtual-register width are the same concept at
//! two different stages of lowering, so they share one type instead of each layer inventing its
//! own int-width enum.

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The bit width of a value, carried by source-graph node modes and by `VirtualRegister`s alike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Width {
    /// An 8-bit (boolean/byte) value.
    Bit8,
    /// A 32-bit (`int`) value.
    Bit32,
    /// A 64-bit (pointer/`long`) value.
    Bit64,
}

impl Width {
    /// Size of this width in bytes, used when materializing addressing arithmetic.
    pub fn bytes(self) -> u32 {
        match self {
            Width::Bit8 => 1,
            Width::Bit32 => 4,
            Width::Bit64 => 8,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Width::Bit8 => write!(f, "b8"),
            Width::Bit32 => write!(f, "b32"),
            Width::Bit64 => write!(f, "b64"),
        }
    }
}
