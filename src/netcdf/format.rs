//! NetCDF classic format constants and structures.

use crate::util::{Error, Result};

/// Magic bytes at the start of every classic NetCDF file.
pub const NC_MAGIC: &[u8; 3] = b"CDF";

/// Version byte of the classic format (CDF-1).
pub const VERSION_CLASSIC: u8 = 1;

/// Version byte of the 64-bit offset format (CDF-2).
pub const VERSION_64BIT_OFFSET: u8 = 2;

/// Version byte of the 64-bit data format (CDF-5).
pub const VERSION_64BIT_DATA: u8 = 5;

/// Tag introducing the dimension list.
pub const NC_DIMENSION: u32 = 0x0000_000A;

/// Tag introducing the variable list.
pub const NC_VARIABLE: u32 = 0x0000_000B;

/// Tag introducing an attribute list.
pub const NC_ATTRIBUTE: u32 = 0x0000_000C;

/// Tag value of an absent list.
pub const ABSENT_TAG: u32 = 0;

/// Record count written while a file is still being streamed (CDF-1/2).
pub const STREAMING_32: u32 = u32::MAX;

/// Record count written while a file is still being streamed (CDF-5).
pub const STREAMING_64: u64 = u64::MAX;

/// All names, attribute values and variable slabs are padded to this.
pub const ALIGNMENT: u64 = 4;

/// Smallest possible header: magic, record count and three absent lists.
pub const MIN_HEADER_SIZE: u64 = 4 + 4 + 3 * 8;

/// Name of the point dimension used by TAU grids and solutions.
pub const POINT_DIMENSION: &str = "no_of_points";

/// On-disk flavour of a classic NetCDF file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Version {
    /// CDF-1: 32-bit offsets and counts.
    #[default]
    Classic,
    /// CDF-2: 64-bit variable offsets.
    Offset64,
    /// CDF-5: 64-bit offsets and counts, extra integer types.
    Data64,
}

impl Version {
    /// Parse the version byte following the magic.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            VERSION_CLASSIC => Ok(Self::Classic),
            VERSION_64BIT_OFFSET => Ok(Self::Offset64),
            VERSION_64BIT_DATA => Ok(Self::Data64),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }

    /// The version byte written after the magic.
    #[inline]
    pub const fn byte(self) -> u8 {
        match self {
            Self::Classic => VERSION_CLASSIC,
            Self::Offset64 => VERSION_64BIT_OFFSET,
            Self::Data64 => VERSION_64BIT_DATA,
        }
    }

    /// Width in bytes of element counts, lengths and vsize.
    #[inline]
    pub const fn count_width(self) -> usize {
        match self {
            Self::Data64 => 8,
            _ => 4,
        }
    }

    /// Width in bytes of a variable's begin offset.
    #[inline]
    pub const fn offset_width(self) -> usize {
        match self {
            Self::Classic => 4,
            _ => 8,
        }
    }

    /// Largest begin offset the format can address.
    #[inline]
    pub const fn max_offset(self) -> u64 {
        match self {
            Self::Classic => i32::MAX as u64,
            _ => i64::MAX as u64,
        }
    }
}

/// Round `n` up to the next multiple of [`ALIGNMENT`].
#[inline]
pub const fn padded(n: u64) -> u64 {
    (n + ALIGNMENT - 1) / ALIGNMENT * ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(NC_MAGIC, b"CDF");
        assert_eq!(NC_MAGIC.len(), 3);
    }

    #[test]
    fn test_versions() {
        assert_eq!(Version::from_byte(1).unwrap(), Version::Classic);
        assert_eq!(Version::from_byte(2).unwrap(), Version::Offset64);
        assert_eq!(Version::from_byte(5).unwrap(), Version::Data64);
        assert!(matches!(Version::from_byte(3), Err(Error::UnsupportedVersion(3))));

        assert_eq!(Version::Classic.offset_width(), 4);
        assert_eq!(Version::Offset64.offset_width(), 8);
        assert_eq!(Version::Offset64.count_width(), 4);
        assert_eq!(Version::Data64.count_width(), 8);
    }

    #[test]
    fn test_padding() {
        assert_eq!(padded(0), 0);
        assert_eq!(padded(1), 4);
        assert_eq!(padded(4), 4);
        assert_eq!(padded(5), 8);
    }
}
