//! External data types of the classic NetCDF format and decoded value arrays.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use rayon::prelude::*;

use super::format::Version;
use crate::util::{Error, Result};

/// Arrays at least this long are byte-swapped in parallel.
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Elements per parallel work item.
const PARALLEL_CHUNK: usize = 1 << 14;

/// External type of a variable or attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum NcType {
    /// Signed 8-bit integer
    Byte = 1,
    /// Text character (ISO/ASCII)
    Char = 2,
    /// Signed 16-bit integer
    Short = 3,
    /// Signed 32-bit integer
    Int = 4,
    /// 32-bit floating point
    Float = 5,
    /// 64-bit floating point
    Double = 6,
    /// Unsigned 8-bit integer (CDF-5)
    UByte = 7,
    /// Unsigned 16-bit integer (CDF-5)
    UShort = 8,
    /// Unsigned 32-bit integer (CDF-5)
    UInt = 9,
    /// Signed 64-bit integer (CDF-5)
    Int64 = 10,
    /// Unsigned 64-bit integer (CDF-5)
    UInt64 = 11,
}

impl NcType {
    /// Decode a type code, checking that the file version allows it.
    pub fn from_code(code: u32, version: Version) -> Result<Self> {
        let ty = match code {
            1 => Self::Byte,
            2 => Self::Char,
            3 => Self::Short,
            4 => Self::Int,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::UByte,
            8 => Self::UShort,
            9 => Self::UInt,
            10 => Self::Int64,
            11 => Self::UInt64,
            _ => return Err(Error::invalid(format!("unknown nc_type code {code}"))),
        };
        if ty.is_extended() && version != Version::Data64 {
            return Err(Error::invalid(format!(
                "type {} requires the CDF-5 format",
                ty.name()
            )));
        }
        Ok(ty)
    }

    /// The on-disk type code.
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Size in bytes of one element.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Byte | Self::Char | Self::UByte => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::Float | Self::UInt => 4,
            Self::Double | Self::Int64 | Self::UInt64 => 8,
        }
    }

    /// Types only available in CDF-5 files.
    #[inline]
    pub const fn is_extended(self) -> bool {
        matches!(
            self,
            Self::UByte | Self::UShort | Self::UInt | Self::Int64 | Self::UInt64
        )
    }

    /// Name as used by the NetCDF C library.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "NC_BYTE",
            Self::Char => "NC_CHAR",
            Self::Short => "NC_SHORT",
            Self::Int => "NC_INT",
            Self::Float => "NC_FLOAT",
            Self::Double => "NC_DOUBLE",
            Self::UByte => "NC_UBYTE",
            Self::UShort => "NC_USHORT",
            Self::UInt => "NC_UINT",
            Self::Int64 => "NC_INT64",
            Self::UInt64 => "NC_UINT64",
        }
    }
}

impl fmt::Display for NcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded array of values of one external type.
#[derive(Clone, Debug, PartialEq)]
pub enum NcValues {
    Byte(Vec<i8>),
    Char(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    UByte(Vec<u8>),
    UShort(Vec<u16>),
    UInt(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
}

/// Byte-swap a big-endian buffer into native values.
fn decode_be<T: Copy + Default + Send>(
    bytes: &[u8],
    read_into: fn(&[u8], &mut [T]),
) -> Vec<T> {
    let width = std::mem::size_of::<T>();
    let mut out = vec![T::default(); bytes.len() / width];
    if out.len() >= PARALLEL_THRESHOLD {
        out.par_chunks_mut(PARALLEL_CHUNK)
            .zip(bytes.par_chunks(PARALLEL_CHUNK * width))
            .for_each(|(dst, src)| read_into(src, dst));
    } else {
        read_into(bytes, &mut out);
    }
    out
}

/// Append native values to `out` as big-endian bytes.
fn encode_be<T: Copy>(values: &[T], out: &mut Vec<u8>, write_into: fn(&[T], &mut [u8])) {
    let start = out.len();
    out.resize(start + std::mem::size_of_val(values), 0);
    write_into(values, &mut out[start..]);
}

impl NcValues {
    /// Decode `count` big-endian elements of type `ty` from `bytes`.
    pub fn decode(ty: NcType, bytes: &[u8], count: usize) -> Result<Self> {
        let needed = count
            .checked_mul(ty.num_bytes())
            .ok_or_else(|| Error::invalid("value count overflows"))?;
        if bytes.len() < needed {
            return Err(Error::invalid(format!(
                "{} values of {} need {} bytes, only {} available",
                count,
                ty,
                needed,
                bytes.len()
            )));
        }
        let bytes = &bytes[..needed];

        Ok(match ty {
            NcType::Byte => Self::Byte(bytemuck::cast_slice::<u8, i8>(bytes).to_vec()),
            NcType::Char => Self::Char(bytes.to_vec()),
            NcType::UByte => Self::UByte(bytes.to_vec()),
            NcType::Short => Self::Short(decode_be(bytes, BigEndian::read_i16_into)),
            NcType::UShort => Self::UShort(decode_be(bytes, BigEndian::read_u16_into)),
            NcType::Int => Self::Int(decode_be(bytes, BigEndian::read_i32_into)),
            NcType::UInt => Self::UInt(decode_be(bytes, BigEndian::read_u32_into)),
            NcType::Float => Self::Float(decode_be(bytes, BigEndian::read_f32_into)),
            NcType::Double => Self::Double(decode_be(bytes, BigEndian::read_f64_into)),
            NcType::Int64 => Self::Int64(decode_be(bytes, BigEndian::read_i64_into)),
            NcType::UInt64 => Self::UInt64(decode_be(bytes, BigEndian::read_u64_into)),
        })
    }

    /// Append the values as unpadded big-endian bytes.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Byte(v) => out.extend_from_slice(bytemuck::cast_slice(v)),
            Self::Char(v) | Self::UByte(v) => out.extend_from_slice(v),
            Self::Short(v) => encode_be(v, out, BigEndian::write_i16_into),
            Self::UShort(v) => encode_be(v, out, BigEndian::write_u16_into),
            Self::Int(v) => encode_be(v, out, BigEndian::write_i32_into),
            Self::UInt(v) => encode_be(v, out, BigEndian::write_u32_into),
            Self::Float(v) => encode_be(v, out, BigEndian::write_f32_into),
            Self::Double(v) => encode_be(v, out, BigEndian::write_f64_into),
            Self::Int64(v) => encode_be(v, out, BigEndian::write_i64_into),
            Self::UInt64(v) => encode_be(v, out, BigEndian::write_u64_into),
        }
    }

    /// Text attribute helper.
    pub fn text(s: &str) -> Self {
        Self::Char(s.as_bytes().to_vec())
    }

    /// External type of the values.
    pub fn nc_type(&self) -> NcType {
        match self {
            Self::Byte(_) => NcType::Byte,
            Self::Char(_) => NcType::Char,
            Self::Short(_) => NcType::Short,
            Self::Int(_) => NcType::Int,
            Self::Float(_) => NcType::Float,
            Self::Double(_) => NcType::Double,
            Self::UByte(_) => NcType::UByte,
            Self::UShort(_) => NcType::UShort,
            Self::UInt(_) => NcType::UInt,
            Self::Int64(_) => NcType::Int64,
            Self::UInt64(_) => NcType::UInt64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Char(v) | Self::UByte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::UShort(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
        }
    }

    /// Check if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert every element to `f64`. Text has no numeric meaning.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        Ok(match self {
            Self::Double(v) => v.clone(),
            Self::Float(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Int(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Short(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Byte(v) => v.iter().map(|&x| x as f64).collect(),
            Self::UByte(v) => v.iter().map(|&x| x as f64).collect(),
            Self::UShort(v) => v.iter().map(|&x| x as f64).collect(),
            Self::UInt(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Char(_) => return Err(Error::type_mismatch("numeric", NcType::Char.name())),
        })
    }

    /// Convert to `i32`. Only types every value of which fits are accepted.
    pub fn to_i32_vec(&self) -> Result<Vec<i32>> {
        Ok(match self {
            Self::Int(v) => v.clone(),
            Self::Short(v) => v.iter().map(|&x| x as i32).collect(),
            Self::Byte(v) => v.iter().map(|&x| x as i32).collect(),
            Self::UByte(v) => v.iter().map(|&x| x as i32).collect(),
            Self::UShort(v) => v.iter().map(|&x| x as i32).collect(),
            other => {
                return Err(Error::type_mismatch(
                    NcType::Int.name(),
                    other.nc_type().name(),
                ))
            }
        })
    }

    /// First element as `f64`, if any.
    pub fn first_f64(&self) -> Result<Option<f64>> {
        let first = match self {
            Self::Char(_) => return Err(Error::type_mismatch("numeric", NcType::Char.name())),
            Self::Double(v) => v.first().copied(),
            Self::Float(v) => v.first().map(|&x| x as f64),
            Self::Int(v) => v.first().map(|&x| x as f64),
            Self::Short(v) => v.first().map(|&x| x as f64),
            Self::Byte(v) => v.first().map(|&x| x as f64),
            Self::UByte(v) => v.first().map(|&x| x as f64),
            Self::UShort(v) => v.first().map(|&x| x as f64),
            Self::UInt(v) => v.first().map(|&x| x as f64),
            Self::Int64(v) => v.first().map(|&x| x as f64),
            Self::UInt64(v) => v.first().map(|&x| x as f64),
        };
        Ok(first)
    }

    /// Text content of a char array, trailing NULs removed.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Char(v) => {
                let end = v.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Some(String::from_utf8_lossy(&v[..end]).into_owned())
            }
            _ => None,
        }
    }
}
