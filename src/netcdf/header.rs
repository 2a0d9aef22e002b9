//! Classic NetCDF header: dimensions, global attributes and variables.
//!
//! Reference: "NetCDF Classic and 64-bit Offset Format" and the CDF-5
//! format notes. All integers are big-endian.

use byteorder::{BigEndian, WriteBytesExt};
use smallvec::SmallVec;

use super::format::*;
use super::types::{NcType, NcValues};
use crate::util::{Error, Result};

/// A named dimension. The record (unlimited) dimension stores length 0 on
/// disk; its effective length is the file's record count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: u64,
    pub unlimited: bool,
}

/// A named attribute (global or attached to a variable).
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub values: NcValues,
}

/// Variable metadata. Data lives at `begin` in the file.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dim_ids: SmallVec<[usize; 4]>,
    pub attributes: Vec<Attribute>,
    pub nc_type: NcType,
    /// vsize as stored in the header (informational; recomputed when needed)
    pub vsize: u64,
    pub begin: u64,
}

/// Parsed file header.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub version: Version,
    pub num_records: u64,
    /// The record count on disk was the streaming marker.
    pub streaming: bool,
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<Attribute>,
    pub variables: Vec<Variable>,
}

/// Source of header bytes, addressed by absolute file position.
pub trait ByteSource {
    /// Fill `buf` from position `pos`.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()>;

    /// Total size in bytes.
    fn size(&self) -> u64;
}

impl ByteSource for [u8] {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let end = pos + buf.len() as u64;
        if end > self.len() as u64 {
            return Err(Error::UnexpectedEof(end));
        }
        buf.copy_from_slice(&self[pos as usize..end as usize]);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

/// Sequential reader over a [`ByteSource`].
struct Cursor<'a, S: ByteSource + ?Sized> {
    src: &'a S,
    pos: u64,
    version: Version,
}

impl<'a, S: ByteSource + ?Sized> Cursor<'a, S> {
    fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.pos + len as u64 > self.src.size() {
            return Err(Error::UnexpectedEof(self.pos + len as u64));
        }
        let mut buf = vec![0u8; len];
        self.src.read_at(self.pos, &mut buf)?;
        self.pos += len as u64;
        Ok(buf)
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.src.read_at(self.pos, &mut buf)?;
        self.pos += 4;
        Ok(u32::from_be_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.src.read_at(self.pos, &mut buf)?;
        self.pos += 8;
        Ok(u64::from_be_bytes(buf))
    }

    /// NON_NEG: element counts and lengths.
    fn count(&mut self) -> Result<u64> {
        let value = if self.version.count_width() == 8 {
            self.u64()?
        } else {
            self.u32()? as u64
        };
        if value > i64::MAX as u64 {
            return Err(Error::invalid(format!("negative count at {}", self.pos)));
        }
        Ok(value)
    }

    fn offset(&mut self) -> Result<u64> {
        if self.version.offset_width() == 8 {
            self.u64()
        } else {
            Ok(self.u32()? as u64)
        }
    }

    /// Skip padding up to the next 4-byte boundary.
    fn align(&mut self, len: u64) {
        self.pos += padded(len) - len;
    }

    /// Guard against counts that cannot possibly fit in what is left.
    fn check_count(&self, n: u64, min_entry: u64, what: &str) -> Result<()> {
        let remaining = self.src.size().saturating_sub(self.pos);
        if n.saturating_mul(min_entry) > remaining {
            return Err(Error::invalid(format!(
                "{what} count {n} is implausible for {remaining} remaining bytes"
            )));
        }
        Ok(())
    }

    fn name(&mut self) -> Result<String> {
        let len = self.count()?;
        self.check_count(len, 1, "name length")?;
        let bytes = self.bytes(len as usize)?;
        self.align(len);
        let name = String::from_utf8(bytes)?;
        if name.is_empty() {
            return Err(Error::invalid(format!("empty name before {}", self.pos)));
        }
        Ok(name)
    }

    /// Returns the element count of a tagged list, 0 when absent.
    fn list_header(&mut self, expected_tag: u32) -> Result<u64> {
        let tag = self.u32()?;
        let n = self.count()?;
        match tag {
            ABSENT_TAG if n == 0 => Ok(0),
            ABSENT_TAG => Err(Error::invalid("absent list with non-zero count")),
            t if t == expected_tag => Ok(n),
            t => Err(Error::invalid(format!(
                "expected list tag {expected_tag:#x}, found {t:#x}"
            ))),
        }
    }

    fn attributes(&mut self) -> Result<Vec<Attribute>> {
        let n = self.list_header(NC_ATTRIBUTE)?;
        self.check_count(n, 12, "attribute")?;
        let mut atts = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let name = self.name()?;
            let ty = NcType::from_code(self.u32()?, self.version)?;
            let nelems = self.count()?;
            self.check_count(nelems, ty.num_bytes() as u64, "attribute value")?;
            let nbytes = nelems * ty.num_bytes() as u64;
            let raw = self.bytes(nbytes as usize)?;
            self.align(nbytes);
            let values = NcValues::decode(ty, &raw, nelems as usize)?;
            atts.push(Attribute { name, values });
        }
        Ok(atts)
    }
}

impl Header {
    /// Parse the header from the start of `src` and validate it against
    /// the source size.
    pub fn parse<S: ByteSource + ?Sized>(src: &S) -> Result<Self> {
        let size = src.size();
        if size < MIN_HEADER_SIZE {
            return Err(Error::UnexpectedEof(size));
        }

        let mut magic = [0u8; 4];
        src.read_at(0, &mut magic)?;
        if &magic[0..3] != NC_MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = Version::from_byte(magic[3])?;

        let mut cur = Cursor { src, pos: 4, version };

        let (num_records, streaming) = match version {
            Version::Data64 => {
                let n = cur.u64()?;
                (if n == STREAMING_64 { 0 } else { n }, n == STREAMING_64)
            }
            _ => {
                let n = cur.u32()?;
                (if n == STREAMING_32 { 0 } else { n as u64 }, n == STREAMING_32)
            }
        };

        let ndims = cur.list_header(NC_DIMENSION)?;
        cur.check_count(ndims, 8, "dimension")?;
        let mut dimensions = Vec::with_capacity(ndims as usize);
        for _ in 0..ndims {
            let name = cur.name()?;
            let len = cur.count()?;
            dimensions.push(Dimension { name, len, unlimited: len == 0 });
        }
        if dimensions.iter().filter(|d| d.unlimited).count() > 1 {
            return Err(Error::invalid("more than one record dimension"));
        }

        let attributes = cur.attributes()?;

        let nvars = cur.list_header(NC_VARIABLE)?;
        cur.check_count(nvars, 24, "variable")?;
        let mut variables = Vec::with_capacity(nvars as usize);
        for _ in 0..nvars {
            let name = cur.name()?;
            let rank = cur.count()?;
            cur.check_count(rank, version.count_width() as u64, "dimension id")?;
            let mut dim_ids = SmallVec::with_capacity(rank as usize);
            for _ in 0..rank {
                let id = cur.count()? as usize;
                if id >= dimensions.len() {
                    return Err(Error::invalid(format!(
                        "variable '{name}' references dimension {id} of {}",
                        dimensions.len()
                    )));
                }
                dim_ids.push(id);
            }
            let var_attributes = cur.attributes()?;
            let nc_type = NcType::from_code(cur.u32()?, version)?;
            let vsize = cur.count()?;
            let begin = cur.offset()?;
            variables.push(Variable {
                name,
                dim_ids,
                attributes: var_attributes,
                nc_type,
                vsize,
                begin,
            });
        }

        let mut header = Self {
            version,
            num_records,
            streaming,
            dimensions,
            attributes,
            variables,
        };
        header.validate(cur.pos, size)?;
        Ok(header)
    }

    /// Check every variable's declared extent against the file size.
    fn validate(&mut self, header_end: u64, file_size: u64) -> Result<()> {
        for var in &self.variables {
            if var.dim_ids.iter().skip(1).any(|&id| self.dimensions[id].unlimited) {
                return Err(Error::invalid(format!(
                    "variable '{}' uses the record dimension in a non-leading position",
                    var.name
                )));
            }
            if var.begin < header_end {
                return Err(Error::invalid(format!(
                    "variable '{}' begins at {} inside the header (ends at {})",
                    var.name, var.begin, header_end
                )));
            }
        }

        let record_size = self.record_size()?;

        if self.streaming && record_size > 0 {
            let first = self
                .variables
                .iter()
                .filter(|v| self.is_record_variable(v))
                .map(|v| v.begin)
                .min()
                .unwrap_or(file_size);
            self.num_records = file_size.saturating_sub(first) / record_size;
        }

        for var in &self.variables {
            let end = if self.is_record_variable(var) {
                if self.num_records == 0 {
                    continue;
                }
                (self.num_records - 1)
                    .checked_mul(record_size)
                    .and_then(|n| n.checked_add(self.slab_size(var)?))
                    .and_then(|n| n.checked_add(var.begin))
            } else {
                self.slab_size(var).and_then(|n| n.checked_add(var.begin))
            };
            let end = end.ok_or_else(|| {
                Error::invalid(format!("size of variable '{}' overflows", var.name))
            })?;
            if end > file_size {
                return Err(Error::invalid(format!(
                    "variable '{}' declares data up to byte {} but the file has {} bytes",
                    var.name, end, file_size
                )));
            }
        }
        Ok(())
    }

    /// Look up a variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Look up a global attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up a dimension id by name.
    pub fn dimension_id(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Effective length of a dimension (record count for the record dimension).
    pub fn dimension_len(&self, id: usize) -> u64 {
        let dim = &self.dimensions[id];
        if dim.unlimited {
            self.num_records
        } else {
            dim.len
        }
    }

    /// True if the variable's leading dimension is the record dimension.
    pub fn is_record_variable(&self, var: &Variable) -> bool {
        var.dim_ids
            .first()
            .is_some_and(|&id| self.dimensions[id].unlimited)
    }

    /// Effective shape of a variable.
    pub fn shape(&self, var: &Variable) -> SmallVec<[u64; 4]> {
        var.dim_ids.iter().map(|&id| self.dimension_len(id)).collect()
    }

    /// Total number of values (product of all dimension lengths; 1 for scalars).
    pub fn num_values(&self, var: &Variable) -> Option<u64> {
        self.shape(var)
            .iter()
            .try_fold(1u64, |acc, &n| acc.checked_mul(n))
    }

    /// Unpadded bytes of one record slab (or the whole variable if not a record variable).
    pub fn slab_size(&self, var: &Variable) -> Option<u64> {
        let skip = usize::from(self.is_record_variable(var));
        var.dim_ids
            .iter()
            .skip(skip)
            .try_fold(var.nc_type.num_bytes() as u64, |acc, &id| {
                acc.checked_mul(self.dimensions[id].len)
            })
    }

    /// Bytes between consecutive records.
    ///
    /// Record slabs are padded to 4 bytes, except when a single record
    /// variable of a sub-word type is present.
    pub fn record_size(&self) -> Result<u64> {
        let record_vars: Vec<&Variable> = self
            .variables
            .iter()
            .filter(|v| self.is_record_variable(v))
            .collect();

        let overflow = || Error::invalid("record size overflows");
        match record_vars.as_slice() {
            [] => Ok(0),
            [only] if only.nc_type.num_bytes() < 4 => self.slab_size(only).ok_or_else(overflow),
            vars => vars.iter().try_fold(0u64, |acc, v| {
                let slab = self.slab_size(v).ok_or_else(overflow)?;
                acc.checked_add(padded(slab)).ok_or_else(overflow)
            }),
        }
    }

    /// Serialize the header. Variable `begin` offsets are written as stored.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(NC_MAGIC);
        out.push(self.version.byte());
        write_count(&mut out, self.version, self.num_records)?;

        if self.dimensions.is_empty() {
            write_absent(&mut out, self.version)?;
        } else {
            out.write_u32::<BigEndian>(NC_DIMENSION)?;
            write_count(&mut out, self.version, self.dimensions.len() as u64)?;
            for dim in &self.dimensions {
                write_name(&mut out, self.version, &dim.name)?;
                write_count(&mut out, self.version, if dim.unlimited { 0 } else { dim.len })?;
            }
        }

        write_attributes(&mut out, self.version, &self.attributes)?;

        if self.variables.is_empty() {
            write_absent(&mut out, self.version)?;
        } else {
            out.write_u32::<BigEndian>(NC_VARIABLE)?;
            write_count(&mut out, self.version, self.variables.len() as u64)?;
            for var in &self.variables {
                write_name(&mut out, self.version, &var.name)?;
                write_count(&mut out, self.version, var.dim_ids.len() as u64)?;
                for &id in &var.dim_ids {
                    write_count(&mut out, self.version, id as u64)?;
                }
                write_attributes(&mut out, self.version, &var.attributes)?;
                out.write_u32::<BigEndian>(var.nc_type.code())?;
                write_count(&mut out, self.version, var.vsize)?;
                if self.version.offset_width() == 8 {
                    out.write_u64::<BigEndian>(var.begin)?;
                } else {
                    let begin = u32::try_from(var.begin).map_err(|_| {
                        Error::WriteFailed(format!(
                            "offset {} of '{}' exceeds the classic format",
                            var.begin, var.name
                        ))
                    })?;
                    out.write_u32::<BigEndian>(begin)?;
                }
            }
        }
        Ok(out)
    }
}

fn write_count(out: &mut Vec<u8>, version: Version, n: u64) -> Result<()> {
    if version.count_width() == 8 {
        out.write_u64::<BigEndian>(n)?;
    } else {
        let n = u32::try_from(n)
            .map_err(|_| Error::WriteFailed(format!("count {n} exceeds 32 bits")))?;
        out.write_u32::<BigEndian>(n)?;
    }
    Ok(())
}

fn write_absent(out: &mut Vec<u8>, version: Version) -> Result<()> {
    out.write_u32::<BigEndian>(ABSENT_TAG)?;
    write_count(out, version, 0)
}

fn write_padding(out: &mut Vec<u8>, len: u64) {
    let pad = (padded(len) - len) as usize;
    out.extend(std::iter::repeat(0u8).take(pad));
}

fn write_name(out: &mut Vec<u8>, version: Version, name: &str) -> Result<()> {
    write_count(out, version, name.len() as u64)?;
    out.extend_from_slice(name.as_bytes());
    write_padding(out, name.len() as u64);
    Ok(())
}

fn write_attributes(out: &mut Vec<u8>, version: Version, atts: &[Attribute]) -> Result<()> {
    if atts.is_empty() {
        return write_absent(out, version);
    }
    out.write_u32::<BigEndian>(NC_ATTRIBUTE)?;
    write_count(out, version, atts.len() as u64)?;
    for att in atts {
        write_name(out, version, &att.name)?;
        out.write_u32::<BigEndian>(att.values.nc_type().code())?;
        write_count(out, version, att.values.len() as u64)?;
        let start = out.len();
        att.values.encode(out);
        write_padding(out, (out.len() - start) as u64);
    }
    Ok(())
}
