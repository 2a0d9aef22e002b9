//! NetCDF classic reader.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use parking_lot::RwLock;

use super::format::MIN_HEADER_SIZE;
use super::header::{Attribute, ByteSource, Header, Variable};
use super::types::NcValues;
use crate::util::{Error, Result};

/// Options controlling how a file is accessed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    /// Memory-map the file instead of issuing buffered reads.
    pub use_mmap: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: cfg!(feature = "mmap"),
        }
    }
}

/// Input streams for reading NetCDF data.
/// Supports both memory-mapped and buffered I/O modes.
pub struct NcStreams {
    inner: StreamsInner,
    size: u64,
}

enum StreamsInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Buffered file access (fallback)
    File(RwLock<File>),
}

impl NcStreams {
    /// Open a file for reading.
    pub fn open(path: impl AsRef<Path>, opts: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::from_open(e, path))?;

        let size = file.metadata()?.len();
        if size < MIN_HEADER_SIZE {
            return Err(Error::UnexpectedEof(size));
        }

        let inner = if opts.use_mmap {
            // Safety: the file is opened read-only; concurrent truncation by
            // another process is outside what this reader defends against.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            StreamsInner::Mmap(mmap)
        } else {
            StreamsInner::File(RwLock::new(file))
        };

        Ok(Self { inner, size })
    }

    /// Get the total file size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Check whether the file is memory-mapped.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.inner, StreamsInner::Mmap(_))
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        if pos + buf.len() as u64 > self.size {
            return Err(Error::UnexpectedEof(pos + buf.len() as u64));
        }

        match &self.inner {
            StreamsInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..(pos as usize + buf.len())]);
                Ok(())
            }
            StreamsInner::File(file) => {
                let mut f = file.write();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    /// Read bytes at a specific position.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }
}

impl ByteSource for NcStreams {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        self.read_into(pos, buf)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Names of the variables and global attributes of a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NcDataSet {
    pub var_names: Vec<String>,
    pub att_names: Vec<String>,
}

impl NcDataSet {
    /// Number of variables.
    #[inline]
    pub fn num_vars(&self) -> usize {
        self.var_names.len()
    }

    /// Number of global attributes.
    #[inline]
    pub fn num_atts(&self) -> usize {
        self.att_names.len()
    }
}

/// An opened, validated NetCDF classic file.
pub struct NcFile {
    path: PathBuf,
    streams: NcStreams,
    header: Header,
}

impl NcFile {
    /// Open and validate a NetCDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, ReadOptions::default())
    }

    /// Open with explicit access options.
    pub fn open_opts(path: impl AsRef<Path>, opts: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let streams = NcStreams::open(path, opts)?;
        let header = Header::parse(&streams)?;
        tracing::debug!(
            path = %path.display(),
            version = ?header.version,
            dims = header.dimensions.len(),
            vars = header.variables.len(),
            atts = header.attributes.len(),
            records = header.num_records,
            "opened NetCDF file"
        );
        Ok(Self {
            path: path.to_path_buf(),
            streams,
            header,
        })
    }

    /// Path the file was opened from.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Underlying byte streams.
    #[inline]
    pub fn streams(&self) -> &NcStreams {
        &self.streams
    }

    /// Check if a variable exists.
    pub fn has_variable(&self, name: &str) -> bool {
        self.header.variable(name).is_some()
    }

    /// Variable metadata by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.header.variable(name)
    }

    /// Global attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.header.attribute(name)
    }

    /// Variable and attribute directory.
    pub fn query(&self) -> NcDataSet {
        NcDataSet {
            var_names: self.header.variables.iter().map(|v| v.name.clone()).collect(),
            att_names: self.header.attributes.iter().map(|a| a.name.clone()).collect(),
        }
    }

    /// Read a whole variable by name.
    pub fn read_variable(&self, name: &str) -> Result<NcValues> {
        let var = self
            .variable(name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))?;
        self.read_values(var)
    }

    /// Read all values of a variable, in row-major order.
    pub fn read_values(&self, var: &Variable) -> Result<NcValues> {
        let header = &self.header;
        let overflow = || Error::invalid(format!("size of variable '{}' overflows", var.name));
        let count = header.num_values(var).ok_or_else(overflow)?;
        let count = usize::try_from(count).map_err(|_| overflow())?;
        let slab = header.slab_size(var).ok_or_else(overflow)? as usize;

        let bytes = if header.is_record_variable(var) {
            let record_size = header.record_size()?;
            let mut bytes = Vec::with_capacity(count * var.nc_type.num_bytes());
            let mut slab_buf = vec![0u8; slab];
            for rec in 0..header.num_records {
                let pos = var.begin + rec * record_size;
                self.streams.read_into(pos, &mut slab_buf)?;
                bytes.extend_from_slice(&slab_buf);
            }
            bytes
        } else {
            self.streams.read_bytes(var.begin, slab)?
        };

        tracing::trace!(var = %var.name, ty = %var.nc_type, count, "read variable");
        NcValues::decode(var.nc_type, &bytes, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netcdf::NcWriter;
    use tempfile::NamedTempFile;

    fn sample_file() -> NamedTempFile {
        let temp = NamedTempFile::new().unwrap();
        let mut w = NcWriter::new();
        w.add_dimension("no_of_points", 4).unwrap();
        w.add_attribute("c_l", NcValues::Double(vec![0.321]));
        w.add_variable("cp", &["no_of_points"], NcValues::Double(vec![0.1, 0.2, 0.3, 0.4]))
            .unwrap();
        w.write(temp.path()).unwrap();
        temp
    }

    #[test]
    fn test_open_both_modes() {
        let temp = sample_file();
        for use_mmap in [true, false] {
            let file = NcFile::open_opts(temp.path(), ReadOptions { use_mmap }).unwrap();
            assert_eq!(file.streams().is_mapped(), use_mmap);
            assert_eq!(
                file.read_variable("cp").unwrap(),
                NcValues::Double(vec![0.1, 0.2, 0.3, 0.4])
            );
        }
    }

    #[test]
    fn test_query() {
        let temp = sample_file();
        let file = NcFile::open(temp.path()).unwrap();
        let ds = file.query();
        assert_eq!(ds.var_names, vec!["cp".to_string()]);
        assert_eq!(ds.att_names, vec!["c_l".to_string()]);
        assert_eq!(ds.num_vars(), 1);
        assert!(file.has_variable("cp"));
        assert!(!file.has_variable("rho"));
    }

    #[test]
    fn test_missing_file() {
        let err = NcFile::open("does/not/exist.nc").err().unwrap();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_missing_variable() {
        let temp = sample_file();
        let file = NcFile::open(temp.path()).unwrap();
        assert!(matches!(file.read_variable("rho"), Err(Error::VariableNotFound(_))));
    }
}
