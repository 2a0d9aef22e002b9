//! NetCDF classic writer.
//!
//! Builds a complete file in memory: header first, then the fixed-size
//! variables, then the interleaved records.

use std::path::Path;

use smallvec::SmallVec;

use super::format::{padded, Version};
use super::header::{Attribute, Dimension, Header, Variable};
use super::reader::NcFile;
use super::types::NcValues;
use crate::util::fs::replace_file;
use crate::util::{Error, Result};

struct VarDef {
    name: String,
    dim_ids: SmallVec<[usize; 4]>,
    attributes: Vec<Attribute>,
    values: NcValues,
}

/// Accumulates dimensions, attributes and variables, then writes them out.
pub struct NcWriter {
    version: Version,
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    variables: Vec<VarDef>,
}

impl Default for NcWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn set_attribute(list: &mut Vec<Attribute>, name: &str, values: NcValues) {
    match list.iter_mut().find(|a| a.name == name) {
        Some(att) => att.values = values,
        None => list.push(Attribute {
            name: name.to_string(),
            values,
        }),
    }
}

impl NcWriter {
    /// New writer producing a CDF-1 classic file.
    pub fn new() -> Self {
        Self::with_version(Version::Classic)
    }

    /// New writer producing the given format flavour.
    pub fn with_version(version: Version) -> Self {
        Self {
            version,
            dimensions: Vec::new(),
            attributes: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Load everything from an open file so it can be modified and rewritten.
    pub fn from_file(file: &NcFile) -> Result<Self> {
        let header = file.header();
        let mut writer = Self::with_version(header.version);
        writer.dimensions = header.dimensions.clone();
        writer.attributes = header.attributes.clone();
        for var in &header.variables {
            writer.variables.push(VarDef {
                name: var.name.clone(),
                dim_ids: var.dim_ids.clone(),
                attributes: var.attributes.clone(),
                values: file.read_values(var)?,
            });
        }
        Ok(writer)
    }

    /// Format flavour that will be written.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Define a fixed-size dimension and return its id.
    pub fn add_dimension(&mut self, name: &str, len: u64) -> Result<usize> {
        if len == 0 {
            return Err(Error::WriteFailed(format!(
                "dimension '{name}' has length 0; use add_record_dimension"
            )));
        }
        self.push_dimension(name, len, false)
    }

    /// Define the record (unlimited) dimension and return its id.
    pub fn add_record_dimension(&mut self, name: &str) -> Result<usize> {
        if self.dimensions.iter().any(|d| d.unlimited) {
            return Err(Error::WriteFailed("a record dimension is already defined".into()));
        }
        self.push_dimension(name, 0, true)
    }

    fn push_dimension(&mut self, name: &str, len: u64, unlimited: bool) -> Result<usize> {
        if name.is_empty() {
            return Err(Error::WriteFailed("empty dimension name".into()));
        }
        if self.dimension_id(name).is_some() {
            return Err(Error::WriteFailed(format!("dimension '{name}' already defined")));
        }
        self.dimensions.push(Dimension {
            name: name.to_string(),
            len,
            unlimited,
        });
        Ok(self.dimensions.len() - 1)
    }

    /// Id of a dimension by name.
    pub fn dimension_id(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Length of a fixed dimension by name (`None` for missing or record dimensions).
    pub fn dimension_len(&self, name: &str) -> Option<u64> {
        self.dimensions
            .iter()
            .find(|d| d.name == name && !d.unlimited)
            .map(|d| d.len)
    }

    /// Set a global attribute, replacing any previous value.
    pub fn add_attribute(&mut self, name: &str, values: NcValues) {
        set_attribute(&mut self.attributes, name, values);
    }

    /// Check if a variable is defined.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Define a variable over the named dimensions, replacing any previous
    /// variable of the same name.
    pub fn add_variable(&mut self, name: &str, dims: &[&str], values: NcValues) -> Result<()> {
        if name.is_empty() {
            return Err(Error::WriteFailed("empty variable name".into()));
        }
        let mut dim_ids: SmallVec<[usize; 4]> = SmallVec::with_capacity(dims.len());
        for (i, dim) in dims.iter().enumerate() {
            let id = self
                .dimension_id(dim)
                .ok_or_else(|| Error::DimensionNotFound(dim.to_string()))?;
            if i > 0 && self.dimensions[id].unlimited {
                return Err(Error::WriteFailed(format!(
                    "record dimension '{dim}' must come first in '{name}'"
                )));
            }
            dim_ids.push(id);
        }

        let fixed: u64 = dim_ids
            .iter()
            .filter(|&&id| !self.dimensions[id].unlimited)
            .map(|&id| self.dimensions[id].len)
            .product();
        let is_record = dim_ids.first().is_some_and(|&id| self.dimensions[id].unlimited);
        let len = values.len() as u64;
        let consistent = if is_record { len % fixed == 0 } else { len == fixed };
        if !consistent {
            return Err(Error::WriteFailed(format!(
                "variable '{name}' has {len} values, shape requires {}{fixed}",
                if is_record { "a multiple of " } else { "" }
            )));
        }

        let def = VarDef {
            name: name.to_string(),
            dim_ids,
            attributes: Vec::new(),
            values,
        };
        match self.variables.iter_mut().find(|v| v.name == name) {
            Some(existing) => {
                let attributes = std::mem::take(&mut existing.attributes);
                *existing = VarDef { attributes, ..def };
            }
            None => self.variables.push(def),
        }
        Ok(())
    }

    /// Set an attribute on an already defined variable.
    pub fn add_variable_attribute(&mut self, var: &str, name: &str, values: NcValues) -> Result<()> {
        let def = self
            .variables
            .iter_mut()
            .find(|v| v.name == var)
            .ok_or_else(|| Error::VariableNotFound(var.to_string()))?;
        set_attribute(&mut def.attributes, name, values);
        Ok(())
    }

    fn is_record(&self, def: &VarDef) -> bool {
        def.dim_ids.first().is_some_and(|&id| self.dimensions[id].unlimited)
    }

    fn slab_len(&self, def: &VarDef) -> u64 {
        def.dim_ids
            .iter()
            .filter(|&&id| !self.dimensions[id].unlimited)
            .map(|&id| self.dimensions[id].len)
            .product()
    }

    fn num_records(&self) -> Result<u64> {
        let mut num_records: Option<u64> = None;
        for def in self.variables.iter().filter(|d| self.is_record(d)) {
            let n = def.values.len() as u64 / self.slab_len(def);
            match num_records {
                None => num_records = Some(n),
                Some(m) if m != n => {
                    return Err(Error::WriteFailed(format!(
                        "record variable '{}' has {n} records, others have {m}",
                        def.name
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(num_records.unwrap_or(0))
    }

    /// Serialize the whole file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        for def in &self.variables {
            if def.values.nc_type().is_extended() && self.version != Version::Data64 {
                return Err(Error::WriteFailed(format!(
                    "variable '{}' of type {} requires the CDF-5 format",
                    def.name,
                    def.values.nc_type()
                )));
            }
        }

        let max_vsize = if self.version.count_width() == 8 {
            u64::MAX
        } else {
            u32::MAX as u64
        };

        let mut header = Header {
            version: self.version,
            num_records: self.num_records()?,
            streaming: false,
            dimensions: self.dimensions.clone(),
            attributes: self.attributes.clone(),
            variables: self
                .variables
                .iter()
                .map(|def| {
                    let slab = self.slab_len(def) * def.values.nc_type().num_bytes() as u64;
                    Variable {
                        name: def.name.clone(),
                        dim_ids: def.dim_ids.clone(),
                        attributes: def.attributes.clone(),
                        nc_type: def.values.nc_type(),
                        vsize: padded(slab).min(max_vsize),
                        begin: 0,
                    }
                })
                .collect(),
        };

        // Offsets have a fixed width, so the header size does not depend on them.
        let header_len = header.encode()?.len() as u64;
        let mut offset = header_len;
        for (var, def) in header.variables.iter_mut().zip(&self.variables) {
            if !self.is_record(def) {
                var.begin = offset;
                offset += padded(self.slab_len(def) * var.nc_type.num_bytes() as u64);
            }
        }
        let record_size = header.record_size()?;
        let mut record_offset = offset;
        for (var, def) in header.variables.iter_mut().zip(&self.variables) {
            if self.is_record(def) {
                var.begin = record_offset;
                record_offset += padded(self.slab_len(def) * var.nc_type.num_bytes() as u64);
            }
        }
        if let Some(var) = header
            .variables
            .iter()
            .find(|v| v.begin > self.version.max_offset())
        {
            return Err(Error::WriteFailed(format!(
                "variable '{}' starts beyond the addressable range of {:?}",
                var.name, self.version
            )));
        }

        let mut out = header.encode()?;
        debug_assert_eq!(out.len() as u64, header_len);

        for def in self.variables.iter().filter(|d| !self.is_record(d)) {
            let start = out.len();
            def.values.encode(&mut out);
            let written = (out.len() - start) as u64;
            out.resize(start + padded(written) as usize, 0);
        }

        let record_vars: Vec<(&VarDef, Vec<u8>)> = self
            .variables
            .iter()
            .filter(|d| self.is_record(d))
            .map(|def| {
                let mut bytes = Vec::new();
                def.values.encode(&mut bytes);
                (def, bytes)
            })
            .collect();
        for rec in 0..header.num_records as usize {
            let record_start = out.len();
            for (def, bytes) in &record_vars {
                let slab = (self.slab_len(def) * def.values.nc_type().num_bytes() as u64) as usize;
                out.extend_from_slice(&bytes[rec * slab..(rec + 1) * slab]);
                if record_vars.len() > 1 || def.values.nc_type().num_bytes() >= 4 {
                    let written = out.len() - record_start;
                    out.resize(record_start + padded(written as u64) as usize, 0);
                }
            }
            debug_assert_eq!((out.len() - record_start) as u64, record_size);
        }

        Ok(out)
    }

    /// Write the file to `path`, replacing any existing file.
    ///
    /// The bytes go to a temporary file in the same directory which is then
    /// renamed over `path`, so readers of the old file never see a partial
    /// write.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        replace_file(path, |w| Ok(w.write_all(&bytes)?))?;
        tracing::debug!(
            path = %path.display(),
            bytes = bytes.len(),
            vars = self.variables.len(),
            "wrote NetCDF file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netcdf::NcType;
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_and_read_fixed() {
        let temp = NamedTempFile::new().unwrap();
        let mut w = NcWriter::new();
        w.add_dimension("no_of_points", 3).unwrap();
        w.add_dimension("points_per_surfacetriangle", 3).unwrap();
        w.add_attribute("type", NcValues::text("Primary Grid"));
        w.add_variable("points_xc", &["no_of_points"], NcValues::Float(vec![0.0, 1.0, 0.0]))
            .unwrap();
        w.add_variable(
            "points_of_surfacetriangles",
            &["no_of_points", "points_per_surfacetriangle"],
            NcValues::Int(vec![0, 1, 2, 2, 1, 0, 1, 2, 0]),
        )
        .unwrap();
        w.add_variable("flag", &["no_of_points"], NcValues::Short(vec![1, 2, 3])).unwrap();
        w.write(temp.path()).unwrap();

        let file = NcFile::open(temp.path()).unwrap();
        let tri = file.variable("points_of_surfacetriangles").unwrap();
        assert_eq!(file.header().shape(tri).as_slice(), &[3, 3]);
        assert_eq!(
            file.read_variable("flag").unwrap(),
            NcValues::Short(vec![1, 2, 3])
        );
        assert_eq!(
            file.attribute("type").unwrap().values.as_text().as_deref(),
            Some("Primary Grid")
        );
    }

    #[test]
    fn test_record_variables_interleaved() {
        let temp = NamedTempFile::new().unwrap();
        let mut w = NcWriter::with_version(Version::Offset64);
        w.add_record_dimension("time").unwrap();
        w.add_dimension("n", 2).unwrap();
        w.add_variable("t", &["time"], NcValues::Double(vec![0.0, 0.5, 1.0])).unwrap();
        w.add_variable("u", &["time", "n"], NcValues::Short(vec![1, 2, 3, 4, 5, 6]))
            .unwrap();
        w.write(temp.path()).unwrap();

        let file = NcFile::open(temp.path()).unwrap();
        assert_eq!(file.header().num_records, 3);
        assert_eq!(file.header().record_size().unwrap(), 12);
        assert_eq!(file.read_variable("t").unwrap(), NcValues::Double(vec![0.0, 0.5, 1.0]));
        assert_eq!(
            file.read_variable("u").unwrap(),
            NcValues::Short(vec![1, 2, 3, 4, 5, 6])
        );
    }

    #[test]
    fn test_single_subword_record_variable_unpadded() {
        let mut w = NcWriter::new();
        w.add_record_dimension("time").unwrap();
        w.add_variable("b", &["time"], NcValues::Byte(vec![1, 2, 3])).unwrap();
        let bytes = w.to_bytes().unwrap();
        let header = Header::parse(bytes.as_slice()).unwrap();
        assert_eq!(header.record_size().unwrap(), 1);
        assert_eq!(&bytes[bytes.len() - 3..], &[1, 2, 3]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut w = NcWriter::new();
        w.add_dimension("no_of_points", 4).unwrap();
        let err = w
            .add_variable("cp", &["no_of_points"], NcValues::Double(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, Error::WriteFailed(_)));
        assert!(matches!(
            w.add_variable("cp", &["missing"], NcValues::Double(vec![1.0])),
            Err(Error::DimensionNotFound(_))
        ));
    }

    #[test]
    fn test_extended_type_needs_cdf5() {
        let mut w = NcWriter::new();
        w.add_dimension("n", 1).unwrap();
        w.add_variable("id", &["n"], NcValues::Int64(vec![7])).unwrap();
        assert!(w.to_bytes().is_err());

        let mut w = NcWriter::with_version(Version::Data64);
        w.add_dimension("n", 1).unwrap();
        w.add_variable("id", &["n"], NcValues::Int64(vec![7])).unwrap();
        let bytes = w.to_bytes().unwrap();
        let header = Header::parse(bytes.as_slice()).unwrap();
        assert_eq!(header.variable("id").unwrap().nc_type, NcType::Int64);
    }

    #[test]
    fn test_replace_variable_keeps_attributes() {
        let mut w = NcWriter::new();
        w.add_dimension("n", 2).unwrap();
        w.add_variable("cp", &["n"], NcValues::Double(vec![1.0, 2.0])).unwrap();
        w.add_variable_attribute("cp", "units", NcValues::text("-")).unwrap();
        w.add_variable("cp", &["n"], NcValues::Double(vec![3.0, 4.0])).unwrap();
        let bytes = w.to_bytes().unwrap();
        let header = Header::parse(bytes.as_slice()).unwrap();
        assert_eq!(header.variables.len(), 1);
        assert_eq!(header.variables[0].attributes[0].name, "units");
    }

    #[test]
    fn test_rewrite_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sol.nc");
        let mut w = NcWriter::new();
        w.add_dimension("no_of_points", 2).unwrap();
        w.add_variable("cp", &["no_of_points"], NcValues::Double(vec![1.0, 2.0])).unwrap();
        w.write(&path).unwrap();

        let old = NcFile::open(&path).unwrap();
        w.add_variable("mach", &["no_of_points"], NcValues::Double(vec![0.3, 0.4])).unwrap();
        w.write(&path).unwrap();

        let cp = old.variable("cp").unwrap();
        assert_eq!(old.read_values(cp).unwrap().to_f64_vec().unwrap(), vec![1.0, 2.0]);
        assert!(NcFile::open(&path).unwrap().has_variable("mach"));

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
