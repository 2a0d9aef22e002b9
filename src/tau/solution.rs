//! TAU solution import and export.
//!
//! A solution variable that is not in the file is not an error: the
//! importers return `Ok(None)` so callers can probe for optional fields.

use std::path::Path;

use crate::netcdf::{NcDataSet, NcFile, NcValues, NcWriter, POINT_DIMENSION};
use crate::util::{DoubleStream, Error, IntStream, Result};

/// Import a solution variable as doubles.
///
/// Every numeric external type is converted; text variables are a
/// [`Error::TypeMismatch`].
pub fn import_double(path: impl AsRef<Path>, name: &str) -> Result<Option<DoubleStream>> {
    let file = NcFile::open(path.as_ref())?;
    read_double(&file, name)
}

/// Import an integer solution variable.
///
/// Only types that fit into `i32` without loss are accepted.
pub fn import_int(path: impl AsRef<Path>, name: &str) -> Result<Option<IntStream>> {
    let file = NcFile::open(path.as_ref())?;
    let Some(values) = read_optional(&file, name)? else {
        return Ok(None);
    };
    Ok(Some(values.to_i32_vec()?.into()))
}

/// Read a double variable from an already opened file.
pub fn read_double(file: &NcFile, name: &str) -> Result<Option<DoubleStream>> {
    let Some(values) = read_optional(file, name)? else {
        return Ok(None);
    };
    Ok(Some(values.to_f64_vec()?.into()))
}

fn read_optional(file: &NcFile, name: &str) -> Result<Option<NcValues>> {
    let Some(var) = file.variable(name) else {
        tracing::debug!(path = %file.path().display(), var = name, "variable not found");
        return Ok(None);
    };
    let values = file.read_values(var)?;
    tracing::debug!(var = name, ty = %values.nc_type(), len = values.len(), "imported variable");
    Ok(Some(values))
}

/// Read a scalar global attribute. Multi-valued attributes yield their
/// first element.
pub fn get_scalar_attribute(path: impl AsRef<Path>, name: &str) -> Result<f64> {
    let file = NcFile::open(path.as_ref())?;
    let att = file
        .attribute(name)
        .ok_or_else(|| Error::AttributeNotFound(name.to_string()))?;
    att.values
        .first_f64()?
        .ok_or_else(|| Error::invalid(format!("attribute '{name}' has no values")))
}

/// List variable and global attribute names.
pub fn query(path: impl AsRef<Path>) -> Result<NcDataSet> {
    Ok(NcFile::open(path.as_ref())?.query())
}

/// Check if a file holds a variable.
pub fn has_variable(path: impl AsRef<Path>, name: &str) -> Result<bool> {
    Ok(NcFile::open(path.as_ref())?.has_variable(name))
}

/// Write a double variable over the point dimension.
///
/// An existing file is read, the variable added or replaced, and the file
/// rewritten in the same format version. Otherwise a new classic file is
/// created. The new contents are renamed over the old file, so a failed
/// export leaves it untouched.
pub fn export_double(path: impl AsRef<Path>, name: &str, values: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = if path.exists() {
        let file = NcFile::open(path)?;
        NcWriter::from_file(&file)?
    } else {
        NcWriter::new()
    };

    match writer.dimension_len(POINT_DIMENSION) {
        Some(len) if len != values.len() as u64 => {
            return Err(Error::WriteFailed(format!(
                "'{name}' has {} values, '{POINT_DIMENSION}' is {len}",
                values.len()
            )));
        }
        Some(_) => {}
        None => {
            writer.add_dimension(POINT_DIMENSION, values.len() as u64)?;
        }
    }

    writer.add_variable(name, &[POINT_DIMENSION], NcValues::Double(values.to_vec()))?;
    writer.write(path)?;
    tracing::info!(path = %path.display(), var = name, len = values.len(), "exported variable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_solution() -> NamedTempFile {
        let temp = NamedTempFile::new().unwrap();
        let mut w = NcWriter::new();
        w.add_dimension(POINT_DIMENSION, 3).unwrap();
        w.add_attribute("c_l", NcValues::Float(vec![0.25, 1.0]));
        w.add_attribute("title", NcValues::text("naca"));
        w.add_variable("cp", &[POINT_DIMENSION], NcValues::Float(vec![-0.5, 0.0, 0.5]))
            .unwrap();
        w.add_variable("global_id", &[POINT_DIMENSION], NcValues::Short(vec![7, 8, 9]))
            .unwrap();
        w.add_variable("name", &[POINT_DIMENSION], NcValues::text("abc"))
            .unwrap();
        w.write(temp.path()).unwrap();
        temp
    }

    #[test]
    fn test_import_double_converts() {
        let temp = write_solution();
        let cp = import_double(temp.path(), "cp").unwrap().unwrap();
        assert_eq!(cp.as_slice(), &[-0.5, 0.0, 0.5]);
        let ids = import_double(temp.path(), "global_id").unwrap().unwrap();
        assert_eq!(ids.as_slice(), &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_absent_variable_is_none() {
        let temp = write_solution();
        assert!(import_double(temp.path(), "density").unwrap().is_none());
        assert!(import_int(temp.path(), "density").unwrap().is_none());
    }

    #[test]
    fn test_import_int_rejects_floats() {
        let temp = write_solution();
        assert_eq!(
            import_int(temp.path(), "global_id").unwrap().unwrap().as_slice(),
            &[7, 8, 9]
        );
        assert!(matches!(
            import_int(temp.path(), "cp"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            import_double(temp.path(), "name"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_attribute() {
        let temp = write_solution();
        assert_eq!(get_scalar_attribute(temp.path(), "c_l").unwrap(), 0.25);
        assert!(matches!(
            get_scalar_attribute(temp.path(), "c_d"),
            Err(Error::AttributeNotFound(_))
        ));
        assert!(matches!(
            get_scalar_attribute(temp.path(), "title"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_query() {
        let temp = write_solution();
        let ds = query(temp.path()).unwrap();
        assert_eq!(ds.var_names, vec!["cp", "global_id", "name"]);
        assert_eq!(ds.att_names, vec!["c_l", "title"]);
        assert!(has_variable(temp.path(), "cp").unwrap());
    }

    #[test]
    fn test_export_into_existing() {
        let temp = write_solution();
        export_double(temp.path(), "mach", &[0.1, 0.2, 0.3]).unwrap();
        export_double(temp.path(), "cp", &[1.0, 2.0, 3.0]).unwrap();

        let ds = query(temp.path()).unwrap();
        assert_eq!(ds.var_names, vec!["cp", "global_id", "name", "mach"]);
        assert_eq!(
            import_double(temp.path(), "cp").unwrap().unwrap().as_slice(),
            &[1.0, 2.0, 3.0]
        );
        assert_eq!(get_scalar_attribute(temp.path(), "c_l").unwrap(), 0.25);

        assert!(matches!(
            export_double(temp.path(), "bad", &[1.0]),
            Err(Error::WriteFailed(_))
        ));
    }

    #[test]
    fn test_export_keeps_open_readers_valid() {
        let temp = write_solution();
        let before = std::fs::read(temp.path()).unwrap();
        let open = NcFile::open(temp.path()).unwrap();

        assert!(export_double(temp.path(), "bad", &[1.0]).is_err());
        assert_eq!(std::fs::read(temp.path()).unwrap(), before);

        export_double(temp.path(), "cp", &[9.0, 9.0, 9.0]).unwrap();
        let cp = read_double(&open, "cp").unwrap().unwrap();
        assert_eq!(cp.as_slice(), &[-0.5, 0.0, 0.5]);
        assert_eq!(
            import_double(temp.path(), "cp").unwrap().unwrap().as_slice(),
            &[9.0, 9.0, 9.0]
        );
    }

    #[test]
    fn test_export_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.nc");
        export_double(&path, "cp", &[1.5, 2.5]).unwrap();
        let cp = import_double(&path, "cp").unwrap().unwrap();
        assert_eq!(cp.as_slice(), &[1.5, 2.5]);
    }
}
