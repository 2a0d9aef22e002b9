//! # cfd-dataset
//!
//! Import layer for CFD meshes and solutions: TAU primary grids and
//! solution files (NetCDF classic), multi-zone CGNS grids and TAU-style
//! parameter files, decoded into validated in-memory structures.
//!
//! ## Modules
//!
//! - [`util`] - Errors, typed streams, math types, logging setup
//! - [`netcdf`] - Low-level NetCDF classic container reader and writer
//! - [`param`] - Parameter file parser
//! - [`tau`] - TAU grid and solution import
//! - [`cgns`] - CGNS grid import
//!
//! ## Example
//!
//! ```ignore
//! use cfd_dataset::prelude::*;
//!
//! let grid = import_grid("naca0012.grid")?;
//! println!("{} points", grid.num_points());
//!
//! if let Some(cp) = import_double("naca0012.pval", "cp")? {
//!     println!("cp[0] = {}", cp[0]);
//! }
//! ```

pub mod util;
pub mod netcdf;
pub mod param;
pub mod tau;
pub mod cgns;

// Re-export commonly used types
pub use util::{DoubleStream, Error, IntStream, Result, TypedStream, Vector3dStream};
pub use netcdf::{NcDataSet, NcFile};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{BBox3d, DVec3, DoubleStream, Error, IntStream, Result, TypedStream, Vector3dStream};
    pub use crate::param::{ParamFile, ParamFileOptions};
    pub use crate::tau::{
        export_double, get_scalar_attribute, import_double, import_grid, import_int,
        import_surface_grid, TauGrid,
    };
    pub use crate::cgns::{CgnsGrids, CgnsImporter, CgnsLibrary, CgnsZone, MemoryCgns};
}
