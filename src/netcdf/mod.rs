//! Low-level NetCDF classic container format.
//!
//! TAU primary grids and solution files are stored as classic NetCDF
//! files. This module provides direct read/write access to the format
//! without the NetCDF C library.
//!
//! ## File Structure
//!
//! ```text
//! +------------------------+
//! | Magic: "CDF" + version |  4 bytes (version 1, 2 or 5)
//! +------------------------+
//! | numrecs                |  4 bytes (8 in CDF-5), big-endian
//! +------------------------+
//! | dim_list               |  NC_DIMENSION n [name len]... | ABSENT
//! | gatt_list              |  NC_ATTRIBUTE n [name type n values]... | ABSENT
//! | var_list               |  NC_VARIABLE n [name dimids atts type vsize begin]... | ABSENT
//! +------------------------+
//! | fixed-size data        |  one padded slab per variable
//! +------------------------+
//! | record data            |  per record: one slab per record variable
//! +------------------------+
//! ```

mod format;
mod header;
mod reader;
mod types;
mod writer;

pub use format::*;
pub use header::*;
pub use reader::*;
pub use types::*;
pub use writer::*;
