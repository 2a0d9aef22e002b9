//! CGNS grid import.
//!
//! A CGNS container holds bases, each with zones. Every zone is imported
//! as a point cloud ([`CgnsZone`]); unstructured zones also carry their
//! element sections with 0-based connectivity.
//!
//! The container itself is reached through the [`CgnsLibrary`] trait.
//!
//! ```ignore
//! use cfd_dataset::cgns::{CgnsImporter, MemoryCgns};
//!
//! let importer = CgnsImporter::new(MemoryCgns::new());
//! if let Some(grids) = importer.import("wing.cgns") {
//!     println!("{} zones, {} points", grids.num_zones(), grids.total_points());
//!     grids.free();
//! }
//! ```

mod grid;
mod import;
mod library;

pub use grid::*;
pub use import::*;
pub use library::*;
