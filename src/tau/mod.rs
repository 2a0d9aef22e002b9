//! TAU primary grid and solution import.
//!
//! TAU stores grids and solutions as NetCDF classic files. Grids hold the
//! point coordinates in three parallel variables and the element
//! connectivity in one flattened variable per element type:
//!
//! ```text
//! points_xc / points_yc / points_zc      float|double  [no_of_points]
//! points_of_surfacetriangles             int           [no_of_surfacetriangles, 3]
//! points_of_surfacequadrilaterals        int           [.., 4]
//! points_of_tetraeders                   int           [.., 4]
//! points_of_pyramids                     int           [.., 5]
//! points_of_prisms                       int           [.., 6]
//! points_of_hexaeders                    int           [.., 8]
//! boundarymarker_of_surfaces             int           [no_of_surfaceelements]
//! ```
//!
//! Solutions hold one variable per field over `no_of_points` plus scalar
//! global attributes (force coefficients, reference values).
//!
//! Imported grids can derive per-point surface normals and be written out
//! as ASCII STL, optionally limited to a set of boundary markers.

mod grid;
mod solution;
mod surface;

pub use grid::*;
pub use solution::*;

/// X coordinates.
pub const VAR_POINTS_X: &str = "points_xc";
/// Y coordinates.
pub const VAR_POINTS_Y: &str = "points_yc";
/// Z coordinates.
pub const VAR_POINTS_Z: &str = "points_zc";
/// Surface triangles, 3 point ids each.
pub const VAR_SURFACE_TRIANGLES: &str = "points_of_surfacetriangles";
/// Surface quadrilaterals, 4 point ids each.
pub const VAR_SURFACE_QUADS: &str = "points_of_surfacequadrilaterals";
/// Tetrahedra, 4 point ids each.
pub const VAR_TETRAHEDRA: &str = "points_of_tetraeders";
/// Pyramids, 5 point ids each.
pub const VAR_PYRAMIDS: &str = "points_of_pyramids";
/// Prisms, 6 point ids each.
pub const VAR_PRISMS: &str = "points_of_prisms";
/// Hexahedra, 8 point ids each.
pub const VAR_HEXAHEDRA: &str = "points_of_hexaeders";
/// One boundary marker per surface element, triangles first.
pub const VAR_SURFACE_MARKERS: &str = "boundarymarker_of_surfaces";
