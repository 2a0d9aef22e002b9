//! TAU primary grid import.

use std::path::Path;

use rayon::prelude::*;

use super::*;
use crate::netcdf::{NcFile, ReadOptions};
use crate::util::{BBox3d, DVec3, Error, IntStream, Result, Vector3dStream};

/// A TAU primary grid: points plus element connectivity.
///
/// All connectivity streams are flattened 0-based point ids; missing
/// element kinds are empty streams.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TauGrid {
    /// Source path.
    pub label: String,
    pub points: Vector3dStream,
    pub surface_tri3: IntStream,
    pub surface_quad4: IntStream,
    pub tetrahedrons4: IntStream,
    pub pyramids5: IntStream,
    pub prisms6: IntStream,
    pub hexahedra8: IntStream,
    /// Boundary markers of the surface triangles.
    pub marker_triangles: IntStream,
    /// Boundary markers of the surface quadrilaterals.
    pub marker_quads: IntStream,
}

impl TauGrid {
    #[inline]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn num_surface_triangles(&self) -> usize {
        self.surface_tri3.len() / 3
    }

    #[inline]
    pub fn num_surface_quads(&self) -> usize {
        self.surface_quad4.len() / 4
    }

    /// Number of volume elements of all kinds.
    pub fn num_volume_elements(&self) -> usize {
        self.tetrahedrons4.len() / 4
            + self.pyramids5.len() / 5
            + self.prisms6.len() / 6
            + self.hexahedra8.len() / 8
    }

    /// Bounding box of all points.
    pub fn bounds(&self) -> BBox3d {
        BBox3d::from_points(self.points.iter().copied())
    }

    /// Release all storage.
    pub fn free(mut self) {
        tracing::trace!(label = %self.label, "freeing TAU grid");
        for stream in [
            &mut self.surface_tri3,
            &mut self.surface_quad4,
            &mut self.tetrahedrons4,
            &mut self.pyramids5,
            &mut self.prisms6,
            &mut self.hexahedra8,
            &mut self.marker_triangles,
            &mut self.marker_quads,
        ] {
            stream.free();
        }
        self.points.free();
    }
}

/// Import a complete TAU primary grid (points, surface and volume elements).
pub fn import_grid(path: impl AsRef<Path>) -> Result<TauGrid> {
    import_grid_opts(path, ReadOptions::default())
}

/// Import a complete TAU primary grid with explicit access options.
pub fn import_grid_opts(path: impl AsRef<Path>, opts: ReadOptions) -> Result<TauGrid> {
    let file = NcFile::open_opts(path.as_ref(), opts)?;
    let mut grid = read_surface(&file)?;

    grid.tetrahedrons4 = read_connectivity(&file, VAR_TETRAHEDRA, 4)?;
    grid.pyramids5 = read_connectivity(&file, VAR_PYRAMIDS, 5)?;
    grid.prisms6 = read_connectivity(&file, VAR_PRISMS, 6)?;
    grid.hexahedra8 = read_connectivity(&file, VAR_HEXAHEDRA, 8)?;

    let markers = read_ints(&file, VAR_SURFACE_MARKERS)?;
    let (tri, quad) = split_markers(
        markers,
        grid.num_surface_triangles(),
        grid.num_surface_quads(),
        false,
    );
    grid.marker_triangles = tri;
    grid.marker_quads = quad;

    tracing::info!(
        label = %grid.label,
        points = grid.num_points(),
        triangles = grid.num_surface_triangles(),
        quads = grid.num_surface_quads(),
        volume_elements = grid.num_volume_elements(),
        "imported TAU grid"
    );
    Ok(grid)
}

/// Import only the points, surface elements and surface markers.
pub fn import_surface_grid(path: impl AsRef<Path>) -> Result<TauGrid> {
    import_surface_grid_opts(path, ReadOptions::default())
}

/// Import the surface part of a TAU grid with explicit access options.
pub fn import_surface_grid_opts(path: impl AsRef<Path>, opts: ReadOptions) -> Result<TauGrid> {
    let file = NcFile::open_opts(path.as_ref(), opts)?;
    let mut grid = read_surface(&file)?;

    let markers = read_ints(&file, VAR_SURFACE_MARKERS)?;
    let (tri, quad) = split_markers(
        markers,
        grid.num_surface_triangles(),
        grid.num_surface_quads(),
        true,
    );
    grid.marker_triangles = tri;
    grid.marker_quads = quad;

    tracing::info!(
        label = %grid.label,
        points = grid.num_points(),
        triangles = grid.num_surface_triangles(),
        quads = grid.num_surface_quads(),
        "imported TAU surface grid"
    );
    Ok(grid)
}

/// Points and surface connectivity shared by both import flavours.
fn read_surface(file: &NcFile) -> Result<TauGrid> {
    let points = read_points(file)?;
    let surface_tri3 = read_connectivity(file, VAR_SURFACE_TRIANGLES, 3)?;
    let surface_quad4 = read_connectivity(file, VAR_SURFACE_QUADS, 4)?;
    Ok(TauGrid {
        label: file.path().to_string_lossy().into_owned(),
        points,
        surface_tri3,
        surface_quad4,
        ..TauGrid::default()
    })
}

/// Read the three coordinate axes. Missing axes are zero; the point count
/// is the length of the longest axis.
fn read_points(file: &NcFile) -> Result<Vector3dStream> {
    let mut axes = [VAR_POINTS_X, VAR_POINTS_Y, VAR_POINTS_Z]
        .into_iter()
        .map(|name| match file.variable(name) {
            Some(var) => file.read_values(var)?.to_f64_vec(),
            None => Ok(Vec::new()),
        })
        .collect::<Result<Vec<_>>>()?;

    let n = axes.iter().map(Vec::len).max().unwrap_or(0);
    if n == 0 {
        tracing::warn!(path = %file.path().display(), "grid has no points");
    }
    for axis in &mut axes {
        axis.resize(n, 0.0);
    }

    let [xs, ys, zs] = [&axes[0], &axes[1], &axes[2]];
    let points: Vec<DVec3> = (0..n)
        .into_par_iter()
        .map(|i| DVec3::new(xs[i], ys[i], zs[i]))
        .collect();
    Ok(points.into())
}

/// Read an optional integer variable; missing variables are empty.
fn read_ints(file: &NcFile, name: &str) -> Result<IntStream> {
    match file.variable(name) {
        Some(var) => Ok(file.read_values(var)?.to_i32_vec()?.into()),
        None => Ok(IntStream::new()),
    }
}

/// Read a connectivity variable of `arity` point ids per element.
fn read_connectivity(file: &NcFile, name: &str, arity: usize) -> Result<IntStream> {
    let ids = read_ints(file, name)?;
    if ids.len() % arity != 0 {
        return Err(Error::invalid(format!(
            "'{name}' holds {} ids, not a multiple of {arity}",
            ids.len()
        )));
    }
    tracing::debug!(var = name, elements = ids.len() / arity, "read connectivity");
    Ok(ids)
}

/// Split surface markers into triangle and quad markers.
///
/// Triangles take the first `num_tris` markers. Quads get markers only when
/// the grid has quads: all remaining ones, or at most `num_quads` when
/// `exact_quads` is set.
fn split_markers(
    markers: IntStream,
    num_tris: usize,
    num_quads: usize,
    exact_quads: bool,
) -> (IntStream, IntStream) {
    let mut markers = markers.into_vec();
    let split = num_tris.min(markers.len());
    let mut quads = markers.split_off(split);
    if num_quads == 0 {
        quads.clear();
    } else if exact_quads {
        quads.truncate(num_quads);
    }
    (markers.into(), quads.into())
}
