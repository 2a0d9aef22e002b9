//! Surface normals and STL export of TAU grids.

use std::io::Write;
use std::path::Path;

use super::TauGrid;
use crate::util::fs::replace_file;
use crate::util::{DVec3, Error, Result, Vector3dStream};

impl TauGrid {
    /// Per-point normals accumulated from the surface elements.
    ///
    /// Each triangle adds a sixth, each quadrilateral an eighth of the cross
    /// product of its edges (diagonals for quads) to every point it uses.
    /// The vectors are not normalised. The stream covers point ids up to the
    /// highest id referenced by a surface element; points off the surface
    /// stay zero.
    pub fn surface_normals(&self) -> Result<Vector3dStream> {
        let len = self
            .surface_tri3
            .iter()
            .chain(self.surface_quad4.iter())
            .map(|&id| self.point_index(id).map(|i| i + 1))
            .try_fold(0, |len, i| i.map(|i| len.max(i)))?;

        let mut normals = vec![DVec3::ZERO; len];
        for tri in self.surface_tri3.chunks_exact(3) {
            let [p0, p1, p2] = self.corners([tri[0], tri[1], tri[2]])?;
            let n = (p2 - p0).cross(p1 - p0) / 6.0;
            for &id in tri {
                normals[id as usize] += n;
            }
        }
        for quad in self.surface_quad4.chunks_exact(4) {
            let [p0, p1, p2, p3] = self.corners([quad[0], quad[1], quad[2], quad[3]])?;
            let n = (p3 - p1).cross(p2 - p0) / 8.0;
            for &id in quad {
                normals[id as usize] += n;
            }
        }

        tracing::debug!(label = %self.label, points = len, "computed surface normals");
        Ok(normals.into())
    }

    /// Write the surface as ASCII STL.
    ///
    /// With `markers`, only elements whose boundary marker is listed are
    /// written; without, every surface element is. Quadrilaterals are split
    /// into two triangles.
    pub fn export_stl(&self, path: impl AsRef<Path>, markers: Option<&[i32]>) -> Result<()> {
        let path = path.as_ref();
        let selected = |marker: Option<&i32>| match markers {
            None => true,
            Some(filter) => marker.is_some_and(|m| filter.contains(m)),
        };

        let mut facets = 0usize;
        replace_file(path, |w| {
            writeln!(w, "solid {}", self.label)?;
            for (i, tri) in self.surface_tri3.chunks_exact(3).enumerate() {
                if selected(self.marker_triangles.get(i)) {
                    write_facet(w, self.corners([tri[0], tri[1], tri[2]])?)?;
                    facets += 1;
                }
            }
            for (i, quad) in self.surface_quad4.chunks_exact(4).enumerate() {
                if selected(self.marker_quads.get(i)) {
                    let [v0, v1, v2, v3] = self.corners([quad[0], quad[1], quad[2], quad[3]])?;
                    write_facet(w, [v0, v1, v2])?;
                    write_facet(w, [v2, v3, v0])?;
                    facets += 2;
                }
            }
            writeln!(w, "endsolid {}", self.label)?;
            Ok(())
        })?;

        tracing::info!(path = %path.display(), facets, "exported STL");
        Ok(())
    }

    fn point_index(&self, id: i32) -> Result<usize> {
        usize::try_from(id)
            .ok()
            .filter(|&i| i < self.points.len())
            .ok_or_else(|| {
                Error::invalid(format!(
                    "surface point id {id} out of range 0..{}",
                    self.points.len()
                ))
            })
    }

    fn corners<const N: usize>(&self, ids: [i32; N]) -> Result<[DVec3; N]> {
        let mut out = [DVec3::ZERO; N];
        for (p, id) in out.iter_mut().zip(ids) {
            *p = self.points[self.point_index(id)?];
        }
        Ok(out)
    }
}

fn write_facet(w: &mut dyn Write, [a, b, c]: [DVec3; 3]) -> Result<()> {
    let n = (c - a).cross(b - a);
    writeln!(w, "facet normal {}\t{}\t{}", n.x, n.y, n.z)?;
    writeln!(w, "\touter loop")?;
    for v in [a, b, c] {
        writeln!(w, "\t\tvertex {}\t{}\t{}", v.x, v.y, v.z)?;
    }
    writeln!(w, "\tendloop")?;
    writeln!(w, "endfacet")?;
    Ok(())
}
