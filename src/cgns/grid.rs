//! Decoded CGNS zones.

use std::ops::Index;

use super::library::{ElementType, ZoneType};
use crate::util::{BBox3d, DVec3, DoubleStream, IntStream};

/// Element connectivity of one section, split per element type.
///
/// Point ids are 0-based.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CgnsSection {
    pub label: String,
    pub element_type: Option<ElementType>,
    pub bar2: IntStream,
    pub tri3: IntStream,
    pub quad4: IntStream,
    pub tetra4: IntStream,
    pub pyra5: IntStream,
    pub penta6: IntStream,
    pub hexa8: IntStream,
}

impl CgnsSection {
    #[inline]
    pub fn num_lines(&self) -> usize {
        self.bar2.len() / 2
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.tri3.len() / 3
    }

    #[inline]
    pub fn num_quads(&self) -> usize {
        self.quad4.len() / 4
    }

    #[inline]
    pub fn num_tetrahedrons(&self) -> usize {
        self.tetra4.len() / 4
    }

    #[inline]
    pub fn num_pyramids(&self) -> usize {
        self.pyra5.len() / 5
    }

    #[inline]
    pub fn num_pentahedrons(&self) -> usize {
        self.penta6.len() / 6
    }

    #[inline]
    pub fn num_hexahedrons(&self) -> usize {
        self.hexa8.len() / 8
    }

    /// Number of decoded elements of all types.
    pub fn num_elements(&self) -> usize {
        self.num_lines()
            + self.num_triangles()
            + self.num_quads()
            + self.num_tetrahedrons()
            + self.num_pyramids()
            + self.num_pentahedrons()
            + self.num_hexahedrons()
    }

    fn free(&mut self) {
        for stream in [
            &mut self.bar2,
            &mut self.tri3,
            &mut self.quad4,
            &mut self.tetra4,
            &mut self.pyra5,
            &mut self.penta6,
            &mut self.hexa8,
        ] {
            stream.free();
        }
    }
}

/// One zone as a point cloud, with sections for unstructured zones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CgnsZone {
    /// Zone name.
    pub label: String,
    /// 0-based base index.
    pub base: usize,
    /// 0-based zone index within the base.
    pub zone: usize,
    pub zone_type: ZoneType,
    /// Structured vertex counts per direction (1 for unused directions).
    pub i_size: usize,
    pub j_size: usize,
    pub k_size: usize,
    /// Number of coordinate arrays in the zone.
    pub dim: usize,
    pub point_x: DoubleStream,
    pub point_y: DoubleStream,
    pub point_z: DoubleStream,
    pub sections: Vec<CgnsSection>,
}

impl CgnsZone {
    #[inline]
    pub fn num_points(&self) -> usize {
        self.point_x.len()
    }

    /// Point `i` as a vector.
    pub fn point(&self, i: usize) -> Option<DVec3> {
        Some(DVec3::new(
            *self.point_x.get(i)?,
            *self.point_y.get(i)?,
            *self.point_z.get(i)?,
        ))
    }

    /// Iterate over all points.
    pub fn points(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.point_x
            .iter()
            .zip(self.point_y.iter())
            .zip(self.point_z.iter())
            .map(|((&x, &y), &z)| DVec3::new(x, y, z))
    }

    pub fn bounds(&self) -> BBox3d {
        BBox3d::from_points(self.points())
    }

    fn free(&mut self) {
        self.point_x.free();
        self.point_y.free();
        self.point_z.free();
        for section in &mut self.sections {
            section.free();
        }
        self.sections = Vec::new();
    }
}

/// All zones of one CGNS import, in base then zone order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CgnsGrids {
    zones: Vec<CgnsZone>,
}

impl CgnsGrids {
    pub(crate) fn new(zones: Vec<CgnsZone>) -> Self {
        Self { zones }
    }

    #[inline]
    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    #[inline]
    pub fn zones(&self) -> &[CgnsZone] {
        &self.zones
    }

    pub fn get(&self, index: usize) -> Option<&CgnsZone> {
        self.zones.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CgnsZone> {
        self.zones.iter()
    }

    /// Sum of the point counts of all zones.
    pub fn total_points(&self) -> usize {
        self.zones.iter().map(CgnsZone::num_points).sum()
    }

    pub fn into_zones(self) -> Vec<CgnsZone> {
        self.zones
    }

    /// Release every zone.
    pub fn free(mut self) {
        tracing::trace!(zones = self.zones.len(), "freeing CGNS grids");
        for zone in &mut self.zones {
            zone.free();
        }
    }
}

impl Index<usize> for CgnsGrids {
    type Output = CgnsZone;

    fn index(&self, index: usize) -> &CgnsZone {
        &self.zones[index]
    }
}

impl<'a> IntoIterator for &'a CgnsGrids {
    type Item = &'a CgnsZone;
    type IntoIter = std::slice::Iter<'a, CgnsZone>;

    fn into_iter(self) -> Self::IntoIter {
        self.zones.iter()
    }
}
