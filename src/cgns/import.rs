//! CGNS grid import.

use std::path::Path;

use super::grid::{CgnsGrids, CgnsSection, CgnsZone};
use super::library::{CgnsFile, CgnsLibrary, ElementType, SectionInfo, ZoneType};
use crate::util::{Error, Result};

/// Imports every zone of a CGNS container through a [`CgnsLibrary`].
pub struct CgnsImporter<L> {
    library: L,
}

impl<L: CgnsLibrary> CgnsImporter<L> {
    pub fn new(library: L) -> Self {
        Self { library }
    }

    #[inline]
    pub fn library(&self) -> &L {
        &self.library
    }

    /// Import all zones. Any failure is logged and yields `None`.
    pub fn import(&self, path: impl AsRef<Path>) -> Option<CgnsGrids> {
        let path = path.as_ref();
        match self.try_import(path) {
            Ok(grids) => Some(grids),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "CGNS import failed");
                None
            }
        }
    }

    /// Import all zones, returning the underlying error on failure.
    pub fn try_import(&self, path: impl AsRef<Path>) -> Result<CgnsGrids> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading CGNS grid");
        let file = self.library.open(path)?;

        let num_bases = file.num_bases()?;
        let mut total = 0;
        for base in 0..num_bases {
            total += file.num_zones(base)?;
        }
        if total == 0 {
            return Err(Error::Cgns(format!("file is empty: {}", path.display())));
        }

        let mut zones = Vec::with_capacity(total);
        for base in 0..num_bases {
            for index in 0..file.num_zones(base)? {
                let mut zone = CgnsZone {
                    label: file.zone_name(base, index)?,
                    base,
                    zone: index,
                    zone_type: file.zone_type(base, index)?,
                    ..CgnsZone::default()
                };
                match zone.zone_type {
                    ZoneType::Structured => import_structured(&file, &mut zone)?,
                    ZoneType::Unstructured => import_unstructured(&file, &mut zone)?,
                    ZoneType::Unknown => {
                        tracing::error!(zone = %zone.label, "user defined zones are not supported");
                    }
                }
                tracing::debug!(
                    zone = %zone.label,
                    kind = ?zone.zone_type,
                    points = zone.num_points(),
                    sections = zone.sections.len(),
                    "imported zone"
                );
                zones.push(zone);
            }
        }

        let grids = CgnsGrids::new(zones);
        tracing::info!(
            zones = grids.num_zones(),
            points = grids.total_points(),
            "imported CGNS grid"
        );
        Ok(grids)
    }
}

fn import_structured<F: CgnsFile>(file: &F, zone: &mut CgnsZone) -> Result<()> {
    let size = file.zone_size(zone.base, zone.zone)?;
    let cell_dim = file.cell_dim(zone.base)?.clamp(1, 3);
    let vertices: Vec<i64> = (0..3)
        .map(|d| if d < cell_dim { size.get(d).copied().unwrap_or(0) } else { 0 })
        .collect();

    if vertices.iter().all(|&n| n <= 0) {
        tracing::warn!(zone = %zone.label, "empty grid");
        return Ok(());
    }

    let clamp = |n: i64| n.max(1) as usize;
    zone.i_size = clamp(vertices[0]);
    zone.j_size = clamp(vertices[1]);
    zone.k_size = clamp(vertices[2]);
    let num_points = zone
        .i_size
        .checked_mul(zone.j_size)
        .and_then(|n| n.checked_mul(zone.k_size))
        .ok_or_else(|| {
            Error::Cgns(format!(
                "structured zone '{}' size {:?} overflows",
                zone.label, vertices
            ))
        })?;
    import_coordinates(file, zone, num_points)
}

fn import_unstructured<F: CgnsFile>(file: &F, zone: &mut CgnsZone) -> Result<()> {
    let size = file.zone_size(zone.base, zone.zone)?;
    if size.iter().take(3).all(|&n| n <= 0) {
        tracing::warn!(zone = %zone.label, "empty grid");
        return Ok(());
    }

    let num_points = size.first().copied().unwrap_or(0).max(0) as usize;
    import_coordinates(file, zone, num_points)?;
    import_sections(file, zone, num_points)
}

/// Read up to three coordinate arrays as doubles; missing axes are zero.
///
/// Every stored axis must hold at least `num_points` values. Storage is
/// sized from the decoded arrays, never from the declared zone size alone.
fn import_coordinates<F: CgnsFile>(file: &F, zone: &mut CgnsZone, num_points: usize) -> Result<()> {
    let ncoords = file.num_coords(zone.base, zone.zone)?;
    zone.dim = ncoords;
    if ncoords == 0 {
        if num_points > 0 {
            return Err(Error::Cgns(format!(
                "zone '{}' declares {num_points} points but has no coordinates",
                zone.label
            )));
        }
        return Ok(());
    }

    let mut axes: [Vec<f64>; 3] = Default::default();
    for (c, axis) in axes.iter_mut().enumerate().take(ncoords) {
        let coord = file.read_coord(zone.base, zone.zone, c)?;
        if coord.data.len() < num_points {
            return Err(Error::Cgns(format!(
                "coordinate '{}' of zone '{}' has {} values, expected {num_points}",
                coord.name,
                zone.label,
                coord.data.len()
            )));
        }
        let mut values = coord.data.to_f64_vec();
        values.truncate(num_points);
        *axis = values;
    }
    for axis in axes.iter_mut().skip(ncoords) {
        axis.resize(num_points, 0.0);
    }

    let [x, y, z] = axes;
    zone.point_x = x.into();
    zone.point_y = y.into();
    zone.point_z = z.into();
    Ok(())
}

fn import_sections<F: CgnsFile>(file: &F, zone: &mut CgnsZone, num_points: usize) -> Result<()> {
    let num_sections = file.num_sections(zone.base, zone.zone)?;
    if num_sections == 0 {
        tracing::error!(zone = %zone.label, "there are no sections defined in the zone");
        return Ok(());
    }

    let mut decoder = SectionDecoder {
        zone: &zone.label,
        num_points,
        reported: false,
    };
    let mut sections = Vec::with_capacity(num_sections);
    for s in 0..num_sections {
        let info = file.section_info(zone.base, zone.zone, s)?;
        let elements = file.read_elements(zone.base, zone.zone, s)?;
        let section = decoder.decode(&info, &elements)?;
        tracing::trace!(
            section = %section.label,
            bar2 = section.num_lines(),
            tri3 = section.num_triangles(),
            quad4 = section.num_quads(),
            tetra4 = section.num_tetrahedrons(),
            pyra5 = section.num_pyramids(),
            penta6 = section.num_pentahedrons(),
            hexa8 = section.num_hexahedrons(),
            "decoded section"
        );
        sections.push(section);
    }
    zone.sections = sections;
    Ok(())
}

/// Connectivity slot order of the supported linear element types.
const SLOTS: [ElementType; 7] = [
    ElementType::BAR_2,
    ElementType::TRI_3,
    ElementType::QUAD_4,
    ElementType::TETRA_4,
    ElementType::PYRA_5,
    ElementType::PENTA_6,
    ElementType::HEXA_8,
];

/// Slot of a supported linear element type in [`Connectivity`].
fn slot(ty: ElementType) -> Option<usize> {
    if !ty.is_supported() {
        return None;
    }
    SLOTS.iter().position(|&t| t == ty)
}

type Connectivity = [Vec<i32>; 7];

struct SectionDecoder<'a> {
    zone: &'a str,
    num_points: usize,
    /// Unsupported element types are reported once per zone.
    reported: bool,
}

impl SectionDecoder<'_> {
    fn decode(&mut self, info: &SectionInfo, elements: &[i64]) -> Result<CgnsSection> {
        let mut conn: Connectivity = Default::default();
        let ty = info.element_type;

        if ty == ElementType::MIXED {
            let mut i = 0;
            while i < elements.len() {
                let elem = ElementType(elements[i] as i32);
                let Some(n) = elem.node_count() else {
                    self.unsupported(elem);
                    break;
                };
                let ids = elements.get(i + 1..i + 1 + n).ok_or_else(|| {
                    Error::Cgns(format!("MIXED section '{}' is truncated", info.name))
                })?;
                match slot(elem) {
                    Some(s) => self.push(&mut conn[s], ids)?,
                    None => self.unsupported(elem),
                }
                i += n + 1;
            }
        } else {
            match (slot(ty), ty.node_count()) {
                (Some(s), Some(n)) => {
                    if elements.len() % n != 0 {
                        return Err(Error::Cgns(format!(
                            "section '{}' holds {} ids, not a multiple of {n}",
                            info.name,
                            elements.len()
                        )));
                    }
                    self.push(&mut conn[s], elements)?;
                }
                _ => self.unsupported(ty),
            }
        }

        let [bar2, tri3, quad4, tetra4, pyra5, penta6, hexa8] = conn;
        Ok(CgnsSection {
            label: info.name.clone(),
            element_type: Some(ty),
            bar2: bar2.into(),
            tri3: tri3.into(),
            quad4: quad4.into(),
            tetra4: tetra4.into(),
            pyra5: pyra5.into(),
            penta6: penta6.into(),
            hexa8: hexa8.into(),
        })
    }

    /// Append 1-based ids as 0-based point indices.
    fn push(&self, out: &mut Vec<i32>, ids: &[i64]) -> Result<()> {
        out.reserve(ids.len());
        for &id in ids {
            if id < 1 || id as u64 > self.num_points as u64 {
                return Err(Error::Cgns(format!(
                    "point id {id} out of range 1..={} in zone '{}'",
                    self.num_points, self.zone
                )));
            }
            let index =
                i32::try_from(id - 1).map_err(|_| Error::Cgns(format!("point id {id} overflows")))?;
            out.push(index);
        }
        Ok(())
    }

    fn unsupported(&mut self, ty: ElementType) {
        if !self.reported {
            tracing::warn!(zone = self.zone, element = %ty, "unsupported element type");
            self.reported = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgns::library::{BaseNode, CgnsTree, CoordData, MemoryCgns, SectionNode, ZoneNode};

    fn coords(zone: ZoneNode, n: usize) -> ZoneNode {
        zone.coord("CoordinateX", CoordData::RealDouble((0..n).map(|i| i as f64).collect()))
            .coord("CoordinateY", CoordData::RealSingle(vec![1.0; n]))
            .coord("CoordinateZ", CoordData::RealDouble(vec![2.0; n]))
    }

    fn importer(tree: CgnsTree) -> CgnsImporter<MemoryCgns> {
        let lib = MemoryCgns::new();
        lib.insert("mesh.cgns", tree);
        CgnsImporter::new(lib)
    }

    #[test]
    fn test_structured_zone() {
        let tree = CgnsTree::new()
            .base(BaseNode::new("Base").zone(coords(ZoneNode::structured("blk", [3, 2, 0]), 6)));
        let grids = importer(tree).try_import("mesh.cgns").unwrap();
        let z = &grids[0];
        assert_eq!(z.zone_type, ZoneType::Structured);
        assert_eq!((z.i_size, z.j_size, z.k_size), (3, 2, 1));
        assert_eq!(z.num_points(), 6);
        assert_eq!(z.dim, 3);
        assert_eq!(z.point(5), Some(crate::util::DVec3::new(5.0, 1.0, 2.0)));
    }

    #[test]
    fn test_unstructured_sections() {
        let zone = coords(ZoneNode::unstructured("fluid", 5, 1), 5)
            .section(SectionNode::new("tets", ElementType::TETRA_4, 1, vec![1, 2, 3, 4]))
            .section(SectionNode::new("wall", ElementType::TRI_3, 2, vec![1, 2, 3, 2, 3, 5]));
        let tree = CgnsTree::new().base(BaseNode::new("Base").zone(zone));
        let grids = importer(tree).try_import("mesh.cgns").unwrap();
        let z = &grids[0];
        assert_eq!(z.sections.len(), 2);
        assert_eq!(z.sections[0].tetra4.as_slice(), &[0, 1, 2, 3]);
        assert_eq!(z.sections[1].tri3.as_slice(), &[0, 1, 2, 1, 2, 4]);
        assert_eq!(z.sections[1].label, "wall");
    }

    #[test]
    fn test_mixed_section() {
        let mixed = vec![
            ElementType::TRI_3.0 as i64, 1, 2, 3,
            ElementType::QUAD_4.0 as i64, 1, 2, 3, 4,
            ElementType::TRI_6.0 as i64, 1, 2, 3, 4, 5, 6,
            ElementType::BAR_2.0 as i64, 5, 6,
        ];
        let zone = coords(ZoneNode::unstructured("surf", 6, 4), 6)
            .section(SectionNode::mixed("mix", 1, 4, mixed));
        let tree = CgnsTree::new().base(BaseNode::new("Base").zone(zone));
        let grids = importer(tree).try_import("mesh.cgns").unwrap();
        let s = &grids[0].sections[0];
        assert_eq!(s.num_triangles(), 1);
        assert_eq!(s.num_quads(), 1);
        assert_eq!(s.bar2.as_slice(), &[4, 5]);
        assert_eq!(s.num_elements(), 3);
    }

    #[test]
    fn test_unsupported_section_skipped() {
        let zone = coords(ZoneNode::unstructured("q", 6, 1), 6)
            .section(SectionNode::new("tri6", ElementType::TRI_6, 1, vec![1, 2, 3, 4, 5, 6]));
        let tree = CgnsTree::new().base(BaseNode::new("Base").zone(zone));
        let grids = importer(tree).try_import("mesh.cgns").unwrap();
        assert_eq!(grids[0].sections[0].num_elements(), 0);
        assert_eq!(grids[0].num_points(), 6);
    }

    #[test]
    fn test_empty_zone_kept() {
        let tree = CgnsTree::new().base(
            BaseNode::new("Base")
                .zone(ZoneNode::structured("void", [0, 0, 0]))
                .zone(coords(ZoneNode::unstructured("ok", 2, 0), 2)),
        );
        let grids = importer(tree).try_import("mesh.cgns").unwrap();
        assert_eq!(grids.num_zones(), 2);
        assert_eq!(grids[0].num_points(), 0);
        assert_eq!(grids.total_points(), 2);
    }

    #[test]
    fn test_no_zones_is_none() {
        let imp = importer(CgnsTree::new().base(BaseNode::new("Base")));
        assert!(matches!(imp.try_import("mesh.cgns"), Err(Error::Cgns(_))));
        assert!(imp.import("mesh.cgns").is_none());
        assert!(imp.import("missing.cgns").is_none());
    }

    #[test]
    fn test_out_of_range_id() {
        let zone = coords(ZoneNode::unstructured("bad", 3, 1), 3)
            .section(SectionNode::new("t", ElementType::TRI_3, 1, vec![1, 2, 9]));
        let imp = importer(CgnsTree::new().base(BaseNode::new("Base").zone(zone)));
        assert!(matches!(imp.try_import("mesh.cgns"), Err(Error::Cgns(_))));
    }

    #[test]
    fn test_short_coordinates() {
        let zone = ZoneNode::unstructured("short", 4, 1)
            .coord("CoordinateX", CoordData::RealDouble(vec![0.0; 2]));
        let imp = importer(CgnsTree::new().base(BaseNode::new("Base").zone(zone)));
        assert!(imp.try_import("mesh.cgns").is_err());
    }

    #[test]
    fn test_huge_structured_zone_is_error() {
        let zone = coords(ZoneNode::structured("big", [1 << 22; 3]), 8);
        let imp = importer(CgnsTree::new().base(BaseNode::new("Base").zone(zone)));
        assert!(matches!(imp.try_import("mesh.cgns"), Err(Error::Cgns(_))));
        assert!(imp.import("mesh.cgns").is_none());
    }

    #[test]
    fn test_declared_size_beyond_coordinates() {
        let zone = ZoneNode::unstructured("z", i64::MAX, 1)
            .coord("CoordinateX", CoordData::RealDouble(vec![0.0, 1.0]))
            .coord("CoordinateY", CoordData::RealDouble(vec![0.0, 1.0]));
        let imp = importer(CgnsTree::new().base(BaseNode::new("Base").zone(zone)));
        assert!(matches!(imp.try_import("mesh.cgns"), Err(Error::Cgns(_))));
        assert!(imp.import("mesh.cgns").is_none());
    }

    #[test]
    fn test_missing_axis_zero_filled() {
        let zone = ZoneNode::unstructured("planar", 3, 1)
            .coord("CoordinateX", CoordData::RealDouble(vec![0.0, 1.0, 2.0]))
            .coord("CoordinateY", CoordData::RealSingle(vec![3.0, 4.0, 5.0, 6.0]))
            .section(SectionNode::new("t", ElementType::TRI_3, 1, vec![1, 2, 3]));
        let grids = importer(CgnsTree::new().base(BaseNode::new("Base").zone(zone)))
            .try_import("mesh.cgns")
            .unwrap();
        let z = &grids[0];
        assert_eq!(z.dim, 2);
        assert_eq!(z.point_y.as_slice(), &[3.0, 4.0, 5.0]);
        assert_eq!(z.point_z.as_slice(), &[0.0; 3]);
    }

    #[test]
    fn test_points_without_coordinates() {
        let zone = ZoneNode::unstructured("bare", 4, 1);
        let imp = importer(CgnsTree::new().base(BaseNode::new("Base").zone(zone)));
        assert!(matches!(imp.try_import("mesh.cgns"), Err(Error::Cgns(_))));
    }

    #[test]
    fn test_slots_follow_supported_types() {
        for code in 0..=25 {
            let ty = ElementType(code);
            assert_eq!(slot(ty).is_some(), ty.is_supported(), "{ty:?}");
        }
        assert_eq!(slot(ElementType::HEXA_8), Some(6));
    }
}
