//! Access layer over a CGNS container.
//!
//! [`CgnsLibrary`] and [`CgnsFile`] mirror the mid-level CGNS calls the
//! importer needs (`cg_open`, `cg_nbases`, `cg_nzones`, `cg_zone_read`,
//! `cg_coord_read`, `cg_section_read`, `cg_elements_read`). All indices
//! are 0-based here; element connectivity is returned as stored, 1-based.
//!
//! [`MemoryCgns`] keeps decoded CGNS trees in memory.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::util::{Error, Result};

/// Zone kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ZoneType {
    #[default]
    Unknown,
    Structured,
    Unstructured,
}

/// A CGNS `ElementType_t` code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType(pub i32);

impl ElementType {
    pub const NODE: Self = Self(2);
    pub const BAR_2: Self = Self(3);
    pub const BAR_3: Self = Self(4);
    pub const TRI_3: Self = Self(5);
    pub const TRI_6: Self = Self(6);
    pub const QUAD_4: Self = Self(7);
    pub const QUAD_8: Self = Self(8);
    pub const QUAD_9: Self = Self(9);
    pub const TETRA_4: Self = Self(10);
    pub const TETRA_10: Self = Self(11);
    pub const PYRA_5: Self = Self(12);
    pub const PYRA_14: Self = Self(13);
    pub const PENTA_6: Self = Self(14);
    pub const PENTA_15: Self = Self(15);
    pub const PENTA_18: Self = Self(16);
    pub const HEXA_8: Self = Self(17);
    pub const HEXA_20: Self = Self(18);
    pub const HEXA_27: Self = Self(19);
    pub const MIXED: Self = Self(20);
    pub const PYRA_13: Self = Self(21);

    /// Nodes per element, for fixed-size element types.
    pub const fn node_count(self) -> Option<usize> {
        Some(match self.0 {
            2 => 1,
            3 => 2,
            4 => 3,
            5 => 3,
            6 => 6,
            7 => 4,
            8 => 8,
            9 => 9,
            10 => 4,
            11 => 10,
            12 => 5,
            13 => 14,
            14 => 6,
            15 => 15,
            16 => 18,
            17 => 8,
            18 => 20,
            19 => 27,
            21 => 13,
            _ => return None,
        })
    }

    /// Linear element types decoded into connectivity streams.
    pub const fn is_supported(self) -> bool {
        matches!(self.0, 3 | 5 | 7 | 10 | 12 | 14 | 17)
    }

    pub const fn name(self) -> &'static str {
        match self.0 {
            2 => "NODE",
            3 => "BAR_2",
            4 => "BAR_3",
            5 => "TRI_3",
            6 => "TRI_6",
            7 => "QUAD_4",
            8 => "QUAD_8",
            9 => "QUAD_9",
            10 => "TETRA_4",
            11 => "TETRA_10",
            12 => "PYRA_5",
            13 => "PYRA_14",
            14 => "PENTA_6",
            15 => "PENTA_15",
            16 => "PENTA_18",
            17 => "HEXA_8",
            18 => "HEXA_20",
            19 => "HEXA_27",
            20 => "MIXED",
            21 => "PYRA_13",
            _ => "unknown",
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coordinate values as stored.
#[derive(Clone, Debug, PartialEq)]
pub enum CoordData {
    RealSingle(Vec<f32>),
    RealDouble(Vec<f64>),
}

impl CoordData {
    pub fn len(&self) -> usize {
        match self {
            Self::RealSingle(v) => v.len(),
            Self::RealDouble(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::RealSingle(v) => v.iter().map(|&x| x as f64).collect(),
            Self::RealDouble(v) => v.clone(),
        }
    }
}

/// A named coordinate array (`CoordinateX`, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct CoordArray {
    pub name: String,
    pub data: CoordData,
}

/// Header of an element section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionInfo {
    pub name: String,
    pub element_type: ElementType,
    /// First element index (1-based, inclusive).
    pub start: i64,
    /// Last element index (1-based, inclusive).
    pub end: i64,
}

impl SectionInfo {
    /// Number of elements in the index range.
    pub fn num_elements(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }
}

/// Entry point of a CGNS implementation.
pub trait CgnsLibrary {
    type File: CgnsFile;

    /// Open a container read-only.
    fn open(&self, path: &Path) -> Result<Self::File>;
}

/// An open CGNS container.
pub trait CgnsFile {
    fn num_bases(&self) -> Result<usize>;

    /// Cell dimension of a base.
    fn cell_dim(&self, base: usize) -> Result<usize>;

    fn num_zones(&self, base: usize) -> Result<usize>;

    fn zone_name(&self, base: usize, zone: usize) -> Result<String>;

    fn zone_type(&self, base: usize, zone: usize) -> Result<ZoneType>;

    /// Raw `cg_zone_read` size vector. Structured: vertex sizes, cell sizes
    /// and boundary vertex sizes per index direction. Unstructured:
    /// vertex count, cell count, boundary vertex count.
    fn zone_size(&self, base: usize, zone: usize) -> Result<SmallVec<[i64; 9]>>;

    fn num_coords(&self, base: usize, zone: usize) -> Result<usize>;

    fn read_coord(&self, base: usize, zone: usize, coord: usize) -> Result<CoordArray>;

    fn num_sections(&self, base: usize, zone: usize) -> Result<usize>;

    fn section_info(&self, base: usize, zone: usize, section: usize) -> Result<SectionInfo>;

    /// Element connectivity of a section as stored (1-based point ids;
    /// MIXED sections prefix each element with its type code).
    fn read_elements(&self, base: usize, zone: usize, section: usize) -> Result<Vec<i64>>;
}

/// Element section node.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionNode {
    pub info: SectionInfo,
    pub elements: Vec<i64>,
}

impl SectionNode {
    /// Section of a single element type; the range starts at `start`.
    pub fn new(name: &str, element_type: ElementType, start: i64, elements: Vec<i64>) -> Self {
        let count = element_type
            .node_count()
            .map_or(0, |n| elements.len() / n) as i64;
        Self {
            info: SectionInfo {
                name: name.to_string(),
                element_type,
                start,
                end: start + count - 1,
            },
            elements,
        }
    }

    /// MIXED section holding `count` elements.
    pub fn mixed(name: &str, start: i64, count: usize, elements: Vec<i64>) -> Self {
        Self {
            info: SectionInfo {
                name: name.to_string(),
                element_type: ElementType::MIXED,
                start,
                end: start + count as i64 - 1,
            },
            elements,
        }
    }
}

/// Zone node.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneNode {
    pub name: String,
    pub zone_type: ZoneType,
    pub size: SmallVec<[i64; 9]>,
    pub coords: Vec<CoordArray>,
    pub sections: Vec<SectionNode>,
}

impl ZoneNode {
    /// Structured zone with `[ni, nj, nk]` vertices.
    pub fn structured(name: &str, vertices: [i64; 3]) -> Self {
        let cells = vertices.map(|n| (n - 1).max(0));
        let mut size: SmallVec<[i64; 9]> = SmallVec::new();
        size.extend_from_slice(&vertices);
        size.extend_from_slice(&cells);
        size.extend_from_slice(&[0, 0, 0]);
        Self::with_size(name, ZoneType::Structured, size)
    }

    /// Unstructured zone with the given vertex and cell counts.
    pub fn unstructured(name: &str, vertices: i64, cells: i64) -> Self {
        Self::with_size(
            name,
            ZoneType::Unstructured,
            SmallVec::from_slice(&[vertices, cells, 0]),
        )
    }

    /// Zone with an explicit kind and raw size vector.
    pub fn with_size(name: &str, zone_type: ZoneType, size: SmallVec<[i64; 9]>) -> Self {
        Self {
            name: name.to_string(),
            zone_type,
            size,
            coords: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn coord(mut self, name: &str, data: CoordData) -> Self {
        self.coords.push(CoordArray {
            name: name.to_string(),
            data,
        });
        self
    }

    pub fn section(mut self, section: SectionNode) -> Self {
        self.sections.push(section);
        self
    }
}

/// Base node.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseNode {
    pub name: String,
    pub cell_dim: usize,
    pub phys_dim: usize,
    pub zones: Vec<ZoneNode>,
}

impl BaseNode {
    /// Three-dimensional base.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cell_dim: 3,
            phys_dim: 3,
            zones: Vec::new(),
        }
    }

    pub fn dims(mut self, cell_dim: usize, phys_dim: usize) -> Self {
        self.cell_dim = cell_dim;
        self.phys_dim = phys_dim;
        self
    }

    pub fn zone(mut self, zone: ZoneNode) -> Self {
        self.zones.push(zone);
        self
    }
}

/// A whole CGNS tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CgnsTree {
    pub bases: Vec<BaseNode>,
}

impl CgnsTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(mut self, base: BaseNode) -> Self {
        self.bases.push(base);
        self
    }
}

/// In-memory CGNS library: paths map to trees.
#[derive(Default)]
pub struct MemoryCgns {
    files: RwLock<HashMap<PathBuf, Arc<CgnsTree>>>,
}

impl MemoryCgns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tree under a path, replacing any previous one.
    pub fn insert(&self, path: impl Into<PathBuf>, tree: CgnsTree) {
        self.files.write().insert(path.into(), Arc::new(tree));
    }

    /// Remove a registered tree.
    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Arc<CgnsTree>> {
        self.files.write().remove(path.as_ref())
    }
}

impl CgnsLibrary for MemoryCgns {
    type File = MemoryCgnsFile;

    fn open(&self, path: &Path) -> Result<MemoryCgnsFile> {
        let tree = self
            .files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;
        Ok(MemoryCgnsFile { tree })
    }
}

/// An open in-memory container.
pub struct MemoryCgnsFile {
    tree: Arc<CgnsTree>,
}

impl MemoryCgnsFile {
    fn base(&self, base: usize) -> Result<&BaseNode> {
        self.tree
            .bases
            .get(base)
            .ok_or_else(|| Error::Cgns(format!("no base {base}")))
    }

    fn zone(&self, base: usize, zone: usize) -> Result<&ZoneNode> {
        self.base(base)?
            .zones
            .get(zone)
            .ok_or_else(|| Error::Cgns(format!("no zone {zone} in base {base}")))
    }

    fn section(&self, base: usize, zone: usize, section: usize) -> Result<&SectionNode> {
        self.zone(base, zone)?
            .sections
            .get(section)
            .ok_or_else(|| Error::Cgns(format!("no section {section} in zone {zone}")))
    }
}

impl CgnsFile for MemoryCgnsFile {
    fn num_bases(&self) -> Result<usize> {
        Ok(self.tree.bases.len())
    }

    fn cell_dim(&self, base: usize) -> Result<usize> {
        Ok(self.base(base)?.cell_dim)
    }

    fn num_zones(&self, base: usize) -> Result<usize> {
        Ok(self.base(base)?.zones.len())
    }

    fn zone_name(&self, base: usize, zone: usize) -> Result<String> {
        Ok(self.zone(base, zone)?.name.clone())
    }

    fn zone_type(&self, base: usize, zone: usize) -> Result<ZoneType> {
        Ok(self.zone(base, zone)?.zone_type)
    }

    fn zone_size(&self, base: usize, zone: usize) -> Result<SmallVec<[i64; 9]>> {
        Ok(self.zone(base, zone)?.size.clone())
    }

    fn num_coords(&self, base: usize, zone: usize) -> Result<usize> {
        Ok(self.zone(base, zone)?.coords.len())
    }

    fn read_coord(&self, base: usize, zone: usize, coord: usize) -> Result<CoordArray> {
        self.zone(base, zone)?
            .coords
            .get(coord)
            .cloned()
            .ok_or_else(|| Error::Cgns(format!("no coordinate {coord} in zone {zone}")))
    }

    fn num_sections(&self, base: usize, zone: usize) -> Result<usize> {
        Ok(self.zone(base, zone)?.sections.len())
    }

    fn section_info(&self, base: usize, zone: usize, section: usize) -> Result<SectionInfo> {
        Ok(self.section(base, zone, section)?.info.clone())
    }

    fn read_elements(&self, base: usize, zone: usize, section: usize) -> Result<Vec<i64>> {
        Ok(self.section(base, zone, section)?.elements.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_table() {
        assert_eq!(ElementType::HEXA_8.node_count(), Some(8));
        assert_eq!(ElementType::PYRA_13.node_count(), Some(13));
        assert_eq!(ElementType::MIXED.node_count(), None);
        assert!(ElementType::TRI_3.is_supported());
        assert!(!ElementType::TRI_6.is_supported());
        assert_eq!(ElementType::PENTA_6.to_string(), "PENTA_6");
    }

    #[test]
    fn test_structured_zone_size() {
        let zone = ZoneNode::structured("blk", [3, 2, 1]);
        assert_eq!(zone.size.as_slice(), &[3, 2, 1, 2, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_section_range() {
        let s = SectionNode::new("tris", ElementType::TRI_3, 5, vec![1, 2, 3, 2, 3, 4]);
        assert_eq!((s.info.start, s.info.end), (5, 6));
        assert_eq!(s.info.num_elements(), 2);
    }

    #[test]
    fn test_memory_open() {
        let lib = MemoryCgns::new();
        lib.insert(
            "wing.cgns",
            CgnsTree::new().base(BaseNode::new("Base").zone(ZoneNode::unstructured("z", 4, 1))),
        );
        let file = lib.open(Path::new("wing.cgns")).unwrap();
        assert_eq!(file.num_bases().unwrap(), 1);
        assert_eq!(file.num_zones(0).unwrap(), 1);
        assert_eq!(file.zone_name(0, 0).unwrap(), "z");
        assert!(matches!(file.num_zones(1), Err(Error::Cgns(_))));
        assert!(matches!(
            lib.open(Path::new("other.cgns")),
            Err(Error::FileNotFound(_))
        ));
    }
}
