//! Integration tests for parameter file parsing.

use std::io::Write;

use cfd_dataset::param::{ParamFile, ParamFileOptions};
use cfd_dataset::Error;

use tempfile::NamedTempFile;

const BMAP: &str = r#"
# TAU boundary mapping
    Number of markers: 3

"Wing"
    Markers: 1, 2
    Type: viscous wall
    Name: wing upper
    Name: wing lower
block end

"Far field"
    Markers: 3
    Type: farfield
block end

"Symmetry"
    Markers: 4
    Type: symmetry plane
block end

# a stray block end closes nothing
block end
    Markers: 99
"#;

fn write_temp(text: &str) -> NamedTempFile {
    let mut temp = NamedTempFile::new().expect("Failed to create temp file");
    temp.write_all(text.as_bytes()).expect("Failed to write");
    temp
}

#[test]
fn test_boundary_mapping_groups() {
    let temp = write_temp(BMAP);
    let pf = ParamFile::open(temp.path(), "\"", "block end", "#").expect("Failed to open");

    assert_eq!(pf.quote_groups(), 3);

    let pairs: Vec<(String, String)> = (1..=pf.quote_groups())
        .map(|g| {
            let markers = pf.get_value_n("Markers", g, 0).expect("markers");
            let ty = pf.get_value_n("Type", g, 0).expect("type");
            (markers.to_string(), ty.to_string())
        })
        .collect();
    println!("groups: {pairs:?}");
    assert_eq!(
        pairs,
        vec![
            ("1, 2".to_string(), "viscous wall".to_string()),
            ("3".to_string(), "farfield".to_string()),
            ("4".to_string(), "symmetry plane".to_string()),
        ]
    );

    assert_eq!(pf.group_name(2), Some("Far field"));
    assert_eq!(pf.get_parsed::<u32>("Number of markers", 0).expect("parse"), Some(3));
    pf.close();
}

#[test]
fn test_occurrence_index() {
    let pf = ParamFile::parse(BMAP, ParamFileOptions::default());
    assert_eq!(pf.count("Name", 1), 2);
    assert_eq!(pf.get_value_n("Name", 1, 0), Some("wing upper"));
    assert_eq!(pf.get_value_n("Name", 1, 1), Some("wing lower"));
    for i in 2..5 {
        assert_eq!(pf.get_value_n("Name", 1, i), None);
    }
    assert_eq!(pf.get_value("Name", 2), None);
}

#[test]
fn test_stray_block_end_keeps_parsing() {
    let pf = ParamFile::parse(BMAP, ParamFileOptions::default());
    assert_eq!(pf.quote_groups(), 3);
    assert_eq!(pf.get_value("Markers", 0), Some("99"));
    assert_eq!(pf.entries().last().map(|e| e.group), Some(0));
}

const TAU_PARAM: &str = "\
Primary grid filename: naca0012.grid
Boundary mapping filename: (thisfile)
Markers: 1
Type: euler wall
Name: airfoil
block end
Markers: 2
Type: farfield
block end
Output period: 100
";

#[test]
fn test_terminated_blocks_as_groups() {
    let temp = write_temp(TAU_PARAM);
    let pf = ParamFile::open(temp.path(), ":", "block end", "").expect("Failed to open");

    assert_eq!(pf.get_value_n("Primary grid filename", 0, 0), Some("naca0012.grid"));
    assert_eq!(pf.quote_groups(), 2);
    let boundaries: Vec<(&str, &str)> = (1..=pf.quote_groups())
        .filter_map(|g| Some((pf.get_value_n("Markers", g, 0)?, pf.get_value_n("Type", g, 0)?)))
        .collect();
    assert_eq!(boundaries, [("1", "euler wall"), ("2", "farfield")]);
    assert_eq!(pf.get_parsed::<u32>("Output period", 0).expect("parse"), Some(100));
    assert_eq!(pf.get_value("Output period", 2), None);
    pf.close();
}

#[test]
fn test_no_comment_marker() {
    let text = "color: #ff0000\n";
    let pf = ParamFile::parse(text, ParamFileOptions::new("\"", "block end", ""));
    assert_eq!(pf.get_value("color", 0), Some("#ff0000"));

    let pf = ParamFile::parse(text, ParamFileOptions::default());
    assert_eq!(pf.get_value("color", 0), Some(""));
}

#[test]
fn test_missing_file() {
    let err = ParamFile::open("does/not/exist.bmap", "\"", "block end", "#")
        .expect_err("missing file must fail");
    assert!(err.is_not_found());
    assert!(matches!(err, Error::FileNotFound(_)));
}
