//! Parameter file parser.
//!
//! Parameter files are line-oriented `key: value` text, as used by TAU
//! for run settings and boundary mappings:
//!
//! ```text
//! # run settings
//! Primary grid filename: naca0012.grid
//! "wall"
//!     Markers: 3
//!     Type: euler wall
//! block end
//! "farfield"
//!     Markers: 4
//!     Type: farfield
//! block end
//! ```
//!
//! Lines before the first group belong to group 0. A line starting with
//! the group delimiter opens the next group (numbered from 1); the rest of
//! that line is the group name. A block-end line closes the open group.
//!
//! Files without delimiter lines are grouped by their terminators alone:
//!
//! ```text
//! Primary grid filename: naca0012.grid
//! Markers: 1
//! Type: euler wall
//! block end
//! Markers: 2
//! Type: farfield
//! block end
//! ```
//!
//! A block-end line outside a delimiter group closes an unnamed group made
//! of the entries since the previous group boundary. Entries of unnamed
//! groups are also found through group 0, so run settings ahead of the
//! first terminator stay reachable there. A block-end with nothing to
//! close is skipped.
//!
//! Parsing is lenient: lines without a separator, or with an empty key,
//! are skipped.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use smallvec::SmallVec;

use crate::util::{Error, Result};

/// Tokens that drive the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamFileOptions {
    group_delimiter: String,
    block_end: String,
    comment: String,
    separator: String,
}

impl ParamFileOptions {
    /// Options with the given tokens and the default `:` separator.
    /// Empty tokens disable the corresponding line class.
    pub fn new(
        group_delimiter: impl Into<String>,
        block_end: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            group_delimiter: group_delimiter.into(),
            block_end: block_end.into(),
            comment: comment.into(),
            separator: ":".to_string(),
        }
    }

    /// Use a different key/value separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    #[inline]
    pub fn group_delimiter(&self) -> &str {
        &self.group_delimiter
    }

    #[inline]
    pub fn block_end(&self) -> &str {
        &self.block_end
    }

    #[inline]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    #[inline]
    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl Default for ParamFileOptions {
    fn default() -> Self {
        Self::new("\"", "block end", "#")
    }
}

/// One `key: value` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamEntry {
    pub key: String,
    pub value: String,
    /// Group active when the line was read (0 = ungrouped).
    pub group: usize,
    /// 1-based source line.
    pub line: usize,
}

/// A parsed parameter file. Read-only after parsing.
#[derive(Clone)]
pub struct ParamFile {
    path: Option<PathBuf>,
    options: ParamFileOptions,
    entries: Vec<ParamEntry>,
    /// key -> indices into `entries`, in file order
    index: HashMap<String, SmallVec<[usize; 4]>>,
    /// name of group `g` at `g - 1`; `None` for terminator-closed groups
    group_names: Vec<Option<String>>,
}

impl ParamFile {
    /// Open and parse a parameter file.
    pub fn open(
        path: impl AsRef<Path>,
        group_delimiter: &str,
        block_end: &str,
        comment: &str,
    ) -> Result<Self> {
        Self::open_opts(path, ParamFileOptions::new(group_delimiter, block_end, comment))
    }

    /// Open and parse a parameter file with explicit options.
    pub fn open_opts(path: impl AsRef<Path>, options: ParamFileOptions) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::from_open(e, path))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            Error::Parse {
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                msg: "invalid UTF-8".to_string(),
            }
        })?;

        let mut pf = Self::parse(&text, options);
        pf.path = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            entries = pf.entries.len(),
            groups = pf.quote_groups(),
            "parsed parameter file"
        );
        Ok(pf)
    }

    /// Parse parameter text held in memory.
    pub fn parse(text: &str, options: ParamFileOptions) -> Self {
        let mut pf = Self {
            path: None,
            options,
            entries: Vec::new(),
            index: HashMap::new(),
            group_names: Vec::new(),
        };

        let mut group = 0usize;
        // first entry not yet claimed by a group
        let mut run_start = 0usize;
        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = match pf.options.comment.as_str() {
                "" => raw,
                marker => raw.find(marker).map_or(raw, |pos| &raw[..pos]),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if !pf.options.block_end.is_empty() && line == pf.options.block_end {
                if group == 0 {
                    pf.close_run(run_start, line_no);
                }
                group = 0;
                run_start = pf.entries.len();
                continue;
            }

            let delimiter = pf.options.group_delimiter.as_str();
            if !delimiter.is_empty() {
                if let Some(rest) = line.strip_prefix(delimiter) {
                    let name = rest.strip_suffix(delimiter).unwrap_or(rest).trim();
                    pf.group_names.push(Some(name.to_string()));
                    group = pf.group_names.len();
                    run_start = pf.entries.len();
                    continue;
                }
            }

            let Some(pos) = line.find(pf.options.separator.as_str()) else {
                tracing::trace!(line = line_no, text = line, "no separator, skipped");
                continue;
            };
            let key = line[..pos].trim();
            let value = line[pos + pf.options.separator.len()..].trim();
            if key.is_empty() {
                tracing::trace!(line = line_no, "empty key, skipped");
                continue;
            }

            pf.index
                .entry(key.to_string())
                .or_default()
                .push(pf.entries.len());
            pf.entries.push(ParamEntry {
                key: key.to_string(),
                value: value.to_string(),
                group,
                line: line_no,
            });
        }

        pf
    }

    /// Move the ungrouped entries from `start` on into a new unnamed group.
    fn close_run(&mut self, start: usize, line_no: usize) {
        if start >= self.entries.len() {
            tracing::trace!(line = line_no, "block end with nothing to close, skipped");
            return;
        }
        self.group_names.push(None);
        let group = self.group_names.len();
        for entry in &mut self.entries[start..] {
            entry.group = group;
        }
        tracing::trace!(line = line_no, group, "closed unnamed group");
    }

    fn in_group(&self, entry: &ParamEntry, group: usize) -> bool {
        if entry.group == group {
            return true;
        }
        group == 0
            && entry
                .group
                .checked_sub(1)
                .and_then(|g| self.group_names.get(g))
                .is_some_and(Option::is_none)
    }

    fn matches<'a>(&'a self, key: &str, group: usize) -> impl Iterator<Item = &'a ParamEntry> + 'a {
        self.index
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i])
            .filter(move |e| self.in_group(e, group))
    }

    /// First value of `key` in `group`.
    pub fn get_value(&self, key: &str, group: usize) -> Option<&str> {
        self.get_value_n(key, group, 0)
    }

    /// The `occurrence`-th (0-based) value of `key` in `group`.
    pub fn get_value_n(&self, key: &str, group: usize, occurrence: usize) -> Option<&str> {
        self.matches(key, group)
            .nth(occurrence)
            .map(|e| e.value.as_str())
    }

    /// First value of `key` in `group`, parsed as `T`.
    pub fn get_parsed<T>(&self, key: &str, group: usize) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.matches(key, group).next() {
            None => Ok(None),
            Some(entry) => entry.value.parse().map(Some).map_err(|e: T::Err| Error::Parse {
                line: entry.line,
                msg: format!("value of '{key}': {e}"),
            }),
        }
    }

    /// Number of occurrences of `key` in `group`.
    pub fn count(&self, key: &str, group: usize) -> usize {
        self.matches(key, group).count()
    }

    /// Highest group index discovered (named and unnamed groups).
    #[inline]
    pub fn quote_groups(&self) -> usize {
        self.group_names.len()
    }

    /// Name of a group (1-based). Terminator-closed groups have no name.
    pub fn group_name(&self, group: usize) -> Option<&str> {
        group
            .checked_sub(1)
            .and_then(|g| self.group_names.get(g))
            .and_then(Option::as_deref)
    }

    /// All entries in file order.
    #[inline]
    pub fn entries(&self) -> &[ParamEntry] {
        &self.entries
    }

    /// Entries of one group in file order. Group 0 includes the entries of
    /// unnamed groups.
    pub fn group_entries(&self, group: usize) -> impl Iterator<Item = &ParamEntry> {
        self.entries.iter().filter(move |e| self.in_group(e, group))
    }

    /// Source path, if parsed from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Parser options.
    #[inline]
    pub fn options(&self) -> &ParamFileOptions {
        &self.options
    }

    /// Release all parsed state.
    pub fn close(self) {
        tracing::trace!(entries = self.entries.len(), "closing parameter file");
    }
}

impl fmt::Debug for ParamFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamFile")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .field("groups", &self.group_names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BMAP: &str = "\
# Boundary mapping
Primary grid filename: naca0012.grid
Boundary mapping:    naca0012.bmap
\"wall\"
    markers: 1
    Type: euler wall   # inviscid
    Name: airfoil
block end
\"farfield\"
    markers: 2
    Type: farfield
block end
\"symmetry\"
    markers: 3
    markers: 4
    Type: symmetry plane
block end
";

    fn bmap() -> ParamFile {
        ParamFile::parse(BMAP, ParamFileOptions::default())
    }

    #[test]
    fn test_group_count_and_names() {
        let pf = bmap();
        assert_eq!(pf.quote_groups(), 3);
        assert_eq!(pf.group_name(1), Some("wall"));
        assert_eq!(pf.group_name(3), Some("symmetry"));
        assert_eq!(pf.group_name(0), None);
        assert_eq!(pf.group_name(4), None);
    }

    #[test]
    fn test_iterate_groups() {
        let pf = bmap();
        let pairs: Vec<(&str, &str)> = (1..=pf.quote_groups())
            .filter_map(|g| Some((pf.get_value_n("markers", g, 0)?, pf.get_value_n("Type", g, 0)?)))
            .collect();
        assert_eq!(
            pairs,
            vec![("1", "euler wall"), ("2", "farfield"), ("3", "symmetry plane")]
        );
    }

    #[test]
    fn test_ungrouped_lookup() {
        let pf = bmap();
        assert_eq!(pf.get_value("Primary grid filename", 0), Some("naca0012.grid"));
        assert_eq!(pf.get_value("Boundary mapping", 0), Some("naca0012.bmap"));
        assert_eq!(pf.get_value("Primary grid filename", 1), None);
        assert_eq!(pf.get_value("Type", 0), None);
    }

    #[test]
    fn test_occurrences() {
        let pf = bmap();
        assert_eq!(pf.count("markers", 3), 2);
        assert_eq!(pf.get_value_n("markers", 3, 0), Some("3"));
        assert_eq!(pf.get_value_n("markers", 3, 1), Some("4"));
        assert_eq!(pf.get_value_n("markers", 3, 2), None);
        assert_eq!(pf.get_value_n("markers", 1, 1), None);
        assert_eq!(pf.get_parsed::<i32>("markers", 2).unwrap(), Some(2));
        assert!(pf.get_parsed::<i32>("Type", 2).is_err());
        assert_eq!(pf.get_parsed::<i32>("missing", 2).unwrap(), None);
    }

    #[test]
    fn test_comment_stripped() {
        let pf = bmap();
        assert_eq!(pf.get_value("Type", 1), Some("euler wall"));
    }

    #[test]
    fn test_block_end_outside_group_keeps_parsing() {
        let text = "a: 1\nblock end\nb: 2\n";
        let pf = ParamFile::parse(text, ParamFileOptions::default());
        assert_eq!(pf.quote_groups(), 1);
        assert_eq!(pf.get_value("a", 1), Some("1"));
        assert_eq!(pf.get_value("a", 0), Some("1"));
        assert_eq!(pf.get_value("b", 0), Some("2"));
        assert_eq!(pf.get_value("b", 1), None);
    }

    #[test]
    fn test_terminator_closed_groups() {
        let text = "\
Primary grid filename: naca.grid
Markers: 1
Type: euler wall
block end
Markers: 2
Type: farfield
block end
";
        let pf = ParamFile::parse(text, ParamFileOptions::new(":", "block end", ""));
        assert_eq!(pf.quote_groups(), 2);
        assert_eq!(pf.get_value_n("Markers", 1, 0), Some("1"));
        assert_eq!(pf.get_value_n("Markers", 2, 0), Some("2"));
        assert_eq!(pf.get_value("Type", 2), Some("farfield"));
        assert_eq!(pf.get_value("Primary grid filename", 0), Some("naca.grid"));
        assert_eq!(pf.count("Markers", 0), 2);
        assert_eq!(pf.group_name(1), None);
        assert_eq!(pf.group_entries(2).count(), 2);
    }

    #[test]
    fn test_stray_block_end_skipped() {
        let text = "\"g\"\nx: 1\nblock end\nblock end\ny: 2\n";
        let pf = ParamFile::parse(text, ParamFileOptions::default());
        assert_eq!(pf.quote_groups(), 1);
        assert_eq!(pf.get_value("y", 0), Some("2"));
        assert_eq!(pf.get_value("x", 0), None);
    }

    #[test]
    fn test_lines_after_block_end_return_to_group_zero() {
        let text = "\"g\"\nx: 1\nblock end\ny: 2\n";
        let pf = ParamFile::parse(text, ParamFileOptions::default());
        assert_eq!(pf.get_value("x", 1), Some("1"));
        assert_eq!(pf.get_value("y", 0), Some("2"));
    }

    #[test]
    fn test_lenient_skip() {
        let text = "no separator here\n: empty key\nk: v\n";
        let pf = ParamFile::parse(text, ParamFileOptions::default());
        assert_eq!(pf.entries().len(), 1);
        assert_eq!(pf.entries()[0].line, 3);
    }

    #[test]
    fn test_custom_tokens() {
        let text = "[left]\nid = 5\nEND\n[right]\nid = 6\n";
        let opts = ParamFileOptions::new("[", "END", "").with_separator("=");
        let pf = ParamFile::parse(text, opts);
        assert_eq!(pf.quote_groups(), 2);
        assert_eq!(pf.group_name(1), Some("left]"));
        assert_eq!(pf.get_value("id", 2), Some("6"));
    }

    #[test]
    fn test_open_file() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(BMAP.as_bytes()).unwrap();
        let pf = ParamFile::open(temp.path(), "\"", "block end", "#").unwrap();
        assert_eq!(pf.path(), Some(temp.path()));
        assert_eq!(pf.quote_groups(), 3);
        pf.close();
    }

    #[test]
    fn test_open_missing() {
        let err = ParamFile::open("no/such/file.para", "\"", "block end", "#").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(b"a: 1\nb: \xff\n").unwrap();
        let err = ParamFile::open_opts(temp.path(), ParamFileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }
}
