//! tnsnames-style descriptor parsing.
//!
//! The scan is a structural heuristic, not a grammar: it counts parentheses
//! across the whole file and treats a line as a declaration only when it
//! starts at nesting depth zero. Comments and quoted strings are not special.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::DescriptorError;

/// Top-level entry names mapped to the 1-based line where they are declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorIndex {
    entries: HashMap<String, usize>,
}

impl DescriptorIndex {
    /// Whether an entry with exactly this name was declared.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Line of the (last) declaration of `name`.
    pub fn line_of(&self, name: &str) -> Option<usize> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load and index the descriptor file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<DescriptorIndex, DescriptorError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DescriptorError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let index = parse(BufReader::new(file))?;
    debug!(
        path = %path.display(),
        entries = index.len(),
        "Descriptor loaded"
    );
    Ok(index)
}

/// Index the descriptor read from `reader`.
///
/// Any read error aborts the scan; nothing collected so far is returned.
pub fn parse<R: BufRead>(reader: R) -> Result<DescriptorIndex, DescriptorError> {
    let mut entries = HashMap::new();
    let mut depth: i64 = 0;
    let mut line_no = 1usize;

    for chunk in reader.split(b'\n') {
        let mut raw = chunk.map_err(|source| DescriptorError::Read {
            line: line_no,
            source,
        })?;
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let line = String::from_utf8_lossy(&raw);

        if depth == 0 {
            if let Some(name) = declared_name(&line) {
                entries.insert(name.to_string(), line_no);
            }
        }

        for byte in line.bytes() {
            match byte {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
        }

        line_no += 1;
    }

    Ok(DescriptorIndex { entries })
}

/// Name declared on a top-level line: text before the first `=`, trailing
/// spaces removed. A line starting with `=` declares nothing.
fn declared_name(line: &str) -> Option<&str> {
    let idx = line.find('=')?;
    if idx == 0 {
        return None;
    }
    let name = line[..idx].trim_end_matches(' ');
    (!name.is_empty()).then_some(name)
}
