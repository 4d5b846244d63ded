use crate::error::{AnnotateError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Prefix placed in front of the signal file name when exporting.
pub const DEFAULT_EXPORT_TAG: &str = "anno";

/// A finished marker list together with the file name it is offered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationExport {
    pub file_name: String,
    pub indices: Vec<usize>,
}

impl AnnotationExport {
    pub fn new(source_name: Option<&str>, tag: &str, indices: Vec<usize>) -> Self {
        Self {
            file_name: export_file_name(source_name, tag),
            indices,
        }
    }

    /// Comma-separated indices without a trailing newline.
    pub fn to_text(&self) -> String {
        self.indices
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_text()).map_err(|source| AnnotateError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write into `dir` under [`Self::file_name`], returning the full path.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        self.write_to(&path)?;
        Ok(path)
    }
}

/// `tag` followed by the final component of `source_name`.
pub fn export_file_name(source_name: Option<&str>, tag: &str) -> String {
    let base = source_name
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("annotations.csv");
    format!("{tag}{base}")
}
