//! Whole-file loading for scripts, packed values and configuration

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::{Display, Error};

/// A file that could not be read.
#[derive(Debug, Display, Error)]
#[display("Unable to open '{}' for reading: {source}", path.display())]
pub struct FileError {
    pub path: PathBuf,
    pub source: io::Error,
}

/// The raw bytes of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContents {
    contents: Vec<u8>,
}

impl FileContents {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), bytes = contents.len(), "Read file");
                Ok(Self { contents })
            }
            Err(source) => {
                tracing::error!(
                    path = %path.display(),
                    error = %source,
                    "Unable to open file for reading"
                );
                Err(FileError {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Contents as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }

    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) {
        self.contents = contents.into();
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}
