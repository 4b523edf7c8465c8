//! Reading and writing packed value files

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use derive_more::{Display, Error, From};
use escript_queue::MessageQueue;
use escript_value::{DecodeError, Runtime, Value};

use crate::file_contents::{FileContents, FileError};

#[derive(Debug, Display, Error, From)]
pub enum InspectError {
    #[display("{_0}")]
    File(FileError),

    #[display("{}: {source}", path.display())]
    #[from(ignore)]
    Decode { path: PathBuf, source: DecodeError },
}

/// Decode one packed value file.
pub fn inspect_file(rt: &Runtime, path: &Path) -> Result<Value, InspectError> {
    let contents = FileContents::open(path)?;
    rt.unpack(contents.contents()).map_err(|source| {
        tracing::warn!(path = %path.display(), error = %source, "Failed to decode packed value");
        InspectError::Decode {
            path: path.to_path_buf(),
            source,
        }
    })
}

type Loaded = (PathBuf, Result<Value, InspectError>);

/// Decode several files on a loader thread, returning results in input
/// order.
pub fn inspect_all(rt: &Runtime, paths: Vec<PathBuf>) -> Vec<Loaded> {
    // `None` marks the end of input, and is sent even if the loader panics.
    let queue: Arc<MessageQueue<Option<Loaded>>> = Arc::new(MessageQueue::new());

    struct Finished(Arc<MessageQueue<Option<Loaded>>>);

    impl Drop for Finished {
        fn drop(&mut self) {
            self.0.push_move(None);
        }
    }

    let expected = paths.len();
    let loader = {
        let finished = Finished(Arc::clone(&queue));
        let rt = rt.clone();
        thread::spawn(move || {
            for path in paths {
                let result = inspect_file(&rt, &path);
                finished.0.push_move(Some((path, result)));
            }
        })
    };

    let mut results = Vec::with_capacity(expected);
    while let Ok(Some(item)) = queue.pop_wait() {
        results.push(item);
    }
    if loader.join().is_err() {
        tracing::error!(loaded = results.len(), expected, "Loader thread panicked");
    }
    results
}

/// The sample struct written by `pack-demo`.
pub fn demo_value(rt: &Runtime) -> Value {
    rt.struct_value([
        ("name", Value::from("longsword")),
        ("damage", Value::from(12)),
        ("weight", Value::from(4.5)),
        (
            "tags",
            rt.array([Value::from("weapon"), Value::from("melee")]),
        ),
    ])
}

/// Pack `value` into a new file at `path`, returning the file size.
pub fn write_packed(value: &Value, path: &Path) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(path)?);
    value.pack_onto(&mut out)?;
    let file = out.into_inner().map_err(io::IntoInnerError::into_error)?;
    Ok(file.metadata()?.len())
}
