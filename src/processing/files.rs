//! Output file name lists.
//!
//! Keys (all under `files.`):
//! - `mode`: `single`, `list` or `incremental`
//! - `single.filename`
//! - `list.filenames`
//! - `incremental.directory`, `.prefix`, `.extension`, `.start`, `.stop`,
//!   `.increment`
//!
//! An incremental list without `stop` is unbounded.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};

use crate::source::properties::Properties;

pub const MODE_KEY: &str = "files.mode";
pub const SINGLE_FILENAME_KEY: &str = "files.single.filename";
pub const LIST_FILENAMES_KEY: &str = "files.list.filenames";
const INCREMENTAL_PREFIX: &str = "files.incremental.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilenameList {
    Single(PathBuf),
    List(Vec<PathBuf>),
    Incremental {
        directory: PathBuf,
        prefix: String,
        extension: String,
        start: i64,
        stop: Option<i64>,
        increment: i64,
    },
}

impl FilenameList {
    pub fn single(path: impl Into<PathBuf>) -> Self {
        FilenameList::Single(path.into())
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        ensure!(!paths.is_empty(), "Empty list of output file names");
        Ok(match <[PathBuf; 1]>::try_from(paths) {
            Ok([path]) => FilenameList::Single(path),
            Err(paths) => FilenameList::List(paths),
        })
    }

    pub fn from_properties(setup: &Properties) -> Result<Self> {
        let mode = setup
            .fetch_string(MODE_KEY)
            .with_context(|| format!("Missing '{MODE_KEY}' property"))?;
        match mode {
            "single" => {
                let name = setup
                    .fetch_string(SINGLE_FILENAME_KEY)
                    .with_context(|| format!("Missing '{SINGLE_FILENAME_KEY}' property"))?;
                ensure!(!name.is_empty(), "Empty output file name");
                Ok(FilenameList::single(name))
            }
            "list" => {
                let names = setup
                    .fetch_strings(LIST_FILENAMES_KEY)
                    .with_context(|| format!("Missing '{LIST_FILENAMES_KEY}' property"))?;
                ensure!(
                    names.iter().all(|n| !n.is_empty()),
                    "Empty name in '{LIST_FILENAMES_KEY}'"
                );
                Self::from_paths(names.into_iter().map(PathBuf::from).collect())
            }
            "incremental" => Self::incremental_from_properties(setup),
            other => bail!("Unknown file list mode '{other}'"),
        }
    }

    fn incremental_from_properties(setup: &Properties) -> Result<Self> {
        let key = |name: &str| format!("{INCREMENTAL_PREFIX}{name}");
        let string = |name: &str| setup.fetch_string(&key(name)).unwrap_or("").to_string();
        let prefix = string("prefix");
        ensure!(!prefix.is_empty(), "Missing '{}' property", key("prefix"));
        let start = setup.fetch_integer(&key("start")).unwrap_or(0);
        let stop = setup.fetch_integer(&key("stop"));
        let increment = setup.fetch_integer(&key("increment")).unwrap_or(1);
        ensure!(increment != 0, "Null increment in '{}'", key("increment"));
        if let Some(stop) = stop {
            ensure!(
                (stop - start) * increment.signum() >= 0,
                "Index range {start}..={stop} is empty for increment {increment}"
            );
        }
        Ok(FilenameList::Incremental {
            directory: PathBuf::from(string("directory")),
            prefix,
            extension: string("extension"),
            start,
            stop,
            increment,
        })
    }

    /// Number of names, `None` for an unbounded list.
    pub fn len(&self) -> Option<usize> {
        match self {
            FilenameList::Single(_) => Some(1),
            FilenameList::List(paths) => Some(paths.len()),
            FilenameList::Incremental {
                start,
                stop,
                increment,
                ..
            } => stop.map(|stop| ((stop - start) / increment) as usize + 1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Whether `index` names the last file of a bounded list.
    pub fn is_last(&self, index: usize) -> bool {
        self.len().is_some_and(|len| index + 1 >= len)
    }

    pub fn get(&self, index: usize) -> Option<PathBuf> {
        if self.len().is_some_and(|len| index >= len) {
            return None;
        }
        match self {
            FilenameList::Single(path) => Some(path.clone()),
            FilenameList::List(paths) => paths.get(index).cloned(),
            FilenameList::Incremental {
                directory,
                prefix,
                extension,
                start,
                increment,
                ..
            } => {
                let number = start + increment * index as i64;
                Some(incremental_path(directory, prefix, number, extension))
            }
        }
    }
}

fn incremental_path(directory: &Path, prefix: &str, number: i64, extension: &str) -> PathBuf {
    directory.join(format!("{prefix}{number}{extension}"))
}

impl fmt::Display for FilenameList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilenameList::Single(path) => write!(f, "{}", path.display()),
            FilenameList::List(paths) => write!(f, "{} files", paths.len()),
            FilenameList::Incremental {
                directory,
                prefix,
                extension,
                start,
                stop,
                increment,
            } => {
                let first = incremental_path(directory, prefix, *start, extension);
                write!(f, "{} (step {increment}", first.display())?;
                match stop {
                    Some(stop) => write!(f, ", last index {stop})"),
                    None => write!(f, ", unbounded)"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::properties::PropertyValue;

    #[test]
    fn test_single_and_list() {
        let mut setup = Properties::new();
        setup.set_string(MODE_KEY, "single");
        setup.set_string(SINGLE_FILENAME_KEY, "out/events.txt");
        let files = FilenameList::from_properties(&setup).unwrap();
        assert_eq!(files.len(), Some(1));
        assert!(files.is_last(0));
        assert_eq!(files.get(0), Some(PathBuf::from("out/events.txt")));
        assert_eq!(files.get(1), None);

        setup.set_string(MODE_KEY, "list");
        setup.set_strings(LIST_FILENAMES_KEY, vec!["a.txt".into(), "b.txt".into()]);
        let files = FilenameList::from_properties(&setup).unwrap();
        assert_eq!(files.len(), Some(2));
        assert!(!files.is_last(0));
        assert_eq!(files.get(1), Some(PathBuf::from("b.txt")));

        setup.set_strings(LIST_FILENAMES_KEY, vec![]);
        assert!(FilenameList::from_properties(&setup).is_err());
    }

    #[test]
    fn test_incremental() {
        let mut setup = Properties::new();
        setup.set_string(MODE_KEY, "incremental");
        setup.set_string("files.incremental.directory", "/tmp/run");
        setup.set_string("files.incremental.prefix", "export_");
        setup.set_string("files.incremental.extension", ".parquet");
        setup.set_integer("files.incremental.start", 1);
        setup.set_integer("files.incremental.stop", 7);
        setup.set_integer("files.incremental.increment", 3);
        let files = FilenameList::from_properties(&setup).unwrap();
        assert_eq!(files.len(), Some(3));
        assert_eq!(files.get(2), Some(PathBuf::from("/tmp/run/export_7.parquet")));
        assert_eq!(files.get(3), None);

        setup.remove("files.incremental.stop");
        let files = FilenameList::from_properties(&setup).unwrap();
        assert_eq!(files.len(), None);
        assert!(!files.is_last(1000));
        assert_eq!(files.get(9), Some(PathBuf::from("/tmp/run/export_28.parquet")));

        setup.set_integer("files.incremental.increment", 0);
        assert!(FilenameList::from_properties(&setup).is_err());
    }

    #[test]
    fn test_bad_mode() {
        let mut setup = Properties::new();
        assert!(FilenameList::from_properties(&setup).is_err());
        setup.insert(MODE_KEY, PropertyValue::Text("tape".into()));
        assert!(FilenameList::from_properties(&setup).is_err());
    }
}
