//! Virtual file trees that migrations are read from.

use std::fs;
use std::io;
use std::path::PathBuf;

/// One entry of a migration directory listing.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A virtual file tree of migration files.
///
/// The parser only needs a flat directory listing and the ability to open a
/// file by name; anything that can provide both can feed migrations into
/// the system.
pub trait MigrationSource: Send + Sync {
    /// List the entries of the source's root directory.
    fn read_dir(&self) -> io::Result<Vec<SourceEntry>>;

    /// Read the full contents of the named file.
    fn read_file(&self, name: &str) -> io::Result<String>;
}

/// A migration source backed by a filesystem directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MigrationSource for DirSource {
    fn read_dir(&self) -> io::Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            entries.push(SourceEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }

    fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(name))
    }
}

/// A migration source embedded in the binary.
///
/// Pairs of `(filename, contents)`, typically built with `include_str!` so
/// repositories ship their schema with the executable:
///
/// ```
/// use platforma_database::StaticSource;
///
/// static MIGRATIONS: StaticSource = StaticSource::new(&[(
///     "001_init.sql",
///     "-- +migrate Up\nCREATE TABLE IF NOT EXISTS users (id BIGINT);\n",
/// )]);
/// ```
#[derive(Debug, Clone)]
pub struct StaticSource {
    files: &'static [(&'static str, &'static str)],
}

impl StaticSource {
    pub const fn new(files: &'static [(&'static str, &'static str)]) -> Self {
        Self { files }
    }
}

impl MigrationSource for StaticSource {
    fn read_dir(&self) -> io::Result<Vec<SourceEntry>> {
        Ok(self
            .files
            .iter()
            .map(|(name, _)| SourceEntry {
                name: (*name).to_string(),
                is_dir: false,
            })
            .collect())
    }

    fn read_file(&self, name: &str) -> io::Result<String> {
        self.files
            .iter()
            .find(|(file, _)| *file == name)
            .map(|(_, contents)| (*contents).to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {name}")))
    }
}
