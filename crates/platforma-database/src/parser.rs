//! Migration file parsing.

use crate::error::{DatabaseError, DbResult};
use crate::migration::Migration;
use crate::source::MigrationSource;

const MARKER_UP: &str = "-- +migrate Up";
const MARKER_DOWN: &str = "-- +migrate Down";
const MARKER_ID: &str = "-- +migrate ID:";

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Up,
    Down,
}

/// Parse every migration file reachable from the given source.
///
/// Subdirectories and files without a `.sql` extension are skipped. The
/// result is ordered by filename (codepoint-wise lexicographic comparison),
/// which defines the apply order within the owning repository.
pub fn parse_migrations(source: &dyn MigrationSource) -> DbResult<Vec<Migration>> {
    let entries = source.read_dir().map_err(DatabaseError::ReadDir)?;

    let mut filenames: Vec<String> = entries
        .into_iter()
        .filter(|entry| !entry.is_dir && entry.name.ends_with(".sql"))
        .map(|entry| entry.name)
        .collect();
    filenames.sort();

    filenames
        .iter()
        .map(|filename| parse_migration_file(source, filename))
        .collect()
}

/// Parse a single migration file.
///
/// Marker lines are matched after trimming. An `ID:` override is honored
/// only while no section is active and only the first one wins; once a
/// section marker has been seen, an override-looking line is ordinary
/// content.
fn parse_migration_file(source: &dyn MigrationSource, filename: &str) -> DbResult<Migration> {
    let contents = source
        .read_file(filename)
        .map_err(|source| DatabaseError::ReadFile {
            file: filename.to_string(),
            source,
        })?;

    let mut id = filename
        .strip_suffix(".sql")
        .unwrap_or(filename)
        .to_string();
    let mut id_overridden = false;

    let mut up = String::new();
    let mut down = String::new();
    let mut section: Option<Section> = None;

    for line in contents.lines() {
        let trimmed = line.trim();

        if section.is_none() {
            if let Some(rest) = trimmed.strip_prefix(MARKER_ID) {
                let override_id = rest.trim();
                if override_id.is_empty() {
                    return Err(DatabaseError::EmptyIdOverride {
                        file: filename.to_string(),
                    });
                }
                if !id_overridden {
                    id = override_id.to_string();
                    id_overridden = true;
                }
                continue;
            }
        }

        match trimmed {
            MARKER_UP => {
                section = Some(Section::Up);
                continue;
            }
            MARKER_DOWN => {
                section = Some(Section::Down);
                continue;
            }
            _ => {}
        }

        match section {
            Some(Section::Up) => {
                up.push_str(line);
                up.push('\n');
            }
            Some(Section::Down) => {
                down.push_str(line);
                down.push('\n');
            }
            None => {}
        }
    }

    let up = up.trim();
    if up.is_empty() {
        return Err(DatabaseError::MissingUpSection {
            file: filename.to_string(),
        });
    }

    Ok(Migration {
        id,
        up: up.to_string(),
        down: down.trim().to_string(),
        repository: String::new(),
    })
}
