//! Map and configuration file I/O
//!
//! Maps load from JSON (either the raw snapshot form or a text-rows
//! authoring form) or from a versioned bincode blob. Every load validates the
//! result and refuses maps or configs with defects.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use tilespace_logic::config::{ConfigError, SimConfig};
use tilespace_logic::map::{FurnitureSpec, MapError, MapSnapshot};

/// Version number for binary map files (increment when format changes)
const MAP_FILE_VERSION: u32 = 1;

/// JSON map document.
///
/// Either the snapshot form (`width`, `height`, `walkable`) or the rows
/// form, where each string is one map row and `#` marks a wall.
#[derive(Deserialize)]
#[serde(untagged)]
enum MapDocument {
    Snapshot(MapSnapshot),
    Rows {
        rows: Vec<String>,
        #[serde(default)]
        furniture: Vec<FurnitureSpec>,
    },
}

impl From<MapDocument> for MapSnapshot {
    fn from(doc: MapDocument) -> Self {
        match doc {
            MapDocument::Snapshot(map) => map,
            MapDocument::Rows { rows, furniture } => {
                let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
                let mut map = MapSnapshot::from_rows(&rows);
                map.furniture = furniture;
                map
            }
        }
    }
}

/// Versioned envelope for binary maps
#[derive(Serialize, Deserialize)]
struct MapFile {
    version: u32,
    map: MapSnapshot,
}

fn checked(map: MapSnapshot) -> Result<MapSnapshot, FileError> {
    let errors = map.validate();
    if errors.is_empty() {
        Ok(map)
    } else {
        Err(FileError::InvalidMap(errors))
    }
}

/// Parse and validate a JSON map.
pub fn map_from_json_str(json: &str) -> Result<MapSnapshot, FileError> {
    let doc: MapDocument = serde_json::from_str(json)?;
    checked(doc.into())
}

/// Read and validate a JSON map.
pub fn load_map_json<R: Read>(reader: R) -> Result<MapSnapshot, FileError> {
    let doc: MapDocument = serde_json::from_reader(reader)?;
    checked(doc.into())
}

/// Write a map as a binary file.
pub fn save_map_binary<W: Write>(writer: W, map: &MapSnapshot) -> Result<(), FileError> {
    let file = MapFile {
        version: MAP_FILE_VERSION,
        map: map.clone(),
    };
    bincode::serialize_into(writer, &file)?;
    Ok(())
}

/// Read and validate a binary map file.
pub fn load_map_binary<R: Read>(reader: R) -> Result<MapSnapshot, FileError> {
    let file: MapFile = bincode::deserialize_from(reader)?;
    if file.version != MAP_FILE_VERSION {
        return Err(FileError::VersionMismatch {
            expected: MAP_FILE_VERSION,
            found: file.version,
        });
    }
    checked(file.map)
}

/// Read and validate a JSON config. Missing fields take their defaults.
pub fn load_config_json<R: Read>(reader: R) -> Result<SimConfig, FileError> {
    let config: SimConfig = serde_json::from_reader(reader)?;
    let errors = config.validate();
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(FileError::InvalidConfig(errors))
    }
}

/// Errors that can occur while reading or writing map and config files
#[derive(Debug)]
pub enum FileError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    InvalidMap(Vec<MapError>),
    InvalidConfig(Vec<ConfigError>),
}

impl From<std::io::Error> for FileError {
    fn from(e: std::io::Error) -> Self {
        FileError::Io(e)
    }
}

impl From<serde_json::Error> for FileError {
    fn from(e: serde_json::Error) -> Self {
        FileError::Json(e)
    }
}

impl From<Box<bincode::ErrorKind>> for FileError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        FileError::Bincode(e)
    }
}

fn join_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileError::Io(e) => write!(f, "IO error: {}", e),
            FileError::Json(e) => write!(f, "JSON error: {}", e),
            FileError::Bincode(e) => write!(f, "Serialization error: {}", e),
            FileError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Map file version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            FileError::InvalidMap(errors) => write!(f, "Invalid map: {}", join_errors(errors)),
            FileError::InvalidConfig(errors) => {
                write!(f, "Invalid config: {}", join_errors(errors))
            }
        }
    }
}

impl std::error::Error for FileError {}
