//! Region and travel-time datasets.
//!
//! A [`DatasetSource`] produces datasets; [`DatasetCache`] fetches each distinct
//! dataset once and hands out shared, immutable copies afterwards.

mod cache;
mod regions;
mod travel;

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::affordability::{City, DuplicatePostalCode, RegionDataset, TravelDirectory};

pub use cache::DatasetCache;
pub use regions::parse_regions;
pub use travel::parse_travel_directory;

/// File name of the city-independent travel directory.
pub const TRAVEL_DIRECTORY_FILE: &str = "travel_directory.json";

/// Cache key: one entry per city for region geometry, one for the travel directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKey {
    Regions(City),
    TravelDirectory,
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKey::Regions(city) => write!(f, "regions/{city}"),
            DatasetKey::TravelDirectory => f.write_str("travel_directory"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid dataset json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    DuplicatePostalCode(#[from] DuplicatePostalCode),
    #[error("dataset {key} unavailable: {reason}")]
    Unavailable { key: DatasetKey, reason: String },
}

/// Anything that can produce the datasets the session consumes.
pub trait DatasetSource: Send + Sync {
    fn regions(&self, city: City) -> Result<RegionDataset, DatasetError>;
    fn travel_directory(&self) -> Result<TravelDirectory, DatasetError>;
}

/// Reads `<root>/<city>.geojson` and `<root>/travel_directory.json`.
#[derive(Debug, Clone)]
pub struct FileDatasetSource {
    root: PathBuf,
}

impl FileDatasetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn regions_path(&self, city: City) -> PathBuf {
        self.root.join(format!("{}.geojson", city.slug()))
    }

    pub fn travel_directory_path(&self) -> PathBuf {
        self.root.join(TRAVEL_DIRECTORY_FILE)
    }
}

impl DatasetSource for FileDatasetSource {
    fn regions(&self, city: City) -> Result<RegionDataset, DatasetError> {
        let path = self.regions_path(city);
        let file = open(&path)?;
        parse_regions(city, BufReader::new(file))
    }

    fn travel_directory(&self) -> Result<TravelDirectory, DatasetError> {
        let path = self.travel_directory_path();
        let file = open(&path)?;
        parse_travel_directory(BufReader::new(file))
    }
}

fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}
