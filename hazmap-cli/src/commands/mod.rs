pub mod batch;
pub mod flood;
pub mod info;
pub mod list;
pub mod nearest;
pub mod profile;

use anyhow::{Context, Result};
use hazmap::{SpatialStore, SpatialStoreBuilder};
use std::path::PathBuf;

/// Where layers are loaded from, as given on the command line.
pub struct StoreSource {
    pub data_dir: Option<PathBuf>,
    pub metric_proj: Option<String>,
}

impl StoreSource {
    /// The data directory, from `--data-dir` or `HAZMAP_DATA_DIR`.
    pub fn dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let dir = std::env::var("HAZMAP_DATA_DIR").context(
                    "HAZMAP_DATA_DIR environment variable not set. Use --data-dir or set HAZMAP_DATA_DIR",
                )?;
                Ok(PathBuf::from(dir))
            }
        }
    }

    /// Load every layer.
    pub fn load(&self) -> Result<SpatialStore> {
        let mut builder = SpatialStoreBuilder::new(self.dir()?);
        if let Some(proj) = &self.metric_proj {
            builder = builder.metric_proj(proj.clone());
        }
        builder.build().context("Failed to load layers")
    }
}
