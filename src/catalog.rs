//! The aggregate `metadata.json` consumed by the static gallery.
//!
//! On disk it is a single JSON object: one key per image base name holding its
//! flattened tags, plus [`IMAGE_ORDER_KEY`] holding the display order.

use crate::error::AppError;
use crate::metadata::{FlatTags, ERROR_KEY};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const IMAGE_ORDER_KEY: &str = "image_order";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub image_order: Vec<String>,
    #[serde(flatten)]
    pub entries: BTreeMap<String, FlatTags>,
}

impl Catalog {
    /// A missing file is an empty catalog. So is an unreadable one; it is
    /// rebuilt and overwritten on the next save.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("No catalog at {:?}, starting empty", path);
            return Ok(Self::default());
        }
        let reader = BufReader::new(File::open(path)?);
        match serde_json::from_reader(reader) {
            Ok(catalog) => Ok(catalog),
            Err(e) => {
                log::warn!("Ignoring unreadable catalog {:?}: {}", path, e);
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        log::debug!("Saved {} catalog entries to {:?}", self.entries.len(), path);
        Ok(())
    }

    /// Entry exists and carries no error.
    pub fn is_complete(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map(|tags| !tags.contains_key(ERROR_KEY))
            .unwrap_or(false)
    }

    pub fn insert(&mut self, name: String, tags: FlatTags) {
        if name == IMAGE_ORDER_KEY {
            log::warn!("Image named {:?} collides with the order key; skipped", name);
            return;
        }
        self.entries.insert(name, tags);
    }

    /// Records `message` on the entry for `name`, creating it if needed.
    pub fn record_error(&mut self, name: &str, message: String) {
        if name == IMAGE_ORDER_KEY {
            return;
        }
        self.entries
            .entry(name.to_string())
            .or_default()
            .insert(ERROR_KEY.to_string(), message);
    }

    /// Drops entries whose image is gone.
    pub fn retain(&mut self, names: &HashSet<String>) {
        let before = self.entries.len();
        self.entries.retain(|name, _| names.contains(name));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            log::info!("Dropped {} catalog entries for missing images", dropped);
        }
    }
}
