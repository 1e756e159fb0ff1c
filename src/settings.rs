// SPDX-License-Identifier: GPL-3.0-only
//! Last used brightness per output
//!
//! Stored as a small KDL document, one node per output:
//!
//! ```kdl
//! output "eDP-1" brightness=0.5
//! output "HDMI-1" brightness=1.0
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use cosmic::iced::{
    futures::{SinkExt, Stream},
    stream,
};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};

use crate::app::AppMsg;
use crate::error::{AppError, Result};
use crate::xrandr::OutputName;

pub type BrightnessMap = HashMap<OutputName, f32>;

const FILE_NAME: &str = "brightness.kdl";
const WATCH_INTERVAL: Duration = Duration::from_secs(1);
const NODE: &str = "output";
const PROP: &str = "brightness";

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/lumonitor/brightness.kdl`
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("lumonitor").join(FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored values, or an empty map when the file is missing or unusable
    pub fn load(&self) -> BrightnessMap {
        match self.try_load() {
            Ok(map) => map,
            Err(err) => {
                warn!("ignoring stored brightness: {}", err);
                BrightnessMap::new()
            }
        }
    }

    pub fn try_load(&self) -> Result<BrightnessMap> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no settings file at {}", self.path.display());
                return Ok(BrightnessMap::new());
            }
            Err(source) => {
                return Err(AppError::SettingsIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let doc: KdlDocument = text.parse().map_err(|e: kdl::KdlError| AppError::SettingsFormat {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let mut map = BrightnessMap::new();
        for node in doc.nodes() {
            if node.name().value() != NODE {
                continue;
            }
            match read_node(node) {
                Some((name, fraction)) => {
                    map.insert(name, fraction);
                }
                None => {
                    return Err(AppError::SettingsFormat {
                        path: self.path.clone(),
                        reason: format!("bad output node: {}", node.to_string().trim()),
                    });
                }
            }
        }
        Ok(map)
    }

    /// Replace the stored values with `map`
    ///
    /// Writes a sibling temporary file and renames it over the target.
    pub fn save(&self, map: &BrightnessMap) -> Result<()> {
        let io_err = |source| AppError::SettingsIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let text = render(map);
        let tmp = self.path.with_extension("kdl.tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(io_err)?;
            file.write_all(text.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!("saved {} output(s) to {}", map.len(), self.path.display());
        Ok(())
    }

    /// Load, set one value, save; returns everything now stored
    pub fn update(&self, output: &str, fraction: f32) -> Result<BrightnessMap> {
        let mut map = self.load();
        map.insert(output.to_string(), fraction);
        self.save(&map)?;
        Ok(map)
    }

    /// Modification time of the file, None while it does not exist
    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

/// Report writes to the settings file, e.g. from desktop shortcuts running
/// the command line while the window is open
pub fn watch(store: SettingsStore) -> impl Stream<Item = AppMsg> {
    stream::channel(1, move |mut output| async move {
        let mut last = store.modified();
        loop {
            tokio::time::sleep(WATCH_INTERVAL).await;
            let modified = store.modified();
            if modified == last {
                continue;
            }
            last = modified;
            debug!("{} changed", store.path().display());
            if output.send(AppMsg::StoredBrightnessChanged).await.is_err() {
                break;
            }
        }
    })
}

fn read_node(node: &KdlNode) -> Option<(OutputName, f32)> {
    let mut name = None;
    let mut fraction = None;

    for entry in node.entries() {
        match entry.name() {
            None if name.is_none() => name = entry.value().as_string().map(str::to_string),
            Some(key) if key.value() == PROP => {
                fraction = match entry.value() {
                    KdlValue::Float(f) => Some(*f as f32),
                    KdlValue::Integer(i) => Some(*i as f32),
                    _ => None,
                };
            }
            _ => {}
        }
    }

    let fraction = crate::brightness::clamp_fraction(fraction?)?;
    Some((name?, fraction))
}

fn render(map: &BrightnessMap) -> String {
    let mut names: Vec<&OutputName> = map.keys().collect();
    names.sort();

    let mut doc = KdlDocument::new();
    for name in names {
        // Through the shortest f32 text so 0.8 is written as 0.8, not 0.800000011920929
        let value: f64 = map[name].to_string().parse().unwrap_or(1.0);

        let mut node = KdlNode::new(NODE);
        node.push(KdlEntry::new(name.as_str()));
        node.push(KdlEntry::new_prop(PROP, value));
        doc.nodes_mut().push(node);
    }
    doc.autoformat();
    doc.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("lumonitor").join(FILE_NAME))
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut map = BrightnessMap::new();
        map.insert("eDP-1".to_string(), 0.5);
        map.insert("HDMI-1".to_string(), 0.8);
        map.insert("DP-2".to_string(), 1.0);
        map.insert("weird \"name\"".to_string(), 0.33);

        store.save(&map).unwrap();
        assert_eq!(store.try_load().unwrap(), map);
    }

    #[test]
    fn test_save_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.update("eDP-1", 0.3).unwrap();
        store.update("eDP-1", 0.7).unwrap();
        let returned = store.update("HDMI-1", 0.2).unwrap();

        let map = store.load();
        assert_eq!(returned, map);
        assert_eq!(map.len(), 2);
        assert_eq!(map["eDP-1"], 0.7);
        assert_eq!(map["HDMI-1"], 0.2);
        assert!(!store.path().with_extension("kdl.tmp").exists());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.try_load().unwrap().is_empty());
        assert!(store.load().is_empty());
        assert!(store.modified().is_none());
    }

    #[test]
    fn test_update_merges_with_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let window = store_in(&dir);
        let shortcut = store_in(&dir);

        window.update("eDP-1", 0.8).unwrap();
        shortcut.update("eDP-1", 0.4).unwrap();
        let map = window.update("HDMI-1", 0.6).unwrap();

        assert_eq!(map["eDP-1"], 0.4);
        assert_eq!(map["HDMI-1"], 0.6);
        assert!(window.modified().is_some());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "output \"eDP-1\" brightness=").unwrap();

        assert!(matches!(
            store.try_load(),
            Err(AppError::SettingsFormat { .. })
        ));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_lenient_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            "version 1\noutput \"eDP-1\" brightness=1\noutput \"HDMI-1\" brightness=2.5\n",
        )
        .unwrap();

        let map = store.try_load().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["eDP-1"], 1.0);
        assert_eq!(map["HDMI-1"], 1.0);
    }

    #[test]
    fn test_node_without_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "output \"eDP-1\"\n").unwrap();
        assert!(store.try_load().is_err());
    }
}
