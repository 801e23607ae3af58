//! Persisted launch state (`launch_state.json`)
//!
//! One JSON object per launch. Operations merge the fields they produce into
//! the existing object; keys this crate does not know about are preserved.

use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr};
use solana_sdk::pubkey::Pubkey;
use std::fs;
use std::path::{Path, PathBuf};

#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchState {
    #[serde(rename = "addressLUT")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub lookup_table: Option<Pubkey>,

    #[serde(rename = "marketID")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub market_id: Option<Pubkey>,

    #[serde(rename = "targetPool")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub pool_id: Option<Pubkey>,

    #[serde(rename = "lpTokenAddr")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub lp_mint: Option<Pubkey>,

    #[serde(rename = "baseMint")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub base_mint: Option<Pubkey>,

    #[serde(rename = "quoteMint")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub quote_mint: Option<Pubkey>,

    #[serde(rename = "openTime", default)]
    pub open_time: Option<DateTime<Utc>>,
}

impl LaunchState {
    /// Copies every field that is set in `update`
    pub fn merge(&mut self, update: &LaunchState) {
        macro_rules! take {
            ($($field:ident),*) => {
                $( if update.$field.is_some() { self.$field = update.$field; } )*
            };
        }
        take!(lookup_table, market_id, pool_id, lp_mint, base_mint, quote_mint, open_time);
    }

    pub fn require_lookup_table(&self) -> BundlerResult<Pubkey> {
        self.lookup_table.ok_or_else(|| {
            BundlerError::Config("launch state has no lookup table; create one first".to_string())
        })
    }

    pub fn require_market(&self) -> BundlerResult<Pubkey> {
        self.market_id.ok_or_else(|| {
            BundlerError::Config("launch state has no market id; create the pool first".to_string())
        })
    }
}

/// Storage port for `LaunchState`
pub trait LaunchStateStore: Send + Sync {
    fn load(&self) -> BundlerResult<LaunchState>;

    /// Merge `update` into the stored state and return the result
    fn merge(&self, update: &LaunchState) -> BundlerResult<LaunchState>;
}

pub struct JsonLaunchStateStore {
    path: PathBuf,
}

impl JsonLaunchStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> BundlerResult<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str::<serde_json::Value>(&data) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(BundlerError::Config(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(BundlerError::Config(format!(
                "{} malformed: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl LaunchStateStore for JsonLaunchStateStore {
    fn load(&self) -> BundlerResult<LaunchState> {
        let object = self.read_object()?;
        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            BundlerError::Config(format!("{} malformed: {}", self.path.display(), e))
        })
    }

    fn merge(&self, update: &LaunchState) -> BundlerResult<LaunchState> {
        let mut object = self.read_object()?;
        let mut state: LaunchState =
            serde_json::from_value(serde_json::Value::Object(object.clone())).map_err(|e| {
                BundlerError::Config(format!("{} malformed: {}", self.path.display(), e))
            })?;
        state.merge(update);

        if let serde_json::Value::Object(fields) = serde_json::to_value(&state)? {
            object.extend(fields);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(
            &self.path,
            serde_json::to_string_pretty(&serde_json::Value::Object(object))?,
        )?;

        logger::debug(
            LogTag::State,
            &format!("Launch state updated in {}", self.path.display()),
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLaunchStateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().unwrap(), LaunchState::default());
    }

    #[test]
    fn test_merge_preserves_existing_and_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{ "numOfWallets": 27, "note": "keep me" }"#).unwrap();
        let store = JsonLaunchStateStore::new(&path);

        let lut = Pubkey::new_unique();
        store
            .merge(&LaunchState {
                lookup_table: Some(lut),
                ..Default::default()
            })
            .unwrap();

        let market = Pubkey::new_unique();
        let merged = store
            .merge(&LaunchState {
                market_id: Some(market),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(merged.lookup_table, Some(lut));
        assert_eq!(merged.market_id, Some(market));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["numOfWallets"], 27);
        assert_eq!(raw["note"], "keep me");
        assert_eq!(raw["addressLUT"], lut.to_string());
        assert_eq!(raw["marketID"], market.to_string());
        assert!(raw.get("targetPool").is_none());
    }

    #[test]
    fn test_reads_camel_case_keys() {
        let lut = Pubkey::new_unique();
        let json = format!(
            r#"{{ "addressLUT": "{}", "openTime": "2024-05-01T12:00:00Z" }}"#,
            lut
        );
        let state: LaunchState = serde_json::from_str(&json).unwrap();
        assert_eq!(state.require_lookup_table().unwrap(), lut);
        assert!(state.open_time.is_some());
        assert!(state.require_market().is_err());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2]").unwrap();
        let store = JsonLaunchStateStore::new(&path);
        assert!(matches!(store.load(), Err(BundlerError::Config(_))));
    }
}
