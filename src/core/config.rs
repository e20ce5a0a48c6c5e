//=========================================================================
// Engine Configuration
//=========================================================================
//
// Baseline settings merged with per-start overrides.
//
// Architecture:
//   EngineBuilder ─ baseline (EngineConfig / TOML)
//                        │
//   Engine::start(overrides: toml::Table)
//                        │  with_overrides(): overrides replace keys
//                        ▼
//   injector "config" ─ EngineConfig (read by managers and services)
//
// Keys the engine does not know land in `settings`, so external
// collaborators can read their own flat values from the same table.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

//=== FaultPolicy =========================================================

/// What a tick does when a manager hook fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Stop the tick at the failing manager and report the error. The next
    /// tick starts from the first phase again.
    #[default]
    Abort,

    /// Log the failure and continue with the next manager.
    Isolate,
}

//=== EngineConfig ========================================================

/// Engine settings, registered in the injector under [`EngineConfig::ID`].
///
/// ```rust
/// # use aetheric_runtime::core::config::{EngineConfig, FaultPolicy};
/// let config = EngineConfig::from_toml_str(r#"
///     fault_policy = "isolate"
///     difficulty = "hard"
/// "#)?;
///
/// assert_eq!(config.fault_policy, FaultPolicy::Isolate);
/// assert_eq!(config.max_frame_delta_ms, 250);
/// assert_eq!(config.setting("difficulty").and_then(|v| v.as_str()), Some("hard"));
/// # Ok::<(), aetheric_runtime::core::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for a single frame delta, in milliseconds.
    pub max_frame_delta_ms: u64,
    pub fault_policy: FaultPolicy,
    /// Enables per-phase timing in the frame profiler.
    pub profiling: bool,
    /// Frames between two profiler summaries.
    pub profile_log_period: u64,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Every key not listed above.
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frame_delta_ms: 250,
            fault_policy: FaultPolicy::Abort,
            profiling: true,
            profile_log_period: 300,
            window_title: "Aetheric Engine".to_string(),
            window_width: 800,
            window_height: 600,
            settings: toml::Table::new(),
        }
    }
}

impl EngineConfig {
    /// Reserved injector id.
    pub const ID: &'static str = "config";

    //--- Construction -----------------------------------------------------

    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Returns a copy with every key of `overrides` replacing the
    /// baseline value.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if an override has the wrong type for a
    /// known key.
    pub fn with_overrides(&self, overrides: &toml::Table) -> Result<Self, ConfigError> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }

        let toml::Value::Table(mut merged) = toml::Value::try_from(self)? else {
            return Err(ConfigError::NotATable);
        };
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        Ok(toml::Value::Table(merged).try_into()?)
    }

    //--- Queries ----------------------------------------------------------

    /// Looks up a key that is not one of the engine's own fields.
    pub fn setting(&self, key: &str) -> Option<&toml::Value> {
        self.settings.get(key)
    }

    pub fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }
}

//=== ConfigError =========================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("engine configuration cannot be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("engine configuration did not serialize to a table")]
    NotATable,
}

//=========================================================================
// Unit Tests
//=========================================================================
