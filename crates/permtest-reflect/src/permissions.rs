//! Permission gate
//!
//! A set of granted permission names that invoked methods consult before
//! doing guarded work. A missing grant is raised as a [`SecurityException`],
//! which the invoker passes through to the caller unchanged.
//!
//! ## TOML Configuration
//!
//! ```toml
//! [permissions]
//! granted = [
//!     "android.permission.INTERNET",
//!     "android.permission.ACCESS_NETWORK_STATE",
//! ]
//! ```

use std::path::Path;

use log::debug;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::error::{ConfigError, SecurityException};

/// Gate configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GateConfig {
    /// `[permissions]` table
    #[serde(default)]
    pub permissions: PermissionsSection,
}

/// `[permissions]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PermissionsSection {
    /// Permission names granted up front
    #[serde(default)]
    pub granted: Vec<String>,
}

impl GateConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

/// Shared set of granted permissions
#[derive(Debug, Default)]
pub struct PermissionGate {
    granted: RwLock<FxHashSet<String>>,
}

impl PermissionGate {
    /// Create a gate with nothing granted
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gate from configuration
    pub fn from_config(config: &GateConfig) -> Self {
        let gate = Self::new();
        for permission in &config.permissions.granted {
            gate.grant(permission);
        }
        gate
    }

    /// Grant a permission
    pub fn grant(&self, permission: &str) {
        self.granted.write().insert(permission.to_string());
    }

    /// Revoke a permission. Returns whether it was granted.
    pub fn revoke(&self, permission: &str) -> bool {
        self.granted.write().remove(permission)
    }

    /// Check if a permission is granted
    pub fn is_granted(&self, permission: &str) -> bool {
        self.granted.read().contains(permission)
    }

    /// All granted permissions, sorted
    pub fn granted(&self) -> Vec<String> {
        let mut granted: Vec<String> = self.granted.read().iter().cloned().collect();
        granted.sort_unstable();
        granted
    }

    /// Fail with a denial unless `permission` is granted.
    ///
    /// `operation` names what was attempted and leads the denial message.
    pub fn enforce(&self, permission: &str, operation: &str) -> Result<(), SecurityException> {
        if self.is_granted(permission) {
            return Ok(());
        }
        debug!("denying {}: {} not granted", operation, permission);
        Err(SecurityException::new(format!(
            "{}: requires {}",
            operation, permission
        )))
    }
}
