//! Persist configuration: which slices to keep and how the machine behaves.

use crate::naming::ActionStyle;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a single slice of state is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Storage key the slice is saved under. Required.
    #[serde(default)]
    pub key: Option<String>,
    /// Load action type; derived from the slice name when absent.
    #[serde(default)]
    pub action: Option<String>,
    /// Fields to keep; every field is kept when absent.
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl SliceConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Override the load action type.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Restrict the persisted fields.
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Ordered mapping from slice name (a state path) to its [`SliceConfig`].
///
/// # Examples
///
/// ```
/// use persist_machine::{SliceConfig, Structure};
///
/// let structure = Structure::new()
///     .slice("user", SliceConfig::new("@user").values(["name", "email"]))
///     .slice("data.adminAuth", SliceConfig::new("@admin"));
/// assert_eq!(structure.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    slices: Vec<(String, SliceConfig)>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slice. Declaration order is kept.
    pub fn slice(mut self, name: impl Into<String>, config: SliceConfig) -> Self {
        self.slices.push((name.into(), config));
        self
    }

    /// Parse a structure from a JSON object of `name -> config`.
    ///
    /// ```
    /// use persist_machine::Structure;
    ///
    /// let structure = Structure::from_json(r#"{
    ///     "user": { "key": "@user", "values": ["name"] },
    ///     "settings": { "key": "@settings", "action": "HYDRATE_SETTINGS" }
    /// }"#).unwrap();
    /// assert_eq!(structure.iter().next().unwrap().0, "user");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_str(json).map_err(Error::InvalidStructure)?;
        let mut structure = Self::new();
        for (name, config) in map {
            let config = serde_json::from_value(config).map_err(Error::InvalidStructure)?;
            structure.slices.push((name, config));
        }
        Ok(structure)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SliceConfig)> {
        self.slices.iter().map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Machine-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Log every save and the list of load actions at `info` level.
    pub debug: bool,
    /// Spelling of derived load action types.
    pub action_style: ActionStyle,
}

impl PersistConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_action_style(mut self, style: ActionStyle) -> Self {
        self.action_style = style;
        self
    }
}
