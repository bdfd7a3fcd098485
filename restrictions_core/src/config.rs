//! Per-map restriction configuration.
//!
//! One JSON file per map lives at `<module-dir>/configs/<map>.json`. Rule maps
//! keep document order because message selection is "last match wins".

use std::{
    fmt, fs, io,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use bevy::math::Vec3;
use serde::{
    de::{self, MapAccess, Visitor},
    Deserialize, Deserializer,
};
use thiserror::Error;

use crate::thresholds::PopulationBounds;

/// Subdirectory of the module directory holding map configs.
pub const CONFIG_SUBDIR: &str = "configs";

/// Root of a map config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    #[serde(rename = "MapName")]
    pub map_name: Option<String>,
    #[serde(rename = "Restrictions")]
    pub restrictions: Restriction,
}

/// Population-gated rules for a single map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Restriction {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Messages")]
    pub messages: RuleSet<MessageRule>,
    #[serde(rename = "Areas")]
    pub areas: RuleSet<AreaRule>,
}

/// Chat message broadcast at round start when its bounds match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawMessageRule")]
pub struct MessageRule {
    pub bounds: PopulationBounds,
    pub message: Option<String>,
}

/// Prop placement gated by a population interval.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawAreaRule")]
pub struct AreaRule {
    pub bounds: PopulationBounds,
    pub origin: Option<Vec3>,
    pub angles: Option<Angles>,
    /// Uniform scale; `0.0` leaves the model unscaled.
    pub scale: f32,
}

impl AreaRule {
    /// Origin and angles, when both are configured.
    pub fn placement(&self) -> Option<(Vec3, Angles)> {
        Some((self.origin?, self.angles?))
    }

    pub fn scale(&self) -> Option<f32> {
        (self.scale != 0.0).then_some(self.scale)
    }
}

/// Euler orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Angles {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Angles {
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

impl From<[f32; 3]> for Angles {
    fn from([pitch, yaw, roll]: [f32; 3]) -> Self {
        Self { pitch, yaw, roll }
    }
}

impl fmt::Display for Angles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.pitch, self.yaw, self.roll)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMessageRule {
    #[serde(rename = "LessThan")]
    less_than: i32,
    #[serde(rename = "MoreThan")]
    more_than: i32,
    #[serde(rename = "Message")]
    message: Option<String>,
}

impl From<RawMessageRule> for MessageRule {
    fn from(raw: RawMessageRule) -> Self {
        Self {
            bounds: PopulationBounds::new(raw.more_than, raw.less_than),
            message: raw.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAreaRule {
    #[serde(rename = "LessThan")]
    less_than: i32,
    #[serde(rename = "MoreThan")]
    more_than: i32,
    #[serde(rename = "Origin")]
    origin: Option<String>,
    #[serde(rename = "Angles")]
    angles: Option<String>,
    #[serde(rename = "Scale")]
    scale: Option<RawScale>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawScale {
    Number(f32),
    Text(String),
}

impl TryFrom<RawAreaRule> for AreaRule {
    type Error = AreaRuleError;

    fn try_from(raw: RawAreaRule) -> Result<Self, Self::Error> {
        let origin = raw
            .origin
            .as_deref()
            .map(|text| parse_triple(text, "Origin").map(Vec3::from_array))
            .transpose()?;
        let angles = raw
            .angles
            .as_deref()
            .map(|text| parse_triple(text, "Angles").map(Angles::from))
            .transpose()?;
        let scale = match raw.scale {
            None => 0.0,
            Some(RawScale::Number(value)) => value,
            Some(RawScale::Text(text)) if text.trim().is_empty() => 0.0,
            Some(RawScale::Text(text)) => {
                text.trim()
                    .parse::<f32>()
                    .map_err(|source| AreaRuleError::InvalidScale {
                        value: text.clone(),
                        source,
                    })?
            }
        };
        Ok(Self {
            bounds: PopulationBounds::new(raw.more_than, raw.less_than),
            origin,
            angles,
            scale,
        })
    }
}

/// Rejection of a single area entry; surfaces as a parse error of the file.
#[derive(Debug, Error)]
pub enum AreaRuleError {
    #[error("{field} must hold three numbers, got '{value}'")]
    WrongArity { field: &'static str, value: String },
    #[error("invalid number '{value}' in {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        source: std::num::ParseFloatError,
    },
    #[error("invalid scale '{value}': {source}")]
    InvalidScale {
        value: String,
        source: std::num::ParseFloatError,
    },
}

fn parse_triple(text: &str, field: &'static str) -> Result<[f32; 3], AreaRuleError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(AreaRuleError::WrongArity {
            field,
            value: text.to_string(),
        });
    }
    let mut out = [0.0f32; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|source| AreaRuleError::InvalidNumber {
                field,
                value: part.to_string(),
                source,
            })?;
    }
    Ok(out)
}

/// Keyed rules in document order.
///
/// A repeated key keeps the position of its first occurrence and the value of
/// its last.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> RuleSet<T> {
    pub fn insert(&mut self, key: impl Into<String>, rule: T) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = rule,
            None => self.entries.push((key, rule)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, rule)| (key.as_str(), rule))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, rule)| rule)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for RuleSet<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut set = RuleSet::default();
        for (key, rule) in iter {
            set.insert(key, rule);
        }
        set
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RuleSet<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleSetVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for RuleSetVisitor<T> {
            type Value = RuleSet<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object of keyed rules")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut set = RuleSet {
                    entries: Vec::with_capacity(access.size_hint().unwrap_or(0)),
                };
                while let Some((key, rule)) = access.next_entry::<String, T>()? {
                    set.insert(key, rule);
                }
                Ok(set)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(RuleSet::default())
            }
        }

        deserializer.deserialize_any(RuleSetVisitor(PhantomData))
    }
}

impl MapConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, MapConfigError> {
        if !path.exists() {
            return Err(MapConfigError::Missing {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path).map_err(|source| MapConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = MapConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn area_count(&self) -> usize {
        self.restrictions.areas.len()
    }

    pub fn message_count(&self) -> usize {
        self.restrictions.messages.len()
    }
}

#[derive(Debug, Error)]
pub enum MapConfigError {
    #[error("invalid map name '{0}'")]
    InvalidMapName(String),
    #[error("no map config at {path:?}")]
    Missing { path: PathBuf },
    #[error("failed to read map config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse map config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl MapConfigError {
    /// `true` for the normal "this map has no restrictions" outcomes.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. } | Self::InvalidMapName(_))
    }
}

/// Resolve `<module_dir>/configs/<map_name>.json`.
pub fn config_path(module_dir: &Path, map_name: &str) -> Result<PathBuf, MapConfigError> {
    let valid = !map_name.is_empty()
        && map_name != "."
        && map_name != ".."
        && !map_name.contains(['/', '\\', '\0']);
    if !valid {
        return Err(MapConfigError::InvalidMapName(map_name.to_string()));
    }
    Ok(module_dir
        .join(CONFIG_SUBDIR)
        .join(format!("{map_name}.json")))
}
