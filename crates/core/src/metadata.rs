//! Configuration document and input schema metadata.
//!
//! The document is JSON with two sections:
//!
//! ```json
//! {
//!   "data_import": { "file_path": "data", "file_name": "events_log.csv" },
//!   "metadata": {
//!     "data_types": { "session_id": "str", "n_results": "float" },
//!     "na_vector": ["NA", ""],
//!     "date_format": "%Y%m%d%H%M%S"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::error::{ConfigErrorCode, Error, Result};

/// Date format of the reference navigation log (`20160301103842`).
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Logical type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "str",
            Self::Integer => "int",
            Self::Float => "float",
            Self::Boolean => "bool",
            Self::Timestamp => "datetime",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "str" | "string" | "object" => Ok(Self::Text),
            "int" | "int32" | "int64" | "integer" => Ok(Self::Integer),
            "float" | "float32" | "float64" | "double" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Boolean),
            "datetime" | "timestamp" => Ok(Self::Timestamp),
            other => Err(Error::configuration(
                ConfigErrorCode::InvalidType,
                format!("unknown type descriptor '{}'", other),
            )),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

/// Where the external loader finds the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DataImport {
    /// Directory holding the log
    pub file_path: String,
    /// File name inside `file_path`
    #[validate(length(min = 1))]
    pub file_name: String,
}

impl DataImport {
    /// Full path of the event log.
    pub fn path(&self) -> PathBuf {
        Path::new(&self.file_path).join(&self.file_name)
    }
}

/// Which columns play which role in the metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ColumnRoles {
    #[validate(length(min = 1))]
    pub session: String,
    #[validate(length(min = 1))]
    pub group: String,
    #[validate(length(min = 1))]
    pub timestamp: String,
    #[validate(length(min = 1))]
    pub action: String,
    #[validate(length(min = 1))]
    pub result_count: String,
    #[validate(length(min = 1))]
    pub result_position: String,
    /// Action value marking a click on a result
    #[validate(length(min = 1))]
    pub click_action: String,
    /// Action value marking a search; `None` treats every row with a result count as a search
    pub search_action: Option<String>,
    /// Result count meaning "no results"
    pub zero_result_value: f64,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            session: "session_id".to_string(),
            group: "group".to_string(),
            timestamp: "timestamp".to_string(),
            action: "action".to_string(),
            result_count: "n_results".to_string(),
            result_position: "result_position".to_string(),
            click_action: "visitPage".to_string(),
            search_action: Some("searchResultPage".to_string()),
            zero_result_value: 0.0,
        }
    }
}

/// Static description of the event table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Metadata {
    /// Column name to type descriptor
    pub data_types: BTreeMap<String, ColumnType>,
    /// Cell values treated as missing
    #[serde(default)]
    pub na_vector: Vec<String>,
    /// strftime pattern for the timestamp column
    #[validate(length(min = 1))]
    pub date_format: String,
    #[serde(default)]
    #[validate(nested)]
    pub columns: ColumnRoles,
}

impl Metadata {
    /// Metadata describing the reference navigation log.
    pub fn navigation_defaults() -> Self {
        let data_types = [
            ("uuid", ColumnType::Text),
            ("timestamp", ColumnType::Timestamp),
            ("session_id", ColumnType::Text),
            ("group", ColumnType::Text),
            ("action", ColumnType::Text),
            ("checkin", ColumnType::Float),
            ("page_id", ColumnType::Text),
            ("n_results", ColumnType::Float),
            ("result_position", ColumnType::Float),
        ]
        .into_iter()
        .map(|(name, ty)| (name.to_string(), ty))
        .collect();

        Self {
            data_types,
            na_vector: vec!["NA".to_string(), String::new()],
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            columns: ColumnRoles::default(),
        }
    }

    /// Declared type of a column, if any.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.data_types.get(name).copied()
    }

    /// Whether a raw cell is one of the configured missing-value sentinels.
    pub fn is_na(&self, raw: &str) -> bool {
        let raw = raw.trim();
        raw.is_empty() || self.na_vector.iter().any(|na| na.trim() == raw)
    }

    /// Validates field constraints and cross-field consistency.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| {
            Error::configuration(ConfigErrorCode::MissingField, format!("metadata: {}", e))
        })?;

        if self.data_types.is_empty() {
            return Err(Error::configuration(
                ConfigErrorCode::MissingField,
                "metadata.data_types must declare at least one column",
            ));
        }

        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::configuration(
                ConfigErrorCode::InvalidDateFormat,
                format!("invalid date format '{}'", self.date_format),
            ));
        }

        let roles = &self.columns;
        let role_columns = [
            ("session", roles.session.as_str()),
            ("group", roles.group.as_str()),
            ("action", roles.action.as_str()),
            ("timestamp", roles.timestamp.as_str()),
            ("result_count", roles.result_count.as_str()),
            ("result_position", roles.result_position.as_str()),
        ];

        for (role, column) in role_columns {
            let ty = self.column_type(column).ok_or_else(|| {
                Error::configuration(
                    ConfigErrorCode::MissingField,
                    format!("{} column '{}' has no entry in metadata.data_types", role, column),
                )
            })?;
            if !role_accepts(role, ty) {
                return Err(Error::configuration(
                    ConfigErrorCode::InvalidType,
                    format!("{} column '{}' cannot have type {}", role, column, ty),
                ));
            }
        }

        Ok(())
    }
}

fn role_accepts(role: &str, ty: ColumnType) -> bool {
    match role {
        "session" | "group" | "action" => ty == ColumnType::Text,
        "timestamp" => ty != ColumnType::Boolean,
        _ => ty.is_numeric(),
    }
}

/// The full configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NavigationConfig {
    #[validate(nested)]
    pub data_import: DataImport,
    #[validate(nested)]
    pub metadata: Metadata,
}

impl NavigationConfig {
    /// Load and validate a configuration document.
    ///
    /// `NAVIGATION_DATA_IMPORT_FILE_PATH` and `NAVIGATION_DATA_IMPORT_FILE_NAME`
    /// override the import location.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(
                ConfigErrorCode::Unreadable,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;

        let mut config = Self::from_json(&raw)?;

        if let Ok(file_path) = std::env::var("NAVIGATION_DATA_IMPORT_FILE_PATH") {
            config.data_import.file_path = file_path;
        }
        if let Ok(file_name) = std::env::var("NAVIGATION_DATA_IMPORT_FILE_NAME") {
            config.data_import.file_name = file_name;
        }

        config.check()?;
        debug!(path = %path.display(), columns = config.metadata.data_types.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse a configuration document from JSON text.
    ///
    /// Type descriptors are checked before the document is decoded so an
    /// unknown descriptor reports CONF_002 rather than a generic shape error.
    pub fn from_json(raw: &str) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| Error::configuration(ConfigErrorCode::Unreadable, e.to_string()))?;

        if let Some(data_types) = document
            .get("metadata")
            .and_then(|m| m.get("data_types"))
            .and_then(|d| d.as_object())
        {
            for (column, descriptor) in data_types {
                let descriptor = descriptor.as_str().ok_or_else(|| {
                    Error::configuration(
                        ConfigErrorCode::InvalidType,
                        format!("type descriptor for column '{}' must be a string", column),
                    )
                })?;
                descriptor.parse::<ColumnType>()?;
            }
        }

        serde_json::from_value(document).map_err(|e| {
            let code = if e.is_data() {
                ConfigErrorCode::MissingField
            } else {
                ConfigErrorCode::Unreadable
            };
            Error::configuration(code, e.to_string())
        })
    }

    pub fn check(&self) -> Result<()> {
        self.data_import.validate().map_err(|e| {
            Error::configuration(ConfigErrorCode::MissingField, format!("data_import: {}", e))
        })?;
        self.metadata.check()
    }
}
