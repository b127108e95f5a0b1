//! Graph schema: labels and identifier authorities per schema revision.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{AuthoritySetting, SchemaSettings};
use crate::error::AppError;

/// Label carried by every persisted node.
const THING_LABEL: &str = "Thing";

/// Generic label carried by every identifier node.
const IDENTIFIER_LABEL: &str = "Identifier";

/// Labels applied to a Thing when it is written as a Brand.
const BRAND_LABELS: [&str; 3] = ["Brand", "Concept", "Classification"];

/// Revisions of the persisted Brand schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SchemaRevision {
    /// Parent relationship plus UPP and TME identifiers.
    V1,
    /// Adds aliases.
    V2,
    /// Adds Factset identifiers.
    V3,
}

impl SchemaRevision {
    pub const LATEST: SchemaRevision = SchemaRevision::V3;

    pub fn supports_aliases(self) -> bool {
        self >= SchemaRevision::V2
    }

    /// Identifier authorities known to this revision.
    pub fn authorities(self) -> Vec<Authority> {
        let mut authorities = vec![
            Authority::new("uuids", "UPPIdentifier"),
            Authority::new("TME", "TMEIdentifier"),
        ];
        if self >= SchemaRevision::V3 {
            authorities.push(Authority::new("factsetIdentifiers", "FactsetIdentifier"));
        }
        authorities
    }
}

impl Default for SchemaRevision {
    fn default() -> Self {
        Self::LATEST
    }
}

impl TryFrom<u32> for SchemaRevision {
    type Error = AppError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SchemaRevision::V1),
            2 => Ok(SchemaRevision::V2),
            3 => Ok(SchemaRevision::V3),
            other => Err(AppError::Validation(format!(
                "unknown schema revision {}",
                other
            ))),
        }
    }
}

impl From<SchemaRevision> for u32 {
    fn from(revision: SchemaRevision) -> Self {
        match revision {
            SchemaRevision::V1 => 1,
            SchemaRevision::V2 => 2,
            SchemaRevision::V3 => 3,
        }
    }
}

impl fmt::Display for SchemaRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", u32::from(*self))
    }
}

/// An external identifier system.
///
/// `key` is the field name inside `alternativeIdentifiers`; `label` is the
/// node label given to identifier nodes of this authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub key: String,
    pub label: String,
}

impl Authority {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Resolved schema used by the repository and the request decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConfig {
    revision: SchemaRevision,
    authorities: Vec<Authority>,
}

impl SchemaConfig {
    /// Schema for `revision` with its default authority table.
    pub fn new(revision: SchemaRevision) -> Self {
        Self {
            revision,
            authorities: revision.authorities(),
        }
    }

    /// Replaces the authority table.
    ///
    /// Labels end up inside Cypher text, so both labels and keys must be
    /// plain identifiers and unique.
    pub fn with_authorities(mut self, authorities: Vec<Authority>) -> Result<Self, AppError> {
        for (i, authority) in authorities.iter().enumerate() {
            validate_name(&authority.key)?;
            validate_name(&authority.label)?;
            let label = authority.label.as_str();
            if label == IDENTIFIER_LABEL || label == THING_LABEL || BRAND_LABELS.contains(&label) {
                return Err(AppError::Validation(format!(
                    "authority label '{}' is reserved",
                    authority.label
                )));
            }
            let duplicate = authorities[..i]
                .iter()
                .any(|a| a.key == authority.key || a.label == authority.label);
            if duplicate {
                return Err(AppError::Validation(format!(
                    "duplicate authority '{}'",
                    authority.key
                )));
            }
        }
        self.authorities = authorities;
        Ok(self)
    }

    /// Builds the schema from configuration settings.
    pub fn from_settings(settings: &SchemaSettings) -> Result<Self, AppError> {
        let revision = match settings.revision {
            Some(number) => SchemaRevision::try_from(number)?,
            None => SchemaRevision::LATEST,
        };
        let schema = Self::new(revision);
        match &settings.authorities {
            Some(authorities) => schema.with_authorities(
                authorities
                    .iter()
                    .map(|AuthoritySetting { key, label }| Authority::new(key, label))
                    .collect(),
            ),
            None => Ok(schema),
        }
    }

    pub fn revision(&self) -> SchemaRevision {
        self.revision
    }

    pub fn supports_aliases(&self) -> bool {
        self.revision.supports_aliases()
    }

    /// The label identifying a Brand node.
    pub fn primary_label(&self) -> &'static str {
        BRAND_LABELS[0]
    }

    /// Brand labels as a Cypher label expression, e.g. `:Brand:Concept:Classification`.
    pub fn brand_label_expression(&self) -> String {
        BRAND_LABELS.iter().map(|l| format!(":{}", l)).collect()
    }

    pub fn authorities(&self) -> &[Authority] {
        &self.authorities
    }

    /// Looks up an authority by its JSON key.
    pub fn authority(&self, key: &str) -> Option<&Authority> {
        self.authorities.iter().find(|a| a.key == key)
    }

    /// Looks up the authority whose label appears in `labels`.
    pub fn authority_for_labels<'a, I>(&self, labels: I) -> Option<&Authority>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let labels: Vec<&str> = labels.into_iter().collect();
        self.authorities
            .iter()
            .find(|a| labels.contains(&a.label.as_str()))
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self::new(SchemaRevision::LATEST)
    }
}

/// Accepts ASCII identifiers: a letter followed by letters, digits or `_`.
fn validate_name(name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "'{}' is not a valid schema name",
            name
        )))
    }
}
