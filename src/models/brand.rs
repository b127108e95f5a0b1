//! Brand document as exchanged over HTTP.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;
use crate::models::SchemaConfig;

/// A Brand: a taxonomy concept with optional parent and external identifiers.
///
/// Optional strings decode `""` as absent, and absent values are omitted
/// when encoding, so an empty field never round-trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub pref_label: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        rename = "descriptionXML",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description_xml: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub strapline: Option<String>,
    #[serde(
        rename = "_imageUrl",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(
        rename = "parentUUID",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_uuid: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aliases: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "AlternativeIdentifiers::is_empty"
    )]
    pub alternative_identifiers: AlternativeIdentifiers,
    /// Labels of the stored node. Filled on read, ignored on write.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub types: Vec<String>,
}

/// Identifier values grouped by authority key.
///
/// A `null` value list decodes as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AlternativeIdentifiers(BTreeMap<String, Vec<String>>);

impl<'de> Deserialize<'de> for AlternativeIdentifiers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Option<Vec<String>>>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(key, values)| (key, values.unwrap_or_default()))
                .collect(),
        ))
    }
}

impl AlternativeIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// True when no authority holds a value.
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Sorts and dedups values and drops empty authorities.
    fn normalize(&mut self) {
        self.0.retain(|_, values| {
            values.sort();
            values.dedup();
            !values.is_empty()
        });
    }
}

impl Brand {
    pub fn new(uuid: impl Into<String>, pref_label: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            pref_label: pref_label.into(),
            ..Self::default()
        }
    }

    /// Decodes and validates a request body.
    pub fn from_json(body: &[u8], schema: &SchemaConfig) -> Result<Self, AppError> {
        let mut brand: Brand = serde_json::from_slice(body)?;
        brand.validate(schema)?;
        brand.normalize();
        Ok(brand)
    }

    /// Checks the document against `schema`.
    pub fn validate(&self, schema: &SchemaConfig) -> Result<(), AppError> {
        if self.uuid.is_empty() {
            return Err(AppError::Validation("uuid is required".to_string()));
        }
        if self.pref_label.is_empty() {
            return Err(AppError::Validation("prefLabel is required".to_string()));
        }
        if self.parent_uuid.as_deref() == Some(self.uuid.as_str()) {
            return Err(AppError::Validation(format!(
                "brand {} cannot be its own parent",
                self.uuid
            )));
        }
        if !self.aliases.is_empty() && !schema.supports_aliases() {
            return Err(AppError::Validation(format!(
                "aliases are not supported by schema {}",
                schema.revision()
            )));
        }
        if self.aliases.iter().any(String::is_empty) {
            return Err(AppError::Validation("aliases must not be empty".to_string()));
        }
        for (key, values) in self.alternative_identifiers.iter() {
            if schema.authority(key).is_none() {
                return Err(AppError::Validation(format!(
                    "unknown identifier authority '{}'",
                    key
                )));
            }
            if values.iter().any(String::is_empty) {
                return Err(AppError::Validation(format!(
                    "empty identifier value for '{}'",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Puts set-valued fields in canonical order.
    pub fn normalize(&mut self) {
        self.aliases.sort();
        self.aliases.dedup();
        self.types.sort();
        self.types.dedup();
        self.alternative_identifiers.normalize();
    }

    /// Scalar node properties. Absent values are left out so that a write
    /// clears anything previously stored.
    pub fn properties(&self) -> Map<String, JsonValue> {
        let mut props = Map::new();
        props.insert("uuid".to_string(), self.uuid.clone().into());
        props.insert("prefLabel".to_string(), self.pref_label.clone().into());

        let optional = [
            ("description", &self.description),
            ("descriptionXML", &self.description_xml),
            ("strapline", &self.strapline),
            ("imageUrl", &self.image_url),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                props.insert(name.to_string(), value.clone().into());
            }
        }
        if !self.aliases.is_empty() {
            props.insert("aliases".to_string(), self.aliases.clone().into());
        }
        props
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
