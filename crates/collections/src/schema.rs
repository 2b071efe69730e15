//! Collection declarations and index mapping.
//!
//! A concrete collection implements [`Collection`]: it names its index,
//! declares a field mapping and optionally engine settings. The client uses
//! the declaration to bootstrap the index and to resolve sortable fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{CollectionError, CollectionResult};

/// Document type used when a collection does not override [`Collection::doc_type`].
pub const DEFAULT_DOC_TYPE: &str = "_doc";

/// Field type that is analyzed for full-text search and cannot be sorted on directly.
pub const FREE_TEXT_TYPE: &str = "text";

/// Sub-field that carries the sortable (keyword) copy of a free-text field.
pub const SORTABLE_SUB_FIELD: &str = "keyword";

/// Field name to mapping, ordered by name.
pub type FieldMap = BTreeMap<String, FieldMapping>;

/// Mapping of a single field.
///
/// `type` and nested `properties` are interpreted by the client; any other
/// keys (`analyzer`, `fields`, `format`, ...) are passed to the engine verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Engine field type (`text`, `keyword`, `integer`, `nested`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    /// Sub-fields of an object or nested field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: FieldMap,

    /// Remaining mapping parameters.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl FieldMapping {
    /// Creates a leaf field of the given type.
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: Some(field_type.into()),
            ..Default::default()
        }
    }

    /// Creates an object field grouping the given properties.
    pub fn object(properties: FieldMap) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    /// Creates a `nested` field grouping the given properties.
    pub fn nested(properties: FieldMap) -> Self {
        Self {
            field_type: Some("nested".to_string()),
            properties,
            ..Default::default()
        }
    }

    /// Adds an engine mapping parameter.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Returns true for analyzed text fields.
    pub fn is_free_text(&self) -> bool {
        self.properties.is_empty() && self.field_type.as_deref() == Some(FREE_TEXT_TYPE)
    }
}

/// A schema-bearing document set in the search engine.
///
/// ```rust
/// use helios_collections::schema::{Collection, FieldMap, FieldMapping};
///
/// struct Users;
///
/// impl Collection for Users {
///     fn index(&self) -> &str {
///         "users"
///     }
///
///     fn map(&self) -> FieldMap {
///         FieldMap::from([
///             ("name".to_string(), FieldMapping::new("text")),
///             ("age".to_string(), FieldMapping::new("integer")),
///         ])
///     }
/// }
/// ```
pub trait Collection: Send + Sync {
    /// The index name. Must not be empty.
    fn index(&self) -> &str;

    /// The declared field mapping.
    fn map(&self) -> FieldMap;

    /// Engine index settings applied when the index is created.
    fn settings(&self) -> Map<String, Value> {
        Map::new()
    }

    /// The document type. Must not be empty.
    fn doc_type(&self) -> &str {
        DEFAULT_DOC_TYPE
    }
}

/// A collection declared at runtime rather than by a dedicated type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicCollection {
    index: String,
    fields: FieldMap,
    settings: Map<String, Value>,
}

impl DynamicCollection {
    /// Creates a collection over `index` with no declared fields.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Default::default()
        }
    }

    /// Declares a field.
    pub fn with_field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.fields.insert(name.into(), mapping);
        self
    }

    /// Declares an index setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

impl Collection for DynamicCollection {
    fn index(&self) -> &str {
        &self.index
    }

    fn map(&self) -> FieldMap {
        self.fields.clone()
    }

    fn settings(&self) -> Map<String, Value> {
        self.settings.clone()
    }
}

/// Checks that the collection names an index and a document type.
pub(crate) fn validate<C: Collection + ?Sized>(collection: &C) -> CollectionResult<()> {
    if collection.index().trim().is_empty() || collection.doc_type().trim().is_empty() {
        return Err(CollectionError::SchemaInvalid {
            collection: std::any::type_name::<C>().to_string(),
            message: "index or type is invalid, please check the collection declaration"
                .to_string(),
        });
    }
    Ok(())
}

/// Looks up a field by name, walking dotted paths through object and nested groups.
pub fn lookup_field<'a>(map: &'a FieldMap, field: &str) -> Option<&'a FieldMapping> {
    if let Some(mapping) = map.get(field) {
        return Some(mapping);
    }
    let (head, rest) = field.split_once('.')?;
    let group = map.get(head)?;
    lookup_field(&group.properties, rest)
}

/// Returns the key to sort on for `field`.
///
/// Free-text fields are not sortable as indexed, so the sort targets their
/// keyword sub-field instead.
pub fn sort_key(map: &FieldMap, field: &str) -> String {
    match lookup_field(map, field) {
        Some(mapping) if mapping.is_free_text() => format!("{field}.{SORTABLE_SUB_FIELD}"),
        _ => field.to_string(),
    }
}

/// Builds the index creation body for a collection.
///
/// Source storage is always enabled; settings are only sent when declared.
pub fn create_index_body<C: Collection + ?Sized>(collection: &C) -> Value {
    let mut body = json!({
        "mappings": {
            "_source": { "enabled": true },
            "properties": collection.map(),
        }
    });

    let settings = collection.settings();
    if !settings.is_empty() {
        body["settings"] = Value::Object(settings);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> DynamicCollection {
        DynamicCollection::new("books")
            .with_field("title", FieldMapping::new("text"))
            .with_field("pages", FieldMapping::new("integer"))
            .with_field(
                "author",
                FieldMapping::object(FieldMap::from([
                    ("name".to_string(), FieldMapping::new("text")),
                    ("born".to_string(), FieldMapping::new("date")),
                ])),
            )
    }

    #[test]
    fn test_sort_key_free_text() {
        let map = library().map();
        assert_eq!(sort_key(&map, "title"), "title.keyword");
        assert_eq!(sort_key(&map, "pages"), "pages");
        assert_eq!(sort_key(&map, "unknown"), "unknown");
    }

    #[test]
    fn test_sort_key_recurses_into_groups() {
        let map = library().map();
        assert_eq!(sort_key(&map, "author.name"), "author.name.keyword");
        assert_eq!(sort_key(&map, "author.born"), "author.born");
        // the group itself is not a sortable leaf
        assert_eq!(sort_key(&map, "author"), "author");
    }

    #[test]
    fn test_create_index_body() {
        let collection = library().with_setting("number_of_shards", json!(1));
        let body = create_index_body(&collection);

        assert_eq!(body["mappings"]["_source"]["enabled"], true);
        assert_eq!(body["mappings"]["properties"]["title"]["type"], "text");
        assert_eq!(
            body["mappings"]["properties"]["author"]["properties"]["born"]["type"],
            "date"
        );
        assert_eq!(body["settings"]["number_of_shards"], 1);
    }

    #[test]
    fn test_create_index_body_without_settings() {
        let body = create_index_body(&library());
        assert!(body.get("settings").is_none());
    }

    #[test]
    fn test_mapping_options_are_flattened() {
        let mapping = FieldMapping::new("text").with_option("analyzer", json!("standard"));
        let value = serde_json::to_value(&mapping).unwrap();
        assert_eq!(value, json!({ "type": "text", "analyzer": "standard" }));
    }

    #[test]
    fn test_validate() {
        assert!(validate(&library()).is_ok());
        assert!(matches!(
            validate(&DynamicCollection::new("  ")),
            Err(CollectionError::SchemaInvalid { .. })
        ));
    }
}
