//! # Specification Loading
//!
//! Turns a Swagger 2.0 document (JSON or YAML) into a [`SpecGraph`].
//!
//! ## What the loader resolves
//!
//! - `paths` and `x-ms-paths` are merged; path-level parameters are merged
//!   into each operation (the operation wins on `name` + `in`).
//! - `$ref`s to `#/parameters/*` and `#/responses/*` are followed. Every
//!   `$ref` in the document must point inside the document; anything else is
//!   [`LoadError::UnresolvedReference`].
//! - Each operation gets a composite request schema
//!   `{path, query, headers, body}` and each response a composite
//!   `{headers, body}` schema, with the document's `definitions` embedded so
//!   `#/definitions/*` references keep resolving.
//! - Non-body parameters get [`Transform`]s from their declared type; path
//!   parameters are percent-decoded first.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use oav_core::{HttpMethod, LoadError};
use percent_encoding::percent_decode_str;
use serde_json::{json, Map, Value};

use crate::operation::{Operation, OperationKey, ResponseDefinition, SpecGraph};
use crate::pattern::PathPattern;
use crate::transform::{Transform, TransformMap};

/// Media type assumed when neither the operation nor the document declares
/// any.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Parameter keywords that carry over into a JSON schema.
const SCHEMA_KEYWORDS: [&str; 15] = [
    "type",
    "format",
    "enum",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "pattern",
    "items",
    "minItems",
    "maxItems",
    "uniqueItems",
    "multipleOf",
];

/// Loads a specification document into an operation graph.
pub trait SpecLoader: Send + Sync {
    /// Load the document at `path`.
    fn load(&self, path: &Path) -> Result<SpecGraph, LoadError>;
}

/// Loader for Swagger 2.0 documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwaggerLoader;

impl SpecLoader for SwaggerLoader {
    fn load(&self, path: &Path) -> Result<SpecGraph, LoadError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: display.clone(),
            reason: e.to_string(),
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let document: Value = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
                path: display.clone(),
                reason: format!("invalid YAML: {e}"),
            })?,
            _ => serde_json::from_str(&content).map_err(|e| LoadError::Parse {
                path: display.clone(),
                reason: format!("invalid JSON: {e}"),
            })?,
        };

        self.load_document(&display, &document)
    }
}

impl SwaggerLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self
    }

    /// Build the operation graph of an already-parsed document.
    ///
    /// `file_path` becomes the owning file of every operation and the default
    /// source URL of every issue raised against it.
    pub fn load_document(
        &self,
        file_path: &str,
        document: &Value,
    ) -> Result<SpecGraph, LoadError> {
        let invalid = |reason: &str| LoadError::InvalidDocument {
            path: file_path.to_string(),
            reason: reason.to_string(),
        };

        if !document.is_object() {
            return Err(invalid("document root must be an object"));
        }
        match document.get("swagger").and_then(Value::as_str) {
            Some("2.0") => {}
            Some(other) => return Err(invalid(&format!("unsupported swagger version '{other}'"))),
            None => return Err(invalid("missing 'swagger: 2.0' marker")),
        }
        check_references(file_path, document, document)?;

        let doc = DocumentContext {
            file_path,
            document,
            api_version: document
                .pointer("/info/version")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            base_path: document
                .get("basePath")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            consumes: string_list(document.get("consumes")),
            produces: string_list(document.get("produces")),
            definitions: document
                .get("definitions")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        };

        let mut operations = Vec::new();
        for section in ["paths", "x-ms-paths"] {
            let Some(paths) = document.get(section).and_then(Value::as_object) else {
                continue;
            };
            for (raw_template, item) in paths {
                let item = doc.resolve(item)?;
                let shared_params: &[Value] = item
                    .get("parameters")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for method in HttpMethod::ALL {
                    let Some(op) = item.get(method.as_str()) else {
                        continue;
                    };
                    let json_ref = format!(
                        "#/{section}/{}/{}",
                        escape_pointer(raw_template),
                        method.as_str()
                    );
                    operations.push(Arc::new(doc.build_operation(
                        raw_template,
                        method,
                        op,
                        shared_params,
                        json_ref,
                    )?));
                }
            }
        }

        tracing::info!(
            spec = file_path,
            api_version = %doc.api_version,
            operations = operations.len(),
            "loaded specification"
        );

        Ok(SpecGraph {
            file_path: file_path.to_string(),
            title: document
                .pointer("/info/title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            api_version: doc.api_version,
            operations,
        })
    }
}

struct DocumentContext<'a> {
    file_path: &'a str,
    document: &'a Value,
    api_version: String,
    base_path: String,
    consumes: Vec<String>,
    produces: Vec<String>,
    definitions: Value,
}

/// Per-location pieces of the composite request schema.
#[derive(Default)]
struct ParameterGroup {
    properties: Map<String, Value>,
    required: Vec<String>,
    transforms: TransformMap,
}

impl ParameterGroup {
    fn add(&mut self, name: String, schema: Value, required: bool, transform: Option<Transform>) {
        if required {
            self.required.push(name.clone());
        }
        if let Some(transform) = transform {
            self.transforms.insert(name.clone(), transform);
        }
        self.properties.insert(name, schema);
    }

    fn schema(&self) -> Value {
        object_schema(self.properties.clone(), &self.required)
    }
}

impl<'a> DocumentContext<'a> {
    /// Follow a local `$ref` chain to the referenced value.
    fn resolve(&self, value: &'a Value) -> Result<&'a Value, LoadError> {
        let mut current = value;
        // Bounded so a reference cycle cannot loop forever.
        for _ in 0..32 {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Ok(current);
            };
            current = lookup_ref(self.document, reference).ok_or_else(|| {
                LoadError::UnresolvedReference {
                    path: self.file_path.to_string(),
                    reference: reference.to_string(),
                }
            })?;
        }
        Err(LoadError::InvalidDocument {
            path: self.file_path.to_string(),
            reason: "reference chain too deep".to_string(),
        })
    }

    fn build_operation(
        &self,
        raw_template: &str,
        method: HttpMethod,
        op: &'a Value,
        shared_params: &'a [Value],
        json_ref: String,
    ) -> Result<Operation, LoadError> {
        // x-ms-paths keys may carry a disambiguating query string.
        let route = raw_template.split('?').next().unwrap_or(raw_template);
        let template = format!("{}{}", self.base_path, route);

        let mut merged: Vec<&Value> = Vec::new();
        let mut index: BTreeMap<(String, String), usize> = BTreeMap::new();
        let own_params = op.get("parameters").and_then(Value::as_array);
        for raw in shared_params.iter().chain(own_params.into_iter().flatten()) {
            let param = self.resolve(raw)?;
            let name = param.get("name").and_then(Value::as_str).unwrap_or_default();
            let location = param.get("in").and_then(Value::as_str).unwrap_or_default();
            match index.get(&(name.to_string(), location.to_string())) {
                Some(&slot) => merged[slot] = param,
                None => {
                    index.insert((name.to_string(), location.to_string()), merged.len());
                    merged.push(param);
                }
            }
        }

        let mut path = ParameterGroup::default();
        let mut query = ParameterGroup::default();
        let mut headers = ParameterGroup::default();
        let mut body_schema = None;
        let mut body_required = false;
        let mut body_transform = None;

        for param in merged {
            let name = param
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let required = param.get("required").and_then(Value::as_bool) == Some(true);
            match param.get("in").and_then(Value::as_str) {
                Some("path") => {
                    let transform = match parameter_transform(param) {
                        Some(typed) => Transform::Chain(vec![Transform::Decode, typed]),
                        None => Transform::Decode,
                    };
                    path.add(name, parameter_schema(param), true, Some(transform));
                }
                Some("query") => {
                    query.add(name, parameter_schema(param), required, parameter_transform(param));
                }
                Some("header") => {
                    headers.add(
                        name.to_ascii_lowercase(),
                        parameter_schema(param),
                        required,
                        parameter_transform(param),
                    );
                }
                Some("body") => {
                    let schema = param
                        .get("schema")
                        .map(sanitize_schema)
                        .unwrap_or_else(|| json!({}));
                    body_transform = schema
                        .get("type")
                        .and_then(Value::as_str)
                        .and_then(scalar_transform);
                    body_schema = Some(schema);
                    body_required = required;
                }
                other => {
                    tracing::debug!(
                        spec = self.file_path,
                        parameter = %name,
                        location = ?other,
                        "parameter location not validated"
                    );
                }
            }
        }

        let mut properties = Map::new();
        properties.insert("path".into(), path.schema());
        properties.insert("query".into(), query.schema());
        properties.insert("headers".into(), headers.schema());
        if let Some(schema) = body_schema {
            properties.insert("body".into(), schema);
        }
        let required = if body_required {
            vec!["body".to_string()]
        } else {
            Vec::new()
        };
        let request_schema = self.with_definitions(object_schema(properties, &required));

        let mut responses = BTreeMap::new();
        if let Some(declared) = op.get("responses").and_then(Value::as_object) {
            for (status, raw) in declared {
                let rsp = self.resolve(raw)?;
                responses.insert(
                    status.clone(),
                    self.build_response(status, rsp, format!("{json_ref}/responses/{status}")),
                );
            }
        }

        Ok(Operation {
            key: OperationKey {
                spec_file: self.file_path.to_string(),
                method,
                path_template: template.clone(),
            },
            operation_id: op
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string),
            api_version: self.api_version.clone(),
            pattern: PathPattern::compile(&template),
            consumes: media_types(op.get("consumes"), &self.consumes),
            produces: media_types(op.get("produces"), &self.produces),
            path_transforms: path.transforms,
            query_transforms: query.transforms,
            header_transforms: headers.transforms,
            body_transform,
            request_schema,
            responses,
            long_running: op
                .get("x-ms-long-running-operation")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            json_ref,
        })
    }

    fn build_response(&self, status: &str, rsp: &Value, json_ref: String) -> ResponseDefinition {
        let mut headers = ParameterGroup::default();
        if let Some(declared) = rsp.get("headers").and_then(Value::as_object) {
            for (name, header) in declared {
                let required = header.get("required").and_then(Value::as_bool) == Some(true);
                headers.add(
                    name.to_ascii_lowercase(),
                    parameter_schema(header),
                    required,
                    parameter_transform(header),
                );
            }
        }

        let body_schema = rsp.get("schema").map(sanitize_schema);
        let is_file = rsp.pointer("/schema/type").and_then(Value::as_str) == Some("file");

        let mut properties = Map::new();
        properties.insert("headers".into(), headers.schema());
        let mut required = Vec::new();
        if let Some(schema) = &body_schema {
            properties.insert("body".into(), schema.clone());
            if !is_file {
                required.push("body".to_string());
            }
        }

        ResponseDefinition {
            status: status.to_string(),
            body_schema,
            header_transforms: headers.transforms,
            validation_schema: self.with_definitions(object_schema(properties, &required)),
            json_ref,
        }
    }

    fn with_definitions(&self, mut schema: Value) -> Value {
        if let Value::Object(map) = &mut schema {
            map.insert("definitions".into(), self.definitions.clone());
        }
        schema
    }
}

/// Verify every `$ref` inside `value` resolves within `document`.
fn check_references(file_path: &str, document: &Value, value: &Value) -> Result<(), LoadError> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if lookup_ref(document, reference).is_none() {
                    return Err(LoadError::UnresolvedReference {
                        path: file_path.to_string(),
                        reference: reference.clone(),
                    });
                }
            }
            map.values()
                .try_for_each(|v| check_references(file_path, document, v))
        }
        Value::Array(items) => items
            .iter()
            .try_for_each(|v| check_references(file_path, document, v)),
        _ => Ok(()),
    }
}

fn lookup_ref<'d>(document: &'d Value, reference: &str) -> Option<&'d Value> {
    let fragment = reference.strip_prefix('#')?;
    let decoded = percent_decode_str(fragment).decode_utf8_lossy();
    document.pointer(&decoded)
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn media_types(declared: Option<&Value>, document_level: &[String]) -> Vec<String> {
    let own = string_list(declared);
    if !own.is_empty() {
        own
    } else if !document_level.is_empty() {
        document_level.to_vec()
    } else {
        vec![DEFAULT_MEDIA_TYPE.to_string()]
    }
}

fn object_schema(properties: Map<String, Value>, required: &[String]) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    // Draft 4 rejects an empty `required` array.
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    Value::Object(schema)
}

/// JSON schema of a non-body parameter or a response header.
fn parameter_schema(param: &Value) -> Value {
    let mut schema = Map::new();
    for keyword in SCHEMA_KEYWORDS {
        if let Some(value) = param.get(keyword) {
            if keyword == "type" && value == "file" {
                continue;
            }
            schema.insert(keyword.to_string(), value.clone());
        }
    }
    Value::Object(schema)
}

/// Drop the Swagger-only `type: file`, which no JSON schema draft accepts.
fn sanitize_schema(schema: &Value) -> Value {
    let mut schema = schema.clone();
    if let Value::Object(map) = &mut schema {
        if map.get("type").and_then(Value::as_str) == Some("file") {
            map.remove("type");
        }
    }
    schema
}

fn scalar_transform(kind: &str) -> Option<Transform> {
    match kind {
        "integer" => Some(Transform::Integer),
        "number" => Some(Transform::Number),
        "boolean" => Some(Transform::Boolean),
        _ => None,
    }
}

/// Transform for a non-body parameter or a response header.
fn parameter_transform(param: &Value) -> Option<Transform> {
    match param.get("type").and_then(Value::as_str)? {
        "array" => {
            let item = param
                .pointer("/items/type")
                .and_then(Value::as_str)
                .and_then(scalar_transform);
            let format = param.get("collectionFormat").and_then(Value::as_str);
            match Transform::collection_delimiter(format) {
                Some(delimiter) => Some(Transform::Split {
                    delimiter,
                    item: item.map(Box::new),
                }),
                None => item.map(|item| Transform::Each(Box::new(item))),
            }
        }
        other => scalar_transform(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": "Widgets", "version": "2024-05-01"},
            "basePath": "/api",
            "consumes": ["application/json"],
            "produces": ["application/json", "text/json"],
            "parameters": {
                "ApiVersion": {"name": "api-version", "in": "query", "required": true, "type": "string"}
            },
            "responses": {
                "Error": {"description": "error", "schema": {"$ref": "#/definitions/Error"}}
            },
            "paths": {
                "/widgets/{name}": {
                    "parameters": [
                        {"name": "name", "in": "path", "required": true, "type": "string"}
                    ],
                    "put": {
                        "operationId": "Widgets_Create",
                        "x-ms-long-running-operation": true,
                        "parameters": [
                            {"$ref": "#/parameters/ApiVersion"},
                            {"name": "X-Ms-Count", "in": "header", "type": "integer"},
                            {"name": "body", "in": "body", "required": true, "schema": {"$ref": "#/definitions/Widget"}}
                        ],
                        "responses": {
                            "200": {"description": "ok", "schema": {"$ref": "#/definitions/Widget"}},
                            "202": {"description": "accepted", "headers": {"Location": {"type": "string"}}},
                            "default": {"$ref": "#/responses/Error"}
                        }
                    },
                    "get": {
                        "operationId": "Widgets_Get",
                        "consumes": ["text/plain"],
                        "parameters": [
                            {"$ref": "#/parameters/ApiVersion"},
                            {"name": "tags", "in": "query", "type": "array", "items": {"type": "integer"}, "collectionFormat": "pipes"},
                            {"name": "ids", "in": "query", "type": "array", "items": {"type": "integer"}, "collectionFormat": "multi"}
                        ],
                        "responses": {"200": {"description": "ok"}}
                    }
                }
            },
            "x-ms-paths": {
                "/widgets/{name}?op=restart": {
                    "post": {
                        "operationId": "Widgets_Restart",
                        "responses": {"204": {"description": "done"}}
                    }
                }
            },
            "definitions": {
                "Widget": {"type": "object", "required": ["name"], "properties": {"name": {"type": "string"}}},
                "Error": {"type": "object", "properties": {"code": {"type": "string"}}}
            }
        })
    }

    fn load() -> SpecGraph {
        SwaggerLoader::new()
            .load_document("specs/widgets.json", &document())
            .unwrap()
    }

    #[test]
    fn loads_operations_from_paths_and_x_ms_paths() {
        let graph = load();
        assert_eq!(graph.api_version, "2024-05-01");
        assert_eq!(graph.title, "Widgets");
        let mut ids = graph.operation_ids();
        ids.sort();
        assert_eq!(ids, vec!["Widgets_Create", "Widgets_Get", "Widgets_Restart"]);

        let restart = graph
            .operations
            .iter()
            .find(|op| op.operation_id.as_deref() == Some("Widgets_Restart"))
            .unwrap();
        assert_eq!(restart.key.path_template, "/api/widgets/{name}");
        assert!(restart.json_ref.starts_with("#/x-ms-paths/"));
    }

    #[test]
    fn builds_transforms_and_media_types() {
        let graph = load();
        let create = graph
            .operations
            .iter()
            .find(|op| op.operation_id.as_deref() == Some("Widgets_Create"))
            .unwrap();
        assert!(create.long_running);
        assert_eq!(create.method(), HttpMethod::Put);
        assert_eq!(create.consumes, vec!["application/json"]);
        assert_eq!(create.produces, vec!["application/json", "text/json"]);
        assert_eq!(create.path_transforms.get("name"), Some(&Transform::Decode));
        assert_eq!(
            create.header_transforms.get("x-ms-count"),
            Some(&Transform::Integer)
        );
        assert_eq!(create.request_schema["required"], json!(["body"]));
        assert_eq!(
            create.request_schema["properties"]["query"]["required"],
            json!(["api-version"])
        );
        assert!(create.request_schema["definitions"]["Widget"].is_object());

        let get = graph
            .operations
            .iter()
            .find(|op| op.operation_id.as_deref() == Some("Widgets_Get"))
            .unwrap();
        assert_eq!(get.consumes, vec!["text/plain"]);
        assert_eq!(
            get.query_transforms.get("tags"),
            Some(&Transform::Split {
                delimiter: '|',
                item: Some(Box::new(Transform::Integer))
            })
        );
        assert_eq!(
            get.query_transforms.get("ids"),
            Some(&Transform::Each(Box::new(Transform::Integer)))
        );
    }

    #[test]
    fn builds_responses_with_resolved_refs() {
        let graph = load();
        let create = graph
            .operations
            .iter()
            .find(|op| op.operation_id.as_deref() == Some("Widgets_Create"))
            .unwrap();
        let ok = &create.responses["200"];
        assert!(ok.has_schema());
        assert_eq!(ok.validation_schema["required"], json!(["body"]));

        let accepted = &create.responses["202"];
        assert!(!accepted.has_schema());
        assert!(accepted.validation_schema.get("required").is_none());
        assert!(accepted.validation_schema["properties"]["headers"]["properties"]["location"].is_object());

        let fallback = &create.responses["default"];
        assert_eq!(
            fallback.body_schema,
            Some(json!({"$ref": "#/definitions/Error"}))
        );
    }

    #[test]
    fn rejects_external_and_dangling_references() {
        let mut doc = document();
        doc["definitions"]["Widget"]["properties"]["owner"] =
            json!({"$ref": "common.json#/definitions/Owner"});
        let err = SwaggerLoader::new()
            .load_document("specs/widgets.json", &doc)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedReference { .. }));

        let mut doc = document();
        doc["definitions"]["Widget"]["properties"]["owner"] =
            json!({"$ref": "#/definitions/Missing"});
        let err = SwaggerLoader::new()
            .load_document("specs/widgets.json", &doc)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedReference { .. }));
    }

    #[test]
    fn rejects_non_swagger_documents() {
        let err = SwaggerLoader::new()
            .load_document("a.json", &json!({"openapi": "3.0.0"}))
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidDocument { .. }));
        let err = SwaggerLoader::new()
            .load_document("a.json", &json!([1, 2]))
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidDocument { .. }));
    }

    #[test]
    fn loads_yaml_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widgets.yaml");
        std::fs::write(&path, serde_yaml::to_string(&document()).unwrap()).unwrap();
        let graph = SwaggerLoader::new().load(&path).unwrap();
        assert_eq!(graph.operations.len(), 3);
    }

    #[test]
    fn reports_unreadable_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            SwaggerLoader::new().load(&missing).unwrap_err(),
            LoadError::Read { .. }
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            SwaggerLoader::new().load(&broken).unwrap_err(),
            LoadError::Parse { .. }
        ));
    }
}
