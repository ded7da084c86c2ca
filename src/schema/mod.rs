//! JSON Schema validation for the database file
//!
//! A schema for the patient-centric shape ships with the binary
//! (`patient_centric.schema.json`); another one can be supplied per database.
//! Schemas are compiled and evaluated by the `jsonschema` crate.

use jsonschema::Validator;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// The bundled patient-centric schema
pub const BUNDLED_SCHEMA: &str = include_str!("patient_centric.schema.json");

/// First place where a document breaks the schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{pointer}: {message}")]
pub struct SchemaViolation {
    /// JSON pointer to the offending value (`""` is the document root)
    pub pointer: String,
    pub message: String,
}

/// A compiled JSON Schema
pub struct JsonSchema {
    name: String,
    validator: Validator,
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema").field("name", &self.name).finish()
    }
}

impl JsonSchema {
    pub fn bundled() -> Result<Self> {
        Self::parse("bundled", BUNDLED_SCHEMA)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&path.display().to_string(), &content)
    }

    pub fn parse(name: &str, content: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(content).map_err(|err| Error::InvalidSchema {
            source_name: name.to_string(),
            message: err.to_string(),
        })?;
        Self::from_value(name, root)
    }

    pub fn from_value(name: &str, root: Value) -> Result<Self> {
        let invalid = |message: String| Error::InvalidSchema {
            source_name: name.to_string(),
            message,
        };

        if !(root.is_object() || root.is_boolean()) {
            return Err(invalid("a schema must be an object or a boolean".to_string()));
        }
        let validator = jsonschema::validator_for(&root).map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            validator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate `instance`, reporting the first violation
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), SchemaViolation> {
        match self.validator.iter_errors(instance).next() {
            None => Ok(()),
            Some(err) => Err(SchemaViolation {
                pointer: err.instance_path.to_string(),
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_document() -> Value {
        json!({
            "version": "1.0",
            "patients": {
                "P1": {
                    "sex": "F",
                    "cases": {
                        "C1": {
                            "project_id": "EPICC",
                            "samples": {
                                "S1": {
                                    "sample_meta": {"sample_type": "tumour", "phenotype": null},
                                    "analyses": {
                                        "wgs": {
                                            "indexing": null,
                                            "technology": "illumina",
                                            "raw_sequence": [{
                                                "gf_id": "GF1",
                                                "fastqs": [{
                                                    "gf_project": "A",
                                                    "run": "r1",
                                                    "files": {"L001": {"R1": "a_R1.fq.gz", "R2": "a_R2.fq.gz"}}
                                                }]
                                            }],
                                            "processed_data": {
                                                "bam": [{"file_path": "/a.bam", "file_type": "bam", "pipeline_url": null,
                                                         "metadata": {"size": 10, "created": null, "epoch": 1700000000}}],
                                                "vcf": [], "cna": [], "qc": []
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_bundled_schema_accepts_valid_document() {
        let schema = JsonSchema::bundled().unwrap();
        assert_eq!(schema.validate(&valid_document()), Ok(()));
    }

    #[test]
    fn test_missing_required_reports_pointer() {
        let schema = JsonSchema::bundled().unwrap();
        let mut doc = valid_document();
        doc["patients"]["P1"]["cases"]["C1"]["samples"]["S1"]["analyses"]["wgs"]["processed_data"]
            .as_object_mut()
            .unwrap()
            .remove("qc");

        let violation = schema.validate(&doc).unwrap_err();
        assert_eq!(
            violation.pointer,
            "/patients/P1/cases/C1/samples/S1/analyses/wgs/processed_data"
        );
        assert!(violation.message.contains("qc"));
    }

    #[test]
    fn test_wrong_type() {
        let schema = JsonSchema::bundled().unwrap();
        let mut doc = valid_document();
        doc["patients"]["P1"]["cases"]["C1"]["samples"]["S1"]["analyses"]["wgs"]["processed_data"]["bam"][0]
            ["metadata"]["epoch"] = json!("yesterday");

        let violation = schema.validate(&doc).unwrap_err();
        assert!(violation.pointer.ends_with("/bam/0/metadata/epoch"));
        assert!(violation.message.contains("yesterday"));
    }

    #[test]
    fn test_pattern_and_additional_properties() {
        let schema = JsonSchema::bundled().unwrap();
        let mut doc = valid_document();
        doc["patients"]["P1"]["cases"]["C1"]["samples"]["S1"]["analyses"]["wgs"]["raw_sequence"][0]["fastqs"][0]
            ["files"]["L001"]["R4"] = json!("x.fq.gz");

        let violation = schema.validate(&doc).unwrap_err();
        assert!(violation.pointer.ends_with("/files/L001"));
        assert!(violation.message.contains("R4"));

        let mut doc = valid_document();
        doc["patients"]["P1"]["age"] = json!(40);
        let violation = schema.validate(&doc).unwrap_err();
        assert_eq!(violation.pointer, "/patients/P1");
        assert!(violation.message.contains("age"));
    }

    #[test]
    fn test_sample_centric_document_rejected() {
        let schema = JsonSchema::bundled().unwrap();
        let violation = schema.validate(&json!({"samples": {}})).unwrap_err();
        assert_eq!(violation.pointer, "");
        assert!(violation.message.contains("patients"));
    }

    #[test]
    fn test_enum_minimum_and_escaping() {
        let schema = JsonSchema::from_value(
            "inline",
            json!({
                "type": "object",
                "additionalProperties": {"type": "integer", "minimum": 0, "enum": [0, 1, 2]}
            }),
        )
        .unwrap();

        assert!(schema.validate(&json!({"a/b": 1})).is_ok());
        let violation = schema.validate(&json!({"a/b": 5})).unwrap_err();
        assert_eq!(violation.pointer, "/a~1b");
        assert!(schema.validate(&json!({"x": -1})).is_err());
    }

    #[test]
    fn test_user_schema_keywords_are_enforced() {
        let schema = JsonSchema::from_value(
            "inline",
            json!({
                "properties": {
                    "version": {"const": "2.0"},
                    "name": {"pattern": "^[A-Z]+$", "maxLength": 3}
                },
                "anyOf": [{"required": ["nope"]}]
            }),
        )
        .unwrap();

        assert!(schema.validate(&json!({"version": "1.0", "name": "lowercase-long"})).is_err());
        assert!(schema.validate(&json!({"version": "2.0", "name": "ABC"})).is_err());
        assert_eq!(
            schema.validate(&json!({"version": "2.0", "name": "ABC", "nope": 1})),
            Ok(())
        );
    }

    #[test]
    fn test_one_of_requires_exactly_one_match() {
        let schema = JsonSchema::from_value(
            "inline",
            json!({
                "oneOf": [{"type": "string", "maxLength": 2}, {"type": "string", "minLength": 1}]
            }),
        )
        .unwrap();

        assert!(schema.validate(&json!("abc")).is_ok());
        assert!(schema.validate(&json!("ab")).is_err());
    }

    #[test]
    fn test_schema_must_be_object() {
        assert!(matches!(
            JsonSchema::parse("inline", "[1]"),
            Err(Error::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_malformed_schema_rejected() {
        assert!(matches!(
            JsonSchema::from_value("inline", json!({"type": 12})),
            Err(Error::InvalidSchema { .. })
        ));
    }
}
