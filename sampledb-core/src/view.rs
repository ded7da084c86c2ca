//! Sample-centric / patient-centric view adapter
//!
//! A database file is persisted in one of two shapes:
//!
//! ```text
//! sample-centric                     patient-centric
//! {                                  {
//!   "samples": {                       "patients": {
//!     "<sample>": {                      "<patient>": {
//!       "sample_meta": {...},              "sex": ...,
//!       "seq": {"wgs": {...}}              "cases": {
//!     }                                      "<case>": {
//!   }                                          "project_id": ...,
//! }                                            "samples": {
//!                                                "<sample>": {
//!                                                  "sample_meta": {...},
//!                                                  "analyses": {"wgs": {...}}
//!                                                }
//!                                              }
//!                                            }
//!                                          }
//!                                        }
//!                                      }
//!                                    }
//! ```
//!
//! All mutation happens on the sample-centric [`Document`]. [`normalize`]
//! converts on the way in and reports which [`Shape`] was found; [`render`]
//! converts back to that same shape on the way out.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::model::{null_as_default, supplied, Document, Extra, Sample, SampleMeta, SeqBlock};

/// Patient key used when a sample names no patient at all
pub const UNKNOWN_PATIENT: &str = "UNKNOWN_PATIENT";

/// Top-level shape of a persisted document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    SampleCentric,
    PatientCentric,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::SampleCentric => f.write_str("sample-centric"),
            Shape::PatientCentric => f.write_str("patient-centric"),
        }
    }
}

impl Shape {
    /// A document is patient-centric when its `patients` field is an object
    pub fn detect(value: &Value) -> Shape {
        match value.get("patients") {
            Some(Value::Object(_)) => Shape::PatientCentric,
            _ => Shape::SampleCentric,
        }
    }
}

/// The patient-centric document shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub patients: BTreeMap<String, Patient>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub sex: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub cases: BTreeMap<String, Case>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(default)]
    pub project_id: Option<String>,

    /// Older files name the case project this way
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sottorivalab_project: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub samples: BTreeMap<String, CaseSample>,
}

impl Case {
    pub fn project(&self) -> Option<&str> {
        supplied(&self.project_id).or_else(|| supplied(&self.sottorivalab_project))
    }
}

/// A sample as nested under a case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseSample {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_meta: SampleMeta,

    #[serde(default, alias = "seq", deserialize_with = "null_as_default")]
    pub analyses: BTreeMap<String, SeqBlock>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Parse a persisted document into the canonical form, remembering its shape.
///
/// A document with neither `samples` nor `patients` is an empty
/// sample-centric document. The top-level key of the other shape may only
/// be present if it is empty (`null`, `{}` or `[]`); it is dropped.
pub fn normalize(value: Value) -> Result<(Document, Shape)> {
    if !value.is_object() {
        return Err(Error::InvalidDocument(
            "top-level value must be a JSON object".to_string(),
        ));
    }

    match Shape::detect(&value) {
        Shape::PatientCentric => {
            let mut patients: PatientDocument = serde_json::from_value(value)?;
            drop_empty_key(&mut patients.extra, "samples", "patients")?;
            Ok((flatten(patients)?, Shape::PatientCentric))
        }
        Shape::SampleCentric => {
            let mut document: Document = serde_json::from_value(value)?;
            drop_empty_key(&mut document.extra, "patients", "samples")?;
            Ok((document, Shape::SampleCentric))
        }
    }
}

/// Remove `key` from the unknown fields if it holds nothing
fn drop_empty_key(extra: &mut Extra, key: &str, alongside: &str) -> Result<()> {
    let Some(value) = extra.remove(key) else {
        return Ok(());
    };
    let empty = match &value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(());
    }
    Err(Error::InvalidDocument(format!(
        "document has both '{}' and a non-empty '{}'",
        alongside, key
    )))
}

/// Flatten patients → cases → samples into the sample-centric form.
///
/// Each sample keeps its own `sample_meta` values; gaps are filled from the
/// enclosing patient (`sex`) and case (project), and the identity fields
/// `patient_id`, `case_id` and `project_id` are always set. A sample key
/// that appears under two cases is an error.
pub fn flatten(document: PatientDocument) -> Result<Document> {
    let mut samples = BTreeMap::new();
    let mut located: BTreeMap<String, String> = BTreeMap::new();

    for (patient_key, patient) in document.patients {
        for (case_key, case) in patient.cases {
            let case_project = case.project().map(str::to_string);
            for (sample_key, sample) in case.samples {
                let location = format!("{}/{}", patient_key, case_key);
                if let Some(first) = located.get(&sample_key) {
                    return Err(Error::InvalidDocument(format!(
                        "sample '{}' appears under both {} and {}",
                        sample_key, first, location
                    )));
                }
                located.insert(sample_key.clone(), location);

                let mut meta = sample.sample_meta;

                if supplied(&meta.patient).is_none() {
                    meta.patient = Some(patient_key.clone());
                }
                if supplied(&meta.sex).is_none() {
                    meta.sex = patient.sex.clone();
                }
                if supplied(&meta.sottorivalab_project).is_none() {
                    meta.sottorivalab_project = case_project.clone();
                }
                let project_id = case_project.clone().or_else(|| meta.project().map(str::to_string));

                meta.patient_id = Some(patient_key.clone());
                meta.case_id = Some(case_key.clone());
                meta.project_id = project_id;

                samples.insert(
                    sample_key,
                    Sample {
                        sample_meta: meta,
                        seq: sample.analyses,
                        extra: sample.extra,
                    },
                );
            }
        }
    }

    Ok(Document {
        version: document.version,
        updated_at: document.updated_at,
        samples,
        extra: document.extra,
    })
}

/// Patient a flattened sample belongs to
pub fn patient_key(meta: &SampleMeta) -> &str {
    supplied(&meta.patient_id)
        .or_else(|| supplied(&meta.patient))
        .unwrap_or(UNKNOWN_PATIENT)
}

/// Case a flattened sample belongs to; defaults to the patient key
pub fn case_key(meta: &SampleMeta) -> &str {
    supplied(&meta.case_id).unwrap_or_else(|| patient_key(meta))
}

/// Regroup the canonical document into patients and cases.
///
/// Patient `sex` and case `project_id` take the first non-null value found
/// across their samples. Samples that were read from a patient-centric file
/// (they carry `patient_id` / `case_id`) are preferred over samples added
/// since, so a new sample cannot change what the patient already records.
pub fn denormalize(document: &Document) -> PatientDocument {
    let mut patients: BTreeMap<String, Patient> = BTreeMap::new();
    let mut settled_sex: BTreeSet<String> = BTreeSet::new();
    let mut settled_project: BTreeSet<(String, String)> = BTreeSet::new();

    for (sample_key, sample) in &document.samples {
        let meta = &sample.sample_meta;
        let patient_id = patient_key(meta).to_string();
        let case_id = case_key(meta).to_string();

        let patient = patients.entry(patient_id.clone()).or_default();
        if let Some(sex) = supplied(&meta.sex) {
            let anchored = supplied(&meta.patient_id).is_some();
            if patient.sex.is_none() || (anchored && !settled_sex.contains(&patient_id)) {
                patient.sex = Some(sex.to_string());
                if anchored {
                    settled_sex.insert(patient_id.clone());
                }
            }
        }

        let case = patient.cases.entry(case_id.clone()).or_default();
        if let Some(project) = meta.project() {
            let anchored = supplied(&meta.case_id).is_some();
            let slot = (patient_id, case_id);
            if case.project_id.is_none() || (anchored && !settled_project.contains(&slot)) {
                case.project_id = Some(project.to_string());
                if anchored {
                    settled_project.insert(slot);
                }
            }
        }

        let mut extra = sample.extra.clone();
        extra.remove("analyses");
        case.samples.insert(
            sample_key.clone(),
            CaseSample {
                sample_meta: meta.narrowed(),
                analyses: sample.seq.clone(),
                extra,
            },
        );
    }

    let mut extra = document.extra.clone();
    extra.remove("patients");
    PatientDocument {
        version: document.version.clone(),
        updated_at: document.updated_at.clone(),
        patients,
        extra,
    }
}

/// Serialize the canonical document in the requested shape
pub fn render(document: &Document, shape: Shape) -> Result<Value> {
    let value = match shape {
        Shape::SampleCentric => serde_json::to_value(document)?,
        Shape::PatientCentric => serde_json::to_value(denormalize(document))?,
    };
    Ok(value)
}
