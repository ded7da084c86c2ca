//! Document model
//!
//! The canonical in-memory tree is sample-centric: a flat mapping of samples,
//! each owning its sequencing blocks. The patient-centric shape is only a
//! serialization view (see [`crate::view`]).
//!
//! Every struct keeps the JSON fields it does not know about in an `extra`
//! map so that unrelated data survives a read-modify-write cycle.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Unknown JSON fields carried through untouched
pub type Extra = Map<String, Value>;

/// Read designator to file path, e.g. `{"R1": "..._R1_001.fastq.gz"}`
pub type ReadFiles = BTreeMap<String, String>;

/// Treat an explicit `null` the same as an absent field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Returns the value only if it is present and not blank
pub(crate) fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// The sample-centric database document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub samples: BTreeMap<String, Sample>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A single biological sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_meta: SampleMeta,

    /// Sequencing blocks keyed by sequencing type (`wgs`, `wes`, ...)
    #[serde(default, alias = "analyses", deserialize_with = "null_as_default")]
    pub seq: BTreeMap<String, SeqBlock>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Sample {
    pub fn new(sample_meta: SampleMeta) -> Self {
        Self {
            sample_meta,
            ..Default::default()
        }
    }
}

/// Descriptive metadata attached to a sample.
///
/// `patient_id`, `case_id` and `project_id` only appear on samples that were
/// flattened out of a patient-centric document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sottorivalab_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phenotype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tissue_site: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl SampleMeta {
    /// Project recorded on the sample, preferring the derived `project_id`
    pub fn project(&self) -> Option<&str> {
        supplied(&self.project_id).or_else(|| supplied(&self.sottorivalab_project))
    }

    /// Keep only the fields that belong to a sample inside a patient-centric
    /// case; identity and patient-level fields live higher up the tree.
    pub fn narrowed(&self) -> SampleMeta {
        SampleMeta {
            sample_type: self.sample_type.clone(),
            phenotype: self.phenotype.clone(),
            case_control: self.case_control.clone(),
            tissue_site: self.tissue_site.clone(),
            extra: self.extra.clone(),
            ..Default::default()
        }
    }
}

/// Everything recorded for one sequencing type of a sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeqBlock {
    #[serde(default)]
    pub indexing: Option<String>,
    #[serde(default)]
    pub technology: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_sequence: Vec<RawSequenceGroup>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub processed_data: ProcessedData,

    #[serde(flatten)]
    pub extra: Extra,
}

/// One sequencing-facility submission, identified by `gf_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSequenceGroup {
    pub gf_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub fastqs: Vec<FastqRun>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl RawSequenceGroup {
    pub fn new(gf_id: impl Into<String>) -> Self {
        Self {
            gf_id: gf_id.into(),
            ..Default::default()
        }
    }
}

/// Composite natural key of a [`FastqRun`] within its group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunKey {
    pub gf_project: String,
    pub run: String,
}

impl RunKey {
    pub fn new(gf_project: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            gf_project: gf_project.into(),
            run: run.into(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.gf_project, self.run)
    }
}

/// One sequencing run: lane label to read files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FastqRun {
    pub gf_project: String,
    pub run: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub files: BTreeMap<String, ReadFiles>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl FastqRun {
    pub fn new(key: &RunKey) -> Self {
        Self {
            gf_project: key.gf_project.clone(),
            run: key.run.clone(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> RunKey {
        RunKey::new(&self.gf_project, &self.run)
    }
}

/// Read designator of a FASTQ file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadDesignator {
    R1,
    R2,
    R3,
}

impl ReadDesignator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadDesignator::R1 => "R1",
            ReadDesignator::R2 => "R2",
            ReadDesignator::R3 => "R3",
        }
    }
}

impl fmt::Display for ReadDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadDesignator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R1" | "1" => Ok(ReadDesignator::R1),
            "R2" | "2" => Ok(ReadDesignator::R2),
            "R3" | "3" => Ok(ReadDesignator::R3),
            _ => Err(Error::UnknownRead(s.to_string())),
        }
    }
}

/// The complete read set of one lane, as given to the detailed upsert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reads {
    pub r1: String,
    pub r2: Option<String>,
    pub r3: Option<String>,
}

impl Reads {
    pub fn new(r1: impl Into<String>) -> Self {
        Self {
            r1: r1.into(),
            ..Default::default()
        }
    }

    pub fn with_r2(mut self, r2: impl Into<String>) -> Self {
        self.r2 = Some(r2.into());
        self
    }

    pub fn with_r3(mut self, r3: impl Into<String>) -> Self {
        self.r3 = Some(r3.into());
        self
    }

    /// Blank optional reads are dropped
    pub fn into_files(self) -> ReadFiles {
        let mut files = ReadFiles::new();
        files.insert(ReadDesignator::R1.to_string(), self.r1);
        for (read, path) in [(ReadDesignator::R2, self.r2), (ReadDesignator::R3, self.r3)] {
            if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
                files.insert(read.to_string(), path);
            }
        }
        files
    }
}

/// Kinds of processed output tracked per sequencing block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessedKind {
    Bam,
    Vcf,
    Cna,
    Qc,
}

impl ProcessedKind {
    pub const ALL: [ProcessedKind; 4] = [
        ProcessedKind::Bam,
        ProcessedKind::Vcf,
        ProcessedKind::Cna,
        ProcessedKind::Qc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedKind::Bam => "bam",
            ProcessedKind::Vcf => "vcf",
            ProcessedKind::Cna => "cna",
            ProcessedKind::Qc => "qc",
        }
    }
}

impl fmt::Display for ProcessedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessedKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bam" => Ok(ProcessedKind::Bam),
            "vcf" => Ok(ProcessedKind::Vcf),
            "cna" => Ok(ProcessedKind::Cna),
            "qc" => Ok(ProcessedKind::Qc),
            _ => Err(Error::UnknownDataKind(s.to_string())),
        }
    }
}

/// Processed outputs of a sequencing block, one ordered list per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub bam: Vec<ProcessedFile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vcf: Vec<ProcessedFile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cna: Vec<ProcessedFile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub qc: Vec<ProcessedFile>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl ProcessedData {
    pub fn files(&self, kind: ProcessedKind) -> &[ProcessedFile] {
        match kind {
            ProcessedKind::Bam => &self.bam,
            ProcessedKind::Vcf => &self.vcf,
            ProcessedKind::Cna => &self.cna,
            ProcessedKind::Qc => &self.qc,
        }
    }

    pub fn files_mut(&mut self, kind: ProcessedKind) -> &mut Vec<ProcessedFile> {
        match kind {
            ProcessedKind::Bam => &mut self.bam,
            ProcessedKind::Vcf => &mut self.vcf,
            ProcessedKind::Cna => &mut self.cna,
            ProcessedKind::Qc => &mut self.qc,
        }
    }
}

/// A processed output file (BAM, VCF, CNA call set or QC report)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub file_path: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub pipeline_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: FileMetadata,

    #[serde(flatten)]
    pub extra: Extra,
}

impl ProcessedFile {
    /// Recency rank; a missing epoch sorts as 0
    pub fn epoch(&self) -> i64 {
        self.metadata.epoch.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub epoch: Option<i64>,

    #[serde(flatten)]
    pub extra: Extra,
}
