//! sampledb-core - document model and merge engine for the sampledb
//! genomics sample tracker.
//!
//! The database is a single JSON document. It is accepted in two shapes and
//! always edited in one:
//!
//! ```text
//!  persisted JSON ──normalize──▶ Document ──merge op──▶ Document ──render──▶ persisted JSON
//!  (either shape)   (+ Shape)   (sample-centric)                 (same shape as read)
//! ```
//!
//! # Tree
//!
//! ```text
//! sample
//!  └─ seq.<seq_type>                    indexing, technology
//!      ├─ raw_sequence[gf_id]
//!      │   └─ fastqs[(gf_project, run)]
//!      │       └─ files.<lane>.<R1|R2|R3> = path
//!      └─ processed_data.<bam|vcf|cna|qc>[file_path]
//! ```
//!
//! Square brackets mark arrays addressed by natural key (see [`keyed`]).
//! Nothing in this crate touches the filesystem.

pub mod audit;
mod error;
pub mod fastq_name;
pub mod keyed;
pub mod merge;
pub mod model;
pub mod view;

pub use error::{Error, ErrorKind, Result};
pub use fastq_name::FastqName;
pub use merge::{
    parse_epoch, AddOutcome, DiscardedFile, NewProcessedFile, NewSampleMeta, SampleMetaPatch,
    SampleUpsert, SeqMetaPatch,
};
pub use model::{
    Document, FastqRun, FileMetadata, ProcessedData, ProcessedFile, ProcessedKind,
    RawSequenceGroup, ReadDesignator, ReadFiles, Reads, RunKey, Sample, SampleMeta, SeqBlock,
};
pub use view::{denormalize, normalize, render, PatientDocument, Shape};

/// Parse JSON text into the canonical document and the shape it was stored in
pub fn parse(input: &str) -> Result<(Document, Shape)> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    normalize(value)
}
