//! sampledb - genomics sample tracking database
//!
//! Samples, sequencing runs, raw FASTQ files and processed outputs
//! (BAM/VCF/CNA/QC) are kept in a single JSON file.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          sampledb CLI                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │   Config    │  │ Identifier  │  │   JSON Schema           │  │
//! │  │   (YAML)    │  │ Validation  │  │   (validate-db)         │  │
//! │  └──────┬──────┘  └──────┬──────┘  └───────────┬─────────────┘  │
//! │         ▼                ▼                     ▼                │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                  Database (this crate)                      ││
//! │  │   open ─▶ one merge operation ─▶ save, then side effects    ││
//! │  └──────────────────────────┬──────────────────────────────────┘│
//! │                             ▼                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                   sampledb-core                             ││
//! │  │  view adapter (sample ⇄ patient)   upsert/merge engine      ││
//! │  └──────────────────────────┬──────────────────────────────────┘│
//! │                             ▼                                   │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                    Storage Layer                            ││
//! │  │  JSON file (temp file + rename)   data files (stat, delete) ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`Database`] remembers which [`Shape`] the file was stored in and writes
//! it back in that same shape. No locking is done: two concurrent writers
//! race and the last rename wins.

pub mod config;
pub mod error;
pub mod scan;
pub mod schema;
pub mod storage;
pub mod validation;

pub use error::{Error, Result};

pub use sampledb_core::{
    AddOutcome, DiscardedFile, Document, FastqName, NewProcessedFile, NewSampleMeta,
    ProcessedKind, Reads, RunKey, SampleMetaPatch, SampleUpsert, SeqMetaPatch, Shape,
};
pub use schema::{JsonSchema, SchemaViolation};

use chrono::{SecondsFormat, Utc};
use sampledb_core::ErrorKind;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

use storage::{data_files, json_file};
use validation::{validate_label, validate_sample_key, validate_seq_type};

/// `version` written into newly created databases
pub const FORMAT_VERSION: &str = "1.0";

/// Identity of a FASTQ run: where in the tree raw reads are recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqTarget {
    pub sample: String,
    pub seq_type: String,
    pub gf_id: String,
    pub run: RunKey,
}

impl FastqTarget {
    pub fn validate(&self) -> Result<()> {
        validate_sample_key(&self.sample)?;
        validate_seq_type(&self.seq_type)?;
        validate_label(&self.gf_id, "gf_id")?;
        validate_label(&self.run.gf_project, "gf_project")?;
        validate_label(&self.run.run, "run")?;
        Ok(())
    }
}

impl fmt::Display for FastqTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.sample, self.seq_type, self.gf_id, self.run)
    }
}

/// The database handle: one loaded document and the shape it came in
pub struct Database {
    /// Path of the JSON file
    pub path: PathBuf,
    /// Canonical (sample-centric) content
    pub document: Document,
    /// Shape the file is stored in
    pub shape: Shape,
    pretty: bool,
}

impl Database {
    /// Open an existing database file
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let value = json_file::read(&path).await?;
        let (document, shape) = sampledb_core::normalize(value)?;
        tracing::debug!(
            "Opened {:?} ({}, {} samples)",
            path,
            shape,
            document.samples.len()
        );

        Ok(Self {
            path,
            document,
            shape,
            pretty: true,
        })
    }

    /// Create a new, empty database file; refuses to overwrite
    pub async fn create(path: impl Into<PathBuf>, shape: Shape) -> Result<Self> {
        let path = path.into();
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::DatabaseAlreadyExists { path });
        }

        let mut db = Self {
            path,
            document: Document {
                version: Some(Value::String(FORMAT_VERSION.to_string())),
                ..Default::default()
            },
            shape,
            pretty: true,
        };
        db.save().await?;
        Ok(db)
    }

    /// Pretty-print on write (default) or write compact JSON
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Stamp `updated_at` and atomically write the document in its shape
    pub async fn save(&mut self) -> Result<()> {
        self.document.updated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        let value = sampledb_core::render(&self.document, self.shape)?;
        json_file::write(&self.path, &value, self.pretty).await?;
        tracing::info!("Saved {:?} ({})", self.path, self.shape);
        Ok(())
    }

    /// Register a sample or fill in its missing metadata
    pub async fn add_sample(&mut self, sample: &str, meta: &NewSampleMeta) -> Result<SampleUpsert> {
        validate_sample_key(sample)?;
        let outcome = self.document.ensure_sample(sample, meta)?;

        match &outcome {
            SampleUpsert::Created => tracing::info!("Created sample '{}'", sample),
            SampleUpsert::Filled(fields) => {
                tracing::info!("Filled {} on sample '{}'", fields.join(", "), sample)
            }
            SampleUpsert::Unchanged => {
                tracing::info!("Sample '{}' already up to date", sample);
                return Ok(outcome);
            }
        }

        self.save().await?;
        Ok(outcome)
    }

    /// Overwrite phenotype / case_control / tissue_site
    pub async fn set_sample_meta(
        &mut self,
        sample: &str,
        patch: &SampleMetaPatch,
    ) -> Result<Vec<&'static str>> {
        let written = self.document.set_sample_meta(sample, patch)?;
        tracing::info!("Set {} on sample '{}'", written.join(", "), sample);
        self.save().await?;
        Ok(written)
    }

    /// Overwrite indexing / technology of one sequencing type
    pub async fn set_seq_meta(
        &mut self,
        sample: &str,
        seq_type: &str,
        patch: &SeqMetaPatch,
    ) -> Result<Vec<&'static str>> {
        validate_seq_type(seq_type)?;
        let written = self.document.set_seq_meta(sample, seq_type, patch)?;
        tracing::info!("Set {} on {}/{}", written.join(", "), sample, seq_type);
        self.save().await?;
        Ok(written)
    }

    /// Record the full read set of one lane, replacing what was there
    pub async fn add_fastq(&mut self, target: &FastqTarget, lane: &str, reads: Reads) -> Result<()> {
        target.validate()?;
        validate_label(lane, "lane")?;

        let previous = self.document.upsert_raw_fastq(
            &target.sample,
            &target.seq_type,
            &target.gf_id,
            &target.run,
            lane,
            reads,
        )?;
        match previous {
            Some(old) => tracing::info!(
                "Replaced lane {} of {} ({} read file(s) before)",
                lane,
                target,
                old.len()
            ),
            None => tracing::info!("Added lane {} to {}", lane, target),
        }

        self.save().await
    }

    /// Record one FASTQ file, lane and read taken from its name
    pub async fn add_fastq_simple(&mut self, target: &FastqTarget, path: &str) -> Result<FastqName> {
        target.validate()?;
        let name = self.document.upsert_raw_fastq_simple(
            &target.sample,
            &target.seq_type,
            &target.gf_id,
            &target.run,
            path,
        )?;
        tracing::info!("Set {} {} of {} to {}", name.lane, name.read, target, path);

        self.save().await?;
        Ok(name)
    }

    /// Record every FASTQ file found directly inside `dir`.
    ///
    /// Files whose names carry no lane or read are skipped with a warning;
    /// finding none that parse is an error.
    pub async fn add_fastq_dir(
        &mut self,
        target: &FastqTarget,
        dir: &Path,
    ) -> Result<Vec<(PathBuf, FastqName)>> {
        target.validate()?;

        let mut added = Vec::new();
        for path in scan::find_fastqs(dir)? {
            let path_str = path.to_string_lossy().into_owned();
            match self.document.upsert_raw_fastq_simple(
                &target.sample,
                &target.seq_type,
                &target.gf_id,
                &target.run,
                &path_str,
            ) {
                Ok(name) => added.push((path, name)),
                Err(err) if err.kind() == ErrorKind::Parse => {
                    tracing::warn!("Skipping {:?}: {}", path, err)
                }
                Err(err) => return Err(err.into()),
            }
        }

        if added.is_empty() {
            return Err(Error::NoFastqFiles {
                path: dir.to_path_buf(),
            });
        }

        tracing::info!("Recorded {} FASTQ file(s) under {}", added.len(), target);
        self.save().await?;
        Ok(added)
    }

    /// Append a processed output; duplicates and unknown samples are
    /// reported through the outcome and leave the file untouched.
    pub async fn add_processed(
        &mut self,
        sample: &str,
        seq_type: &str,
        kind: ProcessedKind,
        file: NewProcessedFile,
    ) -> Result<AddOutcome> {
        validate_seq_type(seq_type)?;
        let path = file.file_path.clone();
        let outcome = self.document.add_processed_file(sample, seq_type, kind, file)?;

        match outcome {
            AddOutcome::Added => {
                tracing::info!("Added {} '{}' to {}/{}", kind, path, sample, seq_type);
                self.save().await?;
            }
            AddOutcome::Duplicate => tracing::warn!(
                "{} '{}' is already recorded for {}/{}; nothing added",
                kind,
                path,
                sample,
                seq_type
            ),
            AddOutcome::SampleMissing => {
                tracing::warn!("Sample '{}' not found; {} '{}' not added", sample, kind, path)
            }
        }

        Ok(outcome)
    }

    /// Add a BAM, taking size and timestamps from the file on disk
    pub async fn add_bam(
        &mut self,
        sample: &str,
        seq_type: &str,
        bam_path: &Path,
        pipeline_url: Option<String>,
    ) -> Result<AddOutcome> {
        let stat = data_files::stat(bam_path).await;
        if stat.is_none() {
            tracing::warn!(
                "{:?} not found on disk; recording it without size or timestamps",
                bam_path
            );
        }

        let file = NewProcessedFile {
            file_path: bam_path.to_string_lossy().into_owned(),
            file_type: Some(ProcessedKind::Bam.to_string()),
            pipeline_url,
            epoch: stat.as_ref().map_or(0, |s| s.epoch).to_string(),
            created: stat.as_ref().map(|s| s.created.clone()),
            size: stat.map(|s| s.size),
        };
        self.add_processed(sample, seq_type, ProcessedKind::Bam, file).await
    }

    /// Remove a BAM entry, then (optionally) the file itself
    pub async fn remove_bam(
        &mut self,
        sample: &str,
        seq_type: &str,
        file_path: &str,
        delete_file: bool,
    ) -> Result<usize> {
        let removed = self.document.remove_bam(sample, seq_type, file_path)?;
        tracing::info!(
            "Removed {} BAM entr{} '{}' from {}/{}",
            removed,
            if removed == 1 { "y" } else { "ies" },
            file_path,
            sample,
            seq_type
        );
        self.save().await?;

        if delete_file {
            self.delete_unreferenced(file_path).await?;
        }
        Ok(removed)
    }

    /// Keep only the newest BAM per sequencing block.
    ///
    /// With `dry_run` nothing is written or deleted; the returned list is
    /// what would be discarded.
    pub async fn cleanup_bams(
        &mut self,
        delete_files: bool,
        dry_run: bool,
    ) -> Result<Vec<DiscardedFile>> {
        if dry_run {
            return Ok(self.document.clone().deduplicate_bams());
        }

        let discarded = self.document.deduplicate_bams();
        if discarded.is_empty() {
            tracing::info!("No duplicate BAMs found");
            return Ok(discarded);
        }

        tracing::info!("Discarding {} duplicate BAM entries", discarded.len());
        self.save().await?;

        if delete_files {
            let mut first_error = None;
            for entry in &discarded {
                if let Err(err) = self.delete_unreferenced(&entry.file.file_path).await {
                    tracing::error!("{}", err);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        Ok(discarded)
    }

    /// Rewrite the file in another shape. Returns false if already in it.
    pub async fn convert(&mut self, shape: Shape) -> Result<bool> {
        if self.shape == shape {
            return Ok(false);
        }
        tracing::info!("Converting {:?} from {} to {}", self.path, self.shape, shape);
        self.shape = shape;
        self.save().await?;
        Ok(true)
    }

    /// True if any BAM entry still points at `file_path`
    fn is_referenced(&self, file_path: &str) -> bool {
        self.document.samples.values().any(|sample| {
            sample
                .seq
                .values()
                .any(|block| block.processed_data.bam.iter().any(|b| b.file_path == file_path))
        })
    }

    async fn delete_unreferenced(&self, file_path: &str) -> Result<()> {
        if self.is_referenced(file_path) {
            tracing::warn!("Not deleting {:?}: still referenced by another entry", file_path);
            return Ok(());
        }
        data_files::remove(Path::new(file_path)).await?;
        Ok(())
    }
}

/// Validate a database file against a JSON Schema.
///
/// Patient-centric files are checked as stored. Sample-centric files are
/// checked through their patient-centric rendering.
pub async fn validate_file(
    path: &Path,
    schema: &JsonSchema,
) -> Result<std::result::Result<(), SchemaViolation>> {
    let value = json_file::read(path).await?;
    let instance = match Shape::detect(&value) {
        Shape::PatientCentric => value,
        Shape::SampleCentric => {
            let (document, _) = sampledb_core::normalize(value)?;
            sampledb_core::render(&document, Shape::PatientCentric)?
        }
    };
    Ok(schema.validate(&instance))
}
