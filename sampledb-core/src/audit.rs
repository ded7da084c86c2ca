//! Read-only reports over the canonical document

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::{Document, ProcessedFile, ProcessedKind};
use crate::view::patient_key;

/// Totals over the whole document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Counts {
    pub patients: usize,
    pub samples: usize,
    pub seq_blocks: usize,
    pub raw_groups: usize,
    pub fastq_runs: usize,
    pub lanes: usize,
    pub processed: BTreeMap<ProcessedKind, usize>,
}

/// A structural problem found by [`audit`]
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    DuplicateGfId {
        sample: String,
        seq_type: String,
        gf_id: String,
    },
    DuplicateRun {
        sample: String,
        seq_type: String,
        gf_id: String,
        gf_project: String,
        run: String,
    },
    DuplicateProcessedPath {
        sample: String,
        seq_type: String,
        kind: ProcessedKind,
        file_path: String,
    },
    LaneWithoutR1 {
        sample: String,
        seq_type: String,
        gf_id: String,
        run: String,
        lane: String,
    },
    BamWithoutEpoch {
        sample: String,
        seq_type: String,
        file_path: String,
    },
    MissingSampleType {
        sample: String,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::DuplicateGfId { sample, seq_type, gf_id } => {
                write!(f, "{}/{}: gf_id '{}' appears more than once", sample, seq_type, gf_id)
            }
            Issue::DuplicateRun { sample, seq_type, gf_id, gf_project, run } => write!(
                f,
                "{}/{}: run {}/{} appears more than once in group '{}'",
                sample, seq_type, gf_project, run, gf_id
            ),
            Issue::DuplicateProcessedPath { sample, seq_type, kind, file_path } => write!(
                f,
                "{}/{}: {} file '{}' recorded more than once",
                sample, seq_type, kind, file_path
            ),
            Issue::LaneWithoutR1 { sample, seq_type, gf_id, run, lane } => write!(
                f,
                "{}/{}: lane {} of run {} in group '{}' has no R1",
                sample, seq_type, lane, run, gf_id
            ),
            Issue::BamWithoutEpoch { sample, seq_type, file_path } => {
                write!(f, "{}/{}: BAM '{}' has no epoch", sample, seq_type, file_path)
            }
            Issue::MissingSampleType { sample } => write!(f, "{}: sample_type not set", sample),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub counts: Counts,
    pub issues: Vec<Issue>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Values that occur more than once, in order of their second occurrence
fn repeated<K: Ord>(keys: impl IntoIterator<Item = K>) -> Vec<K> {
    let mut seen = BTreeSet::new();
    let mut repeated = Vec::new();
    for key in keys {
        if seen.contains(&key) {
            if !repeated.contains(&key) {
                repeated.push(key);
            }
        } else {
            seen.insert(key);
        }
    }
    repeated
}

pub fn audit(document: &Document) -> AuditReport {
    let mut report = AuditReport::default();
    let counts = &mut report.counts;
    let issues = &mut report.issues;

    counts.samples = document.samples.len();
    counts.patients = document
        .samples
        .values()
        .map(|s| patient_key(&s.sample_meta))
        .collect::<BTreeSet<_>>()
        .len();

    for (sample_key, sample) in &document.samples {
        if sample.sample_meta.sample_type.as_deref().map_or(true, str::is_empty) {
            issues.push(Issue::MissingSampleType {
                sample: sample_key.clone(),
            });
        }

        for (seq_type, block) in &sample.seq {
            counts.seq_blocks += 1;
            counts.raw_groups += block.raw_sequence.len();

            for gf_id in repeated(block.raw_sequence.iter().map(|g| g.gf_id.as_str())) {
                issues.push(Issue::DuplicateGfId {
                    sample: sample_key.clone(),
                    seq_type: seq_type.clone(),
                    gf_id: gf_id.to_string(),
                });
            }

            for group in &block.raw_sequence {
                counts.fastq_runs += group.fastqs.len();

                for key in repeated(group.fastqs.iter().map(|r| r.key())) {
                    issues.push(Issue::DuplicateRun {
                        sample: sample_key.clone(),
                        seq_type: seq_type.clone(),
                        gf_id: group.gf_id.clone(),
                        gf_project: key.gf_project,
                        run: key.run,
                    });
                }

                for fastq_run in &group.fastqs {
                    counts.lanes += fastq_run.files.len();
                    for (lane, reads) in &fastq_run.files {
                        if !reads.contains_key("R1") {
                            issues.push(Issue::LaneWithoutR1 {
                                sample: sample_key.clone(),
                                seq_type: seq_type.clone(),
                                gf_id: group.gf_id.clone(),
                                run: fastq_run.key().to_string(),
                                lane: lane.clone(),
                            });
                        }
                    }
                }
            }

            for kind in ProcessedKind::ALL {
                let files = block.processed_data.files(kind);
                *counts.processed.entry(kind).or_default() += files.len();

                for file_path in repeated(files.iter().map(|f| f.file_path.as_str())) {
                    issues.push(Issue::DuplicateProcessedPath {
                        sample: sample_key.clone(),
                        seq_type: seq_type.clone(),
                        kind,
                        file_path: file_path.to_string(),
                    });
                }
            }

            for bam in &block.processed_data.bam {
                if bam.metadata.epoch.is_none() {
                    issues.push(Issue::BamWithoutEpoch {
                        sample: sample_key.clone(),
                        seq_type: seq_type.clone(),
                        file_path: bam.file_path.clone(),
                    });
                }
            }
        }
    }

    report
}

/// A sample, or a sequencing block of a sample, with no raw sequence recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRawSeq {
    pub sample: String,
    /// `None` when the sample has no sequencing block at all
    pub seq_type: Option<String>,
}

pub fn missing_raw_sequence(document: &Document) -> Vec<MissingRawSeq> {
    let mut missing = Vec::new();
    for (sample_key, sample) in &document.samples {
        if sample.seq.is_empty() {
            missing.push(MissingRawSeq {
                sample: sample_key.clone(),
                seq_type: None,
            });
            continue;
        }
        for (seq_type, block) in &sample.seq {
            if block.raw_sequence.is_empty() {
                missing.push(MissingRawSeq {
                    sample: sample_key.clone(),
                    seq_type: Some(seq_type.clone()),
                });
            }
        }
    }
    missing
}

/// Sequencing block holding more than one BAM
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateBams {
    pub sample: String,
    pub seq_type: String,
    /// Most recent first; the head is what deduplication keeps
    pub files: Vec<ProcessedFile>,
}

pub fn duplicate_bams(document: &Document) -> Vec<DuplicateBams> {
    let mut found = Vec::new();
    for (sample_key, sample) in &document.samples {
        for (seq_type, block) in &sample.seq {
            if block.processed_data.bam.len() > 1 {
                let mut files = block.processed_data.bam.clone();
                files.sort_by_key(|f| std::cmp::Reverse(f.epoch()));
                found.push(DuplicateBams {
                    sample: sample_key.clone(),
                    seq_type: seq_type.clone(),
                    files,
                });
            }
        }
    }
    found
}
