//! Upsert/merge engine
//!
//! Every operation takes the canonical [`Document`] plus the identity fields of
//! the thing being touched, and either mutates exactly that part of the tree or
//! fails before mutating anything. Nested containers (sample, sequencing
//! block, raw sequence group, FASTQ run) are created on first reference and
//! located by natural key afterwards, so repeating a command is idempotent.
//!
//! Two metadata update flavours exist and are kept apart on purpose:
//!
//! - [`Document::ensure_sample`] fills fields that are currently empty and
//!   never replaces a populated one.
//! - [`Document::set_sample_meta`] / [`Document::set_seq_meta`] overwrite
//!   whatever is there with every non-empty value supplied.

use std::cmp::Reverse;

use crate::error::{Error, Result};
use crate::fastq_name::FastqName;
use crate::keyed::{contains_key, find_or_insert};
use crate::model::{
    supplied, Document, FastqRun, FileMetadata, ProcessedFile, ProcessedKind, RawSequenceGroup,
    ReadFiles, Reads, RunKey, Sample, SampleMeta, SeqBlock,
};

/// Metadata given when registering a sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSampleMeta {
    pub patient: Option<String>,
    pub sex: Option<String>,
    pub project: Option<String>,
    pub sample_type: Option<String>,
    pub phenotype: Option<String>,
    pub case_control: Option<String>,
    pub tissue_site: Option<String>,
}

impl NewSampleMeta {
    fn to_sample_meta(&self) -> SampleMeta {
        let own = |value: &Option<String>| supplied(value).map(str::to_string);
        SampleMeta {
            patient: own(&self.patient),
            sex: own(&self.sex),
            sottorivalab_project: own(&self.project),
            sample_type: own(&self.sample_type),
            phenotype: own(&self.phenotype),
            case_control: own(&self.case_control),
            tissue_site: own(&self.tissue_site),
            ..Default::default()
        }
    }
}

/// Fields `set-sample-meta` may overwrite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMetaPatch {
    pub phenotype: Option<String>,
    pub case_control: Option<String>,
    pub tissue_site: Option<String>,
}

/// Fields `set-seq-meta` may overwrite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeqMetaPatch {
    pub indexing: Option<String>,
    pub technology: Option<String>,
}

/// A processed file as given on the command line; `epoch` is parsed here
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProcessedFile {
    pub file_path: String,
    pub file_type: Option<String>,
    pub pipeline_url: Option<String>,
    pub epoch: String,
    pub created: Option<String>,
    pub size: Option<u64>,
}

/// Outcome of [`Document::ensure_sample`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleUpsert {
    Created,
    /// Existing sample; lists the metadata fields that were empty and got filled
    Filled(Vec<&'static str>),
    Unchanged,
}

/// Outcome of [`Document::add_processed_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Same `file_path` already recorded for this kind; nothing changed
    Duplicate,
    /// The sample is not registered; nothing changed
    SampleMissing,
}

/// A BAM dropped by [`Document::deduplicate_bams`]
#[derive(Debug, Clone, PartialEq)]
pub struct DiscardedFile {
    pub sample: String,
    pub seq_type: String,
    pub kept: String,
    pub file: ProcessedFile,
}

fn require<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::MissingArgument(name));
    }
    Ok(value)
}

/// Parse an epoch value; surrounding whitespace is tolerated
pub fn parse_epoch(value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidEpoch(value.to_string()))
}

impl Document {
    pub fn sample(&self, sample: &str) -> Result<&Sample> {
        self.samples.get(sample).ok_or_else(|| Error::SampleNotFound {
            sample: sample.to_string(),
        })
    }

    fn sample_mut(&mut self, sample: &str) -> Result<&mut Sample> {
        self.samples.get_mut(sample).ok_or_else(|| Error::SampleNotFound {
            sample: sample.to_string(),
        })
    }

    /// Register a sample, or fill empty metadata fields of an existing one.
    pub fn ensure_sample(&mut self, sample: &str, meta: &NewSampleMeta) -> Result<SampleUpsert> {
        let sample = require("sample", sample)?;

        let Some(existing) = self.samples.get_mut(sample) else {
            self.samples
                .insert(sample.to_string(), Sample::new(meta.to_sample_meta()));
            return Ok(SampleUpsert::Created);
        };

        let current = &mut existing.sample_meta;
        let slots = [
            ("patient", &mut current.patient, &meta.patient),
            ("sex", &mut current.sex, &meta.sex),
            ("sottorivalab_project", &mut current.sottorivalab_project, &meta.project),
            ("sample_type", &mut current.sample_type, &meta.sample_type),
            ("phenotype", &mut current.phenotype, &meta.phenotype),
            ("case_control", &mut current.case_control, &meta.case_control),
            ("tissue_site", &mut current.tissue_site, &meta.tissue_site),
        ];

        let mut filled = Vec::new();
        for (name, slot, new) in slots {
            if supplied(slot).is_some() {
                continue;
            }
            if let Some(value) = supplied(new) {
                *slot = Some(value.to_string());
                filled.push(name);
            }
        }

        if filled.is_empty() {
            Ok(SampleUpsert::Unchanged)
        } else {
            Ok(SampleUpsert::Filled(filled))
        }
    }

    /// Overwrite phenotype / case_control / tissue_site of an existing sample.
    ///
    /// Returns the names of the fields written.
    pub fn set_sample_meta(
        &mut self,
        sample: &str,
        patch: &SampleMetaPatch,
    ) -> Result<Vec<&'static str>> {
        let updates: Vec<(&'static str, &str)> = [
            ("phenotype", &patch.phenotype),
            ("case_control", &patch.case_control),
            ("tissue_site", &patch.tissue_site),
        ]
        .into_iter()
        .filter_map(|(name, value)| supplied(value).map(|v| (name, v)))
        .collect();

        if updates.is_empty() {
            return Err(Error::NoFieldsSupplied(
                "--phenotype, --case-control, --tissue-site",
            ));
        }

        let meta = &mut self.sample_mut(sample)?.sample_meta;
        for (name, value) in &updates {
            let slot = match *name {
                "phenotype" => &mut meta.phenotype,
                "case_control" => &mut meta.case_control,
                _ => &mut meta.tissue_site,
            };
            *slot = Some(value.to_string());
        }

        Ok(updates.into_iter().map(|(name, _)| name).collect())
    }

    /// Overwrite indexing / technology of a sequencing block, creating the
    /// block if the sample has none for `seq_type` yet.
    pub fn set_seq_meta(
        &mut self,
        sample: &str,
        seq_type: &str,
        patch: &SeqMetaPatch,
    ) -> Result<Vec<&'static str>> {
        let seq_type = require("seq_type", seq_type)?;
        let indexing = supplied(&patch.indexing);
        let technology = supplied(&patch.technology);
        if indexing.is_none() && technology.is_none() {
            return Err(Error::NoFieldsSupplied("--indexing, --technology"));
        }

        let block = self
            .sample_mut(sample)?
            .seq
            .entry(seq_type.to_string())
            .or_default();

        let mut written = Vec::new();
        if let Some(value) = indexing {
            block.indexing = Some(value.to_string());
            written.push("indexing");
        }
        if let Some(value) = technology {
            block.technology = Some(value.to_string());
            written.push("technology");
        }
        Ok(written)
    }

    /// Locate (creating as needed) sample → block → group → run
    fn fastq_run_mut(
        &mut self,
        sample: &str,
        seq_type: &str,
        gf_id: &str,
        run: &RunKey,
    ) -> &mut FastqRun {
        let block: &mut SeqBlock = self
            .samples
            .entry(sample.to_string())
            .or_default()
            .seq
            .entry(seq_type.to_string())
            .or_default();

        let (group, _) = find_or_insert(&mut block.raw_sequence, gf_id, || {
            RawSequenceGroup::new(gf_id)
        });
        let (fastq_run, _) = find_or_insert(&mut group.fastqs, run, || FastqRun::new(run));
        fastq_run
    }

    fn check_fastq_target(sample: &str, seq_type: &str, gf_id: &str, run: &RunKey) -> Result<()> {
        require("sample", sample)?;
        require("seq_type", seq_type)?;
        require("gf_id", gf_id)?;
        require("gf_project", &run.gf_project)?;
        require("run", &run.run)?;
        Ok(())
    }

    /// Record the complete read set of one lane.
    ///
    /// Whatever the lane held before is replaced, so reads not given here are
    /// dropped. Returns the previous content of the lane, if any.
    pub fn upsert_raw_fastq(
        &mut self,
        sample: &str,
        seq_type: &str,
        gf_id: &str,
        run: &RunKey,
        lane: &str,
        reads: Reads,
    ) -> Result<Option<ReadFiles>> {
        Self::check_fastq_target(sample, seq_type, gf_id, run)?;
        let lane = require("lane", lane)?;
        require("r1", &reads.r1)?;

        let fastq_run = self.fastq_run_mut(sample, seq_type, gf_id, run);
        Ok(fastq_run.files.insert(lane.to_string(), reads.into_files()))
    }

    /// Record a single FASTQ file, taking lane and read slot from its name.
    ///
    /// Only the parsed read slot of the lane is written; other reads already
    /// recorded for that lane are kept.
    pub fn upsert_raw_fastq_simple(
        &mut self,
        sample: &str,
        seq_type: &str,
        gf_id: &str,
        run: &RunKey,
        path: &str,
    ) -> Result<FastqName> {
        Self::check_fastq_target(sample, seq_type, gf_id, run)?;
        let path = require("path", path)?;
        let name = FastqName::parse(path)?;

        let fastq_run = self.fastq_run_mut(sample, seq_type, gf_id, run);
        fastq_run
            .files
            .entry(name.lane.clone())
            .or_default()
            .insert(name.read.to_string(), path.to_string());
        Ok(name)
    }

    /// Append a processed output file unless its path is already recorded.
    pub fn add_processed_file(
        &mut self,
        sample: &str,
        seq_type: &str,
        kind: ProcessedKind,
        file: NewProcessedFile,
    ) -> Result<AddOutcome> {
        let seq_type = require("seq_type", seq_type)?;
        require("file_path", &file.file_path)?;
        let epoch = parse_epoch(&file.epoch)?;

        let Some(existing) = self.samples.get_mut(sample) else {
            return Ok(AddOutcome::SampleMissing);
        };

        let block = existing.seq.entry(seq_type.to_string()).or_default();
        let files = block.processed_data.files_mut(kind);
        if contains_key(files, file.file_path.as_str()) {
            return Ok(AddOutcome::Duplicate);
        }

        files.push(ProcessedFile {
            file_type: file
                .file_type
                .filter(|t| !t.trim().is_empty())
                .or_else(|| Some(kind.to_string())),
            pipeline_url: file.pipeline_url,
            metadata: FileMetadata {
                size: file.size,
                created: file.created,
                epoch: Some(epoch),
                ..Default::default()
            },
            file_path: file.file_path,
            ..Default::default()
        });
        Ok(AddOutcome::Added)
    }

    /// Remove every BAM entry whose path is exactly `file_path`.
    ///
    /// Returns how many entries were removed (at least one).
    pub fn remove_bam(&mut self, sample: &str, seq_type: &str, file_path: &str) -> Result<usize> {
        let block = self
            .sample_mut(sample)?
            .seq
            .get_mut(seq_type)
            .ok_or_else(|| Error::SeqTypeNotFound {
                sample: sample.to_string(),
                seq_type: seq_type.to_string(),
            })?;

        let bams = &mut block.processed_data.bam;
        let before = bams.len();
        bams.retain(|bam| bam.file_path != file_path);
        let removed = before - bams.len();

        if removed == 0 {
            return Err(Error::ProcessedFileNotFound {
                sample: sample.to_string(),
                seq_type: seq_type.to_string(),
                kind: ProcessedKind::Bam,
                file_path: file_path.to_string(),
            });
        }
        Ok(removed)
    }

    /// Keep only the most recent BAM of every sequencing block.
    ///
    /// Recency is `metadata.epoch` (missing counts as 0); on a tie the entry
    /// listed first wins. Returns the dropped entries so the caller can delete
    /// the files themselves.
    pub fn deduplicate_bams(&mut self) -> Vec<DiscardedFile> {
        let mut discarded = Vec::new();

        for (sample_key, sample) in &mut self.samples {
            for (seq_type, block) in &mut sample.seq {
                let bams = &mut block.processed_data.bam;
                if bams.len() <= 1 {
                    continue;
                }

                bams.sort_by_key(|bam| Reverse(bam.epoch()));
                let dropped = bams.split_off(1);
                let kept = bams[0].file_path.clone();

                discarded.extend(dropped.into_iter().map(|file| DiscardedFile {
                    sample: sample_key.clone(),
                    seq_type: seq_type.clone(),
                    kept: kept.clone(),
                    file,
                }));
            }
        }

        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReadDesignator;

    fn doc_with_sample(sample: &str) -> Document {
        let mut doc = Document::default();
        doc.ensure_sample(sample, &NewSampleMeta::default()).unwrap();
        doc
    }

    fn bam(path: &str, epoch: &str) -> NewProcessedFile {
        NewProcessedFile {
            file_path: path.to_string(),
            pipeline_url: Some("https://pipelines.example/align".to_string()),
            epoch: epoch.to_string(),
            ..Default::default()
        }
    }

    fn run() -> RunKey {
        RunKey::new("GFPROJ", "run01")
    }

    #[test]
    fn test_ensure_sample_creates_with_meta() {
        let mut doc = Document::default();
        let meta = NewSampleMeta {
            patient: Some("P1".into()),
            sample_type: Some("tumour".into()),
            phenotype: Some("".into()),
            ..Default::default()
        };

        assert_eq!(doc.ensure_sample("S1", &meta).unwrap(), SampleUpsert::Created);
        let sample = &doc.samples["S1"];
        assert_eq!(sample.sample_meta.patient.as_deref(), Some("P1"));
        assert_eq!(sample.sample_meta.sample_type.as_deref(), Some("tumour"));
        assert!(sample.sample_meta.phenotype.is_none());
        assert!(sample.seq.is_empty());
    }

    #[test]
    fn test_ensure_sample_is_idempotent() {
        let meta = NewSampleMeta {
            sex: Some("F".into()),
            ..Default::default()
        };
        let mut once = Document::default();
        once.ensure_sample("S1", &meta).unwrap();

        let mut twice = once.clone();
        assert_eq!(twice.ensure_sample("S1", &meta).unwrap(), SampleUpsert::Unchanged);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_ensure_sample_fills_but_never_overwrites() {
        let mut doc = Document::default();
        doc.ensure_sample(
            "S1",
            &NewSampleMeta {
                sample_type: Some("X".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let outcome = doc
            .ensure_sample(
                "S1",
                &NewSampleMeta {
                    sample_type: Some("Y".into()),
                    tissue_site: Some("liver".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(outcome, SampleUpsert::Filled(vec!["tissue_site"]));
        let meta = &doc.samples["S1"].sample_meta;
        assert_eq!(meta.sample_type.as_deref(), Some("X"));
        assert_eq!(meta.tissue_site.as_deref(), Some("liver"));
    }

    #[test]
    fn test_ensure_sample_keeps_sequencing_data() {
        let mut doc = Document::default();
        doc.upsert_raw_fastq("S1", "wgs", "GF1", &run(), "L001", Reads::new("a"))
            .unwrap();
        doc.ensure_sample("S1", &NewSampleMeta::default()).unwrap();
        assert_eq!(doc.samples["S1"].seq["wgs"].raw_sequence.len(), 1);
    }

    #[test]
    fn test_ensure_sample_requires_key() {
        let mut doc = Document::default();
        assert!(matches!(
            doc.ensure_sample(" ", &NewSampleMeta::default()),
            Err(Error::MissingArgument("sample"))
        ));
    }

    #[test]
    fn test_set_sample_meta_overwrites() {
        let mut doc = Document::default();
        doc.ensure_sample(
            "S1",
            &NewSampleMeta {
                phenotype: Some("X".into()),
                case_control: Some("case".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let written = doc
            .set_sample_meta(
                "S1",
                &SampleMetaPatch {
                    phenotype: Some("Y".into()),
                    case_control: Some("".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(written, vec!["phenotype"]);
        let meta = &doc.samples["S1"].sample_meta;
        assert_eq!(meta.phenotype.as_deref(), Some("Y"));
        assert_eq!(meta.case_control.as_deref(), Some("case"));
    }

    #[test]
    fn test_set_sample_meta_errors() {
        let mut doc = doc_with_sample("S1");
        assert!(matches!(
            doc.set_sample_meta("S1", &SampleMetaPatch::default()),
            Err(Error::NoFieldsSupplied(_))
        ));

        let patch = SampleMetaPatch {
            tissue_site: Some("colon".into()),
            ..Default::default()
        };
        assert!(matches!(
            doc.set_sample_meta("NOPE", &patch),
            Err(Error::SampleNotFound { .. })
        ));
    }

    #[test]
    fn test_set_seq_meta_creates_block() {
        let mut doc = doc_with_sample("S1");
        let patch = SeqMetaPatch {
            technology: Some("illumina".into()),
            ..Default::default()
        };
        assert_eq!(doc.set_seq_meta("S1", "wes", &patch).unwrap(), vec!["technology"]);

        let block = &doc.samples["S1"].seq["wes"];
        assert_eq!(block.technology.as_deref(), Some("illumina"));
        assert!(block.indexing.is_none());
        assert!(block.raw_sequence.is_empty());

        let patch = SeqMetaPatch {
            technology: Some("ont".into()),
            indexing: Some("single".into()),
        };
        doc.set_seq_meta("S1", "wes", &patch).unwrap();
        let block = &doc.samples["S1"].seq["wes"];
        assert_eq!(block.technology.as_deref(), Some("ont"));
        assert_eq!(block.indexing.as_deref(), Some("single"));

        assert!(matches!(
            doc.set_seq_meta("S2", "wes", &patch),
            Err(Error::SampleNotFound { .. })
        ));
    }

    #[test]
    fn test_raw_fastq_natural_keys_stay_unique() {
        let mut doc = Document::default();
        for lane in ["L001", "L002", "L001"] {
            doc.upsert_raw_fastq("S1", "wgs", "GF1", &run(), lane, Reads::new("r1"))
                .unwrap();
        }
        doc.upsert_raw_fastq_simple("S1", "wgs", "GF1", &run(), "x_L003_R2_001.fastq.gz")
            .unwrap();
        doc.upsert_raw_fastq("S1", "wgs", "GF1", &RunKey::new("GFPROJ", "run02"), "L001", Reads::new("r1"))
            .unwrap();
        doc.upsert_raw_fastq("S1", "wgs", "GF2", &run(), "L001", Reads::new("r1"))
            .unwrap();

        let groups = &doc.samples["S1"].seq["wgs"].raw_sequence;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].gf_id, "GF1");
        assert_eq!(groups[0].fastqs.len(), 2);
        assert_eq!(groups[0].fastqs[0].files.len(), 3);
        assert_eq!(groups[1].fastqs.len(), 1);
    }

    #[test]
    fn test_simple_mode_merges_reads() {
        let mut doc = Document::default();
        doc.upsert_raw_fastq("S1", "wgs", "GF1", &run(), "L001", Reads::new("a"))
            .unwrap();

        let name = doc
            .upsert_raw_fastq_simple("S1", "wgs", "GF1", &run(), "/seq/S1_L001_R2_001.fastq.gz")
            .unwrap();
        assert_eq!(name.read, ReadDesignator::R2);

        let lane = &doc.samples["S1"].seq["wgs"].raw_sequence[0].fastqs[0].files["L001"];
        assert_eq!(lane.len(), 2);
        assert_eq!(lane["R1"], "a");
        assert_eq!(lane["R2"], "/seq/S1_L001_R2_001.fastq.gz");
    }

    #[test]
    fn test_detailed_mode_replaces_lane() {
        let mut doc = Document::default();
        doc.upsert_raw_fastq("S1", "wgs", "GF1", &run(), "L001", Reads::new("a").with_r2("c"))
            .unwrap();

        let previous = doc
            .upsert_raw_fastq("S1", "wgs", "GF1", &run(), "L001", Reads::new("b"))
            .unwrap();
        assert_eq!(previous.map(|p| p.len()), Some(2));

        let lane = &doc.samples["S1"].seq["wgs"].raw_sequence[0].fastqs[0].files["L001"];
        assert_eq!(lane.len(), 1);
        assert_eq!(lane["R1"], "b");
    }

    #[test]
    fn test_simple_mode_parse_failure_leaves_document() {
        let mut doc = doc_with_sample("S1");
        let before = doc.clone();
        let result = doc.upsert_raw_fastq_simple("S1", "wgs", "GF1", &run(), "S1_R1_001.fastq.gz");
        assert!(matches!(result, Err(Error::LaneNotInFilename(_))));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_raw_fastq_requires_identity() {
        let mut doc = Document::default();
        let result = doc.upsert_raw_fastq("S1", "wgs", "", &run(), "L001", Reads::new("a"));
        assert!(matches!(result, Err(Error::MissingArgument("gf_id"))));
        assert!(doc.samples.is_empty());
    }

    #[test]
    fn test_add_processed_file_and_duplicate() {
        let mut doc = doc_with_sample("S1");
        let outcome = doc
            .add_processed_file("S1", "wgs", ProcessedKind::Vcf, bam("/out/s1.vcf.gz", "100"))
            .unwrap();
        assert_eq!(outcome, AddOutcome::Added);

        let outcome = doc
            .add_processed_file("S1", "wgs", ProcessedKind::Vcf, bam("/out/s1.vcf.gz", "200"))
            .unwrap();
        assert_eq!(outcome, AddOutcome::Duplicate);

        let vcfs = &doc.samples["S1"].seq["wgs"].processed_data.vcf;
        assert_eq!(vcfs.len(), 1);
        assert_eq!(vcfs[0].metadata.epoch, Some(100));
        assert_eq!(vcfs[0].file_type.as_deref(), Some("vcf"));
    }

    #[test]
    fn test_add_processed_file_missing_sample_is_not_fatal() {
        let mut doc = Document::default();
        let outcome = doc
            .add_processed_file("S1", "wgs", ProcessedKind::Bam, bam("/a.bam", "1"))
            .unwrap();
        assert_eq!(outcome, AddOutcome::SampleMissing);
        assert!(doc.samples.is_empty());
    }

    #[test]
    fn test_add_processed_file_bad_epoch() {
        let mut doc = doc_with_sample("S1");
        let before = doc.clone();
        let result = doc.add_processed_file("S1", "wgs", ProcessedKind::Bam, bam("/a.bam", "yesterday"));
        assert!(matches!(result, Err(Error::InvalidEpoch(_))));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_remove_bam_filters_all_matches() {
        let mut doc = doc_with_sample("S1");
        doc.add_processed_file("S1", "wgs", ProcessedKind::Bam, bam("/a.bam", "1"))
            .unwrap();
        doc.add_processed_file("S1", "wgs", ProcessedKind::Bam, bam("/b.bam", "2"))
            .unwrap();
        // an abnormal duplicate written by hand
        let dup = doc.samples["S1"].seq["wgs"].processed_data.bam[0].clone();
        doc.samples.get_mut("S1").unwrap().seq.get_mut("wgs").unwrap().processed_data.bam.push(dup);

        assert_eq!(doc.remove_bam("S1", "wgs", "/a.bam").unwrap(), 2);
        let bams = &doc.samples["S1"].seq["wgs"].processed_data.bam;
        assert_eq!(bams.len(), 1);
        assert_eq!(bams[0].file_path, "/b.bam");

        assert!(matches!(
            doc.remove_bam("S1", "wgs", "/a.bam"),
            Err(Error::ProcessedFileNotFound { .. })
        ));
        assert!(matches!(
            doc.remove_bam("S1", "wes", "/b.bam"),
            Err(Error::SeqTypeNotFound { .. })
        ));
        assert!(matches!(
            doc.remove_bam("S9", "wgs", "/b.bam"),
            Err(Error::SampleNotFound { .. })
        ));
    }

    #[test]
    fn test_deduplicate_keeps_highest_epoch() {
        let mut doc = doc_with_sample("S1");
        for (path, epoch) in [("/e10.bam", "10"), ("/e30.bam", "30"), ("/e20.bam", "20")] {
            doc.add_processed_file("S1", "wgs", ProcessedKind::Bam, bam(path, epoch))
                .unwrap();
        }
        doc.add_processed_file("S1", "wes", ProcessedKind::Bam, bam("/only.bam", "5"))
            .unwrap();

        let discarded = doc.deduplicate_bams();
        let paths: Vec<_> = discarded.iter().map(|d| d.file.file_path.as_str()).collect();
        assert_eq!(paths, vec!["/e20.bam", "/e10.bam"]);
        assert!(discarded.iter().all(|d| d.kept == "/e30.bam"));

        let wgs = &doc.samples["S1"].seq["wgs"].processed_data.bam;
        assert_eq!(wgs.len(), 1);
        assert_eq!(wgs[0].file_path, "/e30.bam");
        assert_eq!(doc.samples["S1"].seq["wes"].processed_data.bam.len(), 1);
    }

    #[test]
    fn test_deduplicate_tie_keeps_first_listed() {
        let mut doc = doc_with_sample("S1");
        doc.add_processed_file("S1", "wgs", ProcessedKind::Bam, bam("/first.bam", "7"))
            .unwrap();
        doc.add_processed_file("S1", "wgs", ProcessedKind::Bam, bam("/second.bam", "7"))
            .unwrap();
        doc.samples.get_mut("S1").unwrap().seq.get_mut("wgs").unwrap().processed_data.bam[0]
            .metadata
            .epoch = None;
        doc.add_processed_file("S1", "wgs", ProcessedKind::Bam, bam("/third.bam", "0"))
            .unwrap();

        let discarded = doc.deduplicate_bams();
        assert_eq!(discarded.len(), 2);
        assert_eq!(doc.samples["S1"].seq["wgs"].processed_data.bam[0].file_path, "/second.bam");
        assert_eq!(discarded[0].file.file_path, "/first.bam");
    }

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch(" 1700000000 ").unwrap(), 1_700_000_000);
        assert!(parse_epoch("1.5").is_err());
    }
}
