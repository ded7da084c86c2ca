//! Lane and read designator extraction from FASTQ filenames
//!
//! Illumina-style names carry both, e.g. `S1_S3_L002_R1_001.fastq.gz`.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::model::ReadDesignator;

fn lane_pattern() -> &'static Regex {
    static LANE: OnceLock<Regex> = OnceLock::new();
    LANE.get_or_init(|| Regex::new(r"_(L\d{3})(?:\D|$)").expect("valid lane pattern"))
}

fn read_pattern() -> &'static Regex {
    static READ: OnceLock<Regex> = OnceLock::new();
    READ.get_or_init(|| Regex::new(r"_(R[1-3])_").expect("valid read pattern"))
}

/// Lane label and read slot encoded in a FASTQ filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqName {
    /// Lane label, e.g. `L001`
    pub lane: String,
    pub read: ReadDesignator,
}

impl FastqName {
    /// Parse the final path component of `path`.
    pub fn parse(path: &str) -> Result<Self> {
        let name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);

        let lane = lane_pattern()
            .captures(name)
            .map(|c| c[1].to_string())
            .ok_or_else(|| Error::LaneNotInFilename(name.to_string()))?;

        let read = read_pattern()
            .captures(name)
            .map(|c| c[1].parse::<ReadDesignator>())
            .transpose()?
            .ok_or_else(|| Error::ReadNotInFilename(name.to_string()))?;

        Ok(Self { lane, read })
    }
}

/// True for names that look like gzipped FASTQ files
pub fn is_fastq_file(name: &str) -> bool {
    [".fastq.gz", ".fq.gz", ".fastq", ".fq"]
        .iter()
        .any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_illumina_name() {
        let name = FastqName::parse("/data/run1/S1_S3_L002_R1_001.fastq.gz").unwrap();
        assert_eq!(name.lane, "L002");
        assert_eq!(name.read, ReadDesignator::R1);
    }

    #[test]
    fn test_parse_read_three() {
        let name = FastqName::parse("X_L004_R3_001.fq.gz").unwrap();
        assert_eq!(name.lane, "L004");
        assert_eq!(name.read, ReadDesignator::R3);
    }

    #[test]
    fn test_missing_lane() {
        assert!(matches!(
            FastqName::parse("S1_R1_001.fastq.gz"),
            Err(Error::LaneNotInFilename(_))
        ));
    }

    #[test]
    fn test_lane_needs_exactly_three_digits() {
        assert!(FastqName::parse("S1_L01_R1_001.fastq.gz").is_err());
        assert!(FastqName::parse("S1_L0012_R1_001.fastq.gz").is_err());
    }

    #[test]
    fn test_missing_read() {
        assert!(matches!(
            FastqName::parse("S1_L001_R4_001.fastq.gz"),
            Err(Error::ReadNotInFilename(_))
        ));
        // read designator must be followed by an underscore
        assert!(FastqName::parse("S1_L001_R1.fastq.gz").is_err());
    }

    #[test]
    fn test_directory_names_are_ignored() {
        assert!(FastqName::parse("/runs/_L001_R1_/sample.fastq.gz").is_err());
    }

    #[test]
    fn test_is_fastq_file() {
        assert!(is_fastq_file("a_L001_R1_001.fastq.gz"));
        assert!(is_fastq_file("a.fq.gz"));
        assert!(!is_fastq_file("a.bam"));
    }
}
