//! sampledb CLI - genomics sample tracking database

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use sampledb::config::Config;
use sampledb::{
    AddOutcome, Database, FastqTarget, JsonSchema, NewProcessedFile, NewSampleMeta,
    ProcessedKind, Reads, RunKey, SampleMetaPatch, SampleUpsert, SeqMetaPatch, Shape,
};
use sampledb_core::audit;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sampledb")]
#[command(about = "A JSON-backed genomics sample tracking database", long_about = None)]
struct Cli {
    /// Database file (default: from config, else samples.json)
    #[arg(long, global = true, env = "SAMPLEDB_PATH")]
    db: Option<PathBuf>,

    /// Config file (default: .sampledb.yaml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Identity of a FASTQ run
#[derive(Args)]
struct RunArgs {
    sample: String,
    seq_type: String,
    gf_id: String,
    gf_project: String,
    run: String,
}

impl From<RunArgs> for FastqTarget {
    fn from(args: RunArgs) -> Self {
        FastqTarget {
            sample: args.sample,
            seq_type: args.seq_type,
            gf_id: args.gf_id,
            run: RunKey::new(args.gf_project, args.run),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
    /// Flat `samples` mapping
    Sample,
    /// Nested `patients` -> `cases` -> `samples`
    Patient,
}

impl From<ShapeArg> for Shape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Sample => Shape::SampleCentric,
            ShapeArg::Patient => Shape::PatientCentric,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty database file
    Init {
        /// Store it patient-centric instead of sample-centric
        #[arg(long)]
        patient_centric: bool,
    },

    /// Register a sample, or fill in metadata it is missing
    AddSample {
        sample: String,
        #[arg(long)]
        patient: Option<String>,
        #[arg(long)]
        sex: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        sample_type: Option<String>,
        #[arg(long)]
        phenotype: Option<String>,
        #[arg(long)]
        case_control: Option<String>,
        #[arg(long)]
        tissue_site: Option<String>,
    },

    /// Overwrite phenotype, case/control or tissue site of a sample
    SetSampleMeta {
        sample: String,
        #[arg(long)]
        phenotype: Option<String>,
        #[arg(long)]
        case_control: Option<String>,
        #[arg(long)]
        tissue_site: Option<String>,
    },

    /// Overwrite indexing or technology of a sequencing type
    SetSeqMeta {
        sample: String,
        seq_type: String,
        #[arg(long)]
        indexing: Option<String>,
        #[arg(long)]
        technology: Option<String>,
    },

    /// Print the metadata of one sample
    ShowSampleMeta { sample: String },

    /// List samples and sequencing types with no raw sequence
    ListMissingRawSeq,

    /// Structural report: counts and consistency issues
    Audit,

    /// Check the database file against a JSON Schema
    ValidateDb {
        /// Schema file (default: from config, else the bundled schema)
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Record a processed output (bam, vcf, cna, qc)
    AddProcessed {
        sample: String,
        seq_type: String,
        kind: String,
        file_path: String,
        #[arg(long)]
        pipeline_url: Option<String>,
        /// Seconds since the Unix epoch, used to rank duplicates
        #[arg(long)]
        epoch: String,
        #[arg(long)]
        created: Option<String>,
        #[arg(long)]
        size: Option<u64>,
        /// Defaults to the kind
        #[arg(long)]
        file_type: Option<String>,
    },

    /// Record the complete read set of one lane (replaces the lane)
    AddFastq {
        #[command(flatten)]
        run: RunArgs,
        lane: String,
        #[arg(long)]
        r1: String,
        #[arg(long)]
        r2: Option<String>,
        #[arg(long)]
        r3: Option<String>,
    },

    /// Record one FASTQ file; lane and read come from its name
    AddFastqSimple {
        #[command(flatten)]
        run: RunArgs,
        path: String,
    },

    /// Record every FASTQ file in a directory
    AddFastqDir {
        #[command(flatten)]
        run: RunArgs,
        dir: PathBuf,
    },

    /// Record a BAM, reading size and timestamps from disk
    AddBam {
        sample: String,
        seq_type: String,
        bam_path: PathBuf,
        pipeline_url: Option<String>,
    },

    /// List sequencing types holding more than one BAM
    ListDuplicateBams,

    /// Remove a BAM entry and delete the file
    RemoveBam {
        sample: String,
        seq_type: String,
        path: String,
        /// Leave the file on disk
        #[arg(long)]
        keep_file: bool,
    },

    /// Keep only the newest BAM per sequencing type
    CleanupBams {
        /// Only show what would be discarded
        #[arg(long)]
        dry_run: bool,
        /// Leave discarded files on disk
        #[arg(long)]
        keep_files: bool,
    },

    /// Rewrite the database in another shape
    Convert {
        #[arg(long, value_enum)]
        to: ShapeArg,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            if let Some(hint) = err
                .downcast_ref::<sampledb::Error>()
                .and_then(|e| e.suggestion())
            {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let db_path = cli.db.unwrap_or_else(|| config.database.clone());

    match cli.command {
        Commands::Init { patient_centric } => {
            let shape = if patient_centric {
                Shape::PatientCentric
            } else {
                Shape::SampleCentric
            };
            let db = Database::create(&db_path, shape).await?;
            println!("Created {} database at {:?}", db.shape, db.path);
        }

        Commands::AddSample {
            sample,
            patient,
            sex,
            project,
            sample_type,
            phenotype,
            case_control,
            tissue_site,
        } => {
            let meta = NewSampleMeta {
                patient,
                sex,
                project,
                sample_type,
                phenotype,
                case_control,
                tissue_site,
            };
            let mut db = open(&db_path, &config).await?;
            match db.add_sample(&sample, &meta).await? {
                SampleUpsert::Created => println!("Sample '{}' created.", sample),
                SampleUpsert::Filled(fields) => {
                    println!("Sample '{}' updated: {}.", sample, fields.join(", "))
                }
                SampleUpsert::Unchanged => println!("Sample '{}' unchanged.", sample),
            }
        }

        Commands::SetSampleMeta {
            sample,
            phenotype,
            case_control,
            tissue_site,
        } => {
            let patch = SampleMetaPatch {
                phenotype,
                case_control,
                tissue_site,
            };
            let mut db = open(&db_path, &config).await?;
            let written = db.set_sample_meta(&sample, &patch).await?;
            println!("Sample '{}': set {}.", sample, written.join(", "));
        }

        Commands::SetSeqMeta {
            sample,
            seq_type,
            indexing,
            technology,
        } => {
            let patch = SeqMetaPatch {
                indexing,
                technology,
            };
            let mut db = open(&db_path, &config).await?;
            let written = db.set_seq_meta(&sample, &seq_type, &patch).await?;
            println!("{}/{}: set {}.", sample, seq_type, written.join(", "));
        }

        Commands::ShowSampleMeta { sample } => {
            let db = open(&db_path, &config).await?;
            show_sample_meta(&db, &sample)?;
        }

        Commands::ListMissingRawSeq => {
            let db = open(&db_path, &config).await?;
            let missing = audit::missing_raw_sequence(&db.document);
            if missing.is_empty() {
                println!("Every sequencing type has raw sequence recorded.");
            }
            for entry in missing {
                match entry.seq_type {
                    Some(seq_type) => println!("{}\t{}", entry.sample, seq_type),
                    None => println!("{}\t(no sequencing)", entry.sample),
                }
            }
        }

        Commands::Audit => {
            let db = open(&db_path, &config).await?;
            print_audit(&audit::audit(&db.document));
        }

        Commands::ValidateDb { schema } => {
            let schema = match schema.or_else(|| config.schema.clone()) {
                Some(path) => JsonSchema::load(&path).await?,
                None => JsonSchema::bundled()?,
            };
            match sampledb::validate_file(&db_path, &schema).await? {
                Ok(()) => println!("{:?} is valid against schema '{}'.", db_path, schema.name()),
                Err(violation) => anyhow::bail!(
                    "{:?} is invalid against schema '{}' at {}",
                    db_path,
                    schema.name(),
                    violation
                ),
            }
        }

        Commands::AddProcessed {
            sample,
            seq_type,
            kind,
            file_path,
            pipeline_url,
            epoch,
            created,
            size,
            file_type,
        } => {
            let kind: ProcessedKind = kind.parse().map_err(sampledb::Error::from)?;
            let file = NewProcessedFile {
                file_path,
                file_type,
                pipeline_url,
                epoch,
                created,
                size,
            };
            let mut db = open(&db_path, &config).await?;
            let outcome = db.add_processed(&sample, &seq_type, kind, file).await?;
            report_add(outcome, kind, &sample, &seq_type);
        }

        Commands::AddFastq {
            run,
            lane,
            r1,
            r2,
            r3,
        } => {
            let mut reads = Reads::new(r1);
            if let Some(r2) = r2 {
                reads = reads.with_r2(r2);
            }
            if let Some(r3) = r3 {
                reads = reads.with_r3(r3);
            }
            let target = FastqTarget::from(run);
            let mut db = open(&db_path, &config).await?;
            db.add_fastq(&target, &lane, reads).await?;
            println!("Lane {} recorded under {}.", lane, target);
        }

        Commands::AddFastqSimple { run, path } => {
            let target = FastqTarget::from(run);
            let mut db = open(&db_path, &config).await?;
            let name = db.add_fastq_simple(&target, &path).await?;
            println!("{} {} recorded under {}.", name.lane, name.read, target);
        }

        Commands::AddFastqDir { run, dir } => {
            let target = FastqTarget::from(run);
            let mut db = open(&db_path, &config).await?;
            let added = db.add_fastq_dir(&target, &dir).await?;
            for (path, name) in &added {
                println!("{}\t{}\t{}", name.lane, name.read, path.display());
            }
            println!("{} FASTQ file(s) recorded under {}.", added.len(), target);
        }

        Commands::AddBam {
            sample,
            seq_type,
            bam_path,
            pipeline_url,
        } => {
            let mut db = open(&db_path, &config).await?;
            let outcome = db
                .add_bam(&sample, &seq_type, &bam_path, pipeline_url)
                .await?;
            report_add(outcome, ProcessedKind::Bam, &sample, &seq_type);
        }

        Commands::ListDuplicateBams => {
            let db = open(&db_path, &config).await?;
            let duplicates = audit::duplicate_bams(&db.document);
            if duplicates.is_empty() {
                println!("No duplicate BAMs.");
            }
            for group in duplicates {
                println!("{}/{}", group.sample, group.seq_type);
                for (i, file) in group.files.iter().enumerate() {
                    let mark = if i == 0 { "keep" } else { "discard" };
                    println!("  {:<8}{:>12}  {}", mark, file.epoch(), file.file_path);
                }
            }
        }

        Commands::RemoveBam {
            sample,
            seq_type,
            path,
            keep_file,
        } => {
            let mut db = open(&db_path, &config).await?;
            let delete = config.delete_files && !keep_file;
            let removed = db.remove_bam(&sample, &seq_type, &path, delete).await?;
            println!("Removed {} entr{} for '{}'.", removed, if removed == 1 { "y" } else { "ies" }, path);
        }

        Commands::CleanupBams {
            dry_run,
            keep_files,
        } => {
            let mut db = open(&db_path, &config).await?;
            let delete = config.delete_files && !keep_files;
            let discarded = db.cleanup_bams(delete, dry_run).await?;
            if discarded.is_empty() {
                println!("No duplicate BAMs.");
            }
            let verb = if dry_run { "Would discard" } else { "Discarded" };
            for entry in &discarded {
                println!(
                    "{} {}/{}: {} (keeping {})",
                    verb, entry.sample, entry.seq_type, entry.file.file_path, entry.kept
                );
            }
        }

        Commands::Convert { to } => {
            let mut db = open(&db_path, &config).await?;
            let shape = Shape::from(to);
            if db.convert(shape).await? {
                println!("Converted {:?} to {}.", db.path, shape);
            } else {
                println!("{:?} is already {}.", db.path, shape);
            }
        }
    }

    Ok(())
}

async fn open(path: &Path, config: &Config) -> anyhow::Result<Database> {
    Ok(Database::open(path).await?.with_pretty(config.pretty))
}

fn report_add(outcome: AddOutcome, kind: ProcessedKind, sample: &str, seq_type: &str) {
    match outcome {
        AddOutcome::Added => println!("Added {} to {}/{}.", kind, sample, seq_type),
        AddOutcome::Duplicate => println!("{} already recorded for {}/{}.", kind, sample, seq_type),
        AddOutcome::SampleMissing => println!("Sample '{}' not found; nothing added.", sample),
    }
}

fn show_sample_meta(db: &Database, sample_key: &str) -> anyhow::Result<()> {
    let sample = db.document.sample(sample_key)?;

    println!("Sample {}", sample_key);
    if let Value::Object(fields) = serde_json::to_value(&sample.sample_meta)? {
        for (key, value) in fields {
            println!("  {}: {}", key, display_value(&value));
        }
    }

    if sample.seq.is_empty() {
        println!("  (no sequencing)");
    }
    for (seq_type, block) in &sample.seq {
        println!(
            "  {}: indexing={} technology={}",
            seq_type,
            block.indexing.as_deref().unwrap_or("-"),
            block.technology.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn print_audit(report: &audit::AuditReport) {
    let counts = &report.counts;
    println!("Patients:         {}", counts.patients);
    println!("Samples:          {}", counts.samples);
    println!("Sequencing types: {}", counts.seq_blocks);
    println!("Raw groups:       {}", counts.raw_groups);
    println!("FASTQ runs:       {}", counts.fastq_runs);
    println!("Lanes:            {}", counts.lanes);
    for kind in ProcessedKind::ALL {
        let label = format!("{} files:", kind);
        println!("{:<18}{}", label, counts.processed.get(&kind).copied().unwrap_or(0));
    }

    println!();
    if report.is_clean() {
        println!("No issues found.");
    } else {
        println!("{} issue(s):", report.issues.len());
        for issue in &report.issues {
            println!("  - {}", issue);
        }
    }
}
