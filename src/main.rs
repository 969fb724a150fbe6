use annotator_rs::core::parser::{Parser as _, UniversalParser};
use annotator_rs::feedback::parse_records;
use annotator_rs::utils::document_processor::DocumentProcessor;
use annotator_rs::utils::files::annotated_path;
use annotator_rs::EngineConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "annotator", about = "Anchor comments into .docx files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text map of a document as JSON
    Extract { file: PathBuf },
    /// Attach stored feedback to a document
    Annotate {
        file: PathBuf,
        /// JSON array of feedback records
        #[arg(long, value_name = "FILE")]
        feedback: PathBuf,
        /// Engine configuration (JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Output path, defaults to `<stem>_annotated.docx`
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract { file } => {
            let map = UniversalParser::new()
                .parse(&file)
                .with_context(|| format!("extracting {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        Command::Annotate {
            file,
            feedback,
            config,
            out,
        } => {
            let config = match config {
                Some(path) => EngineConfig::from_json_file(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            let json = tokio::fs::read_to_string(&feedback)
                .await
                .with_context(|| format!("reading feedback {}", feedback.display()))?;
            let records = parse_records(&json)?;
            info!("loaded {} feedback records", records.len());

            let output = out.unwrap_or_else(|| annotated_path(&file));
            let report = DocumentProcessor::new(config.annotation)
                .annotate_file_to(&file, &output, &records)
                .await
                .with_context(|| format!("annotating {}", file.display()))?;
            println!(
                "{}: {} applied, {} skipped",
                report.output.display(),
                report.applied,
                report.skipped
            );
        }
    }
    Ok(())
}
