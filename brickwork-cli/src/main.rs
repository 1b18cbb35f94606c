use anyhow::Context;
use brickwork_core::{
    blocks::ExtractedDocument,
    classify::{classify_document, ClassifierPipeline, ClassifyConfig},
    config::ClassifierConfig,
    utils::{create_dirs, save_classified_document},
};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use memmap2::Mmap;
use std::{fmt::Write, fs::File, ops::Range, path::PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Brickwork - instruction booklet page classifier",
    long_about = "Brickwork reads the layout blocks extracted from instruction booklet pages and classifies them into page numbers, steps, parts lists, diagrams and the other elements of a building step."
)]
struct Args {
    /// Path to the extracted document (JSON)
    file_path: PathBuf,

    #[arg(
        long,
        short('r'),
        help = "Specify pages to classify (e.g., '1-5' or '1' for single page)"
    )]
    page_range: Option<String>,

    /// Specifies the target directory where classification results will be saved
    ///
    /// If not specified, defaults to the current working directory.
    #[arg(
        long,
        env = "BRICKWORK_OUTPUT_DIR",
        help = "Specify the directory to store classification result"
    )]
    output_dir: Option<PathBuf>,

    /// Classifier thresholds as JSON. Missing keys keep their defaults.
    #[arg(
        long,
        short('c'),
        env = "BRICKWORK_CONFIG",
        help = "Path to a JSON file overriding classifier thresholds"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = false,
        help = "Also write a markdown outline of the classified pages"
    )]
    save_markdown: bool,

    /// Enable debug mode to output additional information
    #[arg(
        long,
        default_value_t = false,
        env = "BRICKWORK_DEBUG",
        help = "Activate debug mode: keep every candidate and dump them per page"
    )]
    debug: bool,
}

fn parse_page_range(range_str: &str) -> anyhow::Result<Range<usize>> {
    if let Some((start, end)) = range_str.split_once('-') {
        let start: usize = start.trim().parse()?;
        let end: usize = end.trim().parse()?;
        if start > 0 && end >= start {
            Ok(Range {
                start: start - 1,
                end,
            })
        } else {
            anyhow::bail!("Invalid page range: start must be > 0 and end must be >= start")
        }
    } else {
        // Single page
        let page: usize = range_str.trim().parse()?;
        if page > 0 {
            Ok(Range {
                start: page - 1,
                end: page,
            })
        } else {
            anyhow::bail!("Page number must be greater than 0")
        }
    }
}

fn setup_progress_bar(length_pages: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(length_pages as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}",
        )?
        .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
            let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
        })
        .progress_chars("#>-"),
    );
    Ok(pb)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("brickwork_cli=info,brickwork_core=info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::uptime());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let classifier_config = match &args.config {
        Some(path) => ClassifierConfig::from_json_file(path)?,
        None => ClassifierConfig::default(),
    };
    let pipeline =
        ClassifierPipeline::with_config(classifier_config).context("invalid classifier setup")?;

    let page_range = args
        .page_range
        .as_deref()
        .map(parse_page_range)
        .transpose()?;

    let file = File::open(&args.file_path)
        .with_context(|| format!("can't open {}", args.file_path.display()))?;
    // SAFETY: the input file is only read for the duration of the deserialization
    let mmap = unsafe { Mmap::map(&file)? };
    let mut doc: ExtractedDocument =
        serde_json::from_slice(&mmap).context("input is not an extracted document")?;
    drop(mmap);

    let doc_name = doc.doc_name.clone().unwrap_or_else(|| {
        args.file_path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split('.').next().map(|s| s.to_owned()))
            .unwrap_or(Uuid::new_v4().to_string())
    });
    doc.doc_name = Some(doc_name.clone());
    info!(doc_name, pages = doc.pages.len(), "document loaded");

    let length_pages = page_range
        .as_ref()
        .map_or(doc.pages.len(), |range| range.len());
    let pb = setup_progress_bar(length_pages)?;
    let pbc = pb.clone();

    let config = ClassifyConfig {
        page_range,
        debug: args.debug,
    };
    let classified = classify_document(
        doc,
        &pipeline,
        config,
        Some(move |page_index| {
            pbc.set_message(format!("Page #{}", page_index));
            pbc.inc(1u64);
        }),
        None::<fn() -> bool>,
    )?;

    pb.finish_with_message(format!(
        "Classified document in {}ms",
        classified.metadata.classification_duration.as_millis()
    ));

    let without_tree = classified.pages.iter().filter(|p| p.page.is_none()).count();
    if without_tree > 0 {
        println!(
            "{} {} page(s) have no page tree",
            "⚠".yellow().bold(),
            without_tree
        );
    }

    let (res_dir, debug_dir) = create_dirs(args.output_dir.as_ref(), &doc_name, args.debug)?;
    save_classified_document(
        &classified,
        &res_dir,
        debug_dir.as_deref(),
        args.save_markdown,
    )?;
    Ok(())
}
