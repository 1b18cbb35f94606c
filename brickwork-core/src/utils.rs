use crate::{classify::document::ClassifiedDocument, render::markdown::to_markdown};

use anyhow::Context;
use colored::*;
use std::{
    fs::{create_dir, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub fn sanitize_doc_name(doc_name: &str) -> String {
    doc_name
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
}

fn recreate_result_dir(result_dir_name: &Path) -> anyhow::Result<PathBuf> {
    if std::fs::create_dir(result_dir_name).is_err() {
        std::fs::remove_dir_all(result_dir_name)?;
        std::fs::create_dir(result_dir_name)?;
    };
    Ok(result_dir_name.to_owned())
}

/// Creates `<doc_name>-results` under `output_dir` (or the working directory), replacing
/// any previous run. Returns the result dir and the debug dir when requested.
pub fn create_dirs<P: AsRef<Path>>(
    output_dir: Option<P>,
    doc_name: &str,
    debug: bool,
) -> anyhow::Result<(PathBuf, Option<PathBuf>)> {
    let result_dir_name = format!("{}-results", sanitize_doc_name(doc_name));
    let res_dir_path = match output_dir {
        Some(p) => recreate_result_dir(&p.as_ref().join(&result_dir_name))?,
        None => recreate_result_dir(&PathBuf::from(format!("./{}", &result_dir_name)))?,
    };

    let debug_path = if debug {
        let debug_path = res_dir_path.join("debug");
        create_dir(&debug_path).context("cant create debug path")?;
        Some(debug_path)
    } else {
        None
    };
    Ok((res_dir_path, debug_path))
}

fn write_file(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("can't create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content)?;
    writer.flush()?;
    Ok(())
}

/// Writes the classified document as JSON, plus a markdown outline when asked. Per-page
/// candidate dumps go to `debug_path` when one is given.
pub fn save_classified_document(
    doc: &ClassifiedDocument,
    res_dir_path: &Path,
    debug_path: Option<&Path>,
    save_markdown: bool,
) -> anyhow::Result<()> {
    let sanitized_doc_name = sanitize_doc_name(&doc.doc_name);

    let file_out = res_dir_path.join(format!("{}.json", &sanitized_doc_name));
    write_file(&file_out, serde_json::to_string(&doc)?.as_bytes())?;

    if let Some(dbg_path) = debug_path {
        for page in &doc.pages {
            let page_out = dbg_path.join(format!("page-{}-candidates.json", page.page_index));
            write_file(&page_out, serde_json::to_string_pretty(&page.candidates)?.as_bytes())?;
        }
        println!(
            "{} Debug output saved in: {}",
            "ℹ".yellow().bold(),
            dbg_path.display().to_string().yellow().underline()
        );
    }

    if save_markdown {
        let md_content = to_markdown(doc, &doc.doc_name).context("can't render markdown")?;
        let md_file_out = res_dir_path.join(format!("{}.md", sanitized_doc_name));
        write_file(&md_file_out, md_content.as_bytes())?;
    }
    println!(
        "{} Results saved in: {}",
        "✓".green().bold(),
        res_dir_path.display().to_string().cyan().underline()
    );

    Ok(())
}
