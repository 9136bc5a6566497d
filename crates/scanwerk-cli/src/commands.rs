// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations.
//
// `scan` ingests every file into one orchestrator, lets it drain, then
// writes (and optionally archives) each completed item. A failing file never
// stops the others; it is reported and counted.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::human_errors::{HumanError, humanize_error};
use scanwerk_core::{EnhancementMode, ItemId, ItemStatus, ScanConfig};
use scanwerk_queue::Orchestrator;
use scanwerk_store::DocumentArchive;
use tracing::{error, info, instrument, warn};

use crate::cli::{ConfigArgs, ListArgs, ScanArgs};

/// Outcome of a `scan` run.
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

impl ScanSummary {
    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Defaults, overlaid by the config file, overlaid by `--mode`.
pub fn load_config(path: Option<&Path>, mode: Option<EnhancementMode>) -> Result<ScanConfig> {
    let mut config = match path {
        Some(path) => ScanConfig::from_json(&fs::read_to_string(path)?)?,
        None => ScanConfig::default(),
    };
    if let Some(mode) = mode {
        config.default_mode = mode;
    }
    Ok(config)
}

#[instrument(skip_all, fields(files = args.files.len(), out = %args.out.display()))]
pub async fn run_scan(args: &ScanArgs) -> Result<ScanSummary> {
    let config = load_config(args.config.as_deref(), args.mode)?;
    fs::create_dir_all(&args.out)?;
    let archive = args.archive.as_deref().map(DocumentArchive::open).transpose()?;

    let orchestrator = Orchestrator::new(&config)?;
    let mut summary = ScanSummary::default();
    let mut items: Vec<(ItemId, &Path)> = Vec::new();

    for path in &args.files {
        match fs::read(path) {
            Ok(bytes) => items.push((orchestrator.ingest(display_name(path), bytes), path.as_path())),
            Err(e) => {
                report(&display_name(path), &humanize_error(&ScanwerkError::Io(e)));
                summary.failed += 1;
            }
        }
    }

    let processed = orchestrator.run_until_idle().await;
    info!(count = processed.len(), "queue drained");

    let mut used = HashSet::new();
    for (id, path) in items {
        let name = display_name(path);
        let target = output_path(&args.out, path, &mut used);
        match finish_item(&orchestrator, id, args, &target, archive.as_ref()).await {
            Ok(()) => summary.written.push(target),
            Err(failure) => {
                report(&name, &failure);
                summary.failed += 1;
            }
        }
    }

    info!(
        written = summary.written.len(),
        failed = summary.failed,
        "scan finished"
    );
    Ok(summary)
}

/// Apply manual corners, then write and archive one item.
async fn finish_item(
    orchestrator: &Orchestrator,
    id: ItemId,
    args: &ScanArgs,
    target: &Path,
    archive: Option<&DocumentArchive>,
) -> std::result::Result<(), HumanError> {
    let human = |e: ScanwerkError| humanize_error(&e);

    let view = orchestrator.with_queue(|q| q.view(id)).map_err(human)?;
    if view.status != ItemStatus::Completed {
        return Err(view
            .failure
            .unwrap_or_else(|| humanize_error(&ScanwerkError::Pipeline(format!("ended as {}", view.status)))));
    }

    if let Some(points) = args.corners {
        orchestrator.edit_corners(id, points).await.map_err(human)?;
    }

    let document = orchestrator.with_queue(|q| q.export(id)).map_err(human)?;
    fs::write(target, &document.processed_png).map_err(|e| human(e.into()))?;

    let confidence = match view.confidence {
        Some(c) => format!("confidence {c:.2}"),
        None => "no edges found, used default corners".into(),
    };
    println!(
        "✓ {} → {} ({}x{}, {}, {})",
        view.name,
        target.display(),
        document.width,
        document.height,
        document.mode,
        confidence
    );

    if let Some(archive) = archive {
        let key = archive.store(&document).map_err(human)?;
        println!("  archived as {key}");
    }
    Ok(())
}

fn report(name: &str, failure: &HumanError) {
    error!(file = %name, message = %failure.message, "file failed");
    eprintln!("✗ {name}: {}", failure.message);
    eprintln!("  {}", failure.suggestion);
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `<out>/<stem>_scanned.png`, numbered when two inputs share a stem.
fn output_path(out: &Path, input: &Path, used: &mut HashSet<String>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scan".into());
    let mut file_name = format!("{stem}_scanned.png");
    let mut n = 2;
    while !used.insert(file_name.clone()) {
        file_name = format!("{stem}_scanned_{n}.png");
        n += 1;
    }
    out.join(file_name)
}

pub fn run_config(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), None)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn run_list(args: &ListArgs) -> Result<()> {
    let archive = DocumentArchive::open(&args.archive)?;
    let documents = archive.list()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }
    if documents.is_empty() {
        warn!(archive = %args.archive.display(), "archive is empty");
    }
    for doc in documents {
        println!(
            "{}  {}  {:<9}  {:>5}x{:<5}  {}",
            doc.id,
            doc.archived_at.format("%Y-%m-%d %H:%M"),
            doc.mode,
            doc.width,
            doc.height,
            doc.name
        );
    }
    Ok(())
}
