use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scribe_client::{DocumentSnapshot, InboundMessage};
use scribe_editor::{ApplyReport, Document, RawContent};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Document snapshot (JSON, as returned by the document service)
    pub snapshot: PathBuf,

    /// Inbound message log, one JSON frame per line
    pub log: PathBuf,

    /// Print the resulting content as raw JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of replaying a message log against a snapshot
pub struct ReplayOutcome {
    pub document: Document,
    pub title: String,
    pub report: ApplyReport,
    pub frames: usize,
    pub dropped: usize,
}

pub fn replay_log(snapshot: DocumentSnapshot, log: &str) -> Result<ReplayOutcome> {
    let mut document = Document::try_from(snapshot.editor_content)?;
    let mut title = snapshot.title;
    let mut report = ApplyReport::default();
    let mut frames = 0;
    let mut dropped = 0;

    for (line_no, line) in log.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        frames += 1;

        match serde_json::from_str::<InboundMessage>(line) {
            Ok(InboundMessage::UpdateDocumentContent { body }) => {
                let batch = scribe_editor::replay(&mut document, &body.data);
                report.applied += batch.applied;
                report.clamped += batch.clamped;
                report.skipped += batch.skipped;
            }
            Ok(InboundMessage::UpdateDocumentTitle { body }) => title = body.title,
            Ok(InboundMessage::AddNewCollaborators { .. }) => {}
            Err(e) => {
                warn!("[Replay] line {}: {}", line_no + 1, e);
                dropped += 1;
            }
        }
    }

    Ok(ReplayOutcome {
        document,
        title,
        report,
        frames,
        dropped,
    })
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let snapshot_path = PathBuf::from(cwd).join(&args.snapshot);
    let log_path = PathBuf::from(cwd).join(&args.log);

    let snapshot: DocumentSnapshot = serde_json::from_str(
        &fs::read_to_string(&snapshot_path)
            .with_context(|| format!("reading {}", snapshot_path.display()))?,
    )
    .with_context(|| format!("parsing {}", snapshot_path.display()))?;
    let log = fs::read_to_string(&log_path)
        .with_context(|| format!("reading {}", log_path.display()))?;

    let outcome = replay_log(snapshot, &log)?;

    if args.json {
        let raw = RawContent::from(&outcome.document);
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    println!("{}", outcome.title.bright_white().bold());
    println!();
    for block in outcome.document.blocks() {
        let block_type = serde_json::to_value(block.block_type)?;
        println!(
            "  {} {:<22} {}",
            block.key.dimmed(),
            block_type.as_str().unwrap_or("plain").cyan(),
            block.text
        );
    }
    println!();
    println!(
        "{} {} frames, {} ops applied, {} clamped, {} skipped, {} frames dropped",
        "✓".green(),
        outcome.frames,
        outcome.report.applied,
        outcome.report.clamped,
        outcome.report.skipped,
        outcome.dropped
    );

    Ok(())
}
