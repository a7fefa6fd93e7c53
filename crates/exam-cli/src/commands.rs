//! Command handlers for `exf`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};

use exam_core::MoodleToken;
use exam_db::ExamDb;
use exam_moodle::MoodleClient;
use exam_resolve::ResolutionEngine;
use exam_workflow::SubmissionService;

/// Everything a command handler needs, built once in `main`.
pub struct AppContext {
    pub config: exam_config::ExamConfig,
    pub db: Arc<ExamDb>,
    pub engine: Arc<ResolutionEngine>,
    pub client: Arc<MoodleClient>,
}

pub async fn resolve(
    ctx: &AppContext,
    subject_code: &str,
    token: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let token = token.map(MoodleToken::from);
    let found = ctx.engine.resolve(subject_code, token.as_ref()).await?;

    let Some(found) = found else {
        bail!("no mapping found for {subject_code}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        println!(
            "{subject_code} -> assignment {} (course {}, source {})",
            found.assignment_id, found.course_id, found.source
        );
        if let Some(name) = &found.assignment_name {
            println!("  name: {name}");
        }
    }
    Ok(())
}

pub async fn mappings_list(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let mappings = ctx.db.list_active_mappings().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&mappings)?);
        return Ok(());
    }
    if mappings.is_empty() {
        println!("no active mappings");
        return Ok(());
    }
    for m in mappings {
        println!(
            "{:<12} course {:<6} assignment {:<6} [{}] verified {}",
            m.subject_code,
            m.moodle_course_id,
            m.moodle_assignment_id,
            m.source,
            m.last_verified_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

pub async fn mappings_deactivate(ctx: &AppContext, subject_code: &str) -> anyhow::Result<()> {
    if ctx.db.deactivate_mapping(subject_code).await? {
        ctx.engine.invalidate(subject_code).await;
        println!("deactivated {subject_code}");
        Ok(())
    } else {
        bail!("no active mapping for {subject_code}");
    }
}

pub async fn cache_stats(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let stats = ctx.engine.cache_stats().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "entries {}  hits {}  misses {}  hit_rate {:.2}%  sets {}  deletes {}",
            stats.entries,
            stats.hits,
            stats.misses,
            stats.hit_rate * 100.0,
            stats.sets,
            stats.deletes
        );
    }
    Ok(())
}

pub async fn cache_clear(ctx: &AppContext) -> anyhow::Result<()> {
    let count = ctx.engine.clear_cache().await;
    println!("cleared {count} cached mappings");
    Ok(())
}

pub async fn refresh(ctx: &AppContext, token: &str, json: bool) -> anyhow::Result<()> {
    let summary = ctx.engine.refresh_all(&MoodleToken::from(token)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "refreshed {}/{} mappings ({} unchanged, {} failed)",
        summary.refreshed, summary.total, summary.unchanged, summary.failed
    );
    for detail in &summary.details {
        match (detail.old_id, detail.new_id) {
            (Some(old), Some(new)) => {
                println!("  {}: {:?} {old} -> {new}", detail.subject_code, detail.status);
            }
            _ => println!("  {}: {:?}", detail.subject_code, detail.status),
        }
    }
    Ok(())
}

pub async fn upload(
    ctx: &AppContext,
    file: &Path,
    blob_dir: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let raw_filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("upload path has no usable filename")?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let artifact = exam_workflow::register_upload(
        &ctx.db,
        &ctx.config.upload,
        raw_filename,
        &bytes,
        blob_dir,
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
    } else {
        println!(
            "registered {} ({} / {}) as {}",
            artifact.artifact_uid,
            artifact.register_number,
            artifact.subject_code,
            artifact.workflow_status
        );
    }
    Ok(())
}

pub async fn submit(
    ctx: &AppContext,
    artifact_uid: &str,
    token: &str,
    json: bool,
) -> anyhow::Result<()> {
    let service = SubmissionService::new(
        Arc::clone(&ctx.db),
        Arc::clone(&ctx.engine),
        Arc::clone(&ctx.client),
    );
    let receipt = service
        .submit(artifact_uid, &MoodleToken::from(token))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else {
        println!(
            "submitted {} to assignment {} at {}",
            receipt.artifact_uid, receipt.assignment_id, receipt.submitted_at
        );
    }
    Ok(())
}
