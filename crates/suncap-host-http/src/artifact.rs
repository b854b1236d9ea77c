//! Artifact builders
//!
//! The scheduler asks for one artifact per finished session. Two builders
//! ship: a manifest writer that needs nothing installed, and a command
//! runner for an external encoder (GIF, video, upload script...).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use suncap_api::{CaptureRecord, EventType};
use suncap_host_api::{ArtifactBuilder, HostError, HostResult};
use suncap_store::{CaptureCatalog, StoreError};
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    date: NaiveDate,
    event_type: EventType,
    created_at: DateTime<Utc>,
    frame_count: usize,
    frames: &'a [CaptureRecord],
}

/// Writes `<data>/artifacts/<date>-<event>.json` listing the day's frames
#[derive(Debug, Clone)]
pub struct ManifestArtifactBuilder {
    catalog: CaptureCatalog,
}

impl ManifestArtifactBuilder {
    pub fn new(catalog: CaptureCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ArtifactBuilder for ManifestArtifactBuilder {
    async fn build(&self, date: NaiveDate, event_type: EventType) -> HostResult<PathBuf> {
        let frames = self.catalog.list_captures(date).map_err(store_error)?;
        if frames.is_empty() {
            return Err(HostError::Internal(format!("No frames captured on {}", date)));
        }

        let manifest = Manifest {
            date,
            event_type,
            created_at: suncap_util::now(),
            frame_count: frames.len(),
            frames: &frames,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| HostError::Internal(e.to_string()))?;

        let dir = self.catalog.layout().artifacts_dir();
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}-{}.json", date, event_type));
        tokio::fs::write(&path, json).await?;

        info!(path = %path.display(), frames = frames.len(), "Frame manifest written");
        Ok(path)
    }
}

/// Runs `argv... <date> <event>`; the last non-empty stdout line is the
/// artifact path
#[derive(Debug, Clone)]
pub struct CommandArtifactBuilder {
    argv: Vec<String>,
}

impl CommandArtifactBuilder {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl ArtifactBuilder for CommandArtifactBuilder {
    async fn build(&self, date: NaiveDate, event_type: EventType) -> HostResult<PathBuf> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(HostError::Command("Empty argv".into()));
        };

        debug!(program = %program, date = %date, event = %event_type, "Running artifact command");

        let output = Command::new(program)
            .args(args)
            .arg(date.format("%Y-%m-%d").to_string())
            .arg(event_type.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| HostError::Command(format!("Failed to spawn {}: {}", program, e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let detail = stderr.lines().last().unwrap_or_default();
            return Err(HostError::Command(format!(
                "{} exited with {}: {}",
                program, output.status, detail
            )));
        }
        if !stderr.trim().is_empty() {
            warn!(program = %program, stderr = %stderr.trim(), "Artifact command wrote to stderr");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .rev()
            .find(|line| !line.is_empty())
            .ok_or_else(|| HostError::Command(format!("{} printed no artifact path", program)))?;

        info!(path = %path, "Artifact command finished");
        Ok(PathBuf::from(path))
    }
}

fn store_error(e: StoreError) -> HostError {
    match e {
        StoreError::Io(io) => HostError::Io(io),
        other => HostError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use suncap_util::DataLayout;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 21).unwrap()
    }

    fn sh(script: &str) -> CommandArtifactBuilder {
        CommandArtifactBuilder::new(vec!["sh".into(), "-c".into(), script.into()])
    }

    #[tokio::test]
    async fn command_path_is_last_stdout_line() {
        let builder = sh("echo encoding; echo /tmp/out-$0-$1.gif; echo");
        let path = builder.build(date(), EventType::Sunset).await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/out-2025-06-21-sunset.gif"));
    }

    #[tokio::test]
    async fn command_nonzero_exit_fails() {
        let builder = sh("echo /tmp/never.gif; echo broken >&2; exit 3");
        let result = builder.build(date(), EventType::Sunrise).await;
        assert!(matches!(result, Err(HostError::Command(msg)) if msg.contains("broken")));
    }

    #[tokio::test]
    async fn command_without_output_fails() {
        let result = sh("true").build(date(), EventType::Sunrise).await;
        assert!(matches!(result, Err(HostError::Command(_))));
    }

    #[tokio::test]
    async fn command_empty_argv_fails() {
        let builder = CommandArtifactBuilder::new(vec![]);
        assert!(builder.build(date(), EventType::Sunrise).await.is_err());
    }

    #[tokio::test]
    async fn manifest_lists_frames() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = CaptureCatalog::new(DataLayout::new(dir.path()));
        for (h, m) in [(6, 5), (6, 0)] {
            let path = catalog.frame_path(date(), NaiveTime::from_hms_opt(h, m, 0).unwrap());
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"jpeg").unwrap();
        }

        let builder = ManifestArtifactBuilder::new(catalog);
        let path = builder.build(date(), EventType::Sunrise).await.unwrap();
        assert_eq!(path, dir.path().join("artifacts").join("2025-06-21-sunrise.json"));

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(manifest["frameCount"], 2);
        assert_eq!(manifest["eventType"], "sunrise");
        assert_eq!(manifest["frames"][0]["filename"], "06-00-00.jpg");
    }

    #[tokio::test]
    async fn manifest_without_frames_fails() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ManifestArtifactBuilder::new(CaptureCatalog::new(DataLayout::new(dir.path())));
        assert!(builder.build(date(), EventType::Sunrise).await.is_err());
    }
}
