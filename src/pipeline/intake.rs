// src/pipeline/intake.rs

//! Intake runner for files on disk.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ScreeningApi;
use crate::error::{AppError, Result};
use crate::models::{ClientConfig, MediaFile, MediaKind, Stage, StageStatus, UploadConfig};
use crate::pipeline::sequencer::Sequencer;
use crate::pipeline::submission::{CAPTURE_STEPS, Submission};
use crate::utils::console;

/// Paths of the three intake binaries.
#[derive(Debug, Clone)]
pub struct IntakeFiles {
    pub photo: PathBuf,
    pub video: PathBuf,
    pub eeg: PathBuf,
}

impl IntakeFiles {
    fn path(&self, kind: MediaKind) -> &PathBuf {
        match kind {
            MediaKind::Image => &self.photo,
            MediaKind::Video => &self.video,
            MediaKind::Eeg => &self.eeg,
        }
    }
}

/// Walk the capture steps with files from disk, then run every stage.
///
/// Returns the submission in its final state; on failure the error names
/// the stage that failed after all retries were spent.
pub async fn run_intake<A: ScreeningApi>(
    api: A,
    uploads: &UploadConfig,
    client: &ClientConfig,
    user_id: &str,
    files: &IntakeFiles,
) -> Result<Submission> {
    console::header("Screening Intake");

    let mut submission = Submission::with_rules(user_id, uploads.clone());
    submission.begin();

    for kind in CAPTURE_STEPS {
        let path = files.path(kind);
        let file = MediaFile::from_path(path).await?;
        console::sub_item(&format!(
            "{}: {} ({}, {} bytes)",
            kind,
            path.display(),
            file.content_type,
            file.len()
        ));
        submission.attach(kind, file)?;
        submission.advance()?;
    }

    let total = Stage::ALL.len();
    let sequencer = Sequencer::new(api).with_listener(move |stage, status| match status {
        StageStatus::Loading => {
            console::step(stage.index() + 1, total, &format!("{} ...", stage.title()))
        }
        StageStatus::Success => console::success(stage.title()),
        StageStatus::Error => console::error(&format!("{} failed", stage.title())),
        StageStatus::Idle => {}
    });

    let result = sequencer
        .run_with_retries(
            &mut submission,
            None,
            client.max_retries,
            Duration::from_millis(client.retry_delay_ms),
        )
        .await;

    match result {
        Ok(output) => {
            let keys = submission.keys();
            console::summary(
                "Screening complete",
                &[
                    ("User", submission.user_id().to_string()),
                    (
                        "Test number",
                        submission
                            .prior_count()
                            .map(|c| (c + 1).to_string())
                            .unwrap_or_default(),
                    ),
                    ("Image key", keys.image_key.clone().unwrap_or_default()),
                    ("Video key", keys.video_key.clone().unwrap_or_default()),
                    ("EEG key", keys.eeg_key.clone().unwrap_or_default()),
                    ("Score", output.score.to_string()),
                    ("Risk", output.risk.clone()),
                ],
            );
            Ok(submission)
        }
        Err(e) => {
            if let AppError::Stage { stage, .. } = &e {
                console::error(&format!(
                    "Screening stopped at '{}' ({}). Retry the failed step or restart the screening.",
                    stage,
                    stage.title()
                ));
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::client::LocalApi;
    use crate::models::Config;
    use crate::services::AppState;
    use crate::storage::LocalStorage;

    async fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, bytes).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_run_intake_from_disk() {
        let inputs = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        let files = IntakeFiles {
            photo: write(&inputs, "selfie.png", &[1u8; 128]).await,
            video: write(&inputs, "clip.webm", &[2u8; 256]).await,
            eeg: write(&inputs, "session.csv", b"t,fp1\n0,1\n").await,
        };
        let config = Config::default();
        let api = LocalApi::new(AppState::local(
            Arc::new(config.clone()),
            LocalStorage::new(store.path()),
        ));

        let submission = run_intake(api, &config.uploads, &config.client, "u9", &files)
            .await
            .unwrap();

        assert!(submission.is_complete());
        assert!(submission.keys().image_key.as_deref().unwrap().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_run_intake_rejects_non_csv_eeg() {
        let inputs = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        let files = IntakeFiles {
            photo: write(&inputs, "selfie.jpg", &[1u8; 16]).await,
            video: write(&inputs, "clip.mp4", &[2u8; 16]).await,
            eeg: write(&inputs, "session.txt", b"t,fp1\n").await,
        };
        let config = Config::default();
        let api = LocalApi::new(AppState::local(
            Arc::new(config.clone()),
            LocalStorage::new(store.path()),
        ));

        let err = run_intake(api, &config.uploads, &config.client, "u9", &files)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Upload { .. }));
        assert!(!store.path().join("images").exists());
    }
}
