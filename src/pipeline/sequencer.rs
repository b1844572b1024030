// src/pipeline/sequencer.rs

//! Stage sequencer.
//!
//! Runs count → video → image → eeg → analysis strictly in order. Each
//! stage is marked `loading` before its call and `success` or `error`
//! after it. The first failure stops the run, leaves later stages `idle`
//! and records the failed stage as the resume point. Stages that are
//! about to run again are first reset to `idle`; every transition,
//! resets included, reaches the listener in order.

use std::time::Duration;

use crate::client::ScreeningApi;
use crate::error::{AppError, Result};
use crate::models::{MediaKind, ScreeningOutput, Stage, StageStatus};
use crate::pipeline::submission::{SUBMIT_STEP, Submission};
use crate::services::ResultKeys;

/// Callback notified of every status transition.
pub type StatusListener = Box<dyn Fn(Stage, StageStatus) + Send + Sync>;

/// Runs the submission stages against a [`ScreeningApi`].
pub struct Sequencer<A> {
    api: A,
    listener: Option<StatusListener>,
}

impl<A: ScreeningApi> Sequencer<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            listener: None,
        }
    }

    /// Observe status transitions (used for progress output).
    pub fn with_listener(
        mut self,
        listener: impl Fn(Stage, StageStatus) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Run from the first stage, or from `resume_from` after a failure.
    ///
    /// Refuses to start, without any network call, when an input is
    /// missing or when a stage before `resume_from` has not succeeded.
    pub async fn run(
        &self,
        submission: &mut Submission,
        resume_from: Option<Stage>,
    ) -> Result<ScreeningOutput> {
        let missing = submission.missing_inputs();
        if !missing.is_empty() {
            return Err(AppError::MissingInput(missing));
        }

        let start = resume_from.unwrap_or(Stage::Count);
        if let Some(unfinished) = Stage::ALL[..start.index()]
            .iter()
            .find(|s| submission.progress.get(**s) != StageStatus::Success)
        {
            return Err(AppError::validation(format!(
                "Cannot resume from '{}': stage '{}' has not succeeded",
                start, unfinished
            )));
        }

        // Stages about to run go back to idle first, through the listener.
        for stage in start.remaining() {
            if submission.progress.get(*stage) != StageStatus::Idle {
                self.set_status(submission, *stage, StageStatus::Idle);
            }
        }
        submission.clear_from(start);
        submission.current_step = SUBMIT_STEP;
        log::info!(
            "Running screening stages from '{}' for user {}",
            start,
            submission.user_id
        );

        for stage in start.remaining() {
            let stage = *stage;
            self.set_status(submission, stage, StageStatus::Loading);

            match self.execute(stage, submission).await {
                Ok(()) => self.set_status(submission, stage, StageStatus::Success),
                Err(e) => {
                    log::warn!("Stage '{}' failed: {}", stage, e);
                    self.set_status(submission, stage, StageStatus::Error);
                    submission.error_stage = Some(stage);
                    return Err(AppError::stage(stage, e));
                }
            }
        }

        submission
            .output
            .clone()
            .ok_or_else(|| AppError::stage(Stage::Analysis, "analysis returned no output"))
    }

    /// Re-run the recorded failed stage and everything after it.
    pub async fn retry(&self, submission: &mut Submission) -> Result<ScreeningOutput> {
        let stage = submission
            .error_stage
            .ok_or_else(|| AppError::validation("No failed stage to retry"))?;
        self.run(submission, Some(stage)).await
    }

    /// Run, then retry from the failed stage up to `max_retries` times.
    pub async fn run_with_retries(
        &self,
        submission: &mut Submission,
        resume_from: Option<Stage>,
        max_retries: u32,
        delay: Duration,
    ) -> Result<ScreeningOutput> {
        let mut result = self.run(submission, resume_from).await;
        let mut attempt = 0;

        while let Err(AppError::Stage { stage, .. }) = &result {
            if attempt >= max_retries {
                break;
            }
            attempt += 1;
            log::info!(
                "Retrying from '{}' (attempt {}/{})",
                stage,
                attempt,
                max_retries
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result = self.retry(submission).await;
        }

        result
    }

    fn set_status(&self, submission: &mut Submission, stage: Stage, status: StageStatus) {
        submission.progress.set(stage, status);
        if let Some(listener) = &self.listener {
            listener(stage, status);
        }
    }

    async fn execute(&self, stage: Stage, submission: &mut Submission) -> Result<()> {
        match stage {
            Stage::Count => {
                let count = self.api.get_count(&submission.user_id).await?;
                log::info!("User {} has {} prior screening(s)", submission.user_id, count);
                submission.prior_count = Some(count);
            }
            Stage::Video | Stage::Image | Stage::Eeg => {
                let kind = stage
                    .upload_kind()
                    .ok_or_else(|| AppError::validation(format!("'{stage}' is not an upload")))?;
                let key = self.upload(kind, submission).await?;
                submission.set_key(kind, Some(key));
            }
            Stage::Analysis => {
                let keys = result_keys(submission)?;
                let output = self.api.fetch_result(&submission.user_id, &keys).await?;
                log::info!(
                    "Screening result: score={} risk={}",
                    output.score,
                    output.risk
                );
                submission.output = Some(output);
            }
        }
        Ok(())
    }

    async fn upload(&self, kind: MediaKind, submission: &Submission) -> Result<String> {
        let file = submission
            .media(kind)
            .ok_or_else(|| AppError::MissingInput(vec![kind]))?;
        self.api.upload(kind, file).await
    }
}

fn result_keys(submission: &Submission) -> Result<ResultKeys> {
    let keys = &submission.keys;
    match (&keys.image_key, &keys.video_key, &keys.eeg_key) {
        (Some(image), Some(video), Some(eeg)) => Ok(ResultKeys {
            image_key: image.clone(),
            video_key: video.clone(),
            eeg_key: eeg.clone(),
        }),
        _ => Err(AppError::validation(
            "Analysis needs the image, video and EEG storage keys",
        )),
    }
}
