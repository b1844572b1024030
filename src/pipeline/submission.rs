// src/pipeline/submission.rs

//! Client-held intake state.

use crate::error::{AppError, Result};
use crate::models::{
    MediaFile, MediaKind, Progress, ScreeningOutput, Stage, StorageKeys, UploadConfig,
};
use crate::services::validate_upload;

/// Intro screen, before any capture step.
pub const INTRO_STEP: usize = 0;

/// Step shown while the stages run.
pub const SUBMIT_STEP: usize = CAPTURE_STEPS.len() + 1;

/// Capture steps in the order the user walks through them (steps 1..=3).
pub const CAPTURE_STEPS: [MediaKind; 3] = [MediaKind::Image, MediaKind::Video, MediaKind::Eeg];

/// One in-progress screening submission.
///
/// Never persisted; dropping it (or calling [`Submission::restart`])
/// discards every binary and result.
#[derive(Debug, Clone)]
pub struct Submission {
    pub(crate) user_id: String,
    pub(crate) photo: Option<MediaFile>,
    pub(crate) video: Option<MediaFile>,
    pub(crate) eeg: Option<MediaFile>,
    pub(crate) current_step: usize,
    pub(crate) progress: Progress,
    pub(crate) error_stage: Option<Stage>,
    pub(crate) keys: StorageKeys,
    pub(crate) prior_count: Option<u64>,
    pub(crate) output: Option<ScreeningOutput>,
    rules: UploadConfig,
}

impl Submission {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self::with_rules(user_id, UploadConfig::default())
    }

    /// Create a submission validating attachments against `rules`.
    pub fn with_rules(user_id: impl Into<String>, rules: UploadConfig) -> Self {
        Self {
            user_id: user_id.into(),
            photo: None,
            video: None,
            eeg: None,
            current_step: INTRO_STEP,
            progress: Progress::default(),
            error_stage: None,
            keys: StorageKeys::default(),
            prior_count: None,
            output: None,
            rules,
        }
    }

    /// Attach a binary, replacing any earlier one of the same kind.
    ///
    /// Invalid files are rejected here, before any network traffic.
    pub fn attach(&mut self, kind: MediaKind, file: MediaFile) -> Result<()> {
        validate_upload(kind, &file, &self.rules)?;
        log::debug!("Attached {} '{}' ({} bytes)", kind, file.filename, file.len());
        *self.slot(kind) = Some(file);
        Ok(())
    }

    /// Drop an attached binary.
    pub fn detach(&mut self, kind: MediaKind) -> Option<MediaFile> {
        self.slot(kind).take()
    }

    fn slot(&mut self, kind: MediaKind) -> &mut Option<MediaFile> {
        match kind {
            MediaKind::Image => &mut self.photo,
            MediaKind::Video => &mut self.video,
            MediaKind::Eeg => &mut self.eeg,
        }
    }

    pub fn media(&self, kind: MediaKind) -> Option<&MediaFile> {
        match kind {
            MediaKind::Image => self.photo.as_ref(),
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Eeg => self.eeg.as_ref(),
        }
    }

    /// Inputs that still have to be provided before submitting.
    pub fn missing_inputs(&self) -> Vec<MediaKind> {
        MediaKind::ALL
            .into_iter()
            .filter(|kind| self.media(*kind).is_none())
            .collect()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Leave the intro and show the first capture step.
    pub fn begin(&mut self) {
        if self.current_step == INTRO_STEP {
            self.current_step = 1;
        }
    }

    /// Move to the next step; a capture step needs its binary first.
    pub fn advance(&mut self) -> Result<usize> {
        if let Some(kind) = self.step_kind() {
            if self.media(kind).is_none() {
                return Err(AppError::MissingInput(vec![kind]));
            }
        }
        if self.current_step < SUBMIT_STEP {
            self.current_step += 1;
        }
        Ok(self.current_step)
    }

    /// Go back one capture step.
    pub fn back(&mut self) -> usize {
        if self.current_step > 1 {
            self.current_step -= 1;
        }
        self.current_step
    }

    /// Media kind captured at the current step, if it is a capture step.
    pub fn step_kind(&self) -> Option<MediaKind> {
        self.current_step
            .checked_sub(1)
            .and_then(|i| CAPTURE_STEPS.get(i).copied())
    }

    /// Discard everything and return to the intro.
    pub fn restart(&mut self) {
        let user_id = std::mem::take(&mut self.user_id);
        let rules = self.rules.clone();
        *self = Self::with_rules(user_id, rules);
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Stage to resume from after a failure.
    pub fn error_stage(&self) -> Option<Stage> {
        self.error_stage
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn prior_count(&self) -> Option<u64> {
        self.prior_count
    }

    pub fn output(&self) -> Option<&ScreeningOutput> {
        self.output.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.progress.is_complete() && self.output.is_some()
    }

    pub(crate) fn set_key(&mut self, kind: MediaKind, key: Option<String>) {
        match kind {
            MediaKind::Image => self.keys.image_key = key,
            MediaKind::Video => self.keys.video_key = key,
            MediaKind::Eeg => self.keys.eeg_key = key,
        }
    }

    /// Forget every result produced by `stage` and later stages.
    pub(crate) fn clear_from(&mut self, stage: Stage) {
        self.progress.reset_from(stage);
        self.error_stage = None;
        self.output = None;
        for s in stage.remaining() {
            match s.upload_kind() {
                Some(kind) => self.set_key(kind, None),
                None if *s == Stage::Count => self.prior_count = None,
                None => {}
            }
        }
    }
}
