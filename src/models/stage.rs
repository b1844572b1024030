// src/models/stage.rs

//! Submission stages and their per-stage status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::MediaKind;

/// One unit of the submission sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Count,
    Video,
    Image,
    Eeg,
    Analysis,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Count,
        Stage::Video,
        Stage::Image,
        Stage::Eeg,
        Stage::Analysis,
    ];

    /// Position in [`Stage::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Stage::Count => 0,
            Stage::Video => 1,
            Stage::Image => 2,
            Stage::Eeg => 3,
            Stage::Analysis => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Count => "count",
            Stage::Video => "video",
            Stage::Image => "image",
            Stage::Eeg => "eeg",
            Stage::Analysis => "analysis",
        }
    }

    /// Human-readable title shown on the progress board.
    pub fn title(&self) -> &'static str {
        match self {
            Stage::Count => "Retrieve Previous Screening Records",
            Stage::Video => "Video Data Upload",
            Stage::Image => "Image Data Upload",
            Stage::Eeg => "EEG Data Upload",
            Stage::Analysis => "Analysis & Processing",
        }
    }

    /// Media uploaded by this stage, if it is an upload stage.
    pub fn upload_kind(&self) -> Option<MediaKind> {
        match self {
            Stage::Video => Some(MediaKind::Video),
            Stage::Image => Some(MediaKind::Image),
            Stage::Eeg => Some(MediaKind::Eeg),
            Stage::Count | Stage::Analysis => None,
        }
    }

    /// Stages from `self` (inclusive) to the end.
    pub fn remaining(&self) -> &'static [Stage] {
        let all: &'static [Stage] = &Self::ALL;
        &all[self.index()..]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "count" | "count-lookup" | "getcount" | "get-count" => Ok(Stage::Count),
            "video" | "video-upload" => Ok(Stage::Video),
            "image" | "image-upload" => Ok(Stage::Image),
            "eeg" | "eeg-upload" => Ok(Stage::Eeg),
            "analysis" | "fetch-result" => Ok(Stage::Analysis),
            other => Err(AppError::validation(format!("Unknown stage: {other}"))),
        }
    }
}

/// Status of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Idle => "idle",
            StageStatus::Loading => "loading",
            StageStatus::Success => "success",
            StageStatus::Error => "error",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage status board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    statuses: [StageStatus; 5],
}

impl Progress {
    pub fn get(&self, stage: Stage) -> StageStatus {
        self.statuses[stage.index()]
    }

    pub fn set(&mut self, stage: Stage, status: StageStatus) {
        self.statuses[stage.index()] = status;
    }

    /// Reset `stage` and every later stage to idle.
    pub fn reset_from(&mut self, stage: Stage) {
        for s in stage.remaining() {
            self.set(*s, StageStatus::Idle);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, StageStatus)> + '_ {
        Stage::ALL.iter().map(|s| (*s, self.get(*s)))
    }

    pub fn is_complete(&self) -> bool {
        self.statuses.iter().all(|s| *s == StageStatus::Success)
    }

    /// First stage currently marked as failed.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.iter()
            .find(|(_, status)| *status == StageStatus::Error)
            .map(|(stage, _)| stage)
    }
}
