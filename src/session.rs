//! Scan session state and its JSON view.

use serde::Serialize;
use uuid::Uuid;

use crate::camera::PermissionState;
use crate::capture::CapturedImage;
use crate::error::{ErrorKind, ScanError};
use crate::receipt::ExtractedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    CameraActive,
    PhotoTaken,
    Processing,
    Result,
}

/// User actions, as the buttons the scanner page offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartCamera,
    TakePhoto,
    Process,
    Retake,
    ScanNew,
    DismissError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorOverlay {
    pub kind: ErrorKind,
    pub message: String,
}

/// One scan interaction. The error is an overlay and never changes the phase.
#[derive(Debug, Clone)]
pub struct Session {
    scan_id: Uuid,
    phase: Phase,
    captured: Option<CapturedImage>,
    result: Option<ExtractedResult>,
    error: Option<ErrorOverlay>,
    permission: Option<PermissionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            phase: Phase::Idle,
            captured: None,
            result: None,
            error: None,
            permission: None,
        }
    }

    pub fn scan_id(&self) -> Uuid {
        self.scan_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn captured(&self) -> Option<&CapturedImage> {
        self.captured.as_ref()
    }

    pub fn permission(&self) -> Option<PermissionState> {
        self.permission
    }

    pub fn set_permission(&mut self, permission: PermissionState) {
        self.permission = Some(permission);
    }

    pub fn set_error(&mut self, err: &ScanError) {
        self.error = Some(ErrorOverlay {
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn enter_camera_active(&mut self) {
        self.phase = Phase::CameraActive;
    }

    /// Camera released without a photo.
    pub fn leave_camera(&mut self) {
        if self.phase == Phase::CameraActive {
            self.phase = Phase::Idle;
        }
    }

    pub fn store_photo(&mut self, image: CapturedImage) {
        self.captured = Some(image);
        self.result = None;
        self.phase = Phase::PhotoTaken;
    }

    pub fn enter_processing(&mut self) {
        self.phase = Phase::Processing;
    }

    /// Back to review after an upload that produced no result.
    pub fn leave_processing(&mut self) {
        if self.phase == Phase::Processing {
            self.phase = Phase::PhotoTaken;
        }
    }

    pub fn store_result(&mut self, result: ExtractedResult) {
        self.result = Some(result);
        self.phase = Phase::Result;
    }

    /// New scan: drops image, result and error. Permission is kept.
    pub fn reset(&mut self) {
        self.scan_id = Uuid::new_v4();
        self.phase = Phase::Idle;
        self.captured = None;
        self.result = None;
        self.error = None;
    }

    pub fn available_actions(&self) -> Vec<Action> {
        let mut actions = match self.phase {
            Phase::Idle => vec![Action::StartCamera],
            Phase::CameraActive => vec![Action::TakePhoto],
            Phase::PhotoTaken => vec![Action::Process, Action::Retake],
            Phase::Processing => vec![],
            Phase::Result => vec![Action::ScanNew],
        };
        if self.error.is_some() {
            actions.push(Action::DismissError);
        }
        actions
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            scan_id: self.scan_id,
            phase: self.phase,
            camera_active: self.phase == Phase::CameraActive,
            processing: self.phase == Phase::Processing,
            permission: self.permission,
            has_photo: self.captured.is_some(),
            result: self.result.clone(),
            error: self.error.clone(),
            actions: self.available_actions(),
        }
    }
}

/// What a front end renders.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub scan_id: Uuid,
    pub phase: Phase,
    pub camera_active: bool,
    pub processing: bool,
    pub permission: Option<PermissionState>,
    pub has_photo: bool,
    pub result: Option<ExtractedResult>,
    pub error: Option<ErrorOverlay>,
    pub actions: Vec<Action>,
}
