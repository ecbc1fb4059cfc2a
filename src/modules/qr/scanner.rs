use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::crud::ScanSink;
use super::schema::AccessType;
use crate::services::{ApiError, Clock};

pub const SCAN_FAILED_MESSAGE: &str = "Error processing the scan";

/// Pause between a successful decode and the automatic submission
pub const DETECTION_DEBOUNCE: Duration = Duration::from_millis(500);

// =============================================================================
// CAMERA
// =============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("No camera available")]
    Unavailable,

    #[error("Camera failed to start: {0}")]
    StartFailed(String),
}

/// A running camera feed handing out decoded QR payloads
#[async_trait]
pub trait CameraStream: Send {
    /// Next decoded payload; `None` once the feed has ended
    async fn next_code(&mut self) -> Option<String>;
    fn stop(&mut self);
    fn destroy(&mut self);
}

#[async_trait]
pub trait CameraBackend: Send + Sync {
    async fn has_camera(&self) -> bool;
    async fn start(&self) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// Backend for hosts without any camera; scanning always falls back to manual entry
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

#[async_trait]
impl CameraBackend for NoCamera {
    async fn has_camera(&self) -> bool {
        false
    }

    async fn start(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(CameraError::Unavailable)
    }
}

/// Owns a started camera and stops and destroys it exactly once,
/// whether released explicitly or dropped
pub struct CameraSession {
    stream: Option<Box<dyn CameraStream>>,
}

impl CameraSession {
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        Self { stream: Some(stream) }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn next_code(&mut self) -> Option<String> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_code().await,
            None => None,
        }
    }

    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            stream.destroy();
            tracing::debug!("Camera released");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// SCANNER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Camera,
    Manual,
}

/// Summary of the most recent successful scan
#[derive(Debug, Clone, PartialEq)]
pub struct LastScan {
    pub access_type: AccessType,
    pub message: String,
    pub at: DateTime<Utc>,
    pub access_log_id: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("No code to submit")]
    EmptyCode,

    #[error("A scan is already being submitted")]
    AlreadySubmitting,

    #[error(transparent)]
    Camera(#[from] CameraError),
}

impl ScanError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(SCAN_FAILED_MESSAGE),
            Self::EmptyCode => "Scan or type the QR code first".to_string(),
            Self::AlreadySubmitting => "A scan is already being submitted".to_string(),
            Self::Camera(_) => "Camera unavailable, switched to manual entry".to_string(),
        }
    }
}

/// Clears the submitting flag however the submission ends
struct Submitting<'a>(&'a AtomicBool);

impl<'a> Submitting<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Entry/exit scanning flow.
///
/// The code string is never validated here; the backend decides whether it is
/// expired or whether the direction fits the user's current state.
pub struct QrScanner {
    sink: Arc<dyn ScanSink>,
    camera: Arc<dyn CameraBackend>,
    clock: Arc<dyn Clock>,
    debounce: Duration,
    access_type: Mutex<AccessType>,
    mode: Mutex<CaptureMode>,
    input: Mutex<String>,
    last_scan: Mutex<Option<LastScan>>,
    submitting: AtomicBool,
}

impl QrScanner {
    pub fn new(sink: Arc<dyn ScanSink>, camera: Arc<dyn CameraBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sink,
            camera,
            clock,
            debounce: DETECTION_DEBOUNCE,
            access_type: Mutex::new(AccessType::Entry),
            mode: Mutex::new(CaptureMode::Camera),
            input: Mutex::new(String::new()),
            last_scan: Mutex::new(None),
            submitting: AtomicBool::new(false),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn access_type(&self) -> AccessType {
        *self.access_type.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_access_type(&self, access_type: AccessType) {
        *self.access_type.lock().unwrap_or_else(|e| e.into_inner()) = access_type;
    }

    pub fn mode(&self) -> CaptureMode {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_mode(&self, mode: CaptureMode) {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = mode;
    }

    /// Switches capture method; asking for the camera on a host without one yields manual mode
    pub async fn choose_mode(&self, requested: CaptureMode) -> CaptureMode {
        let mode = match requested {
            CaptureMode::Camera if !self.camera.has_camera().await => {
                tracing::info!("No camera detected, using manual entry");
                CaptureMode::Manual
            }
            other => other,
        };
        self.set_mode(mode);
        mode
    }

    pub fn set_input(&self, text: &str) {
        *self.input.lock().unwrap_or_else(|e| e.into_inner()) = text.to_string();
    }

    pub fn input(&self) -> String {
        self.input.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Mirrors the enabled state of the manual submit button
    pub fn can_submit(&self) -> bool {
        !self.input().trim().is_empty() && !self.is_submitting()
    }

    pub fn last_scan(&self) -> Option<LastScan> {
        self.last_scan.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Submits the manually entered code; the input is cleared on success
    pub async fn submit_input(&self) -> Result<LastScan, ScanError> {
        let code = self.input();
        let scan = self.submit_code(&code).await?;
        self.set_input("");
        Ok(scan)
    }

    pub async fn submit_code(&self, code: &str) -> Result<LastScan, ScanError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ScanError::EmptyCode);
        }
        let _submitting = Submitting::acquire(&self.submitting).ok_or(ScanError::AlreadySubmitting)?;

        let access_type = self.access_type();
        match self.sink.scan(code, access_type).await {
            Ok(response) => {
                let scan = LastScan {
                    access_type,
                    message: response.message,
                    at: self.clock.now(),
                    access_log_id: response.access_log.map(|log| log.id),
                };
                tracing::info!(%access_type, "Scan registered");
                *self.last_scan.lock().unwrap_or_else(|e| e.into_inner()) = Some(scan.clone());
                Ok(scan)
            }
            Err(e) => {
                tracing::warn!(%access_type, "Scan rejected: {}", e);
                Err(ScanError::Api(e))
            }
        }
    }

    async fn open_camera(&self) -> Result<CameraSession, CameraError> {
        if !self.camera.has_camera().await {
            return Err(CameraError::Unavailable);
        }
        self.camera.start().await.map(CameraSession::new)
    }

    /// Runs the camera until a code is decoded or `stop` resolves.
    ///
    /// A decode releases the camera, waits for the debounce and submits.
    /// `Ok(None)` means the user stopped the camera. When the camera is missing
    /// or fails to start the scanner switches to manual mode.
    pub async fn scan_with_camera<F>(&self, stop: F) -> Result<Option<LastScan>, ScanError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut session = match self.open_camera().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Camera unavailable, falling back to manual entry: {}", e);
                self.set_mode(CaptureMode::Manual);
                return Err(ScanError::Camera(e));
            }
        };
        self.set_mode(CaptureMode::Camera);

        tokio::pin!(stop);
        let decoded = tokio::select! {
            code = session.next_code() => code,
            _ = &mut stop => None,
        };
        session.release();

        let Some(code) = decoded else {
            return Ok(None);
        };

        tracing::debug!("QR code detected");
        tokio::time::sleep(self.debounce).await;
        self.submit_code(&code).await.map(Some)
    }
}
