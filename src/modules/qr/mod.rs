pub mod countdown;
pub mod crud;
pub mod display;
pub mod scanner;
pub mod schema;

pub use countdown::{format_mm_ss, remaining_secs, Countdown, Tick};
pub use crud::{QrApi, QrSource, ScanSink};
pub use display::{DisplayEvent, DisplayState, QrDisplay, QrDisplayHandle, RefreshKind, Visibility};
pub use scanner::{CameraBackend, CameraSession, CameraStream, CaptureMode, LastScan, NoCamera, QrScanner, ScanError};
pub use schema::{AccessType, QrCode, ScanResponse};
