use async_trait::async_trait;
use std::sync::Arc;

use super::schema::{AccessType, QrCode, ScanRequest, ScanResponse};
use crate::services::{ApiClient, ApiError, ApiRequest};

/// Anything that can hand out the currently valid access code
#[async_trait]
pub trait QrSource: Send + Sync {
    async fn current(&self) -> Result<QrCode, ApiError>;
}

/// Anything that can register a scanned code
#[async_trait]
pub trait ScanSink: Send + Sync {
    async fn scan(&self, code: &str, access_type: AccessType) -> Result<ScanResponse, ApiError>;
}

pub struct QrApi {
    api: Arc<ApiClient>,
}

impl QrApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl QrSource for QrApi {
    async fn current(&self) -> Result<QrCode, ApiError> {
        self.api.get_json(ApiRequest::get("/qr/current")).await
    }
}

#[async_trait]
impl ScanSink for QrApi {
    async fn scan(&self, code: &str, access_type: AccessType) -> Result<ScanResponse, ApiError> {
        let request = ApiRequest::post("/qr/scan").json(&ScanRequest {
            qr_code: code,
            access_type,
        })?;
        self.api.post_json(request).await
    }
}
