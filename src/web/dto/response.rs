//! Response DTOs.
//!
//! Successful responses wrap their payload as `{ "data": ... }`.

use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::{MirrorStats, UploadResult};

/// Successful upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Stored file details.
    pub data: UploadResult,
}

impl From<UploadResult> for UploadResponse {
    fn from(data: UploadResult) -> Self {
        Self { data }
    }
}

/// Mirror health snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct MirrorHealthResponse {
    /// Mirror failure counters.
    pub data: MirrorStats,
}

impl From<MirrorStats> for MirrorHealthResponse {
    fn from(data: MirrorStats) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_wraps_data() {
        let result = UploadResult {
            filename: "report_1_0a1b2c3d.pdf".to_string(),
            original_name: "report.pdf".to_string(),
            url: "/storage/reports/report_1_0a1b2c3d.pdf".to_string(),
            file_size: 12,
            mime_type: "application/pdf".to_string(),
        };

        let json = serde_json::to_value(UploadResponse::from(result)).unwrap();
        assert_eq!(json["data"]["originalName"], "report.pdf");
        assert_eq!(json["data"]["fileSize"], 12);
    }

    #[test]
    fn test_mirror_health_response_wraps_data() {
        let stats = MirrorStats {
            enabled: false,
            failures: 0,
            last_failure: None,
        };

        let json = serde_json::to_value(MirrorHealthResponse::from(stats)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "data": { "enabled": false, "failures": 0, "lastFailure": null } })
        );
    }
}
