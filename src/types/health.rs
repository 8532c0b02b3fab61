use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
    pub tracked_subscribers: usize,
}
