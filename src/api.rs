use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::window::YearWindow;

pub const BLS_API_URL: &str = "https://api.bls.gov/publicAPI/v2/timeseries/data/";

// ----------------------- Wire types -----------------------
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeriesRequest {
    pub seriesid: Vec<String>,
    pub startyear: String,
    pub endyear: String,
    pub registrationkey: String,
}

impl SeriesRequest {
    pub fn new(code: &str, window: YearWindow, api_key: &str) -> Self {
        SeriesRequest {
            seriesid: vec![code.to_string()],
            startyear: window.start.to_string(),
            endyear: window.end.to_string(),
            registrationkey: api_key.to_string(),
        }
    }
}

/// Top-level BLS payload. Rejected requests come back with a non-success
/// `status`, an explanation in `message`, and an empty or absent `Results`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Vec<String>,
    #[serde(rename = "Results", default)]
    pub results: Option<ApiResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResults {
    #[serde(default)]
    pub series: Option<Vec<ApiSeries>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSeries {
    #[serde(rename = "seriesID", default)]
    pub series_id: Option<String>,
    pub data: Vec<Observation>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Observation {
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ApiResponse {
    pub fn parse(body: &[u8], code: &str, window: YearWindow) -> FetchResult<ApiResponse> {
        serde_json::from_slice(body).map_err(|source| FetchError::MalformedResponse {
            code: code.to_string(),
            start_year: window.start,
            end_year: window.end,
            source,
        })
    }

    /// The returned series list, or `MissingSeries` when the payload has none.
    pub fn series(&self, code: &str, window: YearWindow) -> FetchResult<&[ApiSeries]> {
        self.results
            .as_ref()
            .and_then(|r| r.series.as_deref())
            .ok_or_else(|| FetchError::MissingSeries {
                code: code.to_string(),
                start_year: window.start,
                end_year: window.end,
            })
    }
}

// ----------------------- Client seam -----------------------
#[async_trait]
pub trait SeriesApi {
    async fn fetch_window(&self, code: &str, window: YearWindow) -> FetchResult<ApiResponse>;
}

pub struct BlsClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl BlsClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent("cpi-pull/0.1.0 (rust reqwest)");
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("Failed to build BLS HTTP client")?;

        Ok(BlsClient {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl SeriesApi for BlsClient {
    async fn fetch_window(&self, code: &str, window: YearWindow) -> FetchResult<ApiResponse> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            code: code.to_string(),
            start_year: window.start,
            end_year: window.end,
            source,
        };

        debug!(code, %window, endpoint = %self.endpoint, "POST series window");

        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&SeriesRequest::new(code, window, &self.api_key))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                code: code.to_string(),
                start_year: window.start,
                end_year: window.end,
                status,
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(transport)?;
        ApiResponse::parse(&bytes, code, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WINDOW: YearWindow = YearWindow { start: 2001, end: 2020 };

    #[test]
    fn request_body_matches_bls_shape() {
        let req = SeriesRequest::new("CUUR0000SA0", WINDOW, "secret");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "seriesid": ["CUUR0000SA0"],
                "startyear": "2001",
                "endyear": "2020",
                "registrationkey": "secret"
            })
        );
    }

    #[test]
    fn parses_successful_payload() {
        let body = br#"{
            "status": "REQUEST_SUCCEEDED",
            "responseTime": 41,
            "message": [],
            "Results": {
                "series": [{
                    "seriesID": "CUUR0000SA0",
                    "data": [
                        {"year": "2020", "period": "M12", "periodName": "December", "value": "260.474", "footnotes": [{}]},
                        {"year": "2020", "period": "M11", "periodName": "November", "value": "260.229", "footnotes": [{}]}
                    ]
                }]
            }
        }"#;

        let resp = ApiResponse::parse(body, "CUUR0000SA0", WINDOW).unwrap();
        let series = resp.series("CUUR0000SA0", WINDOW).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].series_id.as_deref(), Some("CUUR0000SA0"));
        assert_eq!(series[0].data.len(), 2);
        assert_eq!(series[0].data[0].period.as_deref(), Some("M12"));
        assert_eq!(series[0].data[1].value.as_deref(), Some("260.229"));
    }

    #[test]
    fn invalid_series_payload_has_no_values() {
        let body = br#"{
            "status": "REQUEST_SUCCEEDED",
            "message": ["Series does not exist for Series BOGUS"],
            "Results": {"series": [{"seriesID": "BOGUS", "data": []}]}
        }"#;

        let resp = ApiResponse::parse(body, "BOGUS", WINDOW).unwrap();
        assert_eq!(resp.message.len(), 1);
        let series = resp.series("BOGUS", WINDOW).unwrap();
        assert!(series[0].data.is_empty());
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = ApiResponse::parse(b"<html>503</html>", "CUUR0000SA0", WINDOW).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { start_year: 2001, .. }));
        assert!(err.is_remote());
    }

    #[test]
    fn series_without_data_is_malformed() {
        let body = br#"{"Results": {"series": [{"seriesID": "CUUR0000SA0"}]}}"#;
        let err = ApiResponse::parse(body, "CUUR0000SA0", WINDOW).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { start_year: 2001, .. }));
    }

    #[test]
    fn missing_results_is_reported() {
        let body = br#"{"status": "REQUEST_NOT_PROCESSED", "message": ["daily threshold reached"], "Results": {}}"#;
        let resp = ApiResponse::parse(body, "CUUR0000SA0", WINDOW).unwrap();
        let err = resp.series("CUUR0000SA0", WINDOW).unwrap_err();
        assert!(matches!(err, FetchError::MissingSeries { end_year: 2020, .. }));
    }
}
