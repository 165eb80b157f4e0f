//! OpenRouteService snap client with sensitive-header handling and safe logging.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::config::SnapConfig;
use crate::error::AppError;
use crate::snap::transport::{SnapFuture, SnapTransport};
use crate::table::{Coordinate, SnappedPoint};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// User agent string for all snap API requests.
const CLIENT_USER_AGENT: &str = concat!("road-snap/", env!("CARGO_PKG_VERSION"));

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types (match the ORS JSON exactly)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireSnapRequest {
    /// `[longitude, latitude]` pairs in submission order.
    locations: Vec<[f64; 2]>,
    /// Search radius in meters; the server default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireSnapResponse {
    /// One entry per submitted point. ORS answers `null` for points with no
    /// road inside the search radius.
    locations: Option<Vec<Option<WireSnappedLocation>>>,
}

#[derive(Debug, Deserialize)]
struct WireSnappedLocation {
    /// `[longitude, latitude]` of the snapped point.
    location: Vec<f64>,
}

/// ORS error body: `{"error": {"code": 2003, "message": ".."}}` or, from the
/// gateway, `{"error": ".."}`.
#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: Option<WireErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireErrorDetail {
    Object { message: Option<String> },
    Text(String),
}

/// Reduces a URL to its path for logging. Scheme, host, query (where ORS
/// accepts `?api_key=`) and fragment are dropped.
pub fn sanitize_url_for_logs(url: &Url) -> String {
    url.path().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// OrsSnapClient
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the ORS `/v2/snap/{profile}` endpoint.
#[derive(Clone)]
pub struct OrsSnapClient {
    http: reqwest::Client,
    endpoint: Url,
    /// Pre-built `Authorization` value, flagged sensitive so it never shows up
    /// in reqwest's own debug output.
    auth_header: HeaderValue,
    radius_meters: Option<f64>,
}

impl std::fmt::Debug for OrsSnapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrsSnapClient")
            .field("endpoint", &sanitize_url_for_logs(&self.endpoint))
            .field("auth_header", &"[REDACTED]")
            .field("radius_meters", &self.radius_meters)
            .finish()
    }
}

impl OrsSnapClient {
    /// Creates a client for `endpoint` authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if the endpoint is not a valid URL or
    /// the key cannot be sent as a header, and `AppError::Unexpected` if the
    /// HTTP client fails to initialize.
    pub fn new(endpoint: &str, api_key: &SecretString, timeout: Duration) -> Result<Self, AppError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            AppError::Configuration(format!("Invalid endpoint '{}': {}", endpoint, e))
        })?;

        let mut auth_header = HeaderValue::from_str(api_key.expose_secret().trim()).map_err(|_| {
            AppError::Configuration(
                "API key contains characters that cannot be sent in an HTTP header".to_string(),
            )
        })?;
        auth_header.set_sensitive(true);

        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint,
            auth_header,
            radius_meters: None,
        })
    }

    /// Creates a client from a validated [`SnapConfig`].
    pub fn from_config(config: &SnapConfig) -> Result<Self, AppError> {
        let client = Self::new(&config.endpoint, &config.api_key, config.timeout)?;
        Ok(client.with_radius(config.radius_meters))
    }

    /// Sets the search radius forwarded with every request.
    pub fn with_radius(mut self, radius_meters: Option<f64>) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    /// Sends one batch of points and returns the snapped points in order.
    ///
    /// # Errors
    ///
    /// - `AppError::Transport` for a non-2xx status, carrying `error.message`
    /// - `AppError::ResponseShape` if `locations` is missing, an entry is
    ///   `null`, or a `location` has fewer than two numbers
    /// - `AppError::Unexpected` for connection failures, timeouts, or a body
    ///   that is not the expected JSON
    pub async fn snap_points(&self, points: &[Coordinate]) -> Result<Vec<SnappedPoint>, AppError> {
        let body = WireSnapRequest {
            locations: points.iter().map(Coordinate::as_lon_lat).collect(),
            radius: self.radius_meters,
        };

        let response = self.execute_with_logging(&body).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(response, status).await);
        }

        let wire: WireSnapResponse = response
            .json()
            .await
            .map_err(|e| AppError::Unexpected(format!("Failed to parse snap response: {}", e.without_url())))?;

        convert_locations(wire)
    }

    /// Executes the POST and logs method, path, status and duration.
    async fn execute_with_logging(&self, body: &WireSnapRequest) -> Result<reqwest::Response, AppError> {
        let start = Instant::now();
        let sanitized_url = sanitize_url_for_logs(&self.endpoint);

        let result = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.auth_header.clone())
            .json(body)
            .send()
            .await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(response) => {
                info!(
                    "[SNAP] POST {} {} {}ms ({} points)",
                    sanitized_url,
                    response.status().as_u16(),
                    duration_ms,
                    body.locations.len()
                );
                Ok(response)
            }
            Err(e) => {
                info!("[SNAP] POST {} FAILED {}ms", sanitized_url, duration_ms);
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    "could not connect to the snap API".to_string()
                } else {
                    e.without_url().to_string()
                };
                Err(AppError::Unexpected(format!("Request to snap API failed: {}", reason)))
            }
        }
    }

    /// Reads the error body and maps it to `AppError::Transport`.
    async fn handle_error_response(
        &self,
        response: reqwest::Response,
        status: reqwest::StatusCode,
    ) -> AppError {
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<WireErrorResponse>(&body)
            .ok()
            .and_then(|wire| wire.error)
            .and_then(|detail| match detail {
                WireErrorDetail::Object { message } => message,
                WireErrorDetail::Text(text) => Some(text),
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("No specific error message provided.")
                    .to_string()
            });

        warn!("[SNAP] API error details: HTTP {} {}", status.as_u16(), message);

        AppError::Transport {
            status: status.as_u16(),
            message,
        }
    }
}

impl SnapTransport for OrsSnapClient {
    fn snap<'a>(&'a self, points: &'a [Coordinate]) -> SnapFuture<'a> {
        Box::pin(self.snap_points(points))
    }
}

/// Converts the wire response into snapped points, rejecting malformed entries.
fn convert_locations(wire: WireSnapResponse) -> Result<Vec<SnappedPoint>, AppError> {
    let locations = wire.locations.ok_or_else(|| {
        AppError::ResponseShape("response has no 'locations' field".to_string())
    })?;

    locations
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let entry = entry.ok_or_else(|| {
                AppError::ResponseShape(format!(
                    "point {} could not be snapped to a road (null location)",
                    i
                ))
            })?;
            match entry.location.as_slice() {
                [longitude, latitude, ..] => Ok(SnappedPoint {
                    latitude: *latitude,
                    longitude: *longitude,
                }),
                _ => Err(AppError::ResponseShape(format!(
                    "point {} has a malformed location",
                    i
                ))),
            }
        })
        .collect()
}

/// Builds the reqwest client with the user agent and request timeout.
fn build_http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .user_agent(CLIENT_USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Unexpected(format!("Failed to build HTTP client: {}", e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
