//! Mapbox Directions API client.

use super::{ChainError, DistanceService};
use crate::config::Config;
use crate::domain::{Coordinates, Route};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const MILES_PER_METER: f64 = 0.000621371;

/// Driving distance via the Mapbox Directions API.
#[derive(Debug, Clone)]
pub struct MapboxDistanceService {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MapboxDistanceService {
    pub fn new(base_url: String, access_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            access_token,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.mapbox_api_url.clone(),
            config.mapbox_access_token.clone(),
        )
    }

    /// Create with the public Mapbox API URL.
    pub fn default_url(access_token: String) -> Self {
        Self::new("https://api.mapbox.com".to_string(), access_token)
    }

    fn directions_url(&self, pickup: Coordinates, dropoff: Coordinates) -> String {
        format!(
            "{}/directions/v5/mapbox/driving/{};{}",
            self.base_url.trim_end_matches('/'),
            pickup,
            dropoff
        )
    }

    async fn get_directions(&self, url: &str) -> Result<serde_json::Value, ChainError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(url)
                .query(&[
                    ("steps", "true"),
                    ("geometries", "geojson"),
                    ("access_token", self.access_token.as_str()),
                ])
                .send()
                .await
                .map_err(|e| backoff::Error::transient(ChainError::NetworkError(e.to_string())))?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                warn!("Directions request failed with {}, retrying", status);
                return Err(backoff::Error::transient(ChainError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if status == 422 {
                let body = response.json::<serde_json::Value>().await.ok();
                return unprocessable(body).map_err(backoff::Error::permanent);
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ChainError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(ChainError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl DistanceService for MapboxDistanceService {
    async fn route(
        &self,
        pickup: Coordinates,
        dropoff: Coordinates,
    ) -> Result<Option<Route>, ChainError> {
        debug!("Fetching route from {} to {}", pickup, dropoff);
        let url = self.directions_url(pickup, dropoff);
        let response = self.get_directions(&url).await?;
        parse_best_route(&response)
    }
}

/// Classify a 422 body. Mapbox answers an unroutable pair with code
/// `NoRoute`; any other 422 is a bad request.
fn unprocessable(body: Option<serde_json::Value>) -> Result<serde_json::Value, ChainError> {
    let body = body.unwrap_or(serde_json::Value::Null);
    if is_no_route(&body) {
        return Ok(body);
    }
    let message = body
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("Unprocessable request")
        .to_string();
    Err(ChainError::HttpError {
        status: 422,
        message,
    })
}

fn is_no_route(response: &serde_json::Value) -> bool {
    response.get("code").and_then(|v| v.as_str()) == Some("NoRoute")
}

/// Take the first (best) route of a Directions response.
fn parse_best_route(response: &serde_json::Value) -> Result<Option<Route>, ChainError> {
    if is_no_route(response) {
        return Ok(None);
    }
    let routes = match response.get("routes").and_then(|v| v.as_array()) {
        Some(routes) => routes,
        None => {
            return Err(ChainError::ParseError(
                "Missing routes array".to_string(),
            ))
        }
    };

    let best = match routes.first() {
        Some(best) => best,
        None => return Ok(None),
    };

    let distance_meters = best
        .get("distance")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ChainError::ParseError("Missing distance field".to_string()))?;
    let duration_seconds = best
        .get("duration")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ChainError::ParseError("Missing duration field".to_string()))?;

    Ok(Some(Route {
        distance_miles: distance_meters * MILES_PER_METER,
        duration_minutes: duration_seconds / 60.0,
    }))
}
