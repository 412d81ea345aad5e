//! Flight-search API client and the `search_flights` tool.
//!
//! A search costs three sequential upstream calls: two autocomplete
//! lookups (source, destination) and the search itself. Nothing is cached
//! or retried; every call is bounded by the configured deadline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::registry::ToolDescriptor;
use super::ToolHandler;
use crate::config::ToolsConfig;
use crate::error::RelayError;

pub const SEARCH_FLIGHTS: &str = "search_flights";

const CONTEXT: &str = "Flight API request";

/// Client for the autocomplete and search endpoints.
#[derive(Clone)]
pub struct FlightApi {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl FlightApi {
    pub fn new(config: &ToolsConfig) -> Result<Self, RelayError> {
        let http = Client::builder()
            .connect_timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        })
    }

    fn transport(&self, err: reqwest::Error) -> RelayError {
        RelayError::transport(err, CONTEXT, self.timeout)
    }

    /// Resolve a free-form location into the label the search endpoint
    /// expects. Takes the `label` of the first autocomplete result.
    pub async fn resolve_country_label(&self, country: &str) -> Result<String, RelayError> {
        let response = self
            .http
            .get(format!("{}/autocomplete", self.base_url))
            .query(&[
                ("term", country),
                ("payment_method_int", "1"),
                ("payment_method", "0"),
                ("country", "1"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(country, status = status.as_u16(), "Country lookup rejected");
            return Err(RelayError::lookup(format!(
                "Country lookup failed with status code {}",
                status.as_u16()
            )));
        }

        let body = response.bytes().await.map_err(|e| self.transport(e))?;
        let items: Vec<Value> = match serde_json::from_slice(&body) {
            Ok(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                warn!(country, "Invalid or empty response from country code API");
                return Err(RelayError::lookup("Invalid response from country code API"));
            }
        };

        let label = items[0]
            .get("label")
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())
            .ok_or_else(|| RelayError::lookup("No labels found in the response"))?;

        debug!(country, label, "Resolved country label");
        Ok(label.to_string())
    }

    /// Search flights, returning the upstream JSON untouched.
    ///
    /// The date is passed through as given; a malformed date surfaces as an
    /// upstream error.
    pub async fn search_flights(
        &self,
        source: &str,
        destination: &str,
        departure_date: &str,
    ) -> Result<Value, RelayError> {
        if source.is_empty() {
            return Err(RelayError::validation("Invalid source"));
        }
        if destination.is_empty() {
            return Err(RelayError::validation("Invalid destination"));
        }
        if departure_date.is_empty() {
            return Err(RelayError::validation("Invalid departure date"));
        }

        info!(source, destination, departure_date, "Searching flights");

        let src = self.resolve_country_label(source).await?;
        let dest = self.resolve_country_label(destination).await?;

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("date", departure_date),
                ("src", src.as_str()),
                ("dest", dest.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::UpstreamStatus {
                context: "Flight search",
                status,
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport(e))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// The `search_flights` tool backed by [`FlightApi`].
pub struct SearchFlightsTool {
    api: FlightApi,
}

impl SearchFlightsTool {
    pub fn new(api: FlightApi) -> Self {
        Self { api }
    }
}

fn string_arg<'a>(arguments: &'a Value, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or("")
}

#[async_trait]
impl ToolHandler for SearchFlightsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: SEARCH_FLIGHTS.to_string(),
            description: "Search flights ".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "source": {"type": "string", "description": "Source "},
                    "destination": {"type": "string", "description": "Destination"},
                    "departure_date": {
                        "type": "string",
                        "description": "Departure date formatted in DD MM, YYYY eg: 01 June, 2025"
                    }
                },
                "required": ["source", "destination", "departure_date"]
            }),
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, RelayError> {
        self.api
            .search_flights(
                string_arg(&arguments, "source"),
                string_arg(&arguments, "destination"),
                string_arg(&arguments, "departure_date"),
            )
            .await
    }
}
