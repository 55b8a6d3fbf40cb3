//! Weather capability: current conditions for a city via wttr.in.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use stepwise_core::error::ToolError;
use stepwise_core::tool::Capability;
use tracing::{debug, warn};

/// Returned for any non-200 upstream response.
pub const FAILURE_MESSAGE: &str = "Something went wrong";

pub struct WeatherCapability {
    base_url: String,
    client: reqwest::Client,
}

impl WeatherCapability {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// `{base}/{city}?format=%C+%t`, with the city lower-cased and encoded
    /// as a single path segment.
    fn lookup_url(&self, city: &str) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| self.failed(format!("bad weather URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| self.failed(format!("weather URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(&city.to_lowercase());
        url.set_query(Some("format=%C+%t"));
        Ok(url)
    }

    fn failed(&self, reason: String) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason,
        }
    }
}

#[async_trait]
impl Capability for WeatherCapability {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Takes a city name as input and returns the current weather for that city."
    }

    fn signature(&self) -> String {
        "get_weather(city: str)".into()
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let city = input.trim();
        if city.is_empty() {
            return Err(ToolError::InvalidInput("city name must not be empty".into()));
        }

        let url = self.lookup_url(city)?;
        debug!(%url, "Fetching weather");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.failed(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(city, status = status.as_u16(), "Weather service returned error");
            return Ok(FAILURE_MESSAGE.into());
        }

        let body = response.text().await.map_err(|e| self.failed(e.to_string()))?;
        Ok(format!("The weather in {city} is {body}"))
    }
}
