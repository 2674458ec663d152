//! HTTP client for the bridge REST API

use crate::{
    Controller, Error, LastScan, Light, LightAttributes, LightId, LightState, NewLights, Result,
};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for reads
const GET_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for state and name changes
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bridge error type for "resource not available"
const RESOURCE_NOT_AVAILABLE: u16 = 3;

/// A lighting bridge reachable over HTTP
pub struct Bridge {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LightEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: Option<LightState>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    kind: u16,
    #[serde(default)]
    address: String,
    #[serde(default)]
    description: String,
}

impl ApiErrorDetail {
    fn into_error(self) -> Error {
        if self.kind == RESOURCE_NOT_AVAILABLE {
            Error::LightNotFound(self.address)
        } else {
            Error::Api {
                kind: self.kind,
                address: self.address,
                description: self.description,
            }
        }
    }
}

impl Bridge {
    /// Create a client for the bridge at `address` using an authorized `username`
    ///
    /// `address` may be a bare host (`192.168.1.20`) or a full base URL
    /// (`http://192.168.1.20:8080`).
    pub fn new(address: &str, username: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("lightstrand/0.1"),
                );
                headers
            })
            .build()?;

        let address = address.trim_end_matches('/');
        let root = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        Ok(Self {
            client,
            base_url: format!("{}/api/{}", root, username),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        debug!(path = %path, "GET bridge resource");
        let response = self
            .client
            .get(self.url(path))
            .timeout(GET_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        check_api_errors(&body)?;
        Ok(body)
    }

    async fn put_json(&self, path: &str, body: &impl serde::Serialize) -> Result<()> {
        debug!(path = %path, "PUT bridge resource");
        let response = self
            .client
            .put(self.url(path))
            .json(body)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        check_api_errors(&body)
    }
}

/// Turn the first `{"error": {...}}` entry of a response into an [`Error`]
fn check_api_errors(body: &Value) -> Result<()> {
    if let Value::Array(entries) = body {
        for entry in entries {
            if let Some(detail) = entry.get("error") {
                let detail: ApiErrorDetail = serde_json::from_value(detail.clone())?;
                return Err(detail.into_error());
            }
        }
    }
    Ok(())
}

/// Numeric ids sort numerically, anything else lexically
fn compare_ids(a: &LightId, b: &LightId) -> Ordering {
    match (a.as_str().parse::<u64>(), b.as_str().parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Parse a `{ "<id>": { "name": ... }, ... }` object into lights
fn parse_light_map(body: Value) -> Result<Vec<Light>> {
    let Value::Object(map) = body else {
        return Err(Error::InvalidResponse(
            "expected an object keyed by light id".to_string(),
        ));
    };

    let mut lights = Vec::with_capacity(map.len());
    for (id, entry) in map {
        if id == "lastscan" {
            continue;
        }
        let entry: LightEntry = serde_json::from_value(entry)?;
        let mut light = Light::new(id, entry.name);
        light.state = entry.state;
        lights.push(light);
    }
    lights.sort_by(|a, b| compare_ids(&a.id, &b.id));

    Ok(lights)
}

fn parse_new_lights(body: Value) -> Result<NewLights> {
    let last_scan = match body.get("lastscan").and_then(Value::as_str) {
        Some(value) => LastScan::parse(value)?,
        None => LastScan::Never,
    };
    Ok(NewLights {
        lights: parse_light_map(body)?,
        last_scan,
    })
}

#[async_trait]
impl Controller for Bridge {
    async fn get_lights(&self) -> Result<Vec<Light>> {
        let body = self.get_json("lights").await?;
        parse_light_map(body)
    }

    async fn get_new_lights(&self) -> Result<NewLights> {
        let body = self.get_json("lights/new").await?;
        parse_new_lights(body)
    }

    async fn search_for_new_lights(&self) -> Result<()> {
        debug!("POST bridge light search");
        let response = self
            .client
            .post(self.url("lights"))
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        check_api_errors(&body)
    }

    async fn get_light_attributes(&self, light_id: &str) -> Result<LightAttributes> {
        let body = self.get_json(&format!("lights/{}", light_id)).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn set_light_name(&self, light_id: &str, name: &str) -> Result<()> {
        self.put_json(
            &format!("lights/{}", light_id),
            &serde_json::json!({ "name": name }),
        )
        .await
    }

    async fn set_light_state(&self, light_id: &str, state: &LightState) -> Result<()> {
        self.put_json(&format!("lights/{}/state", light_id), state)
            .await
    }
}
