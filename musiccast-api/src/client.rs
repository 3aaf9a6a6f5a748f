//! HTTP client for the MusicCast extended control API

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{ApiError, Result};
use crate::types::{DeviceInfo, Features, PlayInfo, PresetInfo, RawPresetInfo, Status};

const API_PREFIX: &str = "YamahaExtendedControl/v1";
const DEFAULT_ZONE: &str = "main";

/// Device operations the bridge relies on
///
/// Implemented by [`MusicCastClient`] for real devices; tests substitute a
/// recording fake.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn fetch_device_info(&self, host: &str) -> Result<DeviceInfo>;
    async fn fetch_features(&self, host: &str) -> Result<Features>;
    async fn fetch_play_info(&self, host: &str) -> Result<PlayInfo>;
    async fn fetch_preset_info(&self, host: &str) -> Result<PresetInfo>;
    async fn fetch_status(&self, host: &str) -> Result<Status>;
    async fn send_command(&self, host: &str, command: Command) -> Result<()>;
}

/// Derive the distribution group id for a server host
///
/// The MD5 hex digest of the host: stable across restarts, so clients
/// linked in a previous run are still recognised, and 32 characters long as
/// the devices expect.
pub fn group_id_for(server_host: &str) -> String {
    format!("{:x}", md5::compute(server_host.as_bytes()))
}

/// Builder for [`MusicCastClient`]
#[derive(Debug, Clone)]
pub struct MusicCastClientBuilder {
    group_id: String,
    zone: String,
    preset_pattern: Option<Regex>,
    connect_timeout: Duration,
    timeout: Duration,
}

impl MusicCastClientBuilder {
    fn new(group_id: String) -> Self {
        Self {
            group_id,
            zone: DEFAULT_ZONE.to_string(),
            preset_pattern: None,
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = zone.into();
        self
    }

    /// Pattern whose matches are removed from preset display names
    pub fn preset_pattern(mut self, pattern: Option<Regex>) -> Self {
        self.preset_pattern = pattern;
        self
    }

    pub fn timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout = connect;
        self.timeout = total;
        self
    }

    pub fn build(self) -> Result<MusicCastClient> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        Ok(MusicCastClient {
            http,
            group_id: self.group_id,
            zone: self.zone,
            preset_pattern: self.preset_pattern,
        })
    }
}

/// JSON-over-HTTP client shared by every device of one bridge
#[derive(Debug, Clone)]
pub struct MusicCastClient {
    http: reqwest::Client,
    group_id: String,
    zone: String,
    preset_pattern: Option<Regex>,
}

impl MusicCastClient {
    /// Start building a client whose distribution group is keyed on `server_host`
    pub fn builder(server_host: &str) -> MusicCastClientBuilder {
        MusicCastClientBuilder::new(group_id_for(server_host))
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    fn url(&self, host: &str, path: &str) -> String {
        format!("http://{host}/{API_PREFIX}/{path}")
    }

    async fn get_json<T: DeserializeOwned>(&self, host: &str, path: &str) -> Result<T> {
        let url = self.url(host, path);
        debug!(%url, "GET");
        let body: Value = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        trace!(%url, %body, "response");
        check_response_code(&body)?;
        Ok(serde_json::from_value(body)?)
    }
}

fn check_response_code(body: &Value) -> Result<()> {
    match body.get("response_code").and_then(Value::as_i64) {
        Some(0) => Ok(()),
        Some(code) => Err(ApiError::DeviceError(code)),
        None => Err(ApiError::ParseError("missing response_code".to_string())),
    }
}

#[async_trait]
impl DeviceApi for MusicCastClient {
    async fn fetch_device_info(&self, host: &str) -> Result<DeviceInfo> {
        self.get_json(host, "system/getDeviceInfo").await
    }

    async fn fetch_features(&self, host: &str) -> Result<Features> {
        self.get_json(host, "system/getFeatures").await
    }

    async fn fetch_play_info(&self, host: &str) -> Result<PlayInfo> {
        self.get_json(host, "netusb/getPlayInfo").await
    }

    async fn fetch_preset_info(&self, host: &str) -> Result<PresetInfo> {
        let raw: RawPresetInfo = self.get_json(host, "netusb/getPresetInfo").await?;
        Ok(PresetInfo::from_raw(raw.preset_info, self.preset_pattern.as_ref()))
    }

    async fn fetch_status(&self, host: &str) -> Result<Status> {
        let path = format!("{}/getStatus", self.zone);
        self.get_json(host, &path).await
    }

    async fn send_command(&self, host: &str, command: Command) -> Result<()> {
        let request = command.to_request(&self.zone, &self.group_id);
        let url = self.url(host, &request.path);
        debug!(%url, kind = command.kind(), "sending command");

        let builder = match &request.body {
            Some(body) => self.http.post(&url).json(body),
            None => self.http.get(&url),
        };
        let body: Value = builder
            .query(&request.query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        check_response_code(&body)
    }
}
