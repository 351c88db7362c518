use std::string::{String, ToString};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Deserialize;
use uuid::Uuid;

use super::TransportError;

/// The provisioning values an anisette server hands out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnisetteData {
    /// One-time password, sent as `X-Apple-I-MD`.
    #[serde(rename = "X-Apple-I-MD")]
    pub one_time_password: String,
    /// Machine id, sent as `X-Apple-I-MD-M`.
    #[serde(rename = "X-Apple-I-MD-M")]
    pub machine_id: String,
}

impl AnisetteData {
    /// Build the full header set for a request made at `now`.
    ///
    /// `user_id` and `device_id` identify the pretend device; callers should pick
    /// fresh ones for every request.
    pub fn headers(
        &self,
        now: DateTime<Utc>,
        user_id: Uuid,
        device_id: Uuid,
    ) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::with_capacity(10);

        insert(&mut headers, "X-Apple-I-MD", &self.one_time_password)?;
        insert(&mut headers, "X-Apple-I-MD-M", &self.machine_id)?;
        insert(
            &mut headers,
            "X-Apple-I-Client-Time",
            &now.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        headers.insert(
            "X-Apple-I-TimeZone",
            HeaderValue::from_static(RemoteAnisetteProvider::TIMEZONE),
        );
        headers.insert("loc", HeaderValue::from_static(RemoteAnisetteProvider::LOCALE));
        headers.insert(
            "X-Apple-Locale",
            HeaderValue::from_static(RemoteAnisetteProvider::LOCALE),
        );
        headers.insert(
            "X-Apple-I-MD-RINFO",
            HeaderValue::from_static(RemoteAnisetteProvider::ROUTER),
        );
        // no dashes
        insert(&mut headers, "X-Apple-I-MD-LU", &format!("{:X}", user_id.simple()))?;
        insert(
            &mut headers,
            "X-Mme-Device-Id",
            &format!("{:X}", device_id.hyphenated()),
        )?;
        headers.insert("X-Apple-I-SRL-NO", HeaderValue::from_static("0"));

        Ok(headers)
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), TransportError> {
    let value = HeaderValue::from_str(value)
        .map_err(|source| TransportError::InvalidHeader { name, source })?;
    headers.insert(name, value);

    Ok(())
}

/// Fetches anisette data from an anisette server, e.g. `anisette-v3-server`.
pub struct RemoteAnisetteProvider {
    endpoint: String,
    client: Client,
}

impl RemoteAnisetteProvider {
    const TIMEZONE: &str = "UTC";
    const LOCALE: &str = "en_US";
    const ROUTER: &str = "17106176";

    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: Client::new(),
        }
    }

    /// Ask the anisette server for fresh provisioning data.
    pub async fn get_anisette_data(&self) -> Result<AnisetteData, TransportError> {
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    /// Fetch anisette data and turn it into request headers with newly generated ids.
    pub async fn get_headers(&self) -> Result<HeaderMap, TransportError> {
        let data = self.get_anisette_data().await?;
        tracing::debug!(endpoint = %self.endpoint, "fetched anisette data");

        data.headers(Utc::now(), Uuid::new_v4(), Uuid::new_v4())
    }
}
