use std::string::{String, ToString};
use std::vec::Vec;

use reqwest::Client;

use crate::protocol::{FetchRequest, FetchResponse, Report};

use super::{anisette::RemoteAnisetteProvider, Auth, TransportError};

/// Client for the report fetch endpoint.
pub struct AppleReportsServer {
    client: Client,
    anisette_provider: RemoteAnisetteProvider,
    endpoint: String,
}

impl AppleReportsServer {
    const ENDPOINT_REPORTS_FETCH: &str = "https://gateway.icloud.com/acsnservice/fetch";

    pub fn new(anisette_provider: RemoteAnisetteProvider) -> Self {
        Self::with_endpoint(anisette_provider, Self::ENDPOINT_REPORTS_FETCH)
    }

    /// Talk to a fetch endpoint other than the default one.
    pub fn with_endpoint(anisette_provider: RemoteAnisetteProvider, endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            anisette_provider,
            endpoint: endpoint.to_string(),
        }
    }

    /// Fetch the raw reports matching `request`.
    ///
    /// A single attempt is made. Any status other than 200 is returned as
    /// [`TransportError::Status`] together with the response body.
    pub async fn fetch_reports(
        &self,
        request: &FetchRequest,
        auth: &Auth,
    ) -> Result<Vec<Report>, TransportError> {
        let headers = self.anisette_provider.get_headers().await?;

        let ids: usize = request.search.iter().map(|search| search.ids.len()).sum();
        tracing::debug!(endpoint = %self.endpoint, ids, "fetching reports");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .basic_auth(&auth.dsid, Some(&auth.search_party_token))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "report fetch rejected");
            return Err(TransportError::Status { status, body });
        }

        let body: FetchResponse = response.json().await?;
        tracing::debug!(reports = body.results.len(), "fetched reports");

        Ok(body.results)
    }
}
