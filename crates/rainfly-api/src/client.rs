// Cloud API HTTP client
//
// Wraps `reqwest::Client` with cloud-specific URL construction, the
// `{status, description}` envelope convention, and bearer-token auth.
// The claiming endpoints live on a separate base URL because the cloud
// hosts them on a dedicated service.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::AccessToken;
use crate::error::Error;
use crate::models::{
    ApiStatus, NodeDetail, NodeDetailsPage, NodeGroupDetail, NodeGroupsPage, NodePayload,
    NodeResponse, ShareNodesBody, SharingRequest, SharingRequestsPage,
};
use crate::transport::TransportConfig;

/// Async client for the cloud REST API.
///
/// Handles bearer-token injection, the `{status, description}` failure
/// envelope, and the split between the main API base and the claiming
/// service base. All methods return unwrapped payloads -- the envelope
/// is checked before the caller sees anything.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    claim_base_url: Url,
}

impl ApiClient {
    /// Create a new client from base URLs and an access token.
    ///
    /// `base_url` should be the versioned API root (e.g.
    /// `https://api.example.com/v1/`); `claim_base_url` the claiming
    /// service root. Trailing slashes are normalized so relative joins
    /// behave.
    pub fn new(
        base_url: Url,
        claim_base_url: Url,
        token: &AccessToken,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, token.header_value()?);
        let http = transport.build_client_with_headers(headers)?;

        Ok(Self {
            http,
            base_url: normalize(base_url),
            claim_base_url: normalize(claim_base_url),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Used by tests pointing at a mock server.
    pub fn with_client(http: reqwest::Client, base_url: Url, claim_base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize(base_url),
            claim_base_url: normalize(claim_base_url),
        }
    }

    /// The cloud API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    pub(crate) fn claim_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.claim_base_url.join(path)?)
    }

    // ── Node fleet ───────────────────────────────────────────────────

    /// Fetch the full node list with config, status, and current params.
    pub async fn get_nodes(&self) -> Result<Vec<NodeDetail>, Error> {
        let url = self.api_url("user/nodes")?;
        debug!(%url, "GET node details");

        let resp = self
            .http
            .get(url)
            .query(&[("node_details", "true")])
            .send()
            .await?;
        let page: NodeDetailsPage = parse_json(resp).await?;
        Ok(page.node_details)
    }

    /// Fetch the current parameter values of a single node.
    pub async fn get_node_params(&self, node_id: &str) -> Result<Value, Error> {
        let url = self.api_url("user/nodes/params")?;
        debug!(%url, node_id, "GET node params");

        let resp = self
            .http
            .get(url)
            .query(&[("node_id", node_id)])
            .send()
            .await?;
        parse_json(resp).await
    }

    /// Issue a batched multi-node parameter write.
    ///
    /// The cloud answers with one `NodeResponse` per node; partial
    /// failure is expressed there, never as an HTTP error.
    pub async fn set_node_params(&self, batch: &[NodePayload]) -> Result<Vec<NodeResponse>, Error> {
        let url = self.api_url("user/nodes/params")?;
        debug!(%url, nodes = batch.len(), "PUT node params batch");

        let resp = self.http.put(url).json(batch).send().await?;
        parse_json(resp).await
    }

    /// Fetch the user's node groups.
    pub async fn get_node_groups(&self) -> Result<Vec<NodeGroupDetail>, Error> {
        let url = self.api_url("user/node_group")?;
        debug!(%url, "GET node groups");

        let resp = self.http.get(url).send().await?;
        let page: NodeGroupsPage = parse_json(resp).await?;
        Ok(page.groups)
    }

    // ── Claiming service ─────────────────────────────────────────────

    /// Forward the device-info blob to the claim-initiate endpoint.
    ///
    /// Returns the raw response bytes: the body is relayed verbatim to
    /// the device as the claim-init payload, so it must not be
    /// re-serialized here.
    pub async fn claim_initiate(&self, device_info: &Value) -> Result<Vec<u8>, Error> {
        let url = self.claim_url("claim/initiate")?;
        debug!(%url, "POST claim initiate");

        let resp = self.http.post(url).json(device_info).send().await?;
        raw_body(resp).await
    }

    /// Submit the device's CSR to the claim-verify endpoint.
    ///
    /// The raw response bytes are the signed certificate payload to be
    /// streamed back to the device.
    pub async fn claim_verify(&self, csr: &Value) -> Result<Vec<u8>, Error> {
        let url = self.claim_url("claim/verify")?;
        debug!(%url, "POST claim verify");

        let resp = self.http.post(url).json(csr).send().await?;
        raw_body(resp).await
    }

    // ── Node sharing ─────────────────────────────────────────────────

    /// Share nodes with another user (issues a sharing request).
    pub async fn share_nodes(&self, body: &ShareNodesBody) -> Result<(), Error> {
        let url = self.api_url("user/nodes/sharing")?;
        debug!(%url, nodes = body.nodes.len(), "PUT node sharing");

        let resp = self.http.put(url).json(body).send().await?;
        check_status(resp).await
    }

    /// List sharing requests, either issued by this user (`primary`)
    /// or awaiting this user's response.
    pub async fn list_sharing_requests(&self, primary: bool) -> Result<Vec<SharingRequest>, Error> {
        let url = self.api_url("user/nodes/sharing/requests")?;
        debug!(%url, primary, "GET sharing requests");

        let resp = self
            .http
            .get(url)
            .query(&[("primary_user", if primary { "true" } else { "false" })])
            .send()
            .await?;
        let page: SharingRequestsPage = parse_json(resp).await?;
        Ok(page.sharing_requests)
    }

    /// Accept or decline a pending sharing request.
    pub async fn respond_sharing_request(&self, request_id: &str, accept: bool) -> Result<(), Error> {
        let url = self.api_url("user/nodes/sharing/requests")?;
        debug!(%url, request_id, accept, "PUT sharing request response");

        let body = serde_json::json!({
            "request_id": request_id,
            "accept": accept,
        });
        let resp = self.http.put(url).json(&body).send().await?;
        check_status(resp).await
    }

    /// Revoke a user's access to a node.
    pub async fn revoke_sharing(&self, node_id: &str, user_name: &str) -> Result<(), Error> {
        let url = self.api_url("user/nodes/sharing")?;
        debug!(%url, node_id, user_name, "DELETE node sharing");

        let resp = self
            .http
            .delete(url)
            .query(&[("nodes", node_id), ("user_name", user_name)])
            .send()
            .await?;
        check_status(resp).await
    }

    // ── Connectivity ─────────────────────────────────────────────────

    /// Cheap reachability probe against the API base.
    ///
    /// Used by the engines to short-circuit batch calls while offline
    /// instead of burning a full round trip per node.
    pub async fn probe(&self) -> bool {
        match self.api_url("user/nodes") {
            Ok(url) => self.http.head(url).send().await.is_ok(),
            Err(_) => false,
        }
    }
}

// ── Response helpers ─────────────────────────────────────────────────

fn normalize(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    url
}

/// Deserialize a JSON body after rejecting HTTP-level failures.
async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "access token rejected or expired".into(),
        });
    }

    let body = resp.text().await?;

    if !status.is_success() {
        // Failure bodies usually carry the envelope; fall back to the
        // raw text when they don't.
        let message = serde_json::from_str::<ApiStatus>(&body)
            .map(|s| s.description)
            .ok()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| body.clone());
        return Err(Error::Cloud {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Check the `{status, description}` envelope of a write endpoint.
async fn check_status(resp: reqwest::Response) -> Result<(), Error> {
    let envelope: ApiStatus = parse_json(resp).await?;
    if envelope.is_success() {
        Ok(())
    } else {
        Err(Error::ApiFailure {
            message: if envelope.description.is_empty() {
                format!("status={}", envelope.status)
            } else {
                envelope.description
            },
        })
    }
}

/// Return the raw body bytes of a 2xx response.
async fn raw_body(resp: reqwest::Response) -> Result<Vec<u8>, Error> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ApiStatus>(&bytes)
            .map(|s| s.description)
            .ok()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
        return Err(Error::Cloud {
            status: status.as_u16(),
            message,
        });
    }

    Ok(bytes.to_vec())
}
