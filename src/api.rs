//! HTTP client for the Major backend API.
//!
//! Every authenticated call reads the bearer token from the credential store
//! at request time. Non-2xx responses are decoded into [`ApiError::Backend`]
//! with the server's internal error code when the body carries one.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::app_deps::BackendApi;
use crate::constants::api as endpoints;
use crate::credentials::CredentialStore;
use crate::errors::ApiError;

// --- Authentication / user ---

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoginStartResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    pub interval: u64,
}

#[derive(Debug, Serialize)]
struct LoginPollRequest<'a> {
    device_code: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoginPollResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VerifyTokenResponse {
    pub active: bool,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub exp: i64,
}

// --- Organizations ---

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct OrganizationsResponse {
    #[serde(default)]
    organizations: Vec<Organization>,
}

// --- Applications ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateApplicationRequest<'a> {
    name: &'a str,
    description: &'a str,
    organization_id: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationResponse {
    pub application_id: String,
    #[serde(default)]
    pub repository_name: String,
    #[serde(default)]
    pub clone_url_ssh: String,
    #[serde(default)]
    pub clone_url_https: String,
}

#[derive(Debug, Serialize)]
struct ApplicationByRepoRequest<'a> {
    owner: &'a str,
    repo: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationByRepoResponse {
    pub application_id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub url_slug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationEnvRequest<'a> {
    organization_id: &'a str,
    application_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationEnvResponse {
    #[serde(default)]
    env_vars: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationApplicationsRequest<'a> {
    organization_id: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub github_repository_name: String,
    #[serde(default)]
    pub clone_url_ssh: String,
    #[serde(default)]
    pub clone_url_https: String,
}

#[derive(Debug, Deserialize)]
struct OrganizationApplicationsResponse {
    #[serde(default)]
    applications: Vec<ApplicationItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub id: String,
    pub name: String,
    pub template_url: String,
}

#[derive(Debug, Deserialize)]
struct TemplatesResponse {
    #[serde(default)]
    templates: Vec<TemplateItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetTemplateRequest<'a> {
    application_id: &'a str,
    template_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddCollaboratorRequest<'a> {
    application_id: &'a str,
    github_username: &'a str,
}

// --- Versions ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateVersionRequest<'a> {
    application_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_url: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionResponse {
    pub version_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionStatusRequest<'a> {
    application_id: &'a str,
    organization_id: &'a str,
    version_id: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionStatusResponse {
    pub status: String,
    #[serde(default)]
    pub deployment_error: Option<String>,
    #[serde(default)]
    pub app_url: Option<String>,
}

// --- Errors ---

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    internal_code: Option<u32>,
    #[serde(default)]
    error_string: String,
    #[serde(default)]
    status_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

/// Decode a non-2xx response body. Falls back to the HTTP status and the raw
/// body when it is not the structured error shape.
pub fn parse_error_body(status: u16, body: &str) -> ApiError {
    if let Ok(ErrorBody {
        error: Some(detail),
    }) = serde_json::from_str::<ErrorBody>(body)
    {
        return ApiError::Backend {
            status_code: detail.status_code.unwrap_or(status),
            internal_code: detail.internal_code.filter(|c| *c != 0),
            message: detail.error_string,
        };
    }
    ApiError::Backend {
        status_code: status,
        internal_code: None,
        message: body.trim().to_string(),
    }
}

/// Async JSON client for the backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(endpoints::REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("major-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn bearer(&self) -> Result<HeaderValue, ApiError> {
        let token = self
            .credentials
            .token()
            .map_err(|e| ApiError::NoToken(e.to_string()))?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::NoToken("no token found in credential store".to_string()))?;
        HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::NoToken(format!("stored token is not a valid header: {}", e)))
    }

    async fn request<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        authenticated: bool,
    ) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if authenticated {
            req = req.header(AUTHORIZATION, self.bearer()?);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        log::debug!("{} {}", method, url);
        let res = req
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("failed to make request: {}", e)))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("failed to read response: {}", e)))?;
        log::debug!("{} {} -> {}", method, path, status);

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &text));
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &(impl Serialize + ?Sized),
    ) -> Result<R, ApiError> {
        self.request(method, path, Some(body), true).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request::<(), R>(Method::GET, path, None, true).await
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    async fn start_login(&self) -> Result<LoginStartResponse, ApiError> {
        let empty = serde_json::json!({});
        self.request(Method::POST, endpoints::LOGIN_START, Some(&empty), false)
            .await
    }

    async fn poll_login(&self, device_code: &str) -> Result<LoginPollResponse, ApiError> {
        let body = LoginPollRequest { device_code };
        self.request(Method::POST, endpoints::LOGIN_POLL, Some(&body), false)
            .await
    }

    async fn verify_token(&self) -> Result<VerifyTokenResponse, ApiError> {
        self.get(endpoints::VERIFY).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .send(Method::POST, endpoints::LOGOUT, &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn organizations(&self) -> Result<Vec<Organization>, ApiError> {
        let resp: OrganizationsResponse = self.get(endpoints::ORGANIZATIONS).await?;
        Ok(resp.organizations)
    }

    async fn create_application(
        &self,
        name: &str,
        description: &str,
        organization_id: &str,
    ) -> Result<CreateApplicationResponse, ApiError> {
        let body = CreateApplicationRequest {
            name,
            description,
            organization_id,
        };
        self.send(Method::POST, endpoints::APPLICATIONS, &body).await
    }

    async fn application_by_repo(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ApplicationByRepoResponse, ApiError> {
        let body = ApplicationByRepoRequest { owner, repo };
        self.send(Method::POST, endpoints::APPLICATION_FROM_REPO, &body)
            .await
    }

    async fn application_env(
        &self,
        organization_id: &str,
        application_id: &str,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        let body = ApplicationEnvRequest {
            organization_id,
            application_id,
        };
        let resp: ApplicationEnvResponse = self
            .send(Method::POST, endpoints::APPLICATION_ENV, &body)
            .await?;
        Ok(resp.env_vars)
    }

    async fn organization_applications(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ApplicationItem>, ApiError> {
        let body = OrganizationApplicationsRequest { organization_id };
        let resp: OrganizationApplicationsResponse = self
            .send(Method::POST, endpoints::ORGANIZATION_APPLICATIONS, &body)
            .await?;
        Ok(resp.applications)
    }

    async fn templates(&self) -> Result<Vec<TemplateItem>, ApiError> {
        let resp: TemplatesResponse = self.get(endpoints::TEMPLATES).await?;
        Ok(resp.templates)
    }

    async fn set_application_template(
        &self,
        application_id: &str,
        template_id: &str,
    ) -> Result<(), ApiError> {
        let body = SetTemplateRequest {
            application_id,
            template_id,
        };
        let _: serde_json::Value = self
            .send(Method::POST, endpoints::APPLICATION_TEMPLATE, &body)
            .await?;
        Ok(())
    }

    async fn add_github_collaborator(
        &self,
        application_id: &str,
        github_username: &str,
    ) -> Result<(), ApiError> {
        let body = AddCollaboratorRequest {
            application_id,
            github_username,
        };
        let _: serde_json::Value = self
            .send(Method::POST, endpoints::ADD_GH_COLLABORATORS, &body)
            .await?;
        Ok(())
    }

    async fn create_version(
        &self,
        application_id: &str,
        app_url: Option<&str>,
    ) -> Result<CreateVersionResponse, ApiError> {
        let body = CreateVersionRequest {
            application_id,
            app_url,
        };
        self.send(Method::POST, endpoints::APPLICATION_VERSIONS, &body)
            .await
    }

    async fn version_status(
        &self,
        application_id: &str,
        organization_id: &str,
        version_id: &str,
    ) -> Result<VersionStatusResponse, ApiError> {
        let body = VersionStatusRequest {
            application_id,
            organization_id,
            version_id,
        };
        self.send(Method::POST, endpoints::VERSION_STATUS, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_error() {
        let body = r#"{"error":{"internal_code":4000,"error_string":"Application not found","status_code":404}}"#;
        let err = parse_error_body(404, body);
        assert_eq!(err.internal_code(), Some(4000));
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(
            err.to_string(),
            "API error (status 404): Application not found"
        );
    }

    #[test]
    fn test_parse_unstructured_error_falls_back() {
        let err = parse_error_body(502, "Bad Gateway\n");
        assert_eq!(err.internal_code(), None);
        assert_eq!(err.status_code(), Some(502));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_version_status_optional_fields() {
        let resp: VersionStatusResponse = serde_json::from_str(r#"{"status":"BUILDING"}"#).unwrap();
        assert_eq!(resp.status, "BUILDING");
        assert_eq!(resp.deployment_error, None);
    }
}
