use engine_logging::{engine_info, engine_warn};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;

use crate::{ApiError, ApiFailureKind, ClientSettings, PresignReply, TriggerReply};

const PRESIGN_PATH: &str = "get-presigned-url";
const PROCESS_PATH: &str = "process-csv";

/// The three HTTP calls of the upload protocol.
///
/// Any HTTP status is a reply; only transport failures are errors.
#[async_trait::async_trait]
pub trait UploadApi: Send + Sync {
    async fn request_presigned_url(&self, filename: &str) -> Result<PresignReply, ApiError>;

    /// PUTs `body` to the presigned URL and returns the storage status code.
    async fn upload(
        &self,
        presigned_url: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<u16, ApiError>;

    async fn trigger_processing(
        &self,
        csv_filename: &str,
        connection_id: &str,
    ) -> Result<TriggerReply, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUploadApi {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestUploadApi {
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        let base = parse_base(&settings.api_base_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiFailureKind::Network, err.to_string()))?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::new(ApiFailureKind::InvalidUrl, err.to_string()))
    }

    async fn post_json(&self, path: &str, payload: Value) -> Result<(u16, Option<Value>), ApiError> {
        let url = self.endpoint(path)?;
        engine_info!("POST {url}");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok((status, serde_json::from_slice(&bytes).ok()))
    }
}

#[async_trait::async_trait]
impl UploadApi for ReqwestUploadApi {
    async fn request_presigned_url(&self, filename: &str) -> Result<PresignReply, ApiError> {
        let (status, body) = self
            .post_json(PRESIGN_PATH, serde_json::json!({ "filename": filename }))
            .await?;
        let reply = PresignReply {
            status,
            presigned_url: string_field(body.as_ref(), "presigned_url"),
            error: string_field(body.as_ref(), "error"),
        };
        if reply.presigned_url.is_none() {
            engine_warn!("presign reply without URL (status {status})");
        }
        Ok(reply)
    }

    async fn upload(
        &self,
        presigned_url: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<u16, ApiError> {
        let url = Url::parse(presigned_url)
            .map_err(|err| ApiError::new(ApiFailureKind::InvalidUrl, err.to_string()))?;
        engine_info!("PUT {} bytes to {}", body.len(), url.host_str().unwrap_or("?"));
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            engine_warn!("storage rejected upload: {status}");
        }
        Ok(status.as_u16())
    }

    async fn trigger_processing(
        &self,
        csv_filename: &str,
        connection_id: &str,
    ) -> Result<TriggerReply, ApiError> {
        let payload = serde_json::json!({
            "csv_filename": csv_filename,
            "connection_id": connection_id,
        });
        let (status, body) = self.post_json(PROCESS_PATH, payload).await?;
        Ok(TriggerReply {
            status,
            error: string_field(body.as_ref(), "error"),
            body,
        })
    }
}

/// Base URL with a trailing slash so endpoint paths join below it.
fn parse_base(raw: &str) -> Result<Url, ApiError> {
    let mut base =
        Url::parse(raw).map_err(|err| ApiError::new(ApiFailureKind::InvalidUrl, err.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(ApiError::new(ApiFailureKind::InvalidUrl, "api base cannot hold paths"));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn string_field(body: Option<&Value>, field: &str) -> Option<String> {
    body?.get(field)?.as_str().map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiFailureKind::Timeout, err.to_string());
    }
    ApiError::new(ApiFailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_gets_trailing_slash() {
        let base = parse_base("https://api.example.com/Prod").unwrap();
        assert_eq!(
            base.join(PRESIGN_PATH).unwrap().as_str(),
            "https://api.example.com/Prod/get-presigned-url"
        );
    }

    #[test]
    fn string_field_ignores_non_strings() {
        let body = serde_json::json!({"presigned_url": 5, "error": "nope"});
        assert_eq!(string_field(Some(&body), "presigned_url"), None);
        assert_eq!(string_field(Some(&body), "error"), Some("nope".to_string()));
        assert_eq!(string_field(None, "error"), None);
    }
}
