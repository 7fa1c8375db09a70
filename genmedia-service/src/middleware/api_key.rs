use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Caller-supplied provider credential.
///
/// Optional: without it the configured key is used. A header that is not
/// valid UTF-8 is rejected rather than silently ignored.
#[derive(Clone, Default)]
pub struct ApiKey(pub Option<String>);

impl ApiKey {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.0.is_some() { "Some(***)" } else { "None" };
        f.debug_tuple("ApiKey").field(&format_args!("{}", shown)).finish()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(API_KEY_HEADER) else {
            return Ok(ApiKey(None));
        };
        let key = value.to_str().map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!("{} header is not valid text", API_KEY_HEADER))
        })?;
        let key = key.trim();

        Ok(ApiKey((!key.is_empty()).then(|| key.to_string())))
    }
}
