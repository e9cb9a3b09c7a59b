use crate::core::push::{PushDispatcher, PushResponse, CORS_HEADERS};
use crate::domain::model::PushRequest;
use crate::domain::ports::{PushTransport, SubscriptionStore};
use crate::utils::error::{ProxiError, Result};
use crate::utils::validation::Validate;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP 事件（Lambda function URL 或 API Gateway 格式）中用得到的欄位
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEvent {
    #[serde(default)]
    pub request_context: Option<RequestContext>,
    /// API Gateway REST (v1) 格式的 method
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub http: Option<HttpContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpContext {
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpEvent {
    pub fn method(&self) -> &str {
        self.request_context
            .as_ref()
            .and_then(|c| c.http.as_ref())
            .map(|h| h.method.as_str())
            .or(self.http_method.as_deref())
            .unwrap_or("POST")
    }

    pub fn is_preflight(&self) -> bool {
        self.method().eq_ignore_ascii_case("OPTIONS")
    }

    /// 解析請求內容；格式錯誤視為 400
    pub fn push_request(&self) -> Result<PushRequest> {
        let raw = self.body.as_deref().unwrap_or("");
        let bytes = if self.is_base64_encoded {
            base64::engine::general_purpose::STANDARD
                .decode(raw)
                .map_err(|e| ProxiError::ValidationError {
                    message: format!("invalid base64 body: {}", e),
                })?
        } else {
            raw.as_bytes().to_vec()
        };

        serde_json::from_slice(&bytes).map_err(|e| ProxiError::ValidationError {
            message: format!("invalid JSON body: {}", e),
        })
    }
}

impl HttpResponse {
    fn with_cors(status_code: u16, content_type: &str, body: String) -> Self {
        let mut headers: BTreeMap<String, String> = CORS_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn preflight() -> Self {
        Self::with_cors(200, "text/plain", "ok".to_string())
    }
}

impl From<PushResponse> for HttpResponse {
    fn from(response: PushResponse) -> Self {
        Self::with_cors(
            response.status,
            "application/json",
            response.body.to_string(),
        )
    }
}

/// 處理一次推播請求。欄位檢查先於設定檢查：缺欄位回 400，
/// `dispatcher` 建立失敗（例如 VAPID 金鑰未設定）才回 500。
pub async fn handle<S, T>(event: &HttpEvent, dispatcher: Result<PushDispatcher<S, T>>) -> HttpResponse
where
    S: SubscriptionStore,
    T: PushTransport,
{
    if event.is_preflight() {
        return HttpResponse::preflight();
    }

    let request = match event.push_request() {
        Ok(request) => request,
        Err(e) => return PushResponse::from_result(Err(e)).into(),
    };
    if let Err(e) = request.validate() {
        return PushResponse::from_result(Err(e)).into();
    }

    let dispatcher = match dispatcher {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            tracing::error!("❌ Push dispatcher unavailable: {}", e);
            return PushResponse::error(500, &e.to_string()).into();
        }
    };

    PushResponse::from_result(dispatcher.dispatch(&request).await).into()
}
