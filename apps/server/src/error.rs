use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tickerbridge_market_data::{MarketDataError, ProviderAttempt};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<ProviderAttempt>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MarketData(e) => match e {
                e if e.is_not_found() => StatusCode::NOT_FOUND,
                MarketDataError::NoProvidersAvailable { .. } => StatusCode::NOT_IMPLEMENTED,
                MarketDataError::AllProvidersFailed { .. } => StatusCode::BAD_GATEWAY,
                MarketDataError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed with {}: {}", status, self);
        }

        let attempts = match &self {
            ApiError::MarketData(MarketDataError::AllProvidersFailed { attempts, .. }) => {
                attempts.clone()
            }
            _ => Vec::new(),
        };

        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
            attempts,
        };
        (status, Json(body)).into_response()
    }
}
