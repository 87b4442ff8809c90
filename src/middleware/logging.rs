use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info, warn, Level};

use crate::error::LoggedError;

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();
    let Some(LoggedError(value)) = response.extensions().get::<LoggedError>() else {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            "Processed request"
        );
        return response;
    };

    if failure_level(status) == Level::WARN {
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Rejected request"
        );
    } else {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            elapsed = ?elapsed,
            value = %value,
            "Failed to process request"
        );
    }

    response
}

/// Client mistakes are warnings; everything else the server failed on.
fn failure_level(status: StatusCode) -> Level {
    if status.is_client_error() {
        Level::WARN
    } else {
        Level::ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_log_as_warnings() {
        assert_eq!(failure_level(StatusCode::BAD_REQUEST), Level::WARN);
        assert_eq!(failure_level(StatusCode::FORBIDDEN), Level::WARN);
        assert_eq!(failure_level(StatusCode::NOT_FOUND), Level::WARN);
        assert_eq!(failure_level(StatusCode::INTERNAL_SERVER_ERROR), Level::ERROR);
    }
}
