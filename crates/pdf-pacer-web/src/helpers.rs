//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Option` and `Result` types
//! into HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::http::StatusCode;
use pdf_pacer_core::{Error, ZoomLevel};

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::NOT_FOUND, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Status code for a library error.
///
/// Unreadable documents are the client's file, not a server fault.
pub const fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::PdfOpen(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::PdfInvalidPage { .. } => StatusCode::NOT_FOUND,
        Error::ConfigInvalid { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a library error into a route error.
pub fn core_error(error: &Error) -> (StatusCode, String) {
    (error_status(error), error.to_string())
}

/// Validate that a page number is within bounds.
///
/// Returns 404 Not Found if page >= page_count.
pub fn validate_page(page: usize, page_count: usize) -> RouteResult<()> {
    if page >= page_count {
        Err((
            StatusCode::NOT_FOUND,
            format!("Page {page} out of range (0..{page_count})"),
        ))
    } else {
        Ok(())
    }
}

/// Parse an optional `zoom` query value, falling back to `default`.
pub fn parse_zoom(value: Option<&str>, default: ZoomLevel) -> RouteResult<ZoomLevel> {
    value.map_or(Ok(default), |raw| {
        ZoomLevel::parse(raw).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Unsupported zoom '{raw}', use 75, 100, 125 or 150"),
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_page() {
        assert!(validate_page(0, 1).is_ok());
        assert_eq!(
            validate_page(3, 3).map_err(|(status, _)| status),
            Err(StatusCode::NOT_FOUND)
        );
    }

    #[test]
    fn test_parse_zoom() {
        assert_eq!(parse_zoom(None, ZoomLevel::Percent125), Ok(ZoomLevel::Percent125));
        assert_eq!(parse_zoom(Some("150"), ZoomLevel::Percent100), Ok(ZoomLevel::Percent150));
        assert_eq!(
            parse_zoom(Some("90"), ZoomLevel::Percent100).map_err(|(status, _)| status),
            Err(StatusCode::BAD_REQUEST)
        );
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            error_status(&Error::PdfOpen("bad".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            error_status(&Error::PdfInvalidPage { page: 4, total: 2 }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&Error::StoreRead("io".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
