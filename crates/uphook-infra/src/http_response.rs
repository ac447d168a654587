use http::header::CONTENT_LENGTH;
use http::{Response, StatusCode};

use uphook_core::HttpResponse;

/// Conversion of a resolved client response into an outgoing `http::Response`
pub trait IntoHttpResponse {
    /// Build the response verbatim. A missing status code means 200 OK and
    /// `Content-Length` is set whenever there is a body.
    fn into_http_response(self) -> Result<Response<String>, http::Error>;
}

impl IntoHttpResponse for HttpResponse {
    fn into_http_response(self) -> Result<Response<String>, http::Error> {
        let mut builder =
            Response::builder().status(self.status_code.unwrap_or(StatusCode::OK.as_u16()));

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = self.body.unwrap_or_default();
        if !body.is_empty() {
            builder = builder.header(CONTENT_LENGTH, body.len());
        }

        builder.body(body)
    }
}

#[cfg(test)]
mod tests {
    use uphook_core::{resolve, HookResponse, HookType};

    use super::*;

    #[test]
    fn test_rejected_upload_response() {
        let resolution = resolve(
            HookType::PreCreate,
            &HookResponse::reject(HttpResponse::default().with_body("no filename provided")),
        );
        let response = resolution
            .response_for_client(&HttpResponse::new(201))
            .into_http_response()
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_LENGTH], "20");
        assert_eq!(response.headers()["connection"], "close");
        assert_eq!(response.body(), "no filename provided");
    }

    #[test]
    fn test_empty_body_has_no_content_length() {
        let response = HttpResponse::new(204)
            .with_header("Upload-Offset", "0")
            .into_http_response()
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(response.headers()["upload-offset"], "0");
    }

    #[test]
    fn test_invalid_header_name_is_an_error() {
        let result = HttpResponse::new(200)
            .with_header("bad header", "x")
            .into_http_response();
        assert!(result.is_err());
    }
}
