//! Response handling module that converts handler results into HTTP responses.
//!
//! This module provides the [`Responder`] trait which defines how different types
//! can be converted into HTTP responses. Handler return values go through it untouched by the
//! validation layer; the `422` rejection itself is built from [`ErrorResponse`].

use crate::body::ResponseBody;
use crate::error::ErrorResponse;
use crate::request::RequestContext;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use mime::Mime;
use serde::Serialize;
use tracing::error;

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody>;
}

/// Serializes `T` as an `application/json` response.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

fn with_content_type(body: ResponseBody, mime: &Mime) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

impl<T: Serialize> Responder for Json<T> {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => with_content_type(ResponseBody::from(bytes), &mime::APPLICATION_JSON),
            Err(e) => {
                error!(cause = %e, "failed to serialize json response");
                let mut response = Response::new(ResponseBody::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}

impl Responder for ErrorResponse {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self)).response_to(req)
    }
}

/// Implementation for Result allows handlers to return Result types directly.
impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

/// None case returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(req),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

/// Pre-built responses pass through with their body converted.
impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl<T: Responder> Responder for (T, StatusCode) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (responder, status) = self;
        (status, responder).response_to(req)
    }
}

impl Responder for () {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

impl Responder for &'static str {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self), &mime::TEXT_PLAIN_UTF_8)
    }
}

impl Responder for String {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        with_content_type(ResponseBody::from(self), &mime::TEXT_PLAIN_UTF_8)
    }
}
