use axum::http::{HeaderValue, Request, Response, StatusCode, header::CONTENT_TYPE};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::task::api::document::MEDIA_TYPE;

/// Layer that labels response bodies with the JSON:API media type
#[derive(Clone, Default)]
pub struct JsonApiMediaTypeLayer;

impl JsonApiMediaTypeLayer {
    /// Creates a new JsonApiMediaTypeLayer
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for JsonApiMediaTypeLayer {
    type Service = JsonApiMediaTypeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JsonApiMediaTypeService { inner }
    }
}

/// Service that sets Content-Type on every response that has a body
#[derive(Clone)]
pub struct JsonApiMediaTypeService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for JsonApiMediaTypeService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = JsonApiMediaTypeFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        JsonApiMediaTypeFuture {
            future: self.inner.call(request),
        }
    }
}

pin_project! {
    /// Future that resolves to a response labelled with the JSON:API media type
    pub struct JsonApiMediaTypeFuture<F> {
        #[pin]
        future: F,
    }
}

impl<F, ResBody, E> Future for JsonApiMediaTypeFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.future.poll(cx) {
            Poll::Ready(Ok(mut response)) => {
                // 204 responses carry no body to describe
                if response.status() != StatusCode::NO_CONTENT {
                    response
                        .headers_mut()
                        .insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
                }
                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}
