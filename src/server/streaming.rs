// The stream encoder: turns a fragment stream into the relay's wire
// format over a long-lived, non-buffered HTTP response.
//
// One frame per fragment. A gateway failure mid-stream produces exactly
// one terminal error frame before the channel closes; the stream is never
// closed silently on an error path.

use crate::core::ai::FragmentStream;
use crate::core::stream::{encode_frame, Frame};
use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{future, StreamExt};
use std::convert::Infallible;

/// Fixed message carried by terminal error frames. Upstream error details
/// stay in the server log.
pub const STREAM_FAILED_MESSAGE: &str = "AI stream failed";

/// Builds the streaming response for a started generation.
pub fn stream_response(fragments: FragmentStream) -> Response {
    let frames = fragments.scan(false, |finished, item| {
        if *finished {
            return future::ready(None);
        }

        let frame = match item {
            Ok(fragment) => Frame::Chunk(fragment.payload),
            Err(err) => {
                tracing::error!("Error during AI stream: {err}");
                *finished = true;
                Frame::Error(STREAM_FAILED_MESSAGE.to_string())
            }
        };

        future::ready(Some(Ok::<_, Infallible>(Bytes::from(encode_frame(&frame)))))
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

/// Response for a generation that failed before producing any fragment:
/// HTTP 500 whose body is the single terminal error frame.
pub fn stream_failure_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Body::from(encode_frame(&Frame::Error(STREAM_FAILED_MESSAGE.to_string()))),
    )
        .into_response()
}
