//! Search stream adapter.
//!
//! Converts a raw byte stream (normally `reqwest`'s `bytes_stream()`) into
//! decoded `StreamEvent`s. Decode errors are yielded inline and the stream keeps
//! going; a transport error is yielded once and ends the stream.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::warn;

use crate::decoder::EventFrameDecoder;
use crate::error::{DecodeError, SearchError, TransportError};
use crate::types::StreamEvent;

/// Stream of decoded search events.
pub struct SearchEventStream {
    inner: BoxStream<'static, Result<Bytes, String>>,
    decoder: EventFrameDecoder,
    ready: VecDeque<Result<StreamEvent, DecodeError>>,
    finished: bool,
}

impl SearchEventStream {
    pub fn new<S, E>(byte_stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display,
    {
        Self {
            inner: byte_stream.map(|chunk| chunk.map_err(|e| e.to_string())).boxed(),
            decoder: EventFrameDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }
}

impl Stream for SearchEventStream {
    type Item = Result<StreamEvent, SearchError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            // Drain records decoded from earlier chunks first
            if let Some(item) = this.ready.pop_front() {
                return Poll::Ready(Some(item.map_err(SearchError::from)));
            }

            if this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.ready.extend(this.decoder.push(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    warn!(error = %e, "Search stream transport failed");
                    return Poll::Ready(Some(Err(TransportError::Network(e).into())));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    if let Some(truncated) = this.decoder.finish() {
                        return Poll::Ready(Some(Err(truncated.into())));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn byte_chunks(chunks: &[&str]) -> Vec<Result<Bytes, Infallible>> {
        chunks
            .iter()
            .map(|chunk| Ok(Bytes::from(chunk.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn test_record_split_across_chunks() {
        let data = byte_chunks(&[
            "data: {\"type\":\"start\",\"to",
            "tal\":1,\"keyword\":\"k\"}\n",
            "\ndata: {\"type\":\"searching\",\"source\":\"A\"}\n\n",
        ]);

        let mut stream = SearchEventStream::new(futures::stream::iter(data));

        let start = stream.next().await.unwrap().unwrap();
        assert_eq!(
            start,
            StreamEvent::Start {
                total_sources: 1,
                keyword: "k".into()
            }
        );
        let searching = stream.next().await.unwrap().unwrap();
        assert_eq!(searching.kind(), "searching");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_decode_error_does_not_end_stream() {
        let data = byte_chunks(&[
            "data: {\"type\":\"bogus\"}\n\n",
            "data: {\"type\":\"error\",\"message\":\"m\"}\n\n",
        ]);

        let items: Vec<_> = SearchEventStream::new(futures::stream::iter(data))
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[0],
            Err(SearchError::Decode(DecodeError::UnknownType { .. }))
        ));
        assert!(items[1].is_ok());
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let data: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"searching\",\"source\":\"A\"}\n\n")),
            Err("connection reset by peer".to_string()),
            Ok(Bytes::from_static(b"data: {\"type\":\"searching\",\"source\":\"B\"}\n\n")),
        ];

        let items: Vec<_> = SearchEventStream::new(futures::stream::iter(data))
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[1],
            Err(SearchError::Transport(TransportError::Network(
                "connection reset by peer".into()
            )))
        );
    }

    #[test]
    fn test_truncated_stream_reported_last() {
        let data = byte_chunks(&[
            "data: {\"type\":\"searching\",\"source\":\"A\"}\n\n",
            "data: {\"type\":\"searching\"",
        ]);

        let items: Vec<_> = tokio_test::block_on(
            SearchEventStream::new(futures::stream::iter(data)).collect::<Vec<_>>(),
        );

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            &items[1],
            Err(SearchError::Decode(e)) if e.is_truncated()
        ));
    }
}
