//! Whole-transfer deadlines.
//!
//! A [`Deadline`] is fixed once, when the request head has been read, and
//! every later wait on the same exchange is measured against it. Wrapping a
//! body with [`Deadline::wrap`] fails the body as soon as the instant passes,
//! however steadily its frames were arriving.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::BoxError;
use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};
use thiserror::Error;
use tokio::time::{Instant, Sleep};

/// Raised by a body whose deadline passed before it finished.
#[derive(Debug, Error)]
#[error("transfer not finished within {}s", .0.as_secs())]
pub struct DeadlineElapsed(pub Duration);

/// Point in time by which a transfer must complete.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    budget: Duration,
}

impl Deadline {
    /// `budget` after `start`. A zero budget never expires.
    pub fn after(start: Instant, budget: Duration) -> Self {
        Self {
            at: (!budget.is_zero()).then(|| start + budget),
            budget,
        }
    }

    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn wrap<B>(self, body: B) -> Body
    where
        B: HttpBody<Data = Bytes> + Send + Unpin + 'static,
        B::Error: Into<BoxError>,
    {
        match self.at {
            None => Body::new(body),
            Some(at) => Body::new(DeadlineBody {
                inner: body,
                sleep: Box::pin(tokio::time::sleep_until(at)),
                budget: self.budget,
            }),
        }
    }
}

/// Body that errors once its deadline passes.
pub struct DeadlineBody<B> {
    inner: B,
    sleep: Pin<Box<Sleep>>,
    budget: Duration,
}

impl<B> HttpBody for DeadlineBody<B>
where
    B: HttpBody + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = B::Data;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        if this.sleep.as_mut().poll(cx).is_ready() {
            let err: BoxError = Box::new(DeadlineElapsed(this.budget));
            return Poll::Ready(Some(Err(err)));
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(frame) => Poll::Ready(frame.map(|result| result.map_err(Into::into))),
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    /// A body that never produces a frame.
    struct Stalled;

    impl HttpBody for Stalled {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            Poll::Pending
        }
    }

    #[tokio::test]
    async fn zero_budget_never_expires() {
        let deadline = Deadline::after(Instant::now(), Duration::ZERO);
        assert!(deadline.instant().is_none());

        let body = deadline.wrap(Body::from("abc"));
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }

    #[tokio::test]
    async fn body_finishing_in_time_is_untouched() {
        let body = Deadline::after(Instant::now(), Duration::from_secs(5)).wrap(Body::from("abc"));
        assert_eq!(body.size_hint().exact(), Some(3));

        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }

    #[tokio::test]
    async fn stalled_body_fails_at_the_deadline() {
        let started = Instant::now();
        let body = Deadline::after(started, Duration::from_millis(100)).wrap(Stalled);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            axum::body::to_bytes(body, usize::MAX),
        )
        .await
        .expect("deadline did not fire");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("not finished within"));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn passed_deadline_fails_even_a_ready_body() {
        let deadline = Deadline::after(Instant::now(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;

        let body = deadline.wrap(Body::from("abc"));
        assert!(axum::body::to_bytes(body, usize::MAX).await.is_err());
    }
}
