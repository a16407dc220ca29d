//! Per-device coalescing of session updates

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::types::SessionUpdate;

/// Extension trait to coalesce a stream of session updates
pub trait CoalesceExt: Stream<Item = SessionUpdate> {
    /// Emit at most one batch per interval, holding only the latest update
    /// for each device.
    ///
    /// Useful for UIs that would otherwise redraw on every battery notification.
    fn coalesce(self, period: Duration) -> Coalesce<Self>
    where
        Self: Sized,
    {
        Coalesce::new(self, period)
    }
}

impl<T: Stream<Item = SessionUpdate>> CoalesceExt for T {}

pin_project! {
    /// A stream combinator keeping the latest update per device
    pub struct Coalesce<S> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Vec<SessionUpdate>,
        ready: VecDeque<SessionUpdate>,
        exhausted: bool,
    }
}

/// Shortest batching period; tokio intervals cannot tick at zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

impl<S: Stream<Item = SessionUpdate>> Coalesce<S> {
    /// A zero `period` is raised to one millisecond.
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period.max(MIN_PERIOD));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: Vec::new(), ready: VecDeque::new(), exhausted: false }
    }
}

impl<S: Stream<Item = SessionUpdate>> Stream for Coalesce<S> {
    type Item = SessionUpdate;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(update)) => {
                    match this.pending.iter_mut().find(|p| p.device_id() == update.device_id()) {
                        Some(slot) => *slot = update,
                        None => this.pending.push(update),
                    }
                }
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if let Some(update) = this.ready.pop_front() {
            return Poll::Ready(Some(update));
        }
        if this.pending.is_empty() {
            return if *this.exhausted { Poll::Ready(None) } else { Poll::Pending };
        }

        // Flush what is left without waiting once the source has ended.
        if !*this.exhausted {
            ready!(this.interval.poll_tick(cx));
        }
        this.ready.extend(this.pending.drain(..));
        Poll::Ready(this.ready.pop_front())
    }
}
