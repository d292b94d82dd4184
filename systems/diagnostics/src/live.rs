use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// Interval between live frames; four refreshes per second.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

const CANCEL_POLL_SLICE: Duration = Duration::from_millis(20);

/// Shared flag used to stop a [`LiveFrames`] stream from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lazily rendered, cancellable stream of live display frames.
///
/// The first frame is produced immediately; subsequent frames wait for the
/// refresh interval. The stream ends once its token is cancelled or its
/// frame limit is exhausted, and [`LiveFrames::restart`] rearms it.
#[derive(Debug)]
pub struct LiveFrames<F> {
    render: F,
    interval: Duration,
    limit: Option<usize>,
    remaining: Option<usize>,
    cancel: CancelToken,
    last_frame: Option<Instant>,
}

impl<F> LiveFrames<F>
where
    F: FnMut() -> String,
{
    /// Creates an unlimited stream producing frames with `render`.
    #[must_use]
    pub fn new(render: F, interval: Duration) -> Self {
        Self {
            render,
            interval,
            limit: None,
            remaining: None,
            cancel: CancelToken::new(),
            last_frame: None,
        }
    }

    /// Stops the stream after `limit` frames.
    #[must_use]
    pub fn with_frame_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self.remaining = limit;
        self
    }

    /// Uses `cancel` to stop the stream.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops this stream when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Rearms the stream with a fresh token and the configured frame limit.
    pub fn restart(&mut self, cancel: CancelToken) {
        self.cancel = cancel;
        self.remaining = self.limit;
        self.last_frame = None;
    }

    fn wait_for_next_frame(&self) -> bool {
        let Some(last_frame) = self.last_frame else {
            return !self.cancel.is_cancelled();
        };

        let deadline = last_frame + self.interval;
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(CANCEL_POLL_SLICE));
        }
    }
}

impl<F> Iterator for LiveFrames<F>
where
    F: FnMut() -> String,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == Some(0) || !self.wait_for_next_frame() {
            return None;
        }

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        self.last_frame = Some(Instant::now());
        Some((self.render)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> impl FnMut() -> String {
        let mut frame = 0;
        move || {
            frame += 1;
            format!("frame {frame}")
        }
    }

    #[test]
    fn frame_limit_bounds_the_stream() {
        let frames: Vec<String> = LiveFrames::new(counter(), Duration::ZERO)
            .with_frame_limit(Some(3))
            .collect();

        assert_eq!(frames, vec!["frame 1", "frame 2", "frame 3"]);
    }

    #[test]
    fn cancelled_stream_stops_producing_frames() {
        let mut frames = LiveFrames::new(counter(), Duration::ZERO);
        let cancel = frames.cancel_token();

        assert_eq!(frames.next().as_deref(), Some("frame 1"));
        cancel.cancel();
        assert_eq!(frames.next(), None);
    }

    #[test]
    fn cancellation_interrupts_a_pending_wait() {
        let cancel = CancelToken::new();
        let mut frames =
            LiveFrames::new(counter(), Duration::from_secs(60)).with_cancel(cancel.clone());
        assert!(frames.next().is_some());

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        });
        let started = Instant::now();

        assert_eq!(frames.next(), None);
        assert!(started.elapsed() < Duration::from_secs(5));
        canceller.join().expect("canceller thread finishes");
    }

    #[test]
    fn restart_rearms_a_finished_stream() {
        let mut frames = LiveFrames::new(counter(), Duration::ZERO).with_frame_limit(Some(1));
        assert_eq!(frames.by_ref().count(), 1);

        frames.restart(CancelToken::new());

        assert_eq!(frames.next().as_deref(), Some("frame 2"));
        assert_eq!(frames.next(), None);
    }
}
