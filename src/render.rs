//! Fixed-cadence render loop.
//!
//! [`RenderLoop`] is the synchronous core: each [`tick`](RenderLoop::tick)
//! drains the sample buffer, slides the display window forward by the most
//! recent sample and runs beat detection. [`RenderScheduler`] drives it from a
//! tokio interval and publishes a [`RenderFrame`] whenever the window moved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::data::{
    BeatDetector, BeatReading, DisplayWindow, HeartMetrics, SharedSampleBuffer, MAX_DATA_POINTS,
};

/// Time between render ticks.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(33);

/// Everything the display needs after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Display window contents, oldest first.
    pub window: Vec<f64>,
    pub metrics: HeartMetrics,
    /// Heart-rate history, oldest first.
    pub heart_rates: Vec<u32>,
    /// Beats detected since the loop started.
    pub beats: u64,
    /// Number of ticks that advanced the window.
    pub seq: u64,
    /// Label of the interval estimator behind PR/QRS/QT.
    pub estimator: &'static str,
}

impl RenderFrame {
    /// A flat window with unknown metrics, shown while nothing is live.
    pub fn idle(len: usize) -> Self {
        Self {
            window: vec![0.0; len.max(2)],
            metrics: HeartMetrics::default(),
            heart_rates: Vec::new(),
            beats: 0,
            seq: 0,
            estimator: "",
        }
    }

    /// `(index, amplitude)` points for charting.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.window
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect()
    }
}

impl Default for RenderFrame {
    fn default() -> Self {
        Self::idle(MAX_DATA_POINTS)
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Less than one interval since the last executed tick.
    Throttled,
    /// The buffer was empty.
    Idle,
    /// The window moved by one sample. Carries the beat, if one was detected.
    Advanced(Option<BeatReading>),
}

/// Single consumer of a sample buffer.
#[derive(Debug)]
pub struct RenderLoop {
    buffer: SharedSampleBuffer,
    window: DisplayWindow,
    detector: BeatDetector,
    interval: Duration,
    last_tick: Option<Instant>,
    beats: u64,
    seq: u64,
}

impl RenderLoop {
    pub fn new(
        buffer: SharedSampleBuffer,
        window_len: usize,
        detector: BeatDetector,
        interval: Duration,
    ) -> Self {
        Self {
            buffer,
            window: DisplayWindow::new(window_len),
            detector,
            interval,
            last_tick: None,
            beats: 0,
            seq: 0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.interval {
                return TickOutcome::Throttled;
            }
        }
        self.last_tick = Some(now);

        let Some(&latest) = self.buffer.drain_all().last() else {
            return TickOutcome::Idle;
        };

        self.window.push(latest);
        self.seq += 1;

        let reading = self.detector.process(&self.window, now);
        if reading.is_some() {
            self.beats += 1;
        }
        TickOutcome::Advanced(reading)
    }

    pub fn frame(&self) -> RenderFrame {
        RenderFrame {
            window: self.window.to_vec(),
            metrics: self.detector.metrics(),
            heart_rates: self.detector.history().values(),
            beats: self.beats,
            seq: self.seq,
            estimator: self.detector.estimator_label(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn window(&self) -> &DisplayWindow {
        &self.window
    }

    pub fn detector(&self) -> &BeatDetector {
        &self.detector
    }
}

/// Runs a [`RenderLoop`] on a tokio interval.
///
/// Missed ticks are skipped rather than replayed. After [`stop`](Self::stop)
/// returns no further tick executes and no frame is published.
#[derive(Debug)]
pub struct RenderScheduler {
    render: Arc<Mutex<Option<RenderLoop>>>,
    frames: watch::Receiver<Arc<RenderFrame>>,
    task: Option<JoinHandle<()>>,
}

impl RenderScheduler {
    /// Spawn the tick task. Must be called inside a tokio runtime.
    pub fn start(render_loop: RenderLoop) -> Self {
        let interval = render_loop.interval();
        let (tx, rx) = watch::channel(Arc::new(render_loop.frame()));
        let render = Arc::new(Mutex::new(Some(render_loop)));
        let task_render = render.clone();

        debug!(?interval, "Render scheduler started");

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let now = timer.tick().await.into_std();
                let mut guard = task_render.lock();
                let Some(render) = guard.as_mut() else {
                    break;
                };

                if let TickOutcome::Advanced(reading) = render.tick(now) {
                    if let Some(reading) = reading {
                        trace!(bpm = ?reading.instantaneous_bpm, "Beat on tick");
                    }
                    tx.send_replace(Arc::new(render.frame()));
                }
            }
        });

        Self {
            render,
            frames: rx,
            task: Some(task),
        }
    }

    /// Cancel the tick task. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.render.lock().take().is_some() {
            debug!("Render scheduler stopped");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// The most recently published frame.
    pub fn latest(&self) -> Arc<RenderFrame> {
        self.frames.borrow().clone()
    }

    /// A receiver that is signalled whenever a new frame is published.
    pub fn frames(&self) -> watch::Receiver<Arc<RenderFrame>> {
        self.frames.clone()
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MidpointIntervals, BEAT_THRESHOLD, HEART_RATE_HISTORY};

    fn render_loop(buffer: &SharedSampleBuffer) -> RenderLoop {
        let detector =
            BeatDetector::new(BEAT_THRESHOLD, HEART_RATE_HISTORY, Box::new(MidpointIntervals));
        RenderLoop::new(buffer.clone(), MAX_DATA_POINTS, detector, UPDATE_INTERVAL)
    }

    #[test]
    fn test_tick_takes_most_recent_sample() {
        let buffer = SharedSampleBuffer::with_capacity(MAX_DATA_POINTS);
        let mut render = render_loop(&buffer);

        for v in [0.1, 0.2, 0.3] {
            buffer.push(v);
        }
        let outcome = render.tick(Instant::now());

        assert_eq!(outcome, TickOutcome::Advanced(None));
        assert!(buffer.is_empty());
        let frame = render.frame();
        assert_eq!(frame.window.len(), MAX_DATA_POINTS);
        assert_eq!(frame.window.last().copied(), Some(0.3));
        assert_eq!(frame.window[MAX_DATA_POINTS - 2], 0.0);
        assert_eq!(frame.seq, 1);
    }

    #[test]
    fn test_empty_buffer_is_idle() {
        let buffer = SharedSampleBuffer::with_capacity(MAX_DATA_POINTS);
        let mut render = render_loop(&buffer);
        assert_eq!(render.tick(Instant::now()), TickOutcome::Idle);
        assert_eq!(render.frame().seq, 0);
    }

    #[test]
    fn test_throttle() {
        let buffer = SharedSampleBuffer::with_capacity(MAX_DATA_POINTS);
        let mut render = render_loop(&buffer);
        let t0 = Instant::now();

        buffer.push(0.2);
        render.tick(t0);
        buffer.push(0.4);
        assert_eq!(render.tick(t0 + Duration::from_millis(10)), TickOutcome::Throttled);
        assert_eq!(buffer.len(), 1);

        let outcome = render.tick(t0 + UPDATE_INTERVAL);
        assert_eq!(outcome, TickOutcome::Advanced(None));
        assert_eq!(render.window().last(), 0.4);
    }

    #[test]
    fn test_beats_across_ticks() {
        let buffer = SharedSampleBuffer::with_capacity(MAX_DATA_POINTS);
        let mut render = render_loop(&buffer);
        let mut now = Instant::now();

        // Two rising edges 33 ticks apart: 33 * 33ms = 1089ms -> 55 bpm
        let mut readings = Vec::new();
        for i in 0..70 {
            buffer.push(if i % 33 == 1 { 0.9 } else { 0.1 });
            if let TickOutcome::Advanced(Some(reading)) = render.tick(now) {
                readings.push(reading);
            }
            now += UPDATE_INTERVAL;
        }

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].instantaneous_bpm, None);
        assert_eq!(readings[1].instantaneous_bpm, Some(55));
        let frame = render.frame();
        assert_eq!(frame.beats, 3);
        assert_eq!(frame.metrics.heart_rate, Some(55));
        assert_eq!(frame.estimator, "midpoint");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_publishes_and_stops() {
        let buffer = SharedSampleBuffer::with_capacity(MAX_DATA_POINTS);
        let mut scheduler = RenderScheduler::start(render_loop(&buffer));
        let mut frames = scheduler.frames();

        buffer.push(0.2);
        buffer.push(0.7);
        frames.changed().await.unwrap();

        let frame = scheduler.latest();
        assert_eq!(frame.window.len(), MAX_DATA_POINTS);
        assert_eq!(frame.window.last().copied(), Some(0.7));

        scheduler.stop();
        assert!(!scheduler.is_running());
        buffer.push(0.9);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(scheduler.latest().window.last().copied(), Some(0.7));
        assert_eq!(buffer.len(), 1);
    }
}
