//! Countdown plumbing for veto cooldowns and transit displays, plus the
//! `MM:SS` time formatting shared by every remaining-time surface.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

/// Tick period used for live countdown displays.
pub const TICK_PERIOD: Duration = Duration::from_millis(500);

/// Remaining time below which a countdown is considered elapsed.
///
/// The display has whole-second granularity, so anything inside the final
/// second reads as zero; firing there keeps the callback and the rendered
/// `00:00` in step.
const FIRE_THRESHOLD_MS: i64 = 1_000;

/// A deadline countdown that reports remaining time on a fixed tick and
/// invokes a completion callback at most once.
///
/// Dropping (or cancelling) the countdown stops the tick task; a cancelled
/// countdown never fires its callback.
#[derive(Debug)]
pub struct Countdown {
    remaining_rx: watch::Receiver<i64>,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Arm a countdown toward `deadline` with the default tick period.
    pub fn arm<F>(deadline: OffsetDateTime, on_elapsed: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::arm_with_tick(deadline, TICK_PERIOD, on_elapsed)
    }

    /// Arm a countdown toward `deadline`, ticking every `tick`.
    pub fn arm_with_tick<F>(deadline: OffsetDateTime, tick: Duration, on_elapsed: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, remaining_rx) = watch::channel(remaining_ms(deadline));

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately; skip it so a deadline one
            // tick away still gets a full interval before being checked
            interval.tick().await;

            let mut on_elapsed = Some(on_elapsed);
            loop {
                interval.tick().await;
                let ms = remaining_ms(deadline);
                if tx.send(ms).is_err() {
                    break;
                }
                if ms < FIRE_THRESHOLD_MS {
                    if let Some(callback) = on_elapsed.take() {
                        callback();
                    }
                    break;
                }
            }
        });

        Self { remaining_rx, task }
    }

    /// Milliseconds remaining at the last tick (may be negative past the deadline).
    pub fn remaining_ms(&self) -> i64 {
        *self.remaining_rx.borrow()
    }

    /// Remaining time rendered as `MM:SS`, floored to whole seconds.
    pub fn remaining_display(&self) -> String {
        format_time((self.remaining_ms().max(0) / 1_000) as f64, 2)
    }

    /// Stop ticking without firing the callback.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Holder for at most one armed [`Countdown`]; re-arming clears the previous
/// one first so no stale tick task outlives its deadline.
#[derive(Debug, Default)]
pub struct CountdownSlot {
    current: Option<Countdown>,
}

impl CountdownSlot {
    /// Replace any armed countdown with a fresh one toward `deadline`.
    pub fn rearm<F>(&mut self, deadline: OffsetDateTime, on_elapsed: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.clear();
        self.current = Some(Countdown::arm(deadline, on_elapsed));
    }

    /// Cancel and drop the armed countdown, if any.
    pub fn clear(&mut self) {
        if let Some(countdown) = self.current.take() {
            countdown.cancel();
        }
    }

    /// Milliseconds remaining on the armed countdown, if any.
    pub fn remaining_ms(&self) -> Option<i64> {
        self.current.as_ref().map(Countdown::remaining_ms)
    }
}

fn remaining_ms(deadline: OffsetDateTime) -> i64 {
    let remaining = deadline - OffsetDateTime::now_utc();
    remaining.whole_milliseconds() as i64
}

/// Render a duration in seconds as `MM:SS[.fraction]`.
///
/// Minutes and whole seconds are zero-padded to two digits. The fractional
/// part is rendered to at most `precision` digits and omitted entirely when
/// it is empty.
pub fn format_time(seconds: f64, precision: usize) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let minutes = (total / 60.0).floor();
    let remainder = total - minutes * 60.0;
    let whole = remainder.floor();

    let mut out = format!("{:02}:{:02}", minutes as u64, whole as u64);

    if precision > 0 {
        let fraction = format!("{:.*}", precision, remainder - whole);
        let digits = fraction
            .split('.')
            .nth(1)
            .unwrap_or("")
            .trim_end_matches('0');
        if !digits.is_empty() {
            out.push('.');
            out.push_str(digits);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::time::sleep;

    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(125.0, 2), "02:05");
        assert_eq!(format_time(0.0, 2), "00:00");
        assert_eq!(format_time(600.0, 2), "10:00");
    }

    #[test]
    fn formats_fractional_seconds() {
        assert_eq!(format_time(90.5, 2), "01:30.5");
        assert_eq!(format_time(90.25, 1), "01:30.3");
    }

    #[test]
    fn zero_precision_drops_the_fraction() {
        assert_eq!(format_time(90.5, 0), "01:30");
    }

    #[test]
    fn negative_and_non_finite_read_as_zero() {
        assert_eq!(format_time(-3.0, 2), "00:00");
        assert_eq!(format_time(f64::NAN, 2), "00:00");
    }

    #[tokio::test]
    async fn countdown_fires_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let deadline = OffsetDateTime::now_utc() + time::Duration::milliseconds(1_000);
        let countdown = Countdown::arm_with_tick(deadline, Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sleep(Duration::from_millis(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // well past the deadline the count must not grow
        sleep(Duration::from_millis(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        drop(countdown);
    }

    #[tokio::test]
    async fn cancelled_countdown_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let deadline = OffsetDateTime::now_utc() + time::Duration::milliseconds(100);
        let countdown = Countdown::arm_with_tick(deadline, Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        countdown.cancel();

        sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rearming_clears_the_previous_countdown() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut slot = CountdownSlot::default();
        {
            let counter = first.clone();
            slot.rearm(
                OffsetDateTime::now_utc() + time::Duration::milliseconds(150),
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            );
        }
        {
            let counter = second.clone();
            slot.rearm(
                OffsetDateTime::now_utc() + time::Duration::seconds(60),
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            );
        }

        sleep(Duration::from_millis(400)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert!(slot.remaining_ms().is_some());
    }
}
