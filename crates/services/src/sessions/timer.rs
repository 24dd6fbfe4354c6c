use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;

use crate::sessions::service::ExamSessionService;

/// One-shot countdown notifications. Informational only; they never mutate
/// state and each fires at most once per session, regardless of how often the
/// remaining time is re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAlert {
    TenMinutes,
    FiveMinutes,
    OneMinute,
    NearZero,
    /// The countdown reached zero; the session froze and submission should
    /// take over.
    Expired,
}

const TEN_MINUTES_SECS: u32 = 600;
const FIVE_MINUTES_SECS: u32 = 300;
const ONE_MINUTE_SECS: u32 = 60;
const NEAR_ZERO_SECS: u32 = 10;

/// Result of a single timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Paused or already expired; nothing happened.
    Skipped,
    Ticked { alert: Option<TimeAlert> },
    /// This tick brought the countdown to zero. Terminal.
    Expired,
}

/// Drives one `DecrementTime` per second and tracks threshold crossings.
///
/// The tick logic is synchronous and clock-free so it can be tested without a
/// runtime; [`ExamTimer::run`] is the async driver that owns the cadence.
#[derive(Debug, Default)]
pub struct ExamTimer {
    fired_ten: bool,
    fired_five: bool,
    fired_one: bool,
    fired_near_zero: bool,
}

impl ExamTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one tick to the session. Suspended (no decrement) while paused
    /// or once the countdown is at zero.
    pub fn tick(&mut self, session: &mut ExamSessionService) -> TickOutcome {
        if session.is_paused() || session.is_time_up() {
            return TickOutcome::Skipped;
        }

        session.decrement_time();
        let remaining = session.remaining_secs();

        if remaining == 0 {
            return TickOutcome::Expired;
        }

        let alert = self.threshold_alert(remaining);
        TickOutcome::Ticked { alert }
    }

    /// Marks every band the countdown now sits inside and reports only the
    /// tightest newly-crossed one, so a session resumed at 70s emits a single
    /// one-minute alert instead of replaying the stale ten/five-minute ones.
    fn threshold_alert(&mut self, remaining: u32) -> Option<TimeAlert> {
        let mut newly_crossed = None;
        if remaining <= TEN_MINUTES_SECS && !self.fired_ten {
            self.fired_ten = true;
            newly_crossed = Some(TimeAlert::TenMinutes);
        }
        if remaining <= FIVE_MINUTES_SECS && !self.fired_five {
            self.fired_five = true;
            newly_crossed = Some(TimeAlert::FiveMinutes);
        }
        if remaining <= ONE_MINUTE_SECS && !self.fired_one {
            self.fired_one = true;
            newly_crossed = Some(TimeAlert::OneMinute);
        }
        if remaining <= NEAR_ZERO_SECS && !self.fired_near_zero {
            self.fired_near_zero = true;
            newly_crossed = Some(TimeAlert::NearZero);
        }
        newly_crossed
    }

    /// Async driver: one tick per second against the shared session, alerts
    /// forwarded on the channel. Returns when the countdown expires; the
    /// caller owns start/stop via the task handle.
    pub async fn run(
        mut self,
        session: Arc<Mutex<ExamSessionService>>,
        alerts: mpsc::Sender<TimeAlert>,
    ) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately; consume it
        // so the countdown starts a full second after spawn.
        interval.tick().await;

        loop {
            interval.tick().await;
            let outcome = {
                let mut session = session.lock().await;
                self.tick(&mut session)
            };
            match outcome {
                TickOutcome::Ticked { alert: Some(alert) } => {
                    let _ = alerts.send(alert).await;
                }
                TickOutcome::Expired => {
                    tracing::info!("exam countdown expired");
                    let _ = alerts.send(TimeAlert::Expired).await;
                    return;
                }
                TickOutcome::Ticked { alert: None } | TickOutcome::Skipped => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::testing::resumed_exam;
    use exam_core::time::fixed_clock;

    fn session_with_remaining(remaining: u32) -> ExamSessionService {
        let mut payload = resumed_exam(3, 3600);
        payload.session.remaining_time = remaining;
        ExamSessionService::resume(payload, fixed_clock()).unwrap()
    }

    #[test]
    fn tick_decrements_once() {
        let mut session = session_with_remaining(100);
        let mut timer = ExamTimer::new();
        assert_eq!(timer.tick(&mut session), TickOutcome::Ticked { alert: None });
        assert_eq!(session.remaining_secs(), 99);
    }

    #[test]
    fn tick_is_suspended_while_paused() {
        let mut session = session_with_remaining(100);
        session.toggle_pause();
        let mut timer = ExamTimer::new();
        assert_eq!(timer.tick(&mut session), TickOutcome::Skipped);
        assert_eq!(session.remaining_secs(), 100);
    }

    #[test]
    fn thresholds_fire_exactly_once() {
        let mut session = session_with_remaining(601);
        let mut timer = ExamTimer::new();

        assert_eq!(
            timer.tick(&mut session),
            TickOutcome::Ticked {
                alert: Some(TimeAlert::TenMinutes)
            }
        );
        // Next second is still inside the ten-minute band but must not re-fire.
        assert_eq!(timer.tick(&mut session), TickOutcome::Ticked { alert: None });
    }

    #[test]
    fn skipped_band_still_fires_the_tightest_threshold() {
        // Resuming with about a minute left: the ten- and five-minute marks
        // were crossed before this timer existed; only one-minute is relevant.
        let mut session = session_with_remaining(61);
        let mut timer = ExamTimer::new();
        assert_eq!(
            timer.tick(&mut session),
            TickOutcome::Ticked {
                alert: Some(TimeAlert::OneMinute)
            }
        );
    }

    #[test]
    fn near_zero_fires_before_expiry() {
        let mut session = session_with_remaining(11);
        let mut timer = ExamTimer::new();
        assert_eq!(
            timer.tick(&mut session),
            TickOutcome::Ticked {
                alert: Some(TimeAlert::NearZero)
            }
        );
    }

    #[test]
    fn reaching_zero_is_terminal_and_pauses() {
        let mut session = session_with_remaining(1);
        let mut timer = ExamTimer::new();

        assert_eq!(timer.tick(&mut session), TickOutcome::Expired);
        assert_eq!(session.remaining_secs(), 0);
        assert!(session.state().is_paused);

        // No further ticks once expired.
        assert_eq!(timer.tick(&mut session), TickOutcome::Skipped);
        assert_eq!(session.remaining_secs(), 0);
    }
}
