//! Countdown controller
//!
//! Validates the operator's duration, turns it into a tick sequence and arms
//! one render callback per tick. Each run lives in its own [`CountdownSession`],
//! which is cancelled and discarded on reset.

use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;

use crate::config::{Config, Hooks};
use crate::duration::parse_duration;
use crate::error::{ConfigError, CountdownError};
use crate::hooks::execute_hook;
use crate::render::{Frame, Render};
use crate::ticks::{TickDescriptor, TickSequenceGenerator};
use crate::timer::{Scheduler, TimerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Setup,
    Running,
}

/// A tick together with the delay after start at which its callback is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedTick {
    #[serde(flatten)]
    pub tick: TickDescriptor,
    pub delay_ms: u64,
}

/// Delay from countdown start until `tick` should begin its transition.
///
/// The transition lead is subtracted so the animation completes on the tick's
/// nominal instant. The start tick has no room for a lead and fires at once.
pub fn tick_delay(
    total_secs: u64,
    tick: &TickDescriptor,
    lead: Duration,
) -> Result<Duration, CountdownError> {
    let elapsed = total_secs
        .checked_sub(tick.time)
        .ok_or(CountdownError::InvalidDelay {
            tick_secs: tick.time,
            total_secs,
        })?;
    Ok(Duration::from_secs(elapsed).saturating_sub(lead))
}

/// Ticks and their delays for a countdown of `total_secs`, in firing order.
pub fn plan(
    generator: &TickSequenceGenerator,
    total_secs: u64,
    lead: Duration,
) -> Result<Vec<PlannedTick>, CountdownError> {
    generator
        .generate(total_secs)?
        .into_iter()
        .map(|tick| {
            let delay = tick_delay(total_secs, &tick, lead)?;
            let delay_ms = u64::try_from(delay.as_millis()).map_err(|_| {
                CountdownError::invalid_duration(total_secs.to_string(), "duration is too large")
            })?;
            Ok::<_, CountdownError>(PlannedTick { tick, delay_ms })
        })
        .collect()
}

/// State owned by one countdown run.
pub struct CountdownSession<S: Scheduler> {
    total_secs: u64,
    registry: TimerRegistry<S>,
    last_frame: Rc<RefCell<Option<Frame>>>,
    done: Rc<Notify>,
}

impl<S: Scheduler> CountdownSession<S> {
    fn new(total_secs: u64, scheduler: S) -> Self {
        Self {
            total_secs,
            registry: TimerRegistry::new(scheduler),
            last_frame: Rc::new(RefCell::new(None)),
            done: Rc::new(Notify::new()),
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    /// Ticks armed but not yet rendered.
    pub fn pending(&self) -> usize {
        self.registry.live_count()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.last_frame.borrow().clone()
    }
}

impl<S: Scheduler> Drop for CountdownSession<S> {
    fn drop(&mut self) {
        self.registry.cancel_all();
    }
}

pub struct Countdown<S: Scheduler, R: Render> {
    generator: TickSequenceGenerator,
    lead: Duration,
    scheduler: S,
    renderer: Rc<RefCell<R>>,
    hooks: Option<Hooks>,
    session: Option<CountdownSession<S>>,
}

impl<S, R> Countdown<S, R>
where
    S: Scheduler + Clone,
    S::Token: 'static,
    R: Render + 'static,
{
    pub fn new(generator: TickSequenceGenerator, lead: Duration, scheduler: S, renderer: R) -> Self {
        Self {
            generator,
            lead,
            scheduler,
            renderer: Rc::new(RefCell::new(renderer)),
            hooks: None,
            session: None,
        }
    }

    pub fn from_config(config: &Config, scheduler: S, renderer: R) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.generator()?,
            Duration::from_millis(config.anim_duration_ms),
            scheduler,
            renderer,
        ))
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn state(&self) -> State {
        match self.session {
            Some(_) => State::Running,
            None => State::Setup,
        }
    }

    pub fn session(&self) -> Option<&CountdownSession<S>> {
        self.session.as_ref()
    }

    pub fn renderer(&self) -> Ref<'_, R> {
        self.renderer.borrow()
    }

    /// Signalled once the final tick of the running countdown has rendered.
    pub fn completion(&self) -> Option<Rc<Notify>> {
        self.session.as_ref().map(|s| Rc::clone(&s.done))
    }

    /// Start a countdown for the operator's `input`.
    ///
    /// Nothing is armed unless the input is a positive duration and no
    /// countdown is already running.
    pub fn start(&mut self, input: &str) -> Result<&CountdownSession<S>, CountdownError> {
        if self.session.is_some() {
            return Err(CountdownError::AlreadyRunning);
        }

        let total_secs = parse_duration(input)?;
        let ticks = plan(&self.generator, total_secs, self.lead)?;

        let session = CountdownSession::new(total_secs, self.scheduler.clone());
        for planned in &ticks {
            self.arm_tick(&session, planned);
        }

        tracing::info!(total_secs, ticks = ticks.len(), "countdown started");
        if let Some(hooks) = &self.hooks {
            execute_hook("start", hooks.start.as_deref());
        }

        Ok(self.session.insert(session))
    }

    fn arm_tick(&self, session: &CountdownSession<S>, planned: &PlannedTick) {
        let tick = planned.tick;
        let total_secs = session.total_secs;
        let transition = self.lead;
        let renderer = Rc::clone(&self.renderer);
        let last_frame = Rc::clone(&session.last_frame);
        let finish = (tick.time == 0).then(|| {
            let hook = self.hooks.as_ref().and_then(|h| h.finish.clone());
            (Rc::clone(&session.done), hook, self.hooks.is_some())
        });

        session
            .registry
            .arm(Duration::from_millis(planned.delay_ms), move || {
                let frame = Frame::new(tick, total_secs, transition);
                renderer
                    .borrow_mut()
                    .render(last_frame.borrow().as_ref(), &frame);
                *last_frame.borrow_mut() = Some(frame);

                if let Some((done, hook, run_hooks)) = finish {
                    tracing::info!(total_secs, "countdown finished");
                    if run_hooks {
                        execute_hook("finish", hook.as_deref());
                    }
                    done.notify_one();
                }
            });
    }

    /// Cancel the running countdown. Returns false when nothing was running.
    pub fn reset(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                let pending = session.pending();
                session.registry.cancel_all();
                tracing::info!(total_secs = session.total_secs, pending, "countdown reset");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Color;
    use crate::ticks::Units;
    use crate::timer::LocalScheduler;
    use tokio::task::LocalSet;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
        previous: Vec<Option<u64>>,
    }

    impl Render for Recorder {
        fn render(&mut self, previous: Option<&Frame>, frame: &Frame) {
            self.previous.push(previous.map(|f| f.tick.time));
            self.frames.push(frame.clone());
        }
    }

    fn countdown() -> Countdown<LocalScheduler, Recorder> {
        Countdown::new(
            TickSequenceGenerator::default(),
            Duration::from_millis(500),
            LocalScheduler,
            Recorder::default(),
        )
    }

    fn rendered_times(countdown: &Countdown<LocalScheduler, Recorder>) -> Vec<u64> {
        countdown
            .renderer()
            .frames
            .iter()
            .map(|f| f.tick.time)
            .collect()
    }

    #[test]
    fn test_delays_are_non_decreasing() {
        let generator = TickSequenceGenerator::default();
        let lead = Duration::from_millis(500);
        for total in 1..=3600 {
            let planned = plan(&generator, total, lead).unwrap();
            assert_eq!(planned[0].delay_ms, 0, "total {total}");
            assert!(
                planned.windows(2).all(|w| w[0].delay_ms <= w[1].delay_ms),
                "delays out of order for {total}"
            );
            assert_eq!(
                planned.last().unwrap().delay_ms,
                total * 1000 - 500,
                "total {total}"
            );
        }
    }

    #[test]
    fn test_delays_past_millisecond_range_are_rejected() {
        let generator = TickSequenceGenerator::default();
        let lead = Duration::from_millis(500);

        let largest = u64::MAX / 1000;
        let planned = plan(&generator, largest, lead).unwrap();
        assert!(planned.windows(2).all(|w| w[0].delay_ms <= w[1].delay_ms));
        assert_eq!(planned.last().unwrap().delay_ms, largest * 1000 - 500);

        assert!(matches!(
            plan(&generator, largest + 1000, lead),
            Err(CountdownError::InvalidDuration { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_duration_arms_nothing() {
        LocalSet::new()
            .run_until(async {
                let mut countdown = countdown();
                let input = (u64::MAX / 1000 + 1000).to_string();
                assert!(matches!(
                    countdown.start(&input),
                    Err(CountdownError::InvalidDuration { .. })
                ));
                assert_eq!(countdown.state(), State::Setup);
            })
            .await;
    }

    #[test]
    fn test_tick_outside_countdown_is_invalid_delay() {
        let tick = TickDescriptor {
            time: 120,
            label: 2,
            units: Units::Minutes,
        };
        assert_eq!(
            tick_delay(100, &tick, Duration::ZERO),
            Err(CountdownError::InvalidDelay {
                tick_secs: 120,
                total_secs: 100
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_renders_every_tick_in_order() {
        LocalSet::new()
            .run_until(async {
                let mut countdown = countdown();
                let expected: Vec<u64> = TickSequenceGenerator::default()
                    .generate(100)
                    .unwrap()
                    .iter()
                    .map(|t| t.time)
                    .collect();

                let session = countdown.start("100").unwrap();
                assert_eq!(session.total_secs(), 100);
                assert_eq!(session.pending(), expected.len());
                assert_eq!(countdown.state(), State::Running);

                // Start tick fires immediately, the 90s tick 500ms before its instant
                tokio::time::sleep(Duration::from_millis(1)).await;
                assert_eq!(rendered_times(&countdown), vec![100]);
                tokio::time::sleep(Duration::from_millis(9_400)).await;
                assert_eq!(rendered_times(&countdown), vec![100]);
                tokio::time::sleep(Duration::from_millis(200)).await;
                assert_eq!(rendered_times(&countdown), vec![100, 90]);

                tokio::time::sleep(Duration::from_secs(120)).await;
                assert_eq!(rendered_times(&countdown), expected);

                let renderer = countdown.renderer();
                assert_eq!(renderer.previous[0], None);
                assert_eq!(renderer.previous[1], Some(100));
                let first = &renderer.frames[0];
                assert_eq!(first.color, Color::Blue);
                assert!((first.angle - std::f64::consts::TAU).abs() < 1e-9);
                let last = renderer.frames.last().unwrap();
                assert_eq!(last.color, Color::Red);
                assert_eq!(last.angle, 0.0);
                assert_eq!(last.transition, Duration::from_millis(500));
                drop(renderer);

                // Finishing does not leave Running on its own
                assert_eq!(countdown.state(), State::Running);
                assert_eq!(countdown.session().unwrap().pending(), 0);
                assert_eq!(
                    countdown.session().unwrap().last_frame().map(|f| f.tick.time),
                    Some(0)
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_signalled_after_final_tick() {
        LocalSet::new()
            .run_until(async {
                let mut countdown = countdown();
                assert!(countdown.completion().is_none());

                countdown.start("7s").unwrap();
                let done = countdown.completion().unwrap();

                let finished =
                    tokio::time::timeout(Duration::from_secs(6), done.notified()).await;
                assert!(finished.is_err(), "finished too early");

                let finished =
                    tokio::time::timeout(Duration::from_secs(2), done.notified()).await;
                assert!(finished.is_ok());
                assert_eq!(rendered_times(&countdown), vec![7, 5, 4, 3, 2, 1, 0]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_arms_nothing() {
        LocalSet::new()
            .run_until(async {
                let mut countdown = countdown();
                for input in ["abc", "0", "-3", ""] {
                    assert!(matches!(
                        countdown.start(input),
                        Err(CountdownError::InvalidDuration { .. })
                    ));
                    assert_eq!(countdown.state(), State::Setup);
                }

                tokio::time::sleep(Duration::from_secs(60)).await;
                assert!(countdown.renderer().frames.is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_rejected() {
        LocalSet::new()
            .run_until(async {
                let mut countdown = countdown();
                countdown.start("30").unwrap();
                assert_eq!(
                    countdown.start("60").err(),
                    Some(CountdownError::AlreadyRunning)
                );
                assert_eq!(countdown.session().unwrap().total_secs(), 30);
                countdown.reset();
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stops_rendering() {
        LocalSet::new()
            .run_until(async {
                let mut countdown = countdown();
                assert!(!countdown.reset());

                countdown.start("1m").unwrap();
                tokio::time::sleep(Duration::from_secs(20)).await;
                let before = rendered_times(&countdown);
                assert_eq!(before, vec![60, 45]);

                assert!(countdown.reset());
                assert_eq!(countdown.state(), State::Setup);
                assert!(countdown.completion().is_none());

                tokio::time::sleep(Duration::from_secs(120)).await;
                assert_eq!(rendered_times(&countdown), before);

                // A fresh run starts from an empty frame history
                countdown.start("3").unwrap();
                tokio::time::sleep(Duration::from_secs(5)).await;
                let renderer = countdown.renderer();
                assert_eq!(renderer.frames.len(), 6);
                assert_eq!(renderer.previous[2], None);
            })
            .await;
    }
}
