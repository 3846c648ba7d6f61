//! Per-room turn timers for Scrawl.
//!
//! A [`TurnScheduler`] owns one slot per [`TimerKind`]. Arming a kind
//! replaces whatever was in its slot, so two live timers of the same kind
//! can never coexist for a room, and cancelling is just emptying the slot.
//!
//! Timers never touch game state themselves. They only report which kind
//! fired; the owner decides whether that still means anything.
//!
//! # Integration
//!
//! The scheduler sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         fired = scheduler.next_fired() => {
//!             /* re-check phase, then act on fired.kind */
//!         }
//!     }
//! }
//! ```
//!
//! With nothing armed, [`TurnScheduler::next_fired`] pends forever and
//! `select!` simply keeps serving the other branches.

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Timer kinds
// ---------------------------------------------------------------------------

/// The kinds of timer a room can have running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Single shot: the drawer ran out of time to pick a word.
    WordSelection,
    /// Periodic: one tick of the drawing countdown.
    Round,
    /// Single shot: the pause between a turn ending and the next one.
    Intermission,
}

impl TimerKind {
    /// All kinds, in tie-break order for timers due at the same instant.
    pub const ALL: [TimerKind; 3] = [
        TimerKind::WordSelection,
        TimerKind::Round,
        TimerKind::Intermission,
    ];

    fn slot(self) -> usize {
        match self {
            Self::WordSelection => 0,
            Self::Round => 1,
            Self::Intermission => 2,
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WordSelection => write!(f, "word-selection"),
            Self::Round => write!(f, "round"),
            Self::Intermission => write!(f, "intermission"),
        }
    }
}

/// Reported by [`TurnScheduler::next_fired`] when a timer goes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    /// Which arming of this kind fired. Increases every time any timer is
    /// armed, so two firings can be told apart in logs.
    pub generation: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Armed {
    deadline: Instant,
    /// `Some` for periodic timers.
    period: Option<Duration>,
    generation: u64,
}

/// Cancellable timers for a single room. One `TurnScheduler` per room actor.
#[derive(Debug, Default)]
pub struct TurnScheduler {
    slots: [Option<Armed>; 3],
    generation: u64,
}

impl TurnScheduler {
    /// Creates a scheduler with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a single-shot timer, cancelling any live timer of the same kind.
    ///
    /// Returns the generation assigned to this arming.
    pub fn arm_once(&mut self, kind: TimerKind, delay: Duration) -> u64 {
        self.arm(kind, delay, None)
    }

    /// Arms a periodic timer that first fires after one `period`,
    /// cancelling any live timer of the same kind.
    ///
    /// A zero period would spin the room actor, so it is raised to 1 ms.
    pub fn arm_periodic(&mut self, kind: TimerKind, period: Duration) -> u64 {
        let period = period.max(Duration::from_millis(1));
        self.arm(kind, period, Some(period))
    }

    fn arm(
        &mut self,
        kind: TimerKind,
        delay: Duration,
        period: Option<Duration>,
    ) -> u64 {
        self.generation += 1;
        let replaced = self.slots[kind.slot()]
            .replace(Armed {
                deadline: Instant::now() + delay,
                period,
                generation: self.generation,
            })
            .is_some();
        debug!(
            %kind,
            generation = self.generation,
            delay_ms = delay.as_millis() as u64,
            periodic = period.is_some(),
            replaced,
            "timer armed"
        );
        self.generation
    }

    /// Cancels the live timer of `kind`. Returns `true` if one was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let cancelled = self.slots[kind.slot()].take().is_some();
        if cancelled {
            debug!(%kind, "timer cancelled");
        }
        cancelled
    }

    /// Cancels every live timer.
    pub fn cancel_all(&mut self) {
        for kind in TimerKind::ALL {
            self.cancel(kind);
        }
    }

    /// Whether a timer of `kind` is currently armed.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    /// Number of live timers across all kinds.
    pub fn armed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Time left until the timer of `kind` fires, if armed.
    pub fn remaining(&self, kind: TimerKind) -> Option<Duration> {
        self.slots[kind.slot()]
            .map(|armed| armed.deadline.saturating_duration_since(Instant::now()))
    }

    /// Waits for the earliest armed timer and reports it.
    ///
    /// Single-shot timers are disarmed when they fire; periodic timers are
    /// rescheduled one period later. If the wake-up was more than a full
    /// period late, missed ticks are skipped rather than replayed in a
    /// burst.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves every
    /// slot untouched, which is what happens when another `select!` branch
    /// wins.
    pub async fn next_fired(&mut self) -> TimerFired {
        let Some((kind, armed)) = self.earliest() else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(armed.deadline).await;

        let slot = &mut self.slots[kind.slot()];
        match armed.period {
            Some(period) => {
                let now = Instant::now();
                let late_by = now.saturating_duration_since(armed.deadline);
                let next = if late_by >= period {
                    let skipped = late_by.as_nanos() / period.as_nanos();
                    warn!(%kind, skipped = skipped as u64, "timer overrun, skipping ahead");
                    now + period
                } else {
                    armed.deadline + period
                };
                *slot = Some(Armed {
                    deadline: next,
                    ..armed
                });
            }
            None => *slot = None,
        }

        trace!(%kind, generation = armed.generation, "timer fired");
        TimerFired {
            kind,
            generation: armed.generation,
        }
    }

    fn earliest(&self) -> Option<(TimerKind, Armed)> {
        TimerKind::ALL
            .into_iter()
            .filter_map(|kind| self.slots[kind.slot()].map(|armed| (kind, armed)))
            .min_by_key(|(_, armed)| armed.deadline)
    }
}
