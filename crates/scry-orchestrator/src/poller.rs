use std::time::{Duration, Instant};

use scry_types::live::{LiveGame, LiveGameMembership};
use scry_types::FetchError;

/// Membership state exposed to consumers.
#[derive(Debug, Clone, Default)]
pub struct MembershipSnapshot {
    pub verdict: Option<LiveGameMembership>,
    pub is_checking: bool,
    pub is_definitively_absent: bool,
    /// The verdict has outlived its hold window; it is still shown as the
    /// last-known-good state while the next poll settles.
    pub is_stale: bool,
}

/// Poll state machine for live-game membership.
///
/// A 404 is the definitive `Absent` verdict, not an error. Every other
/// failure keeps the previous verdict in effect and re-stamps its
/// freshness, so one bad poll cycle never flips a confirmed in-game player
/// back to "not in game".
pub struct MembershipStage {
    interval: Duration,
    hold: Duration,
    puuid: Option<String>,
    verdict: Option<LiveGameMembership>,
    verdict_at: Option<Instant>,
    last_poll_at: Option<Instant>,
    checking: bool,
    forced: bool,
    last_held_error: Option<FetchError>,
}

impl MembershipStage {
    pub fn new(interval: Duration, hold: Duration) -> Self {
        Self {
            interval,
            hold,
            puuid: None,
            verdict: None,
            verdict_at: None,
            last_poll_at: None,
            checking: false,
            forced: false,
            last_held_error: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.interval, self.hold);
    }

    /// Request an immediate re-check on the next evaluation.
    pub fn force_next(&mut self) {
        self.forced = true;
    }

    /// Whether a poll should be issued for `puuid` now. At most one check
    /// is in flight at a time.
    pub fn is_due(&self, puuid: &str, now: Instant) -> bool {
        if self.checking {
            return false;
        }
        if self.forced || self.puuid.as_deref() != Some(puuid) {
            return true;
        }
        match self.last_poll_at {
            None => true,
            Some(last) => now.duration_since(last) >= self.interval,
        }
    }

    pub fn begin(&mut self, puuid: &str, now: Instant) {
        if self.puuid.as_deref() != Some(puuid) {
            // A verdict for a different player must not leak across keys.
            self.verdict = None;
            self.verdict_at = None;
            self.last_held_error = None;
            self.puuid = Some(puuid.to_string());
        }
        self.checking = true;
        self.forced = false;
        self.last_poll_at = Some(now);
    }

    /// Apply a settled poll. Returns true when the verdict flipped away
    /// from `Present`, so dependent state can be torn down.
    pub fn apply(
        &mut self,
        puuid: &str,
        outcome: Result<LiveGame, FetchError>,
        now: Instant,
    ) -> bool {
        if self.puuid.as_deref() != Some(puuid) {
            // Superseded poll; the result belongs to a previous key.
            return false;
        }
        self.checking = false;
        let was_present = self.is_present();
        match outcome {
            Ok(game) => {
                self.verdict = Some(LiveGameMembership::Present(game));
                self.verdict_at = Some(now);
                self.last_held_error = None;
            }
            Err(err) if err.is_not_found() => {
                self.verdict = Some(LiveGameMembership::Absent);
                self.verdict_at = Some(now);
                self.last_held_error = None;
            }
            Err(err) => {
                // Previous verdict stays in effect for another hold window.
                if self.verdict.is_some() {
                    self.verdict_at = Some(now);
                }
                self.last_held_error = Some(err);
            }
        }
        was_present && !self.is_present()
    }

    pub fn verdict(&self) -> Option<&LiveGameMembership> {
        self.verdict.as_ref()
    }

    pub fn is_present(&self) -> bool {
        matches!(self.verdict, Some(LiveGameMembership::Present(_)))
    }

    pub fn is_definitively_absent(&self) -> bool {
        matches!(self.verdict, Some(LiveGameMembership::Absent))
    }

    pub fn last_held_error(&self) -> Option<&FetchError> {
        self.last_held_error.as_ref()
    }

    fn is_fresh(&self, now: Instant) -> bool {
        match self.verdict_at {
            Some(at) => now.duration_since(at) < self.hold,
            None => false,
        }
    }

    pub fn snapshot(&self, now: Instant) -> MembershipSnapshot {
        MembershipSnapshot {
            verdict: self.verdict.clone(),
            is_checking: self.checking,
            is_definitively_absent: self.is_definitively_absent(),
            is_stale: self.verdict.is_some() && !self.is_fresh(now),
        }
    }
}
