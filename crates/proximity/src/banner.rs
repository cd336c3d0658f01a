//! Arrival banner state for the client's screen
//!
//! The banner appears once per session when the caregiver first comes
//! within range, flashes a highlight for a few seconds, and stays until the
//! client dismisses it. Timing lives here; the monitor knows nothing about it.

use crate::state::ProximitySnapshot;
use careline_core::config::ProximitySection;
use std::time::{Duration, Instant};

/// Default length of the arrival highlight
pub const DEFAULT_HIGHLIGHT: Duration = Duration::from_secs(5);

/// Banner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerConfig {
    /// How long the banner stays highlighted after it first appears
    pub highlight_duration: Duration,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            highlight_duration: DEFAULT_HIGHLIGHT,
        }
    }
}

impl BannerConfig {
    /// Build from the `[proximity]` section of `careline.toml`
    #[must_use]
    pub fn from_section(section: &ProximitySection) -> Self {
        Self {
            highlight_duration: Duration::from_secs(section.highlight_secs),
        }
    }
}

/// What the UI should render
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BannerView {
    /// Banner is shown
    pub visible: bool,
    /// Banner is in its transient highlighted state
    pub highlight: bool,
    /// Text to show while visible
    pub message: Option<String>,
}

/// Derives [`BannerView`]s from monitor snapshots
#[derive(Debug, Clone, Default)]
pub struct ArrivalBanner {
    config: BannerConfig,
    shown: bool,
    dismissed: bool,
    highlight_until: Option<Instant>,
    message: Option<String>,
}

impl ArrivalBanner {
    /// Banner with a specific configuration
    pub fn new(config: BannerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Update from the latest snapshot.
    ///
    /// The first snapshot with `has_alerted` shows the banner and schedules
    /// the highlight to clear at `now + highlight_duration`. A snapshot
    /// without `has_alerted` means a fresh session and re-arms the banner.
    pub fn observe(&mut self, snapshot: &ProximitySnapshot, now: Instant) -> BannerView {
        if !snapshot.has_alerted {
            self.rearm();
            return self.view();
        }

        if let Some(distance) = &snapshot.distance_formatted {
            self.message = Some(format!("Your caregiver is nearby ({distance} away)"));
        }

        if !self.shown && !self.dismissed {
            self.shown = true;
            self.highlight_until = now.checked_add(self.config.highlight_duration);
        }
        self.tick(now);
        self.view()
    }

    /// Clear the highlight once its deadline has passed.
    ///
    /// Returns true if this call cleared it.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.highlight_until {
            Some(deadline) if now >= deadline => {
                self.highlight_until = None;
                true
            }
            _ => false,
        }
    }

    /// When the UI should call [`ArrivalBanner::tick`] next
    #[must_use]
    pub fn highlight_deadline(&self) -> Option<Instant> {
        self.highlight_until
    }

    /// Hide the banner for the rest of the session
    pub fn dismiss(&mut self) {
        self.dismissed = true;
        self.shown = false;
        self.highlight_until = None;
    }

    /// Current view
    #[must_use]
    pub fn view(&self) -> BannerView {
        if !self.shown {
            return BannerView::default();
        }
        BannerView {
            visible: true,
            highlight: self.highlight_until.is_some(),
            message: Some(
                self.message
                    .clone()
                    .unwrap_or_else(|| "Your caregiver is nearby".to_string()),
            ),
        }
    }

    fn rearm(&mut self) {
        self.shown = false;
        self.dismissed = false;
        self.highlight_until = None;
        self.message = None;
    }
}
