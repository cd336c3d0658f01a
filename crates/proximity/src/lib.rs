//! Caregiver arrival alerts
//!
//! A [`ProximityMonitor`] watches one worker against one client's address:
//! it resolves the address once, folds in the worker's live position
//! samples, and raises a one-shot alert the first time the worker comes
//! within the configured radius. [`ArrivalBanner`] turns the monitor's
//! snapshots into what the client's screen shows.
//!
//! ```text
//! State machine:
//!
//!   Idle ──start──▶ Resolving ──found──▶ Tracking ──inside──▶ Alerted
//!                       │
//!                       └──not found──▶ Idle
//!
//!   any ──stop──▶ Stopped ──start──▶ Resolving
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod banner;
pub mod feed;
pub mod monitor;
pub mod sample;
pub mod state;

pub use banner::{ArrivalBanner, BannerConfig, BannerView};
pub use feed::{drive_feed, drive_feed_with};
pub use monitor::{MonitorConfig, ProximityMonitor, DEFAULT_THRESHOLD_METERS};
pub use sample::WorkerSample;
pub use state::{MonitorPhase, ProximitySnapshot, SampleOutcome, SampleRejection};
