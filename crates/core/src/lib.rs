//! visreg core: visual regression checks for locally served frontends
//!
//! This crate provides the check pipeline:
//! - Parses declarative YAML scenarios
//! - Drives Playwright through `node` to capture screenshots
//! - Compares captures against committed baselines with a pixel-diff
//!   tolerance
//! - Forwards captures to a hosted review service (fire-and-forget)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CheckRunner                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  run(scenarios)                                             │
//! │    ├── preflight()            base URL must already answer  │
//! │    ├── BrowserSession::capture()   goto → wait → screenshot │
//! │    ├── BaselineStore::verify()     pixel diff vs baseline   │
//! │    └── ReviewClient::forward()     fire-and-forget          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── app, name                                            │
//! │    ├── url, ready_selector, viewport                        │
//! │    ├── tolerance (fraction of pixels allowed to differ)     │
//! │    └── review_label, title_pattern, skip                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each check is stateless: it owns its capture and diff artifact and
//! never mutates the baseline. Baselines change only through the explicit
//! update mode or the promote commands.

pub mod baseline;
pub mod browser;
pub mod compare;
pub mod error;
pub mod review;
pub mod runner;
pub mod scenario;

pub use baseline::{BaselineStore, StoreConfig};
pub use compare::{CompareOptions, PixelDiff};
pub use error::{CheckError, CheckResult};
pub use runner::{CheckReport, CheckRunner, CheckStatus, RunnerConfig, SuiteReport};
pub use scenario::{Scenario, Viewport};
