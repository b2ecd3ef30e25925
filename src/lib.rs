//! Autoprof: an in-process sentinel that watches the CPU and memory usage of the
//! current cgroup and reports runtime profiles when usage runs high.
//!
//! The library reads usage from cgroup v1, cgroup v2 or a fixed-limit platform
//! budget, debounces threshold breaches, and hands captured profiles to a
//! caller-supplied [`Reporter`] under a delivery deadline.
//!
//! ```no_run
//! # async fn run<P: autoprof::Profiler, R: autoprof::Reporter>(
//! #     profiler: P,
//! #     reporter: R,
//! # ) -> autoprof::Result<()> {
//! let options = autoprof::Options::from_env()?;
//! let mut sentinel = autoprof::Sentinel::from_options(&options, profiler, reporter)?;
//! sentinel.start();
//! // ...
//! sentinel.stop();
//! sentinel.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod cgroup;
pub mod error;
pub mod fsutil;
pub mod mountinfo;
pub mod options;
pub mod profile;
pub mod report;
pub mod watch;

pub use cgroup::{Provider, ResourceProvider};
pub use error::{BoxError, Error, Result};
pub use options::Options;
pub use profile::{ProfileKind, Profiler};
pub use report::{ProfileInfo, ReportEvent, Reporter};
pub use watch::{REPORT_TIMEOUT, ResourceKind, Sentinel};
