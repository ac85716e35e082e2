//! Session drivers: who decides when the next round runs.

mod autonomous;
mod interactive;

pub use autonomous::{Schedule, TickReport, format_tick_line, run_autonomous};
pub use interactive::{report_error, run_interactive};
