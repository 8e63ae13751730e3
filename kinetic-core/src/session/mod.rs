//! Live workout tracking.
//!
//! [`LiveSession`] is the synchronous state machine (exercise → set → rest).
//! [`SessionDriver`] owns one and runs the two 1 Hz tickers (elapsed time and
//! rest countdown) on tokio, publishing [`SessionEvent`]s.

mod clock;
mod input;
mod live;
mod summary;
mod timers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use input::SetInput;
pub use live::{LiveSession, RestPolicy, RestTick, SessionError, SessionState};
pub use summary::{SessionSnapshot, format_elapsed};
pub use timers::{SessionDriver, SessionEvent};
