#![forbid(unsafe_code)]

//! Feature-gated tracing shims.
//!
//! With the `tracing` feature enabled these are the real `tracing` macros;
//! without it they expand to nothing, so call sites stay unconditional.

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! noop_event {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use noop_event as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use noop_event as warn;
