//! Process-wide tracing setup. Everything else only needs the re-exported macros.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
