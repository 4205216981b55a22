mod app;
mod commands;
mod console;

pub use app::*;
pub use commands::*;
pub use console::*;
