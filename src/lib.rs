pub mod config;
pub mod session;
pub mod store;
pub mod sync;
pub mod todoist;
pub mod tui;

#[cfg(test)]
mod testing;
