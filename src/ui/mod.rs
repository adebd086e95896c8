//! Ratatui front end: menus, input forms, and result screens.

mod app;
mod forms;
mod helpers;
mod menu;
mod terminal;
mod views;

pub use app::App;
pub use terminal::run_app;
