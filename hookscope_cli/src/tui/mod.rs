//! Terminal dashboard for live webhook inspection

mod app;
mod ui;

pub use app::{Action, TuiApp};
pub use ui::draw;
