//! Console front end: settings file, effect runner and the event loop.
mod app;
mod effects;
mod render;
mod settings;

pub use app::run_app;
