//! ImageTrim — a small crop ("trim") dialog for images.
//!
//! The crate is usable two ways: embed [`dialog::TrimDialog`] inside an
//! existing egui application, or run the `imagetrim` binary, which hosts the
//! dialog in its own window ([`app::TrimApp`]).

#[macro_use]
pub mod logger;

pub mod app;
pub mod canvas;
pub mod dialog;
pub mod prefs;
