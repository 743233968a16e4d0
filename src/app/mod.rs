//! The application-facing glue around the binder: launcher, dialogs and
//! the menu action registry.

pub mod actions;
pub mod dialog;
pub mod launcher;
