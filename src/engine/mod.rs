//! Core engine: the balance → resolve → build → submit → record loop.
//!
//! `controller::RunController` owns the schedule and direction; every
//! other module here is one step of a cycle.

pub mod events;
pub mod inspector;
pub mod resolver;
pub mod builder;
pub mod submitter;
pub mod accountant;
pub mod controller;
