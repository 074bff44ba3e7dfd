//! Application layer containing the monitoring pipeline.
//!
//! The [`orchestrator::Orchestrator`] owns the detector and the decision engine
//! and drives them from a single task. Outside callers talk to it through a
//! [`orchestrator::ControlHandle`], which forwards commands over a `tokio`
//! channel so that all state changes happen inside the loop.

pub mod broadcast;
pub mod decision;
pub mod detector;
pub mod generator;
pub mod investigator;
pub mod orchestrator;
