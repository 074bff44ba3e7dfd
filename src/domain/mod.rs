//! Domain model: transactions, fault injections, windows, diagnoses and the
//! ports through which the application talks to external collaborators.

pub mod diagnosis;
pub mod event;
pub mod injection;
pub mod ports;
pub mod transaction;
pub mod window;
