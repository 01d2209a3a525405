//! Back-office core for the cafe: vendor applications for the seasonal market, paid
//! activity participation requests, and the attendance records they produce.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
