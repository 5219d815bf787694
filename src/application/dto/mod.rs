//! # Data Transfer Objects
//!
//! ユースケースへの入力

pub mod build_request;
pub mod launch_request;
