//! HTTP Adapter
//!
//! hyper ベースのプロセスマネージャ

pub mod server;

pub use server::{shutdown_signal, HttpServer};
