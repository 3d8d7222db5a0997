//! SHELF application library
//!
//! Hosts the book catalogue module and the bootstrap sequence shared by the
//! `shelf-app` binary and the `shelf` CLI.

pub mod bootstrap;
pub mod modules;
