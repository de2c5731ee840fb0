//! kube-apparmor-manager CLI library
//!
//! Command handlers and terminal output used by the `kube-apparmor-manager`
//! binary.

pub mod commands;
pub mod output;
