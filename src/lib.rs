//! Stride - client-side feed synchronization for a runners' social feed
//!
//! This library keeps feed and detail screen state consistent with a remote
//! post/comment collection and its change notifications.

pub mod config;
pub mod db;
pub mod gateway;
pub mod models;
pub mod realtime;
pub mod views;
