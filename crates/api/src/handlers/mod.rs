//! HTTP request handlers, grouped by resource.

pub mod auth;
pub mod game;
pub mod locations;
pub mod players;
pub mod teams;
