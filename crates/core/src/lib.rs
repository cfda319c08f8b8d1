//! Domain logic for the Trove treasure-hunt backend.
//!
//! Everything in this crate is I/O-free except [`game`], which drives its
//! side effects through the injected [`game::GameStore`] trait. The HTTP
//! surface lives in `trove-api`; persistence lives in `trove-db`.

pub mod codes;
pub mod error;
pub mod game;
pub mod geo;
pub mod smoothing;
pub mod team;
pub mod types;
pub mod wallet;
