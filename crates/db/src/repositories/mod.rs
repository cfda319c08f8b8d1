//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod code_repo;
pub mod completion_repo;
pub mod location_repo;
pub mod operator_repo;
pub mod player_repo;
pub mod team_repo;

pub use code_repo::CodeRepo;
pub use completion_repo::CompletionRepo;
pub use location_repo::LocationRepo;
pub use operator_repo::OperatorRepo;
pub use player_repo::PlayerRepo;
pub use team_repo::TeamRepo;
