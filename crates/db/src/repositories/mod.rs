//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods that
//! accept `&PgPool` (or any Postgres executor for reads) as the first
//! argument. Writes that touch a tree run in one transaction together with
//! the propagation walk over the affected ancestors.

pub mod category_repo;
pub mod game_repo;
pub mod genus_repo;
pub mod species_repo;

pub use category_repo::GameCategoryRepo;
pub use game_repo::{ActionOutcome, GameRepo};
pub use genus_repo::GenusRepo;
pub use species_repo::SpeciesRepo;
