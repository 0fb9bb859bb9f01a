pub mod category;
pub mod game;
pub mod genus;
pub mod species;
