pub mod db;
pub mod error;
pub mod fantasy;
pub mod models;
pub mod pagination;
pub mod repos;
pub mod roster;
pub mod standings;
pub mod text;
pub mod tokens;
