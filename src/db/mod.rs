mod connection;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::SleepNight;
