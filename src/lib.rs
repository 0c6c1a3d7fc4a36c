pub mod collaborations;
pub mod config;
pub mod connections;
pub mod db;
pub mod error;
pub mod invitations;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod schema;
pub mod state;
pub mod sweeper;

pub use sweeper::ExpirySweeper;
