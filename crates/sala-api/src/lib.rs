pub mod error;
pub mod messages;
pub mod middleware;
pub mod participants;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod validate;
