pub mod cli;
pub mod context;
pub mod routes;
pub mod server;
