pub mod clients;
pub mod crypto;
pub mod handlers;
pub mod providers;
pub mod routes;
pub mod types;
