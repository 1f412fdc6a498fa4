pub mod downloads;
pub mod error;
pub mod handlers;
pub mod livestreams;
pub mod middleware;
pub mod routes;
pub mod rpc;
pub mod ws;

pub use routes::create_router;
