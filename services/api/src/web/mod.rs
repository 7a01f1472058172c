pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod router;
pub mod state;
pub mod ticker_task;
pub mod vocabulary;
pub mod ws_handler;

// Re-export the router and WebSocket handler to make them easily accessible
// to the binary that builds the web server.
pub use router::api_router;
pub use ws_handler::ws_handler;
