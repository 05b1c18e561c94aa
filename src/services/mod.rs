pub mod demo;
pub mod fetch_client;
pub mod import_flow;
pub mod import_session;
