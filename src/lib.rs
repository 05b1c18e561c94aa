pub mod adapters;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod ports;
pub mod services;
pub mod spotify_rs;

#[cfg(test)]
mod test_utils;
