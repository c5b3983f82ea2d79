pub mod client;
pub mod error;
pub mod fragment;
pub mod loader;
