pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod loader;
pub mod omero;
pub mod output;
