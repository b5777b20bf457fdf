pub mod api;
pub mod app;
pub mod config;
pub mod models;
pub mod normalize;
pub mod panels;
pub mod timefmt;
pub mod ui;
