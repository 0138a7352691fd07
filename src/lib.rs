pub mod app;
pub mod audio;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod core;
pub mod error;
pub mod media;
pub mod model;
pub mod mutation;
pub mod navigator;
pub mod ui;
