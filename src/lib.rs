pub mod api;
pub mod client;
pub mod config;
pub mod data_models;
pub mod db;
pub mod enroll;
pub mod matcher;
pub mod similarity;
pub mod store;
pub mod terminal;
