pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod response;
pub mod storage;
pub mod util;
pub mod validate;
