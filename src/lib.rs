pub mod config;
pub mod db;
pub mod error;
pub mod positioning;
pub mod sync;
pub mod utils;
