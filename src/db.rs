pub mod cftc;
pub mod gsheets;
