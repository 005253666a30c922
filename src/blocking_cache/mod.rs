pub mod address;
pub mod byte_lane;
pub mod cache;
pub mod config;
pub mod core;
pub mod ctrl;
pub mod dpath;
pub mod request_bank;
