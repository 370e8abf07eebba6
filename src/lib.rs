pub mod collector;
pub mod config;
pub mod mapper;
pub mod report;
pub mod session;
pub mod sink;
