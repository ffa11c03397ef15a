pub mod collector;
pub mod error;
pub mod merge;
pub mod models;
pub mod nutrition;
pub mod resolver;
pub mod service;
pub mod slots;
pub mod sync;
