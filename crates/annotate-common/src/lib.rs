pub mod auth;
pub mod book;
pub mod category;
pub mod error;
pub mod labels;
pub mod mcp_api;
pub mod model;
pub mod redis;
pub mod render;
pub mod repository;
pub mod seed;
pub mod session;
pub mod span;
