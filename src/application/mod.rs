//! Application services layer.

pub mod auto_redirect;
pub mod content;
pub mod error;
pub mod repos;
pub mod resolver;
pub mod rules;
pub mod sitemap;
