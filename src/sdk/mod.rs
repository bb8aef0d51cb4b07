pub mod config;
pub mod error;
pub mod feed;
pub mod geo;
pub mod location;
pub mod notice;
pub mod routing;
pub mod session;
pub mod util;
