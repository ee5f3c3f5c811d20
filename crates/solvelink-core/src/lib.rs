pub mod config;
pub mod map_uri;
pub mod observability;
pub mod protocol;
pub mod trace;
pub mod tree;
