pub mod config;
pub mod coordinates;
pub mod crop;
pub mod frame;
pub mod host;
pub mod metadata;
pub mod preview;
pub mod session;
