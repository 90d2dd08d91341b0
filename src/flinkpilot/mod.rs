pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod monitor;
pub mod shutdown;
pub mod sql;
pub mod submission;
