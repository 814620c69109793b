pub mod capability;
pub mod config;
pub mod constraints;
pub mod error;
pub mod mode;
pub mod resolution;
pub mod state;
pub mod take_result;
