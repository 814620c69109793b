pub mod directory_sink;
pub mod json_file;
pub mod memory;
pub mod metadata;
