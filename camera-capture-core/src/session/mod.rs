pub mod controller;
pub mod device_info;
