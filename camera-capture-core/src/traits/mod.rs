pub mod capability_query;
pub mod cue_player;
pub mod device_layer;
pub mod display;
pub mod preference_store;
pub mod result_sink;
pub mod session_delegate;
