//! # camera-capture-virtual
//!
//! Virtual camera backend for camera-capture-kit.
//!
//! Provides:
//! - `VirtualDeviceLayer`: device layer and capability query over a set of virtual cameras
//! - `VirtualCamera`: description of one camera (modes, photo sizes, fps ranges, portrait support)
//! - `VirtualStream` / `VirtualRecorder`: live streams and chunked recordings on tokio timers
//! - `VirtualImageCapture`: test-pattern JPEG photos rendered with `image`
//!
//! Cameras can be plugged, unplugged and marked busy while a session runs,
//! which makes the backend suitable for demos and integration tests.
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use camera_capture_virtual::{VirtualCamera, VirtualDeviceLayer};
//!
//! let layer = Arc::new(VirtualDeviceLayer::new([VirtualCamera::front_camera("front")]));
//! let collaborators = SessionCollaborators {
//!     device_layer: layer.clone(),
//!     capability_query: Some(layer.clone()),
//!     ..
//! };
//! ```

pub mod camera;
pub mod device_layer;
pub mod image_capture;
pub mod query;
pub mod stream;

pub use camera::VirtualCamera;
pub use device_layer::VirtualDeviceLayer;
pub use image_capture::VirtualImageCapture;
pub use stream::{VirtualRecorder, VirtualStream};
