//! Backend abstraction layer
//!
//! Provides the device trait drawables are written against, the types shared
//! with it, and a recording dummy device for testing and development.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::{DeviceCommand, DummyDevice};
pub use traits::*;
pub use types::*;
