mod capture;
mod device;
mod device_manager;
mod media_stream;
mod synthetic;

pub use capture::*;
pub use device::*;
pub use device_manager::*;
pub use media_stream::*;
pub use synthetic::*;
