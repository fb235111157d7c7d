//! Row types and queries.

pub mod device;
pub mod device_tag;

pub use device::DeviceRow;
pub use device_tag::DeviceTagRow;
