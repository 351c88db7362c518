mod device;

pub use device::FinderDevice;
