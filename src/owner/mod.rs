mod device;

pub use device::{decode, OwnerDevice};
