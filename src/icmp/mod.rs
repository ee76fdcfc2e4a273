pub mod checksum;
pub mod packet;
pub mod socket;

#[cfg(test)]
pub(crate) mod mock;

pub use checksum::checksum;
pub use packet::*;
pub use socket::*;
