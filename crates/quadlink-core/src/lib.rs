#![no_std]

pub mod audio;
pub mod frame;
pub mod hid;
pub mod link;
pub mod proto;

pub use frame::{Slot, VsyncMode};
pub use link::{FpgaLink, LinkError};
