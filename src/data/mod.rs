//! Sound data format: image access, commands and driver layouts

pub mod commands;
pub mod driver;
pub mod image;
pub mod json;

pub use commands::{decode_track, Command};
pub use driver::{DriverType, Layout, SoundType};
pub use image::SoundData;
pub use json::SoundDataJson;
