pub mod basic;
pub mod converter;
pub mod data;
pub mod error;

pub use converter::{ConvertOptions, Converter, Tags};
pub use data::DriverType;
pub use error::Error;
