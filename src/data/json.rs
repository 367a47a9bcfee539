//! JSON serialization types for decoded sound data

use super::commands::Command;
use super::driver::{DriverType, SoundType};
use serde::Serialize;

/// Top-level JSON structure for a sound data file
#[derive(Debug, Clone, Serialize)]
pub struct SoundDataJson {
    pub driver: DriverType,
    /// Enabled channels in pointer table order
    pub channels: Vec<ChannelJson>,
}

/// JSON representation of one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelJson {
    /// Index in the channel pointer table
    pub index: usize,
    /// MML channel name
    pub name: &'static str,
    pub sound: SoundType,
    pub start: usize,
    /// Offset just past the end-of-track command
    pub end: usize,
    /// Detected ticks per whole note
    pub clock: u32,
    /// Detected default length divisor
    pub default_length: u32,
    pub commands: Vec<CommandJson>,
}

/// A command with its offset
#[derive(Debug, Clone, Serialize)]
pub struct CommandJson {
    pub offset: usize,
    #[serde(flatten)]
    pub command: Command,
}
