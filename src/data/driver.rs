//! Sound driver detection and channel layout

use super::image::SoundData;
use crate::error::{Error, Result};
use bitflags::bitflags;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Offset of the channel-9 pointer in the channel table
const CH9_POINTER: usize = 0x0012;
/// Offset of the secondary pointer (X1 PSG sub-image / OPM marker)
const SUB_POINTER: usize = 0x001A;

/// MML channel names. `G` is not used.
pub const CHANNEL_NAMES: [&str; 9] = ["A", "B", "C", "D", "E", "F", "H", "I", "J"];

/// Number of logical channels in the pointer table
pub const CHANNEL_COUNT: usize = 9;

/// Driver / hardware combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverType {
    /// OPN data, OPN playback
    Opn,
    /// OPNA data, OPNA playback
    Opna,
    /// OPNA data for PC-88VA, OPNA playback
    OpnaVa,
    /// OPNA data, OPN playback
    OpnaMono,
    /// OPM+PSG data for X1, OPNA playback
    X1Opm,
    /// PSG data for X1, OPN playback
    X1Psg,
}

bitflags! {
    /// Capabilities of a channel group
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct SoundType: u16 {
        const FM = 0x0001;
        const SSG = 0x0002;
        const STEREO = 0x0004;
        const OPM = 0x0008;
        /// Tempo carrier pass, every body suppressed
        const DUMMY = 0x8000;
    }
}

/// First MML channel name of a channel group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAssign {
    Fm0 = 0,
    Ssg = 3,
    Fm3 = 6,
}

impl ChannelAssign {
    /// MML name of the `sub`-th channel of this group
    pub fn channel_name(self, sub: usize) -> &'static str {
        CHANNEL_NAMES[self as usize + sub]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelGroup {
    pub sound: SoundType,
    pub assign: ChannelAssign,
}

/// Resolved layout of a driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Start of the FM voice table
    pub voice_offset: usize,
    /// Groups for channels 0-2, 3-5 and 6-8
    pub groups: [ChannelGroup; 3],
}

impl Layout {
    /// Capabilities and MML name of logical channel `ch`
    pub fn channel(&self, ch: usize) -> (SoundType, &'static str) {
        let group = self.groups[ch / 3];
        (group.sound, group.assign.channel_name(ch % 3))
    }
}

const fn group(sound: SoundType, assign: ChannelAssign) -> ChannelGroup {
    ChannelGroup { sound, assign }
}

impl DriverType {
    pub const ALL: [DriverType; 6] = [
        DriverType::Opn,
        DriverType::Opna,
        DriverType::OpnaVa,
        DriverType::OpnaMono,
        DriverType::X1Opm,
        DriverType::X1Psg,
    ];

    /// Name accepted on the command line
    pub fn name(self) -> &'static str {
        match self {
            DriverType::Opn => "opn",
            DriverType::Opna => "opna",
            DriverType::OpnaVa => "va",
            DriverType::OpnaMono => "mono",
            DriverType::X1Opm => "x1opm",
            DriverType::X1Psg => "x1psg",
        }
    }

    /// Resolve the driver type, `forced` wins over detection
    pub fn resolve(data: &SoundData<'_>, forced: Option<DriverType>) -> Result<Self> {
        match forced {
            Some(driver) => Ok(driver),
            None => Self::detect(data),
        }
    }

    /// Guess the driver type from the header of the image
    ///
    /// Only OPN, OPNA, OPNA (VA) and X1 OPM data can be told apart; the mono
    /// and X1 PSG variants must be forced.
    pub fn detect(data: &SoundData<'_>) -> Result<Self> {
        if (data.word(0)? / 16) % 2 != 0 {
            return Ok(DriverType::Opn);
        }

        let ch9 = data.word(CH9_POINTER)? as usize;
        if ch9 == 0 {
            if data.word(SUB_POINTER)? == 0 {
                Ok(DriverType::OpnaVa)
            } else {
                Ok(DriverType::X1Opm)
            }
        } else if data.byte(ch9)? == 0xff {
            Ok(DriverType::Opna)
        } else {
            let mut bytes = [0u8; 4];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = data.byte(ch9 + i).unwrap_or(0);
            }
            tracing::error!(
                "Unknown driver type: ch9:{:04x} [{:02x} {:02x} {:02x} {:02x}]",
                ch9,
                bytes[0],
                bytes[1],
                bytes[2],
                bytes[3]
            );
            Err(Error::UnknownDriver { ch9, bytes })
        }
    }

    /// View holding the channel table for this driver type
    pub fn sound_data<'a>(self, data: &SoundData<'a>) -> Result<SoundData<'a>> {
        match self {
            DriverType::X1Psg => data.relocate(data.word(SUB_POINTER)? as usize),
            _ => Ok(*data),
        }
    }

    pub fn layout(self) -> Layout {
        use ChannelAssign::*;
        let none = SoundType::empty();
        let fm = SoundType::FM;
        let fm_stereo = SoundType::FM | SoundType::STEREO;
        let opm = SoundType::FM | SoundType::STEREO | SoundType::OPM;
        let ssg = SoundType::SSG;

        match self {
            DriverType::Opn => Layout {
                voice_offset: 0x0010,
                groups: [group(fm, Fm0), group(ssg, Ssg), group(none, Fm3)],
            },
            DriverType::Opna => Layout {
                voice_offset: 0x0020,
                groups: [group(fm_stereo, Fm3), group(fm_stereo, Fm0), group(ssg, Ssg)],
            },
            DriverType::OpnaVa => Layout {
                voice_offset: 0x0020,
                groups: [group(fm_stereo, Fm0), group(ssg, Ssg), group(fm_stereo, Fm3)],
            },
            DriverType::OpnaMono => Layout {
                voice_offset: 0x0020,
                groups: [group(none, Fm3), group(fm, Fm0), group(ssg, Ssg)],
            },
            DriverType::X1Opm => Layout {
                voice_offset: 0x0020,
                groups: [group(opm, Fm0), group(ssg, Ssg), group(opm, Fm3)],
            },
            DriverType::X1Psg => Layout {
                voice_offset: 0x0010,
                groups: [group(none, Fm0), group(ssg, Ssg), group(none, Fm3)],
            },
        }
    }
}

impl FromStr for DriverType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DriverType::ALL
            .iter()
            .copied()
            .find(|d| d.name() == s)
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
