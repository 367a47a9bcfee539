//! Sound data command definitions and decoding

use super::image::SoundData;
use crate::error::Result;
use serde::Serialize;

/// Command opcodes
pub mod opcode {
    /// 0x00-0x7F: note, opcode is the length
    pub const NOTE_MAX: u8 = 0x7F;
    /// 0x80-0xEF: rest, low 7 bits are the length
    pub const REST_MAX: u8 = 0xEF;
    pub const INSTRUMENT: u8 = 0xF0;
    pub const VOLUME: u8 = 0xF1;
    pub const GATE: u8 = 0xF2;
    pub const DETUNE: u8 = 0xF3;
    pub const MIXER: u8 = 0xF4;
    pub const TEMPO: u8 = 0xF5;
    pub const REPEAT_END: u8 = 0xF6;
    pub const PITCH_SLIDE: u8 = 0xF7;
    pub const WORK_REGISTER: u8 = 0xF8;
    pub const ENVELOPE: u8 = 0xF9;
    pub const REGISTER_WRITE: u8 = 0xFA;
    pub const GROUP_OPEN: u8 = 0xFB;
    pub const GROUP_CLOSE: u8 = 0xFC;
    pub const BREAK: u8 = 0xFD;
    pub const PAN: u8 = 0xFE;
    pub const END: u8 = 0xFF;
}

/// Largest length a single note byte carries; longer notes are split by the encoder
pub const LONG_LENGTH: u8 = 0x6F;

/// Key byte flag: tie into the next note
pub const KEY_TIE: u8 = 0x80;

/// A decoded sound data command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Note with length and key byte
    Note { length: u8, key: u8 },
    /// Rest
    Rest { length: u8 },
    /// FM voice or SSG envelope preset
    Instrument { number: u8 },
    Volume { value: u8 },
    /// Gate time (quantize)
    Gate { value: u8 },
    Detune { value: i8 },
    /// SSG mixer (bits 6-7) and noise period (bits 0-4)
    Mixer { value: u8 },
    Tempo { value: u8 },
    /// End of a finite repeat, `distance` points back to its start
    RepeatEnd { count: u8, extra: u8, distance: u16 },
    /// Software LFO / pitch slide
    PitchSlide {
        delay: u8,
        speed: u8,
        depth: i16,
        count: u8,
    },
    WorkRegister { register: u8, value: u8 },
    /// Software envelope literal
    Envelope { params: [u8; 6] },
    /// Direct register write
    RegisterWrite { register: u8, value: u8 },
    GroupOpen,
    GroupClose,
    /// Leave the repeat on its last pass, `distance` points forward
    Break { distance: u16 },
    Pan { value: u8 },
    /// End of track, nonzero `distance` points back to the loop point
    End { distance: u16 },
}

impl Command {
    /// Decode the command at `offset`
    pub fn decode(data: &SoundData<'_>, offset: usize) -> Result<Self> {
        let op = data.byte(offset)?;
        let o = offset + 1;

        let cmd = match op {
            0x00..=opcode::NOTE_MAX => Command::Note {
                length: op,
                key: data.byte(o)?,
            },
            0x80..=opcode::REST_MAX => Command::Rest { length: op & 0x7F },
            opcode::INSTRUMENT => Command::Instrument {
                number: data.byte(o)?,
            },
            opcode::VOLUME => Command::Volume {
                value: data.byte(o)?,
            },
            opcode::GATE => Command::Gate {
                value: data.byte(o)?,
            },
            opcode::DETUNE => Command::Detune {
                value: data.byte(o)? as i8,
            },
            opcode::MIXER => Command::Mixer {
                value: data.byte(o)?,
            },
            opcode::TEMPO => Command::Tempo {
                value: data.byte(o)?,
            },
            opcode::REPEAT_END => Command::RepeatEnd {
                count: data.byte(o)?,
                extra: data.byte(o + 1)?,
                distance: data.word(o + 2)?,
            },
            opcode::PITCH_SLIDE => Command::PitchSlide {
                delay: data.byte(o)?,
                speed: data.byte(o + 1)?,
                depth: data.word(o + 2)? as i16,
                count: data.byte(o + 4)?,
            },
            opcode::WORK_REGISTER => Command::WorkRegister {
                register: data.byte(o)?,
                value: data.byte(o + 1)?,
            },
            opcode::ENVELOPE => {
                let mut params = [0u8; 6];
                params.copy_from_slice(data.bytes(o, 6)?);
                Command::Envelope { params }
            }
            opcode::REGISTER_WRITE => Command::RegisterWrite {
                register: data.byte(o)?,
                value: data.byte(o + 1)?,
            },
            opcode::GROUP_OPEN => Command::GroupOpen,
            opcode::GROUP_CLOSE => Command::GroupClose,
            opcode::BREAK => Command::Break {
                distance: data.word(o)?,
            },
            opcode::PAN => Command::Pan {
                value: data.byte(o)?,
            },
            opcode::END => Command::End {
                distance: data.word(o)?,
            },
        };

        Ok(cmd)
    }

    /// Encoded size in bytes, opcode included
    pub fn size(&self) -> usize {
        1 + operand_size(self.opcode())
    }

    /// First byte of the encoded command
    pub fn opcode(&self) -> u8 {
        match *self {
            Command::Note { length, .. } => length,
            Command::Rest { length } => 0x80 | length,
            Command::Instrument { .. } => opcode::INSTRUMENT,
            Command::Volume { .. } => opcode::VOLUME,
            Command::Gate { .. } => opcode::GATE,
            Command::Detune { .. } => opcode::DETUNE,
            Command::Mixer { .. } => opcode::MIXER,
            Command::Tempo { .. } => opcode::TEMPO,
            Command::RepeatEnd { .. } => opcode::REPEAT_END,
            Command::PitchSlide { .. } => opcode::PITCH_SLIDE,
            Command::WorkRegister { .. } => opcode::WORK_REGISTER,
            Command::Envelope { .. } => opcode::ENVELOPE,
            Command::RegisterWrite { .. } => opcode::REGISTER_WRITE,
            Command::GroupOpen => opcode::GROUP_OPEN,
            Command::GroupClose => opcode::GROUP_CLOSE,
            Command::Break { .. } => opcode::BREAK,
            Command::Pan { .. } => opcode::PAN,
            Command::End { .. } => opcode::END,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Command::End { .. })
    }
}

/// Number of operand bytes following an opcode
pub fn operand_size(op: u8) -> usize {
    match op {
        // key byte
        0x00..=opcode::NOTE_MAX => 1,
        0x80..=opcode::REST_MAX => 0,
        opcode::GROUP_OPEN | opcode::GROUP_CLOSE => 0,
        opcode::INSTRUMENT
        | opcode::VOLUME
        | opcode::GATE
        | opcode::DETUNE
        | opcode::MIXER
        | opcode::TEMPO
        | opcode::PAN => 1,
        opcode::WORK_REGISTER | opcode::REGISTER_WRITE | opcode::BREAK | opcode::END => 2,
        opcode::REPEAT_END => 4,
        opcode::PITCH_SLIDE => 5,
        opcode::ENVELOPE => 6,
    }
}

/// Decode every command of a track from `start` up to and including its end
pub fn decode_track(data: &SoundData<'_>, start: usize) -> Result<Vec<(usize, Command)>> {
    let mut commands = Vec::new();
    let mut o = start;

    loop {
        let cmd = Command::decode(data, o)?;
        commands.push((o, cmd));
        o += cmd.size();
        if cmd.is_end() {
            break;
        }
    }

    Ok(commands)
}
