//! First pass over a channel: length statistics and loop targets

use super::length::LengthHistogram;
use crate::data::commands::{Command, KEY_TIE, LONG_LENGTH};
use crate::data::SoundData;
use crate::error::Result;
use std::collections::HashMap;

/// Loop information recorded at one offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopMark {
    /// Target of the end-of-track jump
    pub loop_point: bool,
    /// Number of finite repeats starting here
    pub nest: u32,
}

impl LoopMark {
    pub fn is_target(&self) -> bool {
        self.loop_point || self.nest > 0
    }
}

/// Loop targets keyed by absolute offset
///
/// Offsets are unique within an image, so a single map is shared by every
/// channel of a conversion run.
#[derive(Debug, Clone, Default)]
pub struct LoopMap {
    marks: HashMap<usize, LoopMark>,
}

impl LoopMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_loop_point(&mut self, offset: usize) {
        self.marks.entry(offset).or_default().loop_point = true;
    }

    pub fn push_repeat(&mut self, offset: usize) {
        self.marks.entry(offset).or_default().nest += 1;
    }

    pub fn get(&self, offset: usize) -> LoopMark {
        self.marks.get(&offset).copied().unwrap_or_default()
    }

    pub fn is_target(&self, offset: usize) -> bool {
        self.get(offset).is_target()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }
}

/// Result of scanning one channel
#[derive(Debug, Clone)]
pub struct Scan {
    /// Offset just past the end-of-track command
    pub end: usize,
    pub histogram: LengthHistogram,
}

/// Extra length carried by a split long note starting at `offset`
///
/// The encoder splits notes longer than [`LONG_LENGTH`] into a tied
/// maximal note and a continuation note of the same key. Returns the
/// continuation length, or `None` when the note at `offset` is not split.
pub fn long_note_extension(data: &SoundData<'_>, offset: usize, length: u8, key: u8) -> Result<Option<u8>> {
    if length != LONG_LENGTH || key & KEY_TIE == 0 {
        return Ok(None);
    }

    // offset + 1: key, offset + 2: continuation length, offset + 3: its key
    let next = data.byte(offset + 2)?;
    if next >= 0x80 {
        return Ok(None);
    }
    let next_key = data.byte(offset + 3)?;
    if next_key & 0x7f != key & 0x7f {
        return Ok(None);
    }

    Ok(Some(next))
}

/// Walk a channel from `start` to its end-of-track command
pub fn scan(data: &SoundData<'_>, start: usize, loops: &mut LoopMap) -> Result<Scan> {
    let mut histogram = LengthHistogram::new();
    let mut o = start;

    loop {
        let cmd = Command::decode(data, o)?;
        let next = o + cmd.size();

        match cmd {
            Command::Note { length, key } => match long_note_extension(data, o, length, key)? {
                Some(extra) => {
                    histogram.record(length as u32 + extra as u32);
                    o = next + 2;
                    continue;
                }
                None => histogram.record(length as u32),
            },
            // split long rests are never joined
            Command::Rest { length } => histogram.record(length as u32),
            Command::RepeatEnd { distance, .. } => {
                let target = data.back_reference(next, distance)?;
                tracing::trace!("repeat {:04x} -> {:04x}", o, target);
                loops.push_repeat(target);
            }
            Command::End { distance } => {
                if distance != 0 {
                    let target = data.back_reference(next, distance)?;
                    loops.mark_loop_point(target);
                }
                return Ok(Scan {
                    end: next,
                    histogram,
                });
            }
            _ => {}
        }

        o = next;
    }
}
