//! Second pass over a channel: MML text generation

use super::length::Timebase;
use super::scan::{long_note_extension, LoopMap};
use super::voice::SSG_ENVELOPES;
use crate::data::commands::{Command, KEY_TIE};
use crate::data::driver::SoundType;
use crate::data::SoundData;
use crate::error::{DiagnosticKind, Diagnostics, Result};

/// Columns available on one MML line
pub const LINE_WIDTH: i32 = 70;

const NOTE_NAMES: [&str; 16] = [
    "c", "c+", "d", "d+", "e", "f", "f+", "g", "g+", "a", "a+", "b", "?", "?", "?", "?",
];

/// Replacement key codes for OPM keys 0x60-0x7F found in X1 data
const X1_ILLEGAL_NOTE: [u8; 32] = [
    0x4e, 0x0b, 0x0e, 0x0b, 0x36, 0x0b, 0x08, 0x09, //
    0x41, 0x09, 0x21, 0x09, 0x08, 0x08, 0x57, 0x08, //
    0x4b, 0x08, 0x47, 0x06, 0x47, 0x06, 0x4d, 0x06, //
    0x20, 0x1e, 0x1d, 0x1a, 0x18, 0x17, 0x14, 0x12,
];

/// SSG mixer/noise shadow value meaning "unknown"
const SHADOW_UNKNOWN: u8 = 0xff;

/// Tempo changes seen on SSG channels across a whole run
#[derive(Debug, Clone, Default)]
pub struct TempoTracker {
    previous: Option<u8>,
    changes: u32,
}

impl TempoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, tempo: u8) {
        match self.previous {
            Some(prev) if prev != tempo => {
                self.previous = Some(tempo);
                self.changes += 1;
            }
            Some(_) => {}
            None => self.previous = Some(tempo),
        }
    }

    pub fn changes(&self) -> u32 {
        self.changes
    }
}

/// Accumulates MML text, starting a new line when the column budget runs out
#[derive(Debug)]
struct LineWriter {
    name: &'static str,
    header: Option<String>,
    remaining: i32,
    text: String,
}

impl LineWriter {
    fn new(name: &'static str, header: String) -> Self {
        Self {
            name,
            header: Some(header),
            remaining: 0,
            text: String::new(),
        }
    }

    fn wrap(&mut self) {
        if self.remaining > 0 {
            return;
        }
        self.text.push('\n');
        self.remaining = LINE_WIDTH;
        self.put(self.name);
        self.put(" ");
        if let Some(header) = self.header.take() {
            self.put(&header);
        }
    }

    fn put(&mut self, s: &str) {
        self.text.push_str(s);
        self.remaining -= s.len() as i32;
    }

    fn finish(mut self) -> String {
        self.text.push('\n');
        self.text
    }
}

/// Emits the MML text of one channel
pub struct ChannelEmitter<'a> {
    data: SoundData<'a>,
    loops: &'a LoopMap,
    sound: SoundType,
    timebase: Timebase,
    /// Offset just past the end-of-track command
    end: usize,
    ssg_env_macro: bool,
    octave: Option<u8>,
    ssg_mixer: u8,
    ssg_noise: u8,
    line: LineWriter,
}

impl<'a> ChannelEmitter<'a> {
    pub fn new(
        data: SoundData<'a>,
        loops: &'a LoopMap,
        sound: SoundType,
        name: &'static str,
        timebase: Timebase,
        end: usize,
    ) -> Self {
        Self {
            data,
            loops,
            sound,
            timebase,
            end,
            ssg_env_macro: true,
            octave: None,
            ssg_mixer: 0x02,
            ssg_noise: SHADOW_UNKNOWN,
            line: LineWriter::new(name, timebase.header()),
        }
    }

    /// Write SSG envelope presets as `*n` macro calls (default) or expanded `E` commands
    pub fn with_ssg_env_macro(mut self, enabled: bool) -> Self {
        self.ssg_env_macro = enabled;
        self
    }

    /// Emit the channel starting at `start`
    pub fn run(
        mut self,
        start: usize,
        tempo: &mut TempoTracker,
        diagnostics: &mut Diagnostics,
    ) -> Result<String> {
        let dummy = self.sound.contains(SoundType::DUMMY);
        let mut o = start;

        loop {
            self.line.wrap();
            self.put_loop_marks(o);

            let cmd = Command::decode(&self.data, o)?;
            let next = o + cmd.size();

            match cmd {
                Command::Note { length, key } => {
                    o = self.note(o, length, key, diagnostics)?;
                    continue;
                }
                Command::Rest { length } => {
                    self.line.put("r");
                    self.put_length(length as u32);
                }
                // only rests, tempo and loop structure survive in a tempo carrier
                Command::Volume { .. }
                | Command::Gate { .. }
                | Command::Detune { .. }
                | Command::Mixer { .. }
                | Command::PitchSlide { .. }
                | Command::WorkRegister { .. }
                | Command::Envelope { .. }
                | Command::RegisterWrite { .. }
                | Command::GroupOpen
                | Command::GroupClose
                | Command::Pan { .. }
                    if dummy => {}
                Command::Instrument { number } => self.instrument(number),
                Command::Volume { value } => self.line.put(&format!("v{}", value)),
                Command::Gate { value } => self.line.put(&format!("q{}", value)),
                Command::Detune { value } => self.line.put(&format!("D{}", value)),
                Command::Mixer { value } => self.mixer(value),
                Command::Tempo { value } => {
                    self.line.put(&format!("t{}", value));
                    if self.sound.contains(SoundType::SSG) {
                        tempo.observe(value);
                        tracing::debug!("{{{:04x}}} tempo {}", o, value);
                    }
                }
                Command::RepeatEnd {
                    count, distance, ..
                } => {
                    tracing::debug!("{{{:04x}:{:04x}}}", o, next.wrapping_sub(distance as usize));
                    self.line.put(&format!("]{}", count));
                    self.reset_ssg_shadow();
                }
                Command::PitchSlide {
                    delay,
                    speed,
                    depth,
                    count,
                } => self
                    .line
                    .put(&format!("M{},{},{},{}", delay, speed, depth, count)),
                Command::WorkRegister { register, value } => {
                    if register == 0x10 {
                        self.line.put(if value == 0 { "MF0" } else { "MF1" });
                    } else {
                        // no MUCOM88 equivalent
                        self.line.put("??work");
                    }
                }
                Command::Envelope { params } => {
                    let fields: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                    self.line.put(&format!("E{}", fields.join(",")));
                    if self.sound.contains(SoundType::FM) {
                        tracing::debug!("{{{:04x}}} envelope on FM", o);
                    }
                }
                Command::RegisterWrite { register, value } => {
                    self.line.put(&format!("y{},{}", register, value));
                    if self.sound.contains(SoundType::SSG) {
                        tracing::debug!("{{{:04x}}} register write on SSG", o);
                    }
                }
                // not compatible with MUCOM88, left for manual editing
                Command::GroupOpen => self.line.put("("),
                Command::GroupClose => self.line.put(")"),
                Command::Break { distance } => {
                    let target = next + distance as usize;
                    if target >= self.end {
                        // seen in broken data shipped with some titles
                        diagnostics.report(
                            DiagnosticKind::WrongBreak {
                                target,
                                end: self.end,
                            },
                            o,
                        )?;
                    } else {
                        self.line.put("/");
                        tracing::debug!("{{{:04x}:{:04x}}}", o, target);
                    }
                }
                Command::Pan { value } => {
                    if self.sound.contains(SoundType::STEREO) {
                        self.line.put(&format!("p{}", value >> 6));
                    }
                }
                Command::End { .. } => break,
            }

            o = next;
        }

        Ok(self.line.finish())
    }

    fn put_loop_marks(&mut self, o: usize) {
        let mark = self.loops.get(o);
        if mark.is_target() {
            self.reset_ssg_shadow();
        }
        if mark.loop_point {
            self.line.put(" L ");
        }
        for _ in 0..mark.nest {
            self.line.put("[");
        }
        if mark.nest > 0 {
            tracing::debug!("{{{:04x}}} repeat start x{}", o, mark.nest);
        }
    }

    fn put_length(&mut self, length: u32) {
        let text = self.timebase.format_length(length);
        self.line.put(&text);
    }

    fn reset_ssg_shadow(&mut self) {
        self.ssg_mixer = SHADOW_UNKNOWN;
        self.ssg_noise = SHADOW_UNKNOWN;
    }

    /// Emit a note at `o`, returning the offset of the following command
    fn note(&mut self, o: usize, length: u8, key: u8, diagnostics: &mut Diagnostics) -> Result<usize> {
        if self.sound.contains(SoundType::DUMMY) {
            // '|' keeps MUCOM88 from misparsing a rest at the head of a line
            self.line.put("|r");
            self.put_length(length as u32);
            return Ok(o + 2);
        }

        // a split long note is only joined when no loop starts between the halves
        let (length, key_offset) = match long_note_extension(&self.data, o, length, key)? {
            Some(extra) if !self.loops.is_target(o + 2) => (length as u32 + extra as u32, o + 3),
            _ => (length as u32, o + 1),
        };
        let key = self.data.byte(key_offset)?;

        let (octave, note) = if self.sound.contains(SoundType::OPM) {
            let mut code = key & 0x7f;
            if code >= 0x60 {
                diagnostics.report(DiagnosticKind::TooHighTone { value: code }, key_offset - 1)?;
                code = X1_ILLEGAL_NOTE[(code - 0x60) as usize];
            }
            ((code + 15) / 12, (code + 15) % 12)
        } else {
            (((key >> 4) & 0x07) + 1, key & 0x0f)
        };

        self.put_octave(octave);
        self.line.put(NOTE_NAMES[note as usize]);
        self.put_length(length);
        if key & KEY_TIE != 0 {
            self.line.put("&");
        }

        Ok(key_offset + 1)
    }

    fn put_octave(&mut self, octave: u8) {
        match self.octave {
            Some(prev) if prev == octave => return,
            Some(prev) if octave == prev + 1 => self.line.put(">"),
            Some(prev) if octave + 1 == prev => self.line.put("<"),
            _ => self.line.put(&format!("o{}", octave)),
        }
        self.octave = Some(octave);
    }

    fn instrument(&mut self, number: u8) {
        if self.sound.contains(SoundType::FM) {
            self.line.put(&format!("@{}", number));
        } else if self.sound.contains(SoundType::SSG) {
            match SSG_ENVELOPES.get(number as usize) {
                Some(env) if !self.ssg_env_macro => {
                    let fields: Vec<String> = env.iter().map(|p| p.to_string()).collect();
                    self.line.put(&format!("E{}", fields.join(",")));
                }
                Some(_) => self.line.put(&format!("*{}", number)),
                None => {
                    tracing::warn!("SSG envelope preset {} has no definition", number);
                    self.line.put(&format!("*{}", number));
                }
            }
        }
    }

    fn mixer(&mut self, value: u8) {
        if self.sound.contains(SoundType::FM) {
            // no MUCOM88 equivalent
            self.line.put(&format!("??@v{}", value));
        } else if self.sound.contains(SoundType::SSG) {
            if value >> 6 != self.ssg_mixer {
                self.ssg_mixer = value >> 6;
                self.line.put(&format!("P{}", self.ssg_mixer ^ 3));
            }
            if value & 0x1f != self.ssg_noise {
                self.ssg_noise = value & 0x1f;
                self.line.put(&format!("w{}", self.ssg_noise));
            }
        }
    }
}
