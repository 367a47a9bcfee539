//! Sound data to MML conversion
//!
//! Each channel is converted in two passes: [`scan::scan`] collects note
//! length statistics and loop targets, then [`channel::ChannelEmitter`] walks
//! the same stream again and writes MML text.

pub mod channel;
pub mod length;
pub mod scan;
pub mod voice;

use crate::data::driver::{ChannelAssign, DriverType, SoundType, CHANNEL_COUNT};
use crate::data::image::{decode_image, load_image};
use crate::data::json::{ChannelJson, CommandJson, SoundDataJson};
use crate::data::{decode_track, SoundData};
use crate::error::{Diagnostic, Diagnostics, Result};
use channel::{ChannelEmitter, TempoTracker};
use length::Timebase;
use scan::{scan, LoopMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Tag lines written at the head of the MML
#[derive(Debug, Clone, Default)]
pub struct Tags {
    pub mucom88: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub composer: Option<String>,
    pub date: Option<String>,
    pub comment: Option<String>,
}

impl Tags {
    fn write(&self, out: &mut String) {
        let tags = [
            ("mucom88", &self.mucom88),
            ("title", &self.title),
            ("author", &self.author),
            ("composer", &self.composer),
            ("date", &self.date),
            ("comment", &self.comment),
        ];
        for (name, value) in tags {
            if let Some(value) = value {
                out.push_str(&format!("#{} {}\n", name, value));
            }
        }
        out.push('\n');
    }
}

/// Conversion options
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Skip detection and use this driver type
    pub driver: Option<DriverType>,
    /// Report known data bugs as warnings and apply corrections
    pub workaround: bool,
    /// Use `*n` macros for SSG envelope presets instead of expanded `E` commands
    pub ssg_env_macro: bool,
    /// Timer-B tempo to set on channel A after the first SSG channel
    pub timer_b_tempo: Option<u8>,
    pub tags: Tags,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            driver: None,
            workaround: false,
            ssg_env_macro: true,
            timer_b_tempo: None,
            tags: Tags::default(),
        }
    }
}

/// Converter state for one run
pub struct Converter {
    options: ConvertOptions,
    loops: LoopMap,
    tempo: TempoTracker,
    diagnostics: Diagnostics,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        let diagnostics = Diagnostics::new(options.workaround);
        Self {
            options,
            loops: LoopMap::new(),
            tempo: TempoTracker::new(),
            diagnostics,
        }
    }

    /// Diagnostics reported so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    /// Convert a sound data image to MML text
    pub fn convert(&mut self, image: &[u8]) -> Result<String> {
        self.loops.clear();
        self.tempo = TempoTracker::new();
        self.diagnostics = Diagnostics::new(self.options.workaround);

        let image = SoundData::new(image)?;
        let driver = DriverType::resolve(&image, self.options.driver)?;
        tracing::debug!("driver type: {}", driver);
        let data = driver.sound_data(&image)?;
        let layout = driver.layout();

        let mut out = String::new();
        self.options.tags.write(&mut out);
        voice::write_voices(&mut out, &data, layout.voice_offset)?;
        if self.options.ssg_env_macro {
            out.push_str(&voice::ssg_envelope_macros());
        }

        let mut timer_b_pending = self.options.timer_b_tempo;
        for ch in 0..CHANNEL_COUNT {
            let (sound, name) = layout.channel(ch);
            if sound.is_empty() {
                continue;
            }
            out.push_str(&self.convert_channel(&data, ch, sound, name)?);

            if sound.contains(SoundType::SSG) {
                if let Some(tempo) = timer_b_pending.take() {
                    tracing::debug!("set Timer-B on ch.A");
                    out.push_str(&format!("A C192t{}\n", tempo));
                }
            }
        }

        // X1 PSG data changes tempo on its own channels; carry it on FM channels
        if driver == DriverType::X1Psg && self.tempo.changes() > 1 {
            tracing::debug!("Use FM channel for changing tempo");
            self.loops.clear();
            for sub in 0..3 {
                let name = ChannelAssign::Fm0.channel_name(sub);
                out.push_str(&self.convert_channel(&data, 3 + sub, SoundType::DUMMY, name)?);
            }
        }

        Ok(out)
    }

    /// Convert logical channel `ch` with the given capabilities
    fn convert_channel(
        &mut self,
        data: &SoundData<'_>,
        ch: usize,
        sound: SoundType,
        name: &'static str,
    ) -> Result<String> {
        let start = data.channel_start(ch)?;
        let scanned = scan(data, start, &mut self.loops)?;
        let timebase = Timebase::detect(&scanned.histogram);
        tracing::debug!(
            "ch{} ({}) {:04x}-{:04x} {:?} {}",
            ch,
            name,
            start,
            scanned.end,
            sound,
            timebase.header()
        );

        ChannelEmitter::new(*data, &self.loops, sound, name, timebase, scanned.end)
            .with_ssg_env_macro(self.options.ssg_env_macro)
            .run(start, &mut self.tempo, &mut self.diagnostics)
    }

    /// Convert from a reader to a writer
    pub fn convert_stream<R: Read, W: Write>(&mut self, mut input: R, mut output: W) -> Result<()> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        let image = decode_image(data)?;
        let mml = self.convert(&image)?;
        output.write_all(mml.as_bytes())?;
        output.flush()?;
        Ok(())
    }

    /// Convert a sound data file to an MML file
    ///
    /// Nothing is written when the conversion fails.
    pub fn convert_file(&mut self, input: &Path, output: &Path) -> Result<()> {
        let image = load_image(input)?;
        let mml = self.convert(&image)?;
        let mut file = File::create(output).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("Can't open '{}': {}", output.display(), e),
            )
        })?;
        file.write_all(mml.as_bytes())?;
        Ok(())
    }

    /// Decode every enabled channel into a JSON-serializable structure
    pub fn dump(&self, image: &[u8]) -> Result<SoundDataJson> {
        let image = SoundData::new(image)?;
        let driver = DriverType::resolve(&image, self.options.driver)?;
        let data = driver.sound_data(&image)?;
        let layout = driver.layout();
        let mut loops = LoopMap::new();

        let mut channels = Vec::new();
        for ch in 0..CHANNEL_COUNT {
            let (sound, name) = layout.channel(ch);
            if sound.is_empty() {
                continue;
            }
            let start = data.channel_start(ch)?;
            let scanned = scan(&data, start, &mut loops)?;
            let timebase = Timebase::detect(&scanned.histogram);
            let commands = decode_track(&data, start)?
                .into_iter()
                .map(|(offset, command)| CommandJson { offset, command })
                .collect();

            channels.push(ChannelJson {
                index: ch,
                name,
                sound,
                start,
                end: scanned.end,
                clock: timebase.clock,
                default_length: timebase.default_length,
                commands,
            });
        }

        Ok(SoundDataJson { driver, channels })
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// OPN image: channel 0 and 3 streams at 0x50 / 0x58, every other
    /// channel points at an empty track at 0x60
    fn opn_image() -> Vec<u8> {
        let mut bytes = vec![0u8; 0x64];
        let pointers = [0x50u16, 0x60, 0x60, 0x58, 0x60, 0x60, 0x60, 0x60, 0x60];
        for (i, p) in pointers.iter().enumerate() {
            bytes[i * 2] = *p as u8;
            bytes[i * 2 + 1] = (*p >> 8) as u8;
        }
        bytes[0x50..0x55].copy_from_slice(&[0x30, 0x42, 0xff, 0x00, 0x00]);
        bytes[0x58..0x5d].copy_from_slice(&[0x98, 0x98, 0xff, 0x00, 0x00]);
        bytes[0x60..0x63].copy_from_slice(&[0xff, 0x00, 0x00]);
        bytes
    }

    #[test]
    fn test_convert_opn() {
        let mut converter = Converter::default();
        let mml = converter.convert(&opn_image()).unwrap();

        // two voice records between 0x10 and 0x50
        assert!(mml.starts_with("\n  @%000\n"));
        assert!(mml.contains("\n  @%001\n"));
        assert!(!mml.contains("@%002"));
        assert!(mml.contains("# *0{E$ff,$ff,$ff,$ff,$00,$ff}\n"));
        assert!(mml.contains("\nA C192l4o5d\n"));
        assert!(mml.contains("\nD C192l8rr\n"));
        assert!(!mml.contains("\nH "));
        assert!(converter.diagnostics().is_empty());
    }

    #[test]
    fn test_tags() {
        let options = ConvertOptions {
            tags: Tags {
                mucom88: Some("1.7".into()),
                title: Some("Opening".into()),
                comment: Some("test".into()),
                ..Tags::default()
            },
            ..ConvertOptions::default()
        };
        let mml = Converter::new(options).convert(&opn_image()).unwrap();
        assert!(mml.starts_with("#mucom88 1.7\n#title Opening\n#comment test\n\n"));
    }

    #[test]
    fn test_timer_b_line() {
        let options = ConvertOptions {
            timer_b_tempo: Some(200),
            ..ConvertOptions::default()
        };
        let mml = Converter::new(options).convert(&opn_image()).unwrap();
        assert!(mml.contains("\nD C192l8rr\nA C192t200\n"));
        assert_eq!(mml.matches("A C192t200").count(), 1);
    }

    #[test]
    fn test_dump() {
        let dump = Converter::default().dump(&opn_image()).unwrap();
        assert_eq!(dump.driver, DriverType::Opn);
        assert_eq!(dump.channels.len(), 6);
        assert_eq!(dump.channels[0].name, "A");
        assert_eq!(dump.channels[0].commands.len(), 2);
        assert_eq!(dump.channels[3].name, "D");
        assert_eq!(dump.channels[3].end, 0x5d);
    }
}
