//! FM voice table dump and SSG envelope presets

use crate::data::SoundData;
use crate::error::Result;
use std::fmt::Write;

/// Distance between two FM voice records
pub const VOICE_STRIDE: usize = 0x20;

/// SSG software envelope presets selected by the instrument command
pub const SSG_ENVELOPES: [[u8; 6]; 12] = [
    [0xff, 0xff, 0xff, 0xff, 0x00, 0xff],
    [0xff, 0xff, 0xff, 0xc8, 0x00, 0x0a],
    [0xff, 0xff, 0xff, 0xc8, 0x01, 0x0a],
    [0xff, 0xff, 0xff, 0xbe, 0x00, 0x0a],
    [0xff, 0xff, 0xff, 0xbe, 0x01, 0x0a],
    [0xff, 0xff, 0xff, 0xbe, 0x04, 0x0a],
    [0xff, 0xff, 0xff, 0xbe, 0x0a, 0x0a],
    [0xff, 0xff, 0xff, 0x01, 0xff, 0xff],
    [0xff, 0xff, 0xff, 0xff, 0x01, 0x0a],
    [0x64, 0x64, 0xff, 0xff, 0x01, 0x0a],
    [0x28, 0x02, 0xff, 0xf0, 0x00, 0x0a],
    [0xff, 0xff, 0xff, 0xc8, 0x01, 0x28],
];

/// MUCOM88 macro definitions `*0` .. `*11` for the SSG envelope presets
pub fn ssg_envelope_macros() -> String {
    let mut out = String::new();
    for (i, env) in SSG_ENVELOPES.iter().enumerate() {
        let fields: Vec<String> = env.iter().map(|v| format!("${:02x}", v)).collect();
        out.push_str(&format!("# *{}{{E{}}}\n", i, fields.join(",")));
    }
    out
}

/// Number of voice records between `voice_offset` and the first channel's data
pub fn voice_count(data: &SoundData<'_>, voice_offset: usize) -> Result<usize> {
    let first = data.word(0)? as usize;
    Ok(first.saturating_sub(voice_offset) / VOICE_STRIDE)
}

/// Write every FM voice record as a MUCOM88 `@%` voice definition
pub fn write_voices(out: &mut String, data: &SoundData<'_>, voice_offset: usize) -> Result<()> {
    let count = voice_count(data, voice_offset)?;
    tracing::debug!("{} voices at {:04x}", count, voice_offset);

    for i in 0..count {
        write_voice(out, i, data.bytes(voice_offset + i * VOICE_STRIDE, 25)?)?;
    }
    Ok(())
}

fn write_voice(out: &mut String, num: usize, record: &[u8]) -> Result<()> {
    writeln!(out, "  @%{:03}", num)?;
    // DT/ML, TL, KS/AR, DR, SR, SL/RR
    for row in record[..24].chunks(4) {
        writeln!(
            out,
            "  ${:03X},${:03X},${:03X},${:03X}",
            row[0], row[1], row[2], row[3]
        )?;
    }
    // FB/AL
    writeln!(out, "  ${:03X}", record[24])?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssg_envelope_macros() {
        let text = ssg_envelope_macros();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "# *0{E$ff,$ff,$ff,$ff,$00,$ff}");
        assert_eq!(lines[9], "# *9{E$64,$64,$ff,$ff,$01,$0a}");
        assert_eq!(lines[11], "# *11{E$ff,$ff,$ff,$c8,$01,$28}");
    }

    #[test]
    fn test_write_voices() {
        // channel 0 data at 0x40: one voice at 0x20
        let mut bytes = vec![0u8; 0x42];
        bytes[0] = 0x40;
        for i in 0..25 {
            bytes[0x20 + i] = i as u8;
        }
        bytes[0x20 + 24] = 0x3c;
        let data = SoundData::new(&bytes).unwrap();

        let mut out = String::new();
        write_voices(&mut out, &data, 0x20).unwrap();
        assert_eq!(
            out,
            "  @%000\n\
             \x20 $000,$001,$002,$003\n\
             \x20 $004,$005,$006,$007\n\
             \x20 $008,$009,$00A,$00B\n\
             \x20 $00C,$00D,$00E,$00F\n\
             \x20 $010,$011,$012,$013\n\
             \x20 $014,$015,$016,$017\n\
             \x20 $03C\n\
             \n"
        );
    }

    #[test]
    fn test_no_voices_before_table() {
        let bytes = [0x10, 0x00];
        let data = SoundData::new(&bytes).unwrap();
        assert_eq!(voice_count(&data, 0x20).unwrap(), 0);
    }
}
