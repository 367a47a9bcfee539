//! Text to N88-BASIC program image
//!
//! Every input line becomes a `:'` comment line, so a score can travel
//! inside a BASIC program and be read back by MUCOM88 on the real machine.

use crate::error::{Error, Result};
use std::io::BufRead;

/// Line number of the first line
pub const FIRST_LINE_NUMBER: u16 = 1000;
/// Line number increment
pub const LINE_NUMBER_STEP: u16 = 10;
/// `:` + `'` (REM) tokens starting every line body
const COMMENT_PREFIX: [u8; 3] = [0x3a, 0x8f, 0xe9];
/// Longest line the converter accepts, terminator included
const MAX_LINE: usize = 1024;
const MAX_PROGRAM: usize = 0x10000;

/// Build an N88-BASIC program image from text lines
pub fn text_to_basic<R: BufRead>(input: R) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut line_number = FIRST_LINE_NUMBER;

    // lines are copied byte for byte, Shift-JIS included
    for line in input.split(b'\n') {
        let line = line?;
        // the line ends at the first CR
        let text = match line.iter().position(|&b| b == b'\r') {
            Some(cr) => &line[..cr],
            None => &line[..],
        };
        let len = text.len() + 1;
        if len > MAX_LINE {
            return Err(Error::Basic(format!(
                "line {} too long ({} bytes)",
                line_number,
                text.len()
            )));
        }

        // link addresses are for a program loaded one byte past the text area start
        let next = buf.len() + len + 8;
        if next > MAX_PROGRAM {
            return Err(Error::Basic("program too large".into()));
        }
        buf.extend_from_slice(&(next as u16).to_le_bytes());
        buf.extend_from_slice(&line_number.to_le_bytes());
        buf.extend_from_slice(&COMMENT_PREFIX);
        buf.extend_from_slice(text);
        buf.push(0x00);

        line_number = line_number.wrapping_add(LINE_NUMBER_STEP);
    }

    if buf.is_empty() {
        return Err(Error::Basic("no input lines".into()));
    }

    // the final terminator is left out of the image
    buf.pop();
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_two_lines() {
        let image = text_to_basic(Cursor::new("AB\r\nC\n")).unwrap();
        assert_eq!(
            image,
            vec![
                0x0b, 0x00, 0xe8, 0x03, 0x3a, 0x8f, 0xe9, b'A', b'B', 0x00, //
                0x14, 0x00, 0xf2, 0x03, 0x3a, 0x8f, 0xe9, b'C',
            ]
        );
    }

    #[test]
    fn test_empty_line_kept() {
        let image = text_to_basic(Cursor::new("\nX\n")).unwrap();
        assert_eq!(&image[..8], &[0x09, 0x00, 0xe8, 0x03, 0x3a, 0x8f, 0xe9, 0x00]);
        assert_eq!(&image[8..10], &[0x12, 0x00]);
    }

    #[test]
    fn test_shift_jis_line() {
        let image = text_to_basic(Cursor::new(&b"#title \x83\x65\x83\x58\x83\x67\r\nA\n"[..])).unwrap();
        assert_eq!(&image[..4], &[0x16, 0x00, 0xe8, 0x03]);
        assert_eq!(&image[7..20], b"#title \x83\x65\x83\x58\x83\x67");
        assert_eq!(image[20], 0x00);
        assert_eq!(&image[21..25], &[0x1f, 0x00, 0xf2, 0x03]);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            text_to_basic(Cursor::new("")),
            Err(Error::Basic(_))
        ));
    }
}
