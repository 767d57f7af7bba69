//! Insert/copy command byte stream.
//!
//! ```text
//! command := literal_cmd | copy_cmd
//! X byte: bit7=0 -> literal, bit7=1 -> copy
//! length: (X&64)==0 -> len = X&63                  (0..63)
//!         otherwise -> len = ((X&63)<<8) + Y + 64   (64..16447)
//! literal_cmd := X[,Y] then `len` literal bytes
//! copy_cmd    := X[,Y] then a distance:
//!   R < 128      -> [R][B1][B2] dictionary word, transform R,
//!                   word index (B1<<8)+B2, word length = copy length
//!   R&192 == 128 -> [R][Q] distance ((R&63)<<8)+Q
//!   R >= 192     -> [R][S1][S2][S3] distance ((R&63)<<24)+(S1<<16)+(S2<<8)+S3+16384
//! ```

use tcmplx_core::{Error, Result};

/// Longest literal run or copy a single command can carry.
pub const MAX_COMMAND_LEN: usize = 16447;

/// Largest distance the 30-bit form can carry.
pub const MAX_DISTANCE: usize = (1 << 30) - 1 + 16384;

const COPY_FLAG: u8 = 0x80;
const LONG_FLAG: u8 = 0x40;
const SHORT_LEN_LIMIT: usize = 64;
const SHORT_DIST_LIMIT: usize = 16384;

/// One decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Literal bytes to emit as-is.
    Literal(&'a [u8]),
    /// Repeat `length` bytes starting `distance` bytes back.
    Copy { length: usize, distance: usize },
    /// Emit a transformed built-in dictionary word of `length` bytes.
    Dictionary {
        length: usize,
        index: u16,
        transform: u8,
    },
}

fn put_length(out: &mut Vec<u8>, flag: u8, len: usize) {
    if len < SHORT_LEN_LIMIT {
        out.push(flag | len as u8);
    } else {
        let v = len - SHORT_LEN_LIMIT;
        out.push(flag | LONG_FLAG | (v >> 8) as u8);
        out.push(v as u8);
    }
}

fn check_length(length: usize) -> Result<()> {
    if length == 0 || length > MAX_COMMAND_LEN {
        return Err(Error::param(format!(
            "command length {} not in 1..={}",
            length, MAX_COMMAND_LEN
        )));
    }
    Ok(())
}

/// Append literal commands for `bytes`, splitting runs longer than
/// [`MAX_COMMAND_LEN`].
pub fn push_literals(out: &mut Vec<u8>, bytes: &[u8]) {
    for chunk in bytes.chunks(MAX_COMMAND_LEN) {
        put_length(out, 0, chunk.len());
        out.extend_from_slice(chunk);
    }
}

/// Append a copy command.
pub fn push_copy(out: &mut Vec<u8>, length: usize, distance: usize) -> Result<()> {
    check_length(length)?;
    if distance == 0 || distance > MAX_DISTANCE {
        return Err(Error::param(format!("copy distance {} out of range", distance)));
    }
    put_length(out, COPY_FLAG, length);
    if distance < SHORT_DIST_LIMIT {
        out.push(0x80 | (distance >> 8) as u8);
        out.push(distance as u8);
    } else {
        let v = distance - SHORT_DIST_LIMIT;
        out.push(0xC0 | (v >> 24) as u8);
        out.push((v >> 16) as u8);
        out.push((v >> 8) as u8);
        out.push(v as u8);
    }
    Ok(())
}

/// Append a dictionary reference command.
pub fn push_dictionary(out: &mut Vec<u8>, length: usize, index: u16, transform: u8) -> Result<()> {
    check_length(length)?;
    if transform >= 128 {
        return Err(Error::param(format!("transform {} out of range", transform)));
    }
    put_length(out, COPY_FLAG, length);
    out.push(transform);
    out.push((index >> 8) as u8);
    out.push(index as u8);
    Ok(())
}

/// Parse a command stream.
pub fn parse(data: &[u8]) -> Commands<'_> {
    Commands { data, pos: 0 }
}

/// Iterator over a command stream, see [`parse`].
#[derive(Debug, Clone)]
pub struct Commands<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Commands<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.data.len() {
            self.pos = self.data.len();
            return Err(Error::sanitize_at("truncated command", self.data.len()));
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn next_command(&mut self) -> Result<Command<'a>> {
        let x = self.take(1)?[0];
        let len = if x & LONG_FLAG == 0 {
            (x & 63) as usize
        } else {
            let y = self.take(1)?[0];
            (((x & 63) as usize) << 8) + y as usize + SHORT_LEN_LIMIT
        };
        if x & COPY_FLAG == 0 {
            return Ok(Command::Literal(self.take(len)?));
        }
        let r = self.take(1)?[0];
        if r < 0x80 {
            let b = self.take(2)?;
            Ok(Command::Dictionary {
                length: len,
                index: ((b[0] as u16) << 8) | b[1] as u16,
                transform: r,
            })
        } else if r < 0xC0 {
            let q = self.take(1)?[0];
            Ok(Command::Copy {
                length: len,
                distance: (((r & 63) as usize) << 8) + q as usize,
            })
        } else {
            let s = self.take(3)?;
            Ok(Command::Copy {
                length: len,
                distance: (((r & 63) as usize) << 24)
                    + ((s[0] as usize) << 16)
                    + ((s[1] as usize) << 8)
                    + s[2] as usize
                    + SHORT_DIST_LIMIT,
            })
        }
    }
}

impl<'a> Iterator for Commands<'a> {
    type Item = Result<Command<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        Some(self.next_command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(data: &[u8]) -> Vec<Command<'_>> {
        parse(data).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_short_literal_layout() {
        let mut out = Vec::new();
        push_literals(&mut out, b"Abc");
        assert_eq!(out, [0x03, 0x41, 0x62, 0x63]);
        assert_eq!(collect(&out), vec![Command::Literal(b"Abc")]);
    }

    #[test]
    fn test_short_copy_layout() {
        let mut out = Vec::new();
        push_copy(&mut out, 3, 1).unwrap();
        assert_eq!(out, [0x83, 0x80, 0x01]);
    }

    #[test]
    fn test_long_forms() {
        let mut out = Vec::new();
        push_copy(&mut out, 64, 16384).unwrap();
        assert_eq!(out, [0xC0, 0x00, 0xC0, 0x00, 0x00, 0x00]);

        out.clear();
        push_copy(&mut out, MAX_COMMAND_LEN, MAX_DISTANCE).unwrap();
        assert_eq!(out, [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            collect(&out),
            vec![Command::Copy {
                length: MAX_COMMAND_LEN,
                distance: MAX_DISTANCE
            }]
        );
    }

    #[test]
    fn test_dictionary_layout() {
        let mut out = Vec::new();
        push_dictionary(&mut out, 5, 0x0102, 9).unwrap();
        assert_eq!(out, [0x85, 0x09, 0x01, 0x02]);
        assert_eq!(
            collect(&out),
            vec![Command::Dictionary {
                length: 5,
                index: 0x0102,
                transform: 9
            }]
        );
        assert!(push_dictionary(&mut out, 5, 0, 128).is_err());
    }

    #[test]
    fn test_literal_run_split() {
        let data = vec![7u8; MAX_COMMAND_LEN + 10];
        let mut out = Vec::new();
        push_literals(&mut out, &data);
        let cmds = collect(&out);
        assert_eq!(cmds.len(), 2);
        match (cmds[0], cmds[1]) {
            (Command::Literal(a), Command::Literal(b)) => {
                assert_eq!(a.len(), MAX_COMMAND_LEN);
                assert_eq!(b.len(), 10);
            }
            other => panic!("unexpected commands {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut out = Vec::new();
        assert!(push_copy(&mut out, 0, 1).is_err());
        assert!(push_copy(&mut out, 3, 0).is_err());
        assert!(push_copy(&mut out, MAX_COMMAND_LEN + 1, 1).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated_stream() {
        let result: Result<Vec<_>> = parse(&[0x83, 0x80]).collect();
        assert!(matches!(result, Err(Error::Sanitize(_))));
        let result: Result<Vec<_>> = parse(&[0x05, b'a']).collect();
        assert!(result.is_err());
    }
}
