use std::io::{ErrorKind, Read};

use crate::error::Result;

/// Comparison block size.
pub const COMPARE_BLOCK: usize = 64 * 1024;

/// Byte-for-byte equality.
///
/// Lengths are checked before any content is touched. Content is compared
/// block by block; the loop ends on the shorter of the two remaining slices,
/// so a trailing partial block is compared like any other.
pub fn bitwise_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut off = 0usize;
    while off < a.len() {
        let end = (off + COMPARE_BLOCK).min(a.len());
        if a[off..end] != b[off..end] {
            return false;
        }
        off = end;
    }
    true
}

/// Offset of the first differing byte, or the shorter length when one input
/// is a strict prefix of the other. `None` when equal.
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<u64> {
    let common = a.len().min(b.len());
    let mut off = 0usize;
    while off < common {
        let end = (off + COMPARE_BLOCK).min(common);
        if let Some(i) = a[off..end]
            .iter()
            .zip(&b[off..end])
            .position(|(x, y)| x != y)
        {
            return Some((off + i) as u64);
        }
        off = end;
    }
    if a.len() != b.len() {
        Some(common as u64)
    } else {
        None
    }
}

/// Fill `buf` as far as the reader allows. Returns the number of bytes read;
/// anything short of `buf.len()` means end of stream.
fn read_block<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Streaming block comparison of two readers.
pub fn readers_equal<A: Read, B: Read>(mut a: A, mut b: B) -> Result<bool> {
    let mut ba = vec![0u8; COMPARE_BLOCK];
    let mut bb = vec![0u8; COMPARE_BLOCK];
    loop {
        let na = read_block(&mut a, &mut ba)?;
        let nb = read_block(&mut b, &mut bb)?;
        if na != nb || ba[..na] != bb[..nb] {
            return Ok(false);
        }
        // both streams ended on the same (possibly partial) block
        if na < COMPARE_BLOCK {
            return Ok(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_is_unequal() {
        assert!(!bitwise_equal(b"abc", b"abcd"));
        assert_eq!(first_difference(b"abc", b"abcd"), Some(3));
    }

    #[test]
    fn empty_inputs_are_equal() {
        assert!(bitwise_equal(b"", b""));
        assert_eq!(first_difference(b"", b""), None);
        assert!(readers_equal(&b""[..], &b""[..]).unwrap());
    }

    #[test]
    fn difference_in_trailing_partial_block() {
        let a = vec![3u8; COMPARE_BLOCK * 2 + 5];
        let mut b = a.clone();
        let last = b.len() - 1;
        b[last] = 4;
        assert!(!bitwise_equal(&a, &b));
        assert_eq!(first_difference(&a, &b), Some(last as u64));
        assert!(!readers_equal(&a[..], &b[..]).unwrap());
    }

    #[test]
    fn exact_block_multiple() {
        let a = vec![9u8; COMPARE_BLOCK * 3];
        assert!(bitwise_equal(&a, &a.clone()));
        assert!(readers_equal(&a[..], &a[..]).unwrap());
    }

    #[test]
    fn readers_with_different_lengths() {
        let a = vec![1u8; COMPARE_BLOCK];
        let b = vec![1u8; COMPARE_BLOCK + 1];
        assert!(!readers_equal(&a[..], &b[..]).unwrap());
        assert!(!readers_equal(&b[..], &a[..]).unwrap());
    }
}
