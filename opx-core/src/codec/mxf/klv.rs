//! KLV (Key-Length-Value) walker (spec §4.5).

use crate::error::{OpxError, Result};
use std::io::Read;

/// One walked KLV unit. `length_bytes` preserves the exact encoded BER
/// length so that re-emitted output is byte-identical in key+length+value.
#[derive(Debug, Clone)]
pub struct KlvUnit {
    pub key: [u8; 16],
    pub length_bytes: Vec<u8>,
    pub length: u64,
    pub value: Vec<u8>,
}

impl KlvUnit {
    /// Total bytes this unit occupies in the file: key + encoded length +
    /// value (testable property 6, spec §8).
    pub fn encoded_len(&self) -> u64 {
        16 + self.length_bytes.len() as u64 + self.length
    }
}

/// Decodes a BER length: short form (high bit 0, value is the byte itself)
/// or long form (low 7 bits give a follow-on byte count `n`, 1 <= n <= 8,
/// the big-endian value of the next `n` bytes).
pub fn read_ber_length<R: Read>(reader: &mut R) -> Result<(u64, Vec<u8>)> {
    let mut first = [0u8; 1];
    reader.read_exact(&mut first)?;
    let first = first[0];

    if first & 0x80 == 0 {
        return Ok((first as u64, vec![first]));
    }

    let n = first & 0x7F;
    if n == 0 || n > 8 {
        return Err(OpxError::structural(format!(
            "BER long-form length follow-on count {n} out of range (1..=8)"
        )));
    }

    let mut bytes = vec![first];
    let mut value: u64 = 0;
    let mut follow = vec![0u8; n as usize];
    reader.read_exact(&mut follow)?;
    for b in follow {
        bytes.push(b);
        value = (value << 8) | b as u64;
    }
    Ok((value, bytes))
}

/// Reads one KLV unit from `reader`. Returns `Ok(None)` at a clean end of
/// stream (no bytes of the key could be read).
pub fn read_unit<R: Read>(reader: &mut R) -> Result<Option<KlvUnit>> {
    let mut key = [0u8; 16];
    match reader.read_exact(&mut key) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let (length, length_bytes) = read_ber_length(reader)?;
    let mut value = vec![0u8; length as usize];
    reader.read_exact(&mut value)?;

    Ok(Some(KlvUnit {
        key,
        length_bytes,
        length,
        value,
    }))
}

/// Walks every KLV unit in `reader` to end of stream.
pub fn walk<R: Read>(reader: &mut R) -> Result<Vec<KlvUnit>> {
    let mut units = Vec::new();
    while let Some(unit) = read_unit(reader)? {
        units.push(unit);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_unit(key: [u8; 16], value: &[u8]) -> Vec<u8> {
        let mut out = key.to_vec();
        out.push(value.len() as u8); // short-form BER
        out.extend_from_slice(value);
        out
    }

    #[test]
    fn short_form_ber_length_round_trips() {
        let data = encode_unit([1u8; 16], b"hello");
        let mut cursor = Cursor::new(data);
        let unit = read_unit(&mut cursor).unwrap().unwrap();
        assert_eq!(unit.length, 5);
        assert_eq!(unit.value, b"hello");
    }

    #[test]
    fn long_form_ber_length_decodes_big_endian() {
        let mut data = vec![2u8; 16];
        data.push(0x82); // long form, 2 follow-on bytes
        data.push(0x01);
        data.push(0x00); // 0x0100 = 256
        data.extend(vec![0xAB; 256]);
        let mut cursor = Cursor::new(data);
        let unit = read_unit(&mut cursor).unwrap().unwrap();
        assert_eq!(unit.length, 256);
        assert_eq!(unit.value.len(), 256);
    }

    #[test]
    fn follow_on_count_over_eight_is_an_error() {
        let mut data = vec![3u8; 16];
        data.push(0x89); // n = 9, invalid
        let mut cursor = Cursor::new(data);
        assert!(read_unit(&mut cursor).is_err());
    }

    #[test]
    fn encoded_len_sums_key_length_value() {
        let data = encode_unit([4u8; 16], b"abc");
        let mut cursor = Cursor::new(data.clone());
        let unit = read_unit(&mut cursor).unwrap().unwrap();
        assert_eq!(unit.encoded_len(), data.len() as u64);
    }

    #[test]
    fn walk_reads_multiple_consecutive_units() {
        let mut data = encode_unit([5u8; 16], b"one");
        data.extend(encode_unit([6u8; 16], b"two"));
        let mut cursor = Cursor::new(data);
        let units = walk(&mut cursor).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].value, b"two");
    }
}
