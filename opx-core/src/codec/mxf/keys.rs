//! SMPTE UL key recognition tables (spec §4.5).
//!
//! Every MXF key starts with the four-byte FourCC `06 0E 2B 34`. Recognition
//! matches the remaining twelve bytes against two tables by longest prefix:
//! the specific essence-key table first, then the generic key table.

/// Kind a 16-byte MXF key resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    TimecodeComponent,
    System,
    Data,
    Video,
    Audio,
    Unknown,
}

impl KeyType {
    /// Fixed filename suffix used by `extract` mode (spec §4.5).
    pub fn extract_suffix(&self) -> &'static str {
        match self {
            KeyType::Data => "_d",
            KeyType::Video => "_v",
            KeyType::System => "_s",
            KeyType::TimecodeComponent => "_t",
            KeyType::Audio => "_a",
            KeyType::Unknown => "_u",
        }
    }
}

pub const FOURCC: [u8; 4] = [0x06, 0x0E, 0x2B, 0x34];

/// Specific essence-container element keys, tried before the generic table.
pub const ESSENCE_KEYS: &[(&[u8], KeyType)] = &[
    (&[0x01, 0x02, 0x01, 0x01, 0x0D, 0x01, 0x03, 0x01, 0x15, 0x01, 0x05, 0x00], KeyType::Video),
    (&[0x01, 0x02, 0x01, 0x01, 0x0D, 0x01, 0x03, 0x01, 0x16, 0x01, 0x01, 0x00], KeyType::Audio),
    (&[0x01, 0x02, 0x01, 0x01, 0x0D, 0x01, 0x03, 0x01, 0x17, 0x01, 0x01, 0x00], KeyType::Data),
];

/// Generic structural/descriptive metadata keys.
pub const GENERIC_KEYS: &[(&[u8], KeyType)] = &[
    (&[0x02, 0x53, 0x01, 0x01, 0x0D, 0x01, 0x01, 0x01, 0x01, 0x01, 0x14, 0x00], KeyType::TimecodeComponent),
    (&[0x02, 0x05, 0x01, 0x01, 0x0D, 0x01, 0x03, 0x01, 0x14, 0x02, 0x00, 0x00], KeyType::System),
];

fn longest_prefix_match(rest: &[u8], table: &[(&[u8], KeyType)]) -> Option<(usize, KeyType)> {
    table
        .iter()
        .filter(|(prefix, _)| rest.starts_with(prefix))
        .map(|(prefix, ty)| (prefix.len(), *ty))
        .max_by_key(|(len, _)| *len)
}

/// Classifies a 16-byte MXF key, matching by longest prefix across the
/// essence table then the generic table. The FourCC itself is excluded
/// from matching.
pub fn classify(key: &[u8; 16]) -> KeyType {
    if key[0..4] != FOURCC {
        return KeyType::Unknown;
    }
    let rest = &key[4..];
    if let Some((_, ty)) = longest_prefix_match(rest, ESSENCE_KEYS) {
        return ty;
    }
    if let Some((_, ty)) = longest_prefix_match(rest, GENERIC_KEYS) {
        return ty;
    }
    KeyType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_from_rest(rest: &[u8]) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[0..4].copy_from_slice(&FOURCC);
        key[4..4 + rest.len()].copy_from_slice(rest);
        key
    }

    #[test]
    fn recognises_timecode_component() {
        let key = key_from_rest(GENERIC_KEYS[0].0);
        assert_eq!(classify(&key), KeyType::TimecodeComponent);
    }

    #[test]
    fn recognises_system_pack() {
        let key = key_from_rest(GENERIC_KEYS[1].0);
        assert_eq!(classify(&key), KeyType::System);
    }

    #[test]
    fn non_fourcc_key_is_unknown() {
        let key = [0xFFu8; 16];
        assert_eq!(classify(&key), KeyType::Unknown);
    }

    #[test]
    fn unrecognised_fourcc_prefixed_key_is_unknown() {
        let key = key_from_rest(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(classify(&key), KeyType::Unknown);
    }
}
