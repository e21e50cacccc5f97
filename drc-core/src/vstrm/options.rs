//! VSTRM header extension options.
//!
//! The 8-byte region at header offset 8 holds a run of `tag [value]`
//! entries, terminated by the first zero tag or the end of the region.
//! Entries carry no length byte, so whether a tag is followed by a value
//! is fixed per tag (see [`tag_has_value`]).
//!
//! Rather than shifting bytes in place, the region is materialised into
//! an ordered [`ExtOptions`] list, edited, and written back whole.

use crate::error::DrcError;

/// Size of the extension-option region in bytes.
pub const EXT_OPTIONS_SIZE: usize = 8;

/// Marks a frame as an IDR (refresh) frame. Presence only.
pub const OPT_IDR: u8 = 0x80;
/// Frame rate of the stream, one value byte (see [`super::FrameRate`]).
pub const OPT_FRAME_RATE: u8 = 0x82;
/// Forces the decoder to decode every chunk. Presence only.
pub const OPT_FORCE_DECODING: u8 = 0x83;
/// Macroblock rows per chunk, one value byte.
pub const OPT_MB_ROWS_PER_CHUNK: u8 = 0x85;

/// Whether entries with this tag are followed by a value byte.
pub const fn tag_has_value(tag: u8) -> bool {
    matches!(tag, OPT_FRAME_RATE | OPT_MB_ROWS_PER_CHUNK)
}

// ── ExtOption ────────────────────────────────────────────────────

/// One `tag [value]` entry.
///
/// A valued tag found in the last byte of the region has no room for its
/// value; it decodes with `value: None` and value lookups miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtOption {
    pub tag: u8,
    pub value: Option<u8>,
}

impl ExtOption {
    /// Bytes this entry occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        1 + usize::from(self.value.is_some())
    }
}

// ── ExtOptions ───────────────────────────────────────────────────

/// Ordered list of extension options, bounded by [`EXT_OPTIONS_SIZE`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtOptions {
    entries: Vec<ExtOption>,
}

impl ExtOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the raw option region.
    pub fn decode(region: &[u8; EXT_OPTIONS_SIZE]) -> Self {
        let mut entries = Vec::new();
        let mut i = 0;
        while i < EXT_OPTIONS_SIZE {
            let tag = region[i];
            if tag == 0 {
                break;
            }
            if tag_has_value(tag) {
                entries.push(ExtOption {
                    tag,
                    value: region.get(i + 1).copied(),
                });
                i += 2;
            } else {
                entries.push(ExtOption { tag, value: None });
                i += 1;
            }
        }
        Self { entries }
    }

    /// Serialize to the raw region, zero-filling the unused tail.
    pub fn encode(&self) -> [u8; EXT_OPTIONS_SIZE] {
        let mut region = [0u8; EXT_OPTIONS_SIZE];
        let mut i = 0;
        for entry in &self.entries {
            region[i] = entry.tag;
            i += 1;
            if let Some(value) = entry.value {
                region[i] = value;
                i += 1;
            }
        }
        region
    }

    /// Bytes used by all entries.
    pub fn encoded_len(&self) -> usize {
        self.entries.iter().map(ExtOption::encoded_len).sum()
    }

    /// Bytes still free in the region.
    pub fn remaining(&self) -> usize {
        EXT_OPTIONS_SIZE - self.encoded_len()
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.entries.iter().any(|e| e.tag == tag)
    }

    /// The value byte of `tag`, if present and not truncated.
    pub fn value(&self, tag: u8) -> Option<u8> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .and_then(|e| e.value)
    }

    /// Insert `tag`, or update its value if already present.
    ///
    /// `value` must be `Some` exactly when [`tag_has_value`] holds for
    /// `tag`. Fails without modifying the list on a mismatch or when the
    /// region lacks room.
    pub fn set(&mut self, tag: u8, value: Option<u8>) -> Result<(), DrcError> {
        let expects_value = tag_has_value(tag);
        if value.is_some() != expects_value {
            return Err(DrcError::OptionValueMismatch { tag, expects_value });
        }
        match self.entries.iter().position(|e| e.tag == tag) {
            Some(idx) => {
                let Some(value) = value else {
                    return Ok(());
                };
                let grow = usize::from(self.entries[idx].value.is_none());
                self.ensure_room(tag, grow)?;
                self.entries[idx].value = Some(value);
            }
            None => {
                let entry = ExtOption { tag, value };
                self.ensure_room(tag, entry.encoded_len())?;
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Remove every entry with `tag`. Returns whether anything was removed.
    pub fn remove(&mut self, tag: u8) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.tag != tag);
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtOption> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_room(&self, tag: u8, needed: usize) -> Result<(), DrcError> {
        let available = self.remaining();
        if needed > available {
            return Err(DrcError::OptionSpaceExhausted {
                tag,
                needed,
                available,
            });
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_stops_at_zero_tag() {
        let region = [OPT_FORCE_DECODING, OPT_MB_ROWS_PER_CHUNK, 6, 0, OPT_IDR, 0, 0, 0];
        let opts = ExtOptions::decode(&region);
        assert_eq!(opts.len(), 2);
        assert!(opts.contains(OPT_FORCE_DECODING));
        assert_eq!(opts.value(OPT_MB_ROWS_PER_CHUNK), Some(6));
        assert!(!opts.contains(OPT_IDR));
    }

    #[test]
    fn valued_tag_in_last_slot_has_no_value() {
        let region = [0x83, 0x84, 0x86, 0x87, 0x88, 0x89, 0x8A, OPT_FRAME_RATE];
        let opts = ExtOptions::decode(&region);
        assert!(opts.contains(OPT_FRAME_RATE));
        assert_eq!(opts.value(OPT_FRAME_RATE), None);
        assert_eq!(opts.encode(), region);
    }

    #[test]
    fn value_byte_is_not_mistaken_for_a_tag() {
        let region = [OPT_FRAME_RATE, OPT_IDR, 0, 0, 0, 0, 0, 0];
        let opts = ExtOptions::decode(&region);
        assert_eq!(opts.value(OPT_FRAME_RATE), Some(OPT_IDR));
        assert!(!opts.contains(OPT_IDR));
    }

    #[test]
    fn set_updates_existing_value_in_place() {
        let mut opts = ExtOptions::new();
        opts.set(OPT_FORCE_DECODING, None).unwrap();
        opts.set(OPT_FRAME_RATE, Some(1)).unwrap();
        opts.set(OPT_IDR, None).unwrap();
        opts.set(OPT_FRAME_RATE, Some(3)).unwrap();

        assert_eq!(opts.encode(), [OPT_FORCE_DECODING, OPT_FRAME_RATE, 3, OPT_IDR, 0, 0, 0, 0]);
    }

    #[test]
    fn set_without_room_is_rejected_and_leaves_list_intact() {
        let mut opts = ExtOptions::new();
        for tag in [0x81, 0x84, 0x86, 0x87, 0x88, 0x89, 0x8A] {
            opts.set(tag, None).unwrap();
        }
        assert_eq!(opts.remaining(), 1);

        let err = opts.set(OPT_FRAME_RATE, Some(0)).unwrap_err();
        assert!(matches!(
            err,
            DrcError::OptionSpaceExhausted {
                tag: OPT_FRAME_RATE,
                needed: 2,
                available: 1
            }
        ));
        assert_eq!(opts.len(), 7);

        opts.set(OPT_IDR, None).unwrap();
        assert_eq!(opts.remaining(), 0);
        assert!(opts.set(0x8B, None).is_err());
    }

    #[test]
    fn set_rejects_value_on_presence_only_tag() {
        let mut opts = ExtOptions::new();
        opts.set(OPT_FORCE_DECODING, None).unwrap();

        let err = opts.set(OPT_IDR, Some(1)).unwrap_err();
        assert!(matches!(
            err,
            DrcError::OptionValueMismatch {
                tag: OPT_IDR,
                expects_value: false
            }
        ));
        assert!(!opts.contains(OPT_IDR));
        assert_eq!(opts.encode(), [OPT_FORCE_DECODING, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn set_rejects_missing_value_on_valued_tag() {
        let mut opts = ExtOptions::new();

        let err = opts.set(OPT_FRAME_RATE, None).unwrap_err();
        assert!(matches!(
            err,
            DrcError::OptionValueMismatch {
                tag: OPT_FRAME_RATE,
                expects_value: true
            }
        ));
        assert!(opts.is_empty());

        opts.set(OPT_FRAME_RATE, Some(2)).unwrap();
        assert!(opts.set(OPT_FRAME_RATE, None).is_err());
        assert_eq!(opts.value(OPT_FRAME_RATE), Some(2));
    }

    #[test]
    fn remove_compacts_and_zero_fills() {
        let region = [OPT_FORCE_DECODING, OPT_FRAME_RATE, 2, OPT_IDR, OPT_MB_ROWS_PER_CHUNK, 6, 0, 0];
        let mut opts = ExtOptions::decode(&region);

        assert!(opts.remove(OPT_FRAME_RATE));
        assert_eq!(
            opts.encode(),
            [OPT_FORCE_DECODING, OPT_IDR, OPT_MB_ROWS_PER_CHUNK, 6, 0, 0, 0, 0]
        );
        assert!(!opts.remove(OPT_FRAME_RATE));
    }

    #[test]
    fn remove_drops_adjacent_duplicates() {
        let region = [OPT_IDR, OPT_IDR, OPT_FORCE_DECODING, 0, 0, 0, 0, 0];
        let mut opts = ExtOptions::decode(&region);

        assert!(opts.remove(OPT_IDR));
        assert_eq!(opts.encode(), [OPT_FORCE_DECODING, 0, 0, 0, 0, 0, 0, 0]);
    }
}
