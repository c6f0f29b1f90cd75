//! Bitmap engine: 64-bit presence vectors for data elements 1..=128.
//!
//! Two fixed vectors of 64 booleans: index `i` of the primary vector is
//! data element `i + 1`, index `i` of the secondary vector is `i + 65`.
//! Presence of the secondary bitmap is itself signaled through primary
//! bit 0 (data element 1). Hex rendering is a strict 64-bit to 16-digit
//! packing, MSB first: vector bit 0 is the most significant bit of the
//! first nibble.

/// Presence state for one in-flight message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmaps {
    pub primary: [bool; 64],
    pub secondary: [bool; 64],
}

impl Default for Bitmaps {
    fn default() -> Self {
        Bitmaps {
            primary: [false; 64],
            secondary: [false; 64],
        }
    }
}

impl Bitmaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that data element `field_number` (1..=128) is populated.
    ///
    /// Secondary-range elements also force primary bit 0 true, since the
    /// secondary bitmap's presence is carried by data element 1.
    pub fn mark_present(&mut self, field_number: u8) {
        match field_number {
            1..=64 => self.primary[field_number as usize - 1] = true,
            65..=128 => {
                self.secondary[field_number as usize - 65] = true;
                self.primary[0] = true;
            }
            _ => {}
        }
    }

    pub fn clear(&mut self) {
        self.primary = [false; 64];
        self.secondary = [false; 64];
    }

    /// True iff some primary bit is set *and* the corresponding data
    /// element is actually populated according to `populated`. A set bit
    /// with no stored value does not count as active.
    pub fn has_active_primary(&self, populated: impl Fn(u8) -> bool) -> bool {
        (0..64).any(|i| self.primary[i] && populated(i as u8 + 1))
    }

    /// Secondary analogue of [`Bitmaps::has_active_primary`], over 65..=128.
    pub fn has_active_secondary(&self, populated: impl Fn(u8) -> bool) -> bool {
        (0..64).any(|i| self.secondary[i] && populated(i as u8 + 65))
    }
}

/// Pack a 64-bit boolean vector into 16 uppercase hex digits, MSB first.
pub fn render_hex(bits: &[bool; 64]) -> String {
    let mut out = String::with_capacity(16);
    for nibble in bits.chunks(4) {
        let mut v = 0u8;
        for (i, &bit) in nibble.iter().enumerate() {
            if bit {
                v |= 1 << (3 - i);
            }
        }
        out.push(char::from_digit(v as u32, 16).unwrap_or('0').to_ascii_uppercase());
    }
    out
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BitmapHexError {
    #[error("Bitmap hex must be 16 digits, got {0}")]
    BadLength(usize),
    #[error("Bitmap hex has non-hex digit {0:?}")]
    BadDigit(char),
}

/// Inverse of [`render_hex`]: recover the 64 presence bits from 16 hex digits.
pub fn presence_from_hex(hex: &str) -> Result<[bool; 64], BitmapHexError> {
    if hex.chars().count() != 16 {
        return Err(BitmapHexError::BadLength(hex.chars().count()));
    }
    let mut bits = [false; 64];
    for (i, c) in hex.chars().enumerate() {
        let v = c.to_digit(16).ok_or(BitmapHexError::BadDigit(c))? as u8;
        for j in 0..4 {
            bits[i * 4 + j] = v & (1 << (3 - j)) != 0;
        }
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bitmap_renders_zeroes() {
        assert_eq!(render_hex(&[false; 64]), "0000000000000000");
    }

    #[test]
    fn first_bit_is_msb_of_first_nibble() {
        let mut bits = [false; 64];
        bits[0] = true;
        assert_eq!(render_hex(&bits), "8000000000000000");
    }

    #[test]
    fn secondary_range_forces_primary_bit_zero() {
        let mut bm = Bitmaps::new();
        bm.mark_present(70);
        assert!(bm.primary[0]);
        assert!(bm.secondary[5]);
    }

    #[test]
    fn hex_round_trip_recovers_bits() {
        let mut bits = [false; 64];
        for n in [0usize, 1, 3, 21, 40, 62, 63] {
            bits[n] = true;
        }
        let hex = render_hex(&bits);
        assert_eq!(presence_from_hex(&hex).expect("round trip"), bits);
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert_eq!(
            presence_from_hex("00000000"),
            Err(BitmapHexError::BadLength(8))
        );
        assert_eq!(
            presence_from_hex("000000000000000G"),
            Err(BitmapHexError::BadDigit('G'))
        );
    }
}
