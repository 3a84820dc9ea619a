//! Extraction of an implementation address from a raw 32-byte word.
//!
//! Most proxies keep the implementation right-aligned in its slot (or return
//! it ABI-encoded from a getter), so the address is simply the rightmost 20
//! bytes. Some proxies pack the address next to flags or other metadata; for
//! those the registry entry carries a byte `offset` counted from the right
//! edge of the word.

use alloy::primitives::{Address, B256};

use crate::error::ScanError;

const WORD_BYTES: usize = 32;
const ADDRESS_BYTES: usize = 20;

/// Largest byte offset that still fits a whole address into the word.
pub const MAX_OFFSET: u32 = (WORD_BYTES - ADDRESS_BYTES) as u32;

/// Returns the address stored in bytes `[offset, offset + 20)` of `word`,
/// counted from the right. No offset means the rightmost 20 bytes.
pub fn extract_address(word: &B256, offset: Option<u32>) -> Result<Address, ScanError> {
    let offset = offset.unwrap_or_default();
    if offset > MAX_OFFSET {
        return Err(ScanError::InvalidOffset(offset));
    }
    let end = WORD_BYTES - offset as usize;
    Ok(Address::from_slice(&word[end - ADDRESS_BYTES..end]))
}

/// Returns the first word of a getter's return data.
pub fn first_word(data: &[u8]) -> Result<B256, ScanError> {
    if data.len() < WORD_BYTES {
        return Err(ScanError::ShortReturn(data.len()));
    }
    Ok(B256::from_slice(&data[..WORD_BYTES]))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use super::*;

    #[test]
    fn test_rightmost_address_without_offset() {
        let word = b256!("0x000000000000000000000000abc123000000000000000000000000000000beef");
        assert_eq!(
            extract_address(&word, None).unwrap(),
            address!("0xabc123000000000000000000000000000000beef")
        );
        assert_eq!(extract_address(&word, Some(0)).unwrap(), extract_address(&word, None).unwrap());
    }

    #[test]
    fn test_address_is_lowercase_hex_of_last_40_chars() {
        let word = b256!("0x0000000000000000000000005D4Aa78B08Bc7C530e21bf7447988b1Be7991322");
        let extracted = format!("{:#x}", extract_address(&word, None).unwrap());
        let hex = format!("{word:#x}");
        assert_eq!(extracted, format!("0x{}", &hex[26..]));
        assert_eq!(extracted, "0x5d4aa78b08bc7c530e21bf7447988b1be7991322");
    }

    #[test]
    fn test_packed_address_with_offset() {
        // 1 byte of flags on the right, address right above it
        let word = b256!("0x0000000000000000000000111111111111111111111111111111111111111101");
        assert_eq!(
            extract_address(&word, Some(1)).unwrap(),
            address!("0x1111111111111111111111111111111111111111")
        );

        // Matches the character slice `66 - 2 * (o + 20) .. 66 - 2 * o`
        let word = b256!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa2222222222222222222222bb");
        let hex = format!("{word:#x}");
        for o in 0..=MAX_OFFSET as usize {
            let expected = format!("0x{}", &hex[66 - 2 * (o + 20)..66 - 2 * o]);
            let actual = extract_address(&word, Some(o as u32)).unwrap();
            assert_eq!(format!("{actual:#x}"), expected);
        }
    }

    #[test]
    fn test_offset_at_left_edge() {
        let word = b256!("0x3333333333333333333333333333333333333333000000000000000000000000");
        assert_eq!(
            extract_address(&word, Some(12)).unwrap(),
            address!("0x3333333333333333333333333333333333333333")
        );
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(matches!(extract_address(&B256::ZERO, Some(13)), Err(ScanError::InvalidOffset(13))));
        assert!(matches!(
            extract_address(&B256::ZERO, Some(u32::MAX)),
            Err(ScanError::InvalidOffset(u32::MAX))
        ));
    }

    #[test]
    fn test_first_word() {
        let mut data = vec![0u8; 64];
        data[31] = 0x42;
        data[63] = 0x99;
        assert_eq!(first_word(&data).unwrap()[31], 0x42);
        assert!(matches!(first_word(&data[..20]), Err(ScanError::ShortReturn(20))));
    }
}
