//! Ogg page checksum: CRC-32, polynomial 0x04C11DB7, zero initial value,
//! no reflection and no final xor.

const POLYNOMIAL: u32 = 0x04c1_1db7;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            r = if r & 0x8000_0000 != 0 {
                (r << 1) ^ POLYNOMIAL
            } else {
                r << 1
            };
            bit += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}

/// Continue a running checksum over `data`.
pub fn update(crc: u32, data: &[u8]) -> u32 {
    data.iter().fold(crc, |crc, &byte| {
        (crc << 8) ^ TABLE[(((crc >> 24) as u8) ^ byte) as usize]
    })
}

/// Checksum of a page given its header (checksum field zeroed) and body.
pub fn page_checksum(header: &[u8], body: &[u8]) -> u32 {
    update(update(0, header), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(update(0, &[]), 0);
    }

    #[test]
    fn table_entries_match_polynomial() {
        assert_eq!(TABLE[0], 0);
        assert_eq!(TABLE[1], POLYNOMIAL);
        assert_eq!(TABLE[2], POLYNOMIAL << 1);
    }

    #[test]
    fn check_value() {
        assert_eq!(update(0, b"123456789"), 0x89a1_897f);
    }

    #[test]
    fn split_update_matches_whole() {
        let data = b"OggS page checksum";
        let whole = update(0, data);
        let split = update(update(0, &data[..5]), &data[5..]);
        assert_eq!(whole, split);
    }
}
