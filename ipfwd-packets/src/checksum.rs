/// RFC 1071 one's complement sum over `data`, folded to 16 bits but not complemented.
/// An odd trailing byte is padded with a zero on the right.
pub fn ones_complement_sum(data: &[u8]) -> u16 {
    let mut chunks = data.chunks_exact(2);
    let mut sum = chunks
        .by_ref()
        .fold(0u32, |acc, x| acc + u32::from(u16::from_be_bytes([x[0], x[1]])));
    if let Some(&last) = chunks.remainder().first() {
        sum += u32::from(last) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    sum as u16
}

/// Internet checksum of `data`, ready to be written into a header.
///
/// The checksum field inside `data` must be zero when computing a fresh value. Running this
/// over a region that already carries a valid checksum yields zero.
pub fn internet_checksum(data: &[u8]) -> u16 {
    !ones_complement_sum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    // IPv4 header from RFC 1071 style worked examples, checksum 0xb861
    const HEADER: [u8; 20] = [
        0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0xb8, 0x61, 0xc0, 0xa8, 0x00,
        0x01, 0xc0, 0xa8, 0x00, 0xc7,
    ];

    #[test]
    fn recompute_matches_carried_checksum() {
        let mut header = HEADER;
        header[10] = 0;
        header[11] = 0;
        assert_eq!(internet_checksum(&header), 0xb861);
    }

    #[test]
    fn valid_region_sums_to_zero() {
        assert_eq!(internet_checksum(&HEADER), 0);
    }

    #[test]
    fn corrupted_byte_changes_checksum() {
        for idx in 0..HEADER.len() {
            if idx == 10 || idx == 11 {
                continue;
            }
            let mut header = HEADER;
            header[idx] ^= 0x5a;
            header[10] = 0;
            header[11] = 0;
            assert_ne!(internet_checksum(&header), 0xb861, "byte {}", idx);
        }
    }

    #[test]
    fn odd_length() {
        assert_eq!(ones_complement_sum(&[0x01]), 0x0100);
        assert_eq!(ones_complement_sum(&[0x00, 0x01, 0xf2]), 0xf201);
    }

    #[test]
    fn carries_wrap_around() {
        assert_eq!(ones_complement_sum(&[0xff, 0xff, 0x00, 0x02]), 0x0002);
    }

    #[test]
    fn empty() {
        assert_eq!(internet_checksum(&[]), 0xffff);
    }
}
