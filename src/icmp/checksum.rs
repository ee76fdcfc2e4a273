/// One's-complement Internet checksum (RFC 1071).
///
/// Words are read big-endian; a trailing odd byte is the high byte of a
/// final word. The checksum field must be zero while computing an outgoing
/// packet. Summing a complete packet that already carries its checksum
/// yields zero.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(u16::from_be_bytes([word[0], word[1]])));
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last) << 8);
    }

    // Fold twice: the first fold can itself carry.
    sum = (sum >> 16) + (sum & 0xFFFF);
    sum += sum >> 16;

    !(sum as u16)
}
