// Wheel controller frame format
//
// Frame: [ID, V0(3), V1(3), V2(3), V3(3), Checksum] = 14 bytes
// Value: [int high, int low, sign|hundredths]
//   - integer part of |v| as big-endian u16
//   - bit 7 set when v <= 0, bits 0-6 hold the hundredths (0-99)
// Checksum: low byte of the sum of the 13 preceding bytes

use super::FrameError;

pub const FRAME_LEN: usize = 14;
pub const VALUES_PER_FRAME: usize = 4;

/// Frame IDs
pub const COMMAND_FRAME_ID: u8 = 0;
pub const ORIENTATION_RATE_ID: u8 = 1;
pub const RAW_RATE_ID: u8 = 2;

const SIGN_BIT: u8 = 0b1000_0000;

/// Sum checksum over everything but the trailing checksum byte
pub fn checksum(frame: &[u8]) -> u8 {
    let body = &frame[..frame.len().saturating_sub(1)];
    let sum: u32 = body.iter().map(|&b| b as u32).sum();
    (sum & 0xFF) as u8
}

/// Encode one value into its 3-byte form
pub fn encode_value(value: f32) -> [u8; 3] {
    let magnitude = value.abs().min(u16::MAX as f32);
    let int_part = magnitude as u16;
    let hundredths = ((magnitude - int_part as f32) * 100.0) as u8;

    let mut sign_decimal = hundredths & !SIGN_BIT;
    if value <= 0.0 {
        sign_decimal |= SIGN_BIT;
    }

    let [high, low] = int_part.to_be_bytes();
    [high, low, sign_decimal]
}

/// Decode a 3-byte value
pub fn decode_value(bytes: [u8; 3]) -> f32 {
    let int_part = u16::from_be_bytes([bytes[0], bytes[1]]) as f32;
    let hundredths = (bytes[2] & !SIGN_BIT) as f32 / 100.0;
    let magnitude = int_part + hundredths;
    if bytes[2] & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Build a complete frame with checksum
pub fn encode_frame(id: u8, values: [f32; VALUES_PER_FRAME]) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = id;
    for (i, value) in values.iter().enumerate() {
        let offset = 1 + i * 3;
        frame[offset..offset + 3].copy_from_slice(&encode_value(*value));
    }
    frame[FRAME_LEN - 1] = checksum(&frame);
    frame
}

/// Validate length and checksum, returning the ID and the four values
pub fn decode_frame(frame: &[u8]) -> Result<(u8, [f32; VALUES_PER_FRAME]), FrameError> {
    if frame.len() != FRAME_LEN {
        return Err(FrameError::Length {
            expected: FRAME_LEN,
            actual: frame.len(),
        });
    }

    let expected = checksum(frame);
    let actual = frame[FRAME_LEN - 1];
    if expected != actual {
        return Err(FrameError::Checksum { expected, actual });
    }

    let mut values = [0.0f32; VALUES_PER_FRAME];
    for (i, value) in values.iter_mut().enumerate() {
        let offset = 1 + i * 3;
        *value = decode_value([frame[offset], frame[offset + 1], frame[offset + 2]]);
    }
    Ok((frame[0], values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        // 1 + 2 + 250 + 10 = 263 -> 0x07, last byte ignored
        assert_eq!(checksum(&[1, 2, 250, 10, 0xAA]), 7);
    }

    #[test]
    fn test_value_encoding() {
        assert_eq!(encode_value(1200.0), [0x04, 0xB0, 0]);
        assert_eq!(encode_value(3.25), [0, 3, 25]);
        assert_eq!(encode_value(-3.25), [0, 3, 25 | SIGN_BIT]);
        // Zero carries the sign bit
        assert_eq!(encode_value(0.0), [0, 0, SIGN_BIT]);
        // Out of range magnitude saturates
        assert_eq!(encode_value(70000.0), [0xFF, 0xFF, 0]);
        assert_eq!(encode_value(-70000.0), [0xFF, 0xFF, SIGN_BIT]);
    }

    #[test]
    fn test_out_of_range_value_decodes_to_limit() {
        assert_eq!(decode_value(encode_value(70000.0)), 65535.0);
        assert_eq!(decode_value(encode_value(65535.5)), 65535.0);
        assert_eq!(decode_value(encode_value(-1e9)), -65535.0);
    }

    #[test]
    fn test_value_decoding() {
        assert_eq!(decode_value([0x04, 0xB0, 0]), 1200.0);
        assert!((decode_value([0, 3, 25 | SIGN_BIT]) + 3.25).abs() < 1e-6);
        assert_eq!(decode_value([0, 0, SIGN_BIT]), 0.0);
    }

    #[test]
    fn test_frame_layout() {
        let frame = encode_frame(ORIENTATION_RATE_ID, [1.0, 2.5, -3.0, 400.0]);
        assert_eq!(frame.len(), FRAME_LEN);
        assert_eq!(frame[0], ORIENTATION_RATE_ID);
        assert_eq!(&frame[1..4], &[0, 1, 0]);
        assert_eq!(&frame[4..7], &[0, 2, 50]);
        assert_eq!(&frame[7..10], &[0, 3, SIGN_BIT]);
        assert_eq!(&frame[10..13], &[0x01, 0x90, 0]);
        assert_eq!(frame[13], checksum(&frame));

        let (id, values) = decode_frame(&frame).unwrap();
        assert_eq!(id, ORIENTATION_RATE_ID);
        assert_eq!(values, [1.0, 2.5, -3.0, 400.0]);
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let mut frame = encode_frame(RAW_RATE_ID, [1.0, 1.0, 1.0, 1.0]);
        frame[5] ^= 0x01;
        assert!(matches!(decode_frame(&frame), Err(FrameError::Checksum { .. })));
    }

    #[test]
    fn test_decode_rejects_short_frame() {
        let frame = encode_frame(RAW_RATE_ID, [0.0; 4]);
        assert!(matches!(
            decode_frame(&frame[..10]),
            Err(FrameError::Length {
                expected: FRAME_LEN,
                actual: 10
            })
        ));
    }
}
