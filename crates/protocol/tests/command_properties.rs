//! Property tests for the command codec.

use proptest::prelude::*;
use protocol::{Command, OpKind, PROTOTAB};

/// Interesting magnitudes around every width boundary.
fn param_values() -> impl Strategy<Value = u64> {
    prop_oneof![
        1u64..=0x40,
        0x41u64..=0xFF,
        0x100u64..=0xFFFF,
        0x1_0000u64..=0xFFFF_FFFF,
        0x1_0000_0000u64..=u64::MAX,
    ]
}

fn minimal_width(value: u64) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFFFF_FFFF => 4,
        _ => 8,
    }
}

proptest! {
    #[test]
    fn literal_headers_round_trip_minimally(len in param_values()) {
        let encoded = Command::Literal { len }.encode();
        let (decoded, consumed) = Command::decode(encoded.as_bytes()).unwrap();

        prop_assert_eq!(decoded, Command::Literal { len });
        prop_assert_eq!(consumed, encoded.len());

        let expected = if len <= 0x40 { 1 } else { 1 + minimal_width(len) };
        prop_assert_eq!(encoded.len(), expected);
    }

    #[test]
    fn copy_headers_round_trip_minimally(offset in prop_oneof![Just(0u64), param_values()], len in param_values()) {
        let encoded = Command::Copy { offset, len }.encode();
        let (decoded, consumed) = Command::decode(encoded.as_bytes()).unwrap();

        prop_assert_eq!(decoded, Command::Copy { offset, len });
        prop_assert_eq!(consumed, encoded.len());
        prop_assert_eq!(encoded.len(), 1 + minimal_width(offset) + minimal_width(len));
    }

    #[test]
    fn every_assigned_byte_decodes_and_every_reserved_byte_fails(cmd in any::<u8>()) {
        let entry = &PROTOTAB[cmd as usize];
        let mut bytes = vec![cmd];
        // Nonzero parameter bytes so length checks pass.
        bytes.extend(std::iter::repeat(0x01).take(entry.total_size() - 1));

        match entry.kind {
            OpKind::Reserved | OpKind::Signature => {
                prop_assert!(Command::decode(&bytes).is_err());
            }
            _ => {
                let (_, consumed) = Command::decode(&bytes).unwrap();
                prop_assert_eq!(consumed, entry.total_size());
            }
        }
    }
}
