//! Property tests for the signature table lookup.

use checksums::RollingSum;
use proptest::prelude::*;
use protocol::Magic;
use signature::{weak_sum_for, MatchOutcome, Signature, SignatureLayout};

fn build_table(data: &[u8], block_len: u32) -> Signature {
    let layout = SignatureLayout::new(Magic::RkBlake2Sig, block_len, 8).unwrap();
    let mut sig = Signature::new(layout);
    for chunk in data.chunks(block_len as usize) {
        let mut weak = weak_sum_for(Magic::RkBlake2Sig).unwrap();
        weak.update(chunk);
        let strong = sig.algorithm().compute(chunk);
        sig.push_block(weak.digest(), &strong[..8]);
    }
    sig.build_index();
    sig
}

proptest! {
    #[test]
    fn every_block_resolves_to_a_match(
        data in proptest::collection::vec(any::<u8>(), 1..2048),
        block_seed in any::<u32>(),
    ) {
        let block_len = 1 + block_seed % 64;
        let sig = build_table(&data, block_len);

        prop_assert_eq!(
            sig.block_count() as u64,
            (data.len() as u64).div_ceil(u64::from(block_len))
        );

        for (number, chunk) in data.chunks(block_len as usize).enumerate() {
            let mut weak = weak_sum_for(Magic::RkBlake2Sig).unwrap();
            weak.update(chunk);
            match sig.find_match_bytes(weak.digest(), chunk) {
                // Identical blocks legitimately resolve to an earlier twin.
                MatchOutcome::Match(found) => prop_assert!(found as usize <= number),
                other => prop_assert!(false, "block {} unresolved: {:?}", number, other),
            }
        }
    }

    #[test]
    fn rebuilding_the_index_changes_nothing(
        data in proptest::collection::vec(any::<u8>(), 1..1024),
    ) {
        let mut sig = build_table(&data, 32);
        let chunk = &data[..data.len().min(32)];
        let mut weak = weak_sum_for(Magic::RkBlake2Sig).unwrap();
        weak.update(chunk);

        let before = sig.find_match_bytes(weak.digest(), chunk);
        sig.build_index();
        prop_assert_eq!(sig.find_match_bytes(weak.digest(), chunk), before);
    }

    #[test]
    fn windows_absent_from_the_basis_never_match(
        data in proptest::collection::vec(1u8..=255, 64..512),
    ) {
        let sig = build_table(&data, 16);

        // A window of zero bytes cannot occur in the all-nonzero basis.
        let absent = [0u8; 16];
        let mut weak = weak_sum_for(Magic::RkBlake2Sig).unwrap();
        weak.update(&absent);

        prop_assert!(!matches!(
            sig.find_match_bytes(weak.digest(), &absent),
            MatchOutcome::Match(_)
        ));
    }
}
