//! End-to-end tests: signature -> load -> delta -> patch.

use std::io::Cursor;

use engine::{
    delta_file, load_signature_file, patch_file, signature_file, JobError,
};
use protocol::{Command, Magic};
use signature::{Signature, SignatureLayout};

fn sig_bytes(old: &[u8], magic: Magic, block_len: u32, strong_len: u32) -> Vec<u8> {
    let layout = SignatureLayout::new(magic, block_len, strong_len).unwrap();
    let mut out = Vec::new();
    signature_file(&mut Cursor::new(old), &mut out, layout).unwrap();
    out
}

fn load_indexed(sig: &[u8]) -> Signature {
    let (mut table, _) = load_signature_file(&mut Cursor::new(sig)).unwrap();
    table.build_index();
    table
}

fn delta_bytes(table: &Signature, new: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    delta_file(table, &mut Cursor::new(new), &mut out).unwrap();
    out
}

fn patch_bytes(old: &[u8], delta: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    patch_file(Cursor::new(old), &mut Cursor::new(delta), &mut out).unwrap();
    out
}

fn round_trip(old: &[u8], new: &[u8], magic: Magic, block_len: u32, strong_len: u32) {
    let sig = sig_bytes(old, magic, block_len, strong_len);
    let table = load_indexed(&sig);
    let delta = delta_bytes(&table, new);
    let recovered = patch_bytes(old, &delta);
    assert_eq!(
        recovered, new,
        "round trip failed for magic {magic:?}, block_len {block_len}"
    );
}

/// Deterministic pseudo-random bytes.
fn prng_bytes(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        out.push((seed >> 33) as u8);
    }
    out
}

/// Parses the command headers of a delta, skipping literal payloads.
fn commands_of(delta: &[u8]) -> Vec<Command> {
    assert_eq!(&delta[..4], &Magic::Delta.to_bytes());
    let mut commands = Vec::new();
    let mut pos = 4;
    loop {
        let (command, consumed) = Command::decode(&delta[pos..]).unwrap();
        pos += consumed;
        if let Command::Literal { len } = command {
            pos += usize::try_from(len).unwrap();
        }
        commands.push(command);
        if command == Command::End {
            assert_eq!(pos, delta.len(), "bytes after END");
            return commands;
        }
    }
}

const ALL_SIG_MAGICS: [Magic; 4] = [
    Magic::Md4Sig,
    Magic::Blake2Sig,
    Magic::RkMd4Sig,
    Magic::RkBlake2Sig,
];

#[test]
fn round_trip_identical_files() {
    let data = prng_bytes(10_000, 1);
    for magic in ALL_SIG_MAGICS {
        round_trip(&data, &data, magic, 512, 8);
    }
}

#[test]
fn round_trip_disjoint_files() {
    let old = prng_bytes(8_000, 2);
    let new = prng_bytes(9_000, 3);
    round_trip(&old, &new, Magic::RkBlake2Sig, 512, 8);
}

#[test]
fn round_trip_shared_prefix() {
    let old = prng_bytes(8_192, 4);
    let mut new = old[..5_000].to_vec();
    new.extend_from_slice(&prng_bytes(3_000, 5));
    round_trip(&old, &new, Magic::RkBlake2Sig, 512, 8);
}

#[test]
fn round_trip_shared_suffix() {
    let old = prng_bytes(8_192, 6);
    let mut new = prng_bytes(3_000, 7);
    new.extend_from_slice(&old[2_000..]);
    round_trip(&old, &new, Magic::RkBlake2Sig, 512, 8);
}

#[test]
fn round_trip_shared_interior_run_crossing_blocks() {
    let old = prng_bytes(8_192, 8);
    let mut new = prng_bytes(1_000, 9);
    // An old-file run that straddles several 512-byte block boundaries.
    new.extend_from_slice(&old[700..4_300]);
    new.extend_from_slice(&prng_bytes(1_000, 10));
    round_trip(&old, &new, Magic::RkBlake2Sig, 512, 8);
}

#[test]
fn round_trip_empty_old() {
    round_trip(b"", b"hello", Magic::RkBlake2Sig, 4, 8);
}

#[test]
fn round_trip_empty_new() {
    round_trip(b"hello", b"", Magic::RkBlake2Sig, 4, 8);
}

#[test]
fn round_trip_both_empty() {
    round_trip(b"", b"", Magic::RkBlake2Sig, 2048, 12);
}

#[test]
fn round_trip_block_len_one() {
    round_trip(b"abcabc", b"cababcab", Magic::RkBlake2Sig, 1, 4);
}

#[test]
fn signature_stream_bytes_are_exact() {
    let sig = sig_bytes(b"abcdefgh", Magic::RkBlake2Sig, 4, 8);

    let mut expected = Vec::new();
    expected.extend_from_slice(b"rs\x01G");
    expected.extend_from_slice(&4u32.to_be_bytes());
    expected.extend_from_slice(&8u32.to_be_bytes());
    // Block "abcd": RabinKarp weak sum, keyed BLAKE2b strong sum prefix.
    expected.extend_from_slice(&0x238b_d873u32.to_be_bytes());
    expected.extend_from_slice(&[0xc2, 0xe3, 0x33, 0x99, 0x02, 0xb3, 0x95, 0x42]);
    // Block "efgh".
    expected.extend_from_slice(&0xf0e7_b5e3u32.to_be_bytes());
    expected.extend_from_slice(&[0xb3, 0x99, 0x9e, 0x28, 0x33, 0x13, 0x9a, 0x9c]);

    assert_eq!(sig, expected);
}

#[test]
fn identical_files_collapse_to_one_copy() {
    // Two adjacent block matches must fuse into a single COPY command.
    let sig = sig_bytes(b"abcdefgh", Magic::RkBlake2Sig, 4, 8);
    let table = load_indexed(&sig);
    let delta = delta_bytes(&table, b"abcdefgh");

    assert_eq!(
        delta,
        [0x72, 0x73, 0x02, 0x36, 0x45, 0x00, 0x08, 0x00],
        "expected magic + COPY(0, 8) + END"
    );
}

#[test]
fn changed_prefix_becomes_literal_plus_copy() {
    let sig = sig_bytes(b"abcdefgh", Magic::RkBlake2Sig, 4, 8);
    let table = load_indexed(&sig);
    let delta = delta_bytes(&table, b"XYcdefgh");

    // The damaged first block is emitted literally up to the next aligned
    // match; "efgh" is recognised as block 1.
    let mut expected = vec![0x72, 0x73, 0x02, 0x36];
    expected.extend_from_slice(&[0x04]);
    expected.extend_from_slice(b"XYcd");
    expected.extend_from_slice(&[0x45, 0x04, 0x04]);
    expected.push(0x00);
    assert_eq!(delta, expected);

    assert_eq!(patch_bytes(b"abcdefgh", &delta), b"XYcdefgh");
}

#[test]
fn empty_old_yields_pure_literal_delta() {
    let sig = sig_bytes(b"", Magic::RkBlake2Sig, 4, 8);
    let table = load_indexed(&sig);
    assert_eq!(table.block_count(), 0);

    let delta = delta_bytes(&table, b"hello");
    let mut expected = vec![0x72, 0x73, 0x02, 0x36, 0x05];
    expected.extend_from_slice(b"hello");
    expected.push(0x00);
    assert_eq!(delta, expected);
}

#[test]
fn empty_new_yields_bare_end() {
    let sig = sig_bytes(b"hello", Magic::RkBlake2Sig, 4, 8);
    let table = load_indexed(&sig);

    let delta = delta_bytes(&table, b"");
    assert_eq!(delta, [0x72, 0x73, 0x02, 0x36, 0x00]);
    assert_eq!(patch_bytes(b"hello", &delta), b"");
}

#[test]
fn single_flipped_byte_in_a_large_file() {
    let old = prng_bytes(1_000_000, 11);
    let mut new = old.clone();
    new[500_000] ^= 0xFF;

    let sig = sig_bytes(&old, Magic::RkBlake2Sig, 1024, 8);
    let table = load_indexed(&sig);
    let delta = delta_bytes(&table, &new);

    // Everything before the damaged block, the damaged block as one literal,
    // everything after it (including the short final block) as one copy.
    let commands = commands_of(&delta);
    assert_eq!(
        commands,
        vec![
            Command::Copy { offset: 0, len: 499_712 },
            Command::Literal { len: 1024 },
            Command::Copy { offset: 500_736, len: 499_264 },
            Command::End,
        ]
    );

    assert_eq!(patch_bytes(&old, &delta), new);
}

#[test]
fn shared_short_final_block_is_copied() {
    // 10 bytes with block_len 4: blocks "abcd", "efgh", "ij". A new file
    // ending in the same short tail reuses it.
    let old = b"abcdefghij";
    let sig = sig_bytes(old, Magic::RkBlake2Sig, 4, 8);
    let table = load_indexed(&sig);

    let delta = delta_bytes(&table, b"XXabcdefghij");
    let commands = commands_of(&delta);
    assert_eq!(
        commands,
        vec![
            Command::Literal { len: 2 },
            Command::Copy { offset: 0, len: 10 },
            Command::End,
        ]
    );
    assert_eq!(patch_bytes(old, &delta), b"XXabcdefghij");
}

#[test]
fn loader_rejects_foreign_magic() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
    stream.extend_from_slice(&[0u8; 32]);

    let err = load_signature_file(&mut Cursor::new(&stream)).unwrap_err();
    assert!(matches!(err, JobError::BadMagic { found: 0xDEAD_BEEF }));
}

#[test]
fn loader_rejects_delta_magic() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&Magic::Delta.to_bytes());
    stream.extend_from_slice(&[0u8; 8]);

    let err = load_signature_file(&mut Cursor::new(&stream)).unwrap_err();
    assert!(matches!(err, JobError::BadMagic { .. }));
}

#[test]
fn loader_rejects_out_of_range_header() {
    // block_len of zero is structurally impossible.
    let mut stream = Vec::new();
    stream.extend_from_slice(&Magic::RkBlake2Sig.to_bytes());
    stream.extend_from_slice(&0u32.to_be_bytes());
    stream.extend_from_slice(&8u32.to_be_bytes());

    let err = load_signature_file(&mut Cursor::new(&stream)).unwrap_err();
    assert!(matches!(err, JobError::Corrupt { .. }));

    // strong_len beyond the digest width.
    let mut stream = Vec::new();
    stream.extend_from_slice(&Magic::RkMd4Sig.to_bytes());
    stream.extend_from_slice(&2048u32.to_be_bytes());
    stream.extend_from_slice(&17u32.to_be_bytes());

    let err = load_signature_file(&mut Cursor::new(&stream)).unwrap_err();
    assert!(matches!(err, JobError::Corrupt { .. }));
}

#[test]
fn loader_reports_truncated_entries() {
    let mut sig = sig_bytes(b"abcdefgh", Magic::RkBlake2Sig, 4, 8);
    sig.truncate(sig.len() - 5);

    let err = load_signature_file(&mut Cursor::new(&sig)).unwrap_err();
    assert!(matches!(err, JobError::InputEnded));
}

#[test]
fn patch_rejects_non_delta_streams() {
    let sig = sig_bytes(b"abcdefgh", Magic::RkBlake2Sig, 4, 8);
    let mut out = Vec::new();
    let err = patch_file(Cursor::new(b"abcdefgh"), &mut Cursor::new(&sig), &mut out).unwrap_err();
    assert!(matches!(err, JobError::BadMagic { .. }));
    assert!(out.is_empty());
}

#[test]
fn patch_rejects_reserved_opcodes() {
    let mut delta = Magic::Delta.to_bytes().to_vec();
    delta.push(0x55);

    let mut out = Vec::new();
    let err = patch_file(Cursor::new(b"basis"), &mut Cursor::new(&delta), &mut out).unwrap_err();
    assert!(matches!(err, JobError::Corrupt { .. }));
}

#[test]
fn patch_reports_truncated_deltas() {
    let sig = sig_bytes(b"abcdefgh", Magic::RkBlake2Sig, 4, 8);
    let table = load_indexed(&sig);
    let mut delta = delta_bytes(&table, b"abcdefgh");
    delta.pop(); // drop END
    delta.pop(); // and part of the COPY header

    let mut out = Vec::new();
    let err = patch_file(Cursor::new(b"abcdefgh"), &mut Cursor::new(&delta), &mut out).unwrap_err();
    assert!(matches!(err, JobError::InputEnded));
}

#[test]
fn patch_rejects_copies_beyond_the_basis() {
    // COPY(1000, 4) against a 5-byte basis: the read callback has nothing to
    // return, which the applier reports as corruption.
    let mut delta = Magic::Delta.to_bytes().to_vec();
    delta.extend_from_slice(&[0x49, 0x03, 0xE8, 0x04]);
    delta.push(0x00);

    let mut out = Vec::new();
    let err = patch_file(Cursor::new(b"hello"), &mut Cursor::new(&delta), &mut out).unwrap_err();
    assert!(matches!(err, JobError::Corrupt { .. }));
}

#[test]
fn delta_requires_a_built_index() {
    let sig = sig_bytes(b"abcdefgh", Magic::RkBlake2Sig, 4, 8);
    let (table, _) = load_signature_file(&mut Cursor::new(&sig)).unwrap();

    let err = engine::DeltaJob::new(&table).unwrap_err();
    assert!(matches!(err, JobError::Param { .. }));
}

#[test]
fn delta_statistics_account_for_every_output_byte() {
    let old = prng_bytes(20_000, 12);
    let mut new = prng_bytes(2_000, 13);
    new.extend_from_slice(&old[4_096..12_288]);
    new.extend_from_slice(&prng_bytes(500, 14));

    let sig = sig_bytes(&old, Magic::RkBlake2Sig, 1024, 8);
    let table = load_indexed(&sig);

    let mut job = engine::DeltaJob::new(&table).unwrap();
    let mut out = vec![0u8; 1 << 16];
    let mut buffers = engine::Buffers::new(&new, &mut out, true);
    let status = job.iter(&mut buffers).unwrap();
    assert_eq!(status, engine::Status::Done);

    let stats = job.statistics();
    assert_eq!(stats.lit_bytes + stats.copy_bytes, new.len() as u64);
    assert_eq!(stats.in_bytes, new.len() as u64);
    assert_eq!(stats.out_bytes, buffers.produced() as u64);
    assert!(stats.copy_cmds >= 1);
    assert_eq!(stats.block_len, 1024);
}

#[test]
fn signature_statistics_count_blocks() {
    let data = prng_bytes(10_000, 15);
    let layout = SignatureLayout::new(Magic::RkBlake2Sig, 1024, 8).unwrap();
    let mut out = Vec::new();
    let stats = signature_file(&mut Cursor::new(&data), &mut out, layout).unwrap();

    assert_eq!(stats.sig_blocks, 10); // ceil(10000 / 1024)
    assert_eq!(stats.sig_bytes, 10 * 12);
    assert_eq!(stats.out_bytes, out.len() as u64);
    assert_eq!(stats.in_bytes, data.len() as u64);
}
