#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Checksum primitives for block-based delta generation.
//!
//! The crate exposes the two rolling weak checksums used to locate candidate
//! blocks (the classic two-half sum and the RabinKarp polynomial hash)
//! together with the strong digests (MD4 and keyed BLAKE2b) used to confirm
//! them. Higher layers select the concrete variants from the stream magic and
//! compose them through [`WeakSum`] and the [`StrongDigest`] trait.

mod rolling;
pub mod strong;

pub use rolling::{RabinKarp, RollingSum, Rollsum, WeakSum};
pub use strong::{Blake2bKeyed, Md4, StrongDigest};
