use proptest::prelude::*;

use overlay_transactions::{compute_merkle_root, MerklePath, Transaction};
use overlay_types::TxId;

proptest! {
    /// Arbitrary bytes never panic the parser.
    #[test]
    fn parser_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Transaction::from_bytes(&bytes);
    }

    /// Every leaf of a random block proves against the block root.
    #[test]
    fn merkle_paths_prove_against_root(
        seeds in prop::collection::vec(prop::array::uniform32(0u8..), 1..40),
        pick in any::<prop::sample::Index>(),
    ) {
        let leaves: Vec<TxId> = seeds.into_iter().map(TxId::new).collect();
        let i = pick.index(leaves.len());
        let path = MerklePath::from_leaves(&leaves, i, 1).unwrap();
        prop_assert_eq!(path.compute_root(&leaves[i]), compute_merkle_root(&leaves));
    }
}
