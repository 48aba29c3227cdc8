use ahash::RandomState;

/// Hasher with fixed keys, so containers behave identically across runs.
pub(crate) fn fixed_hasher() -> RandomState {
    RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
}
pub(crate) type HashMap<K, V> = std::collections::HashMap<K, V, RandomState>;

pub mod iterated_tabu;
