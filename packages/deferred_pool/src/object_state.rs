/// The state of an object with respect to its pool.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "intentionally narrow, accepting the risk"
)]
pub enum PoolObjectState {
    /// The object is not handled by any pool.
    #[default]
    None,

    /// The object is registered in its pool, free and ready to be taken.
    Inactive,

    /// The object was taken from its pool and can be returned.
    Active,
}
