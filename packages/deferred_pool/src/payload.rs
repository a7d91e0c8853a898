/// What a pooled object is told when it is taken from its pool.
#[derive(Debug)]
#[non_exhaustive]
pub struct TakeFromPoolPayload<'a, P> {
    /// The payload of the request that took the object, for example its placement.
    pub payload: &'a P,

    /// `true` if the object was constructed for this request, `false` if an inactive object was
    /// reused.
    pub is_new_spawned: bool,
}

impl<'a, P> TakeFromPoolPayload<'a, P> {
    /// A payload for an object constructed to satisfy the request.
    #[must_use]
    pub const fn new_spawned(payload: &'a P) -> Self {
        Self {
            payload,
            is_new_spawned: true,
        }
    }

    /// A payload for an inactive object reused to satisfy the request.
    #[must_use]
    pub const fn reused(payload: &'a P) -> Self {
        Self {
            payload,
            is_new_spawned: false,
        }
    }
}
