use serde::Deserialize;

use crate::Error;

/// Determines where a spawn request is placed in the spawn queue of its pool.
///
/// Priorities are ordered from lowest to highest: `Normal < Medium < High < Critical`.
/// Requests of equal priority are always processed in the order they were made.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
#[expect(
    clippy::exhaustive_enums,
    reason = "the four priorities are the whole ordering, callers match on all of them"
)]
pub enum SpawnPriority {
    /// Appended to the end of the queue. Suitable for most requests.
    #[default]
    Normal,

    /// Processed after all `High` requests but before any `Normal` request.
    Medium,

    /// Processed before all `Medium` and `Normal` requests, on the next tick if the per-tick
    /// budget allows. Other requests are delayed accordingly.
    High,

    /// Processed immediately, inside the call that makes the request, without ever entering the
    /// queue. Avoid for bulk requests: every such request is constructed synchronously.
    Critical,
}

impl TryFrom<u8> for SpawnPriority {
    type Error = Error;

    /// Converts a raw priority value, where `1` is [`Normal`][Self::Normal] and `4` is
    /// [`Critical`][Self::Critical]. Any other value is rejected.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Normal),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            4 => Ok(Self::Critical),
            _ => Err(Error::UnknownPriority(value)),
        }
    }
}
