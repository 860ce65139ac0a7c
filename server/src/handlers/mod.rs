//! Tool handlers. Each takes typed params and answers from one snapshot.

pub mod capability;
pub mod navigation;
pub mod objects;
pub mod validation;

pub use capability::*;
pub use navigation::*;
pub use objects::*;
pub use validation::*;

use crate::error::{ServerError, ServerResult};
use flexdex_core::Tier;

/// Parse an optional tier argument. `"all"` and absence mean no filter.
pub(crate) fn parse_tier(value: Option<&str>) -> ServerResult<Option<Tier>> {
    match value {
        None | Some("all") | Some("") => Ok(None),
        Some(s) => s
            .parse::<Tier>()
            .map(Some)
            .map_err(|e| ServerError::invalid("tier", e)),
    }
}

/// Reject zero and negative result limits.
pub(crate) fn positive_limit(value: Option<i64>, default: usize) -> ServerResult<usize> {
    match value {
        None => Ok(default),
        Some(n) if n > 0 => Ok(n as usize),
        Some(n) => Err(ServerError::invalid(
            "max_results",
            format!("must be positive, got {n}"),
        )),
    }
}
