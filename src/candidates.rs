//! First-match-wins over an ordered list of candidates.
//!
//! Container selection, per-field lookup and endpoint selection all try a
//! fixed priority list and keep the first candidate that produces a value.

use std::future::Future;

/// Return the first value produced by `probe`, trying candidates in order.
pub fn first_match<C, T>(
    candidates: impl IntoIterator<Item = C>,
    mut probe: impl FnMut(C) -> Option<T>,
) -> Option<T> {
    candidates.into_iter().find_map(|c| probe(c))
}

/// Like [`first_match`] but skips values that are blank after trimming.
pub fn first_non_empty<C>(
    candidates: impl IntoIterator<Item = C>,
    mut probe: impl FnMut(C) -> Option<String>,
) -> Option<String> {
    first_match(candidates, |c| {
        probe(c)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Async form: await each attempt in order and return the first success
/// together with the candidate that produced it.
///
/// Attempts run strictly one after another. When every candidate fails the
/// collected errors are returned in candidate order.
///
/// # Errors
///
/// Returns every attempt's error when no candidate succeeds.
pub async fn first_ok<C, T, E, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
) -> Result<(C, T), Vec<E>>
where
    F: FnMut(&C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut errors = Vec::new();
    for candidate in candidates {
        match attempt(&candidate).await {
            Ok(value) => return Ok((candidate, value)),
            Err(e) => errors.push(e),
        }
    }
    Err(errors)
}
