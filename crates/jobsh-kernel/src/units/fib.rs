//! fib: the nth fibonacci number, computed iteratively.

use num_bigint::BigUint;

use super::{UnitError, WorkOutcome};

/// Compute the `nth` fibonacci number, where the 1st is 0 and the 2nd is 1.
///
/// Values are arbitrary precision, so large `nth` is CPU-bound for a long
/// time. `cancelled` is polled once per iteration.
pub fn fibonacci(nth: u64, cancelled: impl Fn() -> bool) -> Result<WorkOutcome, UnitError> {
    if nth == 0 {
        return Err(UnitError::InvalidArgument(
            "fibonacci index must be at least 1".to_string(),
        ));
    }

    let mut current = BigUint::from(0u8);
    let mut next = BigUint::from(1u8);

    for _ in 1..nth {
        if cancelled() {
            tracing::debug!(nth, "fibonacci cancelled");
            return Ok(WorkOutcome::Cancelled);
        }
        let sum = &current + &next;
        current = std::mem::replace(&mut next, sum);
    }

    Ok(WorkOutcome::Done(format!(
        "The {} fibonacci number is {current}",
        ordinal(nth)
    )))
}

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st.
pub fn ordinal(n: u64) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
