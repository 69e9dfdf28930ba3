//! Wrap-aware comparison of 16-bit sequence numbers.
//!
//! Sequence numbers (packet sequences, message ids, block ids) all wrap
//! around at `u16::MAX`. A naive `a > b` comparison breaks the moment a
//! connection has been alive long enough to wrap once, so every ordering
//! predicate in this crate goes through [`greater_than`]/[`less_than`]
//! instead of the built-in integer comparison.

/// Returns `true` iff `a` is "after" `b` in sequence order, accounting for
/// wraparound at 65536.
///
/// Two incompatible definitions of this predicate existed in the source this
/// crate is modeled on: a naive one and a wrap-aware one. This crate keeps
/// only the wrap-aware definition.
#[must_use]
pub fn greater_than(a: u16, b: u16) -> bool {
    let a = i32::from(a);
    let b = i32::from(b);
    (a > b && a - b <= 32768) || (a < b && b - a > 32768)
}

/// Dual of [`greater_than`]: `true` iff `a` is "before" `b`.
#[must_use]
pub fn less_than(a: u16, b: u16) -> bool {
    greater_than(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duality_and_equality() {
        for a in [0u16, 1, 32767, 32768, 32769, 65535] {
            for b in [0u16, 1, 32767, 32768, 32769, 65535] {
                assert_eq!(greater_than(a, b), less_than(b, a));
                if a == b {
                    assert!(!greater_than(a, b));
                    assert!(!less_than(a, b));
                }
            }
        }
    }

    #[test]
    fn wraps_around() {
        assert!(greater_than(1, 0));
        assert!(greater_than(0, 65535));
        assert!(less_than(65535, 0));
        assert!(!greater_than(32768, 0));
        assert!(greater_than(0, 32769));
    }
}
