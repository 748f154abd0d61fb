//! Random reference generation.
//!
//! Transfer legs are paired by a shared reference of the form `TRF-` followed
//! by ten uppercase alphanumerics. Loans get a `LN-` reference of the same
//! shape.

use std::fmt;

use rand::Rng;

/// Prefix shared by every transfer reference.
pub const TRANSFER_PREFIX: &str = "TRF-";

/// Prefix shared by every loan number.
pub const LOAN_PREFIX: &str = "LN-";

/// Number of random characters after the prefix.
pub const REFERENCE_LEN: usize = 10;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces unique-enough human readable references.
pub trait ReferenceGenerator: Send + Sync + fmt::Debug {
    /// Returns a fresh transfer reference (`TRF-XXXXXXXXXX`).
    fn transfer_reference(&self) -> String;

    /// Returns a fresh loan number (`LN-XXXXXXXXXX`).
    fn loan_number(&self) -> String;
}

/// Thread-local RNG backed generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReferenceGenerator;

impl RandomReferenceGenerator {
    fn token(prefix: &str) -> String {
        let mut rng = rand::rng();
        let mut out = String::with_capacity(prefix.len() + REFERENCE_LEN);
        out.push_str(prefix);
        for _ in 0..REFERENCE_LEN {
            let idx = rng.random_range(0..ALPHABET.len());
            out.push(char::from(ALPHABET[idx]));
        }
        out
    }
}

impl ReferenceGenerator for RandomReferenceGenerator {
    fn transfer_reference(&self) -> String {
        Self::token(TRANSFER_PREFIX)
    }

    fn loan_number(&self) -> String {
        Self::token(LOAN_PREFIX)
    }
}

/// Returns true if `reference` has the transfer reference shape.
#[must_use]
pub fn is_transfer_reference(reference: &str) -> bool {
    reference.strip_prefix(TRANSFER_PREFIX).is_some_and(|rest| {
        rest.len() == REFERENCE_LEN
            && rest
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_generated_transfer_reference_shape() {
        let generator = RandomReferenceGenerator;
        for _ in 0..100 {
            let reference = generator.transfer_reference();
            assert!(is_transfer_reference(&reference), "bad reference {reference}");
        }
    }

    #[test]
    fn test_loan_number_shape() {
        let number = RandomReferenceGenerator.loan_number();
        assert!(number.starts_with(LOAN_PREFIX));
        assert_eq!(number.len(), LOAN_PREFIX.len() + REFERENCE_LEN);
    }

    #[rstest]
    #[case("TRF-AB12CD34EF", true)]
    #[case("TRF-ab12cd34ef", false)]
    #[case("TRF-AB12CD34E", false)]
    #[case("TXN-AB12CD34EF", false)]
    #[case("TRF-AB12CD34E!", false)]
    fn test_is_transfer_reference(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_transfer_reference(input), expected);
    }
}
