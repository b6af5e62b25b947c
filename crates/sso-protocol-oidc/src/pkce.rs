//! PKCE (Proof Key for Code Exchange, RFC 7636).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sso_crypto::{constant_time_eq, sha256};

use crate::types::CodeChallengeMethod;

const MIN_LEN: usize = 43;
const MAX_LEN: usize = 128;

/// Checks that a challenge or verifier is 43-128 unreserved characters.
#[must_use]
pub fn is_well_formed(value: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
}

/// Derives the challenge for `verifier`.
#[must_use]
pub fn challenge_for(verifier: &str, method: CodeChallengeMethod) -> String {
    match method {
        CodeChallengeMethod::Plain => verifier.to_string(),
        CodeChallengeMethod::S256 => URL_SAFE_NO_PAD.encode(sha256(verifier.as_bytes())),
    }
}

/// Verifies `verifier` against the stored `challenge`.
#[must_use]
pub fn verify(verifier: &str, challenge: &str, method: CodeChallengeMethod) -> bool {
    is_well_formed(verifier)
        && constant_time_eq(
            challenge_for(verifier, method).as_bytes(),
            challenge.as_bytes(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B.
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn s256_matches_rfc_example() {
        assert_eq!(challenge_for(VERIFIER, CodeChallengeMethod::S256), CHALLENGE);
        assert!(verify(VERIFIER, CHALLENGE, CodeChallengeMethod::S256));
    }

    #[test]
    fn plain_compares_directly() {
        assert!(verify(VERIFIER, VERIFIER, CodeChallengeMethod::Plain));
        assert!(!verify(VERIFIER, CHALLENGE, CodeChallengeMethod::Plain));
    }

    #[test]
    fn short_verifier_is_rejected() {
        let short = "abc";
        assert!(!is_well_formed(short));
        assert!(!verify(short, short, CodeChallengeMethod::Plain));
    }
}
