//! Deterministic strength score for stored secrets

/// Scores a plaintext secret on the fixed 0..=4 scale.
///
/// One point each for: length ≥ 8, length ≥ 12, mixed case, a digit, a
/// non-alphanumeric character; capped at 4. Recomputed whenever the secret
/// changes so the stored score never drifts from the plaintext.
#[must_use]
pub fn strength_score(secret: &str) -> i16 {
    let mut score: i16 = 0;
    if secret.chars().count() >= 8 {
        score += 1;
    }
    if secret.chars().count() >= 12 {
        score += 1;
    }
    if secret.chars().any(char::is_uppercase) && secret.chars().any(char::is_lowercase) {
        score += 1;
    }
    if secret.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if secret.chars().any(|c| !c.is_alphanumeric()) {
        score += 1;
    }
    score.min(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("", 0)]
    #[case("aaa", 0)]
    #[case("aaaaaaaa", 1)] // length only
    #[case("aaaaaaaaaaaa", 2)] // both length points
    #[case("Aaaaaaaa", 2)] // length + mixed case
    #[case("Aaaaaaa1", 3)] // length + case + digit
    #[case("Hunter2A!", 4)] // length + case + digit + symbol
    #[case("Correct-Horse-Battery-Staple-9", 4)] // all five criteria, capped
    #[case("aA1!", 3)] // short but varied
    #[case("12345678", 2)] // length + digit
    fn scores_match_the_fixed_scale(#[case] secret: &str, #[case] expected: i16) {
        assert_eq!(strength_score(secret), expected);
    }

    #[test]
    fn score_never_exceeds_four() {
        assert_eq!(strength_score("Extremely-Long-And-Varied-Secret-123!@#"), 4);
    }
}
