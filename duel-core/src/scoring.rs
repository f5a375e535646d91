use duel_types::{Feedback, GameError};

pub struct ScoringEngine;

impl ScoringEngine {
    /// Score a guess against a secret of the same length.
    ///
    /// First pass counts exact hits and consumes those positions on both
    /// sides. Second pass walks the remaining guess digits and matches each
    /// against the leftmost unconsumed secret digit of the same value, so a
    /// secret digit is never credited twice.
    pub fn score(guess: &str, secret: &str) -> Result<Feedback, GameError> {
        let guess_chars: Vec<char> = guess.chars().collect();
        let secret_chars: Vec<char> = secret.chars().collect();

        if guess_chars.len() != secret_chars.len() {
            return Err(GameError::InvalidGuessLength {
                expected: secret_chars.len(),
                actual: guess_chars.len(),
            });
        }

        let mut used_secret = vec![false; secret_chars.len()];
        let mut used_guess = vec![false; guess_chars.len()];
        let mut correct_position = 0;
        let mut correct_digit = 0;

        // First pass: exact positions
        for (i, (g, s)) in guess_chars.iter().zip(&secret_chars).enumerate() {
            if g == s {
                correct_position += 1;
                used_secret[i] = true;
                used_guess[i] = true;
            }
        }

        // Second pass: right digit, wrong place
        for (i, g) in guess_chars.iter().enumerate() {
            if used_guess[i] {
                continue;
            }

            let hit = secret_chars
                .iter()
                .enumerate()
                .position(|(j, s)| !used_secret[j] && s == g);

            if let Some(j) = hit {
                correct_digit += 1;
                used_secret[j] = true;
            }
        }

        Ok(Feedback {
            correct_position,
            correct_digit,
        })
    }

    pub fn is_win(feedback: &Feedback, digit_count: usize) -> bool {
        feedback.is_solved(digit_count)
    }

    /// Reject anything that is not a plain string of ASCII digits.
    pub fn validate_digits(value: &str) -> Result<(), GameError> {
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(GameError::InvalidDigits);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(guess: &str, secret: &str) -> (u32, u32) {
        let feedback = ScoringEngine::score(guess, secret).unwrap();
        (feedback.correct_position, feedback.correct_digit)
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(score("1234", "1234"), (4, 0));
        assert_eq!(score("00000000", "00000000"), (8, 0));
    }

    #[test]
    fn test_no_overlap() {
        assert_eq!(score("5678", "1234"), (0, 0));
    }

    #[test]
    fn test_swapped_digits() {
        // '1','2' in place, '4','3' present but swapped
        assert_eq!(score("1243", "1234"), (2, 2));
    }

    #[test]
    fn test_repeated_guess_digit_uses_secret_once() {
        // secret "1123" vs guess "1111": index0 exact, index1 exact
        assert_eq!(score("1111", "1123"), (2, 0));
        // the second secret '1' is only credited when the guess offers another '1'
        assert_eq!(score("1555", "1123"), (1, 0));
        assert_eq!(score("1511", "1123"), (1, 1));
    }

    #[test]
    fn test_repeated_secret_digit() {
        assert_eq!(score("0700", "7007"), (1, 2));
        assert_eq!(score("7770", "0777"), (2, 2));
    }

    #[test]
    fn test_leftmost_secret_match_consumed() {
        assert_eq!(score("2211", "1122"), (0, 4));
        assert_eq!(score("9119", "1991"), (0, 4));
    }

    #[test]
    fn test_sum_never_exceeds_length() {
        let secrets = ["1234", "1123", "0000", "9876", "5551"];
        let guesses = ["4321", "1111", "0001", "6789", "1555", "1234"];

        for secret in secrets {
            for guess in guesses {
                let (position, digit) = score(guess, secret);
                assert!(
                    (position + digit) as usize <= secret.len(),
                    "{guess} vs {secret} gave {position}+{digit}"
                );
            }
        }
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let result = ScoringEngine::score("123", "1234");
        assert_eq!(
            result.unwrap_err(),
            GameError::InvalidGuessLength {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_is_win() {
        let feedback = ScoringEngine::score("987654", "987654").unwrap();
        assert!(ScoringEngine::is_win(&feedback, 6));

        let feedback = ScoringEngine::score("987645", "987654").unwrap();
        assert!(!ScoringEngine::is_win(&feedback, 6));
    }

    #[test]
    fn test_validate_digits() {
        assert!(ScoringEngine::validate_digits("0123").is_ok());
        assert_eq!(ScoringEngine::validate_digits("12a4"), Err(GameError::InvalidDigits));
        assert_eq!(ScoringEngine::validate_digits(""), Err(GameError::InvalidDigits));
        assert_eq!(ScoringEngine::validate_digits("１２３"), Err(GameError::InvalidDigits));
    }
}
