use super::{align_codes, apportion, word_weight};
use crate::error::ApportionmentError;
use crate::types::Code;

#[test]
fn test_even_split() {
    assert_eq!(apportion(10, &[1, 1, 1, 1, 1]).unwrap(), vec![2, 2, 2, 2, 2]);
}

#[test]
fn test_leftover_goes_to_earliest_ties() {
    assert_eq!(apportion(7, &[1, 1, 1, 1, 1]).unwrap(), vec![2, 2, 1, 1, 1]);
}

#[test]
fn test_more_words_than_codes_fails() {
    let err = apportion(3, &[5, 5, 5, 5, 5]).unwrap_err();
    assert_eq!(err, ApportionmentError::Infeasible { words: 5, codes: 3 });
}

#[test]
fn test_two_equal_words() {
    let tokens = vec!["hello".to_string(), "world".to_string()];
    let weights: Vec<usize> = tokens.iter().map(|t| word_weight(t)).collect();
    assert_eq!(weights, vec![5, 5]);
    assert_eq!(apportion(10, &weights).unwrap(), vec![5, 5]);

    let codes: Vec<Code> = (0..10).collect();
    let records = align_codes(&codes, &tokens, 50.0).unwrap();
    let durations: Vec<f64> = records.iter().map(|record| record.duration).collect();
    assert_eq!(durations, vec![0.1, 0.1]);
}

#[test]
fn test_largest_remainder_gets_extra_code() {
    assert_eq!(apportion(10, &[1, 2, 3]).unwrap(), vec![2, 3, 5]);
}

#[test]
fn test_floor_of_one_is_paid_for_by_heavy_word() {
    // The four short words are floored up to one code each; the surplus is
    // clawed back from the long word, which has the smallest remainder.
    assert_eq!(apportion(6, &[20, 1, 1, 1, 1]).unwrap(), vec![2, 1, 1, 1, 1]);
}

#[test]
fn test_single_word_takes_everything() {
    assert_eq!(apportion(13, &[4]).unwrap(), vec![13]);
}

#[test]
fn test_exactly_one_code_per_word() {
    assert_eq!(apportion(4, &[9, 1, 3, 2]).unwrap(), vec![1, 1, 1, 1]);
}

#[test]
fn test_degenerate_inputs() {
    assert_eq!(apportion(0, &[1, 2]).unwrap_err(), ApportionmentError::NoCodes);
    assert_eq!(apportion(5, &[]).unwrap_err(), ApportionmentError::NoWeights);
    assert_eq!(
        apportion(5, &[0, 0]).unwrap_err(),
        ApportionmentError::ZeroWeightSum { words: 2 }
    );
}

#[test]
fn test_zero_weight_word_still_gets_a_code() {
    let lengths = apportion(5, &[0, 4]).unwrap();
    assert_eq!(lengths.iter().sum::<usize>(), 5);
    assert!(lengths.iter().all(|&len| len >= 1));
}

#[test]
fn test_random_inputs_keep_invariants() {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
    for _ in 0..2_000 {
        let words = 1 + rng.below(40);
        let total = 1 + rng.below(300);
        let weights: Vec<usize> = (0..words).map(|_| 1 + rng.below(15)).collect();

        let result = apportion(total, &weights);
        if words > total {
            assert_eq!(
                result.unwrap_err(),
                ApportionmentError::Infeasible {
                    words,
                    codes: total
                }
            );
            continue;
        }

        let lengths = result.unwrap();
        assert_eq!(lengths.len(), words);
        assert_eq!(lengths.iter().sum::<usize>(), total, "weights {weights:?}");
        assert!(lengths.iter().all(|&len| len >= 1), "weights {weights:?}");
        assert_eq!(apportion(total, &weights).unwrap(), lengths);
    }
}

#[test]
fn test_records_partition_codes() {
    let mut rng = XorShift(42);
    for _ in 0..200 {
        let words = 1 + rng.below(20);
        let total = words + rng.below(200);
        let tokens: Vec<String> = (0..words)
            .map(|_| "x".repeat(1 + rng.below(10)))
            .collect();
        let codes: Vec<Code> = (0..total).map(|_| rng.below(65_536) as Code).collect();

        let records = align_codes(&codes, &tokens, 50.0).unwrap();
        let rebuilt: Vec<Code> = records
            .iter()
            .flat_map(|record| record.codes.iter().copied())
            .collect();
        assert_eq!(rebuilt, codes);
        assert!(records.iter().all(|record| !record.codes.is_empty()));
        assert!(records
            .iter()
            .zip(&tokens)
            .all(|(record, token)| &record.word == token));
    }
}

struct XorShift(u64);

impl XorShift {
    fn below(&mut self, bound: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % bound as u64) as usize
    }
}
