//! Golden tests - fixture-based tests that lock expected behavior
//!
//! These tests use JSON fixtures to verify that the rule-based analyzers
//! produce expected outputs. Any change in behavior will cause these tests to
//! fail, signaling a potential breaking change.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use std::fs;

fn read_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path, e))
}

// ============================================================================
// CLASSIFICATION GOLDEN TESTS
// ============================================================================

mod classification_golden {
    use super::*;
    use localbrain::intelligence::classify;
    use localbrain::types::Category;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: String,
        expected: Category,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_classification_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("classification.json"))
            .expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let result = classify(&case.input);
            assert_eq!(
                result, case.expected,
                "Case '{}': input={:?}, expected={}, got={}",
                case.name, case.input, case.expected, result
            );
        }
    }
}

// ============================================================================
// SUMMARY GOLDEN TESTS
// ============================================================================

mod summary_golden {
    use super::*;
    use localbrain::intelligence::summarize;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: String,
        max_length: usize,
        expected: String,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_summary_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("summaries.json"))
            .expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let result = summarize(&case.input, case.max_length);
            assert_eq!(
                result, case.expected,
                "Case '{}': input={:?}",
                case.name, case.input
            );
            assert!(
                result.chars().count() <= case.max_length,
                "Case '{}': summary exceeds max length",
                case.name
            );
        }
    }
}

// ============================================================================
// TAG EXTRACTION GOLDEN TESTS
// ============================================================================

mod tags_golden {
    use super::*;
    use localbrain::intelligence::extract_tags;

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        input: String,
        expected: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[test]
    fn test_tags_golden() {
        let fixture: Fixture =
            serde_json::from_str(&read_fixture("tags.json")).expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let result = extract_tags(&case.input);
            assert_eq!(
                result, case.expected,
                "Case '{}': input={:?}",
                case.name, case.input
            );
        }
    }
}
