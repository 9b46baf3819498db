//! Golden tests for the transformation engine
//!
//! Each case in `golden-corpus/` is transformed with the bundled catalog and
//! compared with its stored output and result summary.

use cloudshift_golden::{GoldenConfig, GoldenTestRunner};

/// Run every case in the corpus
#[test]
#[ignore] // Needs the corpus checkout; run with --ignored
fn golden_test_suite() {
    let runner = GoldenTestRunner::new(GoldenConfig::from_env()).expect("golden runner");

    match runner.run_batch("*") {
        Ok(results) => {
            println!("All {} golden cases passed!", results.len());
        }
        Err(e) => {
            panic!("Golden tests failed: {}", e);
        }
    }
}

#[test]
#[ignore]
fn golden_test_function_runtime() {
    let runner = GoldenTestRunner::new(GoldenConfig::from_env()).expect("golden runner");

    runner
        .run_batch("function-runtime")
        .expect("Function runtime golden cases failed");
}

/// Show corpus statistics
#[test]
#[ignore]
fn golden_corpus_stats() {
    let runner = GoldenTestRunner::new(GoldenConfig::from_env()).expect("golden runner");

    runner
        .print_statistics()
        .expect("Failed to get corpus statistics");
}

#[cfg(test)]
mod individual_tests {
    use cloudshift_golden::{golden_test, golden_test_batch};

    golden_test!(test_python_s3_put, "object-storage/python-s3-put");
    golden_test!(test_python_dynamodb_put, "document-database/python-dynamodb-put");
    golden_test!(test_js_s3_copy_unmapped, "unmapped/js-s3-copy");

    golden_test_batch!("object-storage");
}
