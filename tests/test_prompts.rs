//! Tests for prompt template files under config/prompts.

use std::fs;
use std::path::{Path, PathBuf};

fn prompts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts")
}

fn prompt_path(name: &str) -> PathBuf {
    prompts_dir().join(name)
}

#[test]
fn test_classify_prompt_file_exists() {
    assert!(prompt_path("classify.txt").exists(), "classify.txt prompt file missing");
}

#[test]
fn test_analysis_prompt_files_exist() {
    assert!(
        prompt_path("math_analysis.txt").exists(),
        "math_analysis.txt prompt file missing"
    );
    assert!(
        prompt_path("physics_analysis.txt").exists(),
        "physics_analysis.txt prompt file missing"
    );
}

#[test]
fn test_classify_prompt_template_vars() {
    let text = fs::read_to_string(prompt_path("classify.txt")).unwrap();
    assert!(text.contains("{{question}}"), "classify.txt should contain {{question}} variable");
}

#[test]
fn test_analysis_prompt_template_vars() {
    for name in ["math_analysis.txt", "physics_analysis.txt"] {
        let text = fs::read_to_string(prompt_path(name)).unwrap();
        assert!(text.contains("{{question}}"), "{name} should contain {{question}} variable");
    }
}

#[test]
fn test_explain_calculation_template_vars() {
    let text = fs::read_to_string(prompt_path("explain_calculation.txt")).unwrap();
    for var in ["{{question}}", "{{expression}}", "{{result}}", "{{history}}"] {
        assert!(text.contains(var), "explain_calculation.txt should contain {var}");
    }
}

#[test]
fn test_explain_constant_template_vars() {
    let text = fs::read_to_string(prompt_path("explain_constant.txt")).unwrap();
    for var in ["{{question}}", "{{description}}", "{{symbol}}", "{{value}}", "{{unit}}", "{{history}}"] {
        assert!(text.contains(var), "explain_constant.txt should contain {var}");
    }
}

#[test]
fn test_fallback_template_vars() {
    let text = fs::read_to_string(prompt_path("tutor_fallback.txt")).unwrap();
    assert!(text.contains("{{question}}"), "tutor_fallback.txt should contain {{question}} variable");
    assert!(text.contains("{{history}}"), "tutor_fallback.txt should contain {{history}} variable");
}
