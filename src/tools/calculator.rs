//! Calculator tool — deterministic expression evaluation via fend-core.
//!
//! The evaluator keeps exact rationals internally; non-terminating values
//! come back with an `approx.` prefix, which is the cue to re-evaluate with
//! `to fraction` and report the exact form alongside a 6-significant-digit
//! decimal. Malformed input is captured into the result envelope — this tool
//! never propagates an error past its boundary.

use serde::Serialize;
use tracing::debug;

/// Classification of an evaluation result, used for formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Integer,
    Fraction,
    Decimal,
    Symbol,
    Expression,
    Matrix,
}

/// Formatted evaluation value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalcValue {
    Integer(i64),
    Decimal(f64),
    /// Fraction display (`"1/3 ≈ 0.333333"`), oversized integers, symbols
    /// and matrix text.
    Text(String),
    /// Non-numeric result: plain text plus a math-notation rendering.
    Expression { text: String, notation: String },
}

impl std::fmt::Display for CalcValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcValue::Integer(n) => write!(f, "{n}"),
            CalcValue::Decimal(v) => write!(f, "{v}"),
            CalcValue::Text(s) => f.write_str(s),
            CalcValue::Expression { text, .. } => f.write_str(text),
        }
    }
}

/// Result envelope for one calculation. `expression` always echoes the input.
#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CalcValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_type: Option<ResultKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub expression: String,
}

impl Calculation {
    fn failure(expression: &str, error: String) -> Self {
        Self {
            success: false,
            result: None,
            result_type: None,
            error: Some(error),
            expression: expression.to_string(),
        }
    }

    fn success(expression: &str, kind: ResultKind, value: CalcValue) -> Self {
        Self {
            success: true,
            result: Some(value),
            result_type: Some(kind),
            error: None,
            expression: expression.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl Calculator {
    /// Evaluate a mathematical expression. Never fails past the envelope.
    pub fn execute(&self, expression: &str) -> Calculation {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Calculation::failure(expression, "empty expression".to_string());
        }

        let mut context = fend_core::Context::new();
        let evaluated = match fend_core::evaluate(trimmed, &mut context) {
            Ok(result) => result.get_main_result().to_string(),
            Err(message) => {
                debug!(expression = trimmed, error = %message, "calculator: evaluation failed");
                return Calculation::failure(expression, message);
            }
        };

        let (kind, value) = self.classify(trimmed, &evaluated);
        Calculation::success(expression, kind, value)
    }

    /// Map the evaluator's textual output onto a result kind + formatted value.
    fn classify(&self, expression: &str, output: &str) -> (ResultKind, CalcValue) {
        // Non-terminating rational or irrational — try to recover the exact
        // fraction; fall back to a plain decimal.
        if let Some(decimal_text) = output.strip_prefix("approx. ") {
            if let Some((numerator, denominator)) = self.exact_fraction(expression) {
                let approx = to_significant_digits(numerator as f64 / denominator as f64, 6);
                return (
                    ResultKind::Fraction,
                    CalcValue::Text(format!("{numerator}/{denominator} ≈ {approx}")),
                );
            }
            if let Ok(v) = decimal_text.parse::<f64>() {
                return (ResultKind::Decimal, CalcValue::Decimal(v));
            }
        }

        if let Ok(n) = output.parse::<i64>() {
            return (ResultKind::Integer, CalcValue::Integer(n));
        }
        // Integers wider than i64 stay textual but keep the integer tag.
        if is_integer_literal(output) {
            return (ResultKind::Integer, CalcValue::Text(output.to_string()));
        }
        if output.contains('.') {
            if let Ok(v) = output.parse::<f64>() {
                return (ResultKind::Decimal, CalcValue::Decimal(v));
            }
        }
        if let Some((n, d)) = parse_fraction(output) {
            let approx = to_significant_digits(n as f64 / d as f64, 6);
            return (
                ResultKind::Fraction,
                CalcValue::Text(format!("{n}/{d} ≈ {approx}")),
            );
        }
        if output.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
            return (ResultKind::Symbol, CalcValue::Text(output.to_string()));
        }
        if output.starts_with('[') || output.contains(';') {
            return (ResultKind::Matrix, CalcValue::Text(output.to_string()));
        }
        (
            ResultKind::Expression,
            CalcValue::Expression {
                text: output.to_string(),
                notation: math_notation(output),
            },
        )
    }

    /// Re-evaluate with `to fraction` to recover an exact `n/d` pair.
    fn exact_fraction(&self, expression: &str) -> Option<(i64, i64)> {
        let mut context = fend_core::Context::new();
        let result = fend_core::evaluate(&format!("({expression}) to fraction"), &mut context).ok()?;
        parse_fraction(result.get_main_result())
    }
}

fn parse_fraction(text: &str) -> Option<(i64, i64)> {
    let (n, d) = text.split_once('/')?;
    let numerator = n.trim().parse::<i64>().ok()?;
    let denominator = d.trim().parse::<i64>().ok()?;
    if denominator == 0 {
        return None;
    }
    Some((numerator, denominator))
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Render a value to `digits` significant digits, trailing zeros trimmed.
fn to_significant_digits(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    let formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}

/// Lightweight math-notation rendering for non-numeric results.
fn math_notation(text: &str) -> String {
    text.replace('*', " \\cdot ").replace("pi", "\\pi")
}
