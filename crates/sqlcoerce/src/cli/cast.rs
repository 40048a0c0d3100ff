//! `cast` command: evaluate one expression
//!
//! Operator expressions print their unified operands instead of a value.

use super::output::{self, OutputFormat};
use crate::syntax::{self, Evaluator, Unified};
use anyhow::Result;
use colored::Colorize;
use log::debug;
use serde_json::json;
use sqlcoerce_eval::CastEngine;
use sqlcoerce_types::Value;

/// Configuration for the cast command
pub struct CastConfig {
    pub expression: String,
    pub format: OutputFormat,
}

/// Result of running one expression
pub enum Outcome {
    Value(Value),
    Unified(Unified),
}

/// Evaluate `text`, or unify its operands when the root is an operator
pub fn run(engine: &CastEngine, text: &str) -> Result<Outcome> {
    let expr = syntax::parse(text)?;
    let evaluator = Evaluator::new(engine);
    if expr.is_operator() {
        return Ok(Outcome::Unified(evaluator.unify(&expr)?));
    }
    Ok(Outcome::Value(evaluator.evaluate(&expr)?.value))
}

/// Pretty text for an outcome
pub fn format_outcome(engine: &CastEngine, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Value(value) => format_value(engine, value),
        Outcome::Unified(unified) => format_unified(engine, unified),
    }
}

/// Evaluate the expression and print the result
pub fn cast(engine: &CastEngine, config: CastConfig) -> Result<()> {
    debug!("evaluating {}", config.expression);
    let outcome = run(engine, &config.expression)?;
    match config.format {
        OutputFormat::Json => {
            let document = match &outcome {
                Outcome::Value(value) => to_json(engine, value),
                Outcome::Unified(unified) => unified_to_json(engine, unified),
            };
            output::print_json(&document)
        }
        OutputFormat::Pretty => {
            println!("{}", format_outcome(engine, &outcome));
            Ok(())
        }
    }
}

/// Target line followed by one line per converted operand
pub fn format_unified(engine: &CastEngine, unified: &Unified) -> String {
    let mut lines = vec![format!(
        "{}: {}",
        unified.usage,
        unified.target.to_string().cyan()
    )];
    lines.extend(
        unified
            .operands
            .iter()
            .map(|value| format!("  {}", format_value(engine, value))),
    );
    lines.join("\n")
}

pub fn unified_to_json(engine: &CastEngine, unified: &Unified) -> serde_json::Value {
    let operands: Vec<_> = unified
        .operands
        .iter()
        .map(|value| to_json(engine, value))
        .collect();
    json!({
        "usage": unified.usage.to_string(),
        "target": unified.target.to_string(),
        "operands": operands,
    })
}

/// `text :: type`, with NULL spelled out
pub fn format_value(engine: &CastEngine, value: &Value) -> String {
    let text = if value.is_null() {
        "NULL".dimmed().to_string()
    } else {
        engine.render(value).green().to_string()
    };
    format!("{text} :: {}", value.ty().to_string().cyan())
}

/// JSON document with the typed value and its text output
pub fn to_json(engine: &CastEngine, value: &Value) -> serde_json::Value {
    let text = if value.is_null() {
        serde_json::Value::Null
    } else {
        serde_json::Value::String(engine.render(value))
    };
    json!({
        "type": value.ty().to_string(),
        "value": value.to_json(),
        "text": text,
    })
}
