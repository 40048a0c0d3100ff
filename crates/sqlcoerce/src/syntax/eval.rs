//! Expression evaluation
//!
//! Every node is turned into a value plus the [`Operand`] the resolver
//! sees for it, so quoted strings stay untyped until their context
//! decides what they become. Operators are resolved, never computed:
//! [`Evaluator::unify`] reports the common type and the converted operands.

use super::{Expr, WhenClause};
use log::trace;
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_eval::coercers::numeric;
use sqlcoerce_eval::{CastEngine, CastMode, Operand, Usage};
use sqlcoerce_types::{
    BIGINT, BOOLEAN, BaseKind, DATE, DECIMAL, Datum, INTEGER, NULL, TEXT, TIMESTAMPTZ,
    TypeDescriptor, TypeRef, Value,
};

/// Value of an expression together with its resolver operand
#[derive(Debug, Clone)]
pub struct Evaluated {
    pub value: Value,
    pub operand: Operand,
}

impl Evaluated {
    fn new(value: Value, operand: Operand) -> Self {
        Self { value, operand }
    }

    fn expression(value: Value) -> Self {
        let operand = Operand::expression(value.ty().clone());
        Self { value, operand }
    }
}

/// Operands of an operator brought to their common type
#[derive(Debug, Clone)]
pub struct Unified {
    pub usage: Usage,
    pub target: TypeRef,
    pub operands: Vec<Value>,
}

/// Tree-walking evaluator bound to one engine
pub struct Evaluator<'e> {
    engine: &'e CastEngine,
}

impl<'e> Evaluator<'e> {
    pub fn new(engine: &'e CastEngine) -> Self {
        Self { engine }
    }

    pub fn evaluate(&self, expr: &Expr) -> CastResult<Evaluated> {
        match expr {
            Expr::StringLiteral(raw) => Ok(Evaluated::new(
                Value::new(TEXT.clone(), Datum::Text(raw.clone()))?,
                Operand::string_literal(raw.clone()),
            )),
            Expr::Number(text) => self.number(text),
            Expr::Boolean(b) => Ok(Evaluated::new(
                Value::new(BOOLEAN.clone(), Datum::Bool(*b))?,
                Operand::literal(BOOLEAN.clone()),
            )),
            Expr::Null => Ok(Evaluated::new(Value::null(NULL.clone()), Operand::null())),
            Expr::TypedLiteral { type_name, raw } => {
                let ty = self.engine.parse_type(type_name)?;
                let value = self.engine.coerce_literal(raw, &ty, CastMode::Explicit)?;
                Ok(Evaluated::new(value, Operand::literal(ty)))
            }
            Expr::Cast { operand, type_name } => self.cast(operand, type_name),
            Expr::Array(items) => self.array(items),
            Expr::Call { function, args } => self.call(function, args),
            Expr::Concat(left, right) => self.concat(left, right),
            Expr::Arithmetic { .. } | Expr::Comparison { .. } => {
                let unified = self.unify(expr)?;
                Err(CastError::incompatible(format!(
                    "{} resolves to {} but operators are not evaluated",
                    unified.usage, unified.target
                )))
            }
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => self.case(operand.as_deref(), branches, otherwise.as_deref()),
        }
    }

    /// Resolve the operands of a binary operator or comparison
    pub fn unify(&self, expr: &Expr) -> CastResult<Unified> {
        let (usage, left, right) = match expr {
            Expr::Arithmetic { op, left, right } => (Usage::binary(op.to_string()), left, right),
            Expr::Comparison { op, left, right } => {
                (Usage::comparison(op.to_string()), left, right)
            }
            _ => return Err(CastError::incompatible("expression has no operator to resolve")),
        };
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        let operands = self.engine.unify(
            usage.clone(),
            &[(left.operand, left.value), (right.operand, right.value)],
        )?;
        let target = operands
            .first()
            .map_or_else(|| NULL.clone(), |value| value.ty().clone());
        trace!("{usage} unified to {target}");
        Ok(Unified {
            usage,
            target,
            operands,
        })
    }

    /// Integral text is the narrowest of integer, bigint and decimal that
    /// holds it; anything with a fraction or exponent is decimal.
    fn number(&self, text: &str) -> CastResult<Evaluated> {
        let integral = text.chars().all(|c| c.is_ascii_digit() || c == '-');
        let value = if !integral {
            Value::new(DECIMAL.clone(), Datum::Decimal(numeric::parse_decimal(text)?))?
        } else if let Ok(i) = numeric::parse_int(text) {
            Value::new(INTEGER.clone(), Datum::Int(i))?
        } else if let Ok(i) = numeric::parse_bigint(text) {
            Value::new(BIGINT.clone(), Datum::BigInt(i))?
        } else {
            Value::new(DECIMAL.clone(), Datum::Decimal(numeric::parse_decimal(text)?))?
        };
        let operand = Operand::literal(value.ty().clone());
        Ok(Evaluated::new(value, operand))
    }

    fn cast(&self, operand: &Expr, type_name: &str) -> CastResult<Evaluated> {
        let target = self.engine.parse_type(type_name)?;
        let source = self.evaluate(operand)?;
        trace!("cast {} to {}", source.value.ty(), target);
        match source.operand.raw_literal() {
            Some(raw) => {
                let value = self.engine.coerce_literal(raw, &target, CastMode::Explicit)?;
                Ok(Evaluated::new(value, Operand::literal(target)))
            }
            None => {
                let value = self.engine.cast(&source.value, &target, CastMode::Explicit)?;
                Ok(Evaluated::expression(value))
            }
        }
    }

    fn array(&self, items: &[Expr]) -> CastResult<Evaluated> {
        if items.is_empty() {
            let ty = TypeDescriptor::array_of(NULL.clone());
            return Ok(Evaluated::expression(Value::new(ty, Datum::Array(Vec::new()))?));
        }
        let operands = items
            .iter()
            .map(|item| self.evaluate(item).map(|e| (e.operand, e.value)))
            .collect::<CastResult<Vec<_>>>()?;
        let values = self.engine.unify(Usage::CaseBranches, &operands)?;
        let element = values
            .first()
            .map_or_else(|| TEXT.clone(), |value| value.ty().clone());
        let datum = Datum::Array(values.into_iter().map(Value::into_datum).collect());
        Ok(Evaluated::expression(Value::new(
            TypeDescriptor::array_of(element),
            datum,
        )?))
    }

    fn call(&self, function: &str, args: &[Expr]) -> CastResult<Evaluated> {
        let args = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<CastResult<Vec<_>>>()?;
        let missing = || {
            let types: Vec<String> = args.iter().map(|a| a.value.ty().to_string()).collect();
            CastError::incompatible(format!(
                "function {function}({}) does not exist",
                types.join(", ")
            ))
        };
        let result_type = match function {
            "to_date" => DATE.clone(),
            "to_timestamp" => TIMESTAMPTZ.clone(),
            _ => return Err(missing()),
        };
        let [text, pattern] = args.as_slice() else {
            return Err(missing());
        };
        if !accepts_text(text) || !accepts_text(pattern) {
            return Err(missing());
        }
        let (Some(text), Some(pattern)) = (
            text.value.datum().as_text(),
            pattern.value.datum().as_text(),
        ) else {
            return Ok(Evaluated::expression(Value::null(result_type)));
        };
        let value = if function == "to_date" {
            self.engine.to_date(text, pattern)?
        } else {
            self.engine.to_timestamp(text, pattern)?
        };
        Ok(Evaluated::expression(value))
    }

    fn concat(&self, left: &Expr, right: &Expr) -> CastResult<Evaluated> {
        let left = self.evaluate(left)?.value;
        let right = self.evaluate(right)?.value;
        if left.is_null() || right.is_null() {
            return Ok(Evaluated::expression(Value::null(TEXT.clone())));
        }
        let text = format!("{}{}", self.engine.render(&left), self.engine.render(&right));
        Ok(Evaluated::expression(Value::new(TEXT.clone(), Datum::Text(text))?))
    }

    /// All branches (and the implicit `ELSE NULL`) unify even when the
    /// winning branch is the first one.
    fn case(
        &self,
        operand: Option<&Expr>,
        branches: &[WhenClause],
        otherwise: Option<&Expr>,
    ) -> CastResult<Evaluated> {
        let matched = match operand {
            Some(subject) => self.simple_case_matches(subject, branches)?,
            None => branches
                .iter()
                .map(|branch| self.condition(&branch.condition))
                .collect::<CastResult<Vec<_>>>()?,
        };
        let chosen = matched.iter().position(|&hit| hit);
        let mut results = Vec::with_capacity(branches.len() + 1);
        for branch in branches {
            let result = self.evaluate(&branch.result)?;
            results.push((result.operand, result.value));
        }
        match otherwise {
            Some(expr) => {
                let result = self.evaluate(expr)?;
                results.push((result.operand, result.value));
            }
            None => results.push((Operand::null(), Value::null(NULL.clone()))),
        }
        let fallback = results.len() - 1;
        let mut values = self.engine.unify(Usage::CaseBranches, &results)?;
        Ok(Evaluated::expression(
            values.swap_remove(chosen.unwrap_or(fallback)),
        ))
    }

    /// The subject and every WHEN value unify as one `=` comparison; a
    /// branch matches when its converted value equals the subject. NULL
    /// matches nothing.
    fn simple_case_matches(&self, subject: &Expr, branches: &[WhenClause]) -> CastResult<Vec<bool>> {
        let mut operands = Vec::with_capacity(branches.len() + 1);
        for expr in std::iter::once(subject).chain(branches.iter().map(|b| &b.condition)) {
            let evaluated = self.evaluate(expr)?;
            operands.push((evaluated.operand, evaluated.value));
        }
        let values = self.engine.unify(Usage::comparison("="), &operands)?;
        let Some((subject, candidates)) = values.split_first() else {
            return Ok(vec![false; branches.len()]);
        };
        Ok(candidates
            .iter()
            .map(|candidate| {
                !subject.is_null() && !candidate.is_null() && candidate.datum() == subject.datum()
            })
            .collect())
    }

    fn condition(&self, expr: &Expr) -> CastResult<bool> {
        let evaluated = self.evaluate(expr)?;
        let value = match evaluated.operand.raw_literal() {
            Some(raw) => self.engine.coerce_literal(raw, &BOOLEAN, CastMode::Explicit)?,
            None if evaluated.value.ty().physical() == BaseKind::Bool
                || evaluated.value.is_null() =>
            {
                evaluated.value
            }
            None => {
                return Err(CastError::incompatible(format!(
                    "argument of CASE/WHEN must be type boolean, not type {}",
                    evaluated.value.ty()
                )));
            }
        };
        Ok(value.datum().as_bool() == Some(true))
    }
}

fn accepts_text(arg: &Evaluated) -> bool {
    arg.value.is_null() || arg.value.ty().physical() == BaseKind::Text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use pretty_assertions::assert_eq;

    fn eval(text: &str) -> CastResult<Evaluated> {
        let engine = CastEngine::new();
        Evaluator::new(&engine).evaluate(&parse(text).unwrap())
    }

    #[test]
    fn test_number_literal_types() {
        assert_eq!(eval("1").unwrap().value.ty().name(), "integer");
        assert_eq!(eval("3000000000").unwrap().value.ty().name(), "bigint");
        assert_eq!(eval("1.5").unwrap().value.ty().name(), "decimal");
        assert_eq!(eval("-7").unwrap().value.datum(), &Datum::Int(-7));
    }

    #[test]
    fn test_string_literal_keeps_raw_text() {
        let evaluated = eval("'2017-01-03'").unwrap();
        assert_eq!(evaluated.operand.raw_literal(), Some("2017-01-03"));
        assert_eq!(evaluated.value.ty().name(), "text");
    }

    #[test]
    fn test_cast_of_literal_stays_literal() {
        let evaluated = eval("'1'::int").unwrap();
        assert!(evaluated.operand.raw_literal().is_none());
        assert_eq!(evaluated.value.datum(), &Datum::Int(1));
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let err = eval("case when 1 then 2 end").unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument of CASE/WHEN must be type boolean, not type integer"
        );
    }

    #[test]
    fn test_case_without_else_is_null() {
        let evaluated = eval("case when false then 1 end").unwrap();
        assert!(evaluated.value.is_null());
        assert_eq!(evaluated.value.ty().name(), "integer");
    }

    #[test]
    fn test_simple_case_coerces_when_values() {
        let evaluated = eval("case true when 't' then 'yes' else 'no' end").unwrap();
        assert_eq!(evaluated.value.datum(), &Datum::Text("yes".into()));
        let evaluated = eval("case 2 when 1 then 'one' when '2' then 'two' end").unwrap();
        assert_eq!(evaluated.value.datum(), &Datum::Text("two".into()));
    }

    #[test]
    fn test_simple_case_null_never_matches() {
        let evaluated = eval("case null when null then 1 else 2 end").unwrap();
        assert_eq!(evaluated.value.datum(), &Datum::Int(2));
    }

    #[test]
    fn test_simple_case_type_mismatch() {
        let err = eval("case 1 when true then 'a' end").unwrap_err();
        assert_eq!(err.tag(), "IncompatibleTypesError");
        let err = eval("case 1 when 'x' then 'a' end").unwrap_err();
        assert_eq!(err.tag(), "IncompatibleTypesError");
    }

    #[test]
    fn test_concat_with_null_is_null() {
        assert!(eval("'a' || null").unwrap().value.is_null());
    }

    #[test]
    fn test_unknown_function() {
        let err = eval("upper('a')").unwrap_err();
        assert_eq!(err.to_string(), "function upper(text) does not exist");
    }

    #[test]
    fn test_unify_operator() {
        let engine = CastEngine::new();
        let expr = parse("1 + null").unwrap();
        let unified = Evaluator::new(&engine).unify(&expr).unwrap();
        assert_eq!(unified.target.name(), "integer");
        assert!(unified.operands[1].is_null());
    }

    #[test]
    fn test_operators_are_not_computed() {
        let err = eval("1 + 1.5").unwrap_err();
        assert_eq!(
            err.to_string(),
            "operator + resolves to decimal but operators are not evaluated"
        );
        assert!(eval("1 = 'x'").is_err());
    }
}
