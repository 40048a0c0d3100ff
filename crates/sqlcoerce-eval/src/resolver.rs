//! Cast resolution
//!
//! Given the operand types of one usage context, the resolver picks the
//! common target type and the step that brings each operand to it. Rules
//! depend on the usage:
//! - Operators and comparisons unify pairwise, left to right
//! - CASE branches take the first non-literal branch type every branch reaches
//! - Column assignment targets the declared column type
//! - Scalar subqueries must project exactly one column
//!
//! A bare string literal is typed by its context: it must parse as the kind
//! it meets. Whether an operand is a literal or a computed expression is
//! decided by its recorded origin, never by inspecting a value.

use crate::coercers;
use crate::graph::CastMode;
use crate::registry::TypeCatalog;
use crate::session::SessionSettings;
use log::trace;
use smallvec::SmallVec;
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_types::{BaseKind, NULL, TEXT, TypeRef, wider_numeric};
use std::fmt;

/// Where an operand comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandOrigin {
    /// Bare quoted literal with its raw text
    StringLiteral(String),
    /// Any other literal: number, boolean, NULL
    Literal,
    /// Output of an operator or function
    Expression,
}

/// One typed operand of a usage context
#[derive(Debug, Clone)]
pub struct Operand {
    pub ty: TypeRef,
    pub origin: OperandOrigin,
}

impl Operand {
    pub fn string_literal(raw: impl Into<String>) -> Self {
        Self {
            ty: TEXT.clone(),
            origin: OperandOrigin::StringLiteral(raw.into()),
        }
    }

    pub fn literal(ty: TypeRef) -> Self {
        Self {
            ty,
            origin: OperandOrigin::Literal,
        }
    }

    pub fn expression(ty: TypeRef) -> Self {
        Self {
            ty,
            origin: OperandOrigin::Expression,
        }
    }

    /// The untyped `NULL` literal
    pub fn null() -> Self {
        Self::literal(NULL.clone())
    }

    /// Raw text of a bare string literal
    pub fn raw_literal(&self) -> Option<&str> {
        match &self.origin {
            OperandOrigin::StringLiteral(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn is_string_literal(&self) -> bool {
        self.raw_literal().is_some()
    }

    pub fn is_null(&self) -> bool {
        self.ty.is_null()
    }
}

/// Context the operands are used in
#[derive(Debug, Clone)]
pub enum Usage {
    BinaryOp { operator: String },
    Comparison { operator: String },
    CaseBranches,
    ColumnAssignment { target: TypeRef },
    ScalarSubquery,
}

impl Usage {
    pub fn binary(operator: impl Into<String>) -> Self {
        Self::BinaryOp {
            operator: operator.into(),
        }
    }

    pub fn comparison(operator: impl Into<String>) -> Self {
        Self::Comparison {
            operator: operator.into(),
        }
    }

    pub fn column(target: TypeRef) -> Self {
        Self::ColumnAssignment { target }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinaryOp { operator } => write!(f, "operator {operator}"),
            Self::Comparison { operator } => write!(f, "comparison {operator}"),
            Self::CaseBranches => write!(f, "CASE branches"),
            Self::ColumnAssignment { target } => write!(f, "assignment to {target}"),
            Self::ScalarSubquery => write!(f, "scalar subquery"),
        }
    }
}

/// One resolution request
#[derive(Debug, Clone)]
pub struct CastContext {
    pub usage: Usage,
    pub operands: Vec<Operand>,
}

impl CastContext {
    pub fn new(usage: Usage, operands: Vec<Operand>) -> Self {
        Self { usage, operands }
    }
}

/// How one operand reaches the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastStep {
    Identity,
    /// Apply the cast edge at this mode
    Cast(CastMode),
    /// Parse the raw literal text as the target type
    Literal,
}

impl fmt::Display for CastStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Cast(mode) => write!(f, "{mode} cast"),
            Self::Literal => write!(f, "literal"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperandCast {
    pub source: TypeRef,
    pub step: CastStep,
}

/// Result of a resolution: the target type and one step per operand
#[derive(Debug, Clone)]
pub struct ResolvedCast {
    pub target: TypeRef,
    pub steps: SmallVec<[OperandCast; 4]>,
}

/// Resolves usage contexts against one catalog snapshot
pub struct CastResolver<'a> {
    catalog: &'a TypeCatalog,
    session: &'a SessionSettings,
}

impl<'a> CastResolver<'a> {
    pub fn new(catalog: &'a TypeCatalog, session: &'a SessionSettings) -> Self {
        Self { catalog, session }
    }

    pub fn resolve(&self, context: &CastContext) -> CastResult<ResolvedCast> {
        let resolved = match &context.usage {
            Usage::BinaryOp { operator } | Usage::Comparison { operator } => {
                self.resolve_operator(operator, &context.operands)
            }
            Usage::CaseBranches => self.resolve_case(&context.operands),
            Usage::ColumnAssignment { target } => self.resolve_assignment(target, &context.operands),
            Usage::ScalarSubquery => self.resolve_subquery(&context.operands),
        }?;
        trace!("resolved {} to {}", context.usage, resolved.target);
        Ok(resolved)
    }

    fn implicit_edge(&self, from: &TypeRef, to: &TypeRef) -> bool {
        self.catalog
            .graph()
            .usable(from.name(), to.name(), CastMode::Implicit)
            .is_some()
    }

    /// Check that a string literal parses as `target`
    fn parse_literal(&self, raw: &str, target: &TypeRef) -> CastResult<()> {
        coercers::coerce_literal(raw, target, self.session).map(|_| ())
    }

    // === Operators and comparisons ===

    fn resolve_operator(&self, operator: &str, operands: &[Operand]) -> CastResult<ResolvedCast> {
        let (first, rest) = operands
            .split_first()
            .ok_or_else(|| CastError::incompatible(format!("operator {operator} has no operands")))?;
        let mut acc = first.clone();
        for operand in rest {
            if acc.is_null() {
                acc = operand.clone();
                continue;
            }
            let ty = self.common_type(operator, &acc, operand)?;
            let origin = match (&acc.origin, &operand.origin) {
                (OperandOrigin::StringLiteral(raw), OperandOrigin::StringLiteral(_)) => {
                    OperandOrigin::StringLiteral(raw.clone())
                }
                _ => OperandOrigin::Expression,
            };
            acc = Operand { ty, origin };
        }
        let target = acc.ty;

        let steps = operands
            .iter()
            .map(|operand| {
                let step = self.operator_step(operator, operand, &target)?;
                Ok(OperandCast {
                    source: operand.ty.clone(),
                    step,
                })
            })
            .collect::<CastResult<_>>()?;
        Ok(ResolvedCast { target, steps })
    }

    fn common_type(&self, operator: &str, left: &Operand, right: &Operand) -> CastResult<TypeRef> {
        let (a, b) = (&left.ty, &right.ty);
        if a.is_null() {
            return Ok(b.clone());
        }
        if b.is_null() {
            return Ok(a.clone());
        }
        match (left.is_string_literal(), right.is_string_literal()) {
            (true, true) => return Ok(TEXT.clone()),
            (true, false) => return Ok(b.clone()),
            (false, true) => return Ok(a.clone()),
            (false, false) => {}
        }
        if a.same_type(b) {
            return Ok(a.clone());
        }
        if a.same_base_type(b) {
            return Ok(a.with_modifier(None));
        }
        if let Some(wider) = wider_numeric(a.physical(), b.physical()) {
            return Ok(if wider == a.physical() { a.clone() } else { b.clone() });
        }
        if self.implicit_edge(a, b) {
            return Ok(b.clone());
        }
        if self.implicit_edge(b, a) {
            return Ok(a.clone());
        }
        Err(CastError::operator_mismatch(a, operator, b))
    }

    fn operator_step(&self, operator: &str, operand: &Operand, target: &TypeRef) -> CastResult<CastStep> {
        if operand.ty.same_type(target) {
            return Ok(CastStep::Identity);
        }
        if operand.is_null() {
            return Ok(CastStep::Cast(CastMode::Implicit));
        }
        if let Some(raw) = operand.raw_literal() {
            return match self.parse_literal(raw, target) {
                Ok(()) => Ok(CastStep::Literal),
                Err(err) => Err(CastError::incompatible(format!(
                    "{err} (operator {operator} with type {target})"
                ))),
            };
        }
        if operand.ty.same_base_type(target) || self.implicit_edge(&operand.ty, target) {
            return Ok(CastStep::Cast(CastMode::Implicit));
        }
        Err(CastError::operator_mismatch(&operand.ty, operator, target))
    }

    // === CASE ===

    fn reaches_implicitly(&self, operand: &Operand, target: &TypeRef) -> bool {
        operand.is_null()
            || operand.is_string_literal()
            || operand.ty.same_base_type(target)
            || self.implicit_edge(&operand.ty, target)
    }

    fn resolve_case(&self, branches: &[Operand]) -> CastResult<ResolvedCast> {
        let candidates: Vec<&Operand> = branches
            .iter()
            .filter(|branch| !branch.is_string_literal() && !branch.is_null())
            .collect();

        let target = if candidates.is_empty() {
            TEXT.clone()
        } else {
            let winner = candidates
                .iter()
                .find(|candidate| {
                    branches
                        .iter()
                        .all(|branch| self.reaches_implicitly(branch, &candidate.ty))
                })
                .map(|candidate| candidate.ty.clone());
            match winner {
                Some(ty) => {
                    let mixed_modifiers = branches
                        .iter()
                        .any(|branch| branch.ty.same_base_type(&ty) && !branch.ty.same_type(&ty));
                    if mixed_modifiers { ty.with_modifier(None) } else { ty }
                }
                None => {
                    let first = &candidates[0].ty;
                    let second = branches
                        .iter()
                        .find(|branch| !self.reaches_implicitly(branch, first))
                        .map_or_else(|| first.to_string(), |branch| branch.ty.to_string());
                    return Err(CastError::case_branch(first.to_string(), second));
                }
            }
        };

        let steps = branches
            .iter()
            .map(|branch| {
                let step = if branch.ty.same_type(&target) {
                    CastStep::Identity
                } else if let Some(raw) = branch.raw_literal() {
                    self.parse_literal(raw, &target)?;
                    CastStep::Literal
                } else {
                    CastStep::Cast(CastMode::Implicit)
                };
                Ok(OperandCast {
                    source: branch.ty.clone(),
                    step,
                })
            })
            .collect::<CastResult<_>>()?;
        Ok(ResolvedCast { target, steps })
    }

    // === Column assignment ===

    fn resolve_assignment(&self, target: &TypeRef, sources: &[Operand]) -> CastResult<ResolvedCast> {
        let steps = sources
            .iter()
            .map(|source| {
                Ok(OperandCast {
                    source: source.ty.clone(),
                    step: self.assignment_step(target, source)?,
                })
            })
            .collect::<CastResult<_>>()?;
        Ok(ResolvedCast {
            target: target.clone(),
            steps,
        })
    }

    fn assignment_step(&self, target: &TypeRef, source: &Operand) -> CastResult<CastStep> {
        if source.ty.same_type(target) {
            return Ok(CastStep::Identity);
        }
        if source.ty.same_base_type(target) || source.is_null() {
            return Ok(CastStep::Cast(CastMode::Assignment));
        }
        if let Some(raw) = source.raw_literal() {
            self.parse_literal(raw, target)?;
            return Ok(CastStep::Literal);
        }
        if self.assignable(&source.ty, target) {
            return Ok(CastStep::Cast(CastMode::Assignment));
        }
        Err(CastError::column_mismatch(target, &source.ty))
    }

    /// Whether an assignment cast from `from` to `to` exists, element-wise for arrays
    fn assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from.is_null() || (from.same_base_type(to) && !from.is_array()) {
            return true;
        }
        match (from.is_array(), to.is_array()) {
            (true, true) => match (from.element(), to.element()) {
                (Some(from_elem), Some(to_elem)) => {
                    !from_elem.is_null() && self.assignable(from_elem, to_elem)
                }
                _ => false,
            },
            (true, false) => to.physical() == BaseKind::Text,
            (false, true) => false,
            (false, false) => self
                .catalog
                .graph()
                .usable(from.name(), to.name(), CastMode::Assignment)
                .is_some(),
        }
    }

    // === Scalar subquery ===

    fn resolve_subquery(&self, columns: &[Operand]) -> CastResult<ResolvedCast> {
        match columns {
            [column] => Ok(ResolvedCast {
                target: column.ty.clone(),
                steps: SmallVec::from_elem(
                    OperandCast {
                        source: column.ty.clone(),
                        step: CastStep::Identity,
                    },
                    1,
                ),
            }),
            _ => Err(CastError::subquery_cardinality(columns.len())),
        }
    }
}
