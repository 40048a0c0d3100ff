//! Numeric promotion ladder
//!
//! Implicit promotion between numeric kinds follows one ladder:
//! `Int < BigInt < Float < Decimal`. The wider of two numeric kinds wins,
//! so promotion is commutative and associative.

use crate::type_system::BaseKind;

/// Position of a numeric kind in the promotion ladder
fn numeric_rank(kind: BaseKind) -> Option<u8> {
    match kind {
        BaseKind::Int => Some(0),
        BaseKind::BigInt => Some(1),
        BaseKind::Float => Some(2),
        BaseKind::Decimal => Some(3),
        _ => None,
    }
}

/// The wider of two numeric kinds
pub fn wider_numeric(a: BaseKind, b: BaseKind) -> Option<BaseKind> {
    let (ra, rb) = (numeric_rank(a)?, numeric_rank(b)?);
    Some(if rb > ra { b } else { a })
}
