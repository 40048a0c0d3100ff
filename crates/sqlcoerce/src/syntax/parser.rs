//! Expression parser using recursive descent with precedence climbing
//!
//! Precedence from loosest to tightest: comparison, `||`, `+ -`, `* /`,
//! postfix `::`. Keywords are case-insensitive.

use super::{ArithmeticOp, ComparisonOp, Expr, SyntaxError, WhenClause};
use winnow::ascii::{Caseless, digit0, digit1, multispace0};
use winnow::combinator::{alt, cut_err, delimited, not, opt, preceded, repeat, separated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{none_of, one_of, take_while};

type Input<'a> = &'a str;
type PResult<T> = ModalResult<T>;

/// Words that continue a multi-word type name (`double precision`,
/// `timestamp with time zone`, `character varying`)
const CONTINUATION_WORDS: &[&str] = &["precision", "varying", "with", "without", "time", "zone"];

pub fn parse_statement(text: &str) -> Result<Expr, SyntaxError> {
    statement.parse(text).map_err(|err| {
        let offset = err.offset();
        let mut message = err.inner().to_string();
        if message.is_empty() {
            let near: String = text.get(offset..).unwrap_or("").chars().take(16).collect();
            message = if near.is_empty() {
                "unexpected end of input".to_string()
            } else {
                format!("unexpected input near {near:?}")
            };
        }
        SyntaxError { offset, message }
    })
}

fn statement(input: &mut Input<'_>) -> PResult<Expr> {
    opt(keyword("select")).parse_next(input)?;
    let expr = expression(input)?;
    (multispace0, opt(';'), multispace0).void().parse_next(input)?;
    Ok(expr)
}

// === Tokens ===

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Case-insensitive keyword that is not the prefix of a longer word
fn keyword<'i>(word: &'static str) -> impl Parser<Input<'i>, (), ErrMode<ContextError>> {
    delimited(multispace0, Caseless(word), not(one_of(is_ident_char))).void()
}

fn symbol<'i>(token: &'static str) -> impl Parser<Input<'i>, &'i str, ErrMode<ContextError>> {
    preceded(multispace0, token)
}

fn identifier<'i>(input: &mut Input<'i>) -> PResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)
}

/// Single-quoted string; `''` stands for one quote
fn string_literal(input: &mut Input<'_>) -> PResult<String> {
    preceded(
        multispace0,
        delimited(
            '\'',
            repeat(0.., alt(("''".value('\''), none_of('\'')))),
            cut_err('\'').context(StrContext::Expected(StrContextValue::CharLiteral('\''))),
        ),
    )
    .parse_next(input)
}

fn number(input: &mut Input<'_>) -> PResult<Expr> {
    let text = (
        opt('-'),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;
    Ok(Expr::number(text))
}

// === Type names ===

fn type_name(input: &mut Input<'_>) -> PResult<String> {
    let mut name = preceded(multispace0, identifier)
        .context(StrContext::Expected(StrContextValue::Description("type name")))
        .parse_next(input)?
        .to_ascii_lowercase();
    loop {
        if let Some(args) = opt(modifier_args).parse_next(input)? {
            name.push_str(&args);
        } else if let Some(word) = opt(preceded(multispace0, continuation_word)).parse_next(input)? {
            name.push(' ');
            name.push_str(&word.to_ascii_lowercase());
        } else {
            break;
        }
    }
    let depth: usize = repeat(0.., (symbol("["), symbol("]"))).parse_next(input)?;
    for _ in 0..depth {
        name.push_str("[]");
    }
    Ok(name)
}

fn continuation_word<'i>(input: &mut Input<'i>) -> PResult<&'i str> {
    identifier
        .verify(|word: &str| CONTINUATION_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)))
        .parse_next(input)
}

/// `(p)` or `(p, s)`, normalized to `(p,s)`
fn modifier_args(input: &mut Input<'_>) -> PResult<String> {
    let args: Vec<&str> = delimited(
        symbol("("),
        separated(1.., preceded(multispace0, digit1), symbol(",")),
        symbol(")"),
    )
    .parse_next(input)?;
    Ok(format!("({})", args.join(",")))
}

// === Expressions ===

fn expression(input: &mut Input<'_>) -> PResult<Expr> {
    let left = concatenation(input)?;
    match opt(preceded(multispace0, comparison_op)).parse_next(input)? {
        Some(op) => {
            let right = cut_err(concatenation).parse_next(input)?;
            Ok(Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
        None => Ok(left),
    }
}

fn comparison_op(input: &mut Input<'_>) -> PResult<ComparisonOp> {
    alt((
        "<=".value(ComparisonOp::LessOrEqual),
        "<>".value(ComparisonOp::NotEqual),
        "!=".value(ComparisonOp::NotEqual),
        ">=".value(ComparisonOp::GreaterOrEqual),
        "=".value(ComparisonOp::Equal),
        "<".value(ComparisonOp::Less),
        ">".value(ComparisonOp::Greater),
    ))
    .parse_next(input)
}

fn concatenation(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = additive(input)?;
    while opt(symbol("||")).parse_next(input)?.is_some() {
        let right = cut_err(additive).parse_next(input)?;
        left = Expr::Concat(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn additive(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = multiplicative(input)?;
    loop {
        let op = opt(preceded(
            multispace0,
            alt(('+'.value(ArithmeticOp::Add), '-'.value(ArithmeticOp::Subtract))),
        ))
        .parse_next(input)?;
        let Some(op) = op else { break };
        let right = cut_err(multiplicative).parse_next(input)?;
        left = Expr::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn multiplicative(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = postfix(input)?;
    loop {
        let op = opt(preceded(
            multispace0,
            alt(('*'.value(ArithmeticOp::Multiply), '/'.value(ArithmeticOp::Divide))),
        ))
        .parse_next(input)?;
        let Some(op) = op else { break };
        let right = cut_err(postfix).parse_next(input)?;
        left = Expr::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

/// Primary followed by any number of `::typename`
fn postfix(input: &mut Input<'_>) -> PResult<Expr> {
    let mut expr = primary(input)?;
    while opt(symbol("::")).parse_next(input)?.is_some() {
        let target = cut_err(type_name).parse_next(input)?;
        expr = Expr::cast(expr, target);
    }
    Ok(expr)
}

fn primary(input: &mut Input<'_>) -> PResult<Expr> {
    preceded(
        multispace0,
        alt((
            parenthesized,
            case_expression,
            cast_call,
            array_constructor,
            string_literal.map(Expr::StringLiteral),
            number,
            keyword("true").value(Expr::Boolean(true)),
            keyword("false").value(Expr::Boolean(false)),
            keyword("null").value(Expr::Null),
            typed_literal,
            function_call,
        )),
    )
    .context(StrContext::Label("expression"))
    .parse_next(input)
}

fn parenthesized(input: &mut Input<'_>) -> PResult<Expr> {
    delimited('(', expression, symbol(")")).parse_next(input)
}

fn case_expression(input: &mut Input<'_>) -> PResult<Expr> {
    keyword("case").parse_next(input)?;
    let operand = opt(preceded(not(keyword("when")), expression)).parse_next(input)?;
    let branches: Vec<WhenClause> = repeat(1.., when_clause).parse_next(input)?;
    let otherwise = opt(preceded(keyword("else"), expression)).parse_next(input)?;
    cut_err(keyword("end"))
        .context(StrContext::Expected(StrContextValue::StringLiteral("END")))
        .parse_next(input)?;
    Ok(Expr::Case {
        operand: operand.map(Box::new),
        branches,
        otherwise: otherwise.map(Box::new),
    })
}

fn when_clause(input: &mut Input<'_>) -> PResult<WhenClause> {
    keyword("when").parse_next(input)?;
    let condition = expression(input)?;
    keyword("then").parse_next(input)?;
    let result = expression(input)?;
    Ok(WhenClause { condition, result })
}

/// `CAST(value AS typename)`
fn cast_call(input: &mut Input<'_>) -> PResult<Expr> {
    keyword("cast").parse_next(input)?;
    symbol("(").parse_next(input)?;
    let operand = expression(input)?;
    keyword("as").parse_next(input)?;
    let target = type_name(input)?;
    symbol(")").parse_next(input)?;
    Ok(Expr::cast(operand, target))
}

fn array_constructor(input: &mut Input<'_>) -> PResult<Expr> {
    keyword("array").parse_next(input)?;
    let items: Vec<Expr> =
        delimited(symbol("["), separated(0.., expression, symbol(",")), symbol("]"))
            .parse_next(input)?;
    Ok(Expr::Array(items))
}

/// `typename 'literal'`
fn typed_literal(input: &mut Input<'_>) -> PResult<Expr> {
    let type_name = type_name(input)?;
    let raw = string_literal(input)?;
    Ok(Expr::TypedLiteral { type_name, raw })
}

fn function_call(input: &mut Input<'_>) -> PResult<Expr> {
    let function = preceded(multispace0, identifier).parse_next(input)?;
    let args: Vec<Expr> =
        delimited(symbol("("), separated(0.., expression, symbol(",")), symbol(")"))
            .parse_next(input)?;
    Ok(Expr::Call {
        function: function.to_ascii_lowercase(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(text: &str) -> Expr {
        parse_statement(text).unwrap()
    }

    #[rstest]
    #[case("1::text", Expr::cast(Expr::number("1"), "text"))]
    #[case("select '1.5'::double precision;", Expr::cast(Expr::string("1.5"), "double precision"))]
    #[case("CAST('x' AS varchar( 5 ))", Expr::cast(Expr::string("x"), "varchar(5)"))]
    #[case("cast(1.5 as NUMERIC(10, 2))", Expr::cast(Expr::number("1.5"), "numeric(10,2)"))]
    #[case("ARRAY[]::text[]", Expr::cast(Expr::Array(vec![]), "text[]"))]
    #[case("'x'::int[][]", Expr::cast(Expr::string("x"), "int[][]"))]
    #[case("'it''s'", Expr::string("it's"))]
    #[case("-1.5e3", Expr::number("-1.5e3"))]
    #[case("NULL", Expr::Null)]
    fn test_simple(#[case] text: &str, #[case] expected: Expr) {
        assert_eq!(parse(text), expected);
    }

    #[test]
    fn test_typed_literals() {
        assert_eq!(
            parse("timestamp(4) with time zone '2020-01-01 10:00'"),
            Expr::TypedLiteral {
                type_name: "timestamp(4) with time zone".into(),
                raw: "2020-01-01 10:00".into(),
            }
        );
        assert_eq!(
            parse("varchar(3) 'abcd'"),
            Expr::TypedLiteral {
                type_name: "varchar(3)".into(),
                raw: "abcd".into(),
            }
        );
    }

    #[test]
    fn test_chained_casts() {
        assert_eq!(
            parse("'42.5'::jsonb::int"),
            Expr::cast(Expr::cast(Expr::string("42.5"), "jsonb"), "int")
        );
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            parse("to_date('20170103', 'YYYYMMDD')"),
            Expr::Call {
                function: "to_date".into(),
                args: vec![Expr::string("20170103"), Expr::string("YYYYMMDD")],
            }
        );
    }

    #[test]
    fn test_precedence() {
        let expected = Expr::Comparison {
            op: ComparisonOp::Equal,
            left: Box::new(Expr::Arithmetic {
                op: ArithmeticOp::Add,
                left: Box::new(Expr::number("1")),
                right: Box::new(Expr::Arithmetic {
                    op: ArithmeticOp::Multiply,
                    left: Box::new(Expr::number("2")),
                    right: Box::new(Expr::number("3")),
                }),
            }),
            right: Box::new(Expr::Concat(
                Box::new(Expr::string("7")),
                Box::new(Expr::string("")),
            )),
        };
        assert_eq!(parse("1 + 2 * 3 = '7' || ''"), expected);
    }

    #[test]
    fn test_case() {
        let expr = parse("CASE WHEN true THEN 1 WHEN false THEN 2 ELSE '3' END");
        let Expr::Case {
            operand,
            branches,
            otherwise,
        } = expr
        else {
            panic!("expected CASE, got {expr:?}");
        };
        assert_eq!(operand, None);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[1].result, Expr::number("2"));
        assert_eq!(otherwise.as_deref(), Some(&Expr::string("3")));
    }

    #[test]
    fn test_simple_case() {
        let expr = parse("case true when 't' then 'yes' else 'no' end");
        let Expr::Case {
            operand, branches, ..
        } = expr
        else {
            panic!("expected CASE, got {expr:?}");
        };
        assert_eq!(operand.as_deref(), Some(&Expr::Boolean(true)));
        assert_eq!(branches[0].condition, Expr::string("t"));
        assert_eq!(branches[0].result, Expr::string("yes"));
    }

    #[rstest]
    #[case("1 +")]
    #[case("1::")]
    #[case("'unterminated")]
    #[case("case when true then 1")]
    #[case("1 2")]
    fn test_errors(#[case] text: &str) {
        assert!(parse_statement(text).is_err(), "{text} should not parse");
    }
}
