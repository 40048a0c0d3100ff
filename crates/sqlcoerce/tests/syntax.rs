//! Cast expressions evaluated end to end

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use sqlcoerce::syntax::{self, ExprError};
use sqlcoerce::{CastEngine, Datum, EngineConfig, Value};
use std::io::Write;

fn eval(text: &str) -> Result<Value, ExprError> {
    syntax::evaluate(&CastEngine::new(), text)
}

/// Text output and type name of a successful evaluation
fn rendered(text: &str) -> (String, String) {
    let engine = CastEngine::new();
    let value = syntax::evaluate(&engine, text).unwrap();
    (engine.render(&value), value.ty().to_string())
}

fn error_tag(text: &str) -> &'static str {
    match eval(text) {
        Err(ExprError::Cast(err)) => err.tag(),
        other => panic!("{text}: expected a cast error, got {other:?}"),
    }
}

#[rstest]
#[case("1::text || 2", "12", "text")]
#[case("'42.5'::jsonb::int", "43", "integer")]
#[case("'-42.5'::jsonb::int", "-43", "integer")]
#[case(r#"'{"b":1,"a":2}'::jsonb::text"#, r#"{"a":2,"b":1}"#, "text")]
#[case(r#"'{"a":12345678901234567890123}'::jsonb::text"#, r#"{"a":12345678901234567890123}"#, "text")]
#[case("'1.10'::jsonb::decimal", "1.10", "decimal")]
#[case("'9007199254740993'::jsonb::bigint", "9007199254740993", "bigint")]
#[case("'abcdef'::varchar(3)", "abc", "varchar(3)")]
#[case("'3.14159'::numeric(5,2)", "3.14", "decimal(5,2)")]
#[case("ARRAY[]::text[]", "{}", "text[]")]
#[case("ARRAY[1, 2.5]", "{1,2.5}", "decimal[]")]
#[case("'{1, \"2\", NULL}'::int[]", "{1,2,NULL}", "integer[]")]
#[case("CAST('2021-09-18 10:00:00+02' AS timestamptz)", "2021-09-18 08:00:00+00", "timestamptz")]
#[case("'P2M'::interval", "2 mons", "interval")]
#[case("'tr'::bool", "true", "boolean")]
#[case("date '2017-01-03'", "2017-01-03", "date")]
fn evaluates(#[case] text: &str, #[case] expected: &str, #[case] ty: &str) {
    assert_eq!(rendered(text), (expected.to_string(), ty.to_string()));
}

/// Common type and the text of each converted operand
fn unified(text: &str) -> (String, Vec<String>) {
    let engine = CastEngine::new();
    let unified = syntax::unify(&engine, text).unwrap();
    let operands = unified.operands.iter().map(|v| engine.render(v)).collect();
    (unified.target.to_string(), operands)
}

#[rstest]
#[case("select 1.5 + 1", "decimal", &["1.5", "1"])]
#[case("select 1 + 1.5;", "decimal", &["1", "1.5"])]
#[case("'1'::int + 1", "integer", &["1", "1"])]
#[case("3000000000 * 2", "bigint", &["3000000000", "2"])]
#[case("1 = '1'", "integer", &["1", "1"])]
#[case("1.1 = '1.10'", "decimal", &["1.1", "1.10"])]
#[case("'2020-01-01'::date < '2020-01-02'", "date", &["2020-01-01", "2020-01-02"])]
#[case("to_date('20170103', 'YYYYMMDD') = '2017-01-03'", "date", &["2017-01-03", "2017-01-03"])]
#[case("'b' > 'a'", "text", &["b", "a"])]
#[case("null = 1", "integer", &["NULL", "1"])]
fn operators_unify(#[case] text: &str, #[case] target: &str, #[case] operands: &[&str]) {
    let (ty, rendered) = unified(text);
    assert_eq!(ty, target);
    assert_eq!(rendered, operands);
}

#[test]
fn operators_are_resolved_not_computed() {
    assert_eq!(error_tag("1 + 1"), "IncompatibleTypesError");
}

#[rstest]
#[case("1 = '1.10'", "IncompatibleTypesError")]
#[case("to_date('20170103', 'YYYYMMDD') = '2017-' || '01-03'", "IncompatibleTypesError")]
#[case("'42.5'::int", "InvalidNumericLiteralError")]
#[case("'blah'::decimal", "InvalidNumericLiteralError")]
#[case("'yes'::bool", "InvalidBooleanLiteralError")]
#[case("'2017-13-01'::date", "InvalidDateTimeLiteralError")]
#[case("'{oops'::jsonb", "InvalidJsonLiteralError")]
#[case("'{\"a\":1}'::jsonb::int", "NoCastPathError")]
#[case("'x'::nosuchtype", "UnknownTypeError")]
#[case("interval '2000000000 years 2000000000 years'", "InvalidIntervalLiteralError")]
#[case("'PT99999999999999999999999S'::interval", "InvalidIntervalLiteralError")]
fn failures(#[case] text: &str, #[case] tag: &str) {
    assert_eq!(error_tag(text), tag);
}

#[test]
fn date_against_concatenation_names_operator() {
    let text = "to_date('20170103', 'YYYYMMDD') = '2017-' || '01-03'";
    let err = syntax::unify(&CastEngine::new(), text).unwrap_err();
    assert_eq!(err.to_string(), "operator does not exist: date = text");
}

// === CASE ===

#[rstest]
#[case("case when true then to_date('20170103', 'YYYYMMDD') else '2017-01-03' end")]
#[case("case when false then '2017-01-03' else to_date('20170103', 'YYYYMMDD') end")]
#[case("case when true then '2017-01-03' else to_date('20170103', 'YYYYMMDD') end")]
fn case_date_with_literal(#[case] text: &str) {
    assert_eq!(rendered(text), ("2017-01-03".to_string(), "date".to_string()));
}

#[rstest]
#[case("case when true then to_date('20170103', 'YYYYMMDD') else '2017-' || '01-03' end")]
#[case("case when true then '2017-' || '01-03' else to_date('20170103', 'YYYYMMDD') end")]
fn case_date_with_concatenation(#[case] text: &str) {
    assert_eq!(error_tag(text), "CaseBranchTypeError");
}

#[test]
fn case_branch_literal_must_parse() {
    assert_eq!(
        error_tag("case when true then 1 else 'x' end"),
        "InvalidNumericLiteralError"
    );
}

#[test]
fn case_picks_first_true_branch() {
    let value = eval("case when false then 1 when '1' then 2 when true then 3 end").unwrap();
    assert_eq!(value.datum(), &Datum::Int(2));
}

#[test]
fn case_of_string_literals_is_text() {
    assert_eq!(
        rendered("case when true then 'a' else 'b' end"),
        ("a".to_string(), "text".to_string())
    );
}

#[rstest]
#[case("select case true when 't' then 'yes' else 'no' end", "yes", "text")]
#[case("case 'b' when 'a' then 1 when 'b' then 2 end", "2", "integer")]
#[case("case '2017-01-03'::date when to_date('20170103', 'YYYYMMDD') then 'same' end", "same", "text")]
#[case("case 1.10 when '1.1' then 'equal' else 'different' end", "equal", "text")]
fn simple_case(#[case] text: &str, #[case] expected: &str, #[case] ty: &str) {
    assert_eq!(rendered(text), (expected.to_string(), ty.to_string()));
}

#[test]
fn simple_case_without_match_is_null() {
    assert!(eval("case 3 when 1 then 'one' end").unwrap().is_null());
}

// === Syntax ===

#[rstest]
#[case("1 +")]
#[case("cast(1 as )")]
#[case("case when true then 1")]
#[case("'open")]
fn syntax_errors(#[case] text: &str) {
    assert!(matches!(eval(text), Err(ExprError::Syntax(_))), "{text}");
}

// === Configured engines ===

fn engine_from_file(json: &str) -> CastEngine {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    let config = EngineConfig::from_path(file.path()).unwrap();
    CastEngine::from_config(&config).unwrap()
}

#[test]
fn custom_type_from_config() {
    let engine = engine_from_file(
        r#"{"equivalent_types": [{"name": "float4", "equivalent_to": "float"}]}"#,
    );
    let unified = syntax::unify(&engine, "'1.5'::float4 + 1").unwrap();
    assert_eq!(unified.target.name(), "float4");
    let rendered: Vec<String> = unified.operands.iter().map(|v| engine.render(v)).collect();
    assert_eq!(rendered, ["1.5", "1"]);
}

#[test]
fn session_time_zone_from_config() {
    let engine = engine_from_file(r#"{"time_zone": "+02:00"}"#);
    let value = syntax::evaluate(&engine, "'2021-09-18 10:00:00'::timestamptz").unwrap();
    assert_eq!(engine.render(&value), "2021-09-18 10:00:00+02");
}

proptest! {
    #[test]
    fn numeric_promotion_is_symmetric(a in any::<i32>(), b in any::<i32>()) {
        let engine = CastEngine::new();
        let forward = syntax::unify(&engine, &format!("{a} + {b}.5")).unwrap();
        let backward = syntax::unify(&engine, &format!("{b}.5 + {a}")).unwrap();
        prop_assert_eq!(forward.target.name(), "decimal");
        prop_assert_eq!(backward.target.name(), "decimal");
        prop_assert_eq!(&forward.operands[0], &backward.operands[1]);
        prop_assert_eq!(&forward.operands[1], &backward.operands[0]);
    }

    #[test]
    fn integer_text_compares_as_integer(n in any::<i32>()) {
        let engine = CastEngine::new();
        let unified = syntax::unify(&engine, &format!("{n} = '{n}'")).unwrap();
        prop_assert_eq!(unified.operands[1].datum(), &Datum::Int(n));
    }
}
