use pest::error::InputLocation;
use pest::Parser;

use log::debug;

use crate::context::{DisplayMode, EvalContext, HistoryEntry};
use crate::errors::*;
use crate::format::format_value;
use crate::preprocess::preprocess;
use crate::stack::{Stack, UNARY_MINUS};

#[derive(Parser)]
#[grammar = "calc.pest"]
pub struct CalcParser;

/// Value plus its rendering - what one engine call hands back to the caller
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub formatted: String,
}

fn error_position(e: &pest::error::Error<Rule>) -> usize {
    match e.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((s, _)) => s,
    }
}

/// Evaluates a canonical arithmetic expression.
///
/// The input must already be in canonical form (see
/// [`preprocess`](crate::preprocess::preprocess)): numbers, `+ - * /`,
/// `mod`, `**`, parentheses, and the math primitive calls. Anything else
/// fails with `SyntaxError` carrying the offending position - the driver is
/// a closed interpreter, it never hands text to anything more general.
pub fn evaluate(canonical: &str) -> CalcResult {
    let pairs = match CalcParser::parse(Rule::expr, canonical) {
        Ok(p) => p,
        Err(e) => return Err(CalcError::SyntaxError(error_position(&e))),
    };

    let mut stk = Stack::new();
    // operand/operator state machine over the flat token stream
    let mut is_last_value = false;
    let mut pending_func = false;
    let mut after_open = false;
    let mut saw_token = false;
    let mut end_pos = 0usize;

    for pair in pairs {
        let rule = pair.as_rule();
        let span = pair.as_span();
        let pos = span.start();
        let text = span.as_str();
        end_pos = span.end();

        if rule == Rule::EOI {
            continue;
        }
        saw_token = true;

        // a function name must be followed by its argument list
        if pending_func && rule != Rule::open_b {
            return Err(CalcError::SyntaxError(pos));
        }

        match rule {
            Rule::float | Rule::int => {
                if is_last_value {
                    return Err(CalcError::SyntaxError(pos));
                }
                let v: f64 = match text.parse() {
                    Ok(v) => v,
                    Err(..) => return Err(CalcError::SyntaxError(pos)),
                };
                stk.push("", Some(v))?;
                is_last_value = true;
                after_open = false;
            }
            Rule::open_b => {
                if is_last_value {
                    // implicit multiplication is not part of the grammar
                    return Err(CalcError::SyntaxError(pos));
                }
                stk.push("(", None)?;
                pending_func = false;
                after_open = true;
            }
            Rule::close_b => {
                if after_open {
                    // empty parenthesized group
                    return Err(CalcError::SyntaxError(pos));
                }
                if !is_last_value {
                    return Err(CalcError::SyntaxError(pos));
                }
                stk.push(")", None)?;
                is_last_value = true;
            }
            Rule::operator => {
                if text == "-" && !is_last_value {
                    stk.push(UNARY_MINUS, None)?;
                } else if !is_last_value {
                    // unary plus and doubled binary operators are not
                    // part of the grammar
                    return Err(CalcError::SyntaxError(pos));
                } else {
                    stk.push(text, None)?;
                }
                is_last_value = false;
                after_open = false;
            }
            Rule::ident => {
                if is_last_value {
                    return Err(CalcError::SyntaxError(pos));
                }
                if !stk.is_func(text) {
                    return Err(CalcError::SyntaxError(pos));
                }
                stk.push(text, None)?;
                pending_func = true;
            }
            _ => return Err(CalcError::Unreachable),
        }
    }

    if pending_func {
        return Err(CalcError::SyntaxError(end_pos));
    }
    if saw_token && !is_last_value {
        // dangling operator at the end of input
        return Err(CalcError::SyntaxError(end_pos));
    }

    stk.calculate()
}

/// Runs the whole pipeline: preprocess, evaluate, format.
///
/// Pure with respect to its inputs - the same (expression, context, mode)
/// triple always produces the same result.
pub fn eval_expression(
    expr: &str,
    ctx: &EvalContext,
    mode: DisplayMode,
) -> Result<Evaluation, CalcError> {
    let canonical = preprocess(expr, ctx)?;
    let value = evaluate(&canonical)?;
    debug!("{:?} -> {:?} = {}", expr, canonical, value);
    Ok(Evaluation {
        value,
        formatted: format_value(value, mode),
    })
}

/// Top-level display boundary: always returns something printable,
/// rendering every classified error as "Error: <reason>".
pub fn eval_to_display(expr: &str, ctx: &EvalContext, mode: DisplayMode) -> String {
    match eval_expression(expr, ctx, mode) {
        Ok(ev) => ev.formatted,
        Err(e) => format!("Error: {}", e),
    }
}

/// Produces the (expression, result) pair the caller appends to its own
/// history list. The engine does not store history.
pub fn history_entry(expr: &str, ctx: &EvalContext, mode: DisplayMode) -> HistoryEntry {
    HistoryEntry {
        expression: expr.to_string(),
        result: eval_to_display(expr, ctx, mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AngleUnit;
    use crate::value::f64_equal;

    fn deg() -> EvalContext {
        EvalContext::new()
    }

    fn rad() -> EvalContext {
        EvalContext {
            angle_unit: AngleUnit::Radians,
            ..EvalContext::new()
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("2**3**2"), Ok(512.0));
        assert_eq!(evaluate("10-4-3"), Ok(3.0));
        assert_eq!(evaluate("100/10/5"), Ok(2.0));
        assert_eq!(evaluate("10 mod 3"), Ok(1.0));
        assert_eq!(evaluate("2+10 mod 3"), Ok(3.0));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(evaluate("-5+3"), Ok(-2.0));
        assert_eq!(evaluate("2*-3"), Ok(-6.0));
        // negation binds tighter than power
        assert_eq!(evaluate("-2**2"), Ok(4.0));
        assert_eq!(evaluate("2**-3"), Ok(0.125));
        assert_eq!(evaluate("-7 mod 3"), Ok(-1.0));
        assert_eq!(evaluate("--5"), Ok(5.0));
    }

    #[test]
    fn test_literals() {
        assert_eq!(evaluate("12.5"), Ok(12.5));
        assert_eq!(evaluate("120.0"), Ok(120.0));
        // exponent literals appear when the preprocessor splices context
        // values; an overflowing one saturates to infinity
        assert_eq!(evaluate("2e3"), Ok(2000.0));
        assert_eq!(evaluate("1e999"), Ok(f64::INFINITY));
    }

    #[test]
    fn test_division_by_zero_policy() {
        assert_eq!(evaluate("1/0"), Ok(f64::INFINITY));
        assert_eq!(evaluate("-1/0"), Ok(f64::NEG_INFINITY));
        let v = evaluate("0/0").unwrap();
        assert!(v.is_nan());
        let v = evaluate("5 mod 0").unwrap();
        assert!(v.is_nan());
    }

    #[test]
    fn test_functions() {
        assert_eq!(evaluate("sqrt(16)"), Ok(4.0));
        assert_eq!(evaluate("cbrt(27)"), Ok(3.0));
        assert_eq!(evaluate("log10(100)"), Ok(2.0));
        assert_eq!(evaluate("floor(2.7)"), Ok(2.0));
        assert_eq!(evaluate("ceil(2.1)"), Ok(3.0));
        assert_eq!(evaluate("abs(0-7)"), Ok(7.0));
        assert!(f64_equal(evaluate("exp(1)").unwrap(), std::f64::consts::E));
        assert!(f64_equal(evaluate("ln(exp(2))").unwrap(), 2.0));
        // domain violations propagate as NaN, same policy as 0/0
        assert!(evaluate("sqrt(0-1)").unwrap().is_nan());
        assert!(evaluate("asin(2)").unwrap().is_nan());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(evaluate("2++3"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("2*/3"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("+2"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("2+"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("()"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("2 3"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("2(3)"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("(2)(3)"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("sin 1"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("sin"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("foo(1)"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("2sin(1)"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("2%3"), Err(CalcError::SyntaxError(..))));
        assert!(matches!(evaluate("x"), Err(CalcError::SyntaxError(..))));
    }

    #[test]
    fn test_syntax_error_position() {
        assert_eq!(evaluate("2+@3"), Err(CalcError::SyntaxError(2)));
        assert_eq!(evaluate("2++3"), Err(CalcError::SyntaxError(2)));
        assert_eq!(evaluate("2+"), Err(CalcError::SyntaxError(2)));
    }

    #[test]
    fn test_empty() {
        assert_eq!(evaluate(""), Err(CalcError::EmptyExpression));
        assert_eq!(evaluate("   "), Err(CalcError::EmptyExpression));
    }

    #[test]
    fn test_pipeline_percent() {
        let v = eval_expression("10%5", &deg(), DisplayMode::Decimal).unwrap();
        assert_eq!(v.value, 0.0);
        assert_eq!(v.formatted, "0");
        let v = eval_expression("50+10%", &deg(), DisplayMode::Decimal).unwrap();
        assert_eq!(v.value, 55.0);
        assert_eq!(v.formatted, "55");
        let v = eval_expression("200%", &deg(), DisplayMode::Decimal).unwrap();
        assert_eq!(v.value, 2.0);
        assert_eq!(v.formatted, "2");
    }

    #[test]
    fn test_pipeline_angle_modes() {
        // degrees in, degrees out
        assert_eq!(eval_to_display("sin(90)", &deg(), DisplayMode::Decimal), "1");
        assert_eq!(eval_to_display("cos(60)", &deg(), DisplayMode::Decimal), "0.5");
        assert_eq!(eval_to_display("tan(45)", &deg(), DisplayMode::Decimal), "1");
        assert_eq!(eval_to_display("asin(1)", &deg(), DisplayMode::Decimal), "90");
        assert_eq!(eval_to_display("atan(1)", &deg(), DisplayMode::Decimal), "45");
        // radians go straight through; π/2 substitutes exactly
        assert_eq!(
            eval_to_display("sin(π/2)", &rad(), DisplayMode::Decimal),
            "1"
        );
        let v = eval_expression("asin(1)", &rad(), DisplayMode::Decimal).unwrap();
        assert!(f64_equal(v.value, std::f64::consts::FRAC_PI_2));
    }

    #[test]
    fn test_pipeline_memory_and_factorial() {
        let mut ctx = deg();
        ctx.memory = 5.0;
        assert_eq!(eval_to_display("M*2", &ctx, DisplayMode::Decimal), "10");
        assert_eq!(eval_to_display("M!", &ctx, DisplayMode::Decimal), "120");
        assert_eq!(eval_to_display("5!+1", &ctx, DisplayMode::Decimal), "121");
        assert_eq!(
            eval_to_display("19!", &ctx, DisplayMode::Decimal),
            "Infinity"
        );
    }

    #[test]
    fn test_pipeline_power_alias() {
        assert_eq!(eval_to_display("2^10", &deg(), DisplayMode::Decimal), "1024");
        assert_eq!(eval_to_display("2^3^2", &deg(), DisplayMode::Decimal), "512");
    }

    #[test]
    fn test_pipeline_errors_render() {
        assert_eq!(
            eval_to_display("", &deg(), DisplayMode::Decimal),
            "Error: Empty expression"
        );
        assert_eq!(
            eval_to_display("(2+3", &deg(), DisplayMode::Decimal),
            "Error: Mismatched parentheses"
        );
        assert_eq!(
            eval_to_display("3.5!", &deg(), DisplayMode::Decimal),
            "Error: Domain error: factorial of non-integral number 3.5"
        );
        assert_eq!(
            eval_to_display("1/0", &deg(), DisplayMode::Decimal),
            "Infinity"
        );
    }

    #[test]
    fn test_pipeline_is_pure() {
        let ctx = EvalContext {
            angle_unit: AngleUnit::Degrees,
            memory: 2.5,
            last_answer: Some(1.0),
        };
        let a = eval_to_display("sin(30)*M+10%", &ctx, DisplayMode::Decimal);
        let b = eval_to_display("sin(30)*M+10%", &ctx, DisplayMode::Decimal);
        assert_eq!(a, b);
        assert_eq!(a, "1.35");
    }

    #[test]
    fn test_history_entry() {
        let e = history_entry("2+3*4", &deg(), DisplayMode::Decimal);
        assert_eq!(e.expression, "2+3*4");
        assert_eq!(e.result, "14");
        let e = history_entry("255", &deg(), DisplayMode::Hex);
        assert_eq!(e.result, "FF");
    }
}
