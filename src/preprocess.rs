//! Rewrites the raw input string into a canonical arithmetic expression.
//!
//! The substitution order is a hard contract, not an implementation detail:
//! later passes must never re-match text produced by earlier ones. The order
//! is: percent forms, function calls (with angle-unit wrapping), constants,
//! the `^` power alias, the memory token, factorial suffixes, and finally the
//! parenthesis balance check.

use std::f64::consts::PI;

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

use crate::context::{AngleUnit, EvalContext};
use crate::errors::*;
use crate::value::{factorial, format_f64};

// balanced-call recursion guard, see substitute_functions
const MAX_CALL_DEPTH: usize = 64;

lazy_static! {
    // conversion factors spliced around trig calls, rendered once so the
    // literals round-trip exactly
    static ref RAD_PER_DEG: String = format_f64(PI / 180.0);
    static ref DEG_PER_RAD: String = format_f64(180.0 / PI);
    static ref PI_LIT: String = format_f64(PI);
    static ref E_LIT: String = format_f64(std::f64::consts::E);

    // constants and the memory token substitute only at word boundaries:
    // "2e" or "2M" stay untouched and fail later as a syntax error instead
    // of silently merging digit sequences
    static ref RE_PI: Regex = Regex::new(r"\bπ\b").unwrap();
    static ref RE_E: Regex = Regex::new(r"\be\b").unwrap();
    static ref RE_MEMORY: Regex = Regex::new(r"\bM\b").unwrap();
    static ref RE_FACTORIAL: Regex = Regex::new(r"(\d+(?:\.\d+)?)!").unwrap();
}

/// Rewrites `expr` into the canonical form consumed by the evaluator,
/// substituting context values for the memory token and wrapping
/// trigonometric calls according to the angle unit.
pub fn preprocess(expr: &str, ctx: &EvalContext) -> Result<String, CalcError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(CalcError::EmptyExpression);
    }

    let s = resolve_percents(trimmed)?;
    let s = substitute_functions(&s, ctx.angle_unit, 0)?;
    let s = substitute_constants(&s);
    let s = s.replace('^', "**");
    let s = substitute_memory(&s, ctx.memory);
    let s = expand_factorials(&s)?;
    check_balance(&s)?;

    trace!("preprocessed {:?} -> {:?}", expr, s);
    Ok(s)
}

// Scans backwards for a literal of the form digits[.digits] whose last
// character sits at `end`. Returns the start index.
fn number_start(chars: &[char], end: usize) -> Option<usize> {
    if !chars[end].is_ascii_digit() {
        return None;
    }
    let mut i = end;
    while i > 0 && chars[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i > 1 && chars[i - 1] == '.' && chars[i - 2].is_ascii_digit() {
        i -= 2;
        while i > 0 && chars[i - 1].is_ascii_digit() {
            i -= 1;
        }
    }
    Some(i)
}

// Scans forward for a literal of the form digits[.digits] starting at
// `start`. Returns the exclusive end index.
fn number_end(chars: &[char], start: usize) -> Option<usize> {
    if start >= chars.len() || !chars[start].is_ascii_digit() {
        return None;
    }
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        i += 2;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    Some(i)
}

// Resolves the three meanings of '%'. Each '%' is classified from its
// surroundings: followed by a numeric literal it is modulo, a suffix after
// `A+B`/`A-B` is a percent adjustment of A, any other suffix after a
// literal is a plain fraction. Every rewrite removes exactly one '%', so
// the loop terminates.
fn resolve_percents(input: &str) -> Result<String, CalcError> {
    let mut chars: Vec<char> = input.chars().collect();

    while let Some(p) = chars.iter().position(|c| *c == '%') {
        let mut after = p + 1;
        while after < chars.len() && chars[after].is_whitespace() {
            after += 1;
        }

        // index of the last character of the literal preceding '%', if any
        let before = {
            let mut i = p;
            while i > 0 && chars[i - 1].is_whitespace() {
                i -= 1;
            }
            if i == 0 {
                None
            } else {
                Some(i - 1)
            }
        };

        let start;
        let end;
        let replacement: String;

        if after < chars.len() && chars[after].is_ascii_digit() {
            // A % B -> (A mod B)
            let b_end = match number_end(&chars, after) {
                Some(e) => e,
                None => return Err(CalcError::AmbiguousPercent(p)),
            };
            let a_last = match before {
                Some(i) => i,
                None => return Err(CalcError::AmbiguousPercent(p)),
            };
            let a_start = match number_start(&chars, a_last) {
                Some(s) => s,
                None => return Err(CalcError::AmbiguousPercent(p)),
            };
            let a: String = chars[a_start..=a_last].iter().collect();
            let b: String = chars[after..b_end].iter().collect();
            replacement = format!("({} mod {})", a, b);
            start = a_start;
            end = b_end;
        } else {
            // suffix form: B% on its own, or A+B% / A-B% adjustment
            let b_last = match before {
                Some(i) => i,
                None => return Err(CalcError::AmbiguousPercent(p)),
            };
            let b_start = match number_start(&chars, b_last) {
                Some(s) => s,
                None => return Err(CalcError::AmbiguousPercent(p)),
            };
            let b: String = chars[b_start..=b_last].iter().collect();

            let mut i = b_start;
            while i > 0 && chars[i - 1].is_whitespace() {
                i -= 1;
            }
            let mut adjustment = None;
            if i > 0 && (chars[i - 1] == '+' || chars[i - 1] == '-') {
                let sign = chars[i - 1];
                let mut j = i - 1;
                while j > 0 && chars[j - 1].is_whitespace() {
                    j -= 1;
                }
                if j > 0 && chars[j - 1].is_ascii_digit() {
                    // number_start cannot fail here, chars[j-1] is a digit
                    let a_start = match number_start(&chars, j - 1) {
                        Some(s) => s,
                        None => return Err(CalcError::Unreachable),
                    };
                    let a: String = chars[a_start..j].iter().collect();
                    adjustment = Some((a_start, sign, a));
                }
            }

            match adjustment {
                Some((a_start, sign, a)) => {
                    // A+B% -> A+(B/100*A): B percent of A, added to A
                    replacement = format!("{}{}({}/100*{})", a, sign, b, a);
                    start = a_start;
                }
                None => {
                    replacement = format!("({}/100)", b);
                    start = b_start;
                }
            }
            end = p + 1;
        }

        let mut next: Vec<char> = Vec::with_capacity(chars.len() + replacement.len());
        next.extend_from_slice(&chars[..start]);
        next.extend(replacement.chars());
        next.extend_from_slice(&chars[end..]);
        chars = next;
    }

    Ok(chars.into_iter().collect())
}

#[derive(Clone, Copy, PartialEq)]
enum FnKind {
    // plain primitive call
    Direct,
    // trig function taking an angle: argument converts degrees -> radians
    TrigIn,
    // inverse trig returning an angle: result converts radians -> degrees
    TrigOut,
}

// Surface call name -> (canonical primitive, conversion kind). The
// canonical names are accepted too, so preprocessing its own output is a
// no-op.
fn call_target(name: &str) -> Option<(&'static str, FnKind)> {
    match name {
        "sin" => Some(("sin", FnKind::TrigIn)),
        "cos" => Some(("cos", FnKind::TrigIn)),
        "tan" => Some(("tan", FnKind::TrigIn)),
        "asin" => Some(("asin", FnKind::TrigOut)),
        "acos" => Some(("acos", FnKind::TrigOut)),
        "atan" => Some(("atan", FnKind::TrigOut)),
        "log" | "log10" => Some(("log10", FnKind::Direct)),
        "ln" => Some(("ln", FnKind::Direct)),
        "√" | "sqrt" => Some(("sqrt", FnKind::Direct)),
        "∛" | "cbrt" => Some(("cbrt", FnKind::Direct)),
        "floor" => Some(("floor", FnKind::Direct)),
        "ceil" => Some(("ceil", FnKind::Direct)),
        "abs" => Some(("abs", FnKind::Direct)),
        "exp" => Some(("exp", FnKind::Direct)),
        _ => None,
    }
}

// Finds the ')' matching the '(' at `open`, honoring nesting.
fn balanced_close(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (k, c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
    }
    None
}

// Rewrites every known call, scanning to the balanced closing parenthesis
// of each argument and recursing into it. In degrees mode trig arguments
// are wrapped with a degree->radian factor and inverse trig results with
// the reverse one. Identifier runs are matched maximally, so "sin" never
// fires inside "asin". Unknown identifiers are copied through and rejected
// later by the evaluator.
fn substitute_functions(
    input: &str,
    unit: AngleUnit,
    depth: usize,
) -> Result<String, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let name_len = if c == '√' || c == '∛' {
            1
        } else if c.is_ascii_alphabetic() {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_alphanumeric() {
                j += 1;
            }
            j - i
        } else {
            0
        };
        if name_len == 0 {
            out.push(c);
            i += 1;
            continue;
        }

        let name: String = chars[i..i + name_len].iter().collect();
        let open = i + name_len;
        let (prim, kind) = match call_target(&name) {
            Some(t) if open < chars.len() && chars[open] == '(' => t,
            _ => {
                out.push_str(&name);
                i = open;
                continue;
            }
        };

        if depth >= MAX_CALL_DEPTH {
            return Err(CalcError::SyntaxError(i));
        }
        let close = match balanced_close(&chars, open) {
            Some(k) => k,
            None => return Err(CalcError::UnbalancedParentheses),
        };
        let arg: String = chars[open + 1..close].iter().collect();
        let arg = substitute_functions(&arg, unit, depth + 1)?;

        match (kind, unit) {
            (FnKind::TrigIn, AngleUnit::Degrees) => {
                out.push_str(prim);
                out.push_str("((");
                out.push_str(&arg);
                out.push_str(")*");
                out.push_str(RAD_PER_DEG.as_str());
                out.push(')');
            }
            (FnKind::TrigOut, AngleUnit::Degrees) => {
                out.push('(');
                out.push_str(prim);
                out.push('(');
                out.push_str(&arg);
                out.push_str(")*");
                out.push_str(DEG_PER_RAD.as_str());
                out.push(')');
            }
            _ => {
                out.push_str(prim);
                out.push('(');
                out.push_str(&arg);
                out.push(')');
            }
        }
        i = close + 1;
    }

    Ok(out)
}

fn substitute_constants(input: &str) -> String {
    let s = RE_PI.replace_all(input, PI_LIT.as_str());
    let s = RE_E.replace_all(&s, E_LIT.as_str());
    s.into_owned()
}

fn substitute_memory(input: &str, memory: f64) -> String {
    RE_MEMORY
        .replace_all(input, format_f64(memory).as_str())
        .into_owned()
}

// Replaces every `<number>!` suffix with the evaluated factorial literal.
// Factorial is resolved here because it is not part of the evaluator
// grammar. A '!' without a literal in front is left alone and fails the
// parse later.
fn expand_factorials(input: &str) -> Result<String, CalcError> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;

    for caps in RE_FACTORIAL.captures_iter(input) {
        // group 0 always exists
        let m = caps.get(0).unwrap();
        let n: f64 = match caps[1].parse() {
            Ok(v) => v,
            Err(..) => return Err(CalcError::SyntaxError(m.start())),
        };
        let f = factorial(n)?;
        out.push_str(&input[last..m.start()]);
        if f.is_infinite() {
            // saturated: this literal overflows to +inf under float parsing,
            // which keeps the canonical string inside the closed grammar
            out.push_str("1e999");
        } else {
            out.push_str(&format_f64(f));
        }
        last = m.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

fn check_balance(s: &str) -> CalcErrorResult {
    let open = s.chars().filter(|c| *c == '(').count();
    let close = s.chars().filter(|c| *c == ')').count();
    if open == close {
        Ok(())
    } else {
        Err(CalcError::UnbalancedParentheses)
    }
}
