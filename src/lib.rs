//! # Scientific calculator expression engine
//!
//! Takes the raw text a user typed, rewrites it into a closed arithmetic
//! form, evaluates it with plain `f64` semantics, and renders the result
//! in the requested display mode. The engine is stateless: angle unit,
//! memory value, and previous answer arrive as an immutable context per
//! call, and the same input always produces the same output.
//!
//! The pipeline has three stages:
//! * preprocess - resolves percent forms, function names, constants, the
//!   `^` power alias, the memory token, and factorial suffixes into a
//!   canonical expression
//! * evaluate - parses the canonical expression with a fixed token grammar
//!   and executes it on an operator stack; nothing outside the grammar can
//!   run, the evaluator is not a general-purpose interpreter
//! * format - decimal, binary, or hexadecimal rendering, with the fixed
//!   tokens `NaN`, `Infinity`, and `-Infinity` for non-finite values
//!
//! The list of supported functions:
//! * trigonometric functions (including inverted ones): sin, cos, tan,
//!   asin, acos, atan - arguments or results convert automatically when
//!   the angle unit is degrees
//! * roots: `√` (sqrt), `∛` (cbrt)
//! * logarithms and exponent: log (base 10), ln, exp
//! * rounding and magnitude: floor, ceil, abs
//!
//! Operators (starting from highest priority):
//! * `!` - factorial of a literal (resolved during preprocessing)
//! * `-` - unary minus
//! * `**` (or `^`) - power
//! * `*`, `/`, modulo - the `%` token between two numbers
//! * `+`, `-` - addition, subtraction
//!
//! The `%` token has three context-dependent meanings: `10%5` is modulo,
//! `50+10%` adds ten percent of fifty, and a plain `200%` is the fraction
//! `200/100`.
//!
//! Predefined tokens:
//! * `π` - 3.14159...
//! * `e` - 2.71828...
//! * `M` - the caller-owned memory value
//!
//! Division by zero follows float semantics and renders as `Infinity`,
//! `-Infinity`, or `NaN`; it is never an error.

#[macro_use]
extern crate pest_derive;

pub mod context;
pub mod errors;
pub mod format;
pub mod parse;
pub mod preprocess;
pub mod stack;
pub mod value;

// minimal public API
pub use crate::context::{AngleUnit, DisplayMode, EvalContext, HistoryEntry};
pub use crate::errors::{CalcError, CalcResult};
pub use crate::format::format_value;
pub use crate::parse::{eval_expression, eval_to_display, evaluate, history_entry, Evaluation};
pub use crate::preprocess::preprocess;
pub use crate::value::factorial;
