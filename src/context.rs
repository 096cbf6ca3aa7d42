use crate::value::format_f64;

/// Angle unit for trigonometric functions. Degrees wrap the argument
/// (direct functions) or the result (inverse functions) with a conversion;
/// radians go straight to the float primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AngleUnit {
    Degrees,
    Radians,
}

impl Default for AngleUnit {
    fn default() -> AngleUnit {
        AngleUnit::Degrees
    }
}

/// Output base for the formatter. Only the formatter looks at this;
/// evaluation is always plain float arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Decimal,
    Binary,
    Hex,
}

impl Default for DisplayMode {
    fn default() -> DisplayMode {
        DisplayMode::Decimal
    }
}

/// Read-only per-call context. The caller owns the real state (angle toggle,
/// memory accumulator, previous result) and passes a fresh snapshot with
/// every evaluation; the engine never caches or retains it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalContext {
    pub angle_unit: AngleUnit,
    /// Current value of the memory accumulator, substituted for the
    /// standalone `M` token
    pub memory: f64,
    /// Result of the previous evaluation, if any. The engine itself never
    /// reads it - see [`EvalContext::apply_ans`]
    pub last_answer: Option<f64>,
}

impl Default for EvalContext {
    fn default() -> EvalContext {
        EvalContext {
            angle_unit: AngleUnit::Degrees,
            memory: 0.0,
            last_answer: None,
        }
    }
}

impl EvalContext {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the `Ans` token with the literal of the previous answer.
    /// This is a caller-side convenience that runs before preprocessing;
    /// the engine grammar knows nothing about `Ans`. With no previous
    /// answer the text is returned unchanged and a leftover `Ans` fails
    /// later as a syntax error.
    pub fn apply_ans(&self, expr: &str) -> String {
        match self.last_answer {
            Some(ans) => expr.replace("Ans", &format_f64(ans)),
            None => expr.to_string(),
        }
    }
}

/// One line of the caller-owned history list: what was typed and what was
/// shown. The engine produces the pair; storing and bounding the list is
/// the presentation layer's job.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub expression: String,
    pub result: String,
}
