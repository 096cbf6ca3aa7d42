use lazy_static::lazy_static;

use crate::errors::*;

#[derive(Clone, Debug)]
pub(crate) enum Entry {
    Val(f64),
    Op(String, i32, bool),
    OpenB,
    Func(String),
}

pub(crate) const UNARY_MINUS: &str = "---";

lazy_static! {
    pub(crate) static ref STD_FUNCS: Vec<&'static str> = [
        "sin", "cos", "tan", "asin", "acos", "atan", "ln", "log10", "sqrt", "cbrt", "floor",
        "ceil", "abs", "exp",
    ]
    .to_vec();
}

pub(crate) struct Stack {
    queue: Vec<Entry>,
    output: Vec<Entry>,
    values: Vec<f64>,
}

impl Stack {
    // precedence and right-associativity of the closed operator set;
    // unary minus binds tighter than power, so -2**2 == 4
    fn priority(op: &str) -> (i32, bool) {
        match op {
            UNARY_MINUS => (20, true),
            "**" => (17, true),
            "*" | "/" | "mod" => (12, false),
            "+" | "-" => (8, false),
            _ => (0, false),
        }
    }

    pub(crate) fn is_func(&self, s: &str) -> bool {
        for fname in STD_FUNCS.iter() {
            if *fname == s {
                return true;
            }
        }
        false
    }

    // move operators from the queue to output while the top operator in the
    // queue has equal or greater priority
    fn pop_while_priority(&mut self, priority: i32) {
        loop {
            if self.queue.is_empty() {
                return;
            }
            // queue is not empty, so unwrap is OK
            let e = self.queue.pop().unwrap();
            match &e {
                Entry::OpenB => {
                    self.queue.push(e);
                    return;
                }
                Entry::Func(..) => {
                    self.output.push(e);
                }
                Entry::Op(_, p, right) => {
                    if *p > priority || (*p == priority && !*right) {
                        self.output.push(e);
                    } else {
                        self.queue.push(e);
                        return;
                    }
                }
                _ => return, // unreachable
            }
        }
    }

    // move operators from the queue to output until the opening bracket
    fn pop_until_bracket(&mut self) -> CalcErrorResult {
        loop {
            if self.queue.is_empty() {
                return Err(CalcError::UnbalancedParentheses);
            }

            // unwrap is ok - vector is not empty
            let e = self.queue.pop().unwrap();
            match &e {
                Entry::OpenB => return Ok(()),
                _ => self.output.push(e),
            }
        }
    }

    // move all remaining operators from queue to output.
    // Must be called only after the expression ends
    fn pop_all(&mut self) -> CalcErrorResult {
        while let Some(v) = self.queue.pop() {
            match &v {
                Entry::OpenB => return Err(CalcError::UnbalancedParentheses),
                Entry::Op(..) | Entry::Func(..) => self.output.push(v),
                _ => return Err(CalcError::Unreachable),
            }
        }
        Ok(())
    }

    // ------------ PUBLIC -----------------

    pub(crate) fn new() -> Self {
        Stack {
            queue: Vec::new(),
            output: Vec::new(),
            values: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, op: &str, val: Option<f64>) -> CalcErrorResult {
        if op.is_empty() {
            return match val {
                Some(v) => {
                    self.output.push(Entry::Val(v));
                    Ok(())
                }
                None => Err(CalcError::Unreachable),
            };
        }

        if self.is_func(op) {
            self.queue.push(Entry::Func(op.to_owned()));
            return Ok(());
        }

        if op == "(" {
            self.queue.push(Entry::OpenB);
            return Ok(());
        }
        if op == ")" {
            return self.pop_until_bracket();
        }

        let (pri, right_assoc) = Stack::priority(op);
        if pri == 0 {
            return Err(CalcError::Unreachable);
        }

        self.pop_while_priority(pri);
        self.queue.push(Entry::Op(op.to_owned(), pri, right_assoc));

        Ok(())
    }

    pub(crate) fn calculate(&mut self) -> CalcResult {
        self.pop_all()?;
        if self.output.is_empty() {
            return Err(CalcError::EmptyExpression);
        }

        self.values = Vec::new();

        for i in 0..self.output.len() {
            let o = self.output[i].clone();
            match o {
                Entry::Val(v) => {
                    self.values.push(v);
                }
                Entry::Op(op, ..) => {
                    self.process_operator(&op)?;
                }
                Entry::Func(fname) => {
                    self.process_function(&fname)?;
                }
                _ => return Err(CalcError::Unreachable),
            }
        }

        if self.values.len() != 1 {
            return Err(CalcError::Unreachable);
        }

        // values has exactly one element here - unwrap is fine
        Ok(self.values.pop().unwrap())
    }

    fn process_operator(&mut self, op: &str) -> CalcErrorResult {
        match op {
            "+" => self.binary_op(|a, b| a + b),
            "-" => self.binary_op(|a, b| a - b),
            "*" => self.binary_op(|a, b| a * b),
            // division by zero keeps float semantics: inf or NaN, never an error
            "/" => self.binary_op(|a, b| a / b),
            "mod" => self.binary_op(|a, b| a % b),
            "**" => self.binary_op(f64::powf),
            UNARY_MINUS => self.unary_op(|v| -v),
            _ => Err(CalcError::Unreachable),
        }
    }

    fn process_function(&mut self, fname: &str) -> CalcErrorResult {
        match fname {
            "sin" => self.unary_op(f64::sin),
            "cos" => self.unary_op(f64::cos),
            "tan" => self.unary_op(f64::tan),
            "asin" => self.unary_op(f64::asin),
            "acos" => self.unary_op(f64::acos),
            "atan" => self.unary_op(f64::atan),
            "ln" => self.unary_op(f64::ln),
            "log10" => self.unary_op(f64::log10),
            "sqrt" => self.unary_op(f64::sqrt),
            "cbrt" => self.unary_op(f64::cbrt),
            "floor" => self.unary_op(f64::floor),
            "ceil" => self.unary_op(f64::ceil),
            "abs" => self.unary_op(f64::abs),
            "exp" => self.unary_op(f64::exp),
            _ => Err(CalcError::Unreachable),
        }
    }

    fn unary_op<F: Fn(f64) -> f64>(&mut self, f: F) -> CalcErrorResult {
        match self.values.pop() {
            Some(v) => {
                self.values.push(f(v));
                Ok(())
            }
            None => Err(CalcError::Unreachable),
        }
    }

    fn binary_op<F: Fn(f64, f64) -> f64>(&mut self, f: F) -> CalcErrorResult {
        let v2 = match self.values.pop() {
            Some(v) => v,
            None => return Err(CalcError::Unreachable),
        };
        let v1 = match self.values.pop() {
            Some(v) => v,
            None => return Err(CalcError::Unreachable),
        };
        self.values.push(f(v1, v2));
        Ok(())
    }
}
