use std::f64::EPSILON;
use std::str;

use crate::errors::*;

/// Largest integer a float can hold exactly (2^53 - 1). Factorial saturates
/// to +Infinity as soon as a partial product crosses this bound, instead of
/// drifting into inexact integer territory.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

const F64_BUF_LEN: usize = 48;

/// Renders a float as the shortest literal that parses back to the same
/// value. Used when the preprocessor splices context values (memory,
/// constants, factorial results) into the canonical expression.
pub(crate) fn format_f64(g: f64) -> String {
    if !g.is_finite() {
        return format!("{}", g);
    }
    let mut buf = [b'\0'; F64_BUF_LEN];
    match dtoa::write(&mut buf[..], g) {
        Ok(len) => match str::from_utf8(&buf[..len]) {
            Ok(s) => s.to_string(),
            Err(..) => format!("{}", g),
        },
        Err(..) => format!("{}", g),
    }
}

pub(crate) fn f64_equal(f1: f64, f2: f64) -> bool {
    (f1 - f2).abs() <= EPSILON
}

/// Returns factorial of a number.
///
/// Fails with `DomainError` for negative or non-integral arguments.
/// `factorial(0)` is `1`. Any partial product above [`MAX_SAFE_INTEGER`]
/// saturates the result to +Infinity, so the loop always terminates after
/// a handful of iterations no matter how large the argument is.
pub fn factorial(n: f64) -> CalcResult {
    if n < 0.0 {
        return Err(CalcError::DomainError(format!(
            "factorial of negative number {}",
            format_f64(n)
        )));
    }
    // NaN fails here too: NaN.fract() is NaN which is not zero
    if n.fract() != 0.0 {
        return Err(CalcError::DomainError(format!(
            "factorial of non-integral number {}",
            format_f64(n)
        )));
    }

    let mut result = 1.0f64;
    let mut i = 1.0f64;
    while i <= n {
        result *= i;
        if result > MAX_SAFE_INTEGER {
            return Ok(f64::INFINITY);
        }
        i += 1.0;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(0.0), Ok(1.0));
        assert_eq!(factorial(1.0), Ok(1.0));
        assert_eq!(factorial(5.0), Ok(120.0));
        assert_eq!(factorial(10.0), Ok(3_628_800.0));
        // 18! still fits in the exact-integer range, 19! does not
        assert_eq!(factorial(18.0), Ok(6_402_373_705_728_000.0));
        assert_eq!(factorial(19.0), Ok(f64::INFINITY));
        assert_eq!(factorial(1000.0), Ok(f64::INFINITY));
    }

    #[test]
    fn test_factorial_domain() {
        assert!(matches!(factorial(-1.0), Err(CalcError::DomainError(..))));
        assert!(matches!(factorial(3.5), Err(CalcError::DomainError(..))));
        assert!(matches!(factorial(f64::NAN), Err(CalcError::DomainError(..))));
    }

    #[test]
    fn test_format_f64() {
        assert_eq!(format_f64(0.0), "0.0");
        assert_eq!(format_f64(120.0), "120.0");
        assert_eq!(format_f64(-2.5), "-2.5");
        assert_eq!(format_f64(std::f64::consts::PI), "3.141592653589793");
        // non-finite values fall back to the std rendering
        assert_eq!(format_f64(f64::NAN), "NaN");
        // whatever the rendering, the literal must round-trip
        let v = 0.017453292519943295f64;
        let back: f64 = format_f64(v).parse().unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_f64_equal() {
        assert!(f64_equal(1.0, 1.0));
        assert!(f64_equal(1.0, 0.9999999999999999));
        assert!(!f64_equal(1.0, 1.001));
    }
}
