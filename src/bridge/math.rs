//! Numeric pass-throughs
//!
//! The guest has no libm; these map straight onto the host's floating point
//! functions. `%` on floats already has C `fmod` semantics.

use wasmtime::Linker;

use super::{HostState, IMPORT_MODULE};

/// Round half up, matching `Math.round` (`-2.5` rounds to `-2`)
pub fn js_round(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn js_roundf(x: f32) -> f32 {
    js_round(f64::from(x)) as f32
}

fn is_nan(x: f64) -> i32 {
    i32::from(x.is_nan())
}

fn is_nanf(x: f32) -> i32 {
    i32::from(x.is_nan())
}

pub(super) fn link(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    let env = IMPORT_MODULE;

    // libm names
    linker.func_wrap(env, "pow", f64::powf)?;
    linker.func_wrap(env, "powf", f32::powf)?;
    linker.func_wrap(env, "cosf", f32::cos)?;
    linker.func_wrap(env, "sinf", f32::sin)?;
    linker.func_wrap(env, "tanf", f32::tan)?;
    linker.func_wrap(env, "atanf", f32::atan)?;
    linker.func_wrap(env, "roundf", js_roundf)?;
    linker.func_wrap(env, "isnanf", is_nanf)?;
    linker.func_wrap(env, "fmod", |x: f64, y: f64| x % y)?;
    linker.func_wrap(env, "fmodf", |x: f32, y: f32| x % y)?;

    // JS_ names
    linker.func_wrap(env, "JS_Math_pow", f64::powf)?;
    linker.func_wrap(env, "JS_Math_cos", f64::cos)?;
    linker.func_wrap(env, "JS_Math_sin", f64::sin)?;
    linker.func_wrap(env, "JS_Math_tan", f64::tan)?;
    linker.func_wrap(env, "JS_Math_atan", f64::atan)?;
    linker.func_wrap(env, "JS_Math_round", js_round)?;
    linker.func_wrap(env, "JS_fmod", |x: f64, y: f64| x % y)?;
    linker.func_wrap(env, "JS_isNaN", is_nan)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_round_half_up() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(2.49), 2.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(-2.51), -3.0);
        assert_eq!(js_round(0.0), 0.0);
    }

    #[test]
    fn test_js_round_non_finite() {
        assert!(js_round(f64::NAN).is_nan());
        assert_eq!(js_round(f64::INFINITY), f64::INFINITY);
        assert_eq!(js_round(f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    fn test_roundf() {
        assert_eq!(js_roundf(1.5), 2.0);
        assert_eq!(js_roundf(-1.5), -1.0);
    }

    #[test]
    fn test_fmod_sign_follows_dividend() {
        assert_eq!(-7.0_f64 % 3.0, -1.0);
        assert_eq!(7.0_f64 % -3.0, 1.0);
        assert!((1.0_f64 % 0.0).is_nan());
    }

    #[test]
    fn test_is_nan() {
        assert_eq!(is_nan(f64::NAN), 1);
        assert_eq!(is_nan(1.0), 0);
        assert_eq!(is_nanf(f32::NAN), 1);
    }
}
