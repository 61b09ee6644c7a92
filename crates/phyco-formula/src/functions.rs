//! Built-in formula functions

use std::sync::OnceLock;

use ahash::AHashMap;

use crate::error::{FormulaError, FormulaResult};

/// Function implementation signature
pub type FunctionImpl = fn(&[f64]) -> f64;

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (lowercase)
    pub name: &'static str,
    /// Minimum number of arguments
    pub min_args: usize,
    /// Maximum number of arguments (None for unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Check an argument count against this function's arity
    pub fn check_arity(&self, actual: usize) -> FormulaResult<()> {
        let too_few = actual < self.min_args;
        let too_many = self.max_args.map_or(false, |max| actual > max);
        if too_few || too_many {
            let expected = match self.max_args {
                Some(max) if max == self.min_args => max.to_string(),
                Some(max) => format!("{} to {}", self.min_args, max),
                None => format!("at least {}", self.min_args),
            };
            return Err(FormulaError::ArgumentCount {
                function: self.name.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Function registry
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a registry holding every built-in function
    pub fn new() -> Self {
        let mut registry = Self::default();
        register_builtins(&mut registry);
        registry
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Get a function by lowercase name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared registry of built-in functions
pub fn function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

fn unary(registry: &mut FunctionRegistry, name: &'static str, implementation: FunctionImpl) {
    registry.register(FunctionDef {
        name,
        min_args: 1,
        max_args: Some(1),
        implementation,
    });
}

fn binary(registry: &mut FunctionRegistry, name: &'static str, implementation: FunctionImpl) {
    registry.register(FunctionDef {
        name,
        min_args: 2,
        max_args: Some(2),
        implementation,
    });
}

fn register_builtins(registry: &mut FunctionRegistry) {
    unary(registry, "abs", |a| a[0].abs());
    unary(registry, "sqrt", |a| a[0].sqrt());
    unary(registry, "cbrt", |a| a[0].cbrt());
    unary(registry, "exp", |a| a[0].exp());
    unary(registry, "ln", |a| a[0].ln());
    unary(registry, "log", |a| a[0].ln());
    unary(registry, "log2", |a| a[0].log2());
    unary(registry, "log10", |a| a[0].log10());
    unary(registry, "sin", |a| a[0].sin());
    unary(registry, "cos", |a| a[0].cos());
    unary(registry, "tan", |a| a[0].tan());
    unary(registry, "asin", |a| a[0].asin());
    unary(registry, "acos", |a| a[0].acos());
    unary(registry, "atan", |a| a[0].atan());
    unary(registry, "sinh", |a| a[0].sinh());
    unary(registry, "cosh", |a| a[0].cosh());
    unary(registry, "tanh", |a| a[0].tanh());
    unary(registry, "floor", |a| a[0].floor());
    unary(registry, "ceil", |a| a[0].ceil());
    unary(registry, "round", |a| a[0].round());
    unary(registry, "trunc", |a| a[0].trunc());
    unary(registry, "sign", fn_sign);

    binary(registry, "pow", |a| a[0].powf(a[1]));
    binary(registry, "atan2", |a| a[0].atan2(a[1]));
    binary(registry, "logn", |a| a[0].ln() / a[1].ln());
    binary(registry, "hypot", |a| a[0].hypot(a[1]));

    registry.register(FunctionDef {
        name: "min",
        min_args: 1,
        max_args: None,
        implementation: fn_min,
    });
    registry.register(FunctionDef {
        name: "max",
        min_args: 1,
        max_args: None,
        implementation: fn_max,
    });
}

fn fn_sign(args: &[f64]) -> f64 {
    let x = args[0];
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

// NaN in any argument poisons the result
fn fn_min(args: &[f64]) -> f64 {
    args.iter().copied().fold(f64::INFINITY, |acc, x| {
        if acc.is_nan() || x.is_nan() {
            f64::NAN
        } else {
            acc.min(x)
        }
    })
}

fn fn_max(args: &[f64]) -> f64 {
    args.iter().copied().fold(f64::NEG_INFINITY, |acc, x| {
        if acc.is_nan() || x.is_nan() {
            f64::NAN
        } else {
            acc.max(x)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[f64]) -> f64 {
        let def = function_registry().get(name).unwrap();
        def.check_arity(args.len()).unwrap();
        (def.implementation)(args)
    }

    #[test]
    fn test_registry_contents() {
        let registry = function_registry();
        assert!(registry.get("sqrt").is_some());
        assert!(registry.get("hypot").is_some());
        assert!(registry.get("SQRT").is_none());
        assert!(registry.get("sum").is_none());
    }

    #[test]
    fn test_unary_functions() {
        assert_eq!(call("abs", &[-3.0]), 3.0);
        assert_eq!(call("sqrt", &[16.0]), 4.0);
        assert_eq!(call("floor", &[2.7]), 2.0);
        assert_eq!(call("sign", &[-0.5]), -1.0);
        assert_eq!(call("sign", &[0.0]), 0.0);
        assert!(call("sqrt", &[-1.0]).is_nan());
        assert!((call("log10", &[1000.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(call("min", &[3.0, 1.0, 2.0]), 1.0);
        assert_eq!(call("max", &[3.0, 1.0, 2.0]), 3.0);
        assert!(call("max", &[1.0, f64::NAN]).is_nan());
    }

    #[test]
    fn test_arity() {
        let registry = function_registry();
        assert!(registry.get("pow").unwrap().check_arity(1).is_err());
        assert!(registry.get("min").unwrap().check_arity(0).is_err());
        assert!(registry.get("min").unwrap().check_arity(9).is_ok());

        let err = registry.get("sqrt").unwrap().check_arity(2).unwrap_err();
        assert_eq!(
            err,
            FormulaError::ArgumentCount {
                function: "sqrt".into(),
                expected: "1".into(),
                actual: 2,
            }
        );
    }
}
