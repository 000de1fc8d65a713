//! Built-in functions for the formula language
//!
//! The set is closed: formulas can only call what [`FunctionRegistry::with_builtins`]
//! registers, and every function is a pure numeric transformation.

use anyhow::{Result, anyhow};
use reckon_types::Value;
use std::collections::HashMap;

/// Accepted argument counts for a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Trait for functions that can be called from formulas
pub trait CalculatorFunction: Send + Sync {
    /// Call the function with the given arguments
    fn call(&self, args: &[Value]) -> Result<Value>;

    /// Get the accepted argument counts
    fn arity(&self) -> Arity;

    /// Get a description of this function
    fn description(&self) -> &'static str;
}

/// Registry for formula functions
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn CalculatorFunction>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

impl FunctionRegistry {
    /// Create a new empty function registry
    pub fn new() -> Self {
        Self { functions: HashMap::new() }
    }

    /// Create a function registry with built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        let unary: [(&'static str, &'static str, fn(f64) -> f64); 7] = [
            ("abs", "Absolute value", f64::abs),
            ("floor", "Rounds down to an integer", f64::floor),
            ("ceil", "Rounds up to an integer", f64::ceil),
            ("sqrt", "Square root", f64::sqrt),
            ("ln", "Natural logarithm", f64::ln),
            ("log10", "Base-10 logarithm", f64::log10),
            ("exp", "e raised to the argument", f64::exp),
        ];
        for (name, description, op) in unary {
            registry.register(name, Box::new(UnaryMath { name, description, op }));
        }
        registry.register("min", Box::new(MinFunction));
        registry.register("max", Box::new(MaxFunction));
        registry.register("round", Box::new(RoundFunction));
        registry.register("pow", Box::new(PowerFunction));
        registry.register("clamp", Box::new(ClampFunction));

        registry
    }

    /// Register a new function
    pub fn register(&mut self, name: &str, function: Box<dyn CalculatorFunction>) {
        self.functions.insert(name.to_lowercase(), function);
    }

    /// Check that `name` exists and accepts `arg_count` arguments
    pub fn check_call(&self, name: &str, arg_count: usize) -> Result<()> {
        let function = self.lookup(name)?;
        let arity = function.arity();
        if !arity.accepts(arg_count) {
            return Err(anyhow!(
                "Function '{}' expects {} arguments, got {}",
                name,
                arity,
                arg_count
            ));
        }
        Ok(())
    }

    /// Call a function by name
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.check_call(name, args.len())?;
        self.lookup(name)?.call(args)
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Arity and description of a registered function
    pub fn describe(&self, name: &str) -> Option<(Arity, &'static str)> {
        self.lookup(name).ok().map(|f| (f.arity(), f.description()))
    }

    fn lookup(&self, name: &str) -> Result<&dyn CalculatorFunction> {
        self.functions
            .get(&name.to_lowercase())
            .map(|f| f.as_ref())
            .ok_or_else(|| anyhow!("Unknown function: {}", name))
    }
}

fn number_arg(args: &[Value], index: usize, function: &str) -> Result<f64> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(anyhow!(
            "{}() argument {} must be a number, got {}",
            function,
            index + 1,
            other.type_name()
        )),
        None => Err(anyhow!("{}() is missing argument {}", function, index + 1)),
    }
}

struct UnaryMath {
    name: &'static str,
    description: &'static str,
    op: fn(f64) -> f64,
}
impl CalculatorFunction for UnaryMath {
    fn call(&self, args: &[Value]) -> Result<Value> {
        Ok(Value::Number((self.op)(number_arg(args, 0, self.name)?)))
    }

    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }
    fn description(&self) -> &'static str {
        self.description
    }
}

struct MinFunction;
impl CalculatorFunction for MinFunction {
    fn call(&self, args: &[Value]) -> Result<Value> {
        let mut result = number_arg(args, 0, "min")?;
        for i in 1..args.len() {
            result = result.min(number_arg(args, i, "min")?);
        }
        Ok(Value::Number(result))
    }

    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn description(&self) -> &'static str {
        "Smallest of the arguments"
    }
}

struct MaxFunction;
impl CalculatorFunction for MaxFunction {
    fn call(&self, args: &[Value]) -> Result<Value> {
        let mut result = number_arg(args, 0, "max")?;
        for i in 1..args.len() {
            result = result.max(number_arg(args, i, "max")?);
        }
        Ok(Value::Number(result))
    }

    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn description(&self) -> &'static str {
        "Largest of the arguments"
    }
}

struct RoundFunction;
impl CalculatorFunction for RoundFunction {
    fn call(&self, args: &[Value]) -> Result<Value> {
        let value = number_arg(args, 0, "round")?;
        let precision = if args.len() > 1 { number_arg(args, 1, "round")? } else { 0.0 };
        if precision.fract() != 0.0 || !(0.0..=15.0).contains(&precision) {
            return Err(anyhow!("round() precision must be an integer between 0 and 15"));
        }

        let multiplier = 10.0_f64.powi(precision as i32);
        Ok(Value::Number((value * multiplier).round() / multiplier))
    }

    fn arity(&self) -> Arity {
        Arity::between(1, 2)
    }
    fn description(&self) -> &'static str {
        "Rounds a number to specified decimal places (default 0)"
    }
}

struct PowerFunction;
impl CalculatorFunction for PowerFunction {
    fn call(&self, args: &[Value]) -> Result<Value> {
        let base = number_arg(args, 0, "pow")?;
        let exponent = number_arg(args, 1, "pow")?;
        Ok(Value::Number(base.powf(exponent)))
    }

    fn arity(&self) -> Arity {
        Arity::exactly(2)
    }
    fn description(&self) -> &'static str {
        "Raises the first argument to the power of the second"
    }
}

struct ClampFunction;
impl CalculatorFunction for ClampFunction {
    fn call(&self, args: &[Value]) -> Result<Value> {
        let value = number_arg(args, 0, "clamp")?;
        let low = number_arg(args, 1, "clamp")?;
        let high = number_arg(args, 2, "clamp")?;
        if low > high {
            return Err(anyhow!("clamp() lower bound {} exceeds upper bound {}", low, high));
        }
        Ok(Value::Number(value.max(low).min(high)))
    }

    fn arity(&self) -> Arity {
        Arity::exactly(3)
    }
    fn description(&self) -> &'static str {
        "Restricts a value to the range [low, high]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_builtin_math() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(registry.call("sqrt", &[num(16.0)]).unwrap(), num(4.0));
        assert_eq!(registry.call("max", &[num(1.0), num(7.0), num(3.0)]).unwrap(), num(7.0));
        assert_eq!(registry.call("min", &[num(1.0), num(-7.0)]).unwrap(), num(-7.0));
        assert_eq!(registry.call("round", &[num(2.345), num(1.0)]).unwrap(), num(2.3));
        assert_eq!(registry.call("round", &[num(2.5)]).unwrap(), num(3.0));
        assert_eq!(registry.call("clamp", &[num(12.0), num(0.0), num(10.0)]).unwrap(), num(10.0));
        assert_eq!(registry.call("POW", &[num(2.0), num(10.0)]).unwrap(), num(1024.0));
    }

    #[test]
    fn test_arity_is_enforced() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.check_call("pow", 1).is_err());
        assert!(registry.check_call("round", 3).is_err());
        assert!(registry.check_call("max", 0).is_err());
        assert!(registry.check_call("max", 5).is_ok());
        assert!(registry.check_call("eval", 1).is_err());
    }

    #[test]
    fn test_non_numeric_arguments_fail() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry.call("abs", &[Value::Text("x".to_string())]).unwrap_err();
        assert!(err.to_string().contains("must be a number"));
        assert!(registry.call("round", &[num(1.0), num(0.5)]).is_err());
    }

    #[test]
    fn test_errors_and_descriptions_name_the_function() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry.call("sqrt", &[Value::Boolean(true)]).unwrap_err();
        assert!(err.to_string().starts_with("sqrt() argument 1"));

        assert_eq!(registry.names().len(), 12);
        let (arity, description) = registry.describe("CLAMP").unwrap();
        assert_eq!(arity, Arity::exactly(3));
        assert!(description.contains("[low, high]"));
        assert!(registry.describe("eval").is_none());
    }

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::exactly(2).to_string(), "2");
        assert_eq!(Arity::between(1, 2).to_string(), "1 to 2");
        assert_eq!(Arity::at_least(1).to_string(), "at least 1");
    }
}
