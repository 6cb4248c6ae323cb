//! Arithmetic tools for dose, rate, and area calculations.
//!
//! Domain errors (division by zero, negative square roots) are answered to the
//! model as `{"operation", "error"}` so it can rephrase. Malformed arguments are
//! tool failures.

use crate::{BasicToolset, FunctionTool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use soil_core::{Result, SoilError};
use std::sync::Arc;

/// Largest `n` whose factorial fits in a `u64`.
const EXACT_FACTORIAL_MAX: i64 = 20;
/// Largest `n` whose factorial is a finite `f64`.
const FLOAT_FACTORIAL_MAX: i64 = 170;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculatorOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Exponentiate,
    Factorial,
    IsPrime,
    SquareRoot,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct BinaryArgs {
    /// First operand
    a: f64,
    /// Second operand
    b: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct IntegerArg {
    /// A whole number
    n: i64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NumberArg {
    /// The number to operate on
    n: f64,
}

impl CalculatorOp {
    pub const ALL: [CalculatorOp; 8] = [
        CalculatorOp::Add,
        CalculatorOp::Subtract,
        CalculatorOp::Multiply,
        CalculatorOp::Divide,
        CalculatorOp::Exponentiate,
        CalculatorOp::Factorial,
        CalculatorOp::IsPrime,
        CalculatorOp::SquareRoot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CalculatorOp::Add => "add",
            CalculatorOp::Subtract => "subtract",
            CalculatorOp::Multiply => "multiply",
            CalculatorOp::Divide => "divide",
            CalculatorOp::Exponentiate => "exponentiate",
            CalculatorOp::Factorial => "factorial",
            CalculatorOp::IsPrime => "is_prime",
            CalculatorOp::SquareRoot => "square_root",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CalculatorOp::Add => "Add two numbers and return the result.",
            CalculatorOp::Subtract => "Subtract the second number from the first and return the result.",
            CalculatorOp::Multiply => "Multiply two numbers and return the result.",
            CalculatorOp::Divide => "Divide the first number by the second and return the result.",
            CalculatorOp::Exponentiate => "Raise the first number to the power of the second.",
            CalculatorOp::Factorial => "Calculate the factorial of a non-negative integer.",
            CalculatorOp::IsPrime => "Check whether an integer is a prime number.",
            CalculatorOp::SquareRoot => "Calculate the square root of a non-negative number.",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    fn parameters_schema(self) -> Value {
        match self {
            CalculatorOp::Factorial | CalculatorOp::IsPrime => {
                crate::schema::schema_for::<IntegerArg>()
            }
            CalculatorOp::SquareRoot => crate::schema::schema_for::<NumberArg>(),
            _ => crate::schema::schema_for::<BinaryArgs>(),
        }
    }

    fn parse<T: DeserializeOwned>(self, args: &Value) -> Result<T> {
        serde_json::from_value(args.clone())
            .map_err(|e| SoilError::tool(self.name(), format!("invalid arguments: {e}")))
    }

    /// Evaluate the operation against a JSON arguments object.
    pub fn apply(self, args: &Value) -> Result<Value> {
        let outcome = match self {
            CalculatorOp::Add => {
                let BinaryArgs { a, b } = self.parse(args)?;
                Ok(a + b)
            }
            CalculatorOp::Subtract => {
                let BinaryArgs { a, b } = self.parse(args)?;
                Ok(a - b)
            }
            CalculatorOp::Multiply => {
                let BinaryArgs { a, b } = self.parse(args)?;
                Ok(a * b)
            }
            CalculatorOp::Divide => {
                let BinaryArgs { a, b } = self.parse(args)?;
                if b == 0.0 { Err("Division by zero is undefined") } else { Ok(a / b) }
            }
            CalculatorOp::Exponentiate => {
                let BinaryArgs { a, b } = self.parse(args)?;
                Ok(a.powf(b))
            }
            CalculatorOp::SquareRoot => {
                let NumberArg { n } = self.parse(args)?;
                if n < 0.0 {
                    Err("Square root of a negative number is undefined")
                } else {
                    Ok(n.sqrt())
                }
            }
            CalculatorOp::Factorial => {
                let IntegerArg { n } = self.parse(args)?;
                return Ok(factorial(n));
            }
            CalculatorOp::IsPrime => {
                let IntegerArg { n } = self.parse(args)?;
                return Ok(json!({"operation": self.name(), "result": is_prime(n)}));
            }
        };

        Ok(match outcome {
            Ok(value) if value.is_finite() => json!({"operation": self.name(), "result": value}),
            Ok(_) => json!({"operation": self.name(), "error": "Result is not a finite number"}),
            Err(message) => json!({"operation": self.name(), "error": message}),
        })
    }

    pub fn into_tool(self) -> FunctionTool {
        FunctionTool::new(self.name(), self.description(), move |_ctx, args| async move {
            self.apply(&args)
        })
        .with_schema(self.parameters_schema())
    }
}

fn factorial(n: i64) -> Value {
    let name = CalculatorOp::Factorial.name();
    match n {
        n if n < 0 => {
            json!({"operation": name, "error": "Factorial of a negative number is undefined"})
        }
        0..=EXACT_FACTORIAL_MAX => {
            let result: u64 = (1..=n as u64).product();
            json!({"operation": name, "result": result})
        }
        n if n <= FLOAT_FACTORIAL_MAX => {
            let result: f64 = (1..=n).map(|k| k as f64).product();
            json!({"operation": name, "result": result})
        }
        _ => json!({"operation": name, "error": "Result is too large to represent"}),
    }
}

fn is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3i64;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// All calculator operations grouped as the `calculator` toolset.
pub fn calculator_toolset() -> BasicToolset {
    let tools = CalculatorOp::ALL
        .into_iter()
        .map(|op| Arc::new(op.into_tool()) as Arc<dyn soil_core::Tool>)
        .collect();
    BasicToolset::new("calculator", tools)
}
