//! JavaScript evaluation methods for [`Page`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use webcast_runtime::{Error, Result};

use super::Page;

/// Message of a `Runtime.evaluate` exception, if the result carries one.
pub(crate) fn exception_message(result: &Value) -> Option<String> {
	let details = result.get("exceptionDetails")?;
	let message = details
		.pointer("/exception/description")
		.and_then(Value::as_str)
		.or_else(|| details.get("text").and_then(Value::as_str))
		.unwrap_or("unknown exception");
	Some(message.to_string())
}

/// Builds `(<function>)(<args...>)` with JSON-encoded arguments.
pub(crate) fn call_expression(function: &str, args: &[Value]) -> String {
	let args: Vec<String> = args.iter().map(Value::to_string).collect();
	format!("({})({})", function.trim(), args.join(", "))
}

impl Page {
	/// Evaluates an expression in the page and returns its JSON value.
	///
	/// Promises are awaited. `undefined` comes back as [`Value::Null`].
	///
	/// # Errors
	///
	/// Returns [`Error::JsException`] if the expression throws.
	pub async fn evaluate(&self, expression: &str) -> Result<Value> {
		let result = self
			.command(
				"Runtime.evaluate",
				serde_json::json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": true,
					"userGesture": true,
				}),
			)
			.await?;

		if let Some(message) = exception_message(&result) {
			return Err(Error::JsException(message));
		}

		Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
	}

	/// Evaluates JavaScript and deserializes the result to type `T`.
	pub async fn evaluate_typed<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
		let value = self.evaluate(expression).await?;
		Ok(serde_json::from_value(value)?)
	}

	/// Calls a function declaration with JSON arguments.
	///
	/// `function` is source text such as `(s, a) => document.querySelector(s)?.getAttribute(a)`.
	pub async fn call_function(&self, function: &str, args: &[Value]) -> Result<Value> {
		self.evaluate(&call_expression(function, args)).await
	}
}
