//! Mock substitution points for replay.
//!
//! A mock receives the recorded request inputs and returns the output to
//! stand in for the recorded response. Closures implement both traits, so
//! tests can register `|args| json!(...)` directly.

use serde_json::{Map, Value};

/// Substitute for a tool's recorded output, keyed by tool name.
pub trait ToolMock: Send + Sync {
    fn respond(&self, args: &Map<String, Value>) -> Value;
}

impl<F> ToolMock for F
where
    F: Fn(&Map<String, Value>) -> Value + Send + Sync,
{
    fn respond(&self, args: &Map<String, Value>) -> Value {
        self(args)
    }
}

/// Substitute for a model's recorded output, keyed by model name.
pub trait ModelMock: Send + Sync {
    fn respond(&self, prompt: &str) -> String;
}

impl<F> ModelMock for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn respond(&self, prompt: &str) -> String {
        self(prompt)
    }
}
