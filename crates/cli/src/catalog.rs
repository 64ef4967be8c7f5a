//! Functions the host can run.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Value, json};
use spindle_engine::{Arguments, AsyncFunction, Fault, SyncFunction, TargetFunction, TaskFuture};
use spindle_types::FunctionDescriptor;

/// Built-in functions keyed by name, in listing order.
pub fn builtin_catalog() -> IndexMap<String, Arc<dyn TargetFunction>> {
    let functions: Vec<Arc<dyn TargetFunction>> = vec![Arc::new(uppercase()), Arc::new(fanout()), Arc::new(measure())];
    functions
        .into_iter()
        .map(|function| (function.descriptor().name.clone(), function))
        .collect()
}

fn input_text(arguments: &Arguments) -> Result<String, Fault> {
    match arguments.require("input")? {
        Value::String(text) => Ok(text.clone()),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

/// `uppercase(input, output)`: writes the upper-cased input to `output`.
fn uppercase() -> impl TargetFunction {
    let descriptor = FunctionDescriptor::new("uppercase").with_parameter("input").with_parameter("output");
    SyncFunction::new(descriptor, |arguments: &mut Arguments| {
        let text = input_text(arguments)?;
        arguments.set("output", Value::String(text.to_uppercase()));
        Ok(())
    })
}

/// `fanout(input, messages)`: enqueues one message per whitespace-separated word.
fn fanout() -> impl TargetFunction {
    let descriptor = FunctionDescriptor::new("fanout").with_parameter("input").with_typed_parameter("messages", "queue");
    SyncFunction::new(descriptor, |arguments: &mut Arguments| {
        let text = input_text(arguments)?;
        let messages: Vec<Value> = text.split_whitespace().map(|word| json!({ "word": word })).collect();
        arguments.set("messages", Value::Array(messages));
        Ok(())
    })
}

fn measure_task(arguments: &mut Arguments) -> TaskFuture<'_> {
    Box::pin(async move {
        let text = input_text(arguments)?;
        tokio::task::yield_now().await;
        Ok(Some(json!({
            "characters": text.chars().count(),
            "words": text.split_whitespace().count(),
        })))
    })
}

/// `measure(input)`: async; returns character and word counts as the task result.
fn measure() -> impl TargetFunction {
    AsyncFunction::new(FunctionDescriptor::new("measure").with_parameter("input"), measure_task)
}
