use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ErrorPayload, null_as_default};

/// Replacement text for secret arguments.
pub const SECRET_MASK: &str = "*****";

/// One argument passed to a runner action.
///
/// Secret arguments arrive as `{"_secret": true, "value": ...}` or as
/// `{"_secret": "<raw>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepArg(pub Value);

impl StepArg {
    pub fn is_secret(&self) -> bool {
        match self.0.get("_secret") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(_)) => true,
            _ => false,
        }
    }

    /// The argument as the runner itself would stringify it, secrets unmasked.
    pub fn raw_text(&self) -> String {
        if self.is_secret() {
            let raw = match self.0.get("_secret") {
                Some(Value::String(raw)) => Some(raw.clone()),
                _ => self.0.get("value").map(value_text),
            };
            return raw.unwrap_or_default();
        }
        value_text(&self.0)
    }

    /// The argument as it may be transmitted: JSON text, or [`SECRET_MASK`].
    pub fn masked_text(&self) -> String {
        if self.is_secret() {
            SECRET_MASK.to_owned()
        } else {
            self.0.to_string()
        }
    }
}

impl From<&str> for StepArg {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_owned()))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Immutable description of one nesting level: who did what, with which arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepContext {
    pub actor: String,
    pub name: String,
    #[serde(default)]
    pub args: Vec<StepArg>,
}

impl StepContext {
    pub fn new(actor: impl Into<String>, name: impl Into<String>, args: Vec<StepArg>) -> Self {
        Self {
            actor: actor.into(),
            name: name.into(),
            args,
        }
    }

    /// Comma-joined raw argument text, the comparison key for arguments.
    pub fn joined_args(&self) -> String {
        self.args
            .iter()
            .map(StepArg::raw_text)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Space-joined arguments with secrets masked.
    pub fn masked_args(&self) -> String {
        self.args
            .iter()
            .map(StepArg::masked_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// Shallow: secrets compare by raw value.
impl PartialEq for StepContext {
    fn eq(&self, other: &Self) -> bool {
        self.actor == other.actor
            && self.name == other.name
            && self.joined_args() == other.joined_args()
    }
}

impl Eq for StepContext {}

impl fmt::Display for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.actor, self.name)?;
        if !self.args.is_empty() {
            write!(f, " {}", self.masked_args())?;
        }
        Ok(())
    }
}

/// A runner step as captured by the host runner.
///
/// `meta_step` links to the wrapping step, innermost first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default = "default_actor")]
    pub actor: String,
    pub name: String,
    #[serde(default, alias = "agrs", deserialize_with = "null_as_default")]
    pub args: Vec<StepArg>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "err", alias = "error")]
    pub error: Option<ErrorPayload>,
    #[serde(default)]
    pub meta_step: Option<Box<Step>>,
}

fn default_actor() -> String {
    "I".to_owned()
}

impl Step {
    pub fn new(actor: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_args(mut self, args: Vec<StepArg>) -> Self {
        self.args = args;
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_owned());
        self
    }

    pub fn within(mut self, meta_step: Step) -> Self {
        self.meta_step = Some(Box::new(meta_step));
        self
    }

    pub fn context(&self) -> StepContext {
        StepContext::new(&self.actor, &self.name, self.args.clone())
    }

    /// The chain of wrapping meta-steps, outermost first. Empty for a top-level step.
    pub fn nesting_chain(&self) -> Vec<StepContext> {
        let mut chain = Vec::new();
        let mut link = self.meta_step.as_deref();
        while let Some(meta) = link {
            chain.push(meta.context());
            link = meta.meta_step.as_deref();
        }
        chain.reverse();
        chain
    }
}
