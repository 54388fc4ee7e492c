//! # Messages and Faults
//!
//! Plain owned data. Framing lives in `frame`.

use std::fmt;

use sodepack::Value;

/// An exceptional outcome attached to a message.
///
/// The wire always carries a detail value when a fault is present, so a
/// fault built with `Fault::new` holds an empty (absent, childless) detail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fault {
    name: String,
    detail: Value,
}

impl Fault {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_detail(name, Value::default())
    }

    pub fn with_detail(name: impl Into<String>, detail: Value) -> Self {
        Self { name: name.into(), detail }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn into_detail(self) -> Value {
        self.detail
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail.content().as_str() {
            Some(text) => write!(f, "{}: {}", self.name, text),
            None => write!(f, "{}", self.name),
        }
    }
}

impl std::error::Error for Fault {}

/// One complete SODEP request or response.
///
/// The id correlates a response with its request. The codec does not
/// enforce uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: i64,
    resource_path: String,
    operation_name: String,
    fault: Option<Fault>,
    payload: Value,
}

impl Message {
    pub fn new(
        id: i64,
        resource_path: impl Into<String>,
        operation_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id,
            resource_path: resource_path.into(),
            operation_name: operation_name.into(),
            fault: None,
            payload,
        }
    }

    /// Attaches `fault`, replacing any earlier one.
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Value {
        &mut self.payload
    }

    /// The payload, or the fault if one is attached.
    pub fn into_result(self) -> std::result::Result<Value, Fault> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(self.payload),
        }
    }

    /// Splits the message into `(id, resource_path, operation_name, fault, payload)`.
    pub fn into_parts(self) -> (i64, String, String, Option<Fault>, Value) {
        (self.id, self.resource_path, self.operation_name, self.fault, self.payload)
    }
}
