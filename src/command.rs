//! Declarative command descriptors and the generic property accessor.
//!
//! Each instrument property is one immutable [`CommandDescriptor`] built once
//! at startup. [`CommandDescriptor::get`] and [`CommandDescriptor::set`] are
//! the only paths by which typed code reads or writes a property.
//!
//! Templates use named placeholders filled by `strfmt`:
//! `{ch}` is the channel index and `{value}` the formatted value, so
//! `C{ch}:VDIV {value}V` becomes `C1:VDIV 5.00E-02V`.

use crate::error::{ScopeError, ScopeResult};
use crate::session::ScpiSession;
use crate::validators::Validator;
use crate::value::{Value, ValueFormat};
use std::collections::HashMap;

/// Placeholder values substituted into command templates.
pub type CommandVars = HashMap<String, String>;

/// Template variables for a channel-scoped command.
pub fn channel_vars(channel: u8) -> CommandVars {
    HashMap::from([("ch".to_string(), channel.to_string())])
}

/// Template variables for an instrument-scoped command.
pub fn no_vars() -> CommandVars {
    HashMap::new()
}

/// Immutable definition of one instrument property.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    name: &'static str,
    get_command: Option<&'static str>,
    set_command: Option<&'static str>,
    validator: Option<Validator>,
    mapping: Option<Vec<(Value, &'static str)>>,
    format: ValueFormat,
    preprocess_reply: Option<fn(&str) -> String>,
    get_process: Option<fn(Value) -> ScopeResult<Value>>,
}

impl CommandDescriptor {
    fn new(
        name: &'static str,
        get_command: Option<&'static str>,
        set_command: Option<&'static str>,
    ) -> Self {
        Self {
            name,
            get_command,
            set_command,
            validator: None,
            mapping: None,
            format: ValueFormat::Text,
            preprocess_reply: None,
            get_process: None,
        }
    }

    /// Readable and writable property.
    pub fn control(name: &'static str, get: &'static str, set: &'static str) -> Self {
        Self::new(name, Some(get), Some(set))
    }

    /// Read-only property.
    pub fn measurement(name: &'static str, get: &'static str) -> Self {
        Self::new(name, Some(get), None)
    }

    /// Write-only property.
    pub fn setting(name: &'static str, set: &'static str) -> Self {
        Self::new(name, None, Some(set))
    }

    /// Validate written values.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Translate semantic values to device tokens and back.
    ///
    /// Without an explicit validator the semantic keys become a discrete set.
    pub fn with_mapping<V: Into<Value>>(
        mut self,
        table: impl IntoIterator<Item = (V, &'static str)>,
    ) -> Self {
        self.mapping = Some(table.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    /// Map `true`/`false` to `ON`/`OFF`.
    pub fn with_bool_mapping(self) -> Self {
        self.with_mapping([(true, "ON"), (false, "OFF")])
    }

    /// How the value is rendered into the write template.
    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    /// Transform the raw reply before tokenizing.
    pub fn with_preprocess(mut self, f: fn(&str) -> String) -> Self {
        self.preprocess_reply = Some(f);
        self
    }

    /// Transform the decoded value before returning it.
    pub fn with_get_process(mut self, f: fn(Value) -> ScopeResult<Value>) -> Self {
        self.get_process = Some(f);
        self
    }

    /// Property name used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fill the query template.
    pub fn query_command(&self, vars: &CommandVars) -> ScopeResult<String> {
        let template = self
            .get_command
            .ok_or_else(|| ScopeError::NotSupported(format!("{} (write-only)", self.name)))?;
        Ok(strfmt::strfmt(template, vars)?)
    }

    /// Decode a raw reply into the property value.
    pub fn decode(&self, reply: &str) -> ScopeResult<Value> {
        let reply = match self.preprocess_reply {
            Some(f) => f(reply),
            None => reply.trim().to_string(),
        };
        let mut value = Value::from_reply(&reply);
        if let Some(mapping) = &self.mapping {
            value = self.reverse_map(mapping, value)?;
        }
        match self.get_process {
            Some(f) => f(value),
            None => Ok(value),
        }
    }

    /// Validate, map and format `value` into a complete write command.
    ///
    /// Any rejection happens here, before anything is transmitted.
    pub fn encode(&self, value: Value, vars: &CommandVars) -> ScopeResult<String> {
        let template = self
            .set_command
            .ok_or_else(|| ScopeError::NotSupported(format!("{} (read-only)", self.name)))?;

        let value = match (&self.validator, &self.mapping) {
            (Some(validator), _) => validator.validate(value),
            (None, Some(mapping)) => {
                let keys: Vec<Value> = mapping.iter().map(|(k, _)| k.clone()).collect();
                Validator::DiscreteSet(keys).validate(value)
            }
            (None, None) => Ok(value),
        }
        .map_err(|e| match e {
            ScopeError::InvalidArgument(msg) => {
                ScopeError::invalid(format!("{}: {}", self.name, msg))
            }
            other => other,
        })?;

        let value = match &self.mapping {
            Some(mapping) => Value::Text(forward_map(mapping, &value)?.to_string()),
            None => value,
        };

        let mut vars = vars.clone();
        vars.insert("value".to_string(), self.format.render(&value)?);
        Ok(strfmt::strfmt(template, &vars)?)
    }

    /// Query the instrument and decode the reply.
    pub async fn get(&self, session: &ScpiSession, vars: &CommandVars) -> ScopeResult<Value> {
        let command = self.query_command(vars)?;
        let reply = session.ask(&command).await?;
        self.decode(&reply)
    }

    /// Validate and transmit a new value.
    pub async fn set(
        &self,
        session: &ScpiSession,
        value: impl Into<Value>,
        vars: &CommandVars,
    ) -> ScopeResult<()> {
        let command = self.encode(value.into(), vars)?;
        session.write(&command).await
    }

    /// Transmit a write-only action that takes no value (`ASET`, `*RST`).
    pub async fn execute(&self, session: &ScpiSession, vars: &CommandVars) -> ScopeResult<()> {
        let template = self
            .set_command
            .ok_or_else(|| ScopeError::NotSupported(format!("{} (read-only)", self.name)))?;
        session.write(&strfmt::strfmt(template, vars)?).await
    }

    fn reverse_map(&self, mapping: &[(Value, &'static str)], value: Value) -> ScopeResult<Value> {
        let lookup = |v: &Value| {
            let token = v.to_string();
            mapping
                .iter()
                .find(|(_, device)| v.matches_token(device) || token == *device)
                .map(|(semantic, _)| semantic.clone())
        };
        match value {
            Value::List(items) => Ok(Value::List(
                items
                    .into_iter()
                    .map(|item| lookup(&item).unwrap_or(item))
                    .collect(),
            )),
            scalar => lookup(&scalar).ok_or_else(|| {
                ScopeError::parse(format!(
                    "{}: unexpected reply '{}' (not in mapping table)",
                    self.name, scalar
                ))
            }),
        }
    }
}

fn forward_map<'a>(mapping: &'a [(Value, &'static str)], value: &Value) -> ScopeResult<&'a str> {
    mapping
        .iter()
        .find(|(semantic, _)| semantic == value)
        .map(|(_, device)| *device)
        .ok_or_else(|| ScopeError::invalid(format!("value {value} has no device token")))
}
