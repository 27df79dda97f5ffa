use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("{kind} name must not be empty")]
    Empty { kind: &'static str },
    #[error("{kind} name `{name}` is reserved")]
    Reserved { kind: &'static str, name: String },
    #[error("{kind} name `{name}` must not contain path separators")]
    Separator { kind: &'static str, name: String },
}

/// Check that `name` can be used as a single path component.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), KeyError> {
    if name.trim().is_empty() {
        return Err(KeyError::Empty { kind });
    }
    if name == "." || name == ".." {
        return Err(KeyError::Reserved {
            kind,
            name: name.to_string(),
        });
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(KeyError::Separator {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Identifies one engine: a (device, process-type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessKey {
    device_id: String,
    process_type: String,
}

impl ProcessKey {
    pub fn new(
        device_id: impl Into<String>,
        process_type: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let device_id = device_id.into();
        let process_type = process_type.into();
        validate_name("device", &device_id)?;
        validate_name("process", &process_type)?;
        Ok(Self {
            device_id,
            process_type,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn process_type(&self) -> &str {
        &self.process_type
    }
}

impl std::fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.device_id, self.process_type)
    }
}
