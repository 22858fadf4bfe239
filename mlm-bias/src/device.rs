//! Explicit execution context for forward passes.
//!
//! Callers state where a forward pass should run; the engine never discovers
//! it by inspecting model parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Device a model resides on and inputs are placed onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Host memory.
    #[default]
    Cpu,
    /// CUDA device by ordinal.
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda(2).to_string(), "cuda:2");
    }

    #[test]
    fn test_serde_forms() {
        assert_eq!(serde_json::to_string(&Device::Cpu).unwrap(), "\"cpu\"");
        let cuda: Device = serde_json::from_str(r#"{"cuda": 0}"#).unwrap();
        assert_eq!(cuda, Device::Cuda(0));
    }
}
