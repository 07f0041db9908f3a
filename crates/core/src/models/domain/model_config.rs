use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelSize {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large-v2")]
    LargeV2,
    #[serde(rename = "large-v3")]
    LargeV3,
}

impl ModelSize {
    pub const ALL: &[ModelSize] = &[
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::LargeV2,
        ModelSize::LargeV3,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::LargeV2 => "large-v2",
            ModelSize::LargeV3 => "large-v3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Accelerator when the loader reports one, CPU otherwise.
    Auto,
    Cpu,
    Cuda,
}

impl Device {
    pub const ALL: &[Device] = &[Device::Auto, Device::Cpu, Device::Cuda];

    pub fn as_str(self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }

    pub fn is_accelerator(self) -> bool {
        self == Device::Cuda
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    Float16,
    Float32,
    Int8,
}

impl ComputeType {
    pub const ALL: &[ComputeType] = &[ComputeType::Float16, ComputeType::Float32, ComputeType::Int8];

    pub fn as_str(self) -> &'static str {
        match self {
            ComputeType::Float16 => "float16",
            ComputeType::Float32 => "float32",
            ComputeType::Int8 => "int8",
        }
    }
}

macro_rules! impl_display_and_parse {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let valid: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        format!(
                            "{} must be one of: {}, got '{s}'",
                            $what,
                            valid.join(", ")
                        )
                    })
            }
        }
    };
}

impl_display_and_parse!(ModelSize, "Model size");
impl_display_and_parse!(Device, "Device");
impl_display_and_parse!(ComputeType, "Compute type");

/// Recognition model configuration: size, placement and numeric precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_size: ModelSize,
    pub device: Device,
    pub compute_type: ComputeType,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_size: ModelSize::LargeV3,
            device: Device::Auto,
            compute_type: ComputeType::Float16,
        }
    }
}

impl ModelConfig {
    /// Pins `Auto` to a concrete device. CPU placement always computes in
    /// float32.
    pub fn resolve(self, accelerator_available: bool) -> Self {
        let device = match self.device {
            Device::Auto if accelerator_available => Device::Cuda,
            Device::Auto => Device::Cpu,
            other => other,
        };
        let compute_type = if device == Device::Cpu {
            ComputeType::Float32
        } else {
            self.compute_type
        };
        Self {
            model_size: self.model_size,
            device,
            compute_type,
        }
    }
}

impl fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model={} device={} compute_type={}",
            self.model_size, self.device, self.compute_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("tiny", ModelSize::Tiny)]
    #[case("Large-V3", ModelSize::LargeV3)]
    #[case(" medium ", ModelSize::Medium)]
    fn test_parse_model_size(#[case] input: &str, #[case] expected: ModelSize) {
        assert_eq!(input.parse::<ModelSize>().unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_unknown_value() {
        let err = "huge".parse::<ModelSize>().unwrap_err();
        assert!(err.contains("large-v3"), "got: {err}");
        assert!("gpu".parse::<Device>().is_err());
        assert!("bf16".parse::<ComputeType>().is_err());
    }

    #[rstest]
    #[case::auto_with_gpu(Device::Auto, true, Device::Cuda, ComputeType::Float16)]
    #[case::auto_without_gpu(Device::Auto, false, Device::Cpu, ComputeType::Float32)]
    #[case::explicit_cpu(Device::Cpu, true, Device::Cpu, ComputeType::Float32)]
    #[case::explicit_cuda(Device::Cuda, false, Device::Cuda, ComputeType::Float16)]
    fn test_resolve(
        #[case] requested: Device,
        #[case] accelerator: bool,
        #[case] device: Device,
        #[case] compute_type: ComputeType,
    ) {
        let config = ModelConfig {
            device: requested,
            ..ModelConfig::default()
        }
        .resolve(accelerator);
        assert_eq!(config.device, device);
        assert_eq!(config.compute_type, compute_type);
        assert_eq!(config.model_size, ModelSize::LargeV3);
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&ModelConfig::default()).unwrap();
        assert_eq!(
            json,
            r#"{"model_size":"large-v3","device":"auto","compute_type":"float16"}"#
        );
    }
}
