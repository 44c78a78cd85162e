// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Execution device selection for the pose model.
use std::fmt;
use std::str::FromStr;

/// Hardware device the ONNX Runtime session is bound to.
///
/// Accelerated devices are only available when the matching Cargo feature is
/// enabled; otherwise loading the model fails with a config error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Device {
    /// CPU execution provider.
    #[default]
    Cpu,
    /// NVIDIA CUDA, with device index.
    Cuda(usize),
    /// Apple `CoreML`.
    CoreMl,
    /// `DirectML` on Windows, with device index.
    DirectMl(usize),
}

impl Device {
    /// Name of the Cargo feature required to use this device, if any.
    #[must_use]
    pub const fn required_feature(&self) -> Option<&'static str> {
        match self {
            Self::Cpu => None,
            Self::Cuda(_) => Some("cuda"),
            Self::CoreMl => Some("coreml"),
            Self::DirectMl(_) => Some("directml"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(i) => write!(f, "cuda:{i}"),
            Self::CoreMl => write!(f, "coreml"),
            Self::DirectMl(i) => write!(f, "directml:{i}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "coreml" | "mps" => Ok(Self::CoreMl),
            _ => {
                if let Some(rest) = s.strip_prefix("cuda") {
                    parse_device_index(rest).map(Self::Cuda)
                } else if let Some(rest) = s.strip_prefix("directml") {
                    parse_device_index(rest).map(Self::DirectMl)
                } else {
                    Err(format!(
                        "Unknown device: {s} (expected cpu, cuda[:N], coreml or directml[:N])"
                    ))
                }
            }
        }
    }
}

/// Parse the optional `:N` suffix of a device string.
fn parse_device_index(s: &str) -> Result<usize, String> {
    if s.is_empty() {
        return Ok(0);
    }
    s.strip_prefix(':')
        .and_then(|index| index.parse::<usize>().ok())
        .ok_or_else(|| format!("Invalid device index: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        assert_eq!(Device::from_str("cpu").unwrap(), Device::Cpu);
        assert_eq!(Device::from_str("CPU").unwrap(), Device::Cpu);
        assert_eq!(Device::from_str("cuda").unwrap(), Device::Cuda(0));
        assert_eq!(Device::from_str("cuda:1").unwrap(), Device::Cuda(1));
        assert_eq!(Device::from_str("coreml").unwrap(), Device::CoreMl);
        assert_eq!(Device::from_str("directml:2").unwrap(), Device::DirectMl(2));
    }

    #[test]
    fn test_parse_device_rejects_garbage() {
        assert!(Device::from_str("tpu").is_err());
        assert!(Device::from_str("cuda:x").is_err());
        assert!(Device::from_str("cuda0").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for device in [Device::Cpu, Device::Cuda(3), Device::CoreMl, Device::DirectMl(1)] {
            assert_eq!(device.to_string().parse::<Device>().unwrap(), device);
        }
    }
}
