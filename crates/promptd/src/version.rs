//! Version and service information.

use crate::scheduler::Scheduler;

/// Daemon version from Cargo.toml.
pub const PROMPTD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reply body of the `info` method on the service root.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceInfo {
    pub version: &'static str,
    /// Currently addressable prompt paths, in table order.
    pub prompts: Vec<String>,
}

impl ServiceInfo {
    pub fn gather(scheduler: &Scheduler) -> Self {
        Self {
            version: PROMPTD_VERSION,
            prompts: scheduler
                .slots()
                .map(|slot| slot.path().as_str().to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(PROMPTD_VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!PROMPTD_VERSION.is_empty());
    }

    #[test]
    fn service_info_serializes() {
        let info = ServiceInfo {
            version: "0.0.0",
            prompts: vec!["/org/promptd/enable_gps".to_string()],
        };
        insta::assert_json_snapshot!(info, @r###"
        {
          "version": "0.0.0",
          "prompts": [
            "/org/promptd/enable_gps"
          ]
        }
        "###);
    }
}
