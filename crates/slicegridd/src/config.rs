//! slicegrid.toml configuration parser.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use slicegrid_placement::ScoringWeights;
use slicegrid_state::{Cluster, ResourceQuantity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub id: String,
    pub cpu_millis: u64,
    pub memory_bytes: u64,
    pub labels: Option<HashMap<String, String>>,
}

impl ClusterConfig {
    pub fn to_cluster(&self) -> Cluster {
        Cluster {
            id: self.id.clone(),
            capacity: ResourceQuantity::new(self.cpu_millis, self.memory_bytes),
            labels: self.labels.clone().unwrap_or_default(),
        }
    }
}

impl DriverConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DriverConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject duplicate cluster ids and negative weights.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::HashSet::new();
        for cluster in &self.clusters {
            if !seen.insert(cluster.id.as_str()) {
                anyhow::bail!("duplicate cluster id: {}", cluster.id);
            }
        }
        if self.scoring.bin_packing < 0.0 || self.scoring.balance < 0.0 {
            anyhow::bail!("scoring weights must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[scoring]
bin_packing = 1.0
balance = 0.0

[[clusters]]
id = "east"
cpu_millis = 64000
memory_bytes = 274877906944
labels = { region = "us-east" }

[[clusters]]
id = "west"
cpu_millis = 32000
memory_bytes = 137438953472
"#;
        let config: DriverConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scoring.bin_packing, 1.0);
        assert_eq!(config.clusters.len(), 2);

        let east = config.clusters[0].to_cluster();
        assert_eq!(east.capacity.cpu_millis, 64000);
        assert_eq!(east.labels.get("region").map(String::as_str), Some("us-east"));
        assert!(config.clusters[1].to_cluster().labels.is_empty());
    }

    #[test]
    fn test_parse_minimal_uses_default_weights() {
        let config: DriverConfig = toml::from_str("").unwrap();
        assert!(config.clusters.is_empty());
        assert_eq!(config.scoring, ScoringWeights::default());
    }

    #[test]
    fn test_partial_scoring_section() {
        let config: DriverConfig = toml::from_str("[scoring]\nbalance = 0.9\n").unwrap();
        assert_eq!(config.scoring.balance, 0.9);
        assert_eq!(config.scoring.bin_packing, ScoringWeights::default().bin_packing);
    }

    #[test]
    fn test_from_file_rejects_duplicates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[clusters]]\nid = \"a\"\ncpu_millis = 1\nmemory_bytes = 1\n\n[[clusters]]\nid = \"a\"\ncpu_millis = 2\nmemory_bytes = 2"
        )
        .unwrap();

        let err = DriverConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate cluster id"));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(DriverConfig::from_file(Path::new("/nonexistent/slicegrid.toml")).is_err());
    }
}
