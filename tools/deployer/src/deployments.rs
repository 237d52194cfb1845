use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use multisig_types::Address;

/// Deployments JSON shared with other tooling. Entries and top-level keys
/// this tool does not know are carried through untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeploymentsFile {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub deployments: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// What is recorded for one Wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDeployment {
    pub address: Address,
    pub workchain: i8,
    pub threshold: u8,
    pub signers: usize,
    pub proposers: usize,
    /// Hex bag of cells to attach to the deploying message.
    pub state_init_boc: String,
    pub recorded_at: String,
}

pub fn timestamp() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed formatting timestamp")
}

impl DeploymentsFile {
    /// Reads `path`; a missing or blank file is an empty record.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("failed reading {}", path.display())),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&text).with_context(|| format!("failed parsing JSON in {}", path.display()))
    }

    pub fn record(&mut self, network: &str, key: &str, entry: &WalletDeployment) -> Result<()> {
        self.network = network.to_string();
        self.updated_at = entry.recorded_at.clone();
        self.deployments
            .insert(key.to_string(), serde_json::to_value(entry)?);
        Ok(())
    }

    /// Writes through a sibling temp file so readers never see a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating directory {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("failed serialising deployments")?;
        let tmp = temp_sibling(path);
        fs::write(&tmp, text).with_context(|| format!("failed writing {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("failed replacing {}", path.display()))
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
