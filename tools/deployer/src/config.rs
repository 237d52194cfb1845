use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use multisig_contracts::WalletState;
use multisig_encoder::ActionRequest;
use multisig_types::{
    auth::build_modules, boc::deserialize_boc_hex, Action, Address, AuthorizationContext,
    NetworkConfig, PartyList, StateInit,
};

/// Wallet parameters, as read from a JSON config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub threshold: u8,
    pub signers: Vec<Address>,
    #[serde(default)]
    pub proposers: Vec<Address>,
    /// Module address -> policy cell (hex bag of cells).
    #[serde(default)]
    pub modules: BTreeMap<Address, String>,
    /// Guard cell, hex bag of cells.
    #[serde(default)]
    pub guard: Option<String>,
    #[serde(default)]
    pub workchain: i8,
    /// Price overrides; unset fields keep basechain defaults.
    #[serde(default)]
    pub network: NetworkConfig,
}

impl WalletConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed parsing {}", path.display()))
    }

    pub fn auth(&self) -> Result<AuthorizationContext> {
        let mut auth = AuthorizationContext::new(
            self.threshold,
            PartyList::new(self.signers.clone())?,
            PartyList::new(self.proposers.clone())?,
        )?;
        let modules = self
            .modules
            .iter()
            .map(|(addr, boc)| {
                deserialize_boc_hex(boc)
                    .map(|policy| (*addr, policy))
                    .with_context(|| format!("invalid policy cell for module {addr}"))
            })
            .collect::<Result<Vec<_>>>()?;
        auth.modules = build_modules(&modules)?;
        auth.guard = self
            .guard
            .as_deref()
            .map(deserialize_boc_hex)
            .transpose()
            .context("invalid guard cell")?;
        Ok(auth)
    }

    /// Initial state of a freshly deployed Wallet.
    pub fn wallet_state(&self) -> Result<WalletState> {
        Ok(WalletState::new(self.auth()?))
    }

    pub fn state_init(&self) -> Result<StateInit> {
        Ok(self.wallet_state()?.state_init()?)
    }

    pub fn address(&self) -> Result<Address> {
        Ok(self.state_init()?.address(self.workchain)?)
    }

    /// `(is_signer, index)` under which `sender` may propose.
    pub fn proposer_slot(&self, sender: &Address) -> Result<(bool, u8)> {
        if let Some(i) = self.signers.iter().position(|a| a == sender) {
            return Ok((true, i as u8));
        }
        if let Some(i) = self.proposers.iter().position(|a| a == sender) {
            return Ok((false, i as u8));
        }
        Err(anyhow!("{sender} is neither a signer nor a proposer"))
    }
}

pub fn load_actions(path: &Path) -> Result<Vec<Action>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let requests: Vec<ActionRequest> = serde_json::from_str(&text)
        .with_context(|| format!("failed parsing actions in {}", path.display()))?;
    requests
        .iter()
        .enumerate()
        .map(|(i, r)| r.to_action().with_context(|| format!("action #{i}")))
        .collect()
}
