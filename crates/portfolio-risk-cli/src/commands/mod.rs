pub mod history;
pub mod stress;
pub mod var;

use clap::Args;
use portfolio_risk_core::store::JsonLinesStore;

/// Optional persistence of a produced result.
#[derive(Args)]
pub struct StoreArgs {
    /// Append the result to this JSON lines history file
    #[arg(long)]
    pub store: Option<String>,

    /// Tenant the stored result belongs to
    #[arg(long, default_value = "default")]
    pub tenant: String,
}

impl StoreArgs {
    pub fn open(&self) -> Result<Option<JsonLinesStore>, Box<dyn std::error::Error>> {
        match self.store {
            Some(ref path) => Ok(Some(JsonLinesStore::open(path)?)),
            None => Ok(None),
        }
    }
}
