#[derive(thiserror::Error, Debug)]
pub enum ContractError {
    #[error("The asset {0} already exists")]
    DuplicateKey(String),
    #[error("The asset {0} does not exist")]
    NotFound(String),
    #[error("Asset {key} is not owned by {caller}")]
    NotOwner { key: String, caller: String },
    #[error("Asset {key} cannot be modified by {caller}")]
    NotAuthorized { key: String, caller: String },
    #[error("Asset {key} is in final state {state} and cannot be modified")]
    AlreadyFinal { key: String, state: String },
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
    #[error("Ledger storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("Ledger failure: {0}")]
    Ledger(String),
    #[error("Failed to encode record: {0}")]
    Encode(String),
    #[error("Failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

impl ContractError {
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for ContractError {
    fn from(err: minicbor::encode::Error<E>) -> Self {
        Self::Encode(err.to_string())
    }
}
