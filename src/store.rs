//! Typed record storage addressed by composite keys
use super::error::ContractError;
use super::key::CompositeKey;
use super::ledger::WorldState;
use super::utils;
use std::marker::PhantomData;

/// A record kind that can be kept in the world state.
pub trait Asset: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()> {
    /// Prefix scoping every key of this kind in the world state.
    const NAMESPACE: &'static str;

    /// Identity of the record, built from its own fields.
    fn composite_key(&self) -> CompositeKey;
}

// Serialise the record into cbor. returns a digest of the encoding and the encoding itself
pub fn encode<R: Asset>(record: &R) -> Result<(String, Vec<u8>), ContractError> {
    let contents = minicbor::to_vec(record)?;
    let hash = utils::digest(&contents);

    Ok((hash, contents))
}

pub fn decode<R: Asset>(bytes: &[u8]) -> Result<R, ContractError> {
    Ok(minicbor::decode(bytes)?)
}

/// All records of one kind, as held by a world state.
pub struct KeyedStore<'a, R, L: ?Sized> {
    ledger: &'a L,
    _record: PhantomData<R>,
}

impl<'a, R: Asset, L: WorldState + ?Sized> KeyedStore<'a, R, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            _record: PhantomData,
        }
    }

    pub fn ledger(&self) -> &'a L {
        self.ledger
    }

    pub fn exists(&self, key: &CompositeKey) -> Result<bool, ContractError> {
        Ok(self
            .ledger
            .get_state(&key.ledger_key(R::NAMESPACE))?
            .is_some())
    }

    /// Store a brand new record. Fails if its key is already taken.
    pub fn add(&self, record: &R) -> Result<CompositeKey, ContractError> {
        let key = record.composite_key();
        if self.exists(&key)? {
            return Err(ContractError::DuplicateKey(key.ledger_key(R::NAMESPACE)));
        }

        self.put(&key, record)?;
        Ok(key)
    }

    pub fn get(&self, key: &CompositeKey) -> Result<R, ContractError> {
        let ledger_key = key.ledger_key(R::NAMESPACE);
        match self.ledger.get_state(&ledger_key)? {
            Some(bytes) => decode(&bytes),
            None => Err(ContractError::NotFound(ledger_key)),
        }
    }

    /// Overwrite an existing record under its own key.
    pub fn update(&self, record: &R) -> Result<CompositeKey, ContractError> {
        self.save(&record.composite_key(), record)
    }

    /// Save a mutated copy of the record stored at `key`, which must already exist.
    ///
    /// If the mutation changed identity fields the record moves to its new key in the same
    /// commit, and the new key must be free. Returns the key the record now lives under.
    pub fn save(&self, key: &CompositeKey, record: &R) -> Result<CompositeKey, ContractError> {
        if !self.exists(key)? {
            return Err(ContractError::NotFound(key.ledger_key(R::NAMESPACE)));
        }

        let new_key = record.composite_key();
        if new_key == *key {
            self.put(key, record)?;
            return Ok(new_key);
        }
        if self.exists(&new_key)? {
            return Err(ContractError::DuplicateKey(new_key.ledger_key(R::NAMESPACE)));
        }

        let (hash, contents) = encode(record)?;
        let from = key.ledger_key(R::NAMESPACE);
        let to = new_key.ledger_key(R::NAMESPACE);

        tracing::info!(from = %from, to = %to, digest = %hash, "moving record");
        self.ledger.move_state(&from, &to, &contents)?;
        Ok(new_key)
    }

    fn put(&self, key: &CompositeKey, record: &R) -> Result<(), ContractError> {
        let (hash, contents) = encode(record)?;
        let ledger_key = key.ledger_key(R::NAMESPACE);

        tracing::debug!(key = %ledger_key, digest = %hash, "writing record");
        self.ledger.put_state(&ledger_key, &contents)
    }
}
