//! World state persistence boundary and its sled backed implementation
use super::error::ContractError;
use super::utils;
use chrono::{DateTime, TimeZone, Utc};
use minicbor::bytes::ByteVec;
use sled::Transactional;
use sled::transaction::{ConflictableTransactionError, TransactionError};

pub type StateIter<'a> = Box<dyn Iterator<Item = Result<(String, Vec<u8>), ContractError>> + 'a>;
pub type HistoryIter<'a> = Box<dyn Iterator<Item = Result<HistoryEntry, ContractError>> + 'a>;

/// The primitives the contracts need from the ledger's key-value store.
///
/// Keys and values are opaque to the store, the contracts own every encoding.
pub trait WorldState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, ContractError>;
    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), ContractError>;
    /// Remove `from` and write `value` under `to` in one commit. History continues under `to`.
    fn move_state(&self, from: &str, to: &str, value: &[u8]) -> Result<(), ContractError>;
    /// Half open scan over `[start, end)` in key order.
    fn state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, ContractError>;
    /// Every value ever committed under `key`, oldest first.
    fn history_for_key(&self, key: &str) -> Result<HistoryIter<'_>, ContractError>;
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone + Eq> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone + Eq> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// One committed revision of a key along with its commit metadata.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct HistoryEntry {
    #[n(0)]
    pub tx_id: String,
    #[n(1)]
    pub timestamp: TimeStamp<Utc>,
    #[n(2)]
    pub value: ByteVec,
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// World state kept in sled: a tree of current values plus an append-only history tree.
///
/// History keys are the big endian length of the state key, the state key, then a big endian
/// commit sequence number. A prefix scan over one key returns exactly its revisions in commit
/// order, whatever bytes the key holds.
pub struct SledLedger {
    db: sled::Db,
    state: sled::Tree,
    history: sled::Tree,
}

impl SledLedger {
    pub fn new(db: sled::Db) -> Result<Self, ContractError> {
        let state = db.open_tree("world_state")?;
        let history = db.open_tree("history")?;

        Ok(Self { db, state, history })
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ContractError> {
        Self::new(sled::open(path)?)
    }

    fn history_prefix(key: &str) -> Result<Vec<u8>, ContractError> {
        let len = u32::try_from(key.len())
            .map_err(|_| ContractError::Ledger(format!("state key of {} bytes", key.len())))?;

        let mut prefix = len.to_be_bytes().to_vec();
        prefix.extend_from_slice(key.as_bytes());
        Ok(prefix)
    }

    // write `value` under `key`, dropping `replaced` if given, and append to the history of `key`
    fn commit(&self, replaced: Option<&str>, key: &str, value: &[u8]) -> Result<(), ContractError> {
        let seq = self.db.generate_id()?;
        let tx_id = utils::new_tx_id().map_err(|e| ContractError::Ledger(e.to_string()))?;

        let entry = HistoryEntry {
            tx_id,
            timestamp: TimeStamp::new(),
            value: ByteVec::from(value.to_vec()),
        };
        let entry = minicbor::to_vec(&entry)?;

        let mut history_key = Self::history_prefix(key)?;
        history_key.extend_from_slice(&seq.to_be_bytes());

        // state and history commit together or not at all
        let result: Result<(), TransactionError<()>> = (&self.state, &self.history).transaction(
            |(state, history)| {
                if let Some(replaced) = replaced {
                    state.remove(replaced.as_bytes())?;
                }
                state.insert(key.as_bytes(), value)?;
                history.insert(history_key.as_slice(), entry.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            },
        );

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Storage(err)) => Err(err.into()),
            Err(TransactionError::Abort(())) => Err(ContractError::Ledger(
                "world state transaction aborted".into(),
            )),
        }
    }
}

impl WorldState for SledLedger {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, ContractError> {
        Ok(self.state.get(key.as_bytes())?.map(|value| value.to_vec()))
    }

    fn put_state(&self, key: &str, value: &[u8]) -> Result<(), ContractError> {
        self.commit(None, key, value)
    }

    fn move_state(&self, from: &str, to: &str, value: &[u8]) -> Result<(), ContractError> {
        self.commit(Some(from), to, value)
    }

    fn state_by_range(&self, start: &str, end: &str) -> Result<StateIter<'_>, ContractError> {
        if start >= end {
            return Ok(Box::new(std::iter::empty()));
        }

        let iter = self
            .state
            .range(start.as_bytes()..end.as_bytes())
            .map(|item| -> Result<(String, Vec<u8>), ContractError> {
                let (key, value) = item?;
                let key = String::from_utf8(key.to_vec())
                    .map_err(|e| ContractError::Ledger(format!("non utf-8 state key: {e}")))?;
                Ok((key, value.to_vec()))
            });

        Ok(Box::new(iter))
    }

    fn history_for_key(&self, key: &str) -> Result<HistoryIter<'_>, ContractError> {
        let iter = self
            .history
            .scan_prefix(Self::history_prefix(key)?)
            .values()
            .map(|value| -> Result<HistoryEntry, ContractError> {
                let value = value?;
                Ok(minicbor::decode::<HistoryEntry>(&value)?)
            });

        Ok(Box::new(iter))
    }
}
