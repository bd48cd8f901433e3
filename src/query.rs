//! Range and history queries over one asset kind
use super::config::Config;
use super::error::ContractError;
use super::key::{CompositeKey, KeyPart, make_key};
use super::ledger::{HistoryEntry, TimeStamp, WorldState};
use super::store::{Asset, KeyedStore, decode};
use chrono::Utc;

pub type RecordIter<'a, R> = Box<dyn Iterator<Item = Result<(CompositeKey, R), ContractError>> + 'a>;
pub type RevisionIter<'a, R> = Box<dyn Iterator<Item = Result<Revision<R>, ContractError>> + 'a>;

/// A record as it was committed by one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision<R> {
    pub tx_id: String,
    pub timestamp: TimeStamp<Utc>,
    pub record: R,
}

/// Start and end keys of the scan for `prefix` from identifier `start`.
///
/// The end is `start + range_span` and is exclusive, so a scope must not allocate more than
/// `range_span` identifiers past the queried one.
pub fn range_bounds(prefix: &[KeyPart], start: u64, config: &Config) -> (CompositeKey, CompositeKey) {
    let mut lower = prefix.to_vec();
    lower.push(KeyPart::Id(start));

    let mut upper = prefix.to_vec();
    upper.push(KeyPart::Id(start.saturating_add(config.range_span)));

    (make_key(&lower), make_key(&upper))
}

/// Lazily scan the records whose trailing identifier lies in `[start, start + range_span)`.
pub fn range_by_prefix<'a, R, L>(
    store: &KeyedStore<'a, R, L>,
    config: &Config,
    prefix: &[KeyPart],
    start: u64,
) -> Result<RecordIter<'a, R>, ContractError>
where
    R: Asset + 'a,
    L: WorldState + ?Sized,
{
    let (lower, upper) = range_bounds(prefix, start, config);
    tracing::debug!(namespace = R::NAMESPACE, start = %lower, end = %upper, "range query");

    let iter = store
        .ledger()
        .state_by_range(&lower.ledger_key(R::NAMESPACE), &upper.ledger_key(R::NAMESPACE))?
        .map(|item| -> Result<(CompositeKey, R), ContractError> {
            let (ledger_key, bytes) = item?;
            let key = CompositeKey::from_ledger_key(R::NAMESPACE, &ledger_key)
                .ok_or_else(|| {
                    ContractError::Ledger(format!("{ledger_key} is outside {}", R::NAMESPACE))
                })?;
            Ok((key, decode(&bytes)?))
        });

    Ok(Box::new(iter))
}

/// Lazily walk every committed revision of `key`, oldest first.
pub fn history_by_key<'a, R, L>(
    store: &KeyedStore<'a, R, L>,
    key: &CompositeKey,
) -> Result<RevisionIter<'a, R>, ContractError>
where
    R: Asset + 'a,
    L: WorldState + ?Sized,
{
    let ledger_key = key.ledger_key(R::NAMESPACE);
    tracing::debug!(key = %ledger_key, "history query");

    let iter = store
        .ledger()
        .history_for_key(&ledger_key)?
        .map(|entry| -> Result<Revision<R>, ContractError> {
            let HistoryEntry {
                tx_id,
                timestamp,
                value,
            } = entry?;
            Ok(Revision {
                tx_id,
                timestamp,
                record: decode(&value)?,
            })
        });

    Ok(Box::new(iter))
}
