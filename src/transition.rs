//! Guarded state transitions as data
//!
//! Every asset kind describes its state machine as a static slice of [`Rule`]s. A request is a
//! `(current state, requested code, caller's parties)` triple; the first rule matching all
//! three decides the next state. A request no rule matches leaves the state as it is.

/// Who may trigger a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// Anyone who already passed the operation's authorization check.
    Any,
    Orderer,
    Receiver,
}

/// Numeric wire codes for state enums.
pub trait StateCode: Copy + PartialEq + Sized + 'static {
    fn code(self) -> u8;
    fn from_code(code: u8) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule<S> {
    /// `None` matches any current state.
    pub from: Option<S>,
    pub code: u8,
    pub to: S,
    pub party: Party,
}

impl<S: Copy> Rule<S> {
    pub const fn new(from: S, code: u8, to: S) -> Self {
        Self {
            from: Some(from),
            code,
            to,
            party: Party::Any,
        }
    }

    pub const fn from_any(code: u8, to: S, party: Party) -> Self {
        Self {
            from: None,
            code,
            to,
            party,
        }
    }
}

/// Resolve a requested transition against `rules`.
///
/// `code` is whatever number the caller sent; codes no rule names simply match nothing.
/// `holds` reports whether the caller acts as the given party. There is no fallthrough: a
/// rule whose party the caller does not hold is skipped and never lets a later code match.
pub fn next_state<S: PartialEq + Copy>(
    rules: &[Rule<S>],
    current: S,
    code: i64,
    holds: impl Fn(Party) -> bool,
) -> Option<S> {
    rules
        .iter()
        .filter(|rule| i64::from(rule.code) == code)
        .filter(|rule| rule.from.is_none_or(|from| from == current))
        .find(|rule| rule.party == Party::Any || holds(rule.party))
        .map(|rule| rule.to)
}

/// Apply [`next_state`], returning the state the record ends up in.
pub fn apply<S: StateCode + std::fmt::Debug>(
    rules: &[Rule<S>],
    current: S,
    code: i64,
    holds: impl Fn(Party) -> bool,
) -> S {
    match next_state(rules, current, code, holds) {
        Some(next) => next,
        None => {
            tracing::warn!(?current, current_code = current.code(), code, "requested state ignored");
            current
        }
    }
}
