/// Number of identifiers covered by one range query past its starting identifier.
///
/// Range queries assume identifiers (lot numbers, product ids, order ids) are handed out in
/// blocks no larger than this within one manufacturer+product, owner+name or orderer+product
/// scope.
pub const DEFAULT_RANGE_SPAN: u64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub range_span: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            range_span: DEFAULT_RANGE_SPAN,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_range_span(mut self, span: u64) -> Self {
        self.range_span = span;
        self
    }
}
