//! Contract operations for process lines, products and orders
//!
//! Each contract is handed the store for its asset kind when it is built. Every mutating call
//! loads the record once, checks the caller against it, mutates it and saves it once; a call
//! that fails leaves the world state untouched.
use super::config::Config;
use super::error::ContractError;
use super::key::{CompositeKey, KeyPart, check_text_part};
use super::ledger::WorldState;
use super::order::{self, Order, OrderTerms, OrderType};
use super::processline::{self, ProcessLine, ProcessStep};
use super::product::{self, Product};
use super::query::{self, RecordIter, RevisionIter};
use super::store::KeyedStore;
use super::transition::{self, Party};

pub struct ProcessLineContract<'a, L: ?Sized> {
    store: KeyedStore<'a, ProcessLine, L>,
    config: Config,
}

pub struct ProductContract<'a, L: ?Sized> {
    store: KeyedStore<'a, Product, L>,
    config: Config,
}

pub struct OrderContract<'a, L: ?Sized> {
    store: KeyedStore<'a, Order, L>,
    config: Config,
}

impl<'a, L: WorldState + ?Sized> ProcessLineContract<'a, L> {
    pub fn new(store: KeyedStore<'a, ProcessLine, L>, config: Config) -> Self {
        Self { store, config }
    }

    /// Register a new process line in `INIT`.
    pub fn init_process_line(&self, line: ProcessLine) -> Result<ProcessLine, ContractError> {
        check_text_part("manufacturer", &line.manufacturer)?;
        check_text_part("expectedProduct", &line.expected_product)?;

        let mut line = line;
        line.state = processline::ProcessLineState::Init;

        let key = self.store.add(&line)?;
        tracing::info!(key = %key, "process line created");

        Ok(line)
    }

    /// Record a process step, moving a fresh line into the requested working state.
    ///
    /// Once a line has left `INIT` the step is no longer recorded. The record is still saved.
    pub fn update_process_line(
        &self,
        key: &CompositeKey,
        new_state: i64,
        manufacturer: &str,
        step: ProcessStep,
    ) -> Result<ProcessLine, ContractError> {
        let mut line = self.store.get(key)?;
        self.require_manufacturer(key, &line, manufacturer)?;

        if line.is_init() {
            line.state = transition::apply(processline::TRANSITIONS, line.state, new_state, |_| {
                true
            });
            line.set_step(step);
        } else {
            tracing::warn!(key = %key, state = %line.state, "process line is past INIT, step ignored");
        }

        self.store.save(key, &line)?;
        tracing::debug!(key = %key, state = %line.state, "process line updated");

        Ok(line)
    }

    /// Close a process line once its component has become the expected product.
    pub fn end_process_line(
        &self,
        key: &CompositeKey,
        manufacturer: &str,
        step: ProcessStep,
    ) -> Result<ProcessLine, ContractError> {
        let mut line = self.store.get(key)?;

        if line.manufacturer != manufacturer || step.component != line.expected_product {
            tracing::warn!(key = %key, caller = manufacturer, "end of process line refused");
            return Err(ContractError::NotOwner {
                key: key.to_string(),
                caller: manufacturer.to_string(),
            });
        }
        if line.is_end() {
            return Err(ContractError::AlreadyFinal {
                key: key.to_string(),
                state: line.state.to_string(),
            });
        }

        line.set_step(step);
        line.state = processline::ProcessLineState::End;

        self.store.save(key, &line)?;
        tracing::info!(key = %key, "process line ended");

        Ok(line)
    }

    pub fn query_all_processes(
        &self,
        manufacturer: &str,
        expected_product: &str,
        lot_number: u64,
    ) -> Result<RecordIter<'a, ProcessLine>, ContractError> {
        let prefix: [KeyPart; 2] = [manufacturer.into(), expected_product.into()];
        query::range_by_prefix(&self.store, &self.config, &prefix, lot_number)
    }

    pub fn history_by_key(
        &self,
        key: &CompositeKey,
    ) -> Result<RevisionIter<'a, ProcessLine>, ContractError> {
        query::history_by_key(&self.store, key)
    }

    fn require_manufacturer(
        &self,
        key: &CompositeKey,
        line: &ProcessLine,
        manufacturer: &str,
    ) -> Result<(), ContractError> {
        if line.manufacturer != manufacturer {
            tracing::warn!(key = %key, caller = manufacturer, "process line owner mismatch");
            return Err(ContractError::NotOwner {
                key: key.to_string(),
                caller: manufacturer.to_string(),
            });
        }
        Ok(())
    }
}

impl<'a, L: WorldState + ?Sized> ProductContract<'a, L> {
    pub fn new(store: KeyedStore<'a, Product, L>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn init_product(&self, product: Product) -> Result<Product, ContractError> {
        check_text_part("owner", &product.owner)?;
        check_text_part("name", &product.name)?;

        let mut product = product;
        product.state = product::ProductState::Init;

        let key = self.store.add(&product)?;
        tracing::info!(key = %key, "product created");

        Ok(product)
    }

    /// Move a product on and/or hand it to a new owner. Only the current owner may ask.
    ///
    /// A transferred product moves to the key of its new owner, which must be free.
    pub fn update_product(
        &self,
        key: &CompositeKey,
        new_state: i64,
        owner: &str,
        new_owner: Option<String>,
        updated_time: String,
    ) -> Result<Product, ContractError> {
        let mut product = self.store.get(key)?;

        if product.owner != owner {
            tracing::warn!(key = %key, caller = owner, "product owner mismatch");
            return Err(ContractError::NotOwner {
                key: key.to_string(),
                caller: owner.to_string(),
            });
        }

        if let Some(new_owner) = new_owner {
            check_text_part("newOwner", &new_owner)?;
            tracing::info!(key = %key, from = owner, to = %new_owner, "product ownership transferred");
            product.set_new_owner(new_owner);
        }

        if product.is_init() {
            product.state =
                transition::apply(product::TRANSITIONS, product.state, new_state, |_| true);
        }
        product.set_update_time(updated_time);

        let key = self.store.save(key, &product)?;
        tracing::debug!(key = %key, state = %product.state, "product updated");

        Ok(product)
    }

    pub fn query_all_products(
        &self,
        owner: &str,
        name: &str,
        product_id: u64,
    ) -> Result<RecordIter<'a, Product>, ContractError> {
        let prefix: [KeyPart; 2] = [owner.into(), name.into()];
        query::range_by_prefix(&self.store, &self.config, &prefix, product_id)
    }

    pub fn history_by_key(
        &self,
        key: &CompositeKey,
    ) -> Result<RevisionIter<'a, Product>, ContractError> {
        query::history_by_key(&self.store, key)
    }
}

impl<'a, L: WorldState + ?Sized> OrderContract<'a, L> {
    pub fn new(store: KeyedStore<'a, Order, L>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn init_order(&self, order: Order) -> Result<Order, ContractError> {
        check_text_part("orderer", &order.orderer)?;

        let mut order = order;
        order.state = order::OrderState::Init;
        if order.order_type != OrderType::TradeAssurance {
            order.assurance = None;
        }

        let key = self.store.add(&order)?;
        tracing::info!(key = %key, "order created");

        Ok(order)
    }

    /// Replace the terms of an order that neither party has committed to yet.
    ///
    /// Changing the product moves the order to the key for that product, which must be free.
    pub fn modify_order(
        &self,
        key: &CompositeKey,
        new_state: i64,
        terms: OrderTerms,
        updated_time: String,
        modifier: &str,
    ) -> Result<Order, ContractError> {
        let mut order = self.store.get(key)?;
        self.require_party(key, &order, modifier)?;

        if !order.state.is_modifiable() {
            tracing::warn!(key = %key, state = %order.state, "order terms are locked");
            return Err(ContractError::AlreadyFinal {
                key: key.to_string(),
                state: order.state.to_string(),
            });
        }

        order.set_terms(terms);
        if order.is_init() {
            order.state = transition::apply(order::MODIFY_TRANSITIONS, order.state, new_state, |_| {
                true
            });
        }
        order.set_update_time(updated_time);

        let key = self.store.save(key, &order)?;
        tracing::debug!(key = %key, state = %order.state, "order modified");

        Ok(order)
    }

    /// Let one party move the order on. A request the caller's role does not allow leaves
    /// the state unchanged but is still stamped and saved.
    pub fn update_order(
        &self,
        key: &CompositeKey,
        new_state: i64,
        updated_time: String,
        modifier: &str,
    ) -> Result<Order, ContractError> {
        let mut order = self.store.get(key)?;
        self.require_party(key, &order, modifier)?;

        let holds = |party: Party| order.holds(modifier, party);
        let next = transition::apply(order::ADVANCE_TRANSITIONS, order.state, new_state, holds);
        order.state = next;
        order.set_update_time(updated_time);

        self.store.save(key, &order)?;
        tracing::debug!(key = %key, state = %order.state, "order updated");

        Ok(order)
    }

    pub fn query_all_orders(
        &self,
        orderer: &str,
        product_id: u64,
        order_id: u64,
    ) -> Result<RecordIter<'a, Order>, ContractError> {
        let prefix: [KeyPart; 2] = [orderer.into(), product_id.into()];
        query::range_by_prefix(&self.store, &self.config, &prefix, order_id)
    }

    pub fn history_by_key(&self, key: &CompositeKey) -> Result<RevisionIter<'a, Order>, ContractError> {
        query::history_by_key(&self.store, key)
    }

    fn require_party(
        &self,
        key: &CompositeKey,
        order: &Order,
        modifier: &str,
    ) -> Result<(), ContractError> {
        if !order.is_party(modifier) {
            tracing::warn!(key = %key, caller = modifier, "caller is not a party to the order");
            return Err(ContractError::NotAuthorized {
                key: key.to_string(),
                caller: modifier.to_string(),
            });
        }
        Ok(())
    }
}
