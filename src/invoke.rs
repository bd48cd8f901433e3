//! Entry points taking a function name and string arguments
//!
//! Argument order follows the ledger functions exposed to clients. Mutating functions return
//! the encoded record; queries return nothing and emit their results into a [`ResultSink`].
use super::config::Config;
use super::contract::{OrderContract, ProcessLineContract, ProductContract};
use super::error::ContractError;
use super::key::check_text_part;
use super::ledger::WorldState;
use super::order::{
    AssuranceDetails, Order, OrderTerms, OrderType, PaymentDetails, ProductDetails,
    ShippingDetails,
};
use super::processline::{ProcessLine, ProcessStep};
use super::product::{Product, ProductType};
use super::query::{RecordIter, RevisionIter};
use super::store::{self, Asset, KeyedStore};
use super::transition::StateCode;

/// Collects the results of query functions.
pub trait ResultSink {
    fn emit(&mut self, key: &str, value: &[u8]);
}

impl ResultSink for Vec<(String, Vec<u8>)> {
    fn emit(&mut self, key: &str, value: &[u8]) {
        self.push((key.to_string(), value.to_vec()));
    }
}

/// Run `function` of the contract registered under `contract` against `ledger`.
pub fn invoke<L: WorldState + ?Sized>(
    ledger: &L,
    config: &Config,
    contract: &str,
    function: &str,
    args: &[String],
    sink: &mut dyn ResultSink,
) -> Result<Option<Vec<u8>>, ContractError> {
    tracing::debug!(contract, function, args = args.len(), "invoke");

    if function == "instantiate" {
        return Ok(None);
    }

    let mut args = Args::new(args);
    if contract == ProcessLine::NAMESPACE {
        let contract = ProcessLineContract::new(KeyedStore::new(ledger), *config);
        process_line(&contract, function, &mut args, sink)
    } else if contract == Product::NAMESPACE {
        let contract = ProductContract::new(KeyedStore::new(ledger), *config);
        product(&contract, function, &mut args, sink)
    } else if contract == Order::NAMESPACE {
        let contract = OrderContract::new(KeyedStore::new(ledger), *config);
        order(&contract, function, &mut args, sink)
    } else {
        Err(ContractError::invalid_argument(
            "contract",
            format!("unknown contract {contract}"),
        ))
    }
}

fn process_line<L: WorldState + ?Sized>(
    contract: &ProcessLineContract<'_, L>,
    function: &str,
    args: &mut Args<'_>,
    sink: &mut dyn ResultSink,
) -> Result<Option<Vec<u8>>, ContractError> {
    match function {
        "initProcessLine" => {
            let lot_number = args.id("lotNumber")?;
            let component = args.text("component")?;
            let container_id = args.id("containerID")?;
            let manufacturer = args.key_text("manufacturer")?;
            let created_time = args.text("createdTime")?;
            let weight = args.number("weight")?;
            let temperature = args.number("temperature")?;
            let expected_product = args.key_text("expectedProduct")?;
            args.finish()?;

            let line = ProcessLine::new(
                lot_number,
                component,
                container_id,
                manufacturer,
                created_time,
                weight,
                temperature,
                expected_product,
            );
            respond(&contract.init_process_line(line)?)
        }
        "updateProcessLine" => {
            let lot_number = args.id("lotNumber")?;
            let component = args.text("newComponent")?;
            let container_id = args.id("newContainerID")?;
            let new_state = args.code("newState")?;
            let manufacturer = args.key_text("manufacturer")?;
            let updated_time = args.text("updatedTime")?;
            let weight = args.number("newWeight")?;
            let temperature = args.number("newTemperature")?;
            let expected_product = args.key_text("expectedProduct")?;
            args.finish()?;

            let key = ProcessLine::make_key(&manufacturer, &expected_product, lot_number);
            let step = ProcessStep {
                component,
                container_id,
                updated_time,
                weight,
                temperature,
            };
            respond(&contract.update_process_line(&key, new_state, &manufacturer, step)?)
        }
        "endProcessLine" => {
            let lot_number = args.id("lotNumber")?;
            let component = args.text("newComponent")?;
            let container_id = args.id("newContainerID")?;
            let manufacturer = args.key_text("manufacturer")?;
            let updated_time = args.text("updatedTime")?;
            let weight = args.number("newWeight")?;
            let temperature = args.number("newTemperature")?;
            let expected_product = args.key_text("expectedProduct")?;
            args.finish()?;

            let key = ProcessLine::make_key(&manufacturer, &expected_product, lot_number);
            let step = ProcessStep {
                component,
                container_id,
                updated_time,
                weight,
                temperature,
            };
            respond(&contract.end_process_line(&key, &manufacturer, step)?)
        }
        "queryAllProcesses" => {
            let (manufacturer, expected_product, lot_number) = key_args(args)?;
            emit_records(
                contract.query_all_processes(&manufacturer, &expected_product, lot_number)?,
                sink,
            )
        }
        "getHistoryByKey" => {
            let (manufacturer, expected_product, lot_number) = key_args(args)?;
            let key = ProcessLine::make_key(&manufacturer, &expected_product, lot_number);
            emit_revisions(contract.history_by_key(&key)?, sink)
        }
        _ => Err(unknown_function(function)),
    }
}

fn product<L: WorldState + ?Sized>(
    contract: &ProductContract<'_, L>,
    function: &str,
    args: &mut Args<'_>,
    sink: &mut dyn ResultSink,
) -> Result<Option<Vec<u8>>, ContractError> {
    match function {
        "initProduct" => {
            let product_id = args.id("productID")?;
            let name = args.key_text("name")?;
            let type_code = args.code("type")?;
            // the initial state is always INIT, the argument is accepted and ignored
            let _state = args.code("state")?;
            let from = args.text("from")?;
            let processline = args.text("processline")?;
            let created_time = args.text("createdTime")?;
            let weight = args.number("weight")?;
            let supplier = args.text("supplier")?;
            let owner = args.key_text("owner")?;
            args.finish()?;

            let product_type = named_code::<ProductType>(type_code).ok_or_else(|| {
                ContractError::invalid_argument("type", format!("unknown product type {type_code}"))
            })?;
            let product = Product::new(
                product_id,
                name,
                product_type,
                from,
                processline,
                created_time,
                weight,
                supplier,
                owner,
            );
            respond(&contract.init_product(product)?)
        }
        "updateProduct" => {
            let product_id = args.id("productID")?;
            let name = args.key_text("name")?;
            let new_state = args.code("newState")?;
            let updated_time = args.text("updatedTime")?;
            let owner = args.key_text("owner")?;
            let has_new_owner = args.flag("hasNewOwner")?;
            let new_owner = args.text("newOwner")?;
            args.finish()?;

            let key = Product::make_key(&owner, &name, product_id);
            let new_owner = has_new_owner.then_some(new_owner);
            respond(&contract.update_product(&key, new_state, &owner, new_owner, updated_time)?)
        }
        "queryAllProducts" => {
            let (owner, name, product_id) = key_args(args)?;
            emit_records(contract.query_all_products(&owner, &name, product_id)?, sink)
        }
        "getHistoryByKey" => {
            let (owner, name, product_id) = key_args(args)?;
            let key = Product::make_key(&owner, &name, product_id);
            emit_revisions(contract.history_by_key(&key)?, sink)
        }
        _ => Err(unknown_function(function)),
    }
}

fn order<L: WorldState + ?Sized>(
    contract: &OrderContract<'_, L>,
    function: &str,
    args: &mut Args<'_>,
    sink: &mut dyn ResultSink,
) -> Result<Option<Vec<u8>>, ContractError> {
    match function {
        "initOrder" => {
            let order_id = args.id("orderID")?;
            let type_code = args.code("type")?;
            let terms = order_terms(args, "")?;
            let created_time = args.text("createdTime")?;
            let orderer = args.key_text("orderer")?;
            let receiver = args.key_text("receiver")?;
            args.finish()?;

            let order_type = named_code::<OrderType>(type_code).ok_or_else(|| {
                ContractError::invalid_argument("type", format!("unknown order type {type_code}"))
            })?;
            let order = Order::new(order_id, order_type, terms, created_time, orderer, receiver);
            respond(&contract.init_order(order)?)
        }
        "modifyOrder" => {
            let order_id = args.id("orderID")?;
            let product_id = args.id("productID")?;
            let terms = order_terms(args, "new")?;
            let updated_time = args.text("updatedTime")?;
            let orderer = args.key_text("orderer")?;
            let modifier = args.text("modifier")?;
            let new_state = args.code("newState")?;
            args.finish()?;

            let key = Order::make_key(&orderer, product_id, order_id);
            respond(&contract.modify_order(&key, new_state, terms, updated_time, &modifier)?)
        }
        "updateOrder" => {
            let order_id = args.id("orderID")?;
            let product_id = args.id("productID")?;
            let updated_time = args.text("updatedTime")?;
            let orderer = args.key_text("orderer")?;
            let modifier = args.text("modifier")?;
            let new_state = args.code("newState")?;
            args.finish()?;

            let key = Order::make_key(&orderer, product_id, order_id);
            respond(&contract.update_order(&key, new_state, updated_time, &modifier)?)
        }
        "queryAllOrders" => {
            let orderer = args.key_text("orderer")?;
            let product_id = args.id("productID")?;
            let order_id = args.id("orderID")?;
            args.finish()?;
            emit_records(contract.query_all_orders(&orderer, product_id, order_id)?, sink)
        }
        "getHistoryByKey" => {
            let orderer = args.key_text("orderer")?;
            let product_id = args.id("productID")?;
            let order_id = args.id("orderID")?;
            args.finish()?;
            let key = Order::make_key(&orderer, product_id, order_id);
            emit_revisions(contract.history_by_key(&key)?, sink)
        }
        _ => Err(unknown_function(function)),
    }
}

// product, assurance, shipping and payment arguments, in that order
fn order_terms(args: &mut Args<'_>, prefix: &str) -> Result<OrderTerms, ContractError> {
    let name = |field: &str| -> String {
        if prefix.is_empty() {
            field.to_string()
        } else {
            let mut chars = field.chars();
            let first = chars.next().map(|c| c.to_ascii_uppercase());
            format!("{prefix}{}{}", first.unwrap_or_default(), chars.as_str())
        }
    };

    Ok(OrderTerms {
        product: ProductDetails {
            product_id: args.id(&name("productID"))?,
            name: args.text(&name("name"))?,
            weight: args.number(&name("weight"))?,
            price: args.number(&name("price"))?,
        },
        assurance: AssuranceDetails {
            specs: args.text(&name("specs"))?,
            qualified_operator: args.text(&name("qualifiedOperator"))?,
            methods: args.text(&name("methods"))?,
            lead_time: args.text(&name("leadTime"))?,
        },
        shipping: ShippingDetails {
            address: args.text(&name("address"))?,
            ship_method: args.text(&name("shipMethod"))?,
            trade_term: args.text(&name("tradeTerm"))?,
            dispatch_date: args.text(&name("dispatchDate"))?,
        },
        payment: PaymentDetails {
            total_amount: args.number(&name("totalAmount"))?,
            init_payment: args.number(&name("initPayment"))?,
            pay_method: args.text(&name("payMethod"))?,
        },
    })
}

// (text, text, identifier) as used by the process line and product queries
fn key_args(args: &mut Args<'_>) -> Result<(String, String, u64), ContractError> {
    let first = args.key_text("first key field")?;
    let second = args.key_text("second key field")?;
    let id = args.id("identifier")?;
    args.finish()?;
    Ok((first, second, id))
}

fn respond<R: Asset>(record: &R) -> Result<Option<Vec<u8>>, ContractError> {
    let (_, contents) = store::encode(record)?;
    Ok(Some(contents))
}

fn emit_records<R: Asset>(
    records: RecordIter<'_, R>,
    sink: &mut dyn ResultSink,
) -> Result<Option<Vec<u8>>, ContractError> {
    for item in records {
        let (key, record) = item?;
        let (_, contents) = store::encode(&record)?;
        sink.emit(key.as_str(), &contents);
    }
    Ok(None)
}

fn emit_revisions<R: Asset>(
    revisions: RevisionIter<'_, R>,
    sink: &mut dyn ResultSink,
) -> Result<Option<Vec<u8>>, ContractError> {
    for revision in revisions {
        let revision = revision?;
        let (_, contents) = store::encode(&revision.record)?;
        sink.emit(&revision.tx_id, &contents);
    }
    Ok(None)
}

// codes that name no variant, including ones past u8, resolve to nothing
fn named_code<T: StateCode>(code: i64) -> Option<T> {
    u8::try_from(code).ok().and_then(T::from_code)
}

fn unknown_function(function: &str) -> ContractError {
    ContractError::invalid_argument("function", format!("unknown function {function}"))
}

/// Positional string arguments, consumed front to back.
struct Args<'s> {
    args: &'s [String],
    pos: usize,
}

impl<'s> Args<'s> {
    fn new(args: &'s [String]) -> Self {
        Self { args, pos: 0 }
    }

    fn next(&mut self, name: &str) -> Result<&'s str, ContractError> {
        let arg = self
            .args
            .get(self.pos)
            .ok_or_else(|| ContractError::invalid_argument(name, "missing"))?;
        self.pos += 1;
        Ok(arg.as_str())
    }

    fn text(&mut self, name: &str) -> Result<String, ContractError> {
        Ok(self.next(name)?.to_string())
    }

    // text that becomes part of a composite key
    fn key_text(&mut self, name: &str) -> Result<String, ContractError> {
        let text = self.text(name)?;
        check_text_part(name, &text)?;
        Ok(text)
    }

    fn id(&mut self, name: &str) -> Result<u64, ContractError> {
        let arg = self.next(name)?;
        arg.trim()
            .parse()
            .map_err(|_| ContractError::invalid_argument(name, format!("'{arg}' is not an id")))
    }

    // any integer; whether it names a state is up to the transition tables
    fn code(&mut self, name: &str) -> Result<i64, ContractError> {
        let arg = self.next(name)?;
        arg.trim()
            .parse()
            .map_err(|_| ContractError::invalid_argument(name, format!("'{arg}' is not a code")))
    }

    fn number(&mut self, name: &str) -> Result<f64, ContractError> {
        let arg = self.next(name)?;
        match arg.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ContractError::invalid_argument(
                name,
                format!("'{arg}' is not a finite number"),
            )),
        }
    }

    fn flag(&mut self, name: &str) -> Result<bool, ContractError> {
        let arg = self.next(name)?;
        match arg.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ContractError::invalid_argument(
                name,
                format!("'{arg}' is not true or false"),
            )),
        }
    }

    fn finish(&self) -> Result<(), ContractError> {
        if self.pos < self.args.len() {
            return Err(ContractError::invalid_argument(
                "args",
                format!("expected {} arguments, got {}", self.pos, self.args.len()),
            ));
        }
        Ok(())
    }
}
