use anyhow::Context;
use process_net::{
    config::Config,
    contract::{OrderContract, ProcessLineContract, ProductContract},
    error::ContractError,
    ledger::SledLedger,
    order::{
        AssuranceDetails, Order, OrderState, OrderTerms, OrderType, PaymentDetails,
        ProductDetails, ShippingDetails,
    },
    processline::{ProcessLine, ProcessLineState, ProcessStep},
    product::{Product, ProductState, ProductType},
    store::{Asset, KeyedStore},
};

use tempfile::{TempDir, tempdir}; // Use for test db cleanup.

// Sled uses file-based locking to prevent concurrent access, so every test opens its own
// database under a temp dir. The dir must outlive the ledger.
fn open_ledger(name: &str) -> anyhow::Result<(TempDir, SledLedger)> {
    let temp_dir = tempdir()?;
    let ledger = SledLedger::open(temp_dir.path().join(name))?;
    Ok((temp_dir, ledger))
}

fn acme_lot(lot_number: u64) -> ProcessLine {
    ProcessLine::new(
        lot_number,
        "ore".into(),
        7,
        "Acme".into(),
        "2024-06-01T08:00:00Z".into(),
        120.0,
        21.5,
        "Widget".into(),
    )
}

fn step(component: &str, updated_time: &str) -> ProcessStep {
    ProcessStep {
        component: component.into(),
        container_id: 9,
        updated_time: updated_time.into(),
        weight: 118.25,
        temperature: 340.0,
    }
}

fn terms(product_id: u64, price: f64) -> OrderTerms {
    OrderTerms {
        product: ProductDetails {
            product_id,
            name: "Bolt".into(),
            weight: 4.0,
            price,
        },
        assurance: AssuranceDetails {
            specs: "ISO-9001".into(),
            qualified_operator: "QA Ltd".into(),
            methods: "sampling".into(),
            lead_time: "14d".into(),
        },
        shipping: ShippingDetails {
            address: "1 Dock Rd".into(),
            ship_method: "sea".into(),
            trade_term: "FOB".into(),
            dispatch_date: "2024-07-01".into(),
        },
        payment: PaymentDetails {
            total_amount: price * 4.0,
            init_payment: 100.0,
            pay_method: "wire".into(),
        },
    }
}

fn new_order(order_type: OrderType) -> Order {
    Order::new(
        1,
        order_type,
        terms(12, 99.5),
        "2024-06-01T08:00:00Z".into(),
        "buyer".into(),
        "seller".into(),
    )
}

#[test]
fn init_and_reject_duplicate_process_line() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("init_process_line.db")?;
    let contract = ProcessLineContract::new(KeyedStore::new(&ledger), Config::default());

    let line = contract
        .init_process_line(acme_lot(100))
        .context("Process line failed on init: ")?;
    assert_eq!(line.state, ProcessLineState::Init);

    let stored = KeyedStore::<ProcessLine, _>::new(&ledger).get(&line.composite_key())?;
    assert_eq!(stored, line);

    let duplicate = contract.init_process_line(acme_lot(100));
    assert!(matches!(duplicate, Err(ContractError::DuplicateKey(_))));

    Ok(())
}

#[test]
fn update_process_line_by_manufacturer() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("update_process_line.db")?;
    let contract = ProcessLineContract::new(KeyedStore::new(&ledger), Config::default());
    let key = contract.init_process_line(acme_lot(100))?.composite_key();

    // a different manufacturer is refused and nothing is written
    let refused = contract.update_process_line(&key, 2, "Globex", step("slurry", "t1"));
    assert!(matches!(refused, Err(ContractError::NotOwner { .. })));
    let stored = KeyedStore::<ProcessLine, _>::new(&ledger).get(&key)?;
    assert_eq!(stored, acme_lot(100));

    let line = contract
        .update_process_line(&key, 2, "Acme", step("slurry", "t1"))
        .context("Process line failed on update: ")?;

    assert_eq!(line.state, ProcessLineState::Feeding);
    assert_eq!(line.component, "slurry");
    assert_eq!(line.container_id, 9);
    assert_eq!(line.weight, 118.25);
    assert_eq!(line.temperature, 340.0);
    assert_eq!(line.updated_time, "t1");

    // past INIT the step is not recorded any more
    let line = contract.update_process_line(&key, 3, "Acme", step("paste", "t2"))?;
    assert_eq!(line.state, ProcessLineState::Feeding);
    assert_eq!(line.component, "slurry");
    assert_eq!(line.updated_time, "t1");

    Ok(())
}

#[test]
fn unknown_state_code_still_records_step() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("unknown_state_code.db")?;
    let contract = ProcessLineContract::new(KeyedStore::new(&ledger), Config::default());
    let key = contract.init_process_line(acme_lot(100))?.composite_key();

    let line = contract.update_process_line(&key, 9, "Acme", step("slurry", "t1"))?;

    assert_eq!(line.state, ProcessLineState::Init);
    assert_eq!(line.component, "slurry");

    Ok(())
}

#[test]
fn end_process_line_requires_expected_product() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("end_process_line.db")?;
    let contract = ProcessLineContract::new(KeyedStore::new(&ledger), Config::default());
    let key = contract.init_process_line(acme_lot(100))?.composite_key();

    let wrong_component = contract.end_process_line(&key, "Acme", step("slurry", "t1"));
    assert!(matches!(wrong_component, Err(ContractError::NotOwner { .. })));

    let wrong_manufacturer = contract.end_process_line(&key, "Globex", step("Widget", "t1"));
    assert!(matches!(wrong_manufacturer, Err(ContractError::NotOwner { .. })));

    let stored = KeyedStore::<ProcessLine, _>::new(&ledger).get(&key)?;
    assert_eq!(stored.state, ProcessLineState::Init);

    let line = contract
        .end_process_line(&key, "Acme", step("Widget", "t2"))
        .context("Process line failed on end: ")?;
    assert_eq!(line.state, ProcessLineState::End);
    assert_eq!(line.component, "Widget");

    let again = contract.end_process_line(&key, "Acme", step("Widget", "t3"));
    assert!(matches!(again, Err(ContractError::AlreadyFinal { .. })));

    Ok(())
}

#[test]
fn missing_process_line_is_not_found() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("missing_process_line.db")?;
    let contract = ProcessLineContract::new(KeyedStore::new(&ledger), Config::default());

    let key = ProcessLine::make_key("Acme", "Widget", 1);
    let result = contract.update_process_line(&key, 2, "Acme", step("slurry", "t1"));
    assert!(matches!(result, Err(ContractError::NotFound(_))));

    Ok(())
}

#[test]
fn range_query_covers_one_block_of_lots() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("range_query.db")?;
    let contract = ProcessLineContract::new(KeyedStore::new(&ledger), Config::default());

    for lot in [99, 100, 500, 1098, 1099, 1100, 10_000] {
        contract.init_process_line(acme_lot(lot))?;
    }
    // same manufacturer, other product
    let mut gadget = acme_lot(200);
    gadget.expected_product = "Gadget".into();
    contract.init_process_line(gadget)?;

    let lots: Vec<u64> = contract
        .query_all_processes("Acme", "Widget", 100)?
        .map(|item| item.map(|(_, line)| line.lot_number))
        .collect::<Result<_, _>>()?;

    assert_eq!(lots, vec![100, 500, 1098]);

    Ok(())
}

#[test]
fn history_lists_every_revision_oldest_first() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("history.db")?;
    let contract = ProcessLineContract::new(KeyedStore::new(&ledger), Config::default());

    let key = contract.init_process_line(acme_lot(100))?.composite_key();
    contract.update_process_line(&key, 2, "Acme", step("slurry", "t1"))?;
    contract.end_process_line(&key, "Acme", step("Widget", "t2"))?;

    let revisions = contract
        .history_by_key(&key)?
        .collect::<Result<Vec<_>, _>>()?;

    let states: Vec<ProcessLineState> = revisions.iter().map(|r| r.record.state).collect();
    assert_eq!(
        states,
        vec![
            ProcessLineState::Init,
            ProcessLineState::Feeding,
            ProcessLineState::End
        ]
    );
    assert!(revisions.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(revisions.iter().all(|r| r.tx_id.starts_with("tx_")));

    Ok(())
}

fn bolt(owner: &str) -> Product {
    Product::new(
        12,
        "Bolt".into(),
        ProductType::Raw,
        "Mine:Ore:00000000000000000001".into(),
        String::new(),
        "t0".into(),
        4.0,
        "Mine Co".into(),
        owner.into(),
    )
}

#[test]
fn product_follows_its_new_owner() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("product_transfer.db")?;
    let contract = ProductContract::new(KeyedStore::new(&ledger), Config::default());
    let acme_key = contract.init_product(bolt("Acme"))?.composite_key();

    let refused = contract.update_product(&acme_key, 2, "Globex", None, "t1".into());
    assert!(matches!(refused, Err(ContractError::NotOwner { .. })));

    let product = contract
        .update_product(&acme_key, 42, "Acme", Some("Globex".into()), "t1".into())
        .context("Product failed on transfer: ")?;
    assert_eq!(product.owner, "Globex");
    assert_eq!(product.state, ProductState::Init);
    assert_eq!(product.updated_time, "t1");

    // the record now lives under the new owner's key only
    let globex_key = Product::make_key("Globex", "Bolt", 12);
    assert_eq!(product.composite_key(), globex_key);
    let store = KeyedStore::<Product, _>::new(&ledger);
    assert!(!store.exists(&acme_key)?);
    assert_eq!(store.get(&globex_key)?, product);

    let stale_owner = contract.update_product(&acme_key, 5, "Acme", None, "t2".into());
    assert!(matches!(stale_owner, Err(ContractError::NotFound(_))));

    let product = contract.update_product(&globex_key, 5, "Globex", None, "t2".into())?;
    assert_eq!(product.state, ProductState::ReadyToOrder);

    // frozen state, but the time is still stamped
    let product = contract.update_product(&globex_key, 6, "Globex", None, "t3".into())?;
    assert_eq!(product.state, ProductState::ReadyToOrder);
    assert_eq!(product.updated_time, "t3");

    let listed: Vec<Product> = contract
        .query_all_products("Globex", "Bolt", 0)?
        .map(|item| item.map(|(_, product)| product))
        .collect::<Result<_, _>>()?;
    assert_eq!(listed, vec![product]);
    assert_eq!(contract.query_all_products("Acme", "Bolt", 0)?.count(), 0);

    Ok(())
}

#[test]
fn transfer_onto_taken_key_is_refused() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("product_transfer_taken.db")?;
    let contract = ProductContract::new(KeyedStore::new(&ledger), Config::default());
    let acme_key = contract.init_product(bolt("Acme"))?.composite_key();
    contract.init_product(bolt("Globex"))?;

    let result = contract.update_product(&acme_key, 2, "Acme", Some("Globex".into()), "t1".into());
    assert!(matches!(result, Err(ContractError::DuplicateKey(_))));

    let untouched = KeyedStore::<Product, _>::new(&ledger).get(&acme_key)?;
    assert_eq!(untouched.owner, "Acme");
    assert_eq!(untouched.state, ProductState::Init);

    let invalid = contract.update_product(&acme_key, 2, "Acme", Some("Glo:bex".into()), "t1".into());
    assert!(matches!(invalid, Err(ContractError::InvalidArgument { .. })));

    Ok(())
}

#[test]
fn order_advance_is_bound_to_party() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("order_advance.db")?;
    let contract = OrderContract::new(KeyedStore::new(&ledger), Config::default());
    let key = contract.init_order(new_order(OrderType::Standard))?.composite_key();

    // receiver may not accept, but the call still stamps the time
    let order = contract.update_order(&key, 2, "t1".into(), "seller")?;
    assert_eq!(order.state, OrderState::Init);
    assert_eq!(order.updated_time, "t1");

    let order = contract
        .update_order(&key, 2, "t2".into(), "buyer")
        .context("Order failed on accept: ")?;
    assert_eq!(order.state, OrderState::Accepted);

    let order = contract.update_order(&key, 6, "t3".into(), "seller")?;
    assert_eq!(order.state, OrderState::Processing);

    let order = contract.update_order(&key, 7, "t4".into(), "seller")?;
    assert_eq!(order.state, OrderState::ShipOut);

    let stranger = contract.update_order(&key, 3, "t5".into(), "mallory");
    assert!(matches!(stranger, Err(ContractError::NotAuthorized { .. })));

    Ok(())
}

#[test]
fn order_modify_until_committed() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("order_modify.db")?;
    let contract = OrderContract::new(KeyedStore::new(&ledger), Config::default());
    let key = contract
        .init_order(new_order(OrderType::TradeAssurance))?
        .composite_key();

    let stranger = contract.modify_order(&key, 4, terms(12, 80.0), "t1".into(), "mallory");
    assert!(matches!(stranger, Err(ContractError::NotAuthorized { .. })));

    // either party may modify, not only the one who is both
    let mut new_terms = terms(12, 80.0);
    new_terms.assurance.lead_time = "7d".into();
    let order = contract
        .modify_order(&key, 4, new_terms, "t1".into(), "seller")
        .context("Order failed on modify: ")?;
    assert_eq!(order.state, OrderState::PendingCreator);
    assert_eq!(order.product.price, 80.0);
    assert_eq!(order.assurance.as_ref().map(|a| a.lead_time.as_str()), Some("7d"));
    assert_eq!(order.updated_time, "t1");

    let locked = contract.modify_order(&key, 5, terms(12, 70.0), "t2".into(), "buyer");
    assert!(matches!(locked, Err(ContractError::AlreadyFinal { .. })));

    let stored = KeyedStore::<Order, _>::new(&ledger).get(&key)?;
    assert_eq!(stored.product.price, 80.0);

    Ok(())
}

#[test]
fn modified_product_id_moves_order() -> anyhow::Result<()> {
    let (_dir, ledger) = open_ledger("order_rekey.db")?;
    let contract = OrderContract::new(KeyedStore::new(&ledger), Config::default());
    let key = contract.init_order(new_order(OrderType::Standard))?.composite_key();

    let order = contract.modify_order(&key, 1, terms(99, 99.5), "t1".into(), "buyer")?;
    assert_eq!(order.product.product_id, 99);
    assert_eq!(order.assurance, None);

    let moved = Order::make_key("buyer", 99, 1);
    assert_eq!(order.composite_key(), moved);

    let store = KeyedStore::<Order, _>::new(&ledger);
    assert!(!store.exists(&key)?);
    assert_eq!(store.get(&moved)?, order);

    // the order is reachable under the new product from then on
    let order = contract.update_order(&moved, 2, "t2".into(), "buyer")?;
    assert_eq!(order.state, OrderState::Accepted);

    Ok(())
}
