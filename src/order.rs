//! Purchase orders between an orderer and a receiver
use super::key::{CompositeKey, make_key};
use super::store::Asset;
use super::transition::{Party, Rule, StateCode};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
#[cbor(index_only)]
pub enum OrderType {
    #[n(1)]
    Standard,
    #[n(2)]
    TradeAssurance,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
#[cbor(index_only)]
pub enum OrderState {
    #[n(1)]
    Init,
    #[n(2)]
    Accepted,
    #[n(3)]
    Abandoned,
    #[n(4)]
    PendingCreator,
    #[n(5)]
    PendingReceiver,
    #[n(6)]
    Processing,
    #[n(7)]
    ShipOut,
}

/// Transitions reachable while modifying the order's terms.
pub const MODIFY_TRANSITIONS: &[Rule<OrderState>] = &[
    Rule::new(OrderState::Init, 4, OrderState::PendingCreator),
    Rule::new(OrderState::Init, 5, OrderState::PendingReceiver),
];

/// Transitions each party may trigger on its own.
pub const ADVANCE_TRANSITIONS: &[Rule<OrderState>] = &[
    Rule::from_any(2, OrderState::Accepted, Party::Orderer),
    Rule::from_any(3, OrderState::Abandoned, Party::Orderer),
    Rule::from_any(6, OrderState::Processing, Party::Receiver),
    Rule::from_any(7, OrderState::ShipOut, Party::Receiver),
];

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct ProductDetails {
    #[n(0)]
    pub product_id: u64,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub weight: f64,
    #[n(3)]
    pub price: f64,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct AssuranceDetails {
    #[n(0)]
    pub specs: String,
    #[n(1)]
    pub qualified_operator: String,
    #[n(2)]
    pub methods: String,
    #[n(3)]
    pub lead_time: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct ShippingDetails {
    #[n(0)]
    pub address: String,
    #[n(1)]
    pub ship_method: String,
    #[n(2)]
    pub trade_term: String,
    #[n(3)]
    pub dispatch_date: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    #[n(0)]
    pub total_amount: f64,
    #[n(1)]
    pub init_payment: f64,
    #[n(2)]
    pub pay_method: String,
}

/// The negotiable terms of an order, replaced as a whole on modification.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerms {
    pub product: ProductDetails,
    pub assurance: AssuranceDetails,
    pub shipping: ShippingDetails,
    pub payment: PaymentDetails,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Order {
    #[n(0)]
    pub order_id: u64,
    #[n(1)]
    pub order_type: OrderType,
    #[n(2)]
    pub product: ProductDetails,
    #[n(3)]
    pub assurance: Option<AssuranceDetails>, // only for trade assurance orders
    #[n(4)]
    pub shipping: ShippingDetails,
    #[n(5)]
    pub payment: PaymentDetails,
    #[n(6)]
    pub created_time: String,
    #[n(7)]
    pub updated_time: String,
    #[n(8)]
    pub orderer: String, // buyer
    #[n(9)]
    pub receiver: String, // seller
    #[n(10)]
    pub state: OrderState,
}

impl StateCode for OrderType {
    fn code(self) -> u8 {
        match self {
            Self::Standard => 1,
            Self::TradeAssurance => 2,
        }
    }
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Standard),
            2 => Some(Self::TradeAssurance),
            _ => None,
        }
    }
}

impl StateCode for OrderState {
    fn code(self) -> u8 {
        match self {
            Self::Init => 1,
            Self::Accepted => 2,
            Self::Abandoned => 3,
            Self::PendingCreator => 4,
            Self::PendingReceiver => 5,
            Self::Processing => 6,
            Self::ShipOut => 7,
        }
    }
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Init),
            2 => Some(Self::Accepted),
            3 => Some(Self::Abandoned),
            4 => Some(Self::PendingCreator),
            5 => Some(Self::PendingReceiver),
            6 => Some(Self::Processing),
            7 => Some(Self::ShipOut),
            _ => None,
        }
    }
}

impl OrderState {
    /// Terms may only change before either party has committed to the order.
    pub fn is_modifiable(self) -> bool {
        self == Self::Init
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::Accepted => "ACCEPTED",
            Self::Abandoned => "ABANDONED",
            Self::PendingCreator => "PENDING_CREATOR",
            Self::PendingReceiver => "PENDING_RECEIVER",
            Self::Processing => "PROCESSING",
            Self::ShipOut => "SHIP_OUT",
        };
        f.write_str(s)
    }
}

impl Order {
    pub fn new(
        order_id: u64,
        order_type: OrderType,
        terms: OrderTerms,
        created_time: String,
        orderer: String,
        receiver: String,
    ) -> Self {
        let assurance = (order_type == OrderType::TradeAssurance).then_some(terms.assurance);

        Self {
            order_id,
            order_type,
            product: terms.product,
            assurance,
            shipping: terms.shipping,
            payment: terms.payment,
            updated_time: created_time.clone(),
            created_time,
            orderer,
            receiver,
            state: OrderState::Init,
        }
    }

    pub fn make_key(orderer: &str, product_id: u64, order_id: u64) -> CompositeKey {
        make_key(&[orderer.into(), product_id.into(), order_id.into()])
    }

    pub fn is_init(&self) -> bool {
        self.state == OrderState::Init
    }

    pub fn is_party(&self, who: &str) -> bool {
        self.orderer == who || self.receiver == who
    }

    /// Whether `who` acts as `party` on this order.
    pub fn holds(&self, who: &str, party: Party) -> bool {
        match party {
            Party::Any => self.is_party(who),
            Party::Orderer => self.orderer == who,
            Party::Receiver => self.receiver == who,
        }
    }

    /// Replace the negotiable terms. Assurance terms are only kept on trade assurance orders.
    pub fn set_terms(&mut self, terms: OrderTerms) {
        if self.order_type == OrderType::TradeAssurance {
            self.assurance = Some(terms.assurance);
        }
        self.product = terms.product;
        self.shipping = terms.shipping;
        self.payment = terms.payment;
    }

    pub fn set_update_time(&mut self, updated_time: String) {
        self.updated_time = updated_time;
    }
}

impl Asset for Order {
    const NAMESPACE: &'static str = "org.processnet.order";

    fn composite_key(&self) -> CompositeKey {
        Self::make_key(&self.orderer, self.product.product_id, self.order_id)
    }
}
