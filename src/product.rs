//! Tradable units of material, raw or processed
use super::key::{CompositeKey, make_key};
use super::store::Asset;
use super::transition::{Rule, StateCode};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
#[cbor(index_only)]
pub enum ProductType {
    #[n(1)]
    Raw,
    #[n(2)]
    Processed,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
#[cbor(index_only)]
pub enum ProductState {
    #[n(1)]
    Init,
    #[n(2)]
    Repackaging,
    #[n(3)]
    ReadyToUse,
    #[n(4)]
    Processing,
    #[n(5)]
    ReadyToOrder,
    #[n(6)]
    Used,
    #[n(7)]
    SoldOut,
}

// INIT fans out to every other state directly
pub const TRANSITIONS: &[Rule<ProductState>] = &[
    Rule::new(ProductState::Init, 2, ProductState::Repackaging),
    Rule::new(ProductState::Init, 3, ProductState::ReadyToUse),
    Rule::new(ProductState::Init, 4, ProductState::Processing),
    Rule::new(ProductState::Init, 5, ProductState::ReadyToOrder),
    Rule::new(ProductState::Init, 6, ProductState::Used),
    Rule::new(ProductState::Init, 7, ProductState::SoldOut),
];

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Product {
    #[n(0)]
    pub product_id: u64,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub product_type: ProductType,
    #[n(3)]
    pub from: String, // key of the source product, for raw material
    #[n(4)]
    pub processline: String, // key of the source process line, for processed material
    #[n(5)]
    pub created_time: String,
    #[n(6)]
    pub updated_time: String,
    #[n(7)]
    pub weight: f64,
    #[n(8)]
    pub supplier: String,
    #[n(9)]
    pub owner: String,
    #[n(10)]
    pub state: ProductState,
}

impl StateCode for ProductType {
    fn code(self) -> u8 {
        match self {
            Self::Raw => 1,
            Self::Processed => 2,
        }
    }
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Raw),
            2 => Some(Self::Processed),
            _ => None,
        }
    }
}

impl StateCode for ProductState {
    fn code(self) -> u8 {
        match self {
            Self::Init => 1,
            Self::Repackaging => 2,
            Self::ReadyToUse => 3,
            Self::Processing => 4,
            Self::ReadyToOrder => 5,
            Self::Used => 6,
            Self::SoldOut => 7,
        }
    }
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Init),
            2 => Some(Self::Repackaging),
            3 => Some(Self::ReadyToUse),
            4 => Some(Self::Processing),
            5 => Some(Self::ReadyToOrder),
            6 => Some(Self::Used),
            7 => Some(Self::SoldOut),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::Repackaging => "REPACKAGING",
            Self::ReadyToUse => "READY_TO_USE",
            Self::Processing => "PROCESSING",
            Self::ReadyToOrder => "READY_TO_ORDER",
            Self::Used => "USED",
            Self::SoldOut => "SOLD_OUT",
        };
        f.write_str(s)
    }
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_id: u64,
        name: String,
        product_type: ProductType,
        from: String,
        processline: String,
        created_time: String,
        weight: f64,
        supplier: String,
        owner: String,
    ) -> Self {
        Self {
            product_id,
            name,
            product_type,
            from,
            processline,
            updated_time: created_time.clone(),
            created_time,
            weight,
            supplier,
            owner,
            state: ProductState::Init,
        }
    }

    pub fn make_key(owner: &str, name: &str, product_id: u64) -> CompositeKey {
        make_key(&[owner.into(), name.into(), product_id.into()])
    }

    pub fn is_init(&self) -> bool {
        self.state == ProductState::Init
    }

    pub fn set_new_owner(&mut self, owner: String) {
        self.owner = owner;
    }

    pub fn set_update_time(&mut self, updated_time: String) {
        self.updated_time = updated_time;
    }
}

impl Asset for Product {
    const NAMESPACE: &'static str = "org.processnet.product";

    fn composite_key(&self) -> CompositeKey {
        Self::make_key(&self.owner, &self.name, self.product_id)
    }
}
