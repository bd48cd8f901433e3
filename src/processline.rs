//! Manufacturing process runs producing a lot of material
use super::key::{CompositeKey, make_key};
use super::store::Asset;
use super::transition::{Rule, StateCode};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
#[cbor(index_only)]
pub enum ProcessLineState {
    #[n(1)]
    Init,
    #[n(2)]
    Feeding,
    #[n(3)]
    Reacting,
    #[n(4)]
    Transit,
    #[n(5)]
    End,
}

// only a fresh process line may move, and only into one of the working states
pub const TRANSITIONS: &[Rule<ProcessLineState>] = &[
    Rule::new(ProcessLineState::Init, 2, ProcessLineState::Feeding),
    Rule::new(ProcessLineState::Init, 3, ProcessLineState::Reacting),
    Rule::new(ProcessLineState::Init, 4, ProcessLineState::Transit),
];

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct ProcessLine {
    #[n(0)]
    pub lot_number: u64,
    #[n(1)]
    pub component: String, // current input material
    #[n(2)]
    pub container_id: u64,
    #[n(3)]
    pub manufacturer: String, // owning principal
    #[n(4)]
    pub created_time: String,
    #[n(5)]
    pub updated_time: String,
    #[n(6)]
    pub weight: f64,
    #[n(7)]
    pub temperature: f64, // avg. temperature within the container
    #[n(8)]
    pub expected_product: String,
    #[n(9)]
    pub state: ProcessLineState,
}

/// Readings taken for one step of a process line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessStep {
    pub component: String,
    pub container_id: u64,
    pub updated_time: String,
    pub weight: f64,
    pub temperature: f64,
}

impl StateCode for ProcessLineState {
    fn code(self) -> u8 {
        match self {
            Self::Init => 1,
            Self::Feeding => 2,
            Self::Reacting => 3,
            Self::Transit => 4,
            Self::End => 5,
        }
    }
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Init),
            2 => Some(Self::Feeding),
            3 => Some(Self::Reacting),
            4 => Some(Self::Transit),
            5 => Some(Self::End),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessLineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::Feeding => "FEEDING",
            Self::Reacting => "REACTING",
            Self::Transit => "TRANSIT",
            Self::End => "END",
        };
        f.write_str(s)
    }
}

impl ProcessLine {
    /// A new process line. It starts in `INIT` with its update time equal to its creation time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lot_number: u64,
        component: String,
        container_id: u64,
        manufacturer: String,
        created_time: String,
        weight: f64,
        temperature: f64,
        expected_product: String,
    ) -> Self {
        Self {
            lot_number,
            component,
            container_id,
            manufacturer,
            updated_time: created_time.clone(),
            created_time,
            weight,
            temperature,
            expected_product,
            state: ProcessLineState::Init,
        }
    }

    pub fn make_key(manufacturer: &str, expected_product: &str, lot_number: u64) -> CompositeKey {
        make_key(&[manufacturer.into(), expected_product.into(), lot_number.into()])
    }

    pub fn is_init(&self) -> bool {
        self.state == ProcessLineState::Init
    }

    pub fn is_end(&self) -> bool {
        self.state == ProcessLineState::End
    }

    pub fn set_step(&mut self, step: ProcessStep) {
        self.component = step.component;
        self.container_id = step.container_id;
        self.updated_time = step.updated_time;
        self.weight = step.weight;
        self.temperature = step.temperature;
    }
}

impl Asset for ProcessLine {
    const NAMESPACE: &'static str = "org.processnet.processline";

    fn composite_key(&self) -> CompositeKey {
        Self::make_key(&self.manufacturer, &self.expected_product, self.lot_number)
    }
}
