use crate::elements::{
    CommonImpedance, ExternalGrid, Line, Load, Shunt, Switch, SynchronousGenerator,
    ThreeWindingTransformer, TwoWindingTransformer, VoltageSource,
};
use crate::error::{Error, Result};
use derive_builder::Builder;
use log::{debug, warn};
use num_complex::Complex64;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusKind {
    /// Regular busbar.
    Busbar = 0,
    /// Junction node.
    JunctionNode = 1,
    /// Internal node of a composite element; not modeled.
    InternalNode = 2,
}

/// Bus record as delivered by the data acquisition layer. Only in-service,
/// energized buses of accepted kinds enter the topology index.
#[derive(Clone, Debug)]
pub struct Bus {
    pub name: String,

    /// Substation the bus belongs to, used to disambiguate duplicate names
    /// (e.g. switch terminals on split busbars).
    pub substation: Option<String>,

    pub kind: BusKind,

    pub in_service: bool,

    pub energized: bool,
}

impl Bus {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            substation: None,
            kind: BusKind::Busbar,
            in_service: true,
            energized: true,
        }
    }

    fn is_modeled(&self) -> bool {
        self.in_service
            && self.energized
            && matches!(self.kind, BusKind::Busbar | BusKind::JunctionNode)
    }
}

/// Steady-state load-flow solution for one bus; read-only input.
#[derive(Clone, Debug)]
pub struct BusVoltage {
    /// Voltage magnitude (p.u.).
    pub voltage: f64,

    /// Voltage angle (degrees).
    pub angle: f64,
}

impl BusVoltage {
    pub fn new(voltage: f64, angle: f64) -> Self {
        Self { voltage, angle }
    }

    /// Complex terminal voltage reconstructed from magnitude and angle.
    pub fn phasor(&self) -> Complex64 {
        Complex64::from_polar(self.voltage, self.angle.to_radians())
    }
}

/// Immutable input snapshot for one analysis run: the filtered bus set with
/// its name-to-index arena, one element list per variant, and the load-flow
/// solution. Built once via [`NetworkBuilder`]; every run re-derives all
/// intermediate structures from it.
#[derive(Default, Builder)]
#[builder(default, build_fn(name = "pre_build", validate = "Self::validate"))]
pub struct Network {
    /// System base power (MVA). Must be set explicitly.
    base_mva: f64,

    pub buses: Vec<Bus>,

    pub lines: Vec<Line>,
    pub switches: Vec<Switch>,
    pub common_impedances: Vec<CommonImpedance>,
    pub transformers_2w: Vec<TwoWindingTransformer>,
    pub transformers_3w: Vec<ThreeWindingTransformer>,
    pub generators: Vec<SynchronousGenerator>,
    pub loads: Vec<Load>,
    pub external_grids: Vec<ExternalGrid>,
    pub voltage_sources: Vec<VoltageSource>,
    pub shunts: Vec<Shunt>,

    /// Load-flow results keyed by bus name.
    pub load_flow: HashMap<String, BusVoltage>,

    #[builder(setter(skip))]
    bus_index: HashMap<String, usize>,
}

impl NetworkBuilder {
    pub fn build(&self) -> std::result::Result<Network, NetworkBuilderError> {
        let mut net = self.pre_build()?;
        net.index_buses();
        Ok(net)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self.base_mva {
            Some(b) if b > 0.0 => Ok(()),
            Some(b) => Err(format!("base_mva must be positive, got {}", b)),
            None => Err("base_mva must be set explicitly".to_string()),
        }
    }
}

impl Network {
    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Index of a bus in the working set.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bus_index.get(name).copied()
    }

    /// Bus names in index order; the labels of the full Y-bus.
    pub fn bus_names(&self) -> Vec<String> {
        self.buses.iter().map(|b| b.name.clone()).collect()
    }

    /// Terminal bus of the named generator.
    pub fn generator_bus(&self, gen_name: &str) -> Result<&str> {
        self.generators
            .iter()
            .find(|g| g.name == gen_name)
            .map(|g| g.bus_to.as_str())
            .ok_or_else(|| Error::GeneratorNotFound(gen_name.to_string()))
    }

    pub fn voltage(&self, bus_name: &str) -> Option<&BusVoltage> {
        self.load_flow.get(bus_name)
    }

    /// Drops filtered buses and assigns contiguous indices 0..N-1.
    ///
    /// Duplicate names: first occurrence wins; when the duplicate carries a
    /// substation it is re-inserted under a substation-qualified name.
    fn index_buses(&mut self) {
        let total = self.buses.len();
        self.buses.retain(|b| b.is_modeled());
        if self.buses.len() < total {
            debug!(
                "filtered {} of {} buses (out of service, de-energized or unaccepted kind)",
                total - self.buses.len(),
                total
            );
        }

        self.bus_index.clear();
        let mut kept = Vec::with_capacity(self.buses.len());
        for mut bus in self.buses.drain(..) {
            if self.bus_index.contains_key(&bus.name) {
                match &bus.substation {
                    Some(substation) => {
                        let qualified = format!("{}\\{}", substation, bus.name);
                        if self.bus_index.contains_key(&qualified) {
                            warn!(
                                "duplicate bus name '{}': first occurrence wins",
                                qualified
                            );
                            continue;
                        }
                        warn!(
                            "duplicate bus name '{}': qualified as '{}'",
                            bus.name, qualified
                        );
                        bus.name = qualified;
                    }
                    None => {
                        warn!("duplicate bus name '{}': first occurrence wins", bus.name);
                        continue;
                    }
                }
            }
            self.bus_index.insert(bus.name.clone(), kept.len());
            kept.push(bus);
        }
        self.buses = kept;
    }
}
