//! Registry mapping data-kind names to type-engine factories.

use crate::{
    DATA_UNITS,
    alignment::SequenceAlignmentEngine,
    apl_mhc_table::AplMhcTableEngine,
    apl_table::AplTableEngine,
    engine::{RawValue, TypeEngine},
    error::{EngineError, Result},
    io_type::IoType,
    mhc_table::MhcTableEngine,
    peptides::{PeptidesEngine, RegularMersEngine},
    protein_sequence::ProteinSequenceEngine,
    structure::ProteinPdbEngine,
    values::ProteinValuesEngine,
};
use std::collections::BTreeMap;

pub type EngineFactory = fn(&'static str, &RawValue, &IoType) -> Result<Box<dyn TypeEngine>>;

const REGISTRATIONS: &[(&[&str], EngineFactory)] = &[
    (&["pdb"], ProteinPdbEngine::boxed),
    (&["fasta"], SequenceAlignmentEngine::boxed),
    (&["protein-seq"], ProteinSequenceEngine::boxed),
    (&["protein-regulared-peptide"], RegularMersEngine::boxed),
    (&["protein-peptides"], PeptidesEngine::boxed),
    (
        &[
            "sasa",
            "corex",
            "bfactor",
            "sequence_entropy",
            "apl-aggregate",
            "apl-residue-likelihood",
            "apl-peptide-likelihood",
        ],
        ProteinValuesEngine::boxed,
    ),
    (&["mhcii", "apl-mhc-combined"], MhcTableEngine::boxed),
    (&["apl-table"], AplTableEngine::boxed),
    (&["aplmhc-table"], AplMhcTableEngine::boxed),
];

#[derive(Clone, Debug)]
pub struct DataUnits {
    factories: BTreeMap<&'static str, EngineFactory>,
}

impl Default for DataUnits {
    fn default() -> Self {
        Self::from_registrations(REGISTRATIONS)
    }
}

impl DataUnits {
    pub fn from_registrations(registrations: &[(&[&'static str], EngineFactory)]) -> Self {
        let mut factories: BTreeMap<&'static str, EngineFactory> = BTreeMap::new();
        for (kinds, factory) in registrations {
            for kind in kinds.iter() {
                if factories.contains_key(*kind) {
                    tracing::warn!(kind = *kind, "data kind registered twice, keeping the first engine");
                    continue;
                }
                factories.insert(*kind, *factory);
            }
        }
        Self { factories }
    }

    /// Registered data-kind names, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn create(
        &self,
        kind: &str,
        value: &RawValue,
        io_type: &IoType,
    ) -> Result<Box<dyn TypeEngine>> {
        let (kind, factory) = self
            .factories
            .get_key_value(kind)
            .ok_or_else(|| EngineError::UnknownKind(kind.to_string()))?;
        tracing::debug!(kind, io = %io_type.name, "creating type engine");
        factory(*kind, value, io_type)
    }
}

/// Creates an engine from the process-wide registry.
pub fn create_engine(kind: &str, value: &RawValue, io_type: &IoType) -> Result<Box<dyn TypeEngine>> {
    DATA_UNITS.create(kind, value, io_type)
}
