//! Core vocabulary: typologies, measurement units, levers, size buckets.
//!
//! All request-side name parsing is strict — an unknown name is a
//! validation error, never a silent empty cohort.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-format classification. The dataset covers exactly three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Typology {
    SuperEHiper,
    Conveniencia,
    Droguerias,
}

impl Typology {
    pub const ALL: [Typology; 3] = [
        Typology::SuperEHiper,
        Typology::Conveniencia,
        Typology::Droguerias,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Typology::SuperEHiper => "Super e hiper",
            Typology::Conveniencia => "Conveniencia",
            Typology::Droguerias => "Droguerías",
        }
    }

    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| EngineError::UnknownTypology {
                name: name.to_string(),
            })
    }

    /// Pharmacies carry no cooling equipment, so the cooling-related
    /// feature dimensions are excluded from nearest-neighbor distance.
    pub fn uses_cooling(&self) -> bool {
        !matches!(self, Typology::Droguerias)
    }
}

impl fmt::Display for Typology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unit the predicted/control values are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementUnit {
    Cajas8oz,
    Ventas,
}

impl MeasurementUnit {
    pub const ALL: [MeasurementUnit; 2] = [MeasurementUnit::Cajas8oz, MeasurementUnit::Ventas];

    pub fn name(&self) -> &'static str {
        match self {
            MeasurementUnit::Cajas8oz => "Cajas 8oz",
            MeasurementUnit::Ventas => "Ventas",
        }
    }

    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|u| u.name() == name)
            .ok_or_else(|| EngineError::UnknownUnit {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A discrete retail execution tactic that can be toggled in a scenario.
/// There is deliberately no `Control` variant — the baseline lives in the
/// scenario's control value, not in the lever vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Lever {
    MetroCuadrado = 0,
    PuntaDeGondola = 1,
    CajeroVendedor = 2,
    NeveraCheckout = 3,
    NeveraAdicional = 4,
    MuebleExhibidor = 5,
    ExhibicionAdicional = 6,
    Senalizacion = 7,
    MaterialPop = 8,
}

impl Lever {
    pub const ALL: [Lever; 9] = [
        Lever::MetroCuadrado,
        Lever::PuntaDeGondola,
        Lever::CajeroVendedor,
        Lever::NeveraCheckout,
        Lever::NeveraAdicional,
        Lever::MuebleExhibidor,
        Lever::ExhibicionAdicional,
        Lever::Senalizacion,
        Lever::MaterialPop,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Lever::MetroCuadrado => "Metro cuadrado",
            Lever::PuntaDeGondola => "Punta de góndola",
            Lever::CajeroVendedor => "Cajero vendedor",
            Lever::NeveraCheckout => "Nevera checkout",
            Lever::NeveraAdicional => "Nevera adicional",
            Lever::MuebleExhibidor => "Mueble exhibidor",
            Lever::ExhibicionAdicional => "Exhibición adicional",
            Lever::Senalizacion => "Señalización",
            Lever::MaterialPop => "Material POP",
        }
    }

    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.name() == name)
            .ok_or_else(|| EngineError::UnknownLever {
                name: name.to_string(),
            })
    }

    fn bit(&self) -> u16 {
        1u16 << (*self as u8)
    }
}

impl fmt::Display for Lever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-size boolean vector over the nine levers, stored as a bitmask so
/// subset and equality tests are single integer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LeverSet(u16);

impl LeverSet {
    pub const EMPTY: LeverSet = LeverSet(0);

    pub fn insert(&mut self, lever: Lever) {
        self.0 |= lever.bit();
    }

    pub fn with(mut self, lever: Lever) -> Self {
        self.insert(lever);
        self
    }

    pub fn contains(&self, lever: Lever) -> bool {
        self.0 & lever.bit() != 0
    }

    /// True when every lever in `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &LeverSet) -> bool {
        self.0 & other.0 == self.0
    }

    pub fn union(&self, other: &LeverSet) -> LeverSet {
        LeverSet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Lever> + '_ {
        Lever::ALL.iter().copied().filter(|l| self.contains(*l))
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Parse a user-supplied lever name list. Empty selections and unknown
    /// names are validation errors.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> EngineResult<Self> {
        if names.is_empty() {
            return Err(EngineError::EmptyLeverSelection);
        }
        let mut set = LeverSet::EMPTY;
        for name in names {
            set.insert(Lever::from_name(name.as_ref())?);
        }
        Ok(set)
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|l| l.name().to_string()).collect()
    }
}

impl FromIterator<Lever> for LeverSet {
    fn from_iter<I: IntoIterator<Item = Lever>>(iter: I) -> Self {
        let mut set = LeverSet::EMPTY;
        for lever in iter {
            set.insert(lever);
        }
        set
    }
}

/// Store-size bucket used to constrain the personalized-simulation cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreSize {
    Pequeno,
    Mediano,
    Grande,
}

impl StoreSize {
    pub const ALL: [StoreSize; 3] = [StoreSize::Pequeno, StoreSize::Mediano, StoreSize::Grande];

    pub fn name(&self) -> &'static str {
        match self {
            StoreSize::Pequeno => "Pequeño",
            StoreSize::Mediano => "Mediano",
            StoreSize::Grande => "Grande",
        }
    }

    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name() == name)
            .ok_or_else(|| EngineError::UnknownStoreSize {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for StoreSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four own/competitor feature-count pairs a caller describes their
/// store with. Field names follow the wire contract of the original API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCounts {
    pub frentes_propios: i64,
    pub frentes_competencia: i64,
    pub sku_propios: i64,
    pub sku_competencia: i64,
    pub equipos_frio_propios: i64,
    pub equipos_frio_competencia: i64,
    pub puertas_propias: i64,
    pub puertas_competencia: i64,
}

impl FeatureCounts {
    /// Reject non-positive counts before any query runs.
    pub fn validate(&self) -> EngineResult<()> {
        let fields: [(&'static str, i64); 8] = [
            ("frentesPropios", self.frentes_propios),
            ("frentesCompetencia", self.frentes_competencia),
            ("skuPropios", self.sku_propios),
            ("skuCompetencia", self.sku_competencia),
            ("equiposFrioPropios", self.equipos_frio_propios),
            ("equiposFrioCompetencia", self.equipos_frio_competencia),
            ("puertasPropias", self.puertas_propias),
            ("puertasCompetencia", self.puertas_competencia),
        ];
        for (field, value) in fields {
            if value <= 0 {
                return Err(EngineError::InvalidFeatureCount { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lever_set_subset_and_equality() {
        let l = LeverSet::EMPTY
            .with(Lever::PuntaDeGondola)
            .with(Lever::MetroCuadrado);
        let wider = l.with(Lever::CajeroVendedor);

        assert!(l.is_subset_of(&wider));
        assert!(!wider.is_subset_of(&l));
        assert!(l.is_subset_of(&l));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn lever_names_round_trip() {
        for lever in Lever::ALL {
            assert_eq!(Lever::from_name(lever.name()).unwrap(), lever);
        }
        assert!(Lever::from_name("Palanca inexistente").is_err());
    }

    #[test]
    fn empty_selection_is_rejected() {
        let names: [&str; 0] = [];
        assert!(matches!(
            LeverSet::from_names(&names),
            Err(EngineError::EmptyLeverSelection)
        ));
    }

    #[test]
    fn droguerias_has_no_cooling() {
        assert!(Typology::SuperEHiper.uses_cooling());
        assert!(Typology::Conveniencia.uses_cooling());
        assert!(!Typology::Droguerias.uses_cooling());
    }
}
