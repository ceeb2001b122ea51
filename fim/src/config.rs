//! Miner parameters.
//!
//! Support thresholds follow the signed convention: a positive value is a
//! percentage of the total transaction weight, a negative value is an
//! absolute count.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::Supp;
use crate::error::{MineError, Result};
use crate::eval::{EvalAgg, EvalMeasure, SignificanceTest};
use crate::tnorm::TNorm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Every frequent item set.
    All,
    /// Frequent item sets without a superset of equal support.
    Closed,
    /// Frequent item sets without a frequent superset.
    Maximal,
    /// Frequent item sets without a subset of equal support.
    Generators,
}

impl Default for Target {
    fn default() -> Self {
        Target::All
    }
}

impl FromStr for Target {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "s" | "all" | "sets" | "frequent" => Ok(Target::All),
            "c" | "closed" => Ok(Target::Closed),
            "m" | "maximal" => Ok(Target::Maximal),
            "g" | "gens" | "generators" => Ok(Target::Generators),
            _ => Err(MineError::Config(format!("unknown target type '{}'", s))),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Target::All => "frequent",
            Target::Closed => "closed",
            Target::Maximal => "maximal",
            Target::Generators => "generator",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Auto,
    Eclat,
    Accretion,
    Apriori,
    /// Apriori rating every set by the accretion significance test.
    Apriacc,
    Relim,
    Sam,
    Carpenter,
    /// Cumulative transaction intersection.
    Ista,
    FpGrowth,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Auto
    }
}

impl FromStr for Algorithm {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Algorithm::Auto),
            "eclat" => Ok(Algorithm::Eclat),
            "accretion" => Ok(Algorithm::Accretion),
            "apriori" => Ok(Algorithm::Apriori),
            "apriacc" => Ok(Algorithm::Apriacc),
            "relim" => Ok(Algorithm::Relim),
            "sam" => Ok(Algorithm::Sam),
            "carpenter" => Ok(Algorithm::Carpenter),
            "ista" => Ok(Algorithm::Ista),
            "fpgrowth" | "fp-growth" | "fpgrowth_" => Ok(Algorithm::FpGrowth),
            _ => Err(MineError::Config(format!("unknown algorithm '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarpenterVariant {
    #[default]
    Auto,
    Table,
    Tidlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelimVariant {
    #[default]
    Auto,
    Lists,
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamVariant {
    #[default]
    Auto,
    Basic,
    Bsearch,
    DoubleSource,
    Tree,
}

impl FromStr for CarpenterVariant {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "table" => Ok(Self::Table),
            "tids" | "tidlist" => Ok(Self::Tidlist),
            _ => Err(MineError::Config(format!("unknown carpenter variant '{}'", s))),
        }
    }
}

impl FromStr for RelimVariant {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "lists" | "basic" => Ok(Self::Lists),
            "tree" => Ok(Self::Tree),
            _ => Err(MineError::Config(format!("unknown relim variant '{}'", s))),
        }
    }
}

impl FromStr for SamVariant {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "basic" => Ok(Self::Basic),
            "bsearch" => Ok(Self::Bsearch),
            "double" | "dsb" => Ok(Self::DoubleSource),
            "tree" => Ok(Self::Tree),
            _ => Err(MineError::Config(format!("unknown sam variant '{}'", s))),
        }
    }
}

/// Independent operation toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mode {
    /// Fold perfect extensions into the prefix instead of branching on them.
    pub perfect: bool,
    /// Mine the most frequent items with the 16-items machine (RElim, SaM).
    pub fim16: bool,
    /// Combine identical transactions before mining.
    pub collate: bool,
    /// Apriori counts against a transaction prefix tree instead of the bag.
    pub tatree: bool,
    /// Invalidate evaluations below expectation (Accretion p-values).
    pub invbxs: bool,
}

impl Default for Mode {
    fn default() -> Self {
        Self { perfect: true, fim16: true, collate: true, tatree: true, invbxs: false }
    }
}

/// Item insertion with penalties (RElim and SaM).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertionConfig {
    pub tnorm: TNorm,
    /// Minimum penalized transaction weight. Zero means unlimited insertion.
    pub twgt: f64,
    /// Minimum weighted support (signed percent convention).
    pub sins: f64,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self { tnorm: TNorm::Product, twgt: 0.0, sins: 10.0 }
    }
}

impl InsertionConfig {
    pub fn limited(&self) -> bool {
        self.twgt > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccretionConfig {
    pub stat: SignificanceTest,
    /// Significance level in percent.
    pub siglvl: f64,
    /// Maximum number of extension items tried below the root.
    pub maxext: usize,
}

impl Default for AccretionConfig {
    fn default() -> Self {
        Self { stat: SignificanceTest::ChiSquare, siglvl: 1.0, maxext: 2 }
    }
}

/// Evaluation pruning of the Apriori candidate tree; the value is the
/// minimum item set size the pruning applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AprioriPrune {
    #[default]
    None,
    /// Sets failing the evaluation are not reported but still extended.
    Backward(usize),
    /// A candidate is created only if at least one of its subsets one item
    /// smaller passes the evaluation; failing sets are not reported.
    WeakForward(usize),
    /// Sets failing the evaluation are dropped from the tree, so their
    /// supersets fail the subset check as well.
    StrongForward(usize),
}

impl AprioriPrune {
    /// Decodes the signed size of the command line and Python interface:
    /// zero selects backward pruning, a negative size weak and a positive
    /// size strong forward pruning.
    pub fn from_signed(prune: Option<i64>) -> Self {
        match prune {
            None => AprioriPrune::None,
            Some(0) => AprioriPrune::Backward(0),
            Some(p) if p < 0 => AprioriPrune::WeakForward(p.unsigned_abs() as usize),
            Some(p) => AprioriPrune::StrongForward(p as usize),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AprioriConfig {
    pub prune: AprioriPrune,
    /// How the rule values of one set are combined.
    pub agg: EvalAgg,
    /// Item usage filtering: 0 never, negative rebuilds once fewer than
    /// `-filter * items` are used, positive weighs rebuild against count time.
    pub filter: f64,
}

impl Default for AprioriConfig {
    fn default() -> Self {
        Self { prune: AprioriPrune::None, agg: EvalAgg::First, filter: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IstaConfig {
    /// Drop intersections that can no longer reach the minimum support.
    pub prune: bool,
}

impl Default for IstaConfig {
    fn default() -> Self {
        Self { prune: true }
    }
}

/// Tuned crossover constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// Carpenter uses the table while `items * transactions` stays at or below this.
    pub carpenter_table: usize,
    /// SaM double-source buffering merges once both sources exceed this.
    pub sam_merge: usize,
    /// SaM uses binary search insertion when the split part is this many times smaller.
    pub sam_bsearch_ratio: usize,
    /// RElim sorts list elements for items up to this id.
    pub relim_sort: usize,
    /// Number of items handed to the 16-items machine.
    pub pack: usize,
    /// Eclat intersects pairwise up to this many remaining lists, then uses marks.
    pub eclat_isect: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            carpenter_table: 1024 * 1024,
            sam_merge: 8192,
            sam_bsearch_ratio: 16,
            relim_sort: 32,
            pack: 16,
            eclat_isect: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    pub target: Target,
    pub supp: f64,
    pub smax: f64,
    pub zmin: usize,
    pub zmax: Option<usize>,
    pub eval: EvalMeasure,
    /// Evaluation threshold in percent.
    pub thresh: f64,
    pub algorithm: Algorithm,
    pub carpenter: CarpenterVariant,
    pub relim: RelimVariant,
    pub sam: SamVariant,
    pub mode: Mode,
    pub insertion: Option<InsertionConfig>,
    pub accretion: AccretionConfig,
    pub apriori: AprioriConfig,
    pub ista: IstaConfig,
    pub heuristics: Heuristics,
    /// Bound on live projection memory in bytes.
    pub memory_limit: Option<usize>,
    /// Minimum absolute support per item set size (index = size).
    pub border: Vec<Supp>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            target: Target::All,
            supp: 10.0,
            smax: 100.0,
            zmin: 1,
            zmax: None,
            eval: EvalMeasure::None,
            thresh: 10.0,
            algorithm: Algorithm::Auto,
            carpenter: CarpenterVariant::Auto,
            relim: RelimVariant::Auto,
            sam: SamVariant::Auto,
            mode: Mode::default(),
            insertion: None,
            accretion: AccretionConfig::default(),
            apriori: AprioriConfig::default(),
            ista: IstaConfig::default(),
            heuristics: Heuristics::default(),
            memory_limit: None,
            border: Vec::new(),
        }
    }
}

impl MinerConfig {
    pub fn new(target: Target, supp: f64) -> Self {
        Self { target, supp, ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: MinerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_size(mut self, zmin: usize, zmax: Option<usize>) -> Self {
        self.zmin = zmin;
        self.zmax = zmax;
        self
    }

    pub fn with_insertion(mut self, insertion: InsertionConfig) -> Self {
        self.insertion = Some(insertion);
        self
    }

    pub fn zmax_or(&self, limit: usize) -> usize {
        self.zmax.map_or(limit, |z| z.min(limit))
    }

    pub fn validate(&self) -> Result<()> {
        if self.supp > 100.0 {
            return Err(MineError::Config(format!("invalid minimum support {}%", self.supp)));
        }
        if self.smax >= 0.0 && self.supp >= 0.0 && self.smax < self.supp {
            return Err(MineError::Config(format!(
                "maximum support {} below minimum support {}",
                self.smax, self.supp
            )));
        }
        if let Some(zmax) = self.zmax {
            if zmax < self.zmin {
                return Err(MineError::Config(format!(
                    "maximum size {} below minimum size {}",
                    zmax, self.zmin
                )));
            }
        }
        if let Some(ins) = &self.insertion {
            if !(0.0..=1.0).contains(&ins.twgt) {
                return Err(MineError::Config(format!(
                    "minimum transaction weight {} outside [0,1]",
                    ins.twgt
                )));
            }
            if ins.sins > 100.0 {
                return Err(MineError::Config(format!(
                    "invalid insertion support {}%",
                    ins.sins
                )));
            }
            if self.target == Target::Generators
                && matches!(self.algorithm, Algorithm::Relim | Algorithm::Sam)
            {
                return Err(MineError::Config(
                    "generators cannot be mined with item insertion".to_string(),
                ));
            }
        }
        if matches!(self.algorithm, Algorithm::Carpenter | Algorithm::Ista)
            && !matches!(self.target, Target::Closed | Target::Maximal)
        {
            return Err(MineError::Config(format!(
                "{:?} mines closed or maximal item sets only, not {}",
                self.algorithm, self.target
            )));
        }
        if self.eval.is_rule_measure()
            && !matches!(self.algorithm, Algorithm::Auto | Algorithm::Apriori | Algorithm::Apriacc)
        {
            return Err(MineError::Config(format!(
                "evaluation measure {:?} needs apriori, not {:?}",
                self.eval, self.algorithm
            )));
        }
        if self.accretion.siglvl <= 0.0 || self.accretion.siglvl > 100.0 {
            return Err(MineError::Config(format!(
                "significance level {}% outside (0,100]",
                self.accretion.siglvl
            )));
        }
        if self.heuristics.pack > 16 {
            return Err(MineError::Config(format!(
                "at most 16 items can be packed, not {}",
                self.heuristics.pack
            )));
        }
        Ok(())
    }

    /// Absolute minimum support for a database of total weight `total`.
    pub fn min_support(&self, total: Supp) -> Supp {
        let smin = absolute(self.supp, total);
        (smin.ceil() as Supp).max(1)
    }

    /// Absolute maximum support; unbounded for 100 percent.
    pub fn max_support(&self, total: Supp) -> Supp {
        if self.smax >= 100.0 {
            return Supp::MAX;
        }
        let smax = if self.smax < 0.0 {
            -self.smax
        } else {
            (self.smax / 100.0) * total as f64 * (1.0 + f64::EPSILON)
        };
        smax.floor() as Supp
    }

    /// Absolute minimum weighted support for item insertion.
    pub fn min_insertion_support(&self, total: Supp) -> f64 {
        let sins = self.insertion.map_or(0.0, |ins| absolute(ins.sins, total));
        if sins > 0.0 {
            sins
        } else {
            f64::MIN_POSITIVE
        }
    }
}

fn absolute(supp: f64, total: Supp) -> f64 {
    if supp < 0.0 {
        -supp
    } else {
        (supp / 100.0) * total as f64 * (1.0 - f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_conversion() {
        let mut config = MinerConfig::new(Target::All, 40.0);
        assert_eq!(config.min_support(5), 2);
        assert_eq!(config.min_support(10), 4);
        config.supp = -3.0;
        assert_eq!(config.min_support(100), 3);
        config.supp = 0.0;
        assert_eq!(config.min_support(100), 1);
        assert_eq!(config.max_support(100), Supp::MAX);
        config.smax = 50.0;
        assert_eq!(config.max_support(10), 5);
    }

    #[test]
    fn test_json_round_trip_keeps_defaults() {
        let config = MinerConfig::from_json(r#"{"target":"closed","supp":-2,"zmax":3}"#).unwrap();
        assert_eq!(config.target, Target::Closed);
        assert_eq!(config.supp, -2.0);
        assert_eq!(config.zmax, Some(3));
        assert!(config.mode.perfect);
        assert_eq!(config.heuristics.sam_merge, 8192);

        let again = MinerConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_validation() {
        let config = MinerConfig::new(Target::All, 20.0).with_size(3, Some(2));
        assert!(config.validate().is_err());

        let config = MinerConfig::new(Target::All, 20.0).with_algorithm(Algorithm::Carpenter);
        assert!(config.validate().is_err());

        let config = MinerConfig::new(Target::Maximal, 20.0).with_algorithm(Algorithm::Carpenter);
        assert!(config.validate().is_ok());

        let config = MinerConfig::new(Target::Generators, 20.0).with_algorithm(Algorithm::Ista);
        assert!(config.validate().is_err());

        let mut config = MinerConfig::new(Target::All, 20.0).with_algorithm(Algorithm::Eclat);
        config.eval = EvalMeasure::Lift;
        assert!(config.validate().is_err());
        config.algorithm = Algorithm::Apriori;
        assert!(config.validate().is_ok());

        let config = MinerConfig::new(Target::All, 20.0)
            .with_insertion(InsertionConfig { twgt: 1.5, ..Default::default() });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_names() {
        assert_eq!("c".parse::<Target>().unwrap(), Target::Closed);
        assert_eq!("maximal".parse::<Target>().unwrap(), Target::Maximal);
        assert!("x".parse::<Target>().is_err());
        assert_eq!("fpgrowth".parse::<Algorithm>().unwrap(), Algorithm::FpGrowth);
        assert_eq!("ista".parse::<Algorithm>().unwrap(), Algorithm::Ista);
        assert_eq!("apriacc".parse::<Algorithm>().unwrap(), Algorithm::Apriacc);
    }

    #[test]
    fn test_signed_prune_size() {
        assert_eq!(AprioriPrune::from_signed(None), AprioriPrune::None);
        assert_eq!(AprioriPrune::from_signed(Some(0)), AprioriPrune::Backward(0));
        assert_eq!(AprioriPrune::from_signed(Some(-2)), AprioriPrune::WeakForward(2));
        assert_eq!(AprioriPrune::from_signed(Some(3)), AprioriPrune::StrongForward(3));
    }
}
