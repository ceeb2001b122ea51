use std::collections::HashMap;

use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::{Algorithm, AprioriPrune, InsertionConfig, MinerConfig, Target};
use crate::data::{from_dense, StoreBuilder, Supp};
use crate::error::MineError;
use crate::miner::Miner;
use crate::report::PatternSet;

type Found = Vec<(Vec<usize>, Supp)>;

fn to_py(err: MineError) -> PyErr {
    match err {
        MineError::Config(_) | MineError::Data(_) | MineError::Json(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

fn base(target: &str, supp: f64, zmin: usize, zmax: Option<usize>, algorithm: Algorithm) -> PyResult<MinerConfig> {
    let target: Target = target.parse().map_err(to_py)?;
    Ok(MinerConfig::new(target, supp).with_size(zmin, zmax).with_algorithm(algorithm))
}

fn builder(tracts: &[Vec<usize>], penalties: Option<&HashMap<usize, f64>>) -> PyResult<StoreBuilder> {
    let mut builder = StoreBuilder::new();
    for t in tracts {
        builder.add(t);
    }
    if let Some(penalties) = penalties {
        for (&item, &p) in penalties {
            builder.penalty(item, p).map_err(to_py)?;
        }
    }
    Ok(builder)
}

/// Runs `config` without holding the GIL.
fn run(py: Python<'_>, config: MinerConfig, builder: &StoreBuilder) -> PyResult<PatternSet> {
    let miner = Miner::new(config).map_err(to_py)?;
    py.allow_threads(|| miner.mine_builder(builder)).map_err(to_py)
}

fn insertion(tnorm: Option<&str>, twgt: f64, sins: f64) -> PyResult<Option<InsertionConfig>> {
    match tnorm {
        None => Ok(None),
        Some(name) => Ok(Some(InsertionConfig { tnorm: name.parse().map_err(to_py)?, twgt, sins })),
    }
}

#[pymodule]
fn fim<'py>(m: &Bound<'py, PyModule>) -> PyResult<()> {
    #[pyfn(m)]
    #[pyo3(name = "fim", signature = (tracts, target="s", supp=10.0, zmin=1, zmax=None, algo="auto"))]
    fn fim_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        algo: &str,
    ) -> PyResult<Found> {
        let algorithm: Algorithm = algo.parse().map_err(to_py)?;
        let config = base(target, supp, zmin, zmax, algorithm)?;
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    #[pyfn(m)]
    #[pyo3(name = "eclat", signature = (tracts, target="s", supp=10.0, zmin=1, zmax=None, eval="x", thresh=10.0))]
    fn eclat_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        eval: &str,
        thresh: f64,
    ) -> PyResult<Found> {
        let mut config = base(target, supp, zmin, zmax, Algorithm::Eclat)?;
        config.eval = eval.parse().map_err(to_py)?;
        config.thresh = thresh;
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    /// `prune` is the minimum size for evaluation pruning: `None` for no
    /// pruning, zero for backward, negative for weak and positive for strong
    /// forward pruning. `agg` combines the rule values of one set.
    #[pyfn(m)]
    #[pyo3(name = "apriori", signature = (tracts, target="s", supp=10.0, zmin=1, zmax=None, eval="x", agg="x", thresh=10.0, prune=None))]
    fn apriori_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        eval: &str,
        agg: &str,
        thresh: f64,
        prune: Option<i64>,
    ) -> PyResult<Found> {
        let mut config = base(target, supp, zmin, zmax, Algorithm::Apriori)?;
        config.eval = eval.parse().map_err(to_py)?;
        config.apriori.agg = agg.parse().map_err(to_py)?;
        config.thresh = thresh;
        config.apriori.prune = AprioriPrune::from_signed(prune);
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    /// Apriori keeping the sets whose every rule passes the significance
    /// test `stat` at `siglvl` percent.
    #[pyfn(m)]
    #[pyo3(name = "apriacc", signature = (tracts, target="m", supp=-2.0, zmin=2, zmax=None, stat="c", siglvl=1.0, prune=0))]
    fn apriacc_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        stat: &str,
        siglvl: f64,
        prune: Option<i64>,
    ) -> PyResult<Found> {
        let mut config = base(target, supp, zmin, zmax, Algorithm::Apriacc)?;
        config.accretion.stat = stat.parse().map_err(to_py)?;
        config.accretion.siglvl = siglvl;
        config.apriori.prune = AprioriPrune::from_signed(prune);
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    /// Item insertion is enabled by naming a t-norm; `iwgts` maps items to
    /// insertion penalties.
    #[pyfn(m)]
    #[pyo3(name = "relim", signature = (tracts, target="s", supp=10.0, zmin=1, zmax=None, tnorm=None, twgt=0.0, sins=10.0, iwgts=None))]
    fn relim_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        tnorm: Option<&str>,
        twgt: f64,
        sins: f64,
        iwgts: Option<HashMap<usize, f64>>,
    ) -> PyResult<Found> {
        let mut config = base(target, supp, zmin, zmax, Algorithm::Relim)?;
        config.insertion = insertion(tnorm, twgt, sins)?;
        Ok(run(py, config, &builder(&tracts, iwgts.as_ref())?)?.to_pairs())
    }

    #[pyfn(m)]
    #[pyo3(name = "sam", signature = (tracts, target="s", supp=10.0, zmin=1, zmax=None, tnorm=None, twgt=0.0, sins=10.0, iwgts=None))]
    fn sam_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        tnorm: Option<&str>,
        twgt: f64,
        sins: f64,
        iwgts: Option<HashMap<usize, f64>>,
    ) -> PyResult<Found> {
        let mut config = base(target, supp, zmin, zmax, Algorithm::Sam)?;
        config.insertion = insertion(tnorm, twgt, sins)?;
        Ok(run(py, config, &builder(&tracts, iwgts.as_ref())?)?.to_pairs())
    }

    #[pyfn(m)]
    #[pyo3(name = "carpenter", signature = (tracts, target="c", supp=10.0, zmin=1, zmax=None))]
    fn carpenter_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
    ) -> PyResult<Found> {
        let config = base(target, supp, zmin, zmax, Algorithm::Carpenter)?;
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    #[pyfn(m)]
    #[pyo3(name = "ista", signature = (tracts, target="c", supp=10.0, zmin=1, zmax=None, prune=true))]
    fn ista_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        prune: bool,
    ) -> PyResult<Found> {
        let mut config = base(target, supp, zmin, zmax, Algorithm::Ista)?;
        config.ista.prune = prune;
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    #[pyfn(m)]
    #[pyo3(name = "fpgrowth", signature = (tracts, target="s", supp=10.0, zmin=1, zmax=None))]
    fn fpgrowth_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
    ) -> PyResult<Found> {
        let config = base(target, supp, zmin, zmax, Algorithm::FpGrowth)?;
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    #[pyfn(m)]
    #[pyo3(name = "accretion", signature = (tracts, target="s", supp=10.0, zmin=1, zmax=None, stat="c", siglvl=1.0, maxext=2))]
    fn accretion_py(
        py: Python<'_>,
        tracts: Vec<Vec<usize>>,
        target: &str,
        supp: f64,
        zmin: usize,
        zmax: Option<usize>,
        stat: &str,
        siglvl: f64,
        maxext: usize,
    ) -> PyResult<Found> {
        let mut config = base(target, supp, zmin, zmax, Algorithm::Accretion)?;
        config.accretion.stat = stat.parse().map_err(to_py)?;
        config.accretion.siglvl = siglvl;
        config.accretion.maxext = maxext;
        Ok(run(py, config, &builder(&tracts, None)?)?.to_pairs())
    }

    /// Mines a 0/1 matrix and returns one `(n, size)` array of column
    /// indices per item set size.
    #[pyfn(m)]
    #[pyo3(name = "fim_dense", signature = (transactions, supp=10.0, target="s", algo="auto"))]
    fn fim_dense_py<'py>(
        py: Python<'py>,
        transactions: PyReadonlyArray2<'py, i32>,
        supp: f64,
        target: &str,
        algo: &str,
    ) -> PyResult<Vec<Bound<'py, PyArray2<usize>>>> {
        let algorithm: Algorithm = algo.parse().map_err(to_py)?;
        let config = base(target, supp, 1, None, algorithm)?;
        let builder = from_dense(transactions.as_array()).map_err(to_py)?;
        let found = run(py, config, &builder)?;

        let mut result = Vec::new();
        for level in found.levels() {
            if level.is_empty() {
                continue;
            }
            let size = level.itemset_size;
            let mut data = Vec::with_capacity(level.len() * size);
            for itemset in level.iter_itemsets() {
                data.extend_from_slice(itemset);
            }
            let array = Array2::from_shape_vec((level.len(), size), data)
                .map_err(|e| PyValueError::new_err(format!("failed to create array: {}", e)))?;
            result.push(array.into_pyarray(py));
        }
        Ok(result)
    }

    Ok(())
}
