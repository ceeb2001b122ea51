//! Evaluation measures and significance tests used as scoring callbacks.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::data::Supp;
use crate::error::{MineError, Result};

/// Additional evaluation of every candidate set.
///
/// The log-ratio is computed by the reporter from item supports alone.
/// The other measures rate the rules `S - {i} -> i` and need the support
/// of each subset, so only Apriori evaluates them, on its candidate tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMeasure {
    #[default]
    None,
    /// Binary logarithm of the support ratio to independence.
    LdRatio,
    Conf,
    /// Absolute difference of confidence and prior.
    ConfDiff,
    Lift,
    /// Absolute difference of the lift to 1.
    LiftDiff,
    /// One minus the smaller of the lift and its reciprocal.
    LiftQuot,
    Conviction,
    /// Chi-square statistic normalized by the total weight.
    Chi2,
    Chi2PValue,
    YatesPValue,
    InfoPValue,
}

impl FromStr for EvalMeasure {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" | "none" => Ok(EvalMeasure::None),
            "b" | "ldratio" => Ok(EvalMeasure::LdRatio),
            "c" | "conf" | "confidence" => Ok(EvalMeasure::Conf),
            "d" | "confdiff" => Ok(EvalMeasure::ConfDiff),
            "l" | "lift" => Ok(EvalMeasure::Lift),
            "a" | "liftdiff" => Ok(EvalMeasure::LiftDiff),
            "q" | "liftquot" => Ok(EvalMeasure::LiftQuot),
            "v" | "cvct" | "conviction" => Ok(EvalMeasure::Conviction),
            "n" | "chi2" | "X2" => Ok(EvalMeasure::Chi2),
            "p" | "chi2pval" | "X2pval" => Ok(EvalMeasure::Chi2PValue),
            "t" | "yatespval" => Ok(EvalMeasure::YatesPValue),
            "g" | "infopval" | "gpval" => Ok(EvalMeasure::InfoPValue),
            _ => Err(MineError::Config(format!("unknown evaluation measure '{}'", s))),
        }
    }
}

impl From<SignificanceTest> for EvalMeasure {
    fn from(stat: SignificanceTest) -> Self {
        match stat {
            SignificanceTest::None => EvalMeasure::None,
            SignificanceTest::ChiSquare => EvalMeasure::Chi2PValue,
            SignificanceTest::ChiSquareYates => EvalMeasure::YatesPValue,
            SignificanceTest::InfoGain => EvalMeasure::InfoPValue,
        }
    }
}

impl EvalMeasure {
    /// Whether the measure rates rules and needs subset supports.
    pub fn is_rule_measure(self) -> bool {
        !matches!(self, EvalMeasure::None | EvalMeasure::LdRatio)
    }

    /// Whether smaller values are better.
    pub fn is_pvalue(self) -> bool {
        matches!(self, EvalMeasure::Chi2PValue | EvalMeasure::YatesPValue | EvalMeasure::InfoPValue)
    }

    /// Value given to sets invalidated for lying below the expected support.
    pub fn worst(self) -> f64 {
        if self.is_pvalue() {
            1.0
        } else {
            0.0
        }
    }

    /// Whether `value` reaches the threshold (a fraction, not a percentage).
    pub fn passes(self, value: f64, thresh: f64) -> bool {
        if self.is_pvalue() {
            value <= thresh
        } else {
            value >= thresh
        }
    }

    /// Rates the rule `body -> head` of a set with support `supp`.
    pub fn rule_value(self, supp: Supp, body: Supp, head: Supp, total: Supp) -> Result<f64> {
        let (s, b, h, n) = (supp as f64, body as f64, head as f64, total as f64);
        let conf = if b > 0.0 { s / b } else { 0.0 };
        let lift = if b > 0.0 && h > 0.0 { s * n / (b * h) } else { 0.0 };
        let value = match self {
            EvalMeasure::None | EvalMeasure::LdRatio => 0.0,
            EvalMeasure::Conf => conf,
            EvalMeasure::ConfDiff => (conf - h / n).abs(),
            EvalMeasure::Lift => lift,
            EvalMeasure::LiftDiff => (lift - 1.0).abs(),
            EvalMeasure::LiftQuot => {
                if lift <= 0.0 {
                    1.0
                } else {
                    1.0 - lift.min(1.0 / lift)
                }
            }
            EvalMeasure::Conviction => {
                if conf >= 1.0 {
                    f64::INFINITY
                } else {
                    (1.0 - h / n) / (1.0 - conf)
                }
            }
            EvalMeasure::Chi2 => {
                if n > 0.0 {
                    chi2(supp, body, head, total, false) / n
                } else {
                    0.0
                }
            }
            EvalMeasure::Chi2PValue => return SignificanceTest::ChiSquare.pvalue(supp, body, head, total),
            EvalMeasure::YatesPValue => {
                return SignificanceTest::ChiSquareYates.pvalue(supp, body, head, total)
            }
            EvalMeasure::InfoPValue => return SignificanceTest::InfoGain.pvalue(supp, body, head, total),
        };
        Ok(value)
    }
}

/// How the values of the rules of one set are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalAgg {
    /// Only the rule whose head is the last item.
    #[default]
    First,
    Min,
    Max,
    Avg,
}

impl FromStr for EvalAgg {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" | "none" | "first" => Ok(EvalAgg::First),
            "m" | "min" | "minimum" => Ok(EvalAgg::Min),
            "n" | "max" | "maximum" => Ok(EvalAgg::Max),
            "a" | "avg" | "average" => Ok(EvalAgg::Avg),
            _ => Err(MineError::Config(format!("unknown aggregation mode '{}'", s))),
        }
    }
}

/// `log2(s(I) * W^(|I|-1) / prod s(i))`.
///
/// `item_supports` holds the unconditional supports of the members of `I`.
pub fn ld_ratio(supp: Supp, item_supports: &[Supp], total: Supp) -> f64 {
    if item_supports.len() < 2 {
        return 0.0;
    }
    if supp == 0 || total == 0 {
        return f64::NEG_INFINITY;
    }
    let k = item_supports.len() as f64;
    let denom: f64 = item_supports.iter().map(|&s| (s as f64).log2()).sum();
    (supp as f64).log2() + (k - 1.0) * (total as f64).log2() - denom
}

/// A scoring callback mapping (joint support, body support, head support,
/// total weight) to a p-value; smaller is more significant.
pub trait Significance {
    fn pvalue(&self, supp: Supp, body: Supp, head: Supp, total: Supp) -> Result<f64>;
}

impl<F> Significance for F
where
    F: Fn(Supp, Supp, Supp, Supp) -> f64,
{
    fn pvalue(&self, supp: Supp, body: Supp, head: Supp, total: Supp) -> Result<f64> {
        Ok(self(supp, body, head, total))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignificanceTest {
    /// Every extension counts as significant.
    None,
    #[default]
    ChiSquare,
    ChiSquareYates,
    /// G statistic (mutual information).
    InfoGain,
}

impl FromStr for SignificanceTest {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" | "none" => Ok(SignificanceTest::None),
            "c" | "p" | "n" | "chi2" => Ok(SignificanceTest::ChiSquare),
            "y" | "t" | "yates" => Ok(SignificanceTest::ChiSquareYates),
            "i" | "g" | "info" => Ok(SignificanceTest::InfoGain),
            _ => Err(MineError::Config(format!("unknown test statistic '{}'", s))),
        }
    }
}

impl Significance for SignificanceTest {
    fn pvalue(&self, supp: Supp, body: Supp, head: Supp, total: Supp) -> Result<f64> {
        match self {
            SignificanceTest::None => Ok(0.0),
            SignificanceTest::ChiSquare => chi2_pvalue(chi2(supp, body, head, total, false)),
            SignificanceTest::ChiSquareYates => chi2_pvalue(chi2(supp, body, head, total, true)),
            SignificanceTest::InfoGain => chi2_pvalue(g_stat(supp, body, head, total)),
        }
    }
}

fn chi2(supp: Supp, body: Supp, head: Supp, total: Supp, yates: bool) -> f64 {
    let (a, b, h, n) = (supp as f64, body as f64, head as f64, total as f64);
    let denom = b * (n - b) * h * (n - h);
    if denom <= 0.0 {
        return 0.0;
    }
    let mut diff = (a * n - b * h).abs();
    if yates {
        diff = (diff - 0.5 * n).max(0.0);
    }
    n * diff * diff / denom
}

fn g_stat(supp: Supp, body: Supp, head: Supp, total: Supp) -> f64 {
    let (a, b, h, n) = (supp as f64, body as f64, head as f64, total as f64);
    if b <= 0.0 || h <= 0.0 || b >= n || h >= n {
        return 0.0;
    }
    let cells = [
        (a, b * h / n),
        (b - a, b * (n - h) / n),
        (h - a, (n - b) * h / n),
        (n - b - h + a, (n - b) * (n - h) / n),
    ];
    let g: f64 = cells
        .iter()
        .filter(|(o, _)| *o > 0.0)
        .map(|&(o, e)| o * (o / e).ln())
        .sum();
    (2.0 * g).max(0.0)
}

/// Upper tail of the chi-square distribution with one degree of freedom.
pub fn chi2_pvalue(x: f64) -> Result<f64> {
    if x <= 0.0 {
        return Ok(1.0);
    }
    let dist = ChiSquared::new(1.0).map_err(|e| MineError::Stats(e.to_string()))?;
    Ok(dist.sf(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chi2_pvalue_critical_values() {
        // 3.841 and 6.635 are the 5% and 1% critical values for one degree of freedom
        assert!((chi2_pvalue(3.841_459).unwrap() - 0.05).abs() < 1e-6);
        assert!((chi2_pvalue(6.634_897).unwrap() - 0.01).abs() < 1e-6);
        assert_eq!(chi2_pvalue(0.0).unwrap(), 1.0);
        assert!(chi2_pvalue(200.0).unwrap() < 1e-40);
    }

    #[test]
    fn test_independence_is_not_significant() {
        // a*n == b*h
        let p = SignificanceTest::ChiSquare.pvalue(25, 50, 50, 100).unwrap();
        assert!((p - 1.0).abs() < 1e-6);
        let p = SignificanceTest::InfoGain.pvalue(25, 50, 50, 100).unwrap();
        assert!((p - 1.0).abs() < 1e-6);
        assert_eq!(SignificanceTest::None.pvalue(1, 50, 50, 100).unwrap(), 0.0);
    }

    #[test]
    fn test_strong_association() {
        let p = SignificanceTest::ChiSquare.pvalue(50, 50, 50, 100).unwrap();
        assert!(p < 1e-6);
        let y = SignificanceTest::ChiSquareYates.pvalue(50, 50, 50, 100).unwrap();
        assert!(y >= p);
    }

    #[test]
    fn test_closure_as_significance() {
        let fixed = |_: Supp, _: Supp, _: Supp, _: Supp| 0.5;
        assert_eq!(fixed.pvalue(1, 2, 3, 4).unwrap(), 0.5);
    }

    #[test]
    fn test_ld_ratio() {
        // s(AB)=3, s(A)=s(B)=4, W=5: log2(3*5/16)
        let v = ld_ratio(3, &[4, 4], 5);
        assert!((v - (15.0f64 / 16.0).log2()).abs() < 1e-12);
        assert_eq!(ld_ratio(3, &[4], 5), 0.0);
    }

    #[test]
    fn test_rule_measures() {
        // s(S)=20, s(body)=25, s(head)=40, W=100
        let value = |m: EvalMeasure| m.rule_value(20, 25, 40, 100).unwrap();
        assert!((value(EvalMeasure::Conf) - 0.8).abs() < 1e-12);
        assert!((value(EvalMeasure::ConfDiff) - 0.4).abs() < 1e-12);
        assert!((value(EvalMeasure::Lift) - 2.0).abs() < 1e-12);
        assert!((value(EvalMeasure::LiftDiff) - 1.0).abs() < 1e-12);
        assert!((value(EvalMeasure::LiftQuot) - 0.5).abs() < 1e-12);
        assert!((value(EvalMeasure::Conviction) - 3.0).abs() < 1e-12);
        assert!(value(EvalMeasure::Chi2) > 0.0);
        assert!(value(EvalMeasure::Chi2PValue) < 0.05);
        assert_eq!(EvalMeasure::Conviction.rule_value(25, 25, 40, 100).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_measure_direction() {
        assert!(EvalMeasure::Chi2PValue.passes(0.01, 0.05));
        assert!(!EvalMeasure::Chi2PValue.passes(0.1, 0.05));
        assert!(EvalMeasure::Lift.passes(1.5, 1.2));
        assert_eq!(EvalMeasure::from(SignificanceTest::InfoGain), EvalMeasure::InfoPValue);
        assert!(!EvalMeasure::LdRatio.is_rule_measure());
        assert_eq!("n".parse::<EvalAgg>().unwrap(), EvalAgg::Max);
        assert_eq!("liftdiff".parse::<EvalMeasure>().unwrap(), EvalMeasure::LiftDiff);
    }
}
