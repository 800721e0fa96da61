//! Random-number generation for [`RandomDelayFilter`] and [`super::RandomDropFilter`]
//! (§4.5).
//!
//! Each thread gets its own generator, seeded once from a hardware entropy source XORed
//! with a hash of the thread id, so concurrent filter invocations never serialize on a
//! shared generator. A thread's sequence is only reproducible if the thread is reseeded
//! explicitly with [`seed_current_thread`]; absent that, results vary run to run.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Binomial, Cauchy, ChiSquared, Distribution as _, Exp, FisherF, Gamma, Geometric, Gumbel, LogNormal, Normal, Poisson, StudentT, Uniform, Weibull};

use helics_core::error::{HelicsError, Result};
use helics_core::message::Message;

use crate::operators::{MessageOperator, OperatorOutput};
use crate::filters::FilterOperation;

thread_local! {
    static THREAD_RNG: RefCell<StdRng> = RefCell::new(StdRng::from_seed(default_thread_seed()));
}

fn default_thread_seed() -> [u8; 32] {
    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    let thread_hash = hasher.finish();
    let entropy: u64 = rand::thread_rng().gen();
    let mixed = entropy ^ thread_hash;
    let mut seed = [0u8; 32];
    seed[..8].copy_from_slice(&mixed.to_le_bytes());
    seed
}

/// Reseed this thread's generator deterministically, for tests that need reproducible
/// sequences.
pub fn seed_current_thread(seed: u64) {
    let mut full = [0u8; 32];
    full[..8].copy_from_slice(&seed.to_le_bytes());
    THREAD_RNG.with(|rng| *rng.borrow_mut() = StdRng::from_seed(full));
}

fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    THREAD_RNG.with(|rng| f(&mut rng.borrow_mut()))
}

/// Draw a Bernoulli(p) trial via the current thread's generator.
pub fn thread_rng_bool(p: f64) -> bool {
    with_rng(|rng| rng.gen_bool(p.clamp(0.0, 1.0)))
}

/// The distributions exposed by `RandomDelay`'s `distribution` string property (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomDistribution {
    Uniform,
    Normal,
    LogNormal,
    Cauchy,
    ChiSquared,
    Exponential,
    ExtremeValue,
    FisherF,
    Weibull,
    StudentT,
    Geometric,
    Poisson,
    Bernoulli,
    Binomial,
    Gamma,
    Constant,
}

impl RandomDistribution {
    pub fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "uniform" => Self::Uniform,
            "normal" => Self::Normal,
            "lognormal" => Self::LogNormal,
            "cauchy" => Self::Cauchy,
            "chi_squared" => Self::ChiSquared,
            "exponential" => Self::Exponential,
            "extreme_value" => Self::ExtremeValue,
            "fisher_f" => Self::FisherF,
            "weibull" => Self::Weibull,
            "student_t" => Self::StudentT,
            "geometric" => Self::Geometric,
            "poisson" => Self::Poisson,
            "bernoulli" => Self::Bernoulli,
            "binomial" => Self::Binomial,
            "gamma" => Self::Gamma,
            "constant" => Self::Constant,
            other => return Err(HelicsError::InvalidParameter(format!("unknown distribution {other:?}"))),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Normal => "normal",
            Self::LogNormal => "lognormal",
            Self::Cauchy => "cauchy",
            Self::ChiSquared => "chi_squared",
            Self::Exponential => "exponential",
            Self::ExtremeValue => "extreme_value",
            Self::FisherF => "fisher_f",
            Self::Weibull => "weibull",
            Self::StudentT => "student_t",
            Self::Geometric => "geometric",
            Self::Poisson => "poisson",
            Self::Bernoulli => "bernoulli",
            Self::Binomial => "binomial",
            Self::Gamma => "gamma",
            Self::Constant => "constant",
        }
    }

    /// Draw a sample using `param1` (mean/min/alpha) and `param2` (stddev/max/beta).
    fn sample(&self, param1: f64, param2: f64) -> f64 {
        with_rng(|rng| match self {
            Self::Uniform => Uniform::new(param1, param1.max(param2).max(param1 + f64::EPSILON)).sample(rng),
            Self::Normal => Normal::new(param1, param2.max(1e-12)).unwrap().sample(rng),
            Self::LogNormal => LogNormal::new(param1, param2.max(1e-12)).unwrap().sample(rng),
            Self::Cauchy => Cauchy::new(param1, param2.max(1e-12)).unwrap().sample(rng),
            Self::ChiSquared => ChiSquared::new(param1.max(1e-6)).unwrap().sample(rng),
            Self::Exponential => Exp::new(param1.max(1e-12)).unwrap().sample(rng),
            Self::ExtremeValue => Gumbel::new(param1, param2.max(1e-12)).unwrap().sample(rng),
            Self::FisherF => FisherF::new(param1.max(1e-6), param2.max(1e-6)).unwrap().sample(rng),
            Self::Weibull => Weibull::new(param1.max(1e-6), param2.max(1e-6)).unwrap().sample(rng),
            Self::StudentT => StudentT::new(param1.max(1e-6)).unwrap().sample(rng),
            Self::Geometric => Geometric::new(param1.clamp(1e-6, 1.0)).unwrap().sample(rng) as f64,
            Self::Poisson => Poisson::new(param1.max(1e-6)).unwrap().sample(rng),
            Self::Bernoulli => {
                if Bernoulli::new(param1.clamp(0.0, 1.0)).unwrap().sample(rng) {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Binomial => Binomial::new(param1.max(0.0) as u64, param2.clamp(0.0, 1.0)).unwrap().sample(rng) as f64,
            Self::Gamma => Gamma::new(param1.max(1e-6), param2.max(1e-6)).unwrap().sample(rng),
            Self::Constant => param1,
        })
    }
}

/// Delays a message by a randomly drawn amount, redrawn on every `process` call.
pub struct RandomDelayFilter {
    param1_bits: AtomicU64,
    param2_bits: AtomicU64,
    distribution: Mutex<RandomDistribution>,
}

impl Default for RandomDelayFilter {
    fn default() -> Self {
        Self {
            param1_bits: AtomicU64::new(0f64.to_bits()),
            param2_bits: AtomicU64::new(1f64.to_bits()),
            distribution: Mutex::new(RandomDistribution::Uniform),
        }
    }
}

impl RandomDelayFilter {
    fn param1(&self) -> f64 {
        f64::from_bits(self.param1_bits.load(Ordering::Acquire))
    }

    fn param2(&self) -> f64 {
        f64::from_bits(self.param2_bits.load(Ordering::Acquire))
    }
}

impl MessageOperator for RandomDelayFilter {
    fn process(&self, mut msg: Message) -> OperatorOutput {
        let dist = *self.distribution.lock().unwrap();
        let draw = dist.sample(self.param1(), self.param2()).max(0.0);
        msg.time = msg.time.advanced_by(draw);
        OperatorOutput::pass(msg)
    }
}

impl FilterOperation for RandomDelayFilter {
    fn set(&self, name: &str, value: f64) -> Result<()> {
        match name {
            "param1" | "mean" | "min" | "alpha" => self.param1_bits.store(value.to_bits(), Ordering::Release),
            "param2" | "stddev" | "max" | "beta" => self.param2_bits.store(value.to_bits(), Ordering::Release),
            _ => {}
        }
        Ok(())
    }

    fn set_string(&self, name: &str, value: &str) -> Result<()> {
        if name == "distribution" || name == "dist" {
            *self.distribution.lock().unwrap() = RandomDistribution::parse(value)?;
        }
        Ok(())
    }

    fn get_property(&self, name: &str) -> Result<f64> {
        match name {
            "param1" | "mean" | "min" | "alpha" => Ok(self.param1()),
            "param2" | "stddev" | "max" | "beta" => Ok(self.param2()),
            _ => Err(HelicsError::InvalidParameter(format!("no such numeric property: {name}"))),
        }
    }

    fn get_string(&self, name: &str) -> Result<String> {
        if name == "distribution" || name == "dist" {
            Ok(self.distribution.lock().unwrap().as_str().to_string())
        } else {
            Err(HelicsError::InvalidParameter(format!("no such string property: {name}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_name_round_trips() {
        for name in [
            "uniform", "normal", "lognormal", "cauchy", "chi_squared", "exponential", "extreme_value", "fisher_f",
            "weibull", "student_t", "geometric", "poisson", "bernoulli", "binomial", "gamma", "constant",
        ] {
            let dist = RandomDistribution::parse(name).unwrap();
            assert_eq!(dist.as_str(), name);
        }
    }

    #[test]
    fn unknown_distribution_is_rejected() {
        assert!(RandomDistribution::parse("bogus").is_err());
    }

    #[test]
    fn constant_distribution_always_returns_param1() {
        let f = RandomDelayFilter::default();
        f.set_string("distribution", "constant").unwrap();
        f.set("param1", 3.0).unwrap();
        let out = f.process(Message::new("a", "b", vec![], Default::default())).primary.unwrap();
        assert_eq!(out.time.as_seconds(), 3.0);
    }

    #[test]
    fn random_drop_statistics_stay_within_bound() {
        seed_current_thread(42);
        let trials = 200;
        let p = 0.75;
        let drops = (0..trials).filter(|_| thread_rng_bool(p)).count() as f64;
        let stddev = (p * (1.0 - p) / trials as f64).sqrt();
        let expected = trials as f64 * p;
        assert!((drops - expected).abs() <= 4.5 * trials as f64 * stddev);
    }
}
