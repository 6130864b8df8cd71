//! Deterministic sampling of records for schema inference.
//!
//! Two bounds apply in sequence:
//! - a **ratio**: each record is kept independently with probability
//!   `sampling_ratio` (Bernoulli sampling; `1.0` keeps everything);
//! - a **size cap**: at most `sample_size` of the kept records survive,
//!   chosen uniformly with a reservoir and returned in input order.
//!
//! Both draw from a `SplitMix64` stream seeded by `seed`, so the same input
//! and seed always produce the same sample. Errors from the underlying
//! iterator are never sampled away.

use crate::options::JsonOptions;
use anyhow::Result;

#[derive(Clone, Copy, Debug)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    const fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    #[inline]
    #[allow(clippy::cast_precision_loss)]
    fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / ((1u64 << 53) as f64);
        ((self.next_u64() >> 11) as f64) * SCALE
    }
}

/// Sampling configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampler {
    pub ratio: f64,
    pub size: Option<usize>,
    pub seed: u64,
}

impl Sampler {
    #[must_use]
    pub fn new(ratio: f64, size: Option<usize>, seed: u64) -> Self {
        Self { ratio, size, seed }
    }

    #[must_use]
    pub fn from_options(options: &JsonOptions) -> Self {
        Self::new(options.sampling_ratio, options.sample_size, options.seed)
    }

    /// Sample a fallible stream of records lazily.
    pub fn sample<T, I>(&self, records: I) -> Sample<I::IntoIter>
    where
        I: IntoIterator<Item = Result<T>>,
    {
        let state = match self.size {
            None => SampleState::Streaming,
            Some(k) => SampleState::Pending(k),
        };
        Sample {
            inner: records.into_iter(),
            ratio: self.ratio,
            ratio_rng: SplitMix64::new(self.seed),
            reservoir_rng: SplitMix64::new(self.seed.wrapping_mul(0xA24B_AED4_0B9C_497C)),
            state,
        }
    }
}

enum SampleState<T> {
    Streaming,
    /// Reservoir of the given capacity not yet filled.
    Pending(usize),
    Draining(std::vec::IntoIter<T>),
    Done,
}

/// Iterator returned by [`Sampler::sample`].
pub struct Sample<I: Iterator> {
    inner: I,
    ratio: f64,
    ratio_rng: SplitMix64,
    reservoir_rng: SplitMix64,
    state: SampleState<I::Item>,
}

impl<T, I> Sample<I>
where
    I: Iterator<Item = Result<T>>,
{
    fn next_kept(&mut self) -> Option<Result<T>> {
        loop {
            match self.inner.next()? {
                Err(e) => return Some(Err(e)),
                Ok(v) if self.ratio >= 1.0 || self.ratio_rng.next_f64() < self.ratio => {
                    return Some(Ok(v));
                }
                Ok(_) => {}
            }
        }
    }

    /// Fill a reservoir of `k` kept records (Algorithm R), returned in input order.
    fn fill_reservoir(&mut self, k: usize) -> Result<Vec<Result<T>>> {
        let mut slots: Vec<(u64, T)> = Vec::with_capacity(k);
        let mut seen: u64 = 0;
        while let Some(item) = self.next_kept() {
            let v = item?;
            if slots.len() < k {
                slots.push((seen, v));
            } else {
                let j = self.reservoir_rng.next_u64() % (seen + 1);
                if let Ok(j) = usize::try_from(j)
                    && j < k
                {
                    slots[j] = (seen, v);
                }
            }
            seen += 1;
        }
        slots.sort_by_key(|(seq, _)| *seq);
        Ok(slots.into_iter().map(|(_, v)| Ok(v)).collect())
    }
}

impl<T, I> Iterator for Sample<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                SampleState::Streaming => return self.next_kept(),
                SampleState::Pending(k) => {
                    let k = *k;
                    match self.fill_reservoir(k) {
                        Ok(items) => self.state = SampleState::Draining(items.into_iter()),
                        Err(e) => {
                            self.state = SampleState::Done;
                            return Some(Err(e));
                        }
                    }
                }
                SampleState::Draining(items) => return items.next(),
                SampleState::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn ok_range(n: u32) -> impl Iterator<Item = Result<u32>> {
        (0..n).map(Ok)
    }

    #[test]
    fn identity_passes_everything() {
        let s = Sampler::new(1.0, None, 7);
        let out: Vec<u32> = s.sample(ok_range(10)).collect::<Result<_>>().unwrap();
        assert_eq!(out, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn ratio_is_deterministic_per_seed() {
        let s = Sampler::new(0.3, None, 99);
        let a: Vec<u32> = s.sample(ok_range(1000)).collect::<Result<_>>().unwrap();
        let b: Vec<u32> = s.sample(ok_range(1000)).collect::<Result<_>>().unwrap();
        assert_eq!(a, b);
        assert!(a.len() > 200 && a.len() < 400, "kept {}", a.len());
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn size_cap_keeps_order_and_bound() {
        let s = Sampler::new(1.0, Some(5), 1);
        let out: Vec<u32> = s.sample(ok_range(100)).collect::<Result<_>>().unwrap();
        assert_eq!(out.len(), 5);
        assert!(out.windows(2).all(|w| w[0] < w[1]));
        let again: Vec<u32> = s.sample(ok_range(100)).collect::<Result<_>>().unwrap();
        assert_eq!(out, again);

        let short: Vec<u32> = s.sample(ok_range(3)).collect::<Result<_>>().unwrap();
        assert_eq!(short, vec![0, 1, 2]);
    }

    #[test]
    fn errors_are_never_sampled_away() {
        let s = Sampler::new(0.01, None, 3);
        let items = vec![Ok(1), Err(anyhow!("broken")), Ok(2)];
        assert!(s.sample(items).any(|r| r.is_err()));

        let s = Sampler::new(1.0, Some(1), 3);
        let items = vec![Ok(1), Err(anyhow!("broken")), Ok(2)];
        let mut it = s.sample(items);
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
    }
}
