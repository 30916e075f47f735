use std::sync::atomic::{AtomicU64, Ordering};

/// `f64` stored as raw bits in an `AtomicU64`.
#[derive(Debug, Default)]
pub(crate) struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub(crate) fn new(v: f64) -> Self {
        Self {
            bits: AtomicU64::new(v.to_bits()),
        }
    }

    pub(crate) fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Release);
    }

    /// Replace the value and return the previous one.
    pub(crate) fn swap(&self, v: f64) -> f64 {
        f64::from_bits(self.bits.swap(v.to_bits(), Ordering::AcqRel))
    }

    /// CAS loop; returns the new value.
    pub(crate) fn add(&self, delta: f64) -> f64 {
        let mut old_bits = self.bits.load(Ordering::Relaxed);
        loop {
            let new_val = f64::from_bits(old_bits) + delta;
            match self.bits.compare_exchange_weak(
                old_bits,
                new_val.to_bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return new_val,
                Err(x) => old_bits = x,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_store() {
        let a = AtomicF64::new(1.5);
        assert_eq!(a.add(2.25), 3.75);
        a.store(-4.0);
        assert_eq!(a.load(), -4.0);
        assert_eq!(a.swap(0.0), -4.0);
        assert_eq!(a.load(), 0.0);
    }
}
