/// Adler-32's modulus. The codec fixes this at the canonical value so `weak`
/// and [`RollingChecksum`] agree with any reference Adler-32 implementation
/// and the round-trip law holds under byte-at-a-time rolling.
///
/// A well-known precedent (including the codebase this sync design is
/// modeled on) truncates to `0xffff` (modulus `65536`) instead, which is
/// *not* a true Adler-32 and was identified in design review as a
/// compatibility bug, not a feature worth preserving here.
const ADLER_MOD: u32 = 65521;

/// Computes the Adler-32 checksum of `data` in one shot.
///
/// Matches the canonical Adler-32 specification exactly, so it can be
/// checked against any reference implementation or test vector.
#[must_use]
pub fn weak(data: &[u8]) -> u32 {
    let mut rolling = RollingChecksum::new();
    rolling.update(data);
    rolling.value()
}

/// An Adler-32 checksum maintained incrementally over a sliding window.
///
/// Built up with [`update`](Self::update) over an initial window, then
/// advanced one byte at a time with [`roll`](Self::roll) in O(1) per byte —
/// the core primitive the delta scanner uses to avoid recomputing a full
/// checksum at every candidate window position.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    a: u32,
    b: u32,
    len: u64,
}

impl RollingChecksum {
    /// Creates a checksum over an empty window.
    #[must_use]
    pub const fn new() -> Self {
        Self { a: 1, b: 0, len: 0 }
    }

    /// Resets to an empty window and folds in `data`, establishing a fresh
    /// window. Used both for the initial window and after a block match,
    /// where the scanner jumps to a new window rather than rolling into it.
    pub fn update(&mut self, data: &[u8]) {
        self.a = 1;
        self.b = 0;
        self.len = 0;
        for &byte in data {
            self.a = (self.a + u32::from(byte)) % ADLER_MOD;
            self.b = (self.b + self.a) % ADLER_MOD;
        }
        self.len = data.len() as u64;
    }

    /// Advances the window by exactly one byte: `outgoing` leaves the
    /// window, `incoming` enters it. The window length is unchanged.
    ///
    /// Implements the rolling rule from the delta algorithm:
    /// `a <- (a - out + in) mod M`, `b <- (b - N*out + a - 1) mod M`.
    ///
    /// The `- 1` corrects for `update`'s Adler-32 seed (`a` starts at `1`,
    /// not `0`): `b` accumulates that seed once per byte still in the
    /// window, so shifting the window by one drops exactly one seed unit in
    /// addition to the `N*out` term. Omitting it desyncs `b` from a fresh
    /// `update` over the same window after the very first roll.
    pub fn roll(&mut self, outgoing: u8, incoming: u8) {
        let out = i64::from(outgoing);
        let inn = i64::from(incoming);
        let m = i64::from(ADLER_MOD);
        let n = self.len as i64;

        let a = (i64::from(self.a) - out + inn).rem_euclid(m);
        let b = (i64::from(self.b) - n * out + a - 1).rem_euclid(m);

        self.a = a as u32;
        self.b = b as u32;
    }

    /// Returns the combined 32-bit checksum value, `(b << 16) | a`.
    #[must_use]
    pub const fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Returns the number of bytes in the current window.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the window is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_adler32_vectors() {
        // Adler-32("") == 1, Adler-32("a") == 0x00620062 (well-known vectors).
        assert_eq!(weak(b""), 1);
        assert_eq!(weak(b"a"), 0x0062_0062);
        assert_eq!(weak(b"abc"), 0x024d_0127);
    }

    #[test]
    fn rolling_matches_fresh_computation() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let window = 8usize;

        let mut rolling = RollingChecksum::new();
        rolling.update(&data[0..window]);

        for start in 1..=(data.len() - window) {
            rolling.roll(data[start - 1], data[start + window - 1]);
            let mut fresh = RollingChecksum::new();
            fresh.update(&data[start..start + window]);
            assert_eq!(
                rolling.value(),
                fresh.value(),
                "mismatch rolling into window starting at {start}"
            );
        }
    }

    #[test]
    fn roll_corrects_for_the_adler_seed_past_the_first_shift() {
        // Regression for the off-by-one in `roll`'s `b` update: rolling
        // [10, 20] by one byte (out=10, in=30) must land on the same value
        // as a fresh `update` over [20, 30], not one off from it.
        let mut rolling = RollingChecksum::new();
        rolling.update(&[10, 20]);
        assert_eq!(rolling.value(), (42 << 16) | 31);

        rolling.roll(10, 30);

        let mut fresh = RollingChecksum::new();
        fresh.update(&[20, 30]);
        assert_eq!(rolling.value(), fresh.value());
        assert_eq!(rolling.value(), (72 << 16) | 51);
    }

    #[test]
    fn empty_window_checksum_is_one() {
        let rolling = RollingChecksum::new();
        assert_eq!(rolling.value(), 1);
        assert!(rolling.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Rolling one byte at a time must always agree with recomputing the
        /// checksum from scratch over the same window, for arbitrary data
        /// and window widths.
        #[test]
        fn rolling_matches_fresh_recompute(
            data in proptest::collection::vec(any::<u8>(), 1..200),
            window_frac in 1u8..=100u8,
        ) {
            let window = (1 + (data.len() - 1) * window_frac as usize / 100).max(1).min(data.len());
            let mut rolling = RollingChecksum::new();
            rolling.update(&data[0..window]);

            for start in 1..=(data.len() - window) {
                rolling.roll(data[start - 1], data[start + window - 1]);
                let mut fresh = RollingChecksum::new();
                fresh.update(&data[start..start + window]);
                prop_assert_eq!(rolling.value(), fresh.value());
            }
        }

        /// `weak` must agree with a from-scratch [`RollingChecksum`] for any
        /// input, independent of how the window was built up.
        #[test]
        fn weak_matches_rolling_checksum_value(data in proptest::collection::vec(any::<u8>(), 0..300)) {
            let mut rolling = RollingChecksum::new();
            rolling.update(&data);
            prop_assert_eq!(weak(&data), rolling.value());
        }
    }
}
