//! Narrow IEEE-like floating point used by the mixer
//!
//! Values are stored as raw bit patterns `sign | exponent | mantissa` of a [`FloatFormat`].
//! All operations round to nearest, ties to even. Results smaller than the smallest normal value
//! flush to zero and results larger than the largest finite value saturate to it, the all-ones
//! exponent (infinity/NaN in IEEE 754) is never produced.

use serde::{Deserialize, Serialize};

/// Bit layout of a narrow float
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FloatFormat {
    pub exponent_bits: u32,
    pub mantissa_bits: u32,
}

impl Default for FloatFormat {
    fn default() -> Self {
        Self::BINARY16
    }
}

/// Raw bits of a value in some [`FloatFormat`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Float(u32);

impl Float {
    pub const ZERO: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> u32 {
        self.0
    }
}

/// `sig * 2^exp2`, `sig == 0` means zero
#[derive(Debug, Clone, Copy)]
struct Unpacked {
    negative: bool,
    sig: u128,
    exp2: i32,
}

impl FloatFormat {
    /// IEEE 754 half precision layout, what the reference gain registers use
    pub const BINARY16: Self = Self {
        exponent_bits: 5,
        mantissa_bits: 10,
    };

    pub const fn bias(self) -> i32 {
        (1 << (self.exponent_bits - 1)) - 1
    }

    /// Smallest unbiased exponent of a normal value
    pub const fn min_exponent(self) -> i32 {
        1 - self.bias()
    }

    /// Largest unbiased exponent of a finite value
    pub const fn max_exponent(self) -> i32 {
        self.max_biased_exponent() as i32 - self.bias()
    }

    const fn max_biased_exponent(self) -> u32 {
        (1 << self.exponent_bits) - 2
    }

    const fn mantissa_mask(self) -> u32 {
        (1 << self.mantissa_bits) - 1
    }

    const fn exponent_mask(self) -> u32 {
        (1 << self.exponent_bits) - 1
    }

    const fn sign_bit(self) -> u32 {
        1 << (self.exponent_bits + self.mantissa_bits)
    }

    pub const fn one(self) -> Float {
        Float((self.bias() as u32) << self.mantissa_bits)
    }

    pub const fn max_finite(self) -> Float {
        Float((self.max_biased_exponent() << self.mantissa_bits) | self.mantissa_mask())
    }

    pub fn is_negative(self, f: Float) -> bool {
        f.0 & self.sign_bit() != 0
    }

    fn saturate(self, negative: bool) -> Float {
        let sign = if negative { self.sign_bit() } else { 0 };

        Float(sign | self.max_finite().0)
    }

    fn unpack(self, f: Float) -> Unpacked {
        let negative = self.is_negative(f);
        let biased = (f.0 >> self.mantissa_bits) & self.exponent_mask();

        // Subnormal inputs are treated as zero
        if biased == 0 {
            return Unpacked {
                negative,
                sig: 0,
                exp2: 0,
            };
        }

        // The all-ones exponent is read as the largest finite value
        let (biased, mantissa) = if biased > self.max_biased_exponent() {
            (self.max_biased_exponent(), self.mantissa_mask())
        } else {
            (biased, f.0 & self.mantissa_mask())
        };

        Unpacked {
            negative,
            sig: u128::from((1 << self.mantissa_bits) | mantissa),
            exp2: biased as i32 - self.bias() - self.mantissa_bits as i32,
        }
    }

    /// Round the exact value `sig * 2^exp2` into this format
    fn round_pack(self, negative: bool, sig: u128, exp2: i32) -> Float {
        if sig == 0 {
            return Float::ZERO;
        }

        let m = self.mantissa_bits as i32;
        let msb = 127 - sig.leading_zeros() as i32;
        let mut exponent = msb + exp2;

        if exponent < self.min_exponent() {
            return Float::ZERO;
        }

        let significand = if msb > m {
            let shift = (msb - m) as u32;
            let kept = sig >> shift;
            let rest = sig & ((1u128 << shift) - 1);
            let half = 1u128 << (shift - 1);

            let round_up = rest > half || (rest == half && kept & 1 == 1);
            let mut kept = kept + u128::from(round_up);

            if kept >> (m + 1) != 0 {
                kept >>= 1;
                exponent += 1;
            }

            kept
        } else {
            sig << (m - msb) as u32
        };

        if exponent > self.max_exponent() {
            return self.saturate(negative);
        }

        let sign = if negative { self.sign_bit() } else { 0 };
        let biased = (exponent + self.bias()) as u32;

        Float(sign | (biased << self.mantissa_bits) | (significand as u32 & self.mantissa_mask()))
    }

    pub fn mul(self, a: Float, b: Float) -> Float {
        let a = self.unpack(a);
        let b = self.unpack(b);

        self.round_pack(a.negative != b.negative, a.sig * b.sig, a.exp2 + b.exp2)
    }

    pub fn add(self, a: Float, b: Float) -> Float {
        let a = self.unpack(a);
        let b = self.unpack(b);

        if a.sig == 0 {
            return self.round_pack(b.negative, b.sig, b.exp2);
        }
        if b.sig == 0 {
            return self.round_pack(a.negative, a.sig, a.exp2);
        }

        let (big, small) = if (a.exp2, a.sig) >= (b.exp2, b.sig) {
            (a, b)
        } else {
            (b, a)
        };

        let diff = (big.exp2 - small.exp2) as u32;

        // The smaller operand is below a quarter ulp of the larger one and can't affect rounding
        if diff > self.mantissa_bits + 2 {
            return self.round_pack(big.negative, big.sig, big.exp2);
        }

        let aligned = big.sig << diff;

        let sig = if big.negative == small.negative {
            aligned + small.sig
        } else {
            aligned - small.sig
        };

        self.round_pack(big.negative, sig, small.exp2)
    }

    pub fn from_f64(self, value: f64) -> Float {
        if value.is_nan() || value == 0.0 {
            return Float::ZERO;
        }

        let negative = value.is_sign_negative();

        if value.is_infinite() {
            return self.saturate(negative);
        }

        let bits = value.to_bits();
        let exponent = ((bits >> 52) & 0x7ff) as i32;

        // f64 subnormals are far below the range of any supported format
        if exponent == 0 {
            return Float::ZERO;
        }

        let sig = u128::from((1u64 << 52) | (bits & ((1u64 << 52) - 1)));

        self.round_pack(negative, sig, exponent - 1023 - 52)
    }

    pub fn to_f64(self, f: Float) -> f64 {
        let u = self.unpack(f);
        let magnitude = u.sig as f64 * 2f64.powi(u.exp2);

        if u.negative { -magnitude } else { magnitude }
    }

    /// Nearest value to `code / (2^bits - 1)`
    pub fn from_code(self, code: u16, bits: u8) -> Float {
        let max = max_code(bits);
        let code = code.min(max);

        if code == 0 {
            return Float::ZERO;
        }

        // Enough quotient bits that the remainder only matters as a sticky bit
        let k = self.mantissa_bits + 3 + u32::from(bits);
        let numerator = u128::from(code) << k;
        let quotient = numerator / u128::from(max);
        let sticky = u128::from(numerator % u128::from(max) != 0);

        self.round_pack(false, (quotient << 1) | sticky, -(k as i32) - 1)
    }

    /// Nearest code to `f * (2^bits - 1)`, clamped to the code range
    pub fn to_code(self, f: Float, bits: u8) -> u16 {
        let max = max_code(bits);
        let u = self.unpack(f);

        if u.sig == 0 || u.negative {
            return 0;
        }

        let scaled = u.sig * u128::from(max);

        let code = if u.exp2 >= 0 {
            if u.exp2 >= 64 {
                return max;
            }

            scaled << u.exp2
        } else {
            let shift = (-u.exp2) as u32;

            if shift > 120 {
                return 0;
            }

            let kept = scaled >> shift;
            let rest = scaled & ((1u128 << shift) - 1);
            let half = 1u128 << (shift - 1);

            kept + u128::from(rest > half || (rest == half && kept & 1 == 1))
        };

        code.min(u128::from(max)) as u16
    }
}

pub(crate) const fn max_code(bits: u8) -> u16 {
    ((1u32 << bits) - 1) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    const F16: FloatFormat = FloatFormat::BINARY16;

    fn sample_values() -> Vec<f64> {
        let mut values = vec![0.0, 1.0, 0.5, 0.25, 2.0, 1.0 / 255.0, 254.0 / 255.0];

        let mut x = 0x2545_f491_u32;
        for _ in 0..400 {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            values.push(f64::from(x % 100_000) / 37_000.0);
        }

        values
    }

    #[test]
    fn binary16_constants() {
        assert_eq!(F16.one().to_bits(), 0x3c00);
        assert_eq!(F16.from_f64(0.5).to_bits(), 0x3800);
        assert_eq!(F16.from_f64(0.05).to_bits(), 10854);
        assert_eq!(F16.from_f64(0.95).to_bits(), 15258);
        assert_eq!(F16.max_finite().to_bits(), 0x7bff);
        assert_eq!(F16.to_f64(F16.max_finite()), 65504.0);
    }

    #[test]
    fn mul_is_correctly_rounded() {
        let values: Vec<Float> = sample_values().into_iter().map(|v| F16.from_f64(v)).collect();

        for pair in values.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let exact = F16.to_f64(a) * F16.to_f64(b);

            assert_eq!(F16.mul(a, b), F16.from_f64(exact), "{a:?} * {b:?}");
        }
    }

    #[test]
    fn add_is_correctly_rounded() {
        let values: Vec<Float> = sample_values().into_iter().map(|v| F16.from_f64(v)).collect();

        for pair in values.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let exact = F16.to_f64(a) + F16.to_f64(b);

            assert_eq!(F16.add(a, b), F16.from_f64(exact), "{a:?} + {b:?}");
        }
    }

    #[test]
    fn add_with_opposite_signs() {
        let a = F16.from_f64(1.0);
        let b = F16.from_f64(-0.375);

        assert_eq!(F16.to_f64(F16.add(a, b)), 0.625);
        assert_eq!(F16.add(a, F16.from_f64(-1.0)), Float::ZERO);
    }

    #[test]
    fn ties_round_to_even() {
        // 1 + 2^-11 lies exactly between 1.0 and the next value up
        assert_eq!(F16.from_f64(1.0 + 2f64.powi(-11)), F16.one());
        // 1 + 3 * 2^-11 rounds up to the even mantissa 2
        assert_eq!(F16.from_f64(1.0 + 3.0 * 2f64.powi(-11)).to_bits(), 0x3c02);
    }

    #[test]
    fn saturates_and_flushes() {
        let big = F16.from_f64(60000.0);

        assert_eq!(F16.add(big, big), F16.max_finite());
        assert_eq!(F16.mul(big, big), F16.max_finite());
        assert_eq!(F16.from_f64(f64::INFINITY), F16.max_finite());

        let tiny = F16.from_f64(2f64.powi(-10));
        assert_eq!(F16.mul(tiny, tiny), Float::ZERO);
        assert_eq!(F16.from_f64(2f64.powi(-15)), Float::ZERO);
    }

    #[test]
    fn codes_survive_encode_and_decode() {
        for bits in [8u8, 10] {
            for code in 0..=max_code(bits) {
                let f = F16.from_code(code, bits);

                assert_eq!(F16.to_code(f, bits), code, "{bits} bit code {code}");
            }
        }
    }

    #[test]
    fn decode_clamps() {
        assert_eq!(F16.to_code(F16.from_f64(1.7), 8), 255);
        assert_eq!(F16.to_code(F16.from_f64(-0.5), 8), 0);
        assert_eq!(F16.to_code(F16.max_finite(), 8), 255);
    }
}
