//! Sobol low-discrepancy sequence.
//!
//! Gray-code construction with 32-bit direction numbers from the Joe-Kuo
//! `new-joe-kuo-6.21201` table. The first dimension is the van der Corput
//! sequence in base 2. The first point of every dimension is zero.

use crate::error::DesignError;

const BITS: usize = 32;
const SCALE: f64 = 4_294_967_296.0; // 2^32

/// (degree s, coefficient a, initial direction numbers m_1..m_s) for
/// dimensions 2..=37, covering every primitive polynomial up to degree 7
const JOE_KUO: [(u32, u32, &[u32]); 36] = [
    (1, 0, &[1]),
    (2, 1, &[1, 3]),
    (3, 1, &[1, 3, 1]),
    (3, 2, &[1, 1, 1]),
    (4, 1, &[1, 1, 3, 3]),
    (4, 4, &[1, 3, 5, 13]),
    (5, 2, &[1, 1, 5, 5, 17]),
    (5, 4, &[1, 1, 5, 5, 5]),
    (5, 7, &[1, 1, 7, 11, 19]),
    (5, 11, &[1, 1, 5, 1, 1]),
    (5, 13, &[1, 1, 1, 3, 11]),
    (5, 14, &[1, 3, 5, 5, 31]),
    (6, 1, &[1, 3, 3, 9, 7, 49]),
    (6, 13, &[1, 1, 1, 15, 21, 21]),
    (6, 16, &[1, 3, 1, 13, 27, 49]),
    (6, 19, &[1, 1, 1, 15, 7, 5]),
    (6, 22, &[1, 3, 1, 15, 13, 25]),
    (6, 25, &[1, 1, 5, 5, 19, 61]),
    (7, 1, &[1, 3, 7, 11, 23, 15, 103]),
    (7, 4, &[1, 3, 7, 13, 13, 15, 69]),
    (7, 7, &[1, 1, 3, 13, 7, 35, 63]),
    (7, 8, &[1, 3, 5, 9, 1, 25, 53]),
    (7, 14, &[1, 3, 1, 13, 9, 35, 107]),
    (7, 19, &[1, 3, 1, 5, 27, 61, 31]),
    (7, 21, &[1, 1, 5, 11, 19, 41, 61]),
    (7, 28, &[1, 3, 5, 3, 3, 13, 69]),
    (7, 31, &[1, 1, 7, 13, 1, 19, 1]),
    (7, 32, &[1, 3, 7, 5, 13, 19, 59]),
    (7, 37, &[1, 1, 3, 9, 25, 29, 41]),
    (7, 41, &[1, 3, 5, 13, 23, 1, 55]),
    (7, 42, &[1, 3, 7, 3, 13, 59, 17]),
    (7, 50, &[1, 3, 1, 3, 5, 53, 69]),
    (7, 55, &[1, 1, 5, 5, 23, 33, 13]),
    (7, 56, &[1, 1, 7, 7, 1, 61, 123]),
    (7, 59, &[1, 1, 7, 9, 13, 61, 49]),
    (7, 62, &[1, 3, 3, 5, 3, 55, 33]),
];

/// Largest dimension count this generator supports
pub const MAX_DIMENSIONS: usize = JOE_KUO.len() + 1;

#[derive(Debug, Clone)]
pub struct SobolSequence {
    directions: Vec<[u32; BITS]>,
    state: Vec<u32>,
    shift: Vec<u32>,
    /// Index of the next point to emit
    index: u64,
}

impl SobolSequence {
    pub fn new(dimensions: usize) -> Result<Self, DesignError> {
        if dimensions > MAX_DIMENSIONS {
            return Err(DesignError::TooManyFactors {
                factors: dimensions.div_ceil(2),
                dimensions,
                supported: MAX_DIMENSIONS,
            });
        }

        let directions = (0..dimensions).map(direction_numbers).collect();
        Ok(Self {
            directions,
            state: vec![0; dimensions],
            shift: vec![0; dimensions],
            index: 0,
        })
    }

    /// Apply a random digital shift (XOR of each coordinate with a fixed
    /// per-dimension word). Equidistribution of the sequence is preserved.
    pub fn with_digital_shift(mut self, shift: Vec<u32>) -> Self {
        debug_assert_eq!(shift.len(), self.state.len());
        self.shift = shift;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.state.len()
    }

    /// Discard the next `n` points
    pub fn skip(&mut self, n: u64) {
        for _ in 0..n {
            self.advance();
        }
    }

    pub fn next_point(&mut self) -> Vec<f64> {
        let point = self
            .state
            .iter()
            .zip(&self.shift)
            .map(|(x, s)| (x ^ s) as f64 / SCALE)
            .collect();
        self.advance();
        point
    }

    fn advance(&mut self) {
        // Flip the direction number at the position of the lowest zero bit
        let c = (self.index.trailing_ones() as usize).min(BITS - 1);
        for (x, v) in self.state.iter_mut().zip(&self.directions) {
            *x ^= v[c];
        }
        self.index += 1;
    }
}

fn direction_numbers(dimension: usize) -> [u32; BITS] {
    let mut v = [0u32; BITS];

    if dimension == 0 {
        for (k, vk) in v.iter_mut().enumerate() {
            *vk = 1 << (BITS - 1 - k);
        }
        return v;
    }

    let (s, a, m) = JOE_KUO[dimension - 1];
    let s = s as usize;

    for k in 0..s {
        v[k] = m[k] << (BITS - 1 - k);
    }
    for k in s..BITS {
        let mut value = v[k - s] ^ (v[k - s] >> s);
        for l in 1..s {
            if (a >> (s - 1 - l)) & 1 == 1 {
                value ^= v[k - l];
            }
        }
        v[k] = value;
    }
    v
}
