//! Minimum-phase band-limited step (minBLEP) correction.

/*
Band-Limited Steps
==================

A gate that jumps from 0 V to 10 V between two samples is an ideal step: its
spectrum extends forever and everything above Nyquist folds back as aliasing.
Instead of rendering the step band-limited from scratch, we keep emitting the
naive signal and *add a correction* that turns the naive step into a
band-limited one.

Vocabulary
----------

  BLEP          Band-Limited stEP: the integral of a band-limited impulse.

  minBLEP       A BLEP built from the minimum-phase version of that impulse.
                All of the ringing sits after the step, so the correction can
                start at the current sample without look-ahead.

  p             Sub-sample position of the step, in (-1, 0] samples relative
                to the current sample. p = -0.25 means "a quarter sample ago".

  correction    (minBLEP(t) - 1) · step. Naive signal + correction = the
                band-limited signal.


Table Construction (once, at first use)
---------------------------------------

  1. Windowed sinc with Z zero crossings per side, oversampled O times
     (Blackman-Harris window).
  2. Real cepstrum: IFFT(log|FFT(x)|).
  3. Fold the cepstrum (double positive quefrencies, drop negative ones),
     then FFT -> exp -> IFFT. This is the minimum-phase impulse.
  4. Running sum, normalized so the last point is exactly 1.

Runtime
-------

    insert(p, step):   for j in 0..2Z
                           buf[pos + j] += step · (table[(j - p)·O] - 1)
    process():         out = buf[pos]; buf[pos] = 0; pos += 1

The ring buffer is owned by a single output and touched only by the thread
that renders it. Both operations are allocation-free.
*/

use std::sync::OnceLock;

use rustfft::{num_complex::Complex, FftPlanner};

/// Zero crossings on each side of the sinc.
pub const ZERO_CROSSINGS: usize = 16;
/// Table oversampling factor.
pub const OVERSAMPLING: usize = 16;

const TABLE_LEN: usize = 2 * ZERO_CROSSINGS * OVERSAMPLING;
const BUF_LEN: usize = 2 * ZERO_CROSSINGS;

/// Build the integrated minimum-phase impulse. Length `2·z·o + 1`, last point 1.
pub fn min_blep_impulse(z: usize, o: usize) -> Vec<f32> {
    let n = 2 * z * o;
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);
    let scale = 1.0 / n as f64;

    // Windowed sinc
    let mut buf: Vec<Complex<f64>> = (0..n)
        .map(|i| {
            let p = -(z as f64) + 2.0 * z as f64 * i as f64 / (n - 1) as f64;
            Complex::new(sinc(p) * blackman_harris(i, n), 0.0)
        })
        .collect();

    // Real cepstrum
    forward.process(&mut buf);
    for c in buf.iter_mut() {
        *c = Complex::new(c.norm().ln().max(-30.0), 0.0);
    }
    inverse.process(&mut buf);
    for c in buf.iter_mut() {
        *c = Complex::new(c.re * scale, 0.0);
    }

    // Minimum-phase reconstruction
    for c in buf.iter_mut().take(n / 2).skip(1) {
        c.re *= 2.0;
    }
    for c in buf.iter_mut().skip((n + 1) / 2) {
        c.re = 0.0;
    }
    forward.process(&mut buf);
    for c in buf.iter_mut() {
        *c = c.exp();
    }
    inverse.process(&mut buf);

    // Integrate and normalize
    let mut total = 0.0;
    let mut step: Vec<f64> = buf
        .iter()
        .map(|c| {
            total += c.re * scale;
            total
        })
        .collect();
    let norm = 1.0 / step[n - 1];
    for v in step.iter_mut() {
        *v *= norm;
    }

    let mut table: Vec<f32> = step.into_iter().map(|v| v as f32).collect();
    table.push(1.0);
    table
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

fn blackman_harris(i: usize, n: usize) -> f64 {
    const A0: f64 = 0.35875;
    const A1: f64 = 0.48829;
    const A2: f64 = 0.14128;
    const A3: f64 = 0.01168;
    let f = std::f64::consts::TAU * i as f64 / (n - 1) as f64;
    A0 - A1 * f.cos() + A2 * (2.0 * f).cos() - A3 * (3.0 * f).cos()
}

/// Shared correction table for the default geometry.
pub fn shared_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(|| min_blep_impulse(ZERO_CROSSINGS, OVERSAMPLING))
}

/// Accumulating minBLEP corrector for a single output.
#[derive(Debug, Clone)]
pub struct MinBlepGenerator {
    table: &'static [f32],
    buf: [f32; BUF_LEN],
    pos: usize,
}

impl MinBlepGenerator {
    pub fn new() -> Self {
        Self {
            table: shared_table(),
            buf: [0.0; BUF_LEN],
            pos: 0,
        }
    }

    /// Queue the correction for a step of `step` volts at sub-sample offset `p`.
    ///
    /// `p` must lie in (-1, 0]; anything else (including NaN) is ignored.
    #[inline]
    pub fn insert_discontinuity(&mut self, p: f32, step: f32) {
        if !(p > -1.0 && p <= 0.0) || !step.is_finite() {
            return;
        }

        for j in 0..BUF_LEN {
            let index_f = (j as f32 - p) * OVERSAMPLING as f32;
            let index = (index_f as usize).min(TABLE_LEN - 1);
            let frac = index_f - index as f32;
            let a = self.table[index];
            let b = self.table[index + 1];
            let value = a + (b - a) * frac;
            self.buf[(self.pos + j) % BUF_LEN] += step * (value - 1.0);
        }
    }

    /// Next correction sample; add it to the naive output.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let v = self.buf[self.pos];
        self.buf[self.pos] = 0.0;
        self.pos = (self.pos + 1) % BUF_LEN;
        v
    }

    /// Drop every pending correction.
    pub fn reset(&mut self) {
        self.buf = [0.0; BUF_LEN];
        self.pos = 0;
    }
}

impl Default for MinBlepGenerator {
    fn default() -> Self {
        Self::new()
    }
}
