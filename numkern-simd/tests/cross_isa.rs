//! Every accelerated variant the host supports must agree with the portable
//! variant: bit for bit for integer and element-wise float arithmetic, within
//! a few ULP where the summation order or the polynomial differs.

use numkern_simd::kernels::linalg::{KC, NC};
use numkern_simd::{BinaryOp, CpuFeatures, FloatKernel, Isa, KernelElement, OpClass};
use numkern_traits::Element;
use num_traits::{NumCast, ToPrimitive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LENGTHS: &[usize] = &[0, 1, 3, 4, 7, 8, 15, 16, 17, 31, 32, 33, 63, 64, 65, 100, 129, 257];
const ROWS: &[usize] = &[1, 3, 4, 5, 8, 9];
// Seams of block_n = 2 * WIDTH for every width from 1 to 32.
const COLS: &[usize] = &[1, 2, 3, 4, 5, 7, 8, 9, 15, 16, 17, 31, 32, 33, 63, 64, 65, 127];

fn variants<T: KernelElement>(class: OpClass) -> Vec<Isa> {
    let host = CpuFeatures::host();
    T::chain(class)
        .iter()
        .copied()
        .filter(|&isa| host.supports(isa))
        .collect()
}

/// Integers in `lo..hi`, scaled by `step` for float types.
fn random<T: Element>(rng: &mut StdRng, n: usize, lo: i32, hi: i32, step: f64) -> Vec<T> {
    (0..n)
        .map(|_| {
            let v = <f64 as From<i32>>::from(rng.gen_range(lo..hi)) * if T::IS_FLOAT { step } else { 1.0 };
            <T as NumCast>::from(v).unwrap_or_else(T::zero)
        })
        .collect()
}

fn assert_close<T: Element>(got: &[T], expect: &[T], rel: f64, context: &str) {
    assert_eq!(got.len(), expect.len(), "{context}");
    for (i, (&g, &e)) in got.iter().zip(expect).enumerate() {
        if T::IS_FLOAT {
            let (g, e) = (g.to_f64().unwrap_or(f64::NAN), e.to_f64().unwrap_or(f64::NAN));
            if g == e {
                continue;
            }
            if g.is_nan() || e.is_nan() {
                assert!(g.is_nan() && e.is_nan(), "{context}[{i}]: {g} vs {e}");
                continue;
            }
            let tol = rel * e.abs().max(g.abs()) + 1e-30;
            assert!((g - e).abs() <= tol, "{context}[{i}]: {g} vs {e}");
        } else {
            assert_eq!(g, e, "{context}[{i}]");
        }
    }
}

fn check_binary<T: KernelElement>(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for &n in LENGTHS {
        let a: Vec<T> = random(&mut rng, n, -120, 120, 0.37);
        let b: Vec<T> = random(&mut rng, n, -120, 120, 0.37);
        let value: T = random(&mut rng, 1, 1, 9, 0.37)[0];
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            let mut want = vec![T::zero(); n];
            let mut want_v = vec![T::zero(); n];
            unsafe {
                T::binary(Isa::None, op, want.as_mut_ptr(), a.as_ptr(), b.as_ptr(), n);
                T::binary_value(Isa::None, op, want_v.as_mut_ptr(), a.as_ptr(), value, n);
            }
            for isa in variants::<T>(OpClass::Arith) {
                let mut got = vec![T::zero(); n];
                let mut got_v = vec![T::zero(); n];
                unsafe {
                    T::binary(isa, op, got.as_mut_ptr(), a.as_ptr(), b.as_ptr(), n);
                    T::binary_value(isa, op, got_v.as_mut_ptr(), a.as_ptr(), value, n);
                }
                let ctx = format!("{} {op:?} {isa} n={n}", T::NAME);
                assert_close(&got, &want, 0.0, &ctx);
                assert_close(&got_v, &want_v, 0.0, &ctx);
            }
        }
    }
}

fn check_broadcast<T: KernelElement>(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for &rows in ROWS {
        for &n in COLS {
            let ld = n + 3;
            let a: Vec<T> = random(&mut rng, rows * ld, -50, 50, 0.37);
            let b: Vec<T> = random(&mut rng, n, 1, 50, 0.37);
            let mut want = vec![T::one(); rows * ld];
            unsafe {
                T::binary_broadcast(Isa::None, BinaryOp::Sub, want.as_mut_ptr(), ld, a.as_ptr(), ld, b.as_ptr(), rows, n);
            }
            for isa in variants::<T>(OpClass::Arith) {
                let mut got = vec![T::one(); rows * ld];
                unsafe {
                    T::binary_broadcast(isa, BinaryOp::Sub, got.as_mut_ptr(), ld, a.as_ptr(), ld, b.as_ptr(), rows, n);
                }
                assert_close(&got, &want, 0.0, &format!("{} broadcast {isa} {rows}x{n}", T::NAME));
            }
        }
    }
}

/// Quarter steps keep float sums exact, so every variant must agree exactly.
fn check_reductions<T: KernelElement>(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for &rows in ROWS {
        for &n in COLS {
            let ld = n + 1;
            let src: Vec<T> = random(&mut rng, rows * ld, -100, 100, 0.25);
            let run = |isa: Isa| unsafe {
                let mut sum_r = vec![<T::Acc as num_traits::Zero>::zero(); rows];
                let mut min_r = vec![T::highest(); rows];
                let mut max_r = vec![T::lowest(); rows];
                let mut sum_c = vec![<T::Acc as num_traits::Zero>::zero(); n];
                let mut min_c = vec![T::highest(); n];
                let mut max_c = vec![T::lowest(); n];
                let mut total = vec![<T::Acc as num_traits::Zero>::zero(); 1];
                T::sum_rows(isa, src.as_ptr(), ld, rows, n, sum_r.as_mut_ptr(), 1);
                T::min_rows(isa, src.as_ptr(), ld, rows, n, min_r.as_mut_ptr(), 1);
                T::max_rows(isa, src.as_ptr(), ld, rows, n, max_r.as_mut_ptr(), 1);
                T::sum_cols(isa, src.as_ptr(), ld, rows, n, sum_c.as_mut_ptr());
                T::min_cols(isa, src.as_ptr(), ld, rows, n, min_c.as_mut_ptr());
                T::max_cols(isa, src.as_ptr(), ld, rows, n, max_c.as_mut_ptr());
                T::sum_rows(isa, src.as_ptr(), ld, rows, n, total.as_mut_ptr(), 0);
                (sum_r, min_r, max_r, sum_c, min_c, max_c, total)
            };
            let want = run(Isa::None);
            for isa in variants::<T>(OpClass::Reduce) {
                let got = run(isa);
                let ctx = format!("{} {isa} {rows}x{n}", T::NAME);
                assert_close(&got.0, &want.0, 0.0, &ctx);
                assert_close(&got.1, &want.1, 0.0, &ctx);
                assert_close(&got.2, &want.2, 0.0, &ctx);
                assert_close(&got.3, &want.3, 0.0, &ctx);
                assert_close(&got.4, &want.4, 0.0, &ctx);
                assert_close(&got.5, &want.5, 0.0, &ctx);
                assert_close(&got.6, &want.6, 0.0, &ctx);
            }
        }
    }
}

fn check_linalg<T: KernelElement>(seed: u64, rel: f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for &(m, n, k) in &[(1, 1, 1), (3, 7, 5), (4, 33, 17), (5, 65, 9), (2, NC + 3, KC + 2)] {
        let a: Vec<T> = random(&mut rng, m * k, -4, 4, 1.0);
        let b: Vec<T> = random(&mut rng, k * n, -4, 4, 1.0);
        let run = |isa: Isa| unsafe {
            let mut c = vec![T::zero(); m * n];
            T::gemm(isa, m, n, k, a.as_ptr(), k, b.as_ptr(), n, c.as_mut_ptr(), n);
            let mut o = vec![T::zero(); m * n];
            T::outer(isa, m, n, a.as_ptr(), b.as_ptr(), o.as_mut_ptr(), n);
            let d = T::dot(isa, a.as_ptr(), b.as_ptr(), m.min(n));
            (c, o, d)
        };
        let want = run(Isa::None);
        for isa in variants::<T>(OpClass::Linalg) {
            let got = run(isa);
            let ctx = format!("{} {isa} {m}x{n}x{k}", T::NAME);
            assert_close(&got.0, &want.0, rel, &ctx);
            assert_close(&got.1, &want.1, 0.0, &ctx);
            assert_close(&[got.2], &[want.2], rel, &ctx);
        }
    }
}

#[test]
fn test_binary_matches_portable() {
    check_binary::<i8>(1);
    check_binary::<u8>(2);
    check_binary::<i16>(3);
    check_binary::<u16>(4);
    check_binary::<i32>(5);
    check_binary::<u32>(6);
    check_binary::<i64>(7);
    check_binary::<u64>(8);
    check_binary::<f32>(9);
    check_binary::<f64>(10);
}

#[test]
fn test_broadcast_matches_portable() {
    check_broadcast::<u8>(11);
    check_broadcast::<i16>(12);
    check_broadcast::<i32>(13);
    check_broadcast::<f32>(14);
    check_broadcast::<f64>(15);
}

#[test]
fn test_reductions_match_portable() {
    check_reductions::<i8>(21);
    check_reductions::<u8>(22);
    check_reductions::<i16>(23);
    check_reductions::<u16>(24);
    check_reductions::<i32>(25);
    check_reductions::<u32>(26);
    check_reductions::<i64>(27);
    check_reductions::<f32>(28);
    check_reductions::<f64>(29);
}

#[test]
fn test_linalg_matches_portable() {
    check_linalg::<i8>(31, 0.0);
    check_linalg::<i32>(32, 0.0);
    check_linalg::<u64>(33, 0.0);
    // Small integers keep every float product and partial sum exact.
    check_linalg::<f32>(34, 0.0);
    check_linalg::<f64>(35, 0.0);
}

fn transcend_inputs<T: FloatKernel>(rng: &mut StdRng, n: usize, lo: f64, hi: f64) -> Vec<T> {
    (0..n)
        .map(|_| <T as NumCast>::from(rng.gen_range(lo..hi)).unwrap_or_else(T::zero))
        .collect()
}

/// Distance from `got` to `want` in units in the last place of `T` at
/// `max(|want|, floor)`.
fn ulps<T: FloatKernel>(got: f64, want: f64, floor: f64) -> f64 {
    if got == want {
        return 0.0;
    }
    let eps = if T::NAME == "f32" { <f64 as From<f32>>::from(f32::EPSILON) } else { f64::EPSILON };
    let min_normal = T::MIN_POSITIVE.to_f64().unwrap_or(f64::MIN_POSITIVE);
    let scale = want.abs().max(floor);
    let spacing = (eps * scale.log2().floor().exp2()).max(eps * min_normal);
    (got - want).abs() / spacing
}

fn check_transcendental<T: FloatKernel>(seed: u64, max_ulps: f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let hi = T::EXP_MAX.to_f64().unwrap_or(80.0);
    for &n in LENGTHS {
        let xs: Vec<T> = transcend_inputs(&mut rng, n, -hi, hi);
        let ys: Vec<T> = transcend_inputs(&mut rng, n, 1e-6, 1e6);
        let mut want_exp = vec![T::zero(); n];
        let mut want_log = vec![T::zero(); n];
        unsafe {
            T::exp(Isa::None, want_exp.as_mut_ptr(), xs.as_ptr(), n);
            T::log(Isa::None, want_log.as_mut_ptr(), ys.as_ptr(), n);
        }
        for isa in variants::<T>(OpClass::Transcendental) {
            let mut got_exp = vec![T::zero(); n];
            let mut got_log = vec![T::zero(); n];
            unsafe {
                T::exp(isa, got_exp.as_mut_ptr(), xs.as_ptr(), n);
                T::log(isa, got_log.as_mut_ptr(), ys.as_ptr(), n);
            }
            for (i, (&g, &w)) in got_exp.iter().zip(&want_exp).enumerate() {
                let (g, w) = (g.to_f64().unwrap_or(f64::NAN), w.to_f64().unwrap_or(f64::NAN));
                let d = ulps::<T>(g, w, 0.0);
                assert!(d <= max_ulps, "{} exp {isa}[{i}]: {g} vs {w} ({d} ulp)", T::NAME);
            }
            // ln crosses zero at 1; measure in units of ln's value at 1 there.
            for (i, (&g, &w)) in got_log.iter().zip(&want_log).enumerate() {
                let (g, w) = (g.to_f64().unwrap_or(f64::NAN), w.to_f64().unwrap_or(f64::NAN));
                let d = ulps::<T>(g, w, 1.0);
                assert!(d <= max_ulps, "{} log {isa}[{i}]: {g} vs {w} ({d} ulp)", T::NAME);
            }
        }
    }
}

fn check_special_values<T: FloatKernel>() {
    let specials: Vec<T> = [
        0.0,
        -0.0,
        -1.0,
        -1e30,
        1.0,
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        1e4,
        -1e4,
        1e-40,
        1e-310,
        -1e-40,
    ]
        .iter()
        .map(|&v| <T as NumCast>::from(v).unwrap_or_else(T::zero))
        .collect();
    let n = specials.len();
    let mut portable_exp = vec![T::zero(); n];
    unsafe { T::exp(Isa::None, portable_exp.as_mut_ptr(), specials.as_ptr(), n) };

    let mut isas = variants::<T>(OpClass::Transcendental);
    isas.push(Isa::None);
    for isa in isas {
        // Repeat the inputs so they land both in vector groups and in the tail.
        let src: Vec<T> = specials.iter().cycle().take(n * 5).copied().collect();
        let mut e = vec![T::zero(); src.len()];
        let mut l = vec![T::zero(); src.len()];
        unsafe {
            T::exp(isa, e.as_mut_ptr(), src.as_ptr(), src.len());
            T::log(isa, l.as_mut_ptr(), src.as_ptr(), src.len());
        }
        for (i, &x) in src.iter().enumerate() {
            let x = x.to_f64().unwrap_or(f64::NAN);
            let ei = e[i].to_f64().unwrap_or(f64::NAN);
            let li = l[i].to_f64().unwrap_or(f64::NAN);
            let pe = portable_exp[i % n].to_f64().unwrap_or(f64::NAN);
            let ctx = format!("{} {isa} x={x}", T::NAME);
            if x.is_nan() {
                assert!(ei.is_nan() && li.is_nan(), "{ctx}");
                continue;
            }
            // Saturation agrees with the portable clamp.
            assert!((ei - pe).abs() <= 1e-5 * pe.abs(), "{ctx}: exp {ei} vs {pe}");
            if x == 0.0 {
                assert_eq!(ei, 1.0, "{ctx}");
            }
            if x == 1.0 {
                assert_eq!(li, 0.0, "{ctx}");
            }
            if x <= 0.0 {
                assert!(li.is_nan(), "{ctx}: log must be NaN, got {li}");
            }
            if x == f64::INFINITY {
                assert_eq!(li, f64::INFINITY, "{ctx}");
            }
            // Subnormal inputs included.
            if x > 0.0 && x.is_finite() {
                let d = ulps::<T>(li, x.ln(), 1.0);
                assert!(d <= 4.0, "{ctx}: log {li} vs {} ({d} ulp)", x.ln());
            }
        }
    }
}

#[test]
fn test_exp_log_match_portable() {
    check_transcendental::<f32>(41, 4.0);
    check_transcendental::<f64>(42, 4.0);
}

#[test]
fn test_exp_log_special_values() {
    check_special_values::<f32>();
    check_special_values::<f64>();
}

#[test]
fn test_log_inverts_exp_on_every_variant() {
    let xs: Vec<f64> = (-200..=200).map(|i| <f64 as From<i32>>::from(i) * 0.173).collect();
    let mut isas = variants::<f64>(OpClass::Transcendental);
    isas.push(Isa::None);
    for isa in isas {
        let mut e = vec![0.0; xs.len()];
        let mut back = vec![0.0; xs.len()];
        unsafe {
            <f64 as FloatKernel>::exp(isa, e.as_mut_ptr(), xs.as_ptr(), xs.len());
            <f64 as FloatKernel>::log(isa, back.as_mut_ptr(), e.as_ptr(), e.len());
        }
        for (x, y) in xs.iter().zip(&back) {
            approx::assert_relative_eq!(*x, *y, max_relative = 1e-12, epsilon = 1e-13);
        }
    }
}

#[test]
fn test_host_dispatch_only_selects_supported_variants() {
    let dispatcher = numkern_simd::Dispatcher::host();
    for class in [OpClass::Arith, OpClass::Reduce, OpClass::Transcendental, OpClass::Linalg] {
        let isa = dispatcher.select_for::<f32>(class);
        assert!(CpuFeatures::host().supports(isa), "{isa}");
        let isa = dispatcher.select_for::<u8>(class);
        assert!(CpuFeatures::host().supports(isa), "{isa}");
    }
}
