//! Runtime CPU capability probe.

use std::sync::OnceLock;

use crate::isa::Isa;

/// Snapshot of the instruction-set extensions usable by this process.
///
/// A flag is only set when both the CPU and the operating system support the
/// extension (`is_x86_feature_detected!` checks XGETBV for the AVX state).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CpuFeatures {
    pub sse: bool,
    pub sse2: bool,
    pub sse3: bool,
    pub sse41: bool,
    pub avx: bool,
    pub avx2: bool,
    pub fma: bool,
}

impl CpuFeatures {
    /// No extension available: every dispatch selects the portable variant.
    pub const fn none() -> Self {
        Self {
            sse: false,
            sse2: false,
            sse3: false,
            sse41: false,
            avx: false,
            avx2: false,
            fma: false,
        }
    }

    /// Query the hardware.
    ///
    /// Always [`CpuFeatures::none`] on non-x86_64 targets or when the `simd`
    /// feature is disabled.
    pub fn detect() -> Self {
        #[cfg(all(target_arch = "x86_64", feature = "simd"))]
        {
            Self {
                sse: is_x86_feature_detected!("sse"),
                sse2: is_x86_feature_detected!("sse2"),
                sse3: is_x86_feature_detected!("sse3"),
                sse41: is_x86_feature_detected!("sse4.1"),
                avx: is_x86_feature_detected!("avx"),
                avx2: is_x86_feature_detected!("avx2"),
                fma: is_x86_feature_detected!("fma"),
            }
        }
        #[cfg(not(all(target_arch = "x86_64", feature = "simd")))]
        {
            Self::none()
        }
    }

    /// Process-wide snapshot, detected on first use.
    pub fn host() -> &'static CpuFeatures {
        static HOST: OnceLock<CpuFeatures> = OnceLock::new();
        HOST.get_or_init(|| {
            let features = Self::detect();
            tracing::debug!(
                sse = features.sse,
                sse2 = features.sse2,
                sse3 = features.sse3,
                sse41 = features.sse41,
                avx = features.avx,
                avx2 = features.avx2,
                fma = features.fma,
                "detected cpu features"
            );
            features
        })
    }

    /// The features `isa` needs, including the extensions it builds on.
    pub const fn from_isa(isa: Isa) -> Self {
        let level = match isa {
            Isa::None => 0,
            Isa::Sse => 1,
            Isa::Sse2 => 2,
            Isa::Sse3 => 3,
            Isa::Sse41 | Isa::Sse41Fma => 4,
            Isa::Avx | Isa::AvxFma => 5,
            Isa::Avx2 | Isa::Avx2Fma => 6,
        };
        Self {
            sse: level >= 1,
            sse2: level >= 2,
            sse3: level >= 3,
            sse41: level >= 4,
            avx: level >= 5,
            avx2: level >= 6,
            fma: matches!(isa, Isa::Sse41Fma | Isa::AvxFma | Isa::Avx2Fma),
        }
    }

    /// Keep only the features that are also required by `isa`.
    ///
    /// Used to cap dispatch below what the hardware offers.
    pub const fn restrict_to(self, isa: Isa) -> Self {
        let cap = Self::from_isa(isa);
        self.intersect(cap)
    }

    pub const fn intersect(self, other: Self) -> Self {
        Self {
            sse: self.sse && other.sse,
            sse2: self.sse2 && other.sse2,
            sse3: self.sse3 && other.sse3,
            sse41: self.sse41 && other.sse41,
            avx: self.avx && other.avx,
            avx2: self.avx2 && other.avx2,
            fma: self.fma && other.fma,
        }
    }

    /// `true` when every feature of `other` is present in `self`.
    pub const fn contains(self, other: Self) -> bool {
        (self.sse || !other.sse)
            && (self.sse2 || !other.sse2)
            && (self.sse3 || !other.sse3)
            && (self.sse41 || !other.sse41)
            && (self.avx || !other.avx)
            && (self.avx2 || !other.avx2)
            && (self.fma || !other.fma)
    }

    /// `true` when a kernel variant compiled for `isa` may run.
    pub const fn supports(self, isa: Isa) -> bool {
        self.contains(Self::from_isa(isa))
    }

    pub const fn is_support_sse(self) -> bool {
        self.sse
    }

    pub const fn is_support_sse2(self) -> bool {
        self.sse2
    }

    pub const fn is_support_sse3(self) -> bool {
        self.sse3
    }

    pub const fn is_support_sse41(self) -> bool {
        self.sse41
    }

    pub const fn is_support_avx(self) -> bool {
        self.avx
    }

    pub const fn is_support_avx2(self) -> bool {
        self.avx2
    }

    pub const fn is_support_fma(self) -> bool {
        self.fma
    }
}

pub fn is_support_sse() -> bool {
    CpuFeatures::host().sse
}

pub fn is_support_sse2() -> bool {
    CpuFeatures::host().sse2
}

pub fn is_support_sse3() -> bool {
    CpuFeatures::host().sse3
}

pub fn is_support_sse41() -> bool {
    CpuFeatures::host().sse41
}

pub fn is_support_avx() -> bool {
    CpuFeatures::host().avx
}

pub fn is_support_avx2() -> bool {
    CpuFeatures::host().avx2
}

pub fn is_support_fma() -> bool {
    CpuFeatures::host().fma
}
