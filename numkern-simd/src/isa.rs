//! Instruction-set selectors.
//!
//! [`Isa`] names a kernel variant at run time; each variant has a zero-sized
//! tag type implementing [`IsaTag`] that selects the matching lane
//! implementation at compile time.

use std::fmt;

/// Kernel variant, ordered from portable to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Isa {
    /// Portable scalar code, always available.
    None,
    Sse,
    Sse2,
    Sse3,
    Sse41,
    Sse41Fma,
    Avx,
    AvxFma,
    Avx2,
    Avx2Fma,
}

impl Isa {
    pub const ALL: [Isa; 10] = [
        Isa::None,
        Isa::Sse,
        Isa::Sse2,
        Isa::Sse3,
        Isa::Sse41,
        Isa::Sse41Fma,
        Isa::Avx,
        Isa::AvxFma,
        Isa::Avx2,
        Isa::Avx2Fma,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Isa::None => "none",
            Isa::Sse => "sse",
            Isa::Sse2 => "sse2",
            Isa::Sse3 => "sse3",
            Isa::Sse41 => "sse4.1",
            Isa::Sse41Fma => "sse4.1+fma",
            Isa::Avx => "avx",
            Isa::AvxFma => "avx+fma",
            Isa::Avx2 => "avx2",
            Isa::Avx2Fma => "avx2+fma",
        }
    }

    /// Whether the variant fuses multiply-add.
    pub const fn has_fma(self) -> bool {
        matches!(self, Isa::Sse41Fma | Isa::AvxFma | Isa::Avx2Fma)
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time instruction-set selector.
pub trait IsaTag: Copy + Default + Send + Sync + 'static {
    const ISA: Isa;

    /// Run `f` inside a function compiled with this instruction set enabled,
    /// so inlined lane operations are emitted with the matching encoding.
    ///
    /// # Safety
    /// The CPU must support [`Self::ISA`](IsaTag::ISA).
    unsafe fn vectorize<R, F: FnOnce() -> R>(f: F) -> R;
}

/// Portable scalar lanes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scalar;

impl IsaTag for Scalar {
    const ISA: Isa = Isa::None;

    #[inline(always)]
    unsafe fn vectorize<R, F: FnOnce() -> R>(f: F) -> R {
        f()
    }
}

macro_rules! define_tags {
    ($($(#[$doc:meta])* $tag:ident => $features:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $tag;

            impl IsaTag for $tag {
                const ISA: Isa = Isa::$tag;

                #[inline(always)]
                unsafe fn vectorize<R, F: FnOnce() -> R>(f: F) -> R {
                    #[cfg_attr(target_arch = "x86_64", target_feature(enable = $features))]
                    #[inline]
                    unsafe fn enabled<R, F: FnOnce() -> R>(f: F) -> R {
                        f()
                    }
                    enabled(f)
                }
            }
        )*
    };
}

define_tags! {
    /// 128-bit `f32` lanes.
    Sse => "sse",
    /// 128-bit lanes for every element type.
    Sse2 => "sse2",
    /// SSE2 with horizontal float adds.
    Sse3 => "sse3",
    /// SSE2 plus packed rounding, 8/32-bit min/max and 32-bit multiply.
    Sse41 => "sse4.1",
    Sse41Fma => "sse4.1,fma",
    /// 256-bit float lanes; integer work stays on 128-bit halves.
    Avx => "avx",
    AvxFma => "avx,fma",
    /// 256-bit lanes for every element type.
    Avx2 => "avx2",
    Avx2Fma => "avx2,fma",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_isa_matches_variant() {
        assert_eq!(Scalar::ISA, Isa::None);
        assert_eq!(Sse41Fma::ISA, Isa::Sse41Fma);
        assert_eq!(Avx2::ISA, Isa::Avx2);
    }

    #[test]
    fn test_order_and_names() {
        assert!(Isa::Avx2Fma > Isa::Avx);
        assert!(Isa::Sse < Isa::Sse2);
        assert_eq!(Isa::Sse41.to_string(), "sse4.1");
        assert!(Isa::AvxFma.has_fma());
        assert!(!Isa::Avx2.has_fma());
    }

    #[test]
    fn test_scalar_vectorize_runs_closure() {
        let v = unsafe { Scalar::vectorize(|| 21 * 2) };
        assert_eq!(v, 42);
    }
}
