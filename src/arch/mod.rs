// src/arch/mod.rs

//! Architecture-specific abstractions.
//!
//! The kernel targets 32-bit protected-mode x86 exclusively (see
//! `i686-rhythmos.json`); the `#[cfg(target_arch = "x86")]` gate exists so a
//! second architecture could be added the way the teacher's build.rs already
//! validates `x86`/`arm`/`riscv32` generically, even though only one backend
//! is wired up today.

#[cfg(target_arch = "x86")]
pub mod x86;

#[cfg(target_arch = "x86")]
pub use self::x86::*;

#[cfg(target_arch = "x86")]
/// Architecture-specific CPU implementation.
pub type ArchCpu = self::x86::X86Cpu;

/// Trait for CPU-specific operations.
pub trait Cpu {
    /// Halt the CPU until the next interrupt.
    fn halt();

    /// Disable interrupts.
    fn disable_interrupts();

    /// Enable interrupts.
    fn enable_interrupts();

    /// Check if interrupts are enabled.
    fn are_interrupts_enabled() -> bool;
}

// `read_timestamp` and `write_debug_byte` are re-exported from `x86` above
// (the hardware timestamp counter and debug-serial sink are both provided
// there); no architecture-independent fallback exists since this kernel
// only ever targets `i686-rhythmos.json`.
