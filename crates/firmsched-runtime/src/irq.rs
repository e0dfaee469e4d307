//! Critical-section contract placeholders.
//!
//! On the single-threaded host simulation these are no-ops, but every code
//! path that would need a real interrupt-capable implementation to disable
//! interrupts still brackets the region with [`IrqGuard`], so that swapping
//! in such an implementation later only means replacing this one type.

/// RAII critical-section guard. Disables interrupts on construction
/// (a no-op here) and re-enables them on drop.
pub struct IrqGuard {
    _private: (),
}

impl IrqGuard {
    #[inline]
    pub fn acquire() -> Self {
        irq_disable();
        Self { _private: () }
    }
}

impl Drop for IrqGuard {
    #[inline]
    fn drop(&mut self) {
        irq_enable();
    }
}

#[inline]
pub fn irq_disable() {}

#[inline]
pub fn irq_enable() {}
