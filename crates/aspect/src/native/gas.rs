//! Gas schedule of the aspect native contract.
use super::NativeError;

/// Charged on every native contract call.
pub const NATIVE_BASE_GAS: u64 = 1_000;
/// Charged per registry read.
pub const STORE_READ_GAS: u64 = 200;
/// Charged per registry write.
pub const STORE_WRITE_GAS: u64 = 5_000;
/// Charged per byte written to the registry.
pub const STORE_BYTE_GAS: u64 = 20;
/// Charged per byte of stored aspect code.
pub const CODE_BYTE_GAS: u64 = 200;

/// Tracks the gas of one native contract call.
///
/// Gas charged before a failure stays charged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    remaining: u64,
}

impl GasMeter {
    /// Creates a meter with `limit` gas.
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    /// Gas left.
    #[inline]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Gas spent.
    #[inline]
    pub const fn spent(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Charges `gas`, failing with all gas consumed if not enough is left.
    pub fn charge(&mut self, gas: u64) -> Result<(), NativeError> {
        match self.remaining.checked_sub(gas) {
            Some(remaining) => {
                self.remaining = remaining;
                Ok(())
            }
            None => {
                self.remaining = 0;
                Err(NativeError::OutOfGas)
            }
        }
    }

    /// Charges a registry write of `len` bytes.
    pub fn charge_write(&mut self, len: usize) -> Result<(), NativeError> {
        let bytes = (len as u64).saturating_mul(STORE_BYTE_GAS);
        self.charge(STORE_WRITE_GAS.saturating_add(bytes))
    }

    /// Records the gas left by a nested call that was given [`GasMeter::remaining`].
    pub fn settle(&mut self, gas_left: u64) {
        self.remaining = gas_left.min(self.remaining);
    }
}
