//! Bit-packed gate states - one bit per gate, 8 gates per byte
//!
//! Gate `i` lives in bit `i % 8` of byte `i / 8`.

/// Packed boolean state vector for one page
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateBits {
    bytes: Vec<u8>,
    len: usize,
}

/// Bytes needed to hold `gates` state bits
#[inline]
pub const fn state_bytes(gates: usize) -> usize {
    (gates + 7) / 8
}

impl StateBits {
    /// All-false state vector for `len` gates
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; state_bytes(len)],
            len,
        }
    }

    /// Number of gates (bits) held
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Packed byte view
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Read bit `index`. Caller guarantees `index < len`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "state index {} out of {}", index, self.len);
        self.bytes[index >> 3] & (1 << (index & 7)) != 0
    }

    /// Write bit `index`. Caller guarantees `index < len`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len, "state index {} out of {}", index, self.len);
        let mask = 1u8 << (index & 7);
        let byte = &mut self.bytes[index >> 3];
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Clear every bit
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Iterate states in gate order
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Write `count` bits taken from a packed source starting at bit `offset`
    ///
    /// Bits beyond the source end read as false.
    pub fn load_packed(&mut self, source: &[u8], offset: usize) {
        if offset & 7 == 0 {
            let tail = source.get(offset >> 3..).unwrap_or(&[]);
            let available = tail.len().min(self.bytes.len());
            self.bytes[..available].copy_from_slice(&tail[..available]);
            self.bytes[available..].fill(0);
            self.mask_tail();
            return;
        }
        for i in 0..self.len {
            let bit = offset + i;
            let value = source
                .get(bit >> 3)
                .map_or(false, |b| b & (1 << (bit & 7)) != 0);
            self.set(i, value);
        }
    }

    /// Pack the states into `target` starting at bit `offset`
    pub fn store_packed(&self, target: &mut [u8], offset: usize) {
        for i in 0..self.len {
            let bit = offset + i;
            let mask = 1u8 << (bit & 7);
            if self.get(i) {
                target[bit >> 3] |= mask;
            } else {
                target[bit >> 3] &= !mask;
            }
        }
    }

    // Bits past `len` in the last byte must stay clear so byte views compare equal.
    fn mask_tail(&mut self) {
        let used = self.len & 7;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1u8 << used) - 1;
            }
        }
    }
}
