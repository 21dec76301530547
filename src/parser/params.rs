//! Parameter collection for CSI and DCS sequences.
//!
//! CSI sequences carry numeric parameters separated by semicolons.
//! Parameters can be:
//! - Empty (defaults to 0 or 1 depending on context)
//! - Single numbers, saturating at `u16::MAX`
//! - Colon separated subparameters (flattened into the main list)

use std::fmt;

/// Maximum number of parameters accepted in one sequence.
///
/// A sequence that carries more is treated as malformed and ignored.
pub const MAX_PARAMS: usize = 32;

#[derive(Clone, PartialEq, Eq)]
pub struct Params {
    values: [u16; MAX_PARAMS],
    len: usize,
    current: u16,
    /// A parameter slot is open (a digit or separator has been seen)
    open: bool,
    overflowed: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

impl Params {
    pub fn new() -> Self {
        Params {
            values: [0; MAX_PARAMS],
            len: 0,
            current: 0,
            open: false,
            overflowed: false,
        }
    }

    /// Accumulate one decimal digit into the current parameter
    pub fn push_digit(&mut self, digit: u8) {
        self.current = self
            .current
            .saturating_mul(10)
            .saturating_add((digit - b'0') as u16);
        self.open = true;
    }

    /// Close the current parameter and open the next one.
    ///
    /// Returns false once the parameter limit has been exceeded.
    pub fn separator(&mut self) -> bool {
        self.close();
        self.open = true;
        !self.overflowed
    }

    /// Close the last parameter, if any.
    ///
    /// Returns false if the sequence carried too many parameters.
    pub fn finish(&mut self) -> bool {
        if self.open {
            self.close();
        }
        !self.overflowed
    }

    fn close(&mut self) {
        if self.len < MAX_PARAMS {
            self.values[self.len] = self.current;
            self.len += 1;
        } else {
            self.overflowed = true;
        }
        self.current = 0;
        self.open = false;
    }

    /// Append a complete parameter value
    pub fn push(&mut self, value: u16) {
        if self.len < MAX_PARAMS {
            self.values[self.len] = value;
            self.len += 1;
        } else {
            self.overflowed = true;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        if index < self.len {
            Some(self.values[index])
        } else {
            None
        }
    }

    pub fn get_or(&self, index: usize, default: u16) -> u16 {
        self.get(index).unwrap_or(default)
    }

    /// Get a parameter, treating both a missing value and 0 as `default`
    pub fn get_nonzero_or(&self, index: usize, default: u16) -> u16 {
        match self.get(index) {
            Some(0) | None => default,
            Some(v) => v,
        }
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.values[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.current = 0;
        self.open = false;
        self.overflowed = false;
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &[u8]) -> Params {
        let mut params = Params::new();
        for &b in input {
            match b {
                b'0'..=b'9' => params.push_digit(b),
                b';' | b':' => {
                    params.separator();
                }
                _ => {}
            }
        }
        params.finish();
        params
    }

    #[test]
    fn test_params_basic() {
        let params = collect(b"1;2;3");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0), Some(1));
        assert_eq!(params.get(1), Some(2));
        assert_eq!(params.get(2), Some(3));
        assert_eq!(params.get(3), None);
    }

    #[test]
    fn test_params_empty_slots() {
        assert!(collect(b"").is_empty());
        assert_eq!(collect(b";5").as_slice(), &[0, 5]);
        assert_eq!(collect(b"7;").as_slice(), &[7, 0]);
    }

    #[test]
    fn test_params_defaults() {
        let params = collect(b"0");
        assert_eq!(params.get_or(0, 1), 0);
        assert_eq!(params.get_nonzero_or(0, 5), 5);
        assert_eq!(params.get_nonzero_or(3, 9), 9);
    }

    #[test]
    fn test_params_saturate() {
        let params = collect(b"99999999");
        assert_eq!(params.get(0), Some(u16::MAX));
    }

    #[test]
    fn test_params_overflow() {
        let mut params = Params::new();
        for _ in 0..MAX_PARAMS - 1 {
            params.push_digit(b'1');
            assert!(params.separator());
        }
        params.push_digit(b'1');
        assert!(params.finish());
        assert_eq!(params.len(), MAX_PARAMS);

        params.clear();
        for _ in 0..MAX_PARAMS {
            params.push_digit(b'1');
            assert!(params.separator());
        }
        params.push_digit(b'1');
        assert!(!params.finish());
        assert!(params.is_overflowed());
    }

    #[test]
    fn test_subparams_flatten() {
        let params = collect(b"38:2:255:128:64");
        assert_eq!(params.as_slice(), &[38, 2, 255, 128, 64]);
    }
}
