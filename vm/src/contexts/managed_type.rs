// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::collections::HashMap;
use std::rc::Rc;

use num_bigint::BigInt;
use wvm_shared::crypto::curve::CurveParams;
use wvm_shared::VMError;

use super::StateStackable;

/// Copies of big integers at or below this byte length are not billed.
pub const MAX_BIG_INT_BYTE_LEN_FOR_NORMAL_COST: u64 = 32;

type BigIntMap = HashMap<i32, BigInt>;
type EllipticCurveMap = HashMap<i32, Rc<CurveParams>>;

/// The per-frame handle tables: opaque 32-bit handles naming big integers
/// (owned, mutable in place) and elliptic-curve parameter records (immutable,
/// shared). Handles never cross frames; a snapshot restore replaces the
/// tables wholesale.
pub struct ManagedTypeContext {
    big_int_values: BigIntMap,
    ec_values: EllipticCurveMap,
    big_int_state_stack: Vec<BigIntMap>,
    ec_state_stack: Vec<EllipticCurveMap>,
}

impl ManagedTypeContext {
    pub fn new() -> Self {
        Self {
            big_int_values: BigIntMap::new(),
            ec_values: EllipticCurveMap::new(),
            big_int_state_stack: Vec::new(),
            ec_state_stack: Vec::new(),
        }
    }

    fn clone_state(&self) -> (BigIntMap, EllipticCurveMap) {
        let big_ints = self
            .big_int_values
            .iter()
            .map(|(handle, value)| (*handle, value.clone()))
            .collect();
        let curves = self
            .ec_values
            .iter()
            .map(|(handle, curve)| (*handle, Rc::clone(curve)))
            .collect();
        (big_ints, curves)
    }

    /// Returns the value at `handle`, creating a zero entry if absent.
    pub fn get_big_int_or_create(&mut self, handle: i32) -> &mut BigInt {
        self.big_int_values.entry(handle).or_default()
    }

    pub fn get_big_int(&self, handle: i32) -> Result<&BigInt, VMError> {
        self.big_int_values
            .get(&handle)
            .ok_or(VMError::NoBigIntUnderThisHandle)
    }

    /// Replaces the value under an existing handle, preserving its identity
    /// as observed by the contract.
    pub fn set_big_int(&mut self, handle: i32, value: BigInt) {
        self.big_int_values.insert(handle, value);
    }

    /// Stores a fresh big integer under the first free handle at or above the
    /// current table size.
    pub fn put_big_int(&mut self, value: i64) -> i32 {
        let mut handle = self.big_int_values.len() as i32;
        while self.big_int_values.contains_key(&handle) {
            handle += 1;
        }
        self.big_int_values.insert(handle, BigInt::from(value));
        handle
    }

    pub fn get_elliptic_curve(&self, handle: i32) -> Result<Rc<CurveParams>, VMError> {
        self.ec_values
            .get(&handle)
            .cloned()
            .ok_or(VMError::NoEllipticCurveUnderThisHandle)
    }

    /// Stores a defensive copy of `curve` under the first free handle at or
    /// above the current table size.
    pub fn put_elliptic_curve(&mut self, curve: &CurveParams) -> i32 {
        let mut handle = self.ec_values.len() as i32;
        while self.ec_values.contains_key(&handle) {
            handle += 1;
        }
        self.ec_values.insert(handle, Rc::new(curve.clone()));
        handle
    }

    /// The billable copy weight of one value: its byte length, when above the
    /// free threshold.
    pub fn big_int_copy_weight(value: &BigInt) -> u64 {
        let byte_len = value.bits() / 8;
        if byte_len > MAX_BIG_INT_BYTE_LEN_FOR_NORMAL_COST {
            byte_len
        } else {
            0
        }
    }
}

impl Default for ManagedTypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStackable for ManagedTypeContext {
    fn init_state(&mut self) {
        self.big_int_values = BigIntMap::new();
        self.ec_values = EllipticCurveMap::new();
    }

    fn push_state(&mut self) {
        let (big_ints, curves) = self.clone_state();
        self.big_int_state_stack.push(big_ints);
        self.ec_state_stack.push(curves);
    }

    fn pop_set_active_state(&mut self) {
        if let Some(big_ints) = self.big_int_state_stack.pop() {
            self.big_int_values = big_ints;
        }
        if let Some(curves) = self.ec_state_stack.pop() {
            self.ec_values = curves;
        }
    }

    fn pop_discard(&mut self) {
        self.big_int_state_stack.pop();
        self.ec_state_stack.pop();
    }

    fn clear_state_stack(&mut self) {
        self.big_int_state_stack.clear();
        self.ec_state_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use wvm_shared::crypto::curve;

    use super::*;

    #[test]
    fn put_big_int_allocates_dense_handles() {
        let mut managed = ManagedTypeContext::new();
        let mut handles: Vec<i32> = (0..10).map(|i| managed.put_big_int(i)).collect();
        handles.sort_unstable();
        assert_eq!(handles, (0..10).collect::<Vec<i32>>());
    }

    #[test]
    fn put_big_int_scans_past_collisions() {
        let mut managed = ManagedTypeContext::new();
        // A sparse table: handle 1 occupied, 0 free.
        managed.set_big_int(1, BigInt::from(11));
        let handle = managed.put_big_int(22);
        assert_eq!(handle, 2);
        let handle = managed.put_big_int(33);
        assert_eq!(handle, 3);
    }

    #[test]
    fn get_big_int_or_create_installs_zero() {
        let mut managed = ManagedTypeContext::new();
        assert_eq!(
            managed.get_big_int(42),
            Err(VMError::NoBigIntUnderThisHandle)
        );
        assert_eq!(*managed.get_big_int_or_create(42), BigInt::from(0));
        assert_eq!(managed.get_big_int(42), Ok(&BigInt::from(0)));
    }

    #[test]
    fn handles_are_stable_within_a_frame() {
        let mut managed = ManagedTypeContext::new();
        let handle = managed.put_big_int(7);
        assert_eq!(managed.get_big_int(handle), Ok(&BigInt::from(7)));
        assert_eq!(managed.get_big_int(handle), Ok(&BigInt::from(7)));
        managed.set_big_int(handle, BigInt::from(8));
        assert_eq!(managed.get_big_int(handle), Ok(&BigInt::from(8)));
    }

    #[test]
    fn child_mutations_do_not_touch_the_parent() {
        let mut managed = ManagedTypeContext::new();
        let handle = managed.put_big_int(7);

        managed.push_state();
        managed.set_big_int(handle, BigInt::from(99));
        managed.pop_set_active_state();

        assert_eq!(managed.get_big_int(handle), Ok(&BigInt::from(7)));
    }

    #[test]
    fn curves_are_defensively_copied() {
        let mut managed = ManagedTypeContext::new();
        let mut params = curve::p256();
        let handle = managed.put_elliptic_curve(&params);

        // Mutating the originating record must not alter the stored curve.
        params.bit_size = 1;
        params.name.clear();

        let stored = managed.get_elliptic_curve(handle).unwrap();
        assert_eq!(stored.bit_size, 256);
        assert_eq!(stored.name, "P-256");
    }

    #[test]
    fn missing_curve_handle_is_an_error() {
        let managed = ManagedTypeContext::new();
        assert!(matches!(
            managed.get_elliptic_curve(0),
            Err(VMError::NoEllipticCurveUnderThisHandle)
        ));
    }

    #[test]
    fn copy_weight_is_free_up_to_the_threshold() {
        let small = BigInt::from(1) << 255;
        assert_eq!(ManagedTypeContext::big_int_copy_weight(&small), 0);
        let large = BigInt::from(1) << 264;
        assert_eq!(ManagedTypeContext::big_int_copy_weight(&large), 33);
    }
}
