// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Cryptographic imports: hashes, signature verification, and arithmetic on
//! runtime-assembled elliptic curves. Point coordinates travel as big-int
//! handles; results are written back through the destination handles.

use num_bigint::BigInt;
use wvm_shared::crypto::curve::CurveParams;
use wvm_shared::crypto::{hash, signature};
use wvm_shared::VMError;

use super::HostcallContext;

pub fn sha256(
    ctx: &mut HostcallContext<'_>,
    data_offset: i32,
    length: i32,
    result_offset: i32,
) -> i32 {
    let schedule = ctx.schedule();
    let gas = schedule.crypto_api_cost.sha256.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let data = match ctx.mem_load(data_offset, length) {
        Ok(data) => data,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let digest = hash::sha256(&data);
    if let Err(err) = ctx.mem_store(result_offset, &digest) {
        ctx.with_fault(err, ctx.crypto_should_fail());
        return 1;
    }
    0
}

pub fn keccak256(
    ctx: &mut HostcallContext<'_>,
    data_offset: i32,
    length: i32,
    result_offset: i32,
) -> i32 {
    let schedule = ctx.schedule();
    let gas = schedule.crypto_api_cost.keccak256.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let data = match ctx.mem_load(data_offset, length) {
        Ok(data) => data,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let digest = hash::keccak256(&data);
    if let Err(err) = ctx.mem_store(result_offset, &digest) {
        ctx.with_fault(err, ctx.crypto_should_fail());
        return 1;
    }
    0
}

pub fn ripemd160(
    ctx: &mut HostcallContext<'_>,
    data_offset: i32,
    length: i32,
    result_offset: i32,
) -> i32 {
    let schedule = ctx.schedule();
    let gas = schedule.crypto_api_cost.ripemd160.saturating_add(
        schedule
            .base_operation_cost
            .data_copy_per_byte
            .saturating_mul(length as u64),
    );
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let data = match ctx.mem_load(data_offset, length) {
        Ok(data) => data,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let digest = hash::ripemd160(&data);
    if let Err(err) = ctx.mem_store(result_offset, &digest) {
        ctx.with_fault(err, ctx.crypto_should_fail());
        return 1;
    }
    0
}

pub fn verify_bls(
    ctx: &mut HostcallContext<'_>,
    key_offset: i32,
    message_offset: i32,
    message_length: i32,
    sig_offset: i32,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.verify_bls;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let key = match ctx.mem_load(key_offset, signature::BLS_PUBLIC_KEY_LENGTH as i32) {
        Ok(key) => key,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    let per_byte = ctx.schedule().base_operation_cost.data_copy_per_byte;
    if ctx
        .use_gas(per_byte.saturating_mul(message_length as u64))
        .is_err()
    {
        return 1;
    }
    let message = match ctx.mem_load(message_offset, message_length) {
        Ok(message) => message,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let sig = match ctx.mem_load(sig_offset, signature::BLS_SIGNATURE_LENGTH as i32) {
        Ok(sig) => sig,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    match signature::verify_bls(&key, &message, &sig) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

pub fn verify_ed25519(
    ctx: &mut HostcallContext<'_>,
    key_offset: i32,
    message_offset: i32,
    message_length: i32,
    sig_offset: i32,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.verify_ed25519;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let key = match ctx.mem_load(key_offset, signature::ED25519_PUBLIC_KEY_LENGTH as i32) {
        Ok(key) => key,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    let per_byte = ctx.schedule().base_operation_cost.data_copy_per_byte;
    if ctx
        .use_gas(per_byte.saturating_mul(message_length as u64))
        .is_err()
    {
        return 1;
    }
    let message = match ctx.mem_load(message_offset, message_length) {
        Ok(message) => message,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let sig = match ctx.mem_load(sig_offset, signature::ED25519_SIGNATURE_LENGTH as i32) {
        Ok(sig) => sig,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    match signature::verify_ed25519(&key, &message, &sig) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

pub fn verify_secp256k1(
    ctx: &mut HostcallContext<'_>,
    key_offset: i32,
    key_length: i32,
    message_offset: i32,
    message_length: i32,
    sig_offset: i32,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.verify_secp256k1;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    if key_length != signature::SECP256K1_COMPRESSED_PUBLIC_KEY_LENGTH as i32
        && key_length != signature::SECP256K1_UNCOMPRESSED_PUBLIC_KEY_LENGTH as i32
    {
        ctx.with_fault(VMError::InvalidPublicKeySize, ctx.protocol_should_fail());
        return 1;
    }

    let key = match ctx.mem_load(key_offset, key_length) {
        Ok(key) => key,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    let per_byte = ctx.schedule().base_operation_cost.data_copy_per_byte;
    if ctx
        .use_gas(per_byte.saturating_mul(message_length as u64))
        .is_err()
    {
        return 1;
    }
    let message = match ctx.mem_load(message_offset, message_length) {
        Ok(message) => message,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    // The DER envelope declares its own length: byte 0 is the header, byte 1
    // the remaining buffer length.
    const SIG_HEADER_LENGTH: i32 = 2;
    let sig_header = match ctx.mem_load(sig_offset, SIG_HEADER_LENGTH) {
        Ok(header) => header,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let sig_length = sig_header[1] as i32 + SIG_HEADER_LENGTH;
    let sig = match ctx.mem_load(sig_offset, sig_length) {
        Ok(sig) => sig,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    match signature::verify_secp256k1(&key, &message, &sig) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn add_ec(
    ctx: &mut HostcallContext<'_>,
    x_result_handle: i32,
    y_result_handle: i32,
    ec_handle: i32,
    fst_point_x_handle: i32,
    fst_point_y_handle: i32,
    snd_point_x_handle: i32,
    snd_point_y_handle: i32,
) {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return;
        }
    };
    let operands = (|| -> Result<[BigInt; 6], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(x_result_handle)?.clone(),
            managed.get_big_int(y_result_handle)?.clone(),
            managed.get_big_int(fst_point_x_handle)?.clone(),
            managed.get_big_int(fst_point_y_handle)?.clone(),
            managed.get_big_int(snd_point_x_handle)?.clone(),
            managed.get_big_int(snd_point_y_handle)?.clone(),
        ])
    })();
    let [x_result, y_result, x1, y1, x2, y2] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            return;
        }
    };

    if ctx
        .use_gas_for_big_int_copies(&[
            &x_result, &y_result, &ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x1, &y1, &x2, &y2,
        ])
        .is_err()
    {
        return;
    }
    let (x3, y3) = ec.add(&x1, &y1, &x2, &y2);
    let managed = ctx.host.managed_types_mut();
    managed.set_big_int(x_result_handle, x3);
    managed.set_big_int(y_result_handle, y3);
}

pub fn double_ec(
    ctx: &mut HostcallContext<'_>,
    x_result_handle: i32,
    y_result_handle: i32,
    ec_handle: i32,
    point_x_handle: i32,
    point_y_handle: i32,
) {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return;
    }

    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return;
        }
    };
    let operands = (|| -> Result<[BigInt; 4], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(x_result_handle)?.clone(),
            managed.get_big_int(y_result_handle)?.clone(),
            managed.get_big_int(point_x_handle)?.clone(),
            managed.get_big_int(point_y_handle)?.clone(),
        ])
    })();
    let [x_result, y_result, x, y] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return;
        }
    };

    if ctx
        .use_gas_for_big_int_copies(&[
            &x_result, &y_result, &ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x, &y,
        ])
        .is_err()
    {
        return;
    }
    let (x3, y3) = ec.double(&x, &y);
    let managed = ctx.host.managed_types_mut();
    managed.set_big_int(x_result_handle, x3);
    managed.set_big_int(y_result_handle, y3);
}

pub fn is_on_curve_ec(
    ctx: &mut HostcallContext<'_>,
    ec_handle: i32,
    point_x_handle: i32,
    point_y_handle: i32,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }

    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return -1;
        }
    };
    let operands = (|| -> Result<[BigInt; 2], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(point_x_handle)?.clone(),
            managed.get_big_int(point_y_handle)?.clone(),
        ])
    })();
    let [x, y] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return -1;
        }
    };

    if ctx
        .use_gas_for_big_int_copies(&[&ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x, &y])
        .is_err()
    {
        return -1;
    }
    if ec.is_on_curve(&x, &y) {
        1
    } else {
        0
    }
}

pub fn scalar_base_mult_ec(
    ctx: &mut HostcallContext<'_>,
    x_result_handle: i32,
    y_result_handle: i32,
    ec_handle: i32,
    k_offset: i32,
    length: i32,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let k = match ctx.mem_load(k_offset, length) {
        Ok(k) => k,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let operands = (|| -> Result<[BigInt; 2], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(x_result_handle)?.clone(),
            managed.get_big_int(y_result_handle)?.clone(),
        ])
    })();
    let [x_result, y_result] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    if ctx
        .use_gas_for_big_int_copies(&[
            &ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x_result, &y_result,
        ])
        .is_err()
    {
        return 1;
    }
    let (x, y) = ec.scalar_base_mult(&k);
    let managed = ctx.host.managed_types_mut();
    managed.set_big_int(x_result_handle, x);
    managed.set_big_int(y_result_handle, y);
    0
}

#[allow(clippy::too_many_arguments)]
pub fn scalar_mult_ec(
    ctx: &mut HostcallContext<'_>,
    x_result_handle: i32,
    y_result_handle: i32,
    ec_handle: i32,
    point_x_handle: i32,
    point_y_handle: i32,
    k_offset: i32,
    length: i32,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let k = match ctx.mem_load(k_offset, length) {
        Ok(k) => k,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let operands = (|| -> Result<[BigInt; 4], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(x_result_handle)?.clone(),
            managed.get_big_int(y_result_handle)?.clone(),
            managed.get_big_int(point_x_handle)?.clone(),
            managed.get_big_int(point_y_handle)?.clone(),
        ])
    })();
    let [x_result, y_result, x, y] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    if ctx
        .use_gas_for_big_int_copies(&[
            &x_result, &y_result, &ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x, &y,
        ])
        .is_err()
    {
        return 1;
    }
    let (rx, ry) = ec.scalar_mult(&x, &y, &k);
    let managed = ctx.host.managed_types_mut();
    managed.set_big_int(x_result_handle, rx);
    managed.set_big_int(y_result_handle, ry);
    0
}

fn marshal_ec_with(
    ctx: &mut HostcallContext<'_>,
    point_x_handle: i32,
    point_y_handle: i32,
    ec_handle: i32,
    result_offset: i32,
    encode: impl FnOnce(&CurveParams, &BigInt, &BigInt) -> Vec<u8>,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let operands = (|| -> Result<[BigInt; 2], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(point_x_handle)?.clone(),
            managed.get_big_int(point_y_handle)?.clone(),
        ])
    })();
    let [x, y] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    if x.bits() > ec.bit_size as u64 || y.bits() > ec.bit_size as u64 {
        ctx.with_fault(VMError::BufNotBigEnough, ctx.crypto_should_fail());
        return 1;
    }

    if ctx
        .use_gas_for_big_int_copies(&[&ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x, &y])
        .is_err()
    {
        return 1;
    }
    let result = encode(&ec, &x, &y);
    if let Err(err) = ctx.mem_store(result_offset, &result) {
        ctx.with_fault(err, ctx.crypto_should_fail());
        // The required buffer length, so the contract can retry.
        return result.len() as i32;
    }
    0
}

pub fn marshal_ec(
    ctx: &mut HostcallContext<'_>,
    point_x_handle: i32,
    point_y_handle: i32,
    ec_handle: i32,
    result_offset: i32,
) -> i32 {
    marshal_ec_with(
        ctx,
        point_x_handle,
        point_y_handle,
        ec_handle,
        result_offset,
        |ec, x, y| ec.marshal(x, y),
    )
}

pub fn marshal_compressed_ec(
    ctx: &mut HostcallContext<'_>,
    point_x_handle: i32,
    point_y_handle: i32,
    ec_handle: i32,
    result_offset: i32,
) -> i32 {
    marshal_ec_with(
        ctx,
        point_x_handle,
        point_y_handle,
        ec_handle,
        result_offset,
        |ec, x, y| ec.marshal_compressed(x, y),
    )
}

fn unmarshal_ec_with(
    ctx: &mut HostcallContext<'_>,
    x_pair_handle: i32,
    y_pair_handle: i32,
    ec_handle: i32,
    data_offset: i32,
    length: i32,
    decode: impl FnOnce(&CurveParams, &[u8]) -> Option<(BigInt, BigInt)>,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let data = match ctx.mem_load(data_offset, length) {
        Ok(data) => data,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let operands = (|| -> Result<[BigInt; 2], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(x_pair_handle)?.clone(),
            managed.get_big_int(y_pair_handle)?.clone(),
        ])
    })();
    let [x_pair, y_pair] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };

    if ctx
        .use_gas_for_big_int_copies(&[&ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x_pair, &y_pair])
        .is_err()
    {
        return 1;
    }
    let (x, y) = match decode(&ec, &data) {
        Some(point) => point,
        None => {
            ctx.with_fault(VMError::InvalidArgument, ctx.crypto_should_fail());
            return 1;
        }
    };
    let managed = ctx.host.managed_types_mut();
    managed.set_big_int(x_pair_handle, x);
    managed.set_big_int(y_pair_handle, y);
    0
}

pub fn unmarshal_ec(
    ctx: &mut HostcallContext<'_>,
    x_pair_handle: i32,
    y_pair_handle: i32,
    ec_handle: i32,
    data_offset: i32,
    length: i32,
) -> i32 {
    unmarshal_ec_with(
        ctx,
        x_pair_handle,
        y_pair_handle,
        ec_handle,
        data_offset,
        length,
        |ec, data| ec.unmarshal(data),
    )
}

pub fn unmarshal_compressed_ec(
    ctx: &mut HostcallContext<'_>,
    x_pair_handle: i32,
    y_pair_handle: i32,
    ec_handle: i32,
    data_offset: i32,
    length: i32,
) -> i32 {
    unmarshal_ec_with(
        ctx,
        x_pair_handle,
        y_pair_handle,
        ec_handle,
        data_offset,
        length,
        |ec, data| ec.unmarshal_compressed(data),
    )
}

pub fn generate_key_ec(
    ctx: &mut HostcallContext<'_>,
    x_pub_key_handle: i32,
    y_pub_key_handle: i32,
    ec_handle: i32,
    result_offset: i32,
) -> i32 {
    let gas = ctx.schedule().crypto_api_cost.sha256;
    if ctx.use_gas(gas).is_err() {
        return 1;
    }

    let ec = match ctx.host.managed_types().get_elliptic_curve(ec_handle) {
        Ok(ec) => ec,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    let operands = (|| -> Result<[BigInt; 2], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(x_pub_key_handle)?.clone(),
            managed.get_big_int(y_pub_key_handle)?.clone(),
        ])
    })();
    let [x_pub, y_pub] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    if ctx
        .use_gas_for_big_int_copies(&[&ec.p, &ec.n, &ec.b, &ec.gx, &ec.gy, &x_pub, &y_pub])
        .is_err()
    {
        return 1;
    }

    let generated = ec.generate_key(ctx.host.rng_mut());
    let (private, x, y) = match generated {
        Ok(generated) => generated,
        Err(err) => {
            ctx.with_fault(err, ctx.crypto_should_fail());
            return 1;
        }
    };
    if let Err(err) = ctx.mem_store(result_offset, &private) {
        ctx.with_fault(err, ctx.crypto_should_fail());
        return private.len() as i32;
    }
    let managed = ctx.host.managed_types_mut();
    managed.set_big_int(x_pub_key_handle, x);
    managed.set_big_int(y_pub_key_handle, y);
    0
}

pub fn elliptic_curve_new(
    ctx: &mut HostcallContext<'_>,
    field_order_handle: i32,
    base_point_order_handle: i32,
    eq_constant_handle: i32,
    x_base_point_handle: i32,
    y_base_point_handle: i32,
    size_of_field: i32,
) -> i32 {
    let gas = ctx.schedule().big_int_api_cost.elliptic_curve_new;
    if ctx.use_gas(gas).is_err() {
        return -1;
    }

    let operands = (|| -> Result<[BigInt; 5], VMError> {
        let managed = ctx.host.managed_types();
        Ok([
            managed.get_big_int(field_order_handle)?.clone(),
            managed.get_big_int(base_point_order_handle)?.clone(),
            managed.get_big_int(eq_constant_handle)?.clone(),
            managed.get_big_int(x_base_point_handle)?.clone(),
            managed.get_big_int(y_base_point_handle)?.clone(),
        ])
    })();
    let [p, n, b, gx, gy] = match operands {
        Ok(operands) => operands,
        Err(err) => {
            ctx.with_fault(err, ctx.big_int_should_fail());
            return -1;
        }
    };

    let curve = CurveParams {
        p,
        n,
        b,
        gx,
        gy,
        bit_size: size_of_field as u32,
        name: "EC".to_string(),
    };
    ctx.host.managed_types_mut().put_elliptic_curve(&curve)
}
