use crate::*;

fn samples() -> Vec<Value> {
    vec![
        Value::Null,
        Value::Int32(0),
        Value::Int32(-1),
        Value::Int32(i32::MIN),
        Value::UInt32(u32::MAX),
        Value::Int64(i64::MIN),
        Value::UInt64(0),
        Value::UInt64(u64::MAX),
        Value::Float32(-0.5),
        Value::Float64(std::f64::consts::PI),
        Value::String(String::new()),
        Value::String("Source reference is not valid.".into()),
        Value::String("ünïcødé ✓".into()),
        Value::Binary(Vec::new()),
        Value::Binary(vec![0, 1, 2, 0xFF]),
    ]
}

// ============================================================================
//  ROUNDTRIP
// ============================================================================

#[test]
fn test_roundtrip_every_variant() -> Result<()> {
    for val in samples() {
        let bytes = encode(&val)?;
        let (decoded, consumed) = decode(&bytes)?;
        assert_eq!(decoded, val);
        assert_eq!(consumed, bytes.len(), "consumed all bytes of {:?}", val);
    }
    Ok(())
}

#[test]
fn test_tag_is_first_byte() -> Result<()> {
    for val in samples() {
        let bytes = encode(&val)?;
        assert!(!bytes.is_empty());
        assert_eq!(bytes[0], val.type_tag() as u8);
    }
    Ok(())
}

#[test]
fn test_null_is_exactly_the_tag() -> Result<()> {
    assert_eq!(encode(&Value::Null)?, vec![TypeTag::Null as u8]);
    Ok(())
}

#[test]
fn test_fixed_width_little_endian() -> Result<()> {
    let bytes = encode(&Value::UInt32(0x0102_0304))?;
    assert_eq!(bytes, vec![TypeTag::UInt32 as u8, 0x04, 0x03, 0x02, 0x01]);

    let bytes = encode(&Value::Int64(-2))?;
    assert_eq!(bytes.len(), 9);
    assert_eq!(&bytes[1..], &(-2i64).to_le_bytes());
    Ok(())
}

#[test]
fn test_string_length_prefix() -> Result<()> {
    let bytes = encode(&Value::from("abc"))?;
    assert_eq!(bytes, vec![TypeTag::String as u8, 3, 0, 0, 0, b'a', b'b', b'c']);
    Ok(())
}

#[test]
fn test_decode_reports_consumed_with_trailing_bytes() -> Result<()> {
    let mut bytes = encode(&Value::UInt64(7))?;
    bytes.extend_from_slice(&[0xAA, 0xBB]);
    let (val, consumed) = decode(&bytes)?;
    assert_eq!(val, Value::UInt64(7));
    assert_eq!(consumed, 9);
    Ok(())
}

#[test]
fn test_float_bits_preserved() -> Result<()> {
    let bytes = encode(&Value::Float32(f32::NEG_INFINITY))?;
    let (val, _) = decode(&bytes)?;
    assert_eq!(val.as_f32().map(f32::to_bits), Some(f32::NEG_INFINITY.to_bits()));

    let bytes = encode(&Value::Float64(f64::NAN))?;
    let (val, _) = decode(&bytes)?;
    assert!(val.as_f64().is_some_and(f64::is_nan));
    Ok(())
}

// ============================================================================
//  TRUNCATION & MALFORMED INPUT
// ============================================================================

#[test]
fn test_every_prefix_is_truncated() -> Result<()> {
    for val in samples() {
        let bytes = encode(&val)?;
        for cut in 0..bytes.len() {
            match decode(&bytes[..cut]) {
                Err(Error::TruncatedMessage { .. }) => {}
                other => panic!("prefix {} of {:?} decoded as {:?}", cut, val, other),
            }
        }
    }
    Ok(())
}

#[test]
fn test_empty_buffer_is_truncated() {
    assert!(matches!(decode(&[]), Err(Error::TruncatedMessage { needed: 1, available: 0 })));
}

#[test]
fn test_unknown_tag() {
    assert_eq!(decode(&[0x7F, 0, 0, 0]), Err(Error::UnknownType(0x7F)));
}

#[test]
fn test_oversized_length_does_not_overread() {
    // Claims 1000 bytes, provides 2.
    let bytes = [TypeTag::Binary as u8, 0xE8, 0x03, 0x00, 0x00, 1, 2];
    assert_eq!(
        decode(&bytes),
        Err(Error::TruncatedMessage { needed: 1000, available: 2 })
    );
}

#[test]
fn test_invalid_utf8() {
    let bytes = [TypeTag::String as u8, 2, 0, 0, 0, 0xC3, 0x28];
    assert_eq!(decode(&bytes), Err(Error::InvalidUtf8));
}

// ============================================================================
//  TYPED READS & LISTS
// ============================================================================

#[test]
fn test_typed_read_mismatch() -> Result<()> {
    let bytes = encode(&Value::Int32(5))?;
    let mut dec = Decoder::new(&bytes);
    assert_eq!(
        dec.u64(),
        Err(Error::TypeMismatch { expected: TypeTag::UInt64, found: TypeTag::Int32 })
    );
    // A failed typed read leaves the cursor in place.
    assert_eq!(dec.s32()?, 5);
    Ok(())
}

#[test]
fn test_value_list() -> Result<()> {
    let vals = vec![Value::UInt64(0), Value::UInt64(1001), Value::UInt32(33)];
    let mut enc = Encoder::new();
    enc.values(&vals)?;
    enc.values(&[])?;
    let bytes = enc.into_bytes();

    let mut dec = Decoder::new(&bytes);
    assert_eq!(dec.values()?, vals);
    assert_eq!(dec.values()?, Vec::<Value>::new());
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

#[test]
fn test_value_list_count_larger_than_buffer() {
    let bytes = [0xFF, 0xFF, 0xFF, 0x7F, TypeTag::Null as u8];
    let mut dec = Decoder::new(&bytes);
    assert!(matches!(dec.values(), Err(Error::TruncatedMessage { .. })));
}

#[test]
fn test_skip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.str("skipped")?;
    enc.null();
    enc.f64(1.5);
    let bytes = enc.into_bytes();

    let mut dec = Decoder::new(&bytes);
    dec.skip()?;
    dec.skip()?;
    assert_eq!(dec.f64()?, 1.5);
    Ok(())
}

#[test]
fn test_validate_types() {
    let vals = vec![Value::UInt64(1), Value::String("x".into())];
    assert!(validate_types(&vals, &[TypeTag::UInt64, TypeTag::String]).is_ok());
    assert_eq!(
        validate_types(&vals, &[TypeTag::UInt64]),
        Err(Error::CountMismatch { expected: 1, found: 2 })
    );
    assert_eq!(
        validate_types(&vals, &[TypeTag::String, TypeTag::String]),
        Err(Error::TypeMismatch { expected: TypeTag::String, found: TypeTag::UInt64 })
    );
}
