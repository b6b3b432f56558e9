use super::*;

#[test]
fn test_accessors() {
    let value = PlistValue::Integer(42);
    assert_eq!(value.as_i64(), Some(42));
    assert_eq!(value.as_f64(), Some(42.0));
    assert_eq!(value.as_str(), None);
    assert_eq!(value.as_bool(), None);
}

#[test]
fn test_truthiness() {
    assert!(PlistValue::Real(1.0).is_truthy());
    assert!(PlistValue::Integer(2).is_truthy());
    assert!(PlistValue::Boolean(true).is_truthy());
    assert!(!PlistValue::Real(0.0).is_truthy());
    assert!(!PlistValue::Real(f64::NAN).is_truthy());
    assert!(!PlistValue::Integer(0).is_truthy());
    assert!(!PlistValue::Boolean(false).is_truthy());
    assert!(!PlistValue::String(String::new()).is_truthy());
}

#[test]
fn test_whole_units_truncate() {
    assert_eq!(PlistValue::Real(12.9).as_whole_u64(), Some(12));
    assert_eq!(PlistValue::Real(-3.0).as_whole_u64(), Some(0));
    assert_eq!(PlistValue::Integer(-1).as_whole_u64(), Some(0));
    assert_eq!(PlistValue::String("41.5".into()).as_whole_u64(), Some(41));
    assert_eq!(PlistValue::Boolean(true).as_whole_u64(), None);
}

#[test]
fn test_dict_builder() {
    let dict = DictBuilder::new()
        .insert("Content-Location", "http://example.com/a.mp4")
        .insert("Start-Position", 0i64)
        .build();

    assert_eq!(
        dict.get("Content-Location").and_then(PlistValue::as_str),
        Some("http://example.com/a.mp4")
    );
    assert_eq!(dict.get("Start-Position").and_then(PlistValue::as_i64), Some(0));
}

#[test]
fn test_encode_empty_dict() {
    let bytes = encode(&PlistValue::empty_dict()).unwrap();
    assert!(bytes.starts_with(b"bplist00"));
    assert_eq!(decode(&bytes).unwrap(), PlistValue::empty_dict());
}

#[test]
fn test_encode_is_deterministic() {
    let build = || {
        DictBuilder::new()
            .insert("zeta", 1i64)
            .insert("alpha", "x")
            .insert("mid", vec![1u8, 2, 3])
            .build()
    };
    assert_eq!(encode(&build()).unwrap(), encode(&build()).unwrap());
}

#[test]
fn test_mixed_document() {
    let value = DictBuilder::new()
        .insert("rate", 1.0)
        .insert("position", 12.5)
        .insert("duration", 300i64)
        .insert("readyToPlay", true)
        .insert("title", "caf\u{e9}")
        .insert(
            "loadedTimeRanges",
            PlistValue::Array(vec![
                DictBuilder::new()
                    .insert("start", 0.0)
                    .insert("duration", 60.0)
                    .build(),
            ]),
        )
        .insert("big", u64::MAX)
        .insert("negative", -5i64)
        .build();

    let decoded = decode(&encode(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_long_collections_use_extended_length() {
    let items: Vec<PlistValue> = (0..40i64).map(PlistValue::Integer).collect();
    let value = PlistValue::Array(items);
    let decoded = decode(&encode(&value).unwrap()).unwrap();
    assert_eq!(decoded.as_array().map(<[PlistValue]>::len), Some(40));
}

#[test]
fn test_many_objects_use_wide_refs() {
    let value: PlistValue = PlistValue::Array(
        (0..300).map(|i| PlistValue::String(format!("s{i}"))).collect(),
    );
    let decoded = decode(&encode(&value).unwrap()).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_decode_rejects_bad_magic() {
    let mut bytes = encode(&PlistValue::empty_dict()).unwrap();
    bytes[0] = b'x';
    assert!(matches!(decode(&bytes), Err(PlistDecodeError::InvalidMagic)));
}

#[test]
fn test_decode_rejects_truncated() {
    assert!(matches!(
        decode(b"bplist00"),
        Err(PlistDecodeError::BufferTooSmall { .. })
    ));
}

#[test]
fn test_decode_rejects_bad_reference() {
    let mut bytes = encode(&PlistValue::Integer(1)).unwrap();
    let len = bytes.len();
    // root object index points past the table
    bytes[len - 9] = 5;
    assert!(matches!(
        decode(&bytes),
        Err(PlistDecodeError::InvalidReference(5))
    ));
}
