use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::time::Duration;

use logline::{
    buffer, rfc3339_time_encoder, seconds_duration_encoder, ArrayEncoder, Encoder, EncodeError,
    EncoderConfig, Entry, EntryCaller, Field, JsonEncoder, Level, ObjectEncoder,
};

fn bare_config() -> EncoderConfig {
    EncoderConfig::default()
}

fn encode(cfg: EncoderConfig, entry: &Entry, fields: &[Field]) -> String {
    let enc = JsonEncoder::new(cfg);
    let buf = enc.encode_entry(entry, fields).unwrap();
    let out = buf.as_str_lossy().into_owned();
    buffer::put(buf);
    out
}

fn minimal_entry() -> Entry {
    Entry::new(Level::Info, "")
}

#[test]
fn encodes_primitive_fields_compactly() {
    let fields = [
        Field::string("a", "x"),
        Field::int64("b", 10),
        Field::bool("c", true),
    ];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(out, "{\"a\":\"x\",\"b\":10,\"c\":true}\n");
}

#[test]
fn encodes_full_entry_metadata_with_fallbacks() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        level_key: "level".to_string(),
        time_key: "ts".to_string(),
        name_key: "logger".to_string(),
        caller_key: "caller".to_string(),
        stacktrace_key: "stacktrace".to_string(),
        ..EncoderConfig::default()
    };
    let mut entry = Entry::new(Level::Warn, "hello");
    entry.time = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    entry.logger_name = "svc".to_string();
    entry.caller = EntryCaller::new("src/io.rs", 9);
    entry.stack = "stack text".to_string();

    let out = encode(cfg, &entry, &[]);
    assert_eq!(
        out,
        "{\"level\":\"warn\",\"ts\":1700000000000000000,\"logger\":\"svc\",\
         \"caller\":\"src/io.rs:9\",\"msg\":\"hello\",\"stacktrace\":\"stack text\"}\n"
    );
}

#[test]
fn closes_namespaces_before_finalizing() {
    let fields = [Field::namespace("ns"), Field::string("k", "v")];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(out, "{\"ns\":{\"k\":\"v\"}}\n");

    let nested = [
        Field::namespace("outer"),
        Field::namespace("inner"),
        Field::int64("n", 1),
    ];
    let out = encode(bare_config(), &minimal_entry(), &nested);
    assert_eq!(out, "{\"outer\":{\"inner\":{\"n\":1}}}\n");
}

#[test]
fn stacktrace_lands_outside_closed_namespaces() {
    let cfg = EncoderConfig {
        stacktrace_key: "stack".to_string(),
        ..EncoderConfig::default()
    };
    let mut entry = minimal_entry();
    entry.stack = "trace".to_string();
    let fields = [Field::namespace("ns"), Field::string("k", "v")];
    let out = encode(cfg, &entry, &fields);
    assert_eq!(out, "{\"ns\":{\"k\":\"v\"},\"stack\":\"trace\"}\n");
}

#[test]
fn preserves_duplicate_keys_in_order() {
    let fields = [Field::string("k", "one"), Field::string("k", "two")];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(out, "{\"k\":\"one\",\"k\":\"two\"}\n");
}

#[test]
fn identical_inputs_produce_identical_bytes() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        level_key: "level".to_string(),
        ..EncoderConfig::default()
    };
    let entry = Entry::new(Level::Error, "deterministic");
    let fields = [
        Field::string("a", "x"),
        Field::float64("f", 2.5),
        Field::duration("d", Duration::from_secs(3)),
    ];

    let enc = JsonEncoder::new(cfg);
    let first = enc.encode_entry(&entry, &fields).unwrap();
    let second = enc.clone_encoder().encode_entry(&entry, &fields).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
    buffer::put(first);
    buffer::put(second);
}

#[test]
fn output_parses_back_to_equivalent_mapping() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        ..EncoderConfig::default()
    };
    let entry = Entry::new(Level::Info, "round trip");
    let fields = [
        Field::string("s", "text with \"quotes\" and \\slashes\\"),
        Field::int64("i", -42),
        Field::uint64("u", u64::MAX),
        Field::float64("f", 0.25),
        Field::bool("b", false),
    ];
    let out = encode(cfg, &entry, &fields);

    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["msg"], "round trip");
    assert_eq!(parsed["s"], "text with \"quotes\" and \\slashes\\");
    assert_eq!(parsed["i"], -42);
    assert_eq!(parsed["u"], u64::MAX);
    assert_eq!(parsed["f"], 0.25);
    assert_eq!(parsed["b"], false);
}

#[test]
fn non_finite_floats_become_quoted_literals() {
    let fields = [
        Field::float64("nan", f64::NAN),
        Field::float64("pos", f64::INFINITY),
        Field::float64("neg", f64::NEG_INFINITY),
        Field::float32("nan32", f32::NAN),
    ];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(
        out,
        "{\"nan\":\"NaN\",\"pos\":\"+Inf\",\"neg\":\"-Inf\",\"nan32\":\"NaN\"}\n"
    );
}

#[test]
fn context_fields_survive_cloning() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        ..EncoderConfig::default()
    };
    let mut base = JsonEncoder::new(cfg);
    base.add_string("app", "api");
    base.add_int64("shard", 3);

    let derived = base.clone_encoder();
    let entry = Entry::new(Level::Info, "with context");
    let buf = derived.encode_entry(&entry, &[Field::bool("ok", true)]).unwrap();
    assert_eq!(
        buf.as_str_lossy(),
        "{\"msg\":\"with context\",\"app\":\"api\",\"shard\":3,\"ok\":true}\n"
    );
    buffer::put(buf);

    // The base encoder still works and still carries only its own context.
    let buf = base.encode_entry(&entry, &[]).unwrap();
    assert_eq!(
        buf.as_str_lossy(),
        "{\"msg\":\"with context\",\"app\":\"api\",\"shard\":3}\n"
    );
    buffer::put(buf);
}

#[test]
fn marshaling_failure_becomes_synthetic_error_field() {
    let bad = Field::object("job", |_enc: &mut dyn ObjectEncoder| -> Result<(), EncodeError> {
        Err(EncodeError::marshal("boom"))
    });
    let out = encode(bare_config(), &minimal_entry(), &[bad, Field::int64("after", 1)]);
    assert_eq!(
        out,
        "{\"job\":{},\"jobError\":\"field marshaling failed: boom\",\"after\":1}\n"
    );
}

#[test]
fn array_marshaler_appends_positionally() {
    let xs = Field::array("xs", |enc: &mut dyn ArrayEncoder| -> Result<(), EncodeError> {
        enc.append_int64(1);
        enc.append_int64(2);
        enc.append_string("three");
        Ok(())
    });
    let out = encode(bare_config(), &minimal_entry(), &[xs]);
    assert_eq!(out, "{\"xs\":[1,2,\"three\"]}\n");
}

#[test]
fn object_marshaler_nests_keyed_adds() {
    let job = Field::object("job", |enc: &mut dyn ObjectEncoder| -> Result<(), EncodeError> {
        enc.add_string("name", "compact");
        enc.add_uint64("attempt", 2);
        Ok(())
    });
    let out = encode(bare_config(), &minimal_entry(), &[job]);
    assert_eq!(out, "{\"job\":{\"name\":\"compact\",\"attempt\":2}}\n");
}

#[test]
fn binary_renders_as_base64() {
    let fields = [Field::binary("blob", vec![0xFF, 0x00, 0x10])];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(out, "{\"blob\":\"/wAQ\"}\n");
}

#[test]
fn byte_string_escapes_like_a_string() {
    let fields = [Field::byte_string("raw", b"tab\there".to_vec())];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(out, "{\"raw\":\"tab\\there\"}\n");
}

#[test]
fn reflected_values_splice_as_json() {
    let fields = [Field::reflect(
        "payload",
        serde_json::json!({"x": [1, 2], "y": null}),
    )];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(out, "{\"payload\":{\"x\":[1,2],\"y\":null}}\n");
}

#[test]
fn time_fields_honor_the_configured_formatter_and_timezone() {
    let cfg = EncoderConfig {
        encode_time: Some(rfc3339_time_encoder),
        ..EncoderConfig::default()
    };
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let local: DateTime<FixedOffset> = offset.timestamp_opt(0, 0).unwrap();
    let fields = [
        Field::time("local", local),
        Field::time_utc("utc", DateTime::from_timestamp(0, 0).unwrap()),
    ];
    let out = encode(cfg, &minimal_entry(), &fields);
    assert_eq!(
        out,
        "{\"local\":\"1970-01-01T02:00:00.000+02:00\",\"utc\":\"1970-01-01T00:00:00.000Z\"}\n"
    );
}

#[test]
fn time_without_formatter_falls_back_to_nanos() {
    let fields = [Field::time_utc(
        "t",
        DateTime::<Utc>::from_timestamp(1, 500).unwrap(),
    )];
    let out = encode(bare_config(), &minimal_entry(), &fields);
    assert_eq!(out, "{\"t\":1000000500}\n");
}

#[test]
fn duration_formatter_and_fallback() {
    let cfg = EncoderConfig {
        encode_duration: Some(seconds_duration_encoder),
        ..EncoderConfig::default()
    };
    let fields = [Field::duration("d", Duration::from_millis(1500))];
    assert_eq!(
        encode(cfg, &minimal_entry(), &fields),
        "{\"d\":1.5}\n"
    );
    assert_eq!(
        encode(bare_config(), &minimal_entry(), &fields),
        "{\"d\":1500000000}\n"
    );
}

#[test]
fn line_ending_override() {
    let cfg = EncoderConfig {
        line_ending: "\r\n".to_string(),
        ..EncoderConfig::default()
    };
    let out = encode(cfg, &minimal_entry(), &[Field::bool("ok", true)]);
    assert_eq!(out, "{\"ok\":true}\r\n");
}

#[test]
fn no_op_custom_formatters_fall_back_to_valid_output() {
    fn silent_level(_: Level, _: &mut dyn ArrayEncoder) {}
    let cfg = EncoderConfig {
        level_key: "level".to_string(),
        encode_level: Some(silent_level),
        ..EncoderConfig::default()
    };
    let out = encode(cfg, &Entry::new(Level::Debug, ""), &[]);
    assert_eq!(out, "{\"level\":\"debug\"}\n");
}
