use chrono::DateTime;

use logline::{
    buffer, rfc3339_time_encoder, short_caller_encoder, uppercase_level_encoder, ConsoleEncoder,
    Encoder, EncoderConfig, Entry, EntryCaller, Field, Level,
};

fn encode(cfg: EncoderConfig, entry: &Entry, fields: &[Field]) -> String {
    let enc = ConsoleEncoder::new(cfg);
    let buf = enc.encode_entry(entry, fields).unwrap();
    let out = buf.as_str_lossy().into_owned();
    buffer::put(buf);
    out
}

#[test]
fn context_only_line_has_no_leading_tab() {
    let fields = [
        Field::string("a", "x"),
        Field::int64("b", 10),
        Field::bool("c", true),
    ];
    let out = encode(EncoderConfig::default(), &Entry::new(Level::Info, ""), &fields);
    assert_eq!(out, "{\"a\": \"x\", \"b\": 10, \"c\": true}\n");
}

#[test]
fn metadata_cells_join_with_single_tabs() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        level_key: "level".to_string(),
        time_key: "ts".to_string(),
        name_key: "logger".to_string(),
        caller_key: "caller".to_string(),
        encode_level: Some(uppercase_level_encoder),
        encode_time: Some(rfc3339_time_encoder),
        encode_caller: Some(short_caller_encoder),
        ..EncoderConfig::default()
    };
    let mut entry = Entry::new(Level::Warn, "disk almost full");
    entry.time = DateTime::from_timestamp(0, 0).unwrap();
    entry.logger_name = "svc.store".to_string();
    entry.caller = EntryCaller::new("crates/store/src/compact.rs", 81);

    let out = encode(cfg, &entry, &[Field::uint64("used_pct", 97)]);
    assert_eq!(
        out,
        "1970-01-01T00:00:00.000Z\tWARN\tsvc.store\tsrc/compact.rs:81\tdisk almost full\t\
         {\"used_pct\": 97}\n"
    );
}

#[test]
fn metadata_without_formatter_is_omitted() {
    // Keys are configured but no level/time formatters are: the console
    // encoder only renders metadata through its callbacks.
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        level_key: "level".to_string(),
        time_key: "ts".to_string(),
        ..EncoderConfig::default()
    };
    let out = encode(cfg, &Entry::new(Level::Info, "plain message"), &[]);
    assert_eq!(out, "plain message\n");
}

#[test]
fn empty_context_adds_no_block() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        ..EncoderConfig::default()
    };
    let out = encode(cfg, &Entry::new(Level::Info, "just text"), &[]);
    assert_eq!(out, "just text\n");
}

#[test]
fn stack_trails_on_its_own_line() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        stacktrace_key: "stacktrace".to_string(),
        ..EncoderConfig::default()
    };
    let mut entry = Entry::new(Level::Error, "it broke");
    entry.stack = "frame one\nframe two".to_string();
    let out = encode(cfg, &entry, &[]);
    assert_eq!(out, "it broke\nframe one\nframe two\n");
}

#[test]
fn stack_suppressed_without_key_for_single_line_output() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        ..EncoderConfig::default()
    };
    let mut entry = Entry::new(Level::Error, "it broke");
    entry.stack = "frame one".to_string();
    let out = encode(cfg, &entry, &[]);
    assert_eq!(out, "it broke\n");
}

#[test]
fn namespaces_stay_balanced_inside_context_block() {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        ..EncoderConfig::default()
    };
    let fields = [
        Field::namespace("db"),
        Field::string("table", "events"),
        Field::uint64("rows", 12),
    ];
    let out = encode(cfg, &Entry::new(Level::Info, "query done"), &fields);
    assert_eq!(
        out,
        "query done\t{\"db\": {\"table\": \"events\", \"rows\": 12}}\n"
    );
}

#[test]
fn console_context_survives_cloning() {
    let mut base = ConsoleEncoder::new(EncoderConfig {
        message_key: "msg".to_string(),
        ..EncoderConfig::default()
    });
    use logline::ObjectEncoder;
    base.add_string("app", "api");

    let derived = base.clone_encoder();
    let buf = derived
        .encode_entry(&Entry::new(Level::Info, "m"), &[Field::bool("ok", true)])
        .unwrap();
    assert_eq!(buf.as_str_lossy(), "m\t{\"app\": \"api\", \"ok\": true}\n");
    buffer::put(buf);
}
