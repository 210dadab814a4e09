use criterion::{black_box, criterion_group, criterion_main, Criterion};

use logline::{
    buffer, rfc3339_time_encoder, uppercase_level_encoder, ConsoleEncoder, Encoder,
    EncoderConfig, Entry, EntryCaller, Field, JsonEncoder, Level,
};

fn bench_config() -> EncoderConfig {
    EncoderConfig {
        message_key: "msg".to_string(),
        level_key: "level".to_string(),
        time_key: "ts".to_string(),
        name_key: "logger".to_string(),
        caller_key: "caller".to_string(),
        encode_level: Some(uppercase_level_encoder),
        encode_time: Some(rfc3339_time_encoder),
        ..EncoderConfig::default()
    }
}

fn bench_entry() -> Entry {
    let mut entry = Entry::new(Level::Info, "request served");
    entry.logger_name = "bench.http".to_string();
    entry.caller = EntryCaller::new("src/server/handler.rs", 217);
    entry
}

fn bench_fields() -> Vec<Field> {
    vec![
        Field::string("route", "/api/v1/items"),
        Field::string("method", "GET"),
        Field::int64("status", 200),
        Field::uint64("bytes", 5_312),
        Field::float64("elapsed_ms", 1.875),
        Field::bool("cached", false),
    ]
}

fn encode_entry_benches(c: &mut Criterion) {
    let entry = bench_entry();
    let fields = bench_fields();

    let json = JsonEncoder::new(bench_config());
    c.bench_function("json_encode_entry", |b| {
        b.iter(|| {
            let buf = json
                .encode_entry(black_box(&entry), black_box(&fields))
                .unwrap();
            buffer::put(buf);
        })
    });

    let console = ConsoleEncoder::new(bench_config());
    c.bench_function("console_encode_entry", |b| {
        b.iter(|| {
            let buf = console
                .encode_entry(black_box(&entry), black_box(&fields))
                .unwrap();
            buffer::put(buf);
        })
    });
}

criterion_group!(benches, encode_entry_benches);
criterion_main!(benches);
