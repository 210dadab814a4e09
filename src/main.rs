use std::io;

use logline::write_syncer::{add_sync, lock, multi, WriteSyncer};
use logline::{
    buffer, rfc3339_time_encoder, uppercase_level_encoder, ConsoleEncoder, Encoder,
    EncoderConfig, Entry, EntryCaller, Field, JsonEncoder, Level,
};

/// Small demonstration: encode the same entry with both encoders and fan
/// the JSON line out to stdout and stderr.
fn main() -> io::Result<()> {
    let cfg = EncoderConfig {
        message_key: "msg".to_string(),
        level_key: "level".to_string(),
        time_key: "ts".to_string(),
        name_key: "logger".to_string(),
        caller_key: "caller".to_string(),
        stacktrace_key: "stacktrace".to_string(),
        encode_level: Some(uppercase_level_encoder),
        encode_time: Some(rfc3339_time_encoder),
        ..EncoderConfig::default()
    };

    let mut entry = Entry::new(Level::Info, "listener started");
    entry.logger_name = "demo.server".to_string();
    entry.caller = EntryCaller::new("src/main.rs", 24);

    let fields = [
        Field::string("addr", "127.0.0.1:8080"),
        Field::uint64("workers", 4),
        Field::bool("tls", false),
    ];

    let json = JsonEncoder::new(cfg.clone());
    let buf = json
        .encode_entry(&entry, &fields)
        .map_err(io::Error::other)?;
    let mut sink = multi(vec![lock(add_sync(io::stdout())), lock(add_sync(io::stderr()))]);
    sink.write(buf.as_bytes())?;
    sink.sync()?;
    buffer::put(buf);

    let console = ConsoleEncoder::new(cfg);
    let buf = console
        .encode_entry(&entry, &fields)
        .map_err(io::Error::other)?;
    let mut out = lock(add_sync(io::stdout()));
    out.write(buf.as_bytes())?;
    out.sync()?;
    buffer::put(buf);

    Ok(())
}
