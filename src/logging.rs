use tracing::Level;

pub fn parse_log_level(value: Option<&str>, default: Level) -> Level {
    match value
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
        .as_str()
    {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        _ => default,
    }
}

/// Installs a global subscriber that forwards formatted events to the
/// browser console. Calling it twice keeps the first subscriber.
#[cfg(target_arch = "wasm32")]
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_writer(console::ConsoleMakeWriter)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();
}

#[cfg(target_arch = "wasm32")]
mod console {
    use std::io::{self, Write};

    use tracing::{Level, Metadata};
    use tracing_subscriber::fmt::MakeWriter;
    use wasm_bindgen::JsValue;

    pub struct ConsoleMakeWriter;

    pub struct ConsoleWriter {
        level: Level,
        buffer: Vec<u8>,
    }

    impl Write for ConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // One event is formatted into one writer, so the line is emitted on drop.
    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            if self.buffer.is_empty() {
                return;
            }

            let line = String::from_utf8_lossy(&self.buffer);
            let message = JsValue::from_str(line.trim_end());

            if self.level == Level::ERROR {
                web_sys::console::error_1(&message);
            } else if self.level == Level::WARN {
                web_sys::console::warn_1(&message);
            } else if self.level == Level::INFO {
                web_sys::console::info_1(&message);
            } else {
                web_sys::console::debug_1(&message);
            }
        }
    }

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter {
                level: Level::INFO,
                buffer: Vec::new(),
            }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            ConsoleWriter {
                level: *meta.level(),
                buffer: Vec::new(),
            }
        }
    }
}
