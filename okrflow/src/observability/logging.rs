//! `tracing-subscriber` setup.

use crate::config::LoggingConfig;
use crate::errors::OkrflowError;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `config.level`. Calling this twice
/// returns a configuration error instead of panicking.
pub fn init_logging(config: &LoggingConfig) -> Result<(), OkrflowError> {
    let subscriber = build_subscriber(config, std::io::stderr)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| OkrflowError::Config(format!("logging already initialised: {e}")))
}

/// Builds the fmt subscriber `init_logging` installs, writing to `writer`.
pub fn build_subscriber<W>(
    config: &LoggingConfig,
    writer: W,
) -> Result<Box<dyn Subscriber + Send + Sync>, OkrflowError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| OkrflowError::Config(format!("invalid log filter '{}': {e}", config.level)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer);

    Ok(if config.json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Captured {
        type Writer = Self;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_plain_subscriber_writes_fields() {
        let captured = Captured::default();
        let subscriber = build_subscriber(&LoggingConfig::default(), captured.clone()).unwrap();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(stage = 2, "Stage failed");
        });

        let text = captured.text();
        assert!(text.contains("WARN"));
        assert!(text.contains("Stage failed"));
    }

    #[test]
    fn test_json_subscriber_writes_json_lines() {
        let captured = Captured::default();
        let config = LoggingConfig {
            json: true,
            ..LoggingConfig::default()
        };
        let subscriber = build_subscriber(&config, captured.clone()).unwrap();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(stage = 4, "Stage failed");
        });

        let text = captured.text();
        let line: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(line["fields"]["message"], "Stage failed");
        assert_eq!(line["fields"]["stage"], 4);
    }
}
