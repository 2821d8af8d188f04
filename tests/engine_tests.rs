//! Resolution engine tests
//!
//! End-to-end behaviour of configs built from source groups: fetch counts,
//! expiry, stale serving, fallback chains and group precedence.

use chrono::{DateTime, TimeZone, Utc};
use config_composer::cache::ManualClock;
use config_composer::source::{Document, Refresh, Source, SourceKey};
use config_composer::{
    Clock, ComposerError, Config, DefaultValue, DotEnvFile, Env, ParameterSpec, ParameterType,
    ParameterValue, SourceFetchError, SourceGroup, Sources,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source whose responses are scripted by the test and whose fetches are counted.
#[derive(Debug, Clone)]
struct Scripted {
    name: String,
    field: String,
    refresh: Refresh,
    calls: Arc<AtomicUsize>,
    response: Arc<Mutex<Result<Document, SourceFetchError>>>,
}

impl Scripted {
    fn new(name: &str, field: &str, refresh: Refresh) -> Self {
        Self {
            name: name.to_string(),
            field: field.to_string(),
            refresh,
            calls: Arc::new(AtomicUsize::new(0)),
            response: Arc::new(Mutex::new(Ok(Document::new()))),
        }
    }

    fn respond(&self, pairs: &[(&str, &str)]) {
        *self.response.lock() = Ok(pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect());
    }

    fn fail(&self, details: &str) {
        *self.response.lock() = Err(SourceFetchError::unavailable(details));
    }

    /// Another field of the same record.
    fn sibling(&self, field: &str) -> Self {
        Self {
            field: field.to_string(),
            ..self.clone()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Source for Scripted {
    fn key(&self) -> SourceKey {
        SourceKey::new("Scripted").with(self.name.as_str())
    }

    fn field(&self) -> &str {
        &self.field
    }

    fn fetch(&self) -> Result<Document, SourceFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.lock().clone()
    }

    fn refresh(&self) -> Refresh {
        self.refresh
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn strings(names: &[&str]) -> ParameterSpec {
    names
        .iter()
        .fold(ParameterSpec::builder(), |builder, name| {
            builder.declare(*name, ParameterType::string())
        })
        .build()
        .unwrap()
}

fn text(config: &Config, name: &str) -> String {
    config.get_as::<String>(name).unwrap()
}

#[cfg(test)]
mod basic_source_tests {
    use super::*;

    #[test]
    fn test_basic_source_fetches_once() {
        let source = Scripted::new("basic", "foo", Refresh::Once);
        source.respond(&[("foo", "x")]);
        let config = Config::from_groups(
            strings(&["foo"]),
            [SourceGroup::new("g").with("foo", source.clone())],
        );

        for _ in 0..5 {
            assert_eq!(text(&config, "foo"), "x");
        }
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_basic_source_survives_removal_of_underlying_value() {
        std::env::set_var("CC_ENGINE_BASIC_REMOVED", "before");
        let config = Config::from_groups(
            strings(&["foo"]),
            [SourceGroup::new("g").with("foo", Env::new("CC_ENGINE_BASIC_REMOVED"))],
        );

        assert_eq!(text(&config, "foo"), "before");
        std::env::remove_var("CC_ENGINE_BASIC_REMOVED");
        assert_eq!(text(&config, "foo"), "before");
    }

    #[test]
    fn test_failed_basic_source_retries() {
        let source = Scripted::new("retry", "foo", Refresh::Once);
        source.fail("down");
        let config = Config::from_groups(
            strings(&["foo"]),
            [SourceGroup::new("g").with("foo", source.clone())],
        );

        assert!(config.get("foo").unwrap_err().is_parameter_error());
        let status = config.source_status("foo").unwrap();
        assert_eq!(status[0].state, "SOURCE_ERROR");
        assert_eq!(status[0].errors, vec!["Source unavailable: down".to_string()]);

        source.respond(&[("foo", "up")]);
        assert_eq!(text(&config, "foo"), "up");
        assert_eq!(source.calls(), 2);
    }
}

#[cfg(test)]
mod expirable_source_tests {
    use super::*;

    fn expirable() -> (Scripted, Arc<ManualClock>, Config) {
        let source = Scripted::new("expirable", "foo", Refresh::Ttl(Duration::from_secs(15)));
        source.respond(&[("foo", "v1")]);
        let clock = Arc::new(ManualClock::new(start()));
        let config = Config::from_groups_with_clock(
            strings(&["foo"]),
            [SourceGroup::new("g").with("foo", source.clone())],
            clock.clone(),
        );
        (source, clock, config)
    }

    #[test]
    fn test_not_expired_does_not_fetch() {
        let (source, clock, config) = expirable();

        assert_eq!(text(&config, "foo"), "v1");
        clock.advance(Duration::from_secs(10));
        assert_eq!(text(&config, "foo"), "v1");
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_expired_fetches_exactly_once() {
        let (source, clock, config) = expirable();

        text(&config, "foo");
        source.respond(&[("foo", "v2")]);
        clock.advance(Duration::from_secs(16));

        assert_eq!(text(&config, "foo"), "v2");
        assert_eq!(text(&config, "foo"), "v2");
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_failure_after_expiry_serves_last_good_value() {
        let (source, clock, config) = expirable();

        text(&config, "foo");
        source.fail("timeout");
        clock.advance(Duration::from_secs(16));

        assert_eq!(text(&config, "foo"), "v1");
        let status = config.source_status("foo").unwrap();
        assert_eq!(status[0].state, "VALUE_CACHED_SOURCE_ERROR");
        assert!(status[0].cached);
        assert_eq!(status[0].errors, vec!["Source unavailable: timeout".to_string()]);
    }

    #[test]
    fn test_recovery_clears_errors() {
        let (source, clock, config) = expirable();

        text(&config, "foo");
        source.fail("timeout");
        clock.advance(Duration::from_secs(16));
        text(&config, "foo");

        source.respond(&[("foo", "v3")]);
        clock.advance(Duration::from_secs(16));

        assert_eq!(text(&config, "foo"), "v3");
        let status = config.source_status("foo").unwrap();
        assert_eq!(status[0].state, "VALUE_CACHED_SOURCE_OK");
        assert!(status[0].errors.is_empty());
        assert_eq!(source.calls(), 3);
    }

    mockall::mock! {
        pub TestClock {}

        impl Clock for TestClock {
            fn now(&self) -> DateTime<Utc>;
        }
    }

    impl std::fmt::Debug for MockTestClock {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockTestClock")
        }
    }

    #[test]
    fn test_expiry_reads_the_injected_clock() {
        let source = Scripted::new("mocked", "foo", Refresh::Ttl(Duration::from_secs(15)));
        source.respond(&[("foo", "v1")]);

        let mut clock = MockTestClock::new();
        let mut times = vec![start() + chrono::Duration::seconds(30), start()];
        clock
            .expect_now()
            .times(2)
            .returning(move || times.pop().unwrap_or_else(start));

        let config = Config::from_groups_with_clock(
            strings(&["foo"]),
            [SourceGroup::new("g").with("foo", source.clone())],
            Arc::new(clock),
        );

        text(&config, "foo");
        text(&config, "foo");
        assert_eq!(source.calls(), 2);
    }
}

#[cfg(test)]
mod document_source_tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_one_fetch_populates_every_field() {
        let a = Scripted::new("doc", "a", Refresh::Ttl(Duration::from_secs(15)));
        a.respond(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let clock = Arc::new(ManualClock::new(start()));
        let group = SourceGroup::new("g")
            .with("a", a.clone())
            .with("b", a.sibling("b"))
            .with("c", a.sibling("c"));
        let config = Config::from_groups_with_clock(strings(&["a", "b", "c"]), [group], clock);

        assert_eq!(text(&config, "a"), "1");
        let cache = config.sources().cache(0).unwrap();
        let document = cache.document(&a.key()).unwrap();
        assert_eq!(document.len(), 3);

        assert_eq!(text(&config, "b"), "2");
        assert_eq!(text(&config, "c"), "3");
        assert_eq!(a.calls(), 1);
    }

    #[test]
    fn test_dotenv_fields_share_one_read_within_ttl() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "HOST=localhost\nPORT=5432").unwrap();

        let group = SourceGroup::new("dotenv")
            .with("host", DotEnvFile::new("HOST").with_dotenv_path(file.path()))
            .with("port", DotEnvFile::new("PORT").with_dotenv_path(file.path()));
        let spec = ParameterSpec::builder()
            .declare("host", ParameterType::string())
            .declare("port", ParameterType::integer())
            .build()
            .unwrap();
        let config = Config::from_groups(spec, [group]);

        assert_eq!(text(&config, "host"), "localhost");

        // rewritten after the first read: still inside the TTL window
        std::fs::write(file.path(), "HOST=elsewhere\nPORT=6543\n").unwrap();
        assert_eq!(config.get("port").unwrap(), ParameterValue::Integer(5432));
    }

    #[test]
    fn test_missing_dotenv_file_falls_back() {
        let chain = Sources::new()
            .or(DotEnvFile::new("HOST").with_dotenv_path("/nonexistent/cc/.env"))
            .or(DefaultValue::new("fallback"));
        let config = Config::from_groups(
            strings(&["host"]),
            [SourceGroup::new("g").with("host", chain)],
        );

        assert_eq!(text(&config, "host"), "fallback");
        let status = config.source_status("host").unwrap();
        assert_eq!(status[0].state, "SOURCE_ERROR");
        assert_eq!(status[1].state, "VALUE_CACHED_SOURCE_OK");
    }
}

#[cfg(test)]
mod composition_tests {
    use super::*;

    #[test]
    fn test_fallback_first_non_nothing_wins() {
        let group = SourceGroup::new("g")
            .with(
                "foo",
                Sources::new()
                    .or(Env::new("CC_ENGINE_FALLBACK_UNSET"))
                    .or(DefaultValue::new("v")),
            )
            .with(
                "bar",
                Sources::new()
                    .or(DefaultValue::new("v1"))
                    .or(DefaultValue::new("v2")),
            );
        let config = Config::from_groups(strings(&["foo", "bar"]), [group]);

        assert_eq!(text(&config, "foo"), "v");
        assert_eq!(text(&config, "bar"), "v1");
    }

    #[test]
    fn test_group_precedence() {
        let g1 = SourceGroup::new("g1").with("foo", DefaultValue::new("x"));
        let g2 = SourceGroup::new("g2")
            .with("foo", DefaultValue::new("y"))
            .with("bar", DefaultValue::new("z"));
        let config = Config::from_groups(strings(&["foo", "bar"]), [g1, g2]);

        assert_eq!(text(&config, "foo"), "x");
        assert_eq!(text(&config, "bar"), "z");
        assert_eq!(config.parameter_info("bar").unwrap().group.as_deref(), Some("g2"));
    }

    #[test]
    fn test_nothing_in_earlier_group_does_not_fall_through() {
        let g1 = SourceGroup::new("g1").with("foo", Env::new("CC_ENGINE_SHADOW_UNSET"));
        let g2 = SourceGroup::new("g2").with("foo", DefaultValue::new("y"));
        let config = Config::from_groups(strings(&["foo"]), [g1, g2]);

        assert!(config.get("foo").unwrap_err().is_parameter_error());
    }

    #[test]
    fn test_configs_sharing_groups_keep_separate_caches() {
        let source = Scripted::new("shared", "foo", Refresh::Once);
        source.respond(&[("foo", "x")]);
        let group = SourceGroup::new("shared").with("foo", source.clone());

        let first = Config::from_groups(strings(&["foo"]), [group.clone()]);
        let second = Config::from_groups(strings(&["foo"]), [group]);

        text(&first, "foo");
        text(&first, "foo");
        text(&second, "foo");
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_undeclared_and_typed_access() {
        let spec = ParameterSpec::builder()
            .declare("port", ParameterType::integer())
            .build()
            .unwrap();
        let group = SourceGroup::new("g")
            .with("port", DefaultValue::new("42"))
            .with("host", DefaultValue::new("localhost"));
        let config = Config::from_groups(spec, [group]);

        assert_eq!(config.get("port").unwrap(), ParameterValue::Integer(42));
        assert!(matches!(
            config.get("host"),
            Err(ComposerError::ParameterError { .. })
        ));
    }

    #[test]
    fn test_preload() {
        let group = SourceGroup::new("g")
            .with("foo", DefaultValue::new("x"))
            .with("bar", Env::new("CC_ENGINE_PRELOAD_UNSET"));
        let config = Config::from_groups(strings(&["foo", "bar", "baz"]), [group]);

        let err = config.preload().unwrap_err();
        assert_eq!(err.to_string(), "Parameters resolved to nothing: bar, baz");

        let ok = Config::from_groups(
            strings(&["foo"]),
            [SourceGroup::new("g").with("foo", DefaultValue::new("x"))],
        );
        assert!(ok.preload().is_ok());
    }

    #[test]
    fn test_concurrent_resolution_fetches_once() {
        let source = Scripted::new("concurrent", "foo", Refresh::Once);
        source.respond(&[("foo", "x")]);
        let config = Arc::new(Config::from_groups(
            strings(&["foo"]),
            [SourceGroup::new("g").with("foo", source.clone())],
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let config = Arc::clone(&config);
                std::thread::spawn(move || config.get_as::<String>("foo").unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "x");
        }
        assert_eq!(source.calls(), 1);
    }
}
