//! Logging setup for `sigtab` and its tests
//!
//! The `log-level` setting of `sigtab.toml` is a filter: a default level
//! optionally followed by per-area levels, e.g. `"warn,pickle=debug"`.
//! Areas are `symtab` (completion, histories, hierarchy walks) and `pickle`
//! (reading and writing signatures). Without a setting, `RUST_LOG` is used.
//!
//! Completion logs lock traffic at trace level under `symtab`; the unpickler
//! logs its passes at debug level under `pickle`.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// A log area and the module path it covers
pub const AREAS: [(&str, &str); 2] = [
    ("symtab", "sigtab_compiler::symtab"),
    ("pickle", "sigtab_compiler::pickle"),
];

/// Parsed `log-level` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub default: LevelFilter,
    pub areas: Vec<(&'static str, LevelFilter)>,
}

impl LogFilter {
    pub fn new(default: LevelFilter) -> Self {
        Self {
            default,
            areas: Vec::new(),
        }
    }

    /// Parse `"<level>"`, `"<area>=<level>"` or a comma separated mix.
    /// Returns `None` for unknown levels or areas.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut filter = Self::new(LevelFilter::Warn);
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((area, level)) => {
                    let target = module_of(area.trim())?;
                    filter.areas.push((target, parse_level(level)?));
                }
                None => filter.default = parse_level(part)?,
            }
        }
        Some(filter)
    }

    /// The most verbose level any area gets
    pub fn max_level(&self) -> LevelFilter {
        self.areas
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, std::cmp::max)
    }

    fn apply(&self, builder: &mut Builder) {
        builder.filter_level(self.default);
        for (target, level) in &self.areas {
            builder.filter_module(target, *level);
        }
    }
}

fn module_of(area: &str) -> Option<&'static str> {
    AREAS.iter().find(|(name, _)| *name == area).map(|(_, module)| *module)
}

/// Short area name of a record target, or the target itself
fn area_of(target: &str) -> &str {
    AREAS
        .iter()
        .find(|(_, module)| target.starts_with(module))
        .map(|(name, _)| *name)
        .unwrap_or(target)
}

/// Parse a level name ("off", "error", ... "trace")
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse::<LevelFilter>().ok()
}

/// Install the logger for the CLI. Only the first call has an effect.
pub fn init(filter: Option<&LogFilter>) {
    INIT.call_once(|| {
        let mut builder = match filter {
            Some(filter) => {
                let mut builder = Builder::new();
                filter.apply(&mut builder);
                builder
            }
            None => Builder::from_env(env_logger::Env::default().default_filter_or("warn")),
        };
        builder
            .format(|buf, record| {
                writeln!(buf, "[{:5}] {}: {}", record.level(), area_of(record.target()), record.args())
            })
            .init();
    });
}

/// Logger for tests; quiet unless RUST_LOG says otherwise
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test();
        init_test();
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" TRACE "), Some(LevelFilter::Trace));
        assert_eq!(parse_level("chatty"), None);
    }

    #[test]
    fn test_filter_with_areas() {
        let filter = LogFilter::parse("info, pickle=trace").unwrap();
        assert_eq!(filter.default, LevelFilter::Info);
        assert_eq!(filter.areas, vec![("sigtab_compiler::pickle", LevelFilter::Trace)]);
        assert_eq!(filter.max_level(), LevelFilter::Trace);

        let filter = LogFilter::parse("symtab=debug").unwrap();
        assert_eq!(filter.default, LevelFilter::Warn);
        assert_eq!(filter.max_level(), LevelFilter::Debug);

        assert!(LogFilter::parse("typer=debug").is_none());
        assert!(LogFilter::parse("pickle=loud").is_none());
    }

    #[test]
    fn test_records_are_tagged_by_area() {
        assert_eq!(area_of("sigtab_compiler::symtab::completion"), "symtab");
        assert_eq!(area_of("sigtab_compiler::pickle::unpickler"), "pickle");
        assert_eq!(area_of("sigtab"), "sigtab");
    }
}
