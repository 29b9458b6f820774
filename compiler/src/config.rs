//! TOML configuration for the symbol table (`sigtab.toml`).
//!
//! ```toml
//! [settings]
//! recursion-limit = 2
//! debug = true
//! log-level = "debug"
//!
//! [[phases]]
//! name = "typer"
//!
//! [[phases]]
//! name = "erasure"
//! next-flags = ["late_deferred", "late_interface"]
//!
//! [[module-advice]]
//! prefix = "scala.collection.parallel"
//! group = "org.scala-lang.modules"
//! artifact = "scala-parallel-collections"
//! ```
//!
//! Without a `[[phases]]` list the standard phase plan is used.

use crate::error_codes;
use crate::logging::LogFilter;
use crate::symtab::{standard_phase_specs, Flags, PhaseChain, PhaseSpec, Settings, SymbolTable, MAX_PHASES};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(String),
    UnknownFlag { phase: String, flag: String },
    UnknownLevel(String),
}

impl ConfigError {
    pub fn code(&self) -> u16 {
        match self {
            ConfigError::Io { .. } => error_codes::CONFIG_IO,
            ConfigError::Parse(_) | ConfigError::UnknownLevel(_) => error_codes::CONFIG_PARSE,
            ConfigError::UnknownFlag { .. } => error_codes::CONFIG_UNKNOWN_FLAG,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Parse(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::UnknownFlag { phase, flag } => {
                write!(f, "unknown flag `{}` in phase `{}`", flag, phase)
            }
            ConfigError::UnknownLevel(level) => write!(f, "unknown log level `{}`", level),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw TOML structure
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    phases: Vec<PhaseSection>,
    #[serde(default)]
    module_advice: Vec<AdviceSection>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SettingsSection {
    /// How often a locked symbol may be re-entered (0 = never)
    #[serde(default)]
    pub recursion_limit: u32,
    /// Developer warnings for stubs
    #[serde(default)]
    pub debug: bool,
    /// Keep the lock chain for cyclic reference messages
    #[serde(default)]
    pub trace_locks: bool,
    /// Log level name ("off", "error", ... "trace")
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PhaseSection {
    name: String,
    #[serde(default)]
    new_flags: Vec<String>,
    #[serde(default)]
    next_flags: Vec<String>,
}

/// `[[module-advice]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdviceSection {
    pub prefix: String,
    pub group: String,
    pub artifact: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SymtabConfig {
    pub settings: SettingsSection,
    pub phases: Vec<PhaseSpec>,
    pub module_advice: Vec<AdviceSection>,
}

impl Default for SymtabConfig {
    fn default() -> Self {
        Self {
            settings: SettingsSection::default(),
            phases: standard_phase_specs(),
            module_advice: Vec::new(),
        }
    }
}

impl SymtabConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(level) = &raw.settings.log_level {
            if LogFilter::parse(level).is_none() {
                return Err(ConfigError::UnknownLevel(level.clone()));
            }
        }

        if raw.phases.len() >= MAX_PHASES {
            return Err(ConfigError::Parse(format!(
                "{} phases configured, at most {} allowed",
                raw.phases.len(),
                MAX_PHASES - 1
            )));
        }

        let phases = if raw.phases.is_empty() {
            standard_phase_specs()
        } else {
            raw.phases.iter().map(resolve_phase).collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            settings: raw.settings,
            phases,
            module_advice: raw.module_advice,
        })
    }

    /// Completion engine knobs
    pub fn to_settings(&self) -> Settings {
        Settings {
            recursion_limit: self.settings.recursion_limit,
            debug: self.settings.debug,
            trace_locks: self.settings.trace_locks,
        }
    }

    /// The `log-level` filter, if one is configured
    pub fn log_filter(&self) -> Option<LogFilter> {
        self.settings.log_level.as_deref().and_then(LogFilter::parse)
    }

    pub fn phase_chain(&self) -> PhaseChain {
        PhaseChain::new(&self.phases)
    }

    /// A fresh table with these settings, phases and advice installed
    pub fn build_table(&self) -> SymbolTable {
        let mut table = SymbolTable::with_settings(self.to_settings());
        table.install_phases(self.phase_chain());
        for entry in &self.module_advice {
            table
                .module_advice_mut()
                .add(entry.prefix.clone(), entry.group.clone(), entry.artifact.clone());
        }
        log::debug!(
            "built symbol table with {} phases and {} advice entries",
            table.phases().len(),
            table.module_advice().len()
        );
        table
    }
}

fn resolve_phase(section: &PhaseSection) -> Result<PhaseSpec, ConfigError> {
    let flags = |names: &[String]| -> Result<Flags, ConfigError> {
        names.iter().try_fold(Flags::NONE, |acc, name| {
            Flags::from_name(name).map(|f| acc | f).ok_or_else(|| ConfigError::UnknownFlag {
                phase: section.name.clone(),
                flag: name.clone(),
            })
        })
    };
    Ok(PhaseSpec::new(section.name.clone())
        .with_new_flags(flags(&section.new_flags)?)
        .with_next_flags(flags(&section.next_flags)?))
}
