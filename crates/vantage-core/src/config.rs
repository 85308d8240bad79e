//! # Configuration
//!
//! Tunables of the core, with environment overrides.
//!
//! ## Environment Variables
//!
//! - `VANTAGE_STRING_MAX`: upper bound for [`crate::memory::Memory::string`] reads (default 4096)
//! - `VANTAGE_MAX_PAGES`: page budget of the boundary searches (default 1024)
//! - `VANTAGE_DISASSEMBLY_FLAVOR`: flavor requested from the engine at setup (default `intel`)
//!
//! Values that fail to parse keep the default and log a warning.

use std::env;
use std::fmt;

use tracing::warn;

/// What the engine should do when the inferior receives a signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalPolicy
{
    /// Signal name as the engine spells it (`"SIGSEGV"`)
    pub signal: String,
    /// Stop the inferior
    pub stop: bool,
    /// Print a message
    pub print: bool,
    /// Deliver the signal to the inferior
    pub pass: bool,
}

impl SignalPolicy
{
    /// Create a policy entry.
    pub fn new(signal: &str, stop: bool, print: bool, pass: bool) -> Self
    {
        Self {
            signal: signal.to_string(),
            stop,
            print,
            pass,
        }
    }
}

impl fmt::Display for SignalPolicy
{
    /// Renders as the argument list of GDB's `handle` command.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "{} {} {} {}",
            self.signal,
            if self.stop { "stop" } else { "nostop" },
            if self.print { "print" } else { "noprint" },
            if self.pass { "pass" } else { "nopass" },
        )
    }
}

/// Core tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig
{
    /// Longest C string read by the string helper
    pub string_max: usize,
    /// Pages probed by the boundary searches before giving up
    pub boundary_max_pages: usize,
    /// Disassembly flavor requested at setup
    pub disassembly_flavor: String,
    /// Signal dispositions installed at setup
    pub signals: Vec<SignalPolicy>,
}

impl Default for CoreConfig
{
    fn default() -> Self
    {
        Self {
            string_max: 4096,
            boundary_max_pages: 1024,
            disassembly_flavor: "intel".to_string(),
            signals: vec![
                SignalPolicy::new("SIGALRM", false, true, false),
                SignalPolicy::new("SIGBUS", true, true, false),
                SignalPolicy::new("SIGPIPE", false, true, false),
                SignalPolicy::new("SIGSEGV", true, true, false),
            ],
        }
    }
}

impl CoreConfig
{
    /// Defaults overridden from `VANTAGE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        let mut config = Self::default();
        if let Some(value) = parse_usize(&lookup, "VANTAGE_STRING_MAX") {
            config.string_max = value;
        }
        if let Some(value) = parse_usize(&lookup, "VANTAGE_MAX_PAGES") {
            config.boundary_max_pages = value;
        }
        if let Some(flavor) = lookup("VANTAGE_DISASSEMBLY_FLAVOR") {
            let flavor = flavor.trim();
            if flavor.is_empty() {
                warn!("VANTAGE_DISASSEMBLY_FLAVOR is empty, keeping default");
            } else {
                config.disassembly_flavor = flavor.to_string();
            }
        }
        config
    }
}

fn parse_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize>
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}
