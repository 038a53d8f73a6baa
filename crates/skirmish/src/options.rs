//! Engine construction options.

use crate::prng::Seed;
use crate::result::{EngineError, EngineResult};
use crate::slot::Slot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How many resolve+execute cycles a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    /// Exactly this many cycles; zero runs nothing
    Count(u64),
    /// Until a fail-fast abort or a stop request
    Unbounded,
}

impl Default for Iterations {
    fn default() -> Self {
        Self::Count(1)
    }
}

impl Iterations {
    /// Whether cycle `done + 1` should start
    #[must_use]
    pub const fn allows(self, done: u64) -> bool {
        match self {
            Self::Count(n) => done < n,
            Self::Unbounded => true,
        }
    }
}

impl std::str::FromStr for Iterations {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "forever" | "unbounded" => Ok(Self::Unbounded),
            other => other
                .parse::<u64>()
                .map(Self::Count)
                .map_err(|_| EngineError::config(format!("invalid iteration count: {other}"))),
        }
    }
}

/// What happens when a slot's lifecycle hook fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the error and stop the run
    #[default]
    FailFast,
    /// Record the slot as failed and move on
    ContinueOnFailure,
}

/// Where the run's actors and actions come from
#[derive(Debug, Clone, PartialEq)]
pub enum Scenario {
    /// Registered plans, merged in order
    Plans(Vec<String>),
    /// An inline actor map and action list
    Inline {
        /// Actor name to actor type
        actors: BTreeMap<String, String>,
        /// Action slots
        actions: Vec<Slot>,
    },
}

/// Validated engine options
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Scenario source
    pub scenario: Scenario,
    /// Cycle count
    pub iterations: Iterations,
    /// Pause between cycles
    pub sleep: Duration,
    /// Seed; a random one is drawn when absent
    pub seed: Option<Seed>,
    /// Slot failure handling
    pub failure_policy: FailurePolicy,
    /// Endpoint of the system under test, for actor factories
    pub url: Option<String>,
    /// Absolute path of the target-client configuration file
    pub config: Option<PathBuf>,
    /// Absolute path of the address overrides file
    pub addresses_config: Option<PathBuf>,
    /// Upper bound for any single hook call
    pub hook_timeout: Option<Duration>,
}

impl EngineOptions {
    /// Start building options
    #[must_use]
    pub fn builder() -> EngineOptionsBuilder {
        EngineOptionsBuilder::default()
    }

    /// Parse an options document (YAML or JSON)
    pub fn from_yaml_str(source: &str) -> EngineResult<Self> {
        let raw: RawOptions = serde_yaml_ng::from_str(source)?;
        raw.into_builder()?.build()
    }

    /// Whether failing slots are recorded instead of aborting
    #[must_use]
    pub fn continue_on_failure(&self) -> bool {
        self.failure_policy == FailurePolicy::ContinueOnFailure
    }
}

/// Builder for [`EngineOptions`]
#[derive(Debug, Clone, Default)]
pub struct EngineOptionsBuilder {
    plans: Option<Vec<String>>,
    actors: Option<BTreeMap<String, String>>,
    actions: Option<Vec<Slot>>,
    iterations: Iterations,
    sleep: Duration,
    seed: Option<Seed>,
    failure_policy: FailurePolicy,
    url: Option<String>,
    config: Option<PathBuf>,
    addresses_config: Option<PathBuf>,
    hook_timeout: Option<Duration>,
}

impl EngineOptionsBuilder {
    /// Run these registered plans
    #[must_use]
    pub fn plans<S: Into<String>>(mut self, plans: impl IntoIterator<Item = S>) -> Self {
        self.plans = Some(plans.into_iter().map(Into::into).collect());
        self
    }

    /// Inline actor map (name, actor type)
    #[must_use]
    pub fn actors<N: Into<String>, K: Into<String>>(
        mut self,
        actors: impl IntoIterator<Item = (N, K)>,
    ) -> Self {
        self.actors = Some(
            actors
                .into_iter()
                .map(|(n, k)| (n.into(), k.into()))
                .collect(),
        );
        self
    }

    /// Inline action list
    #[must_use]
    pub fn actions(mut self, actions: Vec<Slot>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Cycle count
    #[must_use]
    pub const fn iterations(mut self, iterations: Iterations) -> Self {
        self.iterations = iterations;
        self
    }

    /// Pause between cycles
    #[must_use]
    pub const fn sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    /// Fixed seed
    #[must_use]
    pub const fn seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Shorthand for [`FailurePolicy::ContinueOnFailure`]
    #[must_use]
    pub const fn continue_on_failure(mut self, enabled: bool) -> Self {
        self.failure_policy = if enabled {
            FailurePolicy::ContinueOnFailure
        } else {
            FailurePolicy::FailFast
        };
        self
    }

    /// Slot failure handling
    #[must_use]
    pub const fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Endpoint of the system under test
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Target-client configuration file (must exist)
    #[must_use]
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    /// Address overrides file (must exist)
    #[must_use]
    pub fn addresses_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.addresses_config = Some(path.into());
        self
    }

    /// Upper bound for any single hook call
    #[must_use]
    pub const fn hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = Some(timeout);
        self
    }

    /// Validate and build
    pub fn build(self) -> EngineResult<EngineOptions> {
        let scenario = match (self.plans, self.actors, self.actions) {
            (Some(plans), None, None) => {
                if plans.is_empty() {
                    return Err(EngineError::config("{ plans } must name at least one plan"));
                }
                Scenario::Plans(plans)
            }
            (None, Some(actors), Some(actions)) => Scenario::Inline { actors, actions },
            _ => {
                return Err(EngineError::config(
                    "Must provide { plans } OR { actors, actions }, but not both",
                ))
            }
        };

        Ok(EngineOptions {
            scenario,
            iterations: self.iterations,
            sleep: self.sleep,
            seed: self.seed,
            failure_policy: self.failure_policy,
            url: self.url,
            config: self
                .config
                .map(|p| existing_file(&p, "Configuration file"))
                .transpose()?,
            addresses_config: self
                .addresses_config
                .map(|p| existing_file(&p, "Addresses config file"))
                .transpose()?,
            hook_timeout: self.hook_timeout,
        })
    }
}

fn existing_file(path: &Path, what: &str) -> EngineResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    if absolute.is_file() {
        Ok(absolute)
    } else {
        Err(EngineError::config(format!(
            "{what} must exist: {}",
            absolute.display()
        )))
    }
}

/// Document form of the options
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawOptions {
    plans: Option<Vec<String>>,
    actors: Option<BTreeMap<String, String>>,
    actions: Option<Vec<Slot>>,
    iterations: Option<RawIterations>,
    sleep: Option<f64>,
    seed: Option<RawSeed>,
    #[serde(default)]
    continue_on_failure: bool,
    url: Option<String>,
    config: Option<PathBuf>,
    addresses_config: Option<PathBuf>,
    hook_timeout: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIterations {
    Count(u64),
    Word(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSeed {
    Number(u64),
    Phrase(String),
}

fn seconds(value: f64, field: &str) -> EngineResult<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| EngineError::config(format!("{field} must be a non-negative number of seconds")))
}

impl RawOptions {
    fn into_builder(self) -> EngineResult<EngineOptionsBuilder> {
        let mut builder = EngineOptionsBuilder {
            plans: self.plans,
            actors: self.actors,
            actions: self.actions,
            url: self.url,
            config: self.config,
            addresses_config: self.addresses_config,
            ..EngineOptionsBuilder::default()
        }
        .continue_on_failure(self.continue_on_failure);

        if let Some(iterations) = self.iterations {
            builder = builder.iterations(match iterations {
                RawIterations::Count(n) => Iterations::Count(n),
                RawIterations::Word(word) => word.parse()?,
            });
        }
        if let Some(sleep) = self.sleep {
            builder = builder.sleep(seconds(sleep, "sleep")?);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(match seed {
                RawSeed::Number(n) => Seed::from_u64(n),
                RawSeed::Phrase(p) => match p.parse::<Seed>() {
                    Ok(seed) => seed,
                    Err(never) => match never {},
                },
            });
        }
        if let Some(timeout) = self.hook_timeout {
            builder = builder.hook_timeout(seconds(timeout, "hookTimeout")?);
        }
        Ok(builder)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    mod builder_tests {
        use super::*;

        #[test]
        fn test_plans_only() {
            let opts = EngineOptions::builder().plans(["smoke"]).build().unwrap();
            assert_eq!(opts.scenario, Scenario::Plans(vec!["smoke".to_string()]));
            assert_eq!(opts.iterations, Iterations::Count(1));
            assert_eq!(opts.sleep, Duration::ZERO);
            assert_eq!(opts.failure_policy, FailurePolicy::FailFast);
        }

        #[test]
        fn test_inline_scenario() {
            let opts = EngineOptions::builder()
                .actors([("alice", "user")])
                .actions(vec![Slot::step("alice", "noop")])
                .continue_on_failure(true)
                .build()
                .unwrap();
            assert!(matches!(opts.scenario, Scenario::Inline { .. }));
            assert!(opts.continue_on_failure());
        }

        #[test]
        fn test_both_sources_rejected() {
            let err = EngineOptions::builder()
                .plans(["smoke"])
                .actors([("alice", "user")])
                .actions(vec![])
                .build()
                .unwrap_err();
            assert!(matches!(err, EngineError::Config { .. }));
        }

        #[test]
        fn test_neither_or_partial_source_rejected() {
            assert!(EngineOptions::builder().build().is_err());
            assert!(EngineOptions::builder()
                .actors([("alice", "user")])
                .build()
                .is_err());
            assert!(EngineOptions::builder()
                .plans(Vec::<String>::new())
                .build()
                .is_err());
        }

        #[test]
        fn test_missing_config_file_rejected() {
            let err = EngineOptions::builder()
                .plans(["smoke"])
                .config("/definitely/not/here.json")
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("Configuration file must exist"));
        }

        #[test]
        fn test_existing_config_file_resolved() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "{{}}").unwrap();
            let opts = EngineOptions::builder()
                .plans(["smoke"])
                .addresses_config(file.path())
                .build()
                .unwrap();
            assert_eq!(opts.addresses_config.as_deref(), Some(file.path()));
        }
    }

    mod iteration_tests {
        use super::*;

        #[test]
        fn test_count_allows() {
            assert!(Iterations::Count(2).allows(0));
            assert!(Iterations::Count(2).allows(1));
            assert!(!Iterations::Count(2).allows(2));
            assert!(!Iterations::Count(0).allows(0));
            assert!(Iterations::Unbounded.allows(u64::MAX));
        }

        #[test]
        fn test_parse() {
            assert_eq!("3".parse::<Iterations>().unwrap(), Iterations::Count(3));
            assert_eq!("forever".parse::<Iterations>().unwrap(), Iterations::Unbounded);
            assert!("-1".parse::<Iterations>().is_err());
        }
    }

    mod document_tests {
        use super::*;

        #[test]
        fn test_from_yaml() {
            let yaml = r"
plans: [smoke, soak]
iterations: forever
sleep: 0.5
seed: nightly
continueOnFailure: true
hookTimeout: 2
";
            let opts = EngineOptions::from_yaml_str(yaml).unwrap();
            assert_eq!(
                opts.scenario,
                Scenario::Plans(vec!["smoke".to_string(), "soak".to_string()])
            );
            assert_eq!(opts.iterations, Iterations::Unbounded);
            assert_eq!(opts.sleep, Duration::from_millis(500));
            assert_eq!(opts.seed, Some(Seed::from_phrase("nightly")));
            assert!(opts.continue_on_failure());
            assert_eq!(opts.hook_timeout, Some(Duration::from_secs(2)));
        }

        #[test]
        fn test_inline_json() {
            let json = r#"{"actors": {"alice": "user"}, "actions": [["alice", "noop"]], "iterations": 3, "seed": 7}"#;
            let opts = EngineOptions::from_yaml_str(json).unwrap();
            assert_eq!(opts.iterations, Iterations::Count(3));
            assert_eq!(opts.seed, Some(Seed::from_u64(7)));
        }

        #[test]
        fn test_quoted_numeric_seed_matches_cli_parsing() {
            let opts = EngineOptions::from_yaml_str("plans: [a]\nseed: \"42\"\n").unwrap();
            assert_eq!(opts.seed, Some(Seed::from_u64(42)));
            assert_eq!(opts.seed, "42".parse().ok());
        }

        #[test]
        fn test_rejects_unknown_fields_and_negative_sleep() {
            assert!(EngineOptions::from_yaml_str("plans: [a]\nbogus: 1\n").is_err());
            assert!(EngineOptions::from_yaml_str("plans: [a]\nsleep: -1\n").is_err());
        }
    }
}
