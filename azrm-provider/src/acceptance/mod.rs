//! Step runner for acceptance tests.
//!
//! Drives one resource through a sequence of configurations the way an
//! orchestrator would: apply, read back, assert. Import steps re-read the
//! resource without prior state and compare it with the tracked state. The
//! resource is destroyed after the last step, also when a step fails.

mod check;

pub use check::{Check, KeyCheck};

use thiserror::Error;
use tracing::info;

use crate::error::ProviderError;
use crate::reconciler::Reconciler;
use crate::resource::Resource;
use crate::state::ResourceData;

#[derive(Debug, Error)]
pub enum AcceptanceError {
    #[error("step {step}: {source}")]
    Step {
        step: usize,
        #[source]
        source: ProviderError,
    },

    #[error("step {step}: check failed: {message}")]
    Check { step: usize, message: String },

    #[error("step {step}: resource disappeared after apply")]
    Vanished { step: usize },

    #[error("step {step}: no resource to import")]
    NothingToImport { step: usize },

    #[error("step {step}: imported state differs: {}", .differences.join("; "))]
    ImportMismatch {
        step: usize,
        differences: Vec<String>,
    },

    #[error("destroying {id}: {source}")]
    Destroy {
        id: String,
        #[source]
        source: ProviderError,
    },

    #[error("{id} still exists after destroy")]
    StillExists { id: String },
}

#[derive(Debug, Clone)]
pub enum TestStep {
    /// Apply a configuration, then run the checks.
    Config {
        desired: ResourceData,
        checks: Vec<Check>,
    },
    /// Import by id and compare, ignoring the listed keys.
    Import { ignore: Vec<String> },
}

impl TestStep {
    pub fn config(desired: ResourceData) -> Self {
        TestStep::Config {
            desired,
            checks: Vec::new(),
        }
    }

    pub fn import(ignore: &[&str]) -> Self {
        TestStep::Import {
            ignore: ignore.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Add a check; has no effect on import steps.
    pub fn check(mut self, check: Check) -> Self {
        if let TestStep::Config { checks, .. } = &mut self {
            checks.push(check);
        }
        self
    }
}

/// A sequence of steps against one resource.
pub struct ResourceTest<'a, R: Resource> {
    reconciler: &'a Reconciler<R>,
    steps: Vec<TestStep>,
}

impl<'a, R: Resource> ResourceTest<'a, R> {
    pub fn new(reconciler: &'a Reconciler<R>, steps: Vec<TestStep>) -> Self {
        Self { reconciler, steps }
    }

    /// Run every step and destroy the resource. Returns the state after each
    /// config step.
    pub async fn run(self) -> Result<Vec<ResourceData>, AcceptanceError> {
        let mut id = None;
        let outcome = self.run_steps(&mut id).await;

        if let Some(id) = id {
            let destroyed = self.destroy(&id).await;
            // A step failure is more useful than a cleanup failure.
            outcome.and_then(|states| destroyed.map(|_| states))
        } else {
            outcome
        }
    }

    async fn run_steps(
        &self,
        id: &mut Option<String>,
    ) -> Result<Vec<ResourceData>, AcceptanceError> {
        let mut states = Vec::new();
        let mut tracked: Option<ResourceData> = None;

        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            match step {
                TestStep::Config { desired, checks } => {
                    info!("Acceptance step {}: apply", n);
                    let applied = self.apply(n, desired, id.as_deref()).await?;
                    *id = Some(applied.clone());

                    let state = self
                        .reconciler
                        .read(&applied, Some(desired))
                        .await
                        .map_err(|source| AcceptanceError::Step { step: n, source })?
                        .ok_or(AcceptanceError::Vanished { step: n })?;

                    for check in checks {
                        check
                            .evaluate(self.reconciler, &applied, &state)
                            .await
                            .map_err(|message| AcceptanceError::Check { step: n, message })?;
                    }

                    tracked = Some(state.clone());
                    states.push(state);
                }
                TestStep::Import { ignore } => {
                    info!("Acceptance step {}: import", n);
                    let (Some(current_id), Some(current)) = (id.as_deref(), tracked.as_ref())
                    else {
                        return Err(AcceptanceError::NothingToImport { step: n });
                    };

                    let imported = self
                        .reconciler
                        .read(current_id, None)
                        .await
                        .map_err(|source| AcceptanceError::Step { step: n, source })?
                        .ok_or(AcceptanceError::NothingToImport { step: n })?;

                    let differences = diff(current, &imported, ignore);
                    if !differences.is_empty() {
                        return Err(AcceptanceError::ImportMismatch {
                            step: n,
                            differences,
                        });
                    }
                }
            }
        }
        Ok(states)
    }

    /// Create, update, or replace when an immutable attribute changed.
    async fn apply(
        &self,
        step: usize,
        desired: &ResourceData,
        existing: Option<&str>,
    ) -> Result<String, AcceptanceError> {
        let wrap = |source| AcceptanceError::Step { step, source };

        match self.reconciler.create_or_update(desired, existing).await {
            Err(ProviderError::RequiresReplacement { id, attributes }) => {
                info!("Replacing {} ({} changed)", id, attributes.join(", "));
                self.reconciler.delete(&id).await.map_err(wrap)?;
                self.reconciler
                    .create_or_update(desired, None)
                    .await
                    .map_err(wrap)
            }
            other => other.map_err(wrap),
        }
    }

    async fn destroy(&self, id: &str) -> Result<(), AcceptanceError> {
        info!("Acceptance: destroying {}", id);
        let destroy = |source| AcceptanceError::Destroy {
            id: id.to_string(),
            source,
        };
        self.reconciler.delete(id).await.map_err(destroy)?;
        if self.reconciler.exists(id).await.map_err(destroy)? {
            return Err(AcceptanceError::StillExists { id: id.to_string() });
        }
        Ok(())
    }
}

fn ignored(key: &str, ignore: &[String]) -> bool {
    ignore.iter().any(|i| {
        key == i
            || key
                .strip_prefix(i.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Flat-map differences between `expected` and `actual`.
fn diff(expected: &ResourceData, actual: &ResourceData, ignore: &[String]) -> Vec<String> {
    let expected = expected.flatten();
    let actual = actual.flatten();

    let mut keys: Vec<&String> = expected.keys().chain(actual.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|k| !ignored(k, ignore))
        .filter_map(|k| match (expected.get(k), actual.get(k)) {
            (a, b) if a == b => None,
            (a, b) => Some(format!("{k}: {a:?} != {b:?}")),
        })
        .collect()
}
