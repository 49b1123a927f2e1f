//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order, collecting
//! the results. This is where side effects actually occur. Tracked states are
//! updated in place as each Effect runs, including the partial state left by a
//! failed Effect, so the caller can persist them whatever the outcome.

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resource::{ResourceId, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Replace succeeded
    Replaced { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(
        &self,
        plan: &Plan,
        tracked: &mut HashMap<ResourceId, State>,
    ) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            let result = self.execute_effect(effect, tracked).await;

            match &result {
                Ok(_) => success_count += 1,
                Err(e) => {
                    log::warn!("{}", e);
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(
        &self,
        effect: &Effect,
        tracked: &mut HashMap<ResourceId, State>,
    ) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Read(resource) => {
                let state = self.provider.lookup(resource).await?;
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let mut state = tracked
                    .remove(&resource.id)
                    .unwrap_or_else(|| State::not_found(resource.id.clone()));
                let result = self.provider.create(resource, &mut state).await;
                let state = keep(tracked, state);
                result.map(|()| EffectOutcome::Created { state })
            }
            Effect::Update {
                id,
                from,
                to,
                changed,
            } => {
                let mut state = tracked.remove(id).unwrap_or_else(|| from.clone());
                let result = self.provider.update(to, changed, &mut state).await;
                let state = keep(tracked, state);
                result.map(|()| EffectOutcome::Updated { state })
            }
            Effect::Replace {
                id,
                from,
                to,
                forced_by,
            } => {
                log::info!("replacing {} ({} changed)", id, forced_by.join(", "));
                let mut state = tracked.remove(id).unwrap_or_else(|| from.clone());
                if let Err(e) = self.provider.delete(&mut state).await {
                    keep(tracked, state);
                    return Err(e);
                }
                let result = self.provider.create(to, &mut state).await;
                let state = keep(tracked, state);
                result.map(|()| EffectOutcome::Replaced { state })
            }
            Effect::Delete(from) => {
                let mut state = tracked
                    .remove(&from.id)
                    .unwrap_or_else(|| from.clone());
                let result = self.provider.delete(&mut state).await;
                keep(tracked, state);
                result.map(|()| EffectOutcome::Deleted {
                    id: from.id.clone(),
                })
            }
        }
    }

    /// Re-read every tracked resource. States whose entity vanished are
    /// dropped so the next plan recreates them. Returns the failed reads.
    pub async fn refresh(
        &self,
        tracked: &mut HashMap<ResourceId, State>,
    ) -> Vec<ProviderError> {
        let mut errors = Vec::new();
        let mut ids: Vec<ResourceId> = tracked.keys().cloned().collect();
        ids.sort();

        for id in ids {
            let Some(state) = tracked.get_mut(&id) else {
                continue;
            };
            if let Err(e) = self.provider.read(state).await {
                errors.push(e);
                continue;
            }
            if !state.exists {
                tracked.remove(&id);
            }
        }

        errors
    }
}

/// Track `state` again if it still refers to a remote entity
fn keep(tracked: &mut HashMap<ResourceId, State>, state: State) -> State {
    if state.identifier.is_some() {
        tracked.insert(state.id.clone(), state.clone());
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BoxFuture, ErrorKind, ResourceType};
    use crate::resource::Resource;

    struct TestProvider;

    impl Provider for TestProvider {
        fn name(&self) -> &'static str {
            "test"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            vec![]
        }

        fn read<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                if state.id.name == "vanished" {
                    state.clear();
                }
                Ok(())
            })
        }

        fn lookup<'a>(&'a self, resource: &'a Resource) -> BoxFuture<'a, ProviderResult<State>> {
            let state = State::existing(resource.id.clone(), resource.attributes.clone())
                .with_identifier("fr-par-1/lookup-id");
            Box::pin(async move { Ok(state) })
        }

        fn create<'a>(
            &'a self,
            resource: &'a Resource,
            state: &'a mut State,
        ) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                state.identifier = Some("fr-par-1/test-id".to_string());
                if resource.id.name == "slow" {
                    return Err(ProviderError::timeout("still provisioning"));
                }
                state.attributes = resource.attributes.clone();
                state.exists = true;
                Ok(())
            })
        }

        fn update<'a>(
            &'a self,
            to: &'a Resource,
            _changed: &'a [String],
            state: &'a mut State,
        ) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                state.attributes = to.attributes.clone();
                Ok(())
            })
        }

        fn delete<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async move {
                state.clear();
                Ok(())
            })
        }

        fn import<'a>(
            &'a self,
            id: &'a ResourceId,
            identifier: &'a str,
        ) -> BoxFuture<'a, ProviderResult<State>> {
            let state = State::existing(id.clone(), HashMap::new()).with_identifier(identifier);
            Box::pin(async move { Ok(state) })
        }
    }

    fn existing(name: &str) -> State {
        State::existing(ResourceId::new("test", name), HashMap::new())
            .with_identifier(format!("fr-par-1/{}", name))
    }

    #[tokio::test]
    async fn apply_empty_plan() {
        let interpreter = Interpreter::new(TestProvider);
        let plan = Plan::new();
        let result = interpreter.apply(&plan, &mut HashMap::new()).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test]
    async fn apply_create_effect_tracks_state() {
        let interpreter = Interpreter::new(TestProvider);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));
        let mut tracked = HashMap::new();

        let result = interpreter.apply(&plan, &mut tracked).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 1);
        assert!(tracked[&ResourceId::new("test", "example")].exists);
    }

    #[tokio::test]
    async fn failed_create_keeps_partial_state() {
        let interpreter = Interpreter::new(TestProvider);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "slow")));
        plan.add(Effect::Create(Resource::new("test", "never-reached")));
        let mut tracked = HashMap::new();

        let result = interpreter.apply(&plan, &mut tracked).await;

        assert_eq!(result.failure_count, 1);
        assert_eq!(result.outcomes.len(), 1);
        match &result.outcomes[0] {
            Err(e) => assert_eq!(e.kind(), ErrorKind::Timeout),
            Ok(outcome) => panic!("Expected failure, got {:?}", outcome),
        }
        assert_eq!(
            tracked[&ResourceId::new("test", "slow")].identifier.as_deref(),
            Some("fr-par-1/test-id")
        );
        assert!(!tracked[&ResourceId::new("test", "slow")].exists);
        assert!(!tracked.contains_key(&ResourceId::new("test", "never-reached")));
    }

    #[tokio::test]
    async fn continue_on_error_runs_remaining_effects() {
        let config = InterpreterConfig {
            continue_on_error: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(TestProvider).with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "slow")));
        plan.add(Effect::Create(Resource::new("test", "fast")));

        let result = interpreter.apply(&plan, &mut HashMap::new()).await;

        assert_eq!(result.failure_count, 1);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn delete_and_replace_update_tracked_states() {
        let interpreter = Interpreter::new(TestProvider);
        let mut tracked = HashMap::from([
            (ResourceId::new("test", "old"), existing("old")),
            (ResourceId::new("test", "web"), existing("web")),
        ]);
        let mut plan = Plan::new();
        plan.add(Effect::Delete(existing("old")));
        plan.add(Effect::Replace {
            id: ResourceId::new("test", "web"),
            from: existing("web"),
            to: Resource::new("test", "web"),
            forced_by: vec!["image".to_string()],
        });

        let result = interpreter.apply(&plan, &mut tracked).await;

        assert!(result.is_success());
        assert!(!tracked.contains_key(&ResourceId::new("test", "old")));
        assert_eq!(
            tracked[&ResourceId::new("test", "web")].identifier.as_deref(),
            Some("fr-par-1/test-id")
        );
        assert!(matches!(
            result.outcomes[1],
            Ok(EffectOutcome::Replaced { .. })
        ));
    }

    #[tokio::test]
    async fn dry_run_skips_effects() {
        let config = InterpreterConfig {
            dry_run: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(TestProvider).with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));
        let mut tracked = HashMap::new();

        let result = interpreter.apply(&plan, &mut tracked).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Skipped { .. })
        ));
        assert!(tracked.is_empty());
    }

    #[tokio::test]
    async fn refresh_drops_vanished_resources() {
        let interpreter = Interpreter::new(TestProvider);
        let mut tracked = HashMap::from([
            (ResourceId::new("test", "vanished"), existing("vanished")),
            (ResourceId::new("test", "kept"), existing("kept")),
        ]);

        let errors = interpreter.refresh(&mut tracked).await;

        assert!(errors.is_empty());
        assert_eq!(tracked.len(), 1);
        assert!(tracked.contains_key(&ResourceId::new("test", "kept")));
    }
}
