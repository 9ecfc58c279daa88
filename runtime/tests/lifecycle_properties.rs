//! Property tests over arbitrary lifecycle call sequences.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use convograph_runtime::{Credentials, LifecycleState, Orchestrator, ServerOptions};
use convograph_testing::{MockResources, ResourceKind, init_test_tracing};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

#[derive(Debug, Clone, Copy)]
enum Step {
    Init,
    Start,
    RebuildAnalytics,
    RebuildDatabase,
    RebuildMessageBus,
    Stop,
    Fail(ResourceKind, bool),
}

fn resource_kind() -> impl Strategy<Value = ResourceKind> {
    prop_oneof![
        Just(ResourceKind::Analytics),
        Just(ResourceKind::Graph),
        Just(ResourceKind::Broker),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Init),
        Just(Step::Start),
        Just(Step::RebuildAnalytics),
        Just(Step::RebuildDatabase),
        Just(Step::RebuildMessageBus),
        Just(Step::Stop),
        (resource_kind(), any::<bool>()).prop_map(|(kind, fail)| Step::Fail(kind, fail)),
    ]
}

async fn apply(orchestrator: &mut Orchestrator<MockResources>, resources: &MockResources, step: Step) {
    // Failures are part of the sequence; only the resulting handles matter.
    match step {
        Step::Init => drop(orchestrator.init().await),
        Step::Start => drop(orchestrator.start().await),
        Step::RebuildAnalytics => drop(orchestrator.rebuild_analytics_client().await),
        Step::RebuildDatabase => drop(orchestrator.rebuild_database().await),
        Step::RebuildMessageBus => drop(orchestrator.rebuild_message_bus().await),
        Step::Stop => drop(orchestrator.stop().await),
        Step::Fail(kind, fail) => resources.fail(kind, fail),
    }
}

/// Every held handle is live, every released one was released exactly once,
/// and a held coordinator is bound to the newest driver and broker.
fn check_handles(
    orchestrator: &Orchestrator<MockResources>,
    resources: &MockResources,
    step: Step,
) -> Result<(), TestCaseError> {
    let drivers = resources.drivers();
    let brokers = resources.brokers();
    let running = orchestrator.state() == LifecycleState::Running;

    for (index, driver) in drivers.iter().enumerate() {
        let held = orchestrator.has_database() && index + 1 == drivers.len();
        if held {
            prop_assert!(!driver.is_closed(), "held driver closed after {:?}", step);
        } else {
            prop_assert_eq!(driver.close_calls(), 1, "driver {} after {:?}", index, step);
        }
        let expected_sessions = if held && running { 6 } else { 0 };
        prop_assert_eq!(driver.open_sessions(), expected_sessions, "driver {} after {:?}", index, step);
    }

    for (index, broker) in brokers.iter().enumerate() {
        let held = orchestrator.has_message_bus() && index + 1 == brokers.len();
        if held {
            prop_assert!(!broker.is_closed(), "held broker closed after {:?}", step);
            prop_assert_eq!(broker.teardown_calls(), 0);
        } else {
            prop_assert_eq!(broker.teardown_calls(), 1, "broker {} after {:?}", index, step);
        }
        let expected_subscriptions = if held && running { 6 } else { 0 };
        prop_assert_eq!(broker.subscription_names().len(), expected_subscriptions);
    }

    if running {
        prop_assert!(orchestrator.has_database());
        prop_assert!(orchestrator.has_message_bus());
        prop_assert!(resources.latest_broker().unwrap().is_started());
    }
    Ok(())
}

async fn run(steps: Vec<Step>) -> Result<(), TestCaseError> {
    init_test_tracing();
    let resources = MockResources::new();
    let credentials = Credentials::new("bolt://db:7687", "neo4j", "secret").unwrap();
    let mut orchestrator = Orchestrator::with_credentials(
        ServerOptions::new(0, "amqp://broker:5672"),
        credentials,
        resources.clone(),
    );

    for step in steps {
        apply(&mut orchestrator, &resources, step).await;
        check_handles(&orchestrator, &resources, step)?;
    }

    orchestrator.stop().await;
    check_handles(&orchestrator, &resources, Step::Stop)?;
    prop_assert_eq!(orchestrator.state(), LifecycleState::Uninitialized);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn handles_are_live_or_released_once(steps in prop::collection::vec(step(), 1..16)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(run(steps))?;
    }
}
