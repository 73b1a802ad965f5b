//! Postmortem generation and outcome persistence tests

use pretty_assertions::assert_eq;
use remedy_core::{
    Category, Evidence, IncidentId, IncidentStore, InMemoryStore, OutcomeStatus, RemediationRun,
    RunId, RunStatus, Severity, StepRecord, StepResult, VerificationStatus,
};
use remedy_postmortem::{build_postmortem, outcome_key, PostmortemError, PostmortemGenerator};
use remedy_test_utils::{alb, at, classification, evidence, incident, seeded_store, verification};
use serde_json::json;
use std::sync::Arc;

const INCIDENT: IncidentId = IncidentId::from_u128(1);
const KEY: &str = "deploy:prod";

fn signals() -> Vec<Evidence> {
    vec![
        evidence(1, INCIDENT, verification(VerificationStatus::Failed, Some("prod"))),
        evidence(2, INCIDENT, alb("unhealthy")),
    ]
}

fn step(step_id: &str, output: serde_json::Value) -> StepRecord {
    StepRecord {
        step_id: step_id.to_string(),
        idempotency_key: format!("{step_id}:{KEY}:x"),
        result: StepResult::ok(output),
        reused: false,
    }
}

fn verified_run(id: u128, created: i64) -> RemediationRun {
    let mut run = RemediationRun::planned(INCIDENT, "verify-deployment", "1.0.0", "v1", at(created))
        .with_id(RunId::from_u128(id));
    run.steps.push(step(
        "run-verification",
        json!({ "status": "SUCCESS", "env": "prod", "reportHash": "abc" }),
    ));
    run.steps.push(step(
        "ingest-incident-update",
        json!({ "currentStatus": "MITIGATED", "previousStatus": "OPEN", "reportHash": "abc" }),
    ));
    run.finish(RunStatus::Succeeded, at(created + 1));
    run
}

fn failed_run(id: u128, created: i64) -> RemediationRun {
    let mut run = RemediationRun::planned(INCIDENT, "redispatch-workflow", "1.0.0", "v1", at(created))
        .with_id(RunId::from_u128(id));
    run.finish(RunStatus::Failed, at(created));
    run
}

fn generator(store: &Arc<InMemoryStore>) -> PostmortemGenerator {
    PostmortemGenerator::new(store.clone(), "v1")
}

#[tokio::test]
async fn second_generation_returns_existing_record() {
    let closed = incident(KEY, Severity::Red).closed(at(45));
    let store = seeded_store(&closed, &signals());
    let generator = generator(&store);
    let class = classification(Category::DeployVerificationFailed);
    let runs = vec![verified_run(10, 5)];

    let first = generator
        .generate_at(&closed, &signals(), Some(&class), &runs, at(50))
        .await
        .unwrap();
    let second = generator
        .generate_at(&closed, &signals(), Some(&class), &runs, at(90))
        .await
        .unwrap();

    assert!(first.is_new);
    assert!(!second.is_new);
    assert_eq!(first.outcome_record.id, second.outcome_record.id);
    assert_eq!(
        first.postmortem.content_hash().unwrap(),
        second.postmortem.content_hash().unwrap()
    );
    assert_ne!(first.postmortem.generated_at, second.postmortem.generated_at);
    assert_eq!(
        first.postmortem.stable_value().unwrap(),
        second.postmortem.stable_value().unwrap()
    );
    assert_eq!(store.outcome_count(), 1);
}

#[tokio::test]
async fn resolved_incident_document() {
    let closed = incident(KEY, Severity::Red).closed(at(45));
    let store = seeded_store(&closed, &signals());
    let class = classification(Category::DeployVerificationFailed);
    let runs = vec![verified_run(10, 5), failed_run(11, 2)];

    let generated = generator(&store)
        .generate_at(&closed, &signals(), Some(&class), &runs, at(50))
        .await
        .unwrap();
    let pm = &generated.postmortem;

    assert!(pm.outcome.resolved);
    assert!(pm.outcome.auto_fixed);
    assert_eq!(pm.outcome.mttr_minutes, Some(45));
    assert_eq!(pm.verification.report_hash.as_deref(), Some("abc"));
    assert_eq!(pm.verification.status.as_deref(), Some("SUCCESS"));
    assert_eq!(pm.impact.environments, vec!["prod".to_string()]);
    let attempted: Vec<&str> = pm
        .remediation
        .attempted_playbooks
        .iter()
        .map(|p| p.playbook_id.as_str())
        .collect();
    assert_eq!(attempted, vec!["redispatch-workflow", "verify-deployment"]);
    assert_eq!(
        pm.learnings.facts,
        vec![
            "severity: RED",
            "status: CLOSED",
            "Evidence collected: 2 items",
            "Evidence kind observed: alb",
            "Evidence kind observed: verification",
            "Classified as DEPLOY_VERIFICATION_FAILED (high confidence)",
            "Playbook redispatch-workflow@1.0.0: FAILED",
            "Playbook verify-deployment@1.0.0: SUCCEEDED",
            "Remediated automatically",
            "Time to resolve: 45 minutes",
            "Verification report: abc",
        ]
    );
    assert!(pm.learnings.unknowns.is_empty());

    let record = &generated.outcome_record;
    assert_eq!(record.outcome_key, outcome_key(KEY));
    assert_eq!(record.entity_type, "incident");
    assert_eq!(record.entity_id, INCIDENT.to_string());
    assert_eq!(record.status, OutcomeStatus::Resolved);
    assert_eq!(record.lawbook_version, "v1");
    assert_eq!(record.postmortem_hash, pm.content_hash().unwrap());
    assert_eq!(
        record.metrics_json,
        json!({
            "mttrMinutes": 45,
            "autoFixed": true,
            "resolved": true,
            "evidenceCount": 2,
            "remediationAttempts": 2,
        })
    );
    assert_eq!(
        record.source_refs["runIds"],
        json!([RunId::from_u128(10), RunId::from_u128(11)])
    );
}

#[tokio::test]
async fn open_incident_without_context_lists_unknowns() {
    let open = incident(KEY, Severity::Yellow);
    let store = seeded_store(&open, &[]);

    let generated = generator(&store)
        .generate_at(&open, &[], None, &[], at(5))
        .await
        .unwrap();

    assert_eq!(
        generated.postmortem.learnings.unknowns,
        vec![
            "Root cause: Not classified",
            "No remediation attempted",
            "Incident deploy:prod not yet resolved",
        ]
    );
    assert_eq!(generated.postmortem.outcome.mttr_minutes, None);
    assert!(!generated.postmortem.outcome.auto_fixed);
    assert_eq!(generated.outcome_record.status, OutcomeStatus::Unresolved);
}

#[test]
fn input_order_does_not_change_hash() {
    let closed = incident(KEY, Severity::Red).closed(at(45));
    let class = classification(Category::AlbTargetUnhealthy);
    let mut evidence = signals();
    let mut runs = vec![verified_run(10, 5), failed_run(11, 2)];

    let a = build_postmortem(&closed, &evidence, Some(&class), &runs, at(50));
    evidence.reverse();
    runs.reverse();
    let b = build_postmortem(&closed, &evidence, Some(&class), &runs, at(51));

    assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
}

#[tokio::test]
async fn changed_state_creates_new_record() {
    let open = incident(KEY, Severity::Red);
    let store = seeded_store(&open, &signals());
    let generator = generator(&store);

    let before = generator.generate_at(&open, &signals(), None, &[], at(10)).await.unwrap();
    let closed = open.clone().closed(at(30));
    let after = generator.generate_at(&closed, &signals(), None, &[], at(31)).await.unwrap();

    assert!(before.is_new && after.is_new);
    assert_ne!(before.outcome_record.postmortem_hash, after.outcome_record.postmortem_hash);
    assert_eq!(store.outcome_count(), 2);
}

#[tokio::test]
async fn foreign_evidence_is_rejected() {
    let open = incident(KEY, Severity::Red);
    let store = seeded_store(&open, &[]);
    let stray = vec![evidence(9, IncidentId::from_u128(2), alb("unhealthy"))];

    let err = generator(&store)
        .generate_at(&open, &stray, None, &[], at(1))
        .await
        .unwrap_err();
    assert!(matches!(err, PostmortemError::ForeignRecord { kind: "evidence", .. }));
    assert_eq!(store.outcome_count(), 0);
}

#[tokio::test]
async fn generates_from_stored_state() {
    let closed = incident(KEY, Severity::Red)
        .with_classification(classification(Category::DeployVerificationFailed))
        .closed(at(20));
    let store = seeded_store(&closed, &signals());
    store.upsert_run(&verified_run(10, 5)).await.unwrap();

    let generated = generator(&store).generate_for_incident(INCIDENT).await.unwrap();

    assert!(generated.is_new);
    assert_eq!(generated.postmortem.detection.evidence_count, 2);
    assert_eq!(
        generated.postmortem.detection.category,
        Some(Category::DeployVerificationFailed)
    );
    assert_eq!(generated.postmortem.references.runs, vec![RunId::from_u128(10)]);
    assert_eq!(
        store.find_outcome(&outcome_key(KEY), &generated.outcome_record.postmortem_hash)
            .await
            .unwrap()
            .map(|r| r.id),
        Some(generated.outcome_record.id)
    );
}

#[tokio::test]
async fn store_failure_surfaces_as_retryable() {
    let open = incident(KEY, Severity::Red);
    let store = seeded_store(&open, &[]);
    store.set_fail_writes(true);

    let err = generator(&store)
        .generate_at(&open, &[], None, &[], at(1))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}
