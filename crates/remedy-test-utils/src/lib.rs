//! Testing utilities for the remedy workspace
//!
//! Shared fixtures: fixed timestamps, incidents, evidence payloads and
//! seeded in-memory stores.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use remedy_core::{
    AlbRef, Category, Classification, Confidence, DeployStatusRef, EcsRef, Evidence, EvidenceId,
    EvidencePack, EvidenceRef, GithubRunRef, InMemoryStore, Incident, IncidentId, LogPointerRef,
    RunnerRef, Severity, VerificationRef, VerificationStatus,
};
use std::sync::Arc;

/// Fixed base instant plus `minutes`
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// Open incident with a fixed id, first seen at `at(0)`
pub fn incident(key: &str, severity: Severity) -> Incident {
    Incident::new(key, severity, format!("{key} degraded"), at(0)).with_id(IncidentId::from_u128(1))
}

/// Evidence with a fixed id `n`, created at `at(n)`
pub fn evidence(n: u128, incident_id: IncidentId, payload: EvidenceRef) -> Evidence {
    let minutes = i64::try_from(n).unwrap();
    Evidence::new(incident_id, payload, at(minutes))
        .unwrap()
        .with_id(EvidenceId::from_u128(n))
}

pub fn verification(status: VerificationStatus, env: Option<&str>) -> EvidenceRef {
    EvidenceRef::Verification(VerificationRef {
        status,
        env: env.map(str::to_string),
        deploy_id: None,
        report_hash: None,
        playbook_run_id: None,
    })
}

/// Verification evidence for a specific deploy
pub fn deploy_verification(status: VerificationStatus, env: &str, deploy_id: &str) -> EvidenceRef {
    EvidenceRef::Verification(VerificationRef {
        status,
        env: Some(env.to_string()),
        deploy_id: Some(deploy_id.to_string()),
        report_hash: None,
        playbook_run_id: None,
    })
}

pub fn alb(target_health: &str) -> EvidenceRef {
    EvidenceRef::Alb(AlbRef {
        target_group_arn: Some("arn:aws:elasticloadbalancing:tg/api".to_string()),
        target_id: Some("i-0abc".to_string()),
        target_health: Some(target_health.to_string()),
        reason: Some("Target.FailedHealthChecks".to_string()),
    })
}

pub fn ecs_stopped(reason: &str, exit_code: Option<i32>) -> EvidenceRef {
    EvidenceRef::Ecs(EcsRef {
        cluster: Some("prod".to_string()),
        service: Some("api".to_string()),
        task_arn: Some("arn:aws:ecs:task/prod/abc".to_string()),
        container: Some("app".to_string()),
        stopped_reason: Some(reason.to_string()),
        exit_code,
    })
}

pub fn runner(step_name: &str, conclusion: &str, message: Option<&str>) -> EvidenceRef {
    EvidenceRef::Runner(RunnerRef {
        run_id: Some(4242),
        job_name: Some("deploy".to_string()),
        step_name: Some(step_name.to_string()),
        conclusion: Some(conclusion.to_string()),
        message: message.map(str::to_string),
    })
}

/// Failed workflow run with repo coordinates
pub fn github_run(head_sha: Option<&str>, git_ref: Option<&str>) -> EvidenceRef {
    EvidenceRef::GithubRun(GithubRunRef {
        owner: Some("acme".to_string()),
        repo: Some("api".to_string()),
        workflow: Some("deploy.yml".to_string()),
        run_id: Some(100),
        head_sha: head_sha.map(str::to_string),
        git_ref: git_ref.map(str::to_string),
        conclusion: Some("failure".to_string()),
        step_name: Some("build".to_string()),
        message: None,
    })
}

pub fn deploy_status(env: &str, status: &str) -> EvidenceRef {
    EvidenceRef::DeployStatus(DeployStatusRef {
        env: env.to_string(),
        status: status.to_string(),
        deploy_id: Some("d-1".to_string()),
    })
}

pub fn log_pointer(locator: &str) -> EvidenceRef {
    EvidenceRef::LogPointer(LogPointerRef {
        source: "cloudwatch".to_string(),
        locator: locator.to_string(),
    })
}

/// Classification with no supporting evidence
pub fn classification(category: Category) -> Classification {
    Classification {
        classifier_version: "1.0.0".to_string(),
        category,
        confidence: if category == Category::Unknown {
            Confidence::Low
        } else {
            Confidence::High
        },
        labels: [category.as_str().to_ascii_lowercase()].into_iter().collect(),
        primary_evidence: None,
        evidence_pack: EvidencePack::new(format!("{category} fixture"), Vec::new(), Vec::new()),
    }
}

/// Store seeded with one incident and its evidence
pub fn seeded_store(incident: &Incident, evidence: &[Evidence]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_incident(incident.clone());
    for e in evidence {
        store.seed_evidence(e.clone());
    }
    store
}
