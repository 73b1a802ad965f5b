//! Ordered classification rule table
//!
//! Rules are evaluated top to bottom; the first rule with a matching evidence
//! entry wins. Each matcher inspects one evidence payload and, on a match,
//! returns the rule-specific key facts for it.

use remedy_core::{
    Category, Confidence, EcsRef, Evidence, EvidenceRef, GithubRunRef, RunnerRef,
    VerificationStatus,
};

type Matcher = fn(&EvidenceRef) -> Option<Vec<String>>;

/// One row of the rule table
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub confidence: Confidence,
    pub labels: &'static [&'static str],
    pub summary: &'static str,
    matcher: Matcher,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("confidence", &self.confidence)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// Rule-specific facts if `evidence` satisfies this rule
    #[inline]
    #[must_use]
    pub fn evaluate(&self, evidence: &Evidence) -> Option<Vec<String>> {
        (self.matcher)(&evidence.payload)
    }

    /// Whether `evidence` satisfies this rule
    #[inline]
    #[must_use]
    pub fn matches(&self, evidence: &Evidence) -> bool {
        self.evaluate(evidence).is_some()
    }
}

/// Rule table in evaluation order
pub static RULES: [Rule; 6] = [
    Rule {
        id: "deploy-verification-failed",
        category: Category::DeployVerificationFailed,
        confidence: Confidence::High,
        labels: &["config", "infra", "needs-redeploy"],
        summary: "Post-deploy verification did not pass",
        matcher: verification_failed,
    },
    Rule {
        id: "alb-target-unhealthy",
        category: Category::AlbTargetUnhealthy,
        confidence: Confidence::High,
        labels: &["alb", "infra", "needs-investigation"],
        summary: "Load balancer target reported unhealthy",
        matcher: alb_unhealthy,
    },
    Rule {
        id: "ecs-task-crashloop",
        category: Category::EcsTaskCrashloop,
        confidence: Confidence::High,
        labels: &["code", "crashloop", "ecs", "needs-investigation"],
        summary: "Essential container exited with a non-zero code",
        matcher: ecs_crashloop,
    },
    Rule {
        id: "ecs-image-pull-failed",
        category: Category::EcsImagePullFailed,
        confidence: Confidence::High,
        labels: &["ecs", "image", "infra", "needs-redeploy"],
        summary: "Task could not pull its container image",
        matcher: ecs_image_pull,
    },
    Rule {
        id: "iam-policy-validation-failed",
        category: Category::IamPolicyValidationFailed,
        confidence: Confidence::High,
        labels: &["iam", "infra", "needs-fix", "policy"],
        summary: "IAM policy validation failed in CI",
        matcher: iam_policy_validation,
    },
    Rule {
        id: "runner-workflow-failed",
        category: Category::RunnerWorkflowFailed,
        confidence: Confidence::Medium,
        labels: &["ci", "needs-investigation", "runner"],
        summary: "CI workflow concluded with failure",
        matcher: workflow_failed,
    },
];

/// Rule table in evaluation order
#[inline]
#[must_use]
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Rule ids in evaluation order
#[must_use]
pub fn rule_ids() -> Vec<&'static str> {
    RULES.iter().map(|r| r.id).collect()
}

const CRASHLOOP_REASON: &str = "essential container in task exited";

const IMAGE_PULL_PATTERNS: &[&str] = &[
    "cannotpullcontainererror",
    "failed to pull image",
    "pull access denied",
];

const IAM_DIRECT_PATTERNS: &[&str] = &["malformedpolicydocument", "access analyzer", "accessanalyzer"];
const IAM_SUBJECTS: &[&str] = &["iam", "policy", "policies"];
const IAM_FAILURES: &[&str] = &["validat", "invalid", "malformed"];

fn contains_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

fn fact(key: &str, value: impl std::fmt::Display) -> String {
    format!("{key}={value}")
}

fn verification_failed(payload: &EvidenceRef) -> Option<Vec<String>> {
    let EvidenceRef::Verification(v) = payload else {
        return None;
    };
    if !matches!(v.status, VerificationStatus::Failed | VerificationStatus::Timeout) {
        return None;
    }
    let mut facts = vec![fact("verification.status", v.status.as_str())];
    if let Some(env) = &v.env {
        facts.push(fact("verification.env", env));
    }
    if let Some(deploy_id) = &v.deploy_id {
        facts.push(fact("verification.deployId", deploy_id));
    }
    Some(facts)
}

fn alb_unhealthy(payload: &EvidenceRef) -> Option<Vec<String>> {
    let EvidenceRef::Alb(alb) = payload else {
        return None;
    };
    let health = alb.target_health.as_deref()?;
    if !health.eq_ignore_ascii_case("unhealthy") {
        return None;
    }
    let mut facts = vec![fact("alb.targetHealth", "unhealthy")];
    if let Some(target) = &alb.target_id {
        facts.push(fact("alb.targetId", target));
    }
    if let Some(reason) = &alb.reason {
        facts.push(fact("alb.reason", reason));
    }
    Some(facts)
}

fn stopped_reason(ecs: &EcsRef) -> Option<String> {
    ecs.stopped_reason.as_deref().map(str::to_lowercase)
}

fn ecs_facts(ecs: &EcsRef) -> Vec<String> {
    let mut facts = Vec::new();
    if let Some(service) = &ecs.service {
        facts.push(fact("ecs.service", service));
    }
    if let Some(reason) = &ecs.stopped_reason {
        facts.push(fact("ecs.stoppedReason", reason));
    }
    facts
}

fn ecs_crashloop(payload: &EvidenceRef) -> Option<Vec<String>> {
    let EvidenceRef::Ecs(ecs) = payload else {
        return None;
    };
    if !stopped_reason(ecs)?.contains(CRASHLOOP_REASON) {
        return None;
    }
    // A clean exit or an unknown exit code is not a crash
    let exit_code = ecs.exit_code.filter(|c| *c != 0)?;
    let mut facts = ecs_facts(ecs);
    facts.push(fact("ecs.exitCode", exit_code));
    Some(facts)
}

fn is_manifest_not_found(reason: &str) -> bool {
    reason
        .find("manifest")
        .is_some_and(|i| reason[i..].contains("not found"))
}

fn ecs_image_pull(payload: &EvidenceRef) -> Option<Vec<String>> {
    let EvidenceRef::Ecs(ecs) = payload else {
        return None;
    };
    let reason = stopped_reason(ecs)?;
    if !(contains_any(&reason, IMAGE_PULL_PATTERNS) || is_manifest_not_found(&reason)) {
        return None;
    }
    Some(ecs_facts(ecs))
}

/// CI step fields shared by runner and workflow-run evidence
struct CiStep<'a> {
    prefix: &'static str,
    step_name: Option<&'a str>,
    message: Option<&'a str>,
    conclusion: Option<&'a str>,
}

fn ci_step(payload: &EvidenceRef) -> Option<CiStep<'_>> {
    match payload {
        EvidenceRef::Runner(RunnerRef {
            step_name,
            message,
            conclusion,
            ..
        }) => Some(CiStep {
            prefix: "runner",
            step_name: step_name.as_deref(),
            message: message.as_deref(),
            conclusion: conclusion.as_deref(),
        }),
        EvidenceRef::GithubRun(GithubRunRef {
            step_name,
            message,
            conclusion,
            ..
        }) => Some(CiStep {
            prefix: "github",
            step_name: step_name.as_deref(),
            message: message.as_deref(),
            conclusion: conclusion.as_deref(),
        }),
        _ => None,
    }
}

fn is_iam_validation(text: &str) -> bool {
    let text = text.to_lowercase();
    contains_any(&text, IAM_DIRECT_PATTERNS)
        || (contains_any(&text, IAM_SUBJECTS) && contains_any(&text, IAM_FAILURES))
}

fn iam_policy_validation(payload: &EvidenceRef) -> Option<Vec<String>> {
    let ci = ci_step(payload)?;
    let matched =
        ci.step_name.is_some_and(is_iam_validation) || ci.message.is_some_and(is_iam_validation);
    if !matched {
        return None;
    }
    let mut facts = Vec::new();
    if let Some(step) = ci.step_name {
        facts.push(fact(&format!("{}.stepName", ci.prefix), step));
    }
    if let Some(conclusion) = ci.conclusion {
        facts.push(fact(&format!("{}.conclusion", ci.prefix), conclusion));
    }
    Some(facts)
}

fn workflow_failed(payload: &EvidenceRef) -> Option<Vec<String>> {
    let ci = ci_step(payload)?;
    if !ci.conclusion.is_some_and(|c| c.eq_ignore_ascii_case("failure")) {
        return None;
    }
    let mut facts = vec![fact(&format!("{}.conclusion", ci.prefix), "failure")];
    if let Some(step) = ci.step_name {
        facts.push(fact(&format!("{}.stepName", ci.prefix), step));
    }
    if let EvidenceRef::GithubRun(run) = payload {
        if let Some(workflow) = &run.workflow {
            facts.push(fact("github.workflow", workflow));
        }
    }
    Some(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_core::{AlbRef, VerificationRef};

    fn ecs(reason: &str, exit_code: Option<i32>) -> EvidenceRef {
        EvidenceRef::Ecs(EcsRef {
            stopped_reason: Some(reason.to_string()),
            exit_code,
            ..EcsRef::default()
        })
    }

    fn runner(step: &str, conclusion: &str, message: Option<&str>) -> EvidenceRef {
        EvidenceRef::Runner(RunnerRef {
            step_name: Some(step.to_string()),
            conclusion: Some(conclusion.to_string()),
            message: message.map(str::to_string),
            ..RunnerRef::default()
        })
    }

    #[test]
    fn rule_ids_are_in_evaluation_order() {
        assert_eq!(
            rule_ids(),
            vec![
                "deploy-verification-failed",
                "alb-target-unhealthy",
                "ecs-task-crashloop",
                "ecs-image-pull-failed",
                "iam-policy-validation-failed",
                "runner-workflow-failed",
            ]
        );
    }

    #[test]
    fn labels_are_declared_sorted() {
        for rule in rules() {
            let mut sorted = rule.labels.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, rule.labels, "rule {}", rule.id);
        }
    }

    #[test]
    fn verification_matches_failed_and_timeout_only() {
        for (status, expected) in [
            (VerificationStatus::Failed, true),
            (VerificationStatus::Timeout, true),
            (VerificationStatus::Success, false),
        ] {
            let payload = EvidenceRef::Verification(VerificationRef {
                status,
                env: Some("prod".into()),
                deploy_id: None,
                report_hash: None,
                playbook_run_id: None,
            });
            assert_eq!(verification_failed(&payload).is_some(), expected);
        }
    }

    #[test]
    fn alb_health_is_case_insensitive() {
        let payload = EvidenceRef::Alb(AlbRef {
            target_health: Some("UNHEALTHY".into()),
            ..AlbRef::default()
        });
        assert!(alb_unhealthy(&payload).is_some());
        let healthy = EvidenceRef::Alb(AlbRef {
            target_health: Some("healthy".into()),
            ..AlbRef::default()
        });
        assert!(alb_unhealthy(&healthy).is_none());
    }

    #[test]
    fn crashloop_requires_nonzero_exit() {
        let reason = "Essential container in task exited";
        assert!(ecs_crashloop(&ecs(reason, Some(137))).is_some());
        assert!(ecs_crashloop(&ecs(reason, Some(0))).is_none());
        assert!(ecs_crashloop(&ecs(reason, None)).is_none());
        assert!(ecs_crashloop(&ecs("Scaling activity", Some(1))).is_none());
    }

    #[test]
    fn image_pull_patterns() {
        for reason in [
            "CannotPullContainerError: ref not found",
            "Failed to pull image nginx:nope",
            "pull access denied for repo",
            "manifest for acme/api:abc not found: manifest unknown",
        ] {
            assert!(ecs_image_pull(&ecs(reason, None)).is_some(), "{reason}");
        }
        assert!(ecs_image_pull(&ecs("not found before manifest", None)).is_none());
    }

    #[test]
    fn iam_patterns_on_step_or_message() {
        assert!(iam_policy_validation(&runner("Validate IAM policies", "failure", None)).is_some());
        assert!(iam_policy_validation(&runner(
            "deploy",
            "failure",
            Some("MalformedPolicyDocument: bad action")
        ))
        .is_some());
        assert!(iam_policy_validation(&runner("unit tests", "failure", None)).is_none());
    }

    #[test]
    fn workflow_failure_needs_failure_conclusion() {
        assert!(workflow_failed(&runner("build", "failure", None)).is_some());
        assert!(workflow_failed(&runner("build", "success", None)).is_none());
        assert!(workflow_failed(&ecs("x", Some(1))).is_none());
    }
}
