//! Deployment plans: the static step graphs the queue engine runs.
//!
//! A plan is an ordered list of steps where every dependency refers to an
//! earlier step, so the graph is acyclic by construction. Plans are only
//! ever built from validated requests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterSpec;
use crate::error::CoreError;
use crate::job_slot::JobSlot;
use crate::types::JobOptions;
use crate::vm_name::validate_vm_name;

/// Upper bound on the number of steps in a plan.
pub const MAX_PLAN_STEPS: usize = 8;

/// Single-VM deployment form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VmDeployRequest {
    pub vm_name: String,
    pub join_domain: bool,
    pub install_sql: bool,
}

/// Which form a deployment was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentKind {
    Vm,
    Cluster,
}

/// One job trigger in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Unique within the plan, e.g. `domain-join-node2`.
    pub key: String,
    pub label: String,
    pub slot: JobSlot,
    pub options: JobOptions,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    pub kind: DeploymentKind,
    /// Short description, e.g. the VM or cluster name.
    pub target: String,
    pub steps: Vec<PlanStep>,
}

impl PlanStep {
    fn new(key: impl Into<String>, slot: JobSlot, options: JobOptions) -> Self {
        Self {
            key: key.into(),
            label: slot.label().to_string(),
            slot,
            options,
            depends_on: Vec::new(),
        }
    }

    fn labelled(mut self, suffix: &str) -> Self {
        self.label = format!("{} \"{suffix}\"", self.label);
        self
    }

    fn after(mut self, keys: &[&str]) -> Self {
        self.depends_on = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}

/// Options for every per-host job.
pub fn vm_options(vm_name: &str) -> JobOptions {
    JobOptions::from([("vm_name".to_string(), vm_name.to_string())])
}

impl DeploymentPlan {
    /// Build the single-VM plan:
    /// provision -> domain join -> SQL install -> SQL config.
    ///
    /// Later stages are optional; SQL install requires the domain join.
    pub fn for_vm(req: &VmDeployRequest) -> Result<Self, CoreError> {
        let vm_name = validate_vm_name("vmName", &req.vm_name)?;
        if req.install_sql && !req.join_domain {
            return Err(CoreError::Validation(
                "installSql requires joinDomain".into(),
            ));
        }

        let opts = vm_options(&vm_name);
        let mut steps =
            vec![PlanStep::new("provision", JobSlot::Job1, opts.clone()).labelled(&vm_name)];

        if req.join_domain {
            steps.push(
                PlanStep::new("domain-join", JobSlot::Job2, opts.clone()).after(&["provision"]),
            );
        }
        if req.install_sql {
            steps.push(
                PlanStep::new("sql-install", JobSlot::Job3, opts.clone()).after(&["domain-join"]),
            );
            steps.push(PlanStep::new("sql-config", JobSlot::Job4, opts).after(&["sql-install"]));
        }

        let plan = Self {
            kind: DeploymentKind::Vm,
            target: vm_name,
            steps,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Build the two-node cluster plan. Each node runs its own
    /// provision -> domain join -> SQL install chain in parallel with the
    /// other; the cluster setup job waits for both chains.
    pub fn for_cluster(spec: &ClusterSpec) -> Result<Self, CoreError> {
        let mut steps = Vec::with_capacity(7);

        for (i, node) in spec.nodes().into_iter().enumerate() {
            let n = i + 1;
            let opts = vm_options(node);
            let provision = format!("provision-node{n}");
            let join = format!("domain-join-node{n}");

            steps.push(PlanStep::new(&provision, JobSlot::Job5, opts.clone()).labelled(node));
            steps.push(
                PlanStep::new(&join, JobSlot::Job6, opts.clone())
                    .labelled(node)
                    .after(&[provision.as_str()]),
            );
            steps.push(
                PlanStep::new(format!("sql-install-node{n}"), JobSlot::Job8, opts)
                    .labelled(node)
                    .after(&[join.as_str()]),
            );
        }

        steps.push(
            PlanStep::new("cluster-setup", JobSlot::Job7, spec.job_options())
                .labelled(&spec.cluster_name)
                .after(&["sql-install-node1", "sql-install-node2"]),
        );

        let plan = Self {
            kind: DeploymentKind::Cluster,
            target: spec.cluster_name.clone(),
            steps,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Check the structural invariants: bounded size, unique keys, and
    /// dependencies that only point backwards.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.steps.is_empty() {
            return Err(CoreError::Validation("Plan has no steps".into()));
        }
        if self.steps.len() > MAX_PLAN_STEPS {
            return Err(CoreError::Validation(format!(
                "Plan has {} steps, at most {MAX_PLAN_STEPS} are allowed",
                self.steps.len()
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            for dep in &step.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(CoreError::Validation(format!(
                        "Step '{}' depends on '{dep}', which is not an earlier step",
                        step.key
                    )));
                }
            }
            if !seen.insert(step.key.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Duplicate step key '{}'",
                    step.key
                )));
            }
        }
        Ok(())
    }

    /// Index of the step with the given key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::cluster::ClusterDeployRequest;

    fn vm(name: &str, join_domain: bool, install_sql: bool) -> VmDeployRequest {
        VmDeployRequest {
            vm_name: name.into(),
            join_domain,
            install_sql,
        }
    }

    fn keys(plan: &DeploymentPlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.key.as_str()).collect()
    }

    fn cluster_spec() -> ClusterSpec {
        ClusterDeployRequest {
            node1_name: "sqlnode01".into(),
            node2_name: "sqlnode02".into(),
            cluster_name: "SQLCLUSTER01".into(),
            cluster_ip: "10.0.0.50".into(),
            ag_name: "AG-SQL01".into(),
            listener_name: "SQLAG-LSN".into(),
            listener_ip: "10.0.0.51".into(),
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn provision_only() {
        let plan = DeploymentPlan::for_vm(&vm("WinProto02", false, false)).unwrap();
        assert_eq!(keys(&plan), ["provision"]);
        assert_eq!(plan.target, "winproto02");
        assert_eq!(plan.steps[0].options["vm_name"], "winproto02");
        assert_eq!(plan.steps[0].label, "Provision VM \"winproto02\"");
    }

    #[test]
    fn full_vm_chain_is_sequential() {
        let plan = DeploymentPlan::for_vm(&vm("web01", true, true)).unwrap();
        assert_eq!(keys(&plan), ["provision", "domain-join", "sql-install", "sql-config"]);
        let slots: Vec<_> = plan.steps.iter().map(|s| s.slot).collect();
        assert_eq!(slots, [JobSlot::Job1, JobSlot::Job2, JobSlot::Job3, JobSlot::Job4]);
        assert_eq!(plan.steps[3].depends_on, ["sql-install"]);
    }

    #[test]
    fn sql_without_domain_join_is_rejected() {
        assert_matches!(
            DeploymentPlan::for_vm(&vm("web01", false, true)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn invalid_vm_name_is_rejected() {
        assert_matches!(
            DeploymentPlan::for_vm(&vm("", true, false)),
            Err(CoreError::Validation(msg)) if msg == "vmName is required"
        );
    }

    #[test]
    fn cluster_plan_fans_out_and_rejoins() {
        let plan = DeploymentPlan::for_cluster(&cluster_spec()).unwrap();
        assert_eq!(plan.steps.len(), 7);
        assert_eq!(plan.kind, DeploymentKind::Cluster);

        let roots: Vec<_> = plan
            .steps
            .iter()
            .filter(|s| s.depends_on.is_empty())
            .map(|s| s.key.as_str())
            .collect();
        assert_eq!(roots, ["provision-node1", "provision-node2"]);

        let setup = &plan.steps[plan.position("cluster-setup").unwrap()];
        assert_eq!(setup.slot, JobSlot::Job7);
        assert_eq!(setup.depends_on, ["sql-install-node1", "sql-install-node2"]);
        assert_eq!(setup.options["listener_ip"], "10.0.0.51");

        let join2 = &plan.steps[plan.position("domain-join-node2").unwrap()];
        assert_eq!(join2.depends_on, ["provision-node2"]);
        assert_eq!(join2.options["vm_name"], "sqlnode02");
    }

    #[test]
    fn forward_dependency_is_rejected() {
        let mut plan = DeploymentPlan::for_vm(&vm("web01", true, false)).unwrap();
        plan.steps[0].depends_on = vec!["domain-join".into()];
        assert_matches!(plan.validate(), Err(CoreError::Validation(msg)) if msg.contains("not an earlier step"));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut plan = DeploymentPlan::for_vm(&vm("web01", true, false)).unwrap();
        plan.steps[1].key = "provision".into();
        plan.steps[1].depends_on.clear();
        assert_matches!(plan.validate(), Err(CoreError::Validation(msg)) if msg.contains("Duplicate"));
    }

    #[test]
    fn oversized_plan_is_rejected() {
        let mut plan = DeploymentPlan::for_cluster(&cluster_spec()).unwrap();
        for i in 0..2 {
            let mut extra = plan.steps[0].clone();
            extra.key = format!("extra-{i}");
            plan.steps.push(extra);
        }
        assert_matches!(plan.validate(), Err(CoreError::Validation(msg)) if msg.contains("at most 8"));
    }
}
