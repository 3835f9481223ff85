//! Two-node failover cluster request with SQL Always-On settings.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::JobOptions;
use crate::vm_name::validate_vm_name;

/// Raw cluster form as submitted by the console.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDeployRequest {
    pub node1_name: String,
    pub node2_name: String,
    pub cluster_name: String,
    pub cluster_ip: String,
    pub ag_name: String,
    pub listener_name: String,
    pub listener_ip: String,
}

/// A cluster request that passed validation, with names normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub node1_name: String,
    pub node2_name: String,
    pub cluster_name: String,
    pub cluster_ip: Ipv4Addr,
    pub ag_name: String,
    pub listener_name: String,
    pub listener_ip: Ipv4Addr,
}

impl ClusterDeployRequest {
    /// Check every field in form order; the first failing rule is reported.
    pub fn validate(&self) -> Result<ClusterSpec, CoreError> {
        let node1_name = validate_vm_name("node1Name", &self.node1_name)?;
        let node2_name = validate_vm_name("node2Name", &self.node2_name)?;
        if node1_name == node2_name {
            return Err(CoreError::Validation(
                "node1Name and node2Name must be different".into(),
            ));
        }

        let cluster_name = require_non_blank("clusterName", &self.cluster_name)?;
        let cluster_ip = parse_ipv4("clusterIp", &self.cluster_ip)?;
        let ag_name = require_non_blank("agName", &self.ag_name)?;
        let listener_name = require_non_blank("listenerName", &self.listener_name)?;
        let listener_ip = parse_ipv4("listenerIp", &self.listener_ip)?;
        if listener_ip == cluster_ip {
            return Err(CoreError::Validation(
                "listenerIp must differ from clusterIp".into(),
            ));
        }

        Ok(ClusterSpec {
            node1_name,
            node2_name,
            cluster_name,
            cluster_ip,
            ag_name,
            listener_name,
            listener_ip,
        })
    }
}

impl ClusterSpec {
    /// Node hostnames in order.
    pub fn nodes(&self) -> [&str; 2] {
        [&self.node1_name, &self.node2_name]
    }

    /// Options for the cluster setup job (job7).
    pub fn job_options(&self) -> JobOptions {
        JobOptions::from([
            ("node1_name".to_string(), self.node1_name.clone()),
            ("node2_name".to_string(), self.node2_name.clone()),
            ("cluster_name".to_string(), self.cluster_name.clone()),
            ("cluster_ip".to_string(), self.cluster_ip.to_string()),
            ("ag_name".to_string(), self.ag_name.clone()),
            ("listener_name".to_string(), self.listener_name.clone()),
            ("listener_ip".to_string(), self.listener_ip.to_string()),
        ])
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn parse_ipv4(field: &str, value: &str) -> Result<Ipv4Addr, CoreError> {
    value.trim().parse::<Ipv4Addr>().map_err(|_| {
        CoreError::Validation(format!(
            "{field} must be a dotted IPv4 address (e.g. 10.0.0.50)"
        ))
    })
}
