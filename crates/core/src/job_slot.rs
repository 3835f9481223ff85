//! Catalogue of the pre-existing Rundeck jobs the console can trigger.
//!
//! Each slot is bound to a Rundeck job UUID at startup (`JOB1_ID` ..
//! `JOB8_ID`). Slots are addressed on the wire by their `jobN` key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSlot {
    /// Provision a standalone VM (Terraform).
    Job1,
    /// DNS registration and domain join for a standalone VM (Ansible).
    Job2,
    /// SQL Server install on a standalone VM.
    Job3,
    /// SQL Server post-install configuration on a standalone VM.
    Job4,
    /// Provision one cluster node (Terraform).
    Job5,
    /// DNS registration and domain join for one cluster node.
    Job6,
    /// Failover cluster and SQL Always-On availability group setup.
    Job7,
    /// SQL Server install on one cluster node.
    Job8,
}

impl JobSlot {
    pub const ALL: [JobSlot; 8] = [
        JobSlot::Job1,
        JobSlot::Job2,
        JobSlot::Job3,
        JobSlot::Job4,
        JobSlot::Job5,
        JobSlot::Job6,
        JobSlot::Job7,
        JobSlot::Job8,
    ];

    /// 1-based slot number, matching the `JOBn_ID` environment variable.
    pub fn number(self) -> u8 {
        match self {
            JobSlot::Job1 => 1,
            JobSlot::Job2 => 2,
            JobSlot::Job3 => 3,
            JobSlot::Job4 => 4,
            JobSlot::Job5 => 5,
            JobSlot::Job6 => 6,
            JobSlot::Job7 => 7,
            JobSlot::Job8 => 8,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|slot| slot.number() == n)
    }

    /// Wire key, e.g. `"job3"`.
    pub fn key(self) -> String {
        format!("job{}", self.number())
    }

    /// Human-readable description shown next to a running step.
    pub fn label(self) -> &'static str {
        match self {
            JobSlot::Job1 => "Provision VM",
            JobSlot::Job2 => "Post-config (DNS + domain join)",
            JobSlot::Job3 => "Install SQL Server",
            JobSlot::Job4 => "Configure SQL Server",
            JobSlot::Job5 => "Provision cluster node",
            JobSlot::Job6 => "Cluster node post-config (DNS + domain join)",
            JobSlot::Job7 => "Failover cluster + SQL Always On",
            JobSlot::Job8 => "Install SQL Server on cluster node",
        }
    }

    /// Whether this slot takes the full cluster option set instead of a
    /// single `vm_name`.
    pub fn takes_cluster_options(self) -> bool {
        self == JobSlot::Job7
    }
}

impl fmt::Display for JobSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job{}", self.number())
    }
}

impl FromStr for JobSlot {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("job")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(Self::from_number)
            .ok_or_else(|| CoreError::Validation(format!("Unknown job slot '{s}'")))
    }
}
