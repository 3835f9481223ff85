use std::collections::BTreeMap;

/// Options passed to a Rundeck job run, keyed by option name.
///
/// A `BTreeMap` keeps the serialized order stable, which makes request
/// bodies and log lines deterministic.
pub type JobOptions = BTreeMap<String, String>;

/// Rundeck execution identifiers are positive integers.
pub type ExecutionId = i64;
