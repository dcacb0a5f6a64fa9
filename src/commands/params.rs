// src/commands/params.rs

//! Value types nested inside built-in command parameters, and the closed sets of strings
//! some parameters accept.

use crate::core::presence::is_absent;
use serde::{Deserialize, Serialize};

closed_set! {
    /// Where `host.create` provisions its hosts.
    pub enum CloudProvider as "provider" {
        Ec2 => "ec2",
        Docker => "docker",
    }
}

closed_set! {
    /// Who may see an object uploaded by `s3.put`.
    pub enum S3Visibility as "visibility" {
        Public => "public",
        Private => "private",
        Signed => "signed",
        None => "none",
    }
}

closed_set! {
    /// Lifetime of hosts created by `host.create`.
    pub enum HostScope as "scope" {
        Task => "task",
        Build => "build",
    }
}

closed_set! {
    /// Language harness used by `subprocess.scripting`.
    pub enum ScriptingHarness as "harness" {
        Python => "python",
        Python2 => "python2",
        Golang => "golang",
        Roswell => "roswell",
    }
}

closed_set! {
    /// Archive format of the `archive.*` operations. `auto` detects the format and is only
    /// valid when extracting.
    pub enum ArchiveFormat as "format" {
        Zip => "zip",
        Tarball => "tarball",
        Auto => "auto",
    }
}

impl Default for ArchiveFormat {
    fn default() -> Self {
        ArchiveFormat::Tarball
    }
}

closed_set! {
    /// Output format read by the `gotest.parse_*` operations.
    pub enum GoTestFormat as "format" {
        Legacy => "legacy",
        Json => "json",
    }
}

impl Default for GoTestFormat {
    fn default() -> Self {
        GoTestFormat::Legacy
    }
}

/// One `key`/`value` entry, as used by `expansions.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueParam {
    /// Expansion name.
    pub key: String,
    /// Expansion value.
    pub value: String,
}

impl KeyValueParam {
    /// Creates an entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A bucket and a path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Location {
    /// Bucket name.
    pub bucket: String,
    /// Object path.
    pub path: String,
}

impl S3Location {
    /// Creates a location.
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }
}

/// One copy performed by `s3Copy.copy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3CopyFile {
    /// Where the object is read from.
    pub source: S3Location,
    /// Where the object is written to.
    pub destination: S3Location,
    /// Name of the copy in the task's artifacts.
    #[serde(default, skip_serializing_if = "is_absent")]
    pub display_name: Option<String>,
    /// Restricts the copy to these variants.
    #[serde(default, skip_serializing_if = "is_absent")]
    pub build_variants: Vec<String>,
    /// Whether a missing source is tolerated.
    #[serde(default, skip_serializing_if = "is_absent")]
    pub optional: Option<bool>,
}

impl S3CopyFile {
    /// Copies `source` to `destination`.
    pub fn new(source: S3Location, destination: S3Location) -> Self {
        Self {
            source,
            destination,
            display_name: None,
            build_variants: Vec::new(),
            optional: None,
        }
    }
}

/// A block device attached to an ec2 host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbsDevice {
    pub device_name: String,
    pub ebs_iops: u64,
    pub ebs_size: u64,
    pub ebs_snapshot_id: String,
}

/// Credentials of a private container registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    pub registry_name: String,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub registry_username: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub registry_password: Option<String>,
}

/// Test selection for `subprocess.scripting` runs that use `test_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingTestOptions {
    #[serde(default, skip_serializing_if = "is_absent")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub count: Option<u64>,
}

/// A timeout given either as seconds or as an expansion resolved by the CI service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutValue {
    /// A literal number of seconds.
    Seconds(u64),
    /// An expansion such as `${timeout_secs}`.
    Expansion(String),
}

impl From<u64> for TimeoutValue {
    fn from(secs: u64) -> Self {
        TimeoutValue::Seconds(secs)
    }
}

impl From<&str> for TimeoutValue {
    fn from(expansion: &str) -> Self {
        TimeoutValue::Expansion(expansion.to_string())
    }
}

crate::always_present!(
    KeyValueParam,
    S3Location,
    S3CopyFile,
    EbsDevice,
    RegistrySettings,
    ScriptingTestOptions,
    TimeoutValue,
);
