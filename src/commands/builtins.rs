// src/commands/builtins.rs

//! # Built-in Operations
//!
//! One typed parameter struct per built-in operation. Fields are public and every struct
//! implements `Default`, so instances are usually built with a constructor for the
//! required parameters plus struct-update syntax for the rest:
//!
//! ```
//! use shrub::commands::BuiltIn;
//! use shrub::commands::builtins::ShellExec;
//!
//! let cmd = ShellExec {
//!     working_dir: Some("src".to_string()),
//!     ..ShellExec::new("make test")
//! }
//! .command()
//! .unwrap();
//! ```
//!
//! Shapes are enforced by the types. What the types cannot express (mutually exclusive or
//! co-required parameters, empty required strings) is checked by [`BuiltIn::validate`],
//! which [`BuiltIn::command`] runs before producing a [`Command`](super::Command).

use super::params::{
    ArchiveFormat, CloudProvider, EbsDevice, GoTestFormat, HostScope, KeyValueParam,
    RegistrySettings, S3CopyFile, S3Visibility, ScriptingHarness, ScriptingTestOptions,
    TimeoutValue,
};
use super::{BuiltIn, BuiltInCommand, CommandError, Operation};
use crate::core::presence::{is_absent, scalars_as_strings};
use indexmap::IndexMap;
use log::trace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Upper bound on `num_hosts` accepted by `host.create`.
pub const MAX_CREATED_HOSTS: u64 = 10;

// --- Validation helpers ---

fn invalid(operation: Operation, reason: impl Into<String>) -> CommandError {
    CommandError::InvalidParams {
        operation,
        reason: reason.into(),
    }
}

fn require_text(operation: Operation, field: &str, value: &str) -> Result<(), CommandError> {
    if value.trim().is_empty() {
        return Err(invalid(operation, format!("'{}' must not be empty", field)));
    }
    Ok(())
}

fn require_items<T>(operation: Operation, field: &str, items: &[T]) -> Result<(), CommandError> {
    if items.is_empty() {
        return Err(invalid(operation, format!("'{}' needs at least one entry", field)));
    }
    Ok(())
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn require_credentials(
    operation: Operation,
    aws_key: &Option<String>,
    aws_secret: &Option<String>,
) -> Result<(), CommandError> {
    if !is_set(aws_key) || !is_set(aws_secret) {
        return Err(invalid(operation, "both 'aws_key' and 'aws_secret' are required"));
    }
    Ok(())
}

// --- Archives ---

/// `archive.targz_extract`, `archive.zip_extract` or `archive.auto_extract`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveExtract {
    /// Selects the operation; not a parameter itself.
    #[serde(skip)]
    pub format: ArchiveFormat,
    pub path: String,
    pub destination: String,
    #[serde(skip_serializing_if = "is_absent")]
    pub exclude_files: Vec<String>,
}

impl ArchiveExtract {
    /// Extracts the archive at `path` into `destination`.
    pub fn new(format: ArchiveFormat, path: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            format,
            path: path.into(),
            destination: destination.into(),
            exclude_files: Vec::new(),
        }
    }
}

impl BuiltIn for ArchiveExtract {
    fn operation(&self) -> Operation {
        match self.format {
            ArchiveFormat::Zip => Operation::ArchiveZipExtract,
            ArchiveFormat::Tarball => Operation::ArchiveTargzExtract,
            ArchiveFormat::Auto => Operation::ArchiveAutoExtract,
        }
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_text(self.operation(), "path", &self.path)?;
        require_text(self.operation(), "destination", &self.destination)
    }
}

/// `archive.targz_pack` or `archive.zip_pack`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivePack {
    /// Selects the operation; not a parameter itself.
    #[serde(skip)]
    pub format: ArchiveFormat,
    pub target: String,
    pub source_dir: String,
    pub include: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub exclude_files: Vec<String>,
}

impl ArchivePack {
    /// Packs the files of `source_dir` matching `include` into `target`.
    pub fn new(
        format: ArchiveFormat,
        target: impl Into<String>,
        source_dir: impl Into<String>,
        include: Vec<String>,
    ) -> Self {
        Self {
            format,
            target: target.into(),
            source_dir: source_dir.into(),
            include,
            exclude_files: Vec::new(),
        }
    }
}

impl BuiltIn for ArchivePack {
    fn operation(&self) -> Operation {
        match self.format {
            ArchiveFormat::Zip => Operation::ArchiveZipPack,
            // `auto` has no pack operation and is rejected by `validate`.
            ArchiveFormat::Tarball | ArchiveFormat::Auto => Operation::ArchiveTargzPack,
        }
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        if self.format == ArchiveFormat::Auto {
            return Err(invalid(
                operation,
                "format 'auto' can only extract; pack with 'zip' or 'tarball'",
            ));
        }
        require_text(operation, "target", &self.target)?;
        require_text(operation, "source_dir", &self.source_dir)?;
        require_items(operation, "include", &self.include)
    }
}

// --- Attachments ---

/// `attach.artifacts`: attaches the JSON artifact descriptions in `files` to the task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachArtifacts {
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub optional: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_artifacts_for_spawn: Option<bool>,
}

impl BuiltIn for AttachArtifacts {
    fn operation(&self) -> Operation {
        Operation::AttachArtifacts
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_items(self.operation(), "files", &self.files)
    }
}

/// `attach.results`: attaches a JSON test result report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachResults {
    pub file_location: String,
}

impl BuiltIn for AttachResults {
    fn operation(&self) -> Operation {
        Operation::AttachResults
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_text(self.operation(), "file_location", &self.file_location)
    }
}

/// `attach.xunit_results`: attaches XUnit reports, by single path, by glob list, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachXunitResults {
    #[serde(skip_serializing_if = "is_absent")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub files: Vec<String>,
}

impl BuiltIn for AttachXunitResults {
    fn operation(&self) -> Operation {
        Operation::AttachXunitResults
    }

    fn validate(&self) -> Result<(), CommandError> {
        if !is_set(&self.file) && self.files.is_empty() {
            return Err(invalid(self.operation(), "one of 'file' or 'files' is required"));
        }
        Ok(())
    }
}

// --- Expansions ---

/// `expansions.update`: sets expansions from literal pairs and/or a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionsUpdate {
    #[serde(skip_serializing_if = "is_absent")]
    pub updates: Vec<KeyValueParam>,
    #[serde(skip_serializing_if = "is_absent")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_missing_file: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub env: Option<bool>,
}

impl BuiltIn for ExpansionsUpdate {
    fn operation(&self) -> Operation {
        Operation::ExpansionsUpdate
    }
}

/// `expansions.write`: dumps the current expansions to a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionsWrite {
    pub file: String,
    #[serde(skip_serializing_if = "is_absent")]
    pub redacted: Option<bool>,
}

impl BuiltIn for ExpansionsWrite {
    fn operation(&self) -> Operation {
        Operation::ExpansionsWrite
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_text(self.operation(), "file", &self.file)
    }
}

// --- Task generation and checkout ---

/// `generate.tasks`: adds tasks and variants described by JSON files to the running version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateTasks {
    pub files: Vec<String>,
}

impl BuiltIn for GenerateTasks {
    fn operation(&self) -> Operation {
        Operation::GenerateTasks
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_items(self.operation(), "files", &self.files)
    }
}

/// `git.get_project`: clones the project and its modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitGetProject {
    pub directory: String,
    #[serde(skip_serializing_if = "is_absent")]
    pub token: Option<String>,
    /// Module name to revision overrides.
    #[serde(deserialize_with = "scalars_as_strings", skip_serializing_if = "is_absent")]
    pub revisions: IndexMap<String, String>,
}

impl GitGetProject {
    /// Clones into `directory`.
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }
}

impl BuiltIn for GitGetProject {
    fn operation(&self) -> Operation {
        Operation::GitGetProject
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_text(self.operation(), "directory", &self.directory)
    }
}

// --- Go test results ---

/// `gotest.parse_files` or `gotest.parse_json`, depending on `format`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoTestParse {
    /// Selects the operation; not a parameter itself.
    #[serde(skip)]
    pub format: GoTestFormat,
    pub files: Vec<String>,
}

impl GoTestParse {
    /// Parses the `go test` output files matching `files`.
    pub fn new(format: GoTestFormat, files: Vec<String>) -> Self {
        Self { format, files }
    }
}

impl BuiltIn for GoTestParse {
    fn operation(&self) -> Operation {
        match self.format {
            GoTestFormat::Legacy => Operation::GotestParseFiles,
            GoTestFormat::Json => Operation::GotestParseJson,
        }
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_items(self.operation(), "files", &self.files)
    }
}

// --- Hosts ---

/// `host.create`: starts ephemeral hosts or containers for the duration of a task or build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCreate {
    #[serde(skip_serializing_if = "is_absent")]
    pub provider: Option<CloudProvider>,
    #[serde(skip_serializing_if = "is_absent")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub num_hosts: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub retries: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub scope: Option<HostScope>,
    #[serde(skip_serializing_if = "is_absent")]
    pub timeout_setup_secs: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub timeout_teardown_secs: Option<u64>,

    // ec2
    #[serde(skip_serializing_if = "is_absent")]
    pub ami: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_secret_access_key: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub distro: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ebs_block_device: Vec<EbsDevice>,
    #[serde(skip_serializing_if = "is_absent")]
    pub instance_type: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ipv6: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub security_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub spot: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub userdata_file: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub userdata_command: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub vpc_id: Option<String>,

    // docker
    #[serde(skip_serializing_if = "is_absent")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub publish_ports: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub registry: Option<RegistrySettings>,
    #[serde(skip_serializing_if = "is_absent")]
    pub background: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub container_wait_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub pool_frequency_secs: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub stdout_file_name: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub stderr_file_name: Option<String>,
    #[serde(deserialize_with = "scalars_as_strings", skip_serializing_if = "is_absent")]
    pub environment_vars: IndexMap<String, String>,
}

impl HostCreate {
    /// An ec2 host started from a distro known to the CI service.
    pub fn ec2_distro(distro: impl Into<String>) -> Self {
        Self {
            provider: Some(CloudProvider::Ec2),
            distro: Some(distro.into()),
            ..Self::default()
        }
    }

    /// An ec2 host started from an AMI in the caller's own account.
    pub fn ec2_ami(
        ami: impl Into<String>,
        instance_type: impl Into<String>,
        security_group_ids: Vec<String>,
        aws_access_key_id: impl Into<String>,
        aws_secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: Some(CloudProvider::Ec2),
            ami: Some(ami.into()),
            instance_type: Some(instance_type.into()),
            security_group_ids,
            aws_access_key_id: Some(aws_access_key_id.into()),
            aws_secret_access_key: Some(aws_secret_access_key.into()),
            ..Self::default()
        }
    }

    /// A container started from `image`.
    pub fn docker(image: impl Into<String>) -> Self {
        Self {
            provider: Some(CloudProvider::Docker),
            image: Some(image.into()),
            ..Self::default()
        }
    }

    fn validate_ec2(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        let has_key = is_set(&self.aws_access_key_id);
        let has_secret = is_set(&self.aws_secret_access_key);

        if has_key != has_secret {
            return Err(invalid(
                operation,
                "'aws_access_key_id' and 'aws_secret_access_key' must be given together",
            ));
        }

        match (is_set(&self.distro), is_set(&self.ami)) {
            (true, true) => Err(invalid(operation, "'distro' and 'ami' are mutually exclusive")),
            (false, false) => Err(invalid(operation, "one of 'distro' or 'ami' is required")),
            (true, false) => {
                if has_key {
                    return Err(invalid(
                        operation,
                        "AWS credentials cannot be used with 'distro'",
                    ));
                }
                if is_set(&self.key_name) {
                    return Err(invalid(operation, "'key_name' cannot be used with 'distro'"));
                }
                Ok(())
            }
            (false, true) => {
                if !is_set(&self.instance_type) {
                    return Err(invalid(operation, "'ami' requires 'instance_type'"));
                }
                if self.security_group_ids.is_empty() {
                    return Err(invalid(operation, "'ami' requires 'security_group_ids'"));
                }
                if !has_key {
                    return Err(invalid(
                        operation,
                        "'ami' requires 'aws_access_key_id' and 'aws_secret_access_key'",
                    ));
                }
                Ok(())
            }
        }
    }
}

impl BuiltIn for HostCreate {
    fn operation(&self) -> Operation {
        Operation::HostCreate
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        if let Some(count) = self.num_hosts {
            if count == 0 || count > MAX_CREATED_HOSTS {
                return Err(invalid(
                    operation,
                    format!("'num_hosts' must be between 1 and {}", MAX_CREATED_HOSTS),
                ));
            }
        }

        match self.provider {
            None => Err(invalid(operation, "'provider' is required")),
            Some(CloudProvider::Ec2) => self.validate_ec2(),
            Some(CloudProvider::Docker) => {
                if !is_set(&self.image) {
                    return Err(invalid(operation, "docker hosts require 'image'"));
                }
                Ok(())
            }
        }
    }
}

/// `host.list`: reports the hosts created by `host.create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostList {
    #[serde(skip_serializing_if = "is_absent")]
    pub num_hosts: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub wait: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub silent: Option<bool>,
}

impl BuiltIn for HostList {
    fn operation(&self) -> Operation {
        Operation::HostList
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.wait == Some(true) && self.num_hosts.is_none_or(|n| n == 0) {
            return Err(invalid(self.operation(), "'wait' requires a positive 'num_hosts'"));
        }
        Ok(())
    }
}

// --- Result reporting ---

/// `json.send`: stores a JSON document under `name` for the task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonSend {
    pub file: String,
    pub name: String,
}

impl BuiltIn for JsonSend {
    fn operation(&self) -> Operation {
        Operation::JsonSend
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_text(self.operation(), "file", &self.file)?;
        require_text(self.operation(), "name", &self.name)
    }
}

/// `keyval.inc`: increments a counter kept by the CI service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValInc {
    pub destination: String,
    pub key: String,
}

impl BuiltIn for KeyValInc {
    fn operation(&self) -> Operation {
        Operation::KeyValInc
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_text(self.operation(), "destination", &self.destination)?;
        require_text(self.operation(), "key", &self.key)
    }
}

/// `manifest.load`: loads module revisions from the version manifest. Takes no parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestLoad {}

impl BuiltIn for ManifestLoad {
    fn operation(&self) -> Operation {
        Operation::ManifestLoad
    }
}

/// `perf.send`: uploads performance results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfSend {
    pub file: String,
    pub aws_key: String,
    pub aws_secret: String,
    pub bucket: String,
    pub prefix: String,
    pub region: String,
}

impl BuiltIn for PerfSend {
    fn operation(&self) -> Operation {
        Operation::PerfSend
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        for (field, value) in [
            ("file", &self.file),
            ("aws_key", &self.aws_key),
            ("aws_secret", &self.aws_secret),
            ("bucket", &self.bucket),
            ("prefix", &self.prefix),
            ("region", &self.region),
        ] {
            require_text(operation, field, value)?;
        }
        Ok(())
    }
}

// --- Object storage ---

/// `s3.get`: downloads one object to a file, or extracts it into a directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Get {
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_key: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_secret: Option<String>,
    pub remote_file: String,
    pub bucket: String,
    #[serde(skip_serializing_if = "is_absent")]
    pub local_file: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub extract_to: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub build_variants: Vec<String>,
}

impl S3Get {
    /// Downloads `remote_file` from `bucket`.
    pub fn new(remote_file: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            remote_file: remote_file.into(),
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Sets both AWS credentials.
    pub fn credentials(mut self, aws_key: impl Into<String>, aws_secret: impl Into<String>) -> Self {
        self.aws_key = Some(aws_key.into());
        self.aws_secret = Some(aws_secret.into());
        self
    }
}

impl BuiltIn for S3Get {
    fn operation(&self) -> Operation {
        Operation::S3Get
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        require_credentials(operation, &self.aws_key, &self.aws_secret)?;
        require_text(operation, "remote_file", &self.remote_file)?;
        require_text(operation, "bucket", &self.bucket)?;
        if is_set(&self.local_file) == is_set(&self.extract_to) {
            return Err(invalid(
                operation,
                "exactly one of 'local_file' or 'extract_to' is required",
            ));
        }
        Ok(())
    }
}

/// `s3.put`: uploads one file, or every file matching an include filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Put {
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_key: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_secret: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub local_file: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub local_files_include_filter: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub local_files_include_filter_prefix: Option<String>,
    pub remote_file: String,
    pub bucket: String,
    pub permissions: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "is_absent")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub optional: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub visibility: Option<S3Visibility>,
}

impl S3Put {
    /// Uploads to `remote_file` in `bucket`.
    pub fn new(
        remote_file: impl Into<String>,
        bucket: impl Into<String>,
        permissions: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            remote_file: remote_file.into(),
            bucket: bucket.into(),
            permissions: permissions.into(),
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    /// Sets both AWS credentials.
    pub fn credentials(mut self, aws_key: impl Into<String>, aws_secret: impl Into<String>) -> Self {
        self.aws_key = Some(aws_key.into());
        self.aws_secret = Some(aws_secret.into());
        self
    }

    /// Uploads a single local file.
    pub fn local_file(mut self, path: impl Into<String>) -> Self {
        self.local_file = Some(path.into());
        self
    }

    /// Uploads every file matching the globs.
    pub fn include_filter(mut self, globs: Vec<String>) -> Self {
        self.local_files_include_filter = globs;
        self
    }
}

impl BuiltIn for S3Put {
    fn operation(&self) -> Operation {
        Operation::S3Put
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        require_credentials(operation, &self.aws_key, &self.aws_secret)?;
        match (is_set(&self.local_file), !self.local_files_include_filter.is_empty()) {
            (true, true) => {
                return Err(invalid(
                    operation,
                    "'local_file' and 'local_files_include_filter' are mutually exclusive",
                ));
            }
            (false, false) => {
                return Err(invalid(
                    operation,
                    "one of 'local_file' or 'local_files_include_filter' is required",
                ));
            }
            _ => {}
        }
        require_text(operation, "remote_file", &self.remote_file)?;
        require_text(operation, "bucket", &self.bucket)
    }
}

/// `s3Copy.copy`: copies objects between buckets without downloading them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Copy {
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_key: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub aws_secret: Option<String>,
    pub s3_copy_files: Vec<S3CopyFile>,
}

impl BuiltIn for S3Copy {
    fn operation(&self) -> Operation {
        Operation::S3Copy
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        require_credentials(operation, &self.aws_key, &self.aws_secret)?;
        require_items(operation, "s3_copy_files", &self.s3_copy_files)
    }
}

// --- Process execution ---

/// `shell.exec`: runs a script through a shell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellExec {
    pub script: String,
    #[serde(skip_serializing_if = "is_absent")]
    pub working_dir: Option<String>,
    #[serde(deserialize_with = "scalars_as_strings", skip_serializing_if = "is_absent")]
    pub env: IndexMap<String, String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub add_expansions_to_env: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub include_expansions_in_env: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub background: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub silent: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub continue_on_err: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub system_log: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_standard_out: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_standard_error: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub redirect_standard_error_to_output: Option<bool>,
}

impl ShellExec {
    /// Runs `script`.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }
}

impl BuiltIn for ShellExec {
    fn operation(&self) -> Operation {
        Operation::ShellExec
    }

    fn validate(&self) -> Result<(), CommandError> {
        require_text(self.operation(), "script", &self.script)
    }
}

/// `subprocess.exec`: runs a binary with arguments, or a command line split by the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubprocessExec {
    #[serde(skip_serializing_if = "is_absent")]
    pub binary: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub working_dir: Option<String>,
    #[serde(deserialize_with = "scalars_as_strings", skip_serializing_if = "is_absent")]
    pub env: IndexMap<String, String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub background: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub silent: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub continue_on_err: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub system_log: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_standard_out: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_standard_error: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub redirect_standard_error_to_output: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub add_to_path: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub add_expansions_to_env: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub include_expansions_in_env: Vec<String>,
}

impl SubprocessExec {
    /// Runs `binary` with `args`.
    pub fn binary(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: Some(binary.into()),
            args,
            ..Self::default()
        }
    }

    /// Runs a full command line.
    pub fn command_line(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..Self::default()
        }
    }
}

impl BuiltIn for SubprocessExec {
    fn operation(&self) -> Operation {
        Operation::SubprocessExec
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        match (is_set(&self.binary), is_set(&self.command)) {
            (true, true) => Err(invalid(operation, "'binary' and 'command' are mutually exclusive")),
            (false, false) => Err(invalid(operation, "one of 'binary' or 'command' is required")),
            (false, true) if !self.args.is_empty() => {
                Err(invalid(operation, "'args' can only be used with 'binary'"))
            }
            _ => Ok(()),
        }
    }
}

/// `subprocess.scripting`: runs a command or a test directory inside a managed language
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubprocessScripting {
    #[serde(skip_serializing_if = "is_absent")]
    pub harness: Option<ScriptingHarness>,
    #[serde(skip_serializing_if = "is_absent")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub test_dir: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub test_options: Option<ScriptingTestOptions>,
    #[serde(skip_serializing_if = "is_absent")]
    pub cache_duration_secs: Option<u64>,
    #[serde(skip_serializing_if = "is_absent")]
    pub cleanup_harness: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub lock_file: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub packages: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub harness_path: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub silent: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub continue_on_err: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub system_log: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_standard_out: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub ignore_standard_error: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub redirect_standard_error_to_output: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub add_to_path: Vec<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub add_expansions_to_env: Option<bool>,
    #[serde(skip_serializing_if = "is_absent")]
    pub include_expansions_in_env: Vec<String>,
}

impl SubprocessScripting {
    /// Runs `command` inside `harness`.
    pub fn command(harness: ScriptingHarness, command: impl Into<String>) -> Self {
        Self {
            harness: Some(harness),
            command: Some(command.into()),
            ..Self::default()
        }
    }

    /// Runs the tests found in `test_dir` inside `harness`.
    pub fn test_dir(harness: ScriptingHarness, test_dir: impl Into<String>) -> Self {
        Self {
            harness: Some(harness),
            test_dir: Some(test_dir.into()),
            ..Self::default()
        }
    }
}

impl BuiltIn for SubprocessScripting {
    fn operation(&self) -> Operation {
        Operation::SubprocessScripting
    }

    fn validate(&self) -> Result<(), CommandError> {
        let operation = self.operation();
        if self.harness.is_none() {
            return Err(invalid(operation, "'harness' is required"));
        }
        if is_set(&self.command) == is_set(&self.test_dir) {
            return Err(invalid(operation, "exactly one of 'command' or 'test_dir' is required"));
        }
        if self.test_options.is_some() && !is_set(&self.test_dir) {
            return Err(invalid(operation, "'test_options' requires 'test_dir'"));
        }
        Ok(())
    }
}

// --- Timeouts ---

/// `timeout.update`: changes the timeouts of the running task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutUpdate {
    #[serde(skip_serializing_if = "is_absent")]
    pub exec_timeout_secs: Option<TimeoutValue>,
    #[serde(skip_serializing_if = "is_absent")]
    pub timeout_secs: Option<TimeoutValue>,
}

impl BuiltIn for TimeoutUpdate {
    fn operation(&self) -> Operation {
        Operation::TimeoutUpdate
    }

    fn validate(&self) -> Result<(), CommandError> {
        if self.exec_timeout_secs.is_none() && self.timeout_secs.is_none() {
            return Err(invalid(
                self.operation(),
                "one of 'exec_timeout_secs' or 'timeout_secs' is required",
            ));
        }
        Ok(())
    }
}

// --- Validation of parsed commands ---

fn typed<T: DeserializeOwned>(command: &BuiltInCommand) -> Result<T, CommandError> {
    serde_yaml::from_value(Value::Mapping(command.params.clone()))
        .map_err(|e| invalid(command.command, e.to_string()))
}

/// Validates a command read from a document by decoding its parameters into the typed
/// struct of its operation and running that struct's checks.
///
/// Commands whose parameters are given through `params_yaml` are not decoded.
pub fn validate_command(command: &BuiltInCommand) -> Result<(), CommandError> {
    if command.params_yaml.is_some() {
        trace!("Skipping validation of '{}': params given as YAML text", command.command);
        return Ok(());
    }

    match command.command {
        Operation::ArchiveTargzExtract => ArchiveExtract {
            format: ArchiveFormat::Tarball,
            ..typed::<ArchiveExtract>(command)?
        }
        .validate(),
        Operation::ArchiveZipExtract => ArchiveExtract {
            format: ArchiveFormat::Zip,
            ..typed::<ArchiveExtract>(command)?
        }
        .validate(),
        Operation::ArchiveAutoExtract => ArchiveExtract {
            format: ArchiveFormat::Auto,
            ..typed::<ArchiveExtract>(command)?
        }
        .validate(),
        Operation::ArchiveTargzPack => ArchivePack {
            format: ArchiveFormat::Tarball,
            ..typed::<ArchivePack>(command)?
        }
        .validate(),
        Operation::ArchiveZipPack => ArchivePack {
            format: ArchiveFormat::Zip,
            ..typed::<ArchivePack>(command)?
        }
        .validate(),
        Operation::AttachArtifacts => typed::<AttachArtifacts>(command)?.validate(),
        Operation::AttachResults => typed::<AttachResults>(command)?.validate(),
        Operation::AttachXunitResults => typed::<AttachXunitResults>(command)?.validate(),
        Operation::ExpansionsUpdate => typed::<ExpansionsUpdate>(command)?.validate(),
        Operation::ExpansionsWrite => typed::<ExpansionsWrite>(command)?.validate(),
        Operation::GenerateTasks => typed::<GenerateTasks>(command)?.validate(),
        Operation::GitGetProject => typed::<GitGetProject>(command)?.validate(),
        Operation::GotestParseFiles | Operation::GotestParseJson => {
            typed::<GoTestParse>(command)?.validate()
        }
        Operation::HostCreate => typed::<HostCreate>(command)?.validate(),
        Operation::HostList => typed::<HostList>(command)?.validate(),
        Operation::JsonSend => typed::<JsonSend>(command)?.validate(),
        Operation::KeyValInc => typed::<KeyValInc>(command)?.validate(),
        Operation::ManifestLoad => typed::<ManifestLoad>(command)?.validate(),
        Operation::PerfSend => typed::<PerfSend>(command)?.validate(),
        Operation::S3Get => typed::<S3Get>(command)?.validate(),
        Operation::S3Put => typed::<S3Put>(command)?.validate(),
        Operation::S3Copy => typed::<S3Copy>(command)?.validate(),
        Operation::ShellExec => typed::<ShellExec>(command)?.validate(),
        Operation::SubprocessExec => typed::<SubprocessExec>(command)?.validate(),
        Operation::SubprocessScripting => typed::<SubprocessScripting>(command)?.validate(),
        Operation::TimeoutUpdate => typed::<TimeoutUpdate>(command)?.validate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, CommandType};
    use crate::commands::params::S3Location;
    use pretty_assertions::assert_eq;

    fn params_of(command: &Command) -> serde_json::Value {
        match command {
            Command::BuiltIn(builtin) => serde_json::to_value(&builtin.params).unwrap(),
            other => panic!("expected a built-in, got {:?}", other),
        }
    }

    fn reason_of(err: CommandError) -> String {
        match err {
            CommandError::InvalidParams { reason, .. } => reason,
            other => panic!("expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn test_s3_put_without_source_or_credentials_is_rejected() {
        // --- Setup ---
        let put = S3Put::new("remote/file.tgz", "bucket", "public-read", "application/x-gzip");

        // --- Execute & Assert ---
        let err = put.validate().unwrap_err();
        assert!(matches!(err, CommandError::InvalidParams { operation: Operation::S3Put, .. }));

        let creds_only = put.clone().credentials("key", "secret");
        let reason = reason_of(creds_only.validate().unwrap_err());
        assert!(reason.contains("one of 'local_file' or 'local_files_include_filter'"));
    }

    #[test]
    fn test_s3_put_with_credentials_and_single_file_passes() {
        let put = S3Put::new("remote/file.tgz", "bucket", "public-read", "application/x-gzip")
            .credentials("key", "secret")
            .local_file("file.tgz");
        assert!(put.validate().is_ok());

        let command = put.command().unwrap();
        assert_eq!(
            params_of(&command),
            serde_json::json!({
                "aws_key": "key",
                "aws_secret": "secret",
                "local_file": "file.tgz",
                "remote_file": "remote/file.tgz",
                "bucket": "bucket",
                "permissions": "public-read",
                "content_type": "application/x-gzip"
            })
        );
    }

    #[test]
    fn test_s3_put_rejects_both_sources() {
        let put = S3Put::new("r", "b", "private", "text/plain")
            .credentials("key", "secret")
            .local_file("one.txt")
            .include_filter(vec!["*.txt".to_string()]);
        assert!(reason_of(put.validate().unwrap_err()).contains("mutually exclusive"));
    }

    #[test]
    fn test_s3_get_requires_exactly_one_destination() {
        let get = S3Get::new("remote", "bucket").credentials("key", "secret");
        assert!(get.validate().is_err());

        let get = S3Get {
            extract_to: Some("dir".to_string()),
            ..get
        };
        assert!(get.validate().is_ok());
    }

    #[test]
    fn test_s3_copy_requires_files() {
        let copy = S3Copy {
            aws_key: Some("key".to_string()),
            aws_secret: Some("secret".to_string()),
            s3_copy_files: Vec::new(),
        };
        assert!(copy.validate().is_err());

        let copy = S3Copy {
            s3_copy_files: vec![S3CopyFile::new(
                S3Location::new("a", "x"),
                S3Location::new("b", "x"),
            )],
            ..copy
        };
        assert!(copy.validate().is_ok());
    }

    #[test]
    fn test_host_create_rules() {
        let sg = || vec!["sg-1".to_string()];
        let with = |f: fn(&mut HostCreate)| {
            let mut host = HostCreate {
                provider: Some(CloudProvider::Ec2),
                ..HostCreate::default()
            };
            f(&mut host);
            host
        };

        // Rejected combinations.
        assert!(with(|_| {}).validate().is_err());
        assert!(with(|h| {
            h.ami = Some("ami-1".into());
            h.distro = Some("rhel".into());
        })
        .validate()
        .is_err());
        assert!(with(|h| h.ami = Some("ami-1".into())).validate().is_err());
        assert!(with(|h| {
            h.ami = Some("ami-1".into());
            h.instance_type = Some("m5.xlarge".into());
        })
        .validate()
        .is_err());
        assert!(with(|h| {
            h.ami = Some("ami-1".into());
            h.instance_type = Some("m5.xlarge".into());
            h.security_group_ids = vec!["sg-1".into()];
        })
        .validate()
        .is_err());
        assert!(with(|h| {
            h.distro = Some("rhel".into());
            h.aws_access_key_id = Some("id".into());
        })
        .validate()
        .is_err());
        assert!(with(|h| {
            h.distro = Some("rhel".into());
            h.aws_access_key_id = Some("id".into());
            h.aws_secret_access_key = Some("secret".into());
        })
        .validate()
        .is_err());
        assert!(with(|h| {
            h.distro = Some("rhel".into());
            h.aws_secret_access_key = Some("secret".into());
        })
        .validate()
        .is_err());
        assert!(with(|h| {
            h.distro = Some("rhel".into());
            h.key_name = Some("key".into());
        })
        .validate()
        .is_err());

        // Accepted.
        assert!(HostCreate::ec2_distro("rhel").validate().is_ok());
        assert!(HostCreate::ec2_ami("ami-1", "m5.xlarge", sg(), "id", "secret")
            .validate()
            .is_ok());
        assert!(HostCreate::docker("mongo:7").validate().is_ok());
    }

    #[test]
    fn test_host_create_bounds_num_hosts() {
        let host = HostCreate {
            num_hosts: Some(MAX_CREATED_HOSTS + 1),
            ..HostCreate::ec2_distro("rhel")
        };
        assert!(reason_of(host.validate().unwrap_err()).contains("between 1 and 10"));

        let host = HostCreate {
            num_hosts: Some(0),
            ..HostCreate::ec2_distro("rhel")
        };
        assert!(host.validate().is_err());
    }

    #[test]
    fn test_docker_host_requires_image() {
        let host = HostCreate {
            provider: Some(CloudProvider::Docker),
            ..HostCreate::default()
        };
        assert!(host.validate().is_err());
    }

    #[test]
    fn test_archive_pack_rejects_auto() {
        let pack = ArchivePack::new(ArchiveFormat::Auto, "out.tgz", "build", vec!["*".into()]);
        assert!(reason_of(pack.validate().unwrap_err()).contains("'auto' can only extract"));

        let pack = ArchivePack::new(ArchiveFormat::Zip, "out.zip", "build", vec!["*".into()]);
        assert_eq!(pack.operation(), Operation::ArchiveZipPack);
        assert!(pack.validate().is_ok());
    }

    #[test]
    fn test_archive_extract_picks_operation_from_format() {
        let extract = ArchiveExtract::new(ArchiveFormat::Auto, "a.tgz", "out");
        assert_eq!(extract.operation(), Operation::ArchiveAutoExtract);
        assert!(extract.validate().is_ok());

        let command = extract.command().unwrap();
        assert_eq!(
            params_of(&command),
            serde_json::json!({"path": "a.tgz", "destination": "out"})
        );
    }

    #[test]
    fn test_gotest_format_selects_operation() {
        let parse = GoTestParse::new(GoTestFormat::Json, vec!["*.json".into()]);
        assert_eq!(parse.operation(), Operation::GotestParseJson);
        assert!(GoTestParse::new(GoTestFormat::Legacy, Vec::new()).validate().is_err());
    }

    #[test]
    fn test_xunit_needs_a_file() {
        assert!(AttachXunitResults::default().validate().is_err());
        let xunit = AttachXunitResults {
            files: vec!["build/*.xml".into()],
            ..AttachXunitResults::default()
        };
        assert!(xunit.validate().is_ok());
    }

    #[test]
    fn test_subprocess_exec_binary_or_command() {
        assert!(SubprocessExec::default().validate().is_err());
        assert!(SubprocessExec::binary("make", vec!["lint".into()]).validate().is_ok());
        assert!(SubprocessExec::command_line("make lint").validate().is_ok());

        let both = SubprocessExec {
            binary: Some("make".into()),
            ..SubprocessExec::command_line("make lint")
        };
        assert!(both.validate().is_err());
    }

    #[test]
    fn test_scripting_needs_exactly_one_target() {
        let neither = SubprocessScripting {
            harness: Some(ScriptingHarness::Python),
            ..SubprocessScripting::default()
        };
        assert!(neither.validate().is_err());
        assert!(
            SubprocessScripting::command(ScriptingHarness::Golang, "go test ./...")
                .validate()
                .is_ok()
        );

        let both = SubprocessScripting {
            test_dir: Some("tests".into()),
            ..SubprocessScripting::command(ScriptingHarness::Python, "pytest")
        };
        assert!(both.validate().is_err());
    }

    #[test]
    fn test_timeout_update_emits_corrected_key() {
        let update = TimeoutUpdate {
            exec_timeout_secs: Some(TimeoutValue::from(7200)),
            timeout_secs: Some(TimeoutValue::from("${idle_timeout}")),
        };
        let command = update.command().unwrap();
        assert_eq!(
            params_of(&command),
            serde_json::json!({"exec_timeout_secs": 7200, "timeout_secs": "${idle_timeout}"})
        );
        assert!(TimeoutUpdate::default().validate().is_err());
    }

    #[test]
    fn test_shell_exec_params_keep_false_and_skip_unset() {
        let mut env = IndexMap::new();
        env.insert("foo".to_string(), "true".to_string());
        let exec = ShellExec {
            env,
            continue_on_err: Some(false),
            ..ShellExec::new("make")
        };
        let command = exec.command_with_type(CommandType::Test).unwrap();

        let Command::BuiltIn(builtin) = &command else {
            panic!("expected a built-in");
        };
        assert_eq!(builtin.command_type, Some(CommandType::Test));
        assert_eq!(
            params_of(&command),
            serde_json::json!({"script": "make", "env": {"foo": "true"}, "continue_on_err": false})
        );
    }

    #[test]
    fn test_manifest_load_has_no_params() {
        let command = ManifestLoad {}.command().unwrap();
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json, serde_json::json!({"command": "manifest.load"}));
    }

    #[test]
    fn test_validate_parsed_command() {
        let ok = BuiltInCommand::new(Operation::S3Put)
            .param("aws_key", "k")
            .param("aws_secret", "s")
            .param("local_file", "f")
            .param("remote_file", "r")
            .param("bucket", "b")
            .param("permissions", "private")
            .param("content_type", "text/plain");
        assert!(validate_command(&ok).is_ok());

        let missing_source = BuiltInCommand::new(Operation::S3Put)
            .param("aws_key", "k")
            .param("aws_secret", "s");
        assert!(validate_command(&missing_source).is_err());

        let wrong_shape = BuiltInCommand::new(Operation::GenerateTasks).param("files", 3);
        assert!(validate_command(&wrong_shape).is_err());

        let tarball_pack = BuiltInCommand::new(Operation::ArchiveTargzPack)
            .param("target", "out.tgz")
            .param("source_dir", "build")
            .param("include", vec!["*"]);
        assert!(validate_command(&tarball_pack).is_ok());
    }

    #[test]
    fn test_host_list_wait_needs_hosts() {
        let waiting = HostList {
            wait: Some(true),
            ..HostList::default()
        };
        assert_eq!(
            reason_of(waiting.validate().unwrap_err()),
            "'wait' requires a positive 'num_hosts'"
        );

        let zero = HostList {
            num_hosts: Some(0),
            ..waiting.clone()
        };
        assert!(zero.validate().is_err());

        let two = HostList {
            num_hosts: Some(2),
            ..waiting
        };
        assert!(two.validate().is_ok());
        assert!(HostList::default().validate().is_ok());
    }

    #[test]
    fn test_subprocess_exec_args_need_binary() {
        let with_args = SubprocessExec {
            args: vec!["-v".into()],
            ..SubprocessExec::command_line("make lint")
        };
        assert_eq!(
            reason_of(with_args.validate().unwrap_err()),
            "'args' can only be used with 'binary'"
        );
    }

    #[test]
    fn test_scripting_test_options_need_test_dir() {
        let options = ScriptingTestOptions {
            pattern: Some("test_*".into()),
            ..ScriptingTestOptions::default()
        };
        let on_command = SubprocessScripting {
            test_options: Some(options.clone()),
            ..SubprocessScripting::command(ScriptingHarness::Python, "pytest")
        };
        assert_eq!(
            reason_of(on_command.validate().unwrap_err()),
            "'test_options' requires 'test_dir'"
        );

        let on_dir = SubprocessScripting {
            test_options: Some(options),
            ..SubprocessScripting::test_dir(ScriptingHarness::Python, "tests")
        };
        assert!(on_dir.validate().is_ok());

        let no_harness = SubprocessScripting {
            harness: None,
            ..SubprocessScripting::test_dir(ScriptingHarness::Python, "tests")
        };
        assert_eq!(reason_of(no_harness.validate().unwrap_err()), "'harness' is required");
    }

    #[test]
    fn test_required_text_fields_reject_blank_values() {
        // --- Setup ---
        let perf = PerfSend {
            file: "perf.json".into(),
            aws_key: "k".into(),
            aws_secret: "s".into(),
            bucket: "b".into(),
            prefix: "p".into(),
            region: "us-east-1".into(),
        };

        // --- Execute & Assert ---
        assert!(perf.validate().is_ok());
        let no_region = PerfSend {
            region: " ".into(),
            ..perf
        };
        assert_eq!(reason_of(no_region.validate().unwrap_err()), "'region' must not be empty");

        let json = JsonSend {
            file: "report.json".into(),
            name: String::new(),
        };
        assert_eq!(reason_of(json.validate().unwrap_err()), "'name' must not be empty");

        let counter = KeyValInc {
            destination: String::new(),
            key: "builds".into(),
        };
        assert_eq!(
            reason_of(counter.validate().unwrap_err()),
            "'destination' must not be empty"
        );

        assert_eq!(
            reason_of(ExpansionsWrite::default().validate().unwrap_err()),
            "'file' must not be empty"
        );
        assert_eq!(
            reason_of(AttachResults::default().validate().unwrap_err()),
            "'file_location' must not be empty"
        );
        assert!(
            AttachResults {
                file_location: "results.json".into()
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn test_env_tables_accept_non_string_scalars() {
        // --- Setup ---
        let env: Value = serde_yaml::from_str("fizz: true\nbuzz: 1\n").unwrap();
        let shell = BuiltInCommand::new(Operation::ShellExec)
            .param("script", "make")
            .param("env", env.clone());
        let subprocess = BuiltInCommand::new(Operation::SubprocessExec)
            .param("binary", "make")
            .param("env", env);

        // --- Execute ---
        let decoded: ShellExec = typed(&shell).unwrap();

        // --- Assert ---
        assert!(validate_command(&shell).is_ok());
        assert!(validate_command(&subprocess).is_ok());
        assert_eq!(decoded.env.get("fizz").map(String::as_str), Some("true"));
        assert_eq!(decoded.env.get("buzz").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_params_yaml_skips_decoding() {
        let command = BuiltInCommand {
            params_yaml: Some("script: ls".to_string()),
            ..BuiltInCommand::new(Operation::ShellExec)
        };
        assert!(validate_command(&command).is_ok());
    }
}
