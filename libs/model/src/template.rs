//! Job templates.
//!
//! A job template is the immutable description of how to run one unit of
//! work: image, resource reservation, parameterized command, timeout,
//! secret bindings, and execution identity. Templates are created once
//! at deployment time; a change means a new template revision.
//!
//! # Parameter references
//!
//! Command arguments may reference declared parameters with the textual
//! placeholder form `Ref::<name>`. The substrate resolves placeholders
//! at job-submission time from caller-supplied values, falling back to
//! the template's declared default.

use std::collections::BTreeMap;
use std::time::Duration;

use spotgrid_id::{IdentityName, TemplateName};

use crate::error::ValidationError;
use crate::image::ImageSource;
use crate::tier::Reservation;
use crate::vault::SecretRef;

/// Prefix marking a command argument as a parameter reference.
const PARAM_REF_PREFIX: &str = "Ref::";

/// Maximum environment variable name length in bytes.
const MAX_ENV_VAR_LENGTH: usize = 256;

/// One command argument: literal text or an unresolved parameter
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    Literal(String),
    ParamRef(String),
}

impl CommandArg {
    /// Parse an argument, recognizing the `Ref::<name>` placeholder form.
    pub fn parse(arg: &str) -> Result<Self, ValidationError> {
        match arg.strip_prefix(PARAM_REF_PREFIX) {
            Some("") => Err(ValidationError::InvalidParameterRef {
                arg: arg.to_string(),
            }),
            Some(name) => Ok(CommandArg::ParamRef(name.to_string())),
            None => Ok(CommandArg::Literal(arg.to_string())),
        }
    }
}

impl std::fmt::Display for CommandArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandArg::Literal(s) => write!(f, "{}", s),
            CommandArg::ParamRef(name) => write!(f, "{}{}", PARAM_REF_PREFIX, name),
        }
    }
}

/// A secret injected into the job's environment.
///
/// The secret value reaches the container only through the substrate's
/// environment injection; it is never written into the template
/// definition itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretBinding {
    /// Target environment variable name.
    pub env_var: String,

    /// Full reference to the vault secret, key included.
    pub secret: SecretRef,
}

/// The immutable description of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTemplate {
    name: TemplateName,
    image: ImageSource,
    vcpus: u32,
    memory_mib: u32,
    parameters: BTreeMap<String, String>,
    command: Vec<CommandArg>,
    timeout: Duration,
    secret_bindings: Vec<SecretBinding>,
    execution_identity: Option<IdentityName>,
    read_only_root: bool,
}

impl JobTemplate {
    /// Start building a template.
    #[must_use]
    pub fn builder(name: TemplateName, image: ImageSource) -> JobTemplateBuilder {
        JobTemplateBuilder::new(name, image)
    }

    /// The template's stable name.
    #[must_use]
    pub fn name(&self) -> &TemplateName {
        &self.name
    }

    /// The image to execute.
    #[must_use]
    pub fn image(&self) -> &ImageSource {
        &self.image
    }

    /// Reserved vCPUs.
    #[must_use]
    pub fn vcpus(&self) -> u32 {
        self.vcpus
    }

    /// Reserved memory in MiB.
    #[must_use]
    pub fn memory_mib(&self) -> u32 {
        self.memory_mib
    }

    /// The resource reservation a tier must satisfy to admit this job.
    #[must_use]
    pub fn reservation(&self) -> Reservation {
        Reservation {
            vcpus: self.vcpus,
            memory_mib: self.memory_mib,
        }
    }

    /// Declared parameters and their defaults.
    #[must_use]
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// The parsed command template.
    #[must_use]
    pub fn command(&self) -> &[CommandArg] {
        &self.command
    }

    /// Timeout after which a running instance is forcibly terminated.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Secret bindings, in declaration order.
    #[must_use]
    pub fn secret_bindings(&self) -> &[SecretBinding] {
        &self.secret_bindings
    }

    /// The execution identity reference, if bound.
    #[must_use]
    pub fn execution_identity(&self) -> Option<&IdentityName> {
        self.execution_identity.as_ref()
    }

    /// Whether the container's root filesystem is mounted read-only.
    #[must_use]
    pub fn read_only_root(&self) -> bool {
        self.read_only_root
    }

    /// Resolve the command with caller-supplied parameter values.
    ///
    /// Missing overrides fall back to the declared defaults. Every
    /// referenced parameter is known to exist; the builder rejects
    /// undeclared references.
    #[must_use]
    pub fn resolve_command(&self, overrides: &BTreeMap<String, String>) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| match arg {
                CommandArg::Literal(s) => s.clone(),
                CommandArg::ParamRef(name) => overrides
                    .get(name)
                    .or_else(|| self.parameters.get(name))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Builder for [`JobTemplate`].
///
/// Defaults: 1 vCPU, 512 MiB, read-only root filesystem, no parameters,
/// no secrets, no identity. The timeout has no default and must be set.
#[derive(Debug)]
pub struct JobTemplateBuilder {
    name: TemplateName,
    image: ImageSource,
    vcpus: u32,
    memory_mib: u32,
    parameters: BTreeMap<String, String>,
    command: Vec<String>,
    timeout: Option<Duration>,
    secret_bindings: Vec<SecretBinding>,
    execution_identity: Option<IdentityName>,
    read_only_root: bool,
}

impl JobTemplateBuilder {
    /// Start a builder with the required image reference.
    #[must_use]
    pub fn new(name: TemplateName, image: ImageSource) -> Self {
        Self {
            name,
            image,
            vcpus: 1,
            memory_mib: 512,
            parameters: BTreeMap::new(),
            command: Vec::new(),
            timeout: None,
            secret_bindings: Vec::new(),
            execution_identity: None,
            read_only_root: true,
        }
    }

    /// Set the vCPU reservation.
    #[must_use]
    pub fn vcpus(mut self, vcpus: u32) -> Self {
        self.vcpus = vcpus;
        self
    }

    /// Set the memory reservation in MiB.
    #[must_use]
    pub fn memory_mib(mut self, memory_mib: u32) -> Self {
        self.memory_mib = memory_mib;
        self
    }

    /// Declare a parameter with its default value.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, default: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), default.into());
        self
    }

    /// Set the command template.
    #[must_use]
    pub fn command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the instance timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bind a secret to an environment variable.
    #[must_use]
    pub fn secret(mut self, env_var: impl Into<String>, secret: SecretRef) -> Self {
        self.secret_bindings.push(SecretBinding {
            env_var: env_var.into(),
            secret,
        });
        self
    }

    /// Reference the execution identity the job runs as.
    #[must_use]
    pub fn execution_identity(mut self, identity: IdentityName) -> Self {
        self.execution_identity = Some(identity);
        self
    }

    /// Toggle the read-only root filesystem.
    #[must_use]
    pub fn read_only_root(mut self, read_only: bool) -> Self {
        self.read_only_root = read_only;
        self
    }

    /// Validate and build the immutable template.
    pub fn build(self) -> Result<JobTemplate, ValidationError> {
        if self.vcpus == 0 {
            return Err(ValidationError::ZeroVcpus);
        }
        if self.memory_mib == 0 {
            return Err(ValidationError::ZeroMemory);
        }

        let timeout = self.timeout.ok_or(ValidationError::MissingTimeout)?;
        if timeout.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }

        if self.command.is_empty() {
            return Err(ValidationError::EmptyCommand);
        }

        for name in self.parameters.keys() {
            validate_parameter_name(name)?;
        }

        let mut command = Vec::with_capacity(self.command.len());
        for arg in &self.command {
            let parsed = CommandArg::parse(arg)?;
            if let CommandArg::ParamRef(name) = &parsed {
                if !self.parameters.contains_key(name) {
                    return Err(ValidationError::UnknownParameter { name: name.clone() });
                }
            }
            command.push(parsed);
        }

        let mut seen_env = std::collections::BTreeSet::new();
        for binding in &self.secret_bindings {
            validate_env_var(&binding.env_var)?;
            if !seen_env.insert(binding.env_var.as_str()) {
                return Err(ValidationError::DuplicateEnvVar {
                    name: binding.env_var.clone(),
                });
            }
        }

        Ok(JobTemplate {
            name: self.name,
            image: self.image,
            vcpus: self.vcpus,
            memory_mib: self.memory_mib,
            parameters: self.parameters,
            command,
            timeout,
            secret_bindings: self.secret_bindings,
            execution_identity: self.execution_identity,
            read_only_root: self.read_only_root,
        })
    }
}

/// Validate an environment variable name.
fn validate_env_var(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::InvalidEnvVar {
            name: name.to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }

    if name.len() > MAX_ENV_VAR_LENGTH {
        return Err(ValidationError::InvalidEnvVar {
            name: name.to_string(),
            reason: format!("name exceeds {} bytes", MAX_ENV_VAR_LENGTH),
        });
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(ValidationError::InvalidEnvVar {
            name: name.to_string(),
            reason: "name must start with a letter or underscore".to_string(),
        });
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(ValidationError::InvalidEnvVar {
                name: name.to_string(),
                reason: format!("invalid character '{}'", c),
            });
        }
    }

    Ok(())
}

/// Parameter names share the environment-variable charset.
fn validate_parameter_name(name: &str) -> Result<(), ValidationError> {
    validate_env_var(name).map_err(|e| match e {
        ValidationError::InvalidEnvVar { name, reason } => {
            ValidationError::InvalidParameterName { name, reason }
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotgrid_id::Srn;

    fn name(s: &str) -> TemplateName {
        TemplateName::new(s).unwrap()
    }

    fn image() -> ImageSource {
        ImageSource::new("robofarm/batch-starter", "latest").unwrap()
    }

    fn secret(n: &str) -> SecretRef {
        SecretRef::new(Srn::new("acct", "region", "secret", n))
    }

    #[test]
    fn test_build_minimal() {
        let template = JobTemplate::builder(name("starter-task"), image())
            .command(["run.sh"])
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap();

        assert_eq!(template.vcpus(), 1);
        assert_eq!(template.memory_mib(), 512);
        assert!(template.read_only_root());
        assert_eq!(template.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_rejects_zero_resources() {
        let result = JobTemplate::builder(name("t"), image())
            .vcpus(0)
            .command(["run.sh"])
            .timeout(Duration::from_secs(1))
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::ZeroVcpus);

        let result = JobTemplate::builder(name("t"), image())
            .memory_mib(0)
            .command(["run.sh"])
            .timeout(Duration::from_secs(1))
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::ZeroMemory);
    }

    #[test]
    fn test_rejects_missing_or_zero_timeout() {
        let result = JobTemplate::builder(name("t"), image())
            .command(["run.sh"])
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::MissingTimeout);

        let result = JobTemplate::builder(name("t"), image())
            .command(["run.sh"])
            .timeout(Duration::ZERO)
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::ZeroTimeout);
    }

    #[test]
    fn test_rejects_empty_command() {
        let result = JobTemplate::builder(name("t"), image())
            .timeout(Duration::from_secs(1))
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::EmptyCommand);
    }

    #[test]
    fn test_rejects_undeclared_parameter() {
        let result = JobTemplate::builder(name("t"), image())
            .command(["run.sh", "Ref::Missing"])
            .timeout(Duration::from_secs(1))
            .build();
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UnknownParameter {
                name: "Missing".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_empty_parameter_ref() {
        let result = JobTemplate::builder(name("t"), image())
            .command(["Ref::"])
            .timeout(Duration::from_secs(1))
            .build();
        assert!(matches!(
            result,
            Err(ValidationError::InvalidParameterRef { .. })
        ));
    }

    #[test]
    fn test_resolve_command_with_override_and_default() {
        let template = JobTemplate::builder(name("t"), image())
            .parameter("MyParam", "")
            .command(["run.sh", "Ref::MyParam"])
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap();

        let mut overrides = BTreeMap::new();
        overrides.insert("MyParam".to_string(), "x".to_string());
        assert_eq!(
            template.resolve_command(&overrides),
            vec!["run.sh".to_string(), "x".to_string()]
        );

        assert_eq!(
            template.resolve_command(&BTreeMap::new()),
            vec!["run.sh".to_string(), String::new()]
        );
    }

    #[test]
    fn test_rejects_invalid_env_var() {
        let result = JobTemplate::builder(name("t"), image())
            .command(["run.sh"])
            .timeout(Duration::from_secs(1))
            .secret("9BAD", secret("api-key"))
            .build();
        assert!(matches!(result, Err(ValidationError::InvalidEnvVar { .. })));

        let result = JobTemplate::builder(name("t"), image())
            .command(["run.sh"])
            .timeout(Duration::from_secs(1))
            .secret("MY-SECRET", secret("api-key"))
            .build();
        assert!(matches!(result, Err(ValidationError::InvalidEnvVar { .. })));
    }

    #[test]
    fn test_rejects_duplicate_env_var() {
        let result = JobTemplate::builder(name("t"), image())
            .command(["run.sh"])
            .timeout(Duration::from_secs(1))
            .secret("MY_SECRET", secret("a"))
            .secret("MY_SECRET", secret("b"))
            .build();
        assert!(matches!(
            result,
            Err(ValidationError::DuplicateEnvVar { .. })
        ));
    }

    #[test]
    fn test_command_arg_display_roundtrip() {
        let arg = CommandArg::parse("Ref::MyParam").unwrap();
        assert_eq!(arg, CommandArg::ParamRef("MyParam".to_string()));
        assert_eq!(arg.to_string(), "Ref::MyParam");

        let arg = CommandArg::parse("run.sh").unwrap();
        assert_eq!(arg.to_string(), "run.sh");
    }
}
