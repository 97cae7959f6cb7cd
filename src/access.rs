//! Role-based gate in front of every service operation
use crate::config::AccessConfig;
use crate::error::RequestError;
use crate::projection::ProjectionMode;
use crate::types::Idir;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Submitter,
    Reviewer,
}

/// Authenticated caller as handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub idir: Option<Idir>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(Principal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    GetById,
    GetByIdir,
    Create,
    UpdateState,
}

/// Decides whether a caller may run an operation. Implementations must not
/// look at stored records, so a refusal reveals nothing about them.
pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, caller: &Caller, operation: Operation) -> Result<(), RequestError>;

    /// Projection used for the collection endpoint.
    fn list_mode(&self, caller: &Caller, requested: ProjectionMode) -> ProjectionMode;
}

/// Production gate: trusts the role claim carried by the principal.
#[derive(Debug, Clone)]
pub struct RoleClaimPolicy {
    allow_anonymous_create: bool,
}

/// Lets every caller through and honours whatever projection is asked for.
/// Only ever constructed by test harnesses.
#[derive(Debug, Clone, Default)]
pub struct PermissiveAccessPolicy;

impl Principal {
    pub fn new(subject: &str, role: Role) -> Self {
        Self {
            subject: subject.to_owned(),
            idir: None,
            role,
        }
    }
    pub fn with_idir(mut self, idir: Idir) -> Self {
        self.idir = Some(idir);
        self
    }
    /// Build a principal from decoded token claims. The reviewer role may
    /// appear in either the client roles or the realm roles.
    pub fn from_claims(claims: &Value, config: &AccessConfig) -> Result<Self, RequestError> {
        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|sub| !sub.is_empty())
            .ok_or(RequestError::Forbidden("authenticate"))?;

        let idir = claims
            .get("idir_user_guid")
            .and_then(Value::as_str)
            .and_then(|raw| Idir::parse(raw).ok());

        let client_roles = claims.get("client_roles");
        let realm_roles = claims.pointer("/realm_access/roles");
        let is_reviewer = [client_roles, realm_roles]
            .into_iter()
            .flatten()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
            .any(|role| role == config.reviewer_role);

        Ok(Self {
            subject: subject.to_owned(),
            idir,
            role: if is_reviewer {
                Role::Reviewer
            } else {
                Role::Submitter
            },
        })
    }
}

impl Caller {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(principal) => Some(principal),
        }
    }
    pub fn is_reviewer(&self) -> bool {
        self.principal()
            .is_some_and(|principal| principal.role == Role::Reviewer)
    }
    /// Name used in log lines.
    pub fn subject(&self) -> &str {
        self.principal()
            .map(|principal| principal.subject.as_str())
            .unwrap_or("anonymous")
    }
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::GetById => "get_by_id",
            Operation::GetByIdir => "get_by_idir",
            Operation::Create => "create",
            Operation::UpdateState => "update_state",
        }
    }
}

impl RoleClaimPolicy {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            allow_anonymous_create: config.allow_anonymous_create,
        }
    }
}

impl AccessPolicy for RoleClaimPolicy {
    fn authorize(&self, caller: &Caller, operation: Operation) -> Result<(), RequestError> {
        let allowed = match (operation, caller) {
            (Operation::Create, Caller::Anonymous) => self.allow_anonymous_create,
            (_, Caller::Anonymous) => false,
            (Operation::UpdateState, Caller::Authenticated(principal)) => {
                principal.role == Role::Reviewer
            }
            (_, Caller::Authenticated(_)) => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(RequestError::Forbidden(operation.as_str()))
        }
    }

    fn list_mode(&self, caller: &Caller, requested: ProjectionMode) -> ProjectionMode {
        match requested {
            ProjectionMode::Full if caller.is_reviewer() => ProjectionMode::Full,
            _ => ProjectionMode::Minimal,
        }
    }
}

impl AccessPolicy for PermissiveAccessPolicy {
    fn authorize(&self, _: &Caller, _: Operation) -> Result<(), RequestError> {
        Ok(())
    }

    fn list_mode(&self, _: &Caller, requested: ProjectionMode) -> ProjectionMode {
        requested
    }
}
