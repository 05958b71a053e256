//! Operation variants carried by changesets
//!
//! Every variant keeps its identifying fields typed and carries the rest of
//! its payload verbatim in `settings`. Interpreting the payload is the job
//! of the [`OperationExecutor`](crate::remote::OperationExecutor).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OperationError;
use crate::remote::OperationExecutor;

/// Free-form payload fields of an operation
pub type Settings = Map<String, Value>;

/// Realm definition for create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSpec {
    pub name: String,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSpec {
    pub realm: String,
    pub client_id: String,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRef {
    pub realm: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    pub realm: String,
    pub username: String,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub realm: String,
    pub username: String,
}

/// Realm role, group or client scope definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedSpec {
    pub realm: String,
    pub name: String,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    pub realm: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRoleSpec {
    pub realm: String,
    pub client_id: String,
    pub name: String,
    #[serde(flatten)]
    pub settings: Settings,
}

/// Role to delete; a realm role unless `client_id` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub realm: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Identity provider or authentication flow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasSpec {
    pub realm: String,
    pub alias: String,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasRef {
    pub realm: String,
    pub alias: String,
}

/// Protocol mapper attached to a client or, without `client_id`, a client scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMapperSpec {
    pub realm: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_scope_name: Option<String>,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMapperRef {
    pub realm: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_scope_name: Option<String>,
}

/// A single declarative change against the remote system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    CreateRealm(RealmSpec),
    UpdateRealm(RealmSpec),
    DeleteRealm(RealmRef),
    CreateClient(ClientSpec),
    UpdateClient(ClientSpec),
    DeleteClient(ClientRef),
    CreateUser(UserSpec),
    UpdateUser(UserSpec),
    DeleteUser(UserRef),
    CreateRealmRole(NamedSpec),
    CreateClientRole(ClientRoleSpec),
    DeleteRole(RoleRef),
    CreateGroup(NamedSpec),
    DeleteGroup(NamedRef),
    CreateClientScope(NamedSpec),
    DeleteClientScope(NamedRef),
    CreateIdentityProvider(AliasSpec),
    DeleteIdentityProvider(AliasRef),
    CreateProtocolMapper(ProtocolMapperSpec),
    DeleteProtocolMapper(ProtocolMapperRef),
    CreateAuthenticationFlow(AliasSpec),
    DeleteAuthenticationFlow(AliasRef),
}

impl Operation {
    /// Element name used in changelog documents
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreateRealm(_) => "createRealm",
            Operation::UpdateRealm(_) => "updateRealm",
            Operation::DeleteRealm(_) => "deleteRealm",
            Operation::CreateClient(_) => "createClient",
            Operation::UpdateClient(_) => "updateClient",
            Operation::DeleteClient(_) => "deleteClient",
            Operation::CreateUser(_) => "createUser",
            Operation::UpdateUser(_) => "updateUser",
            Operation::DeleteUser(_) => "deleteUser",
            Operation::CreateRealmRole(_) => "createRealmRole",
            Operation::CreateClientRole(_) => "createClientRole",
            Operation::DeleteRole(_) => "deleteRole",
            Operation::CreateGroup(_) => "createGroup",
            Operation::DeleteGroup(_) => "deleteGroup",
            Operation::CreateClientScope(_) => "createClientScope",
            Operation::DeleteClientScope(_) => "deleteClientScope",
            Operation::CreateIdentityProvider(_) => "createIdentityProvider",
            Operation::DeleteIdentityProvider(_) => "deleteIdentityProvider",
            Operation::CreateProtocolMapper(_) => "createProtocolMapper",
            Operation::DeleteProtocolMapper(_) => "deleteProtocolMapper",
            Operation::CreateAuthenticationFlow(_) => "createAuthenticationFlow",
            Operation::DeleteAuthenticationFlow(_) => "deleteAuthenticationFlow",
        }
    }

    /// Namespace (realm) this operation acts on
    pub fn target_namespace(&self) -> Option<&str> {
        let realm = match self {
            Operation::CreateRealm(spec) | Operation::UpdateRealm(spec) => &spec.name,
            Operation::DeleteRealm(r) => &r.name,
            Operation::CreateClient(spec) | Operation::UpdateClient(spec) => &spec.realm,
            Operation::DeleteClient(r) => &r.realm,
            Operation::CreateUser(spec) | Operation::UpdateUser(spec) => &spec.realm,
            Operation::DeleteUser(r) => &r.realm,
            Operation::CreateRealmRole(spec)
            | Operation::CreateGroup(spec)
            | Operation::CreateClientScope(spec) => &spec.realm,
            Operation::CreateClientRole(spec) => &spec.realm,
            Operation::DeleteRole(r) => &r.realm,
            Operation::DeleteGroup(r) | Operation::DeleteClientScope(r) => &r.realm,
            Operation::CreateIdentityProvider(spec) | Operation::CreateAuthenticationFlow(spec) => {
                &spec.realm
            }
            Operation::DeleteIdentityProvider(r) | Operation::DeleteAuthenticationFlow(r) => {
                &r.realm
            }
            Operation::CreateProtocolMapper(spec) => &spec.realm,
            Operation::DeleteProtocolMapper(r) => &r.realm,
        };

        let realm = realm.trim();
        if realm.is_empty() {
            None
        } else {
            Some(realm)
        }
    }

    /// Human-readable description for logs and previews
    pub fn describe(&self) -> String {
        match self {
            Operation::CreateRealm(spec) => format!("Create realm: {}", spec.name),
            Operation::UpdateRealm(spec) => format!("Update realm: {}", spec.name),
            Operation::DeleteRealm(r) => format!("Delete realm: {}", r.name),
            Operation::CreateClient(spec) => {
                format!("Create client '{}' in realm '{}'", spec.client_id, spec.realm)
            }
            Operation::UpdateClient(spec) => {
                format!("Update client '{}' in realm '{}'", spec.client_id, spec.realm)
            }
            Operation::DeleteClient(r) => {
                format!("Delete client '{}' from realm '{}'", r.client_id, r.realm)
            }
            Operation::CreateUser(spec) => {
                format!("Create user '{}' in realm '{}'", spec.username, spec.realm)
            }
            Operation::UpdateUser(spec) => {
                format!("Update user '{}' in realm '{}'", spec.username, spec.realm)
            }
            Operation::DeleteUser(r) => {
                format!("Delete user '{}' from realm '{}'", r.username, r.realm)
            }
            Operation::CreateRealmRole(spec) => {
                format!("Create realm role '{}' in realm '{}'", spec.name, spec.realm)
            }
            Operation::CreateClientRole(spec) => format!(
                "Create client role '{}' for client '{}' in realm '{}'",
                spec.name, spec.client_id, spec.realm
            ),
            Operation::DeleteRole(r) => match &r.client_id {
                Some(client_id) => format!(
                    "Delete client role '{}' from client '{}' in realm '{}'",
                    r.name, client_id, r.realm
                ),
                None => format!("Delete realm role '{}' from realm '{}'", r.name, r.realm),
            },
            Operation::CreateGroup(spec) => {
                format!("Create group '{}' in realm '{}'", spec.name, spec.realm)
            }
            Operation::DeleteGroup(r) => {
                format!("Delete group '{}' from realm '{}'", r.name, r.realm)
            }
            Operation::CreateClientScope(spec) => {
                format!("Create client scope '{}' in realm '{}'", spec.name, spec.realm)
            }
            Operation::DeleteClientScope(r) => {
                format!("Delete client scope '{}' from realm '{}'", r.name, r.realm)
            }
            Operation::CreateIdentityProvider(spec) => format!(
                "Create identity provider '{}' in realm '{}'",
                spec.alias, spec.realm
            ),
            Operation::DeleteIdentityProvider(r) => format!(
                "Delete identity provider '{}' from realm '{}'",
                r.alias, r.realm
            ),
            Operation::CreateProtocolMapper(spec) => match &spec.client_id {
                Some(client_id) => format!(
                    "Create protocol mapper '{}' for client '{}' in realm '{}'",
                    spec.name, client_id, spec.realm
                ),
                None => format!(
                    "Create protocol mapper '{}' for client scope '{}' in realm '{}'",
                    spec.name,
                    spec.client_scope_name.as_deref().unwrap_or("?"),
                    spec.realm
                ),
            },
            Operation::DeleteProtocolMapper(r) => match &r.client_id {
                Some(client_id) => format!(
                    "Delete protocol mapper '{}' from client '{}' in realm '{}'",
                    r.name, client_id, r.realm
                ),
                None => format!(
                    "Delete protocol mapper '{}' from client scope '{}' in realm '{}'",
                    r.name,
                    r.client_scope_name.as_deref().unwrap_or("?"),
                    r.realm
                ),
            },
            Operation::CreateAuthenticationFlow(spec) => format!(
                "Create authentication flow '{}' in realm '{}'",
                spec.alias, spec.realm
            ),
            Operation::DeleteAuthenticationFlow(r) => format!(
                "Delete authentication flow '{}' from realm '{}'",
                r.alias, r.realm
            ),
        }
    }

    /// Free-form payload fields, if the variant carries any
    pub fn settings(&self) -> Option<&Settings> {
        match self {
            Operation::CreateRealm(spec) | Operation::UpdateRealm(spec) => Some(&spec.settings),
            Operation::CreateClient(spec) | Operation::UpdateClient(spec) => Some(&spec.settings),
            Operation::CreateUser(spec) | Operation::UpdateUser(spec) => Some(&spec.settings),
            Operation::CreateRealmRole(spec)
            | Operation::CreateGroup(spec)
            | Operation::CreateClientScope(spec) => Some(&spec.settings),
            Operation::CreateClientRole(spec) => Some(&spec.settings),
            Operation::CreateIdentityProvider(spec) | Operation::CreateAuthenticationFlow(spec) => {
                Some(&spec.settings)
            }
            Operation::CreateProtocolMapper(spec) => Some(&spec.settings),
            _ => None,
        }
    }

    /// Apply this operation through the remote executor
    pub fn apply<E>(&self, executor: &E) -> Result<(), OperationError>
    where
        E: OperationExecutor + ?Sized,
    {
        executor.apply(self)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}
