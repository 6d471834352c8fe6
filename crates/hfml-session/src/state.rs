//! Session lifecycle states.

use std::fmt;
use std::sync::Arc;

use hfml_auth::TokenCredential;
use hfml_client::MlClient;

/// Where a session is in its lifecycle.
pub enum SessionState {
    /// No credential yet.
    Unauthenticated,
    /// A credential produced a management token.
    Authenticated {
        /// Verified credential.
        credential: Arc<dyn TokenCredential>,
    },
    /// The management client is bound to a workspace.
    ClientReady {
        /// Management client, held for the rest of the session.
        client: MlClient,
    },
}

impl SessionState {
    /// Short state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated { .. } => "authenticated",
            Self::ClientReady { .. } => "client_ready",
        }
    }

    /// Whether remote resource operations are allowed.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::ClientReady { .. })
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("Unauthenticated"),
            Self::Authenticated { credential } => f
                .debug_struct("Authenticated")
                .field("credential", &credential.name())
                .finish(),
            Self::ClientReady { client } => f
                .debug_struct("ClientReady")
                .field("workspace", &client.workspace().workspace_name)
                .finish(),
        }
    }
}
