//! [`Extension`]: an immutable, caller-supplied descriptor of a negotiable
//! extension, plus the factory methods that produce its per-connection
//! [`crate::session::Session`]s.

use crate::message::RsvBits;
use crate::params::Params;
use crate::session::Session;

/// The extension type discriminator. Only one kind exists today —
/// `per-message` extensions that operate on whole messages — expressed as a
/// one-variant enum rather than a string constant so
/// [`crate::registry::Registry::add`]'s kind check is a compiler-checked
/// match instead of a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExtensionKind {
    /// The only recognized kind: a per-message transformer.
    PerMessage,
}

/// Boxed factory closures — stored rather than expressed as an `Extension`
/// trait because an extension is data (name/kind/rsv bits) plus two
/// stateless factories, not a stateful object in its own right (see
/// DESIGN.md).
type ClientFactory = Box<dyn Fn() -> Option<Box<dyn Session>> + Send + Sync>;
type ServerFactory = Box<dyn Fn(&[Params]) -> Option<Box<dyn Session>> + Send + Sync>;

/// An immutable descriptor of a negotiable extension: its name, kind, which
/// reserved frame bits it may claim, and the two factories that mint
/// per-connection sessions.
pub struct Extension {
    name: String,
    kind: ExtensionKind,
    rsv: RsvBits,
    create_client_session: ClientFactory,
    create_server_session: ServerFactory,
}

impl Extension {
    /// Describe a new per-message extension.
    ///
    /// `create_client_session` is called once per [`crate::manager::Manager::generate_offer`]
    /// call (client role); `create_server_session` is called once per
    /// [`crate::manager::Manager::generate_response`] call (server role),
    /// with every offer fragment seen for this extension's name, in header
    /// order. Either may return `None` to decline participating this
    /// round.
    pub fn new(
        name: impl Into<String>,
        rsv: RsvBits,
        create_client_session: impl Fn() -> Option<Box<dyn Session>> + Send + Sync + 'static,
        create_server_session: impl Fn(&[Params]) -> Option<Box<dyn Session>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ExtensionKind::PerMessage,
            rsv,
            create_client_session: Box::new(create_client_session),
            create_server_session: Box::new(create_server_session),
        }
    }

    /// The extension's name, as it appears on the wire.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The extension's type discriminator (always `PerMessage` today).
    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }

    /// Which reserved bits this extension may claim.
    pub fn rsv(&self) -> RsvBits {
        self.rsv
    }

    /// Client role: mint a session for this offer round, or decline.
    pub fn create_client_session(&self) -> Option<Box<dyn Session>> {
        (self.create_client_session)()
    }

    /// Server role: mint a session from the offers seen for this
    /// extension's name, or decline.
    pub fn create_server_session(&self, offers: &[Params]) -> Option<Box<dyn Session>> {
        (self.create_server_session)(offers)
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("rsv", &self.rsv)
            .finish_non_exhaustive()
    }
}
